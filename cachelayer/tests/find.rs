use cachelayer::{
    bson::{doc, Bson, Document},
    memory::InMemoryStore,
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

async fn database_with_people() -> Database<InMemoryStore> {
    let db = Database::new(InMemoryStore::builder().build().await.unwrap());
    let people = db.add_collection("people").await.unwrap();
    people
        .upsert(vec![
            doc! { "_id": 1, "name": "Ada", "age": 36, "tags": ["math", "engines"], "loc": { "type": "Point", "coordinates": [0.0, 0.0] } },
            doc! { "_id": 2, "name": "Grace", "age": 45, "tags": ["navy", "compilers"], "loc": { "type": "Point", "coordinates": [2.0, 0.0] } },
            doc! { "_id": 3, "name": "Alan", "age": 41, "tags": ["math"], "loc": { "type": "Point", "coordinates": [1.0, 0.0] } },
            doc! { "_id": 4, "name": "Edsger", "tags": [] },
        ])
        .await
        .unwrap();
    db
}

fn ids(documents: &[Document]) -> Vec<i32> {
    documents.iter().map(|d| d.get_i32("_id").unwrap()).collect()
}

#[tokio::test]
async fn sort_skip_limit_and_project() {
    let db = database_with_people().await;
    let options = FindOptions::builder()
        .sort(SortSpec::new().desc("age"))
        .skip(1)
        .limit(2)
        .fields(doc! { "name": 1 })
        .build();

    let found = db
        .collection("people")
        .find(&doc! { "age": { "$exists": true } }, &options)
        .await
        .unwrap();

    assert_eq!(
        found,
        vec![doc! { "_id": 3, "name": "Alan" }, doc! { "_id": 1, "name": "Ada" }]
    );
}

#[tokio::test]
async fn options_from_a_document() {
    let db = database_with_people().await;
    let options = FindOptions::try_from(&doc! { "sort": [["name", "asc"]], "limit": 2 }).unwrap();

    let found = db
        .collection("people")
        .find(&doc! { "tags": "math" }, &options)
        .await
        .unwrap();
    assert_eq!(ids(&found), vec![1, 3]);
}

#[tokio::test]
async fn logical_and_array_operators() {
    let db = database_with_people().await;
    let people = db.collection("people");
    let all = FindOptions::default();

    let found = people
        .find(
            &doc! { "$or": [ { "age": { "$lt": 40 } }, { "tags": { "$size": 0 } } ] },
            &all,
        )
        .await
        .unwrap();
    assert_eq!(ids(&found), vec![1, 4]);

    let found = people
        .find(&doc! { "tags": { "$all": ["math", "engines"] } }, &all)
        .await
        .unwrap();
    assert_eq!(ids(&found), vec![1]);

    let found = people
        .find(&doc! { "name": { "$regex": "^a", "$options": "i" } }, &all)
        .await
        .unwrap();
    assert_eq!(ids(&found), vec![1, 3]);
}

#[tokio::test]
async fn where_predicates_run_after_compilation() {
    let db = database_with_people().await;
    let selector = DocumentSelector::compile(&doc! { "age": { "$gt": 30 } })
        .unwrap()
        .with_where(Arc::new(|d: &Document| d.get_str("name").is_ok_and(|n| n.len() == 4)));

    let found = db
        .collection("people")
        .find_compiled(&selector, &FindOptions::default())
        .await
        .unwrap();
    assert_eq!(ids(&found), vec![3]);
}

#[tokio::test]
async fn near_orders_by_distance() {
    let db = database_with_people().await;
    let found = db
        .collection("people")
        .find(
            &doc! { "loc": { "$near": { "$geometry": { "type": "Point", "coordinates": [0.1, 0.0] } } } },
            &FindOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(ids(&found), vec![1, 3, 2]);
}

#[tokio::test]
async fn compile_errors_surface() {
    let db = database_with_people().await;
    let err = db
        .collection("people")
        .find(&doc! { "age": { "$bogus": 1 } }, &FindOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::Query(_)));
}

#[tokio::test]
async fn find_one_and_get() {
    let db = database_with_people().await;
    let people = db.collection("people");

    let youngest = people
        .find_one(
            &doc! {},
            &FindOptions::builder().sort(SortSpec::new().asc("age")).build(),
        )
        .await
        .unwrap();
    // Missing fields sort first.
    assert_eq!(youngest.unwrap().get_i32("_id").unwrap(), 4);

    assert_eq!(
        people.get(2).await.unwrap().unwrap().get_str("name").unwrap(),
        "Grace"
    );
    assert!(people.get("2").await.unwrap().is_none());
}

#[tokio::test]
async fn upsert_without_id_fails() {
    let db = database_with_people().await;
    let err = db
        .collection("people")
        .upsert(doc! { "name": "Nobody" })
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentStoreError::Upsert(_)));
    assert_eq!(
        db.backend().all_documents("people").await.unwrap().len(),
        4
    );
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Book {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    pages: i32,
}

#[tokio::test]
async fn typed_collections_round_trip() {
    let db = Database::new(InMemoryStore::new());
    db.add_collection("books").await.unwrap();
    let books = db.collection("books").typed::<Book>();

    let short = Book { id: create_uid(), title: "Short".into(), pages: 90 };
    let long = Book { id: create_uid(), title: "Long".into(), pages: 900 };
    books.upsert(vec![short.clone(), long.clone()]).await.unwrap();

    assert_eq!(books.get(short.id.as_str()).await.unwrap(), Some(short.clone()));
    assert_eq!(
        books
            .find(&doc! { "pages": { "$gte": 100 } }, &FindOptions::default())
            .await
            .unwrap(),
        vec![long.clone()]
    );
    assert_eq!(
        books.find_one(&doc! { "title": "Short" }).await.unwrap(),
        Some(short.clone())
    );
    assert_eq!(
        books.remove(vec![Bson::String(long.id.clone())]).await.unwrap(),
        vec![long]
    );
    assert_eq!(books.name(), "books");
}
