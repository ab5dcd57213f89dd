//! Geospatial post-filters for `$near` and `$geoIntersects`.
//!
//! The selector predicate treats both operators as always-true; once the candidate set
//! is known, proximity ordering and polygon containment are applied here. Geometries are
//! GeoJSON-shaped documents with `[longitude, latitude]` coordinates.

use bson::{Bson, Document};
use std::cmp::Ordering;

use crate::{
    error::{CompileError, CompileResult},
    lookup::resolve_path,
    value::{as_number, present, truthy},
};

/// Earth radius in meters used for great-circle distances.
pub const EARTH_RADIUS_METERS: f64 = 6_370_986.0;

/// Maximum number of documents returned by a `$near` query.
pub const NEAR_RESULT_LIMIT: usize = 100;

/// Great-circle distance in meters between two `(latitude, longitude)` pairs given in degrees.
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();
    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

#[derive(Debug, Clone, PartialEq)]
struct NearFilter {
    field: String,
    lng: f64,
    lat: f64,
    max_distance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
struct IntersectsFilter {
    field: String,
    ring: Vec<(f64, f64)>,
}

/// The geospatial filters found in a selector's top-level fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoPostFilter {
    near: Vec<NearFilter>,
    intersects: Vec<IntersectsFilter>,
}

impl GeoPostFilter {
    /// Collects `$near` and `$geoIntersects` clauses from a selector.
    ///
    /// A `$near` whose geometry is not a `Point`, or a `$geoIntersects` whose geometry is
    /// not a `Polygon`, ends collection for that operator; later fields are not examined.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MalformedGeometry`] when `$geometry` is missing or has
    /// unusable coordinates, or when a polygon ring is not closed.
    pub fn compile(selector: &Document) -> CompileResult<Self> {
        let mut filter = Self::default();

        for (field, spec) in selector {
            let Some(operand) = operator_operand(spec, "$near") else {
                continue;
            };
            let geometry = geometry_of(operand)?;
            if geometry_type(geometry) != Some("Point") {
                break;
            }
            let (lng, lat) = position(geometry.get("coordinates"))
                .ok_or_else(|| CompileError::MalformedGeometry("Point requires [lng, lat]".into()))?;
            let max_distance = match operand {
                Bson::Document(near) if truthy(near.get("$maxDistance")) => {
                    near.get("$maxDistance").and_then(as_number)
                }
                _ => None,
            };
            filter.near.push(NearFilter {
                field: field.clone(),
                lng,
                lat,
                max_distance,
            });
        }

        for (field, spec) in selector {
            let Some(operand) = operator_operand(spec, "$geoIntersects") else {
                continue;
            };
            let geometry = geometry_of(operand)?;
            if geometry_type(geometry) != Some("Polygon") {
                break;
            }
            filter.intersects.push(IntersectsFilter {
                field: field.clone(),
                ring: outer_ring(geometry)?,
            });
        }

        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.near.is_empty() && self.intersects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.near.len() + self.intersects.len()
    }

    /// Applies proximity ordering and polygon containment to a matched candidate set.
    pub fn apply<'a>(&self, mut documents: Vec<&'a Document>) -> Vec<&'a Document> {
        for near in &self.near {
            let mut scored: Vec<(f64, &'a Document)> = documents
                .into_iter()
                .filter_map(|document| {
                    let (lng, lat) = point_of(document, &near.field)?;
                    let distance = haversine_distance(near.lat, near.lng, lat, lng);
                    (distance >= 0.0).then_some((distance, document))
                })
                .collect();
            scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            documents = scored
                .into_iter()
                .filter(|(distance, _)| near.max_distance.is_none_or(|max| *distance <= max))
                .take(NEAR_RESULT_LIMIT)
                .map(|(_, document)| document)
                .collect();
        }

        for intersects in &self.intersects {
            documents.retain(|document| {
                point_of(document, &intersects.field)
                    .is_some_and(|point| in_bounding_box(point, &intersects.ring))
            });
        }

        documents
    }
}

fn operator_operand<'a>(spec: &'a Bson, operator: &str) -> Option<&'a Bson> {
    match spec {
        Bson::Document(document) => document.get(operator).filter(|op| truthy(Some(op))),
        _ => None,
    }
}

fn geometry_of(operand: &Bson) -> CompileResult<&Document> {
    match operand {
        Bson::Document(document) => match document.get("$geometry") {
            Some(Bson::Document(geometry)) => Ok(geometry),
            _ => Err(CompileError::MalformedGeometry("missing $geometry".into())),
        },
        _ => Err(CompileError::MalformedGeometry("missing $geometry".into())),
    }
}

fn geometry_type(geometry: &Document) -> Option<&str> {
    geometry.get_str("type").ok()
}

fn position(value: Option<&Bson>) -> Option<(f64, f64)> {
    match present(value) {
        Some(Bson::Array(pair)) if pair.len() >= 2 => {
            Some((as_number(&pair[0])?, as_number(&pair[1])?))
        }
        _ => None,
    }
}

fn outer_ring(geometry: &Document) -> CompileResult<Vec<(f64, f64)>> {
    let malformed = || {
        CompileError::MalformedGeometry("Polygon requires a ring of [lng, lat] positions".into())
    };
    let Some(Bson::Array(rings)) = geometry.get("coordinates") else {
        return Err(malformed());
    };
    let Some(Bson::Array(ring)) = rings.first() else {
        return Err(malformed());
    };
    let ring = ring
        .iter()
        .map(|point| position(Some(point)))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(malformed)?;

    if ring.is_empty() {
        return Err(malformed());
    }
    if ring.first() != ring.last() {
        return Err(CompileError::MalformedGeometry("First must equal last".into()));
    }
    Ok(ring)
}

// Stored locations are GeoJSON points reached without array branching.
fn point_of(document: &Document, field: &str) -> Option<(f64, f64)> {
    let Some(Bson::Document(point)) = resolve_path(document, field) else {
        return None;
    };
    if geometry_type(point) != Some("Point") {
        return None;
    }
    position(point.get("coordinates"))
}

// Containment is approximated by the ring's bounding box.
fn in_bounding_box((lng, lat): (f64, f64), ring: &[(f64, f64)]) -> bool {
    let (mut min_lng, mut min_lat) = (f64::INFINITY, f64::INFINITY);
    let (mut max_lng, mut max_lat) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in ring {
        min_lng = min_lng.min(x);
        max_lng = max_lng.max(x);
        min_lat = min_lat.min(y);
        max_lat = max_lat.max(y);
    }
    lng >= min_lng && lng <= max_lng && lat >= min_lat && lat <= max_lat
}
