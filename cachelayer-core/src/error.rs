//! Error types and result types for query compilation, comparison, transactions and store operations.
//!
//! Every failure family gets its own enum so callers can match precisely, and all of them
//! convert into [`DocumentStoreError`] for code that only wants to propagate with `?`.
//! Use [`DocumentStoreResult<T>`] as the return type for fallible store operations.

use bson::error::Error as BsonError;
use thiserror::Error;

/// Errors raised while compiling a selector, sort specification or find options.
///
/// These are always raised at compilation time, so a compiled selector or comparator can be
/// reused without re-validating the source specification.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// A field's selector mixes `$`-prefixed operator keys with literal keys.
    #[error("Inconsistent selector: {0}")]
    InconsistentSelector(String),
    /// A `$`-prefixed key inside a field selector is not a known value operator.
    #[error("Unrecognized operator: {0}")]
    UnrecognizedOperator(String),
    /// A `$`-prefixed top-level key is not a known logical operator.
    #[error("Unrecognized logical operator: {0}")]
    UnrecognizedLogicalOperator(String),
    /// `$and`, `$or` or `$nor` received something other than a non-empty array of documents.
    #[error("$and/$or/$nor must be nonempty array")]
    InvalidLogicalOperand,
    /// An operator that requires an array operand received something else.
    #[error("Argument to {0} must be array")]
    NonArrayOperand(&'static str),
    /// An operator received an operand of the wrong shape.
    #[error("Malformed operand for {operator}: {reason}")]
    MalformedOperand {
        /// The operator whose operand was rejected.
        operator: &'static str,
        /// What was wrong with the operand.
        reason: String,
    },
    /// `$options` contained flags other than `i`, `m` and `g`.
    #[error("Only the i, m, and g regexp options are supported")]
    UnsupportedRegexOptions(String),
    /// A regular expression could not be compiled.
    #[error("Invalid regular expression /{pattern}/: {reason}")]
    InvalidRegex {
        /// The offending pattern.
        pattern: String,
        /// The regex engine's explanation.
        reason: String,
    },
    /// The sort specification is neither a mapping nor an array of keys.
    #[error("Bad sort specification: {0}")]
    BadSortSpecification(String),
    /// Find options could not be decoded.
    #[error("Bad find options: {0}")]
    BadFindOptions(String),
    /// A geospatial operand has no usable `$geometry`, or its polygon ring is not closed.
    #[error("Malformed geometry: {0}")]
    MalformedGeometry(String),
}

/// Errors raised when two values cannot be ordered.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComparisonError {
    /// Both values share a cross-type rank but have different type codes.
    #[error("Missing type coercion logic between type {left} and type {right}")]
    MissingCoercion {
        /// Type code of the left-hand value.
        left: i32,
        /// Type code of the right-hand value.
        right: i32,
    },
    /// The values are of a type that has no ordering at all.
    #[error("Sorting not supported on {0}")]
    Unsortable(&'static str),
}

/// Errors raised by the transaction layer when an operation violates a transaction's capabilities.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransactionError {
    /// A write was attempted on a transaction kind that cannot write.
    #[error("Cannot write outside of a WriteTransaction")]
    WriteOutsideWriteTransaction,
    /// A read was attempted on a synchronous write transaction.
    #[error("Cannot read in a SynchronousWriteTransaction")]
    ReadInSynchronousWriteTransaction,
    /// The current transaction does not accept the candidate transaction kind.
    #[error("Cannot push a {candidate} transaction onto a {current} transaction")]
    CannotPush {
        /// Kind of the transaction currently on top of the stack.
        current: String,
        /// Kind of the transaction that was rejected.
        candidate: String,
    },
    /// A deferred flush had to be scheduled outside of an async runtime.
    #[error("No async runtime available to schedule a flush")]
    NoRuntime,
}

/// Errors raised while normalizing upsert arguments.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpsertError {
    /// At least one document in the upsert has no `_id`.
    #[error("All documents in the upsert must have an _id")]
    MissingId,
}

/// Errors raised by the find pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// The selector, sort or options did not compile.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// Sorting hit a pair of values that cannot be ordered.
    #[error(transparent)]
    Comparison(#[from] ComparisonError),
}

/// Represents all possible errors that can occur when interacting with a document store.
///
/// This enum wraps the query, transaction and upsert families and adds store-level
/// failures such as missing collections or backend errors.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting BSON values.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// A collection with the given name already exists.
    #[error("Collection already exists: {0}")]
    CollectionAlreadyExists(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
    /// A query failed to compile or to sort.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// A transaction rejected the operation.
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    /// Upsert arguments were malformed.
    #[error(transparent)]
    Upsert(#[from] UpsertError),
    /// A custom type registration failed.
    #[error("Type {0} already present")]
    DuplicateType(String),
}

/// A specialized `Result` type for selector and sort compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// A specialized `Result` type for value comparisons.
pub type ComparisonResult<T> = Result<T, ComparisonError>;

/// A specialized `Result` type for the find pipeline.
pub type QueryResult<T> = Result<T, QueryError>;

/// A specialized `Result` type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;

/// A specialized `Result` type for document store operations.
///
/// This type alias is used throughout the crate to indicate operations that may fail
/// with a [`DocumentStoreError`].
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<CompileError> for DocumentStoreError {
    fn from(err: CompileError) -> Self {
        DocumentStoreError::Query(QueryError::Compile(err))
    }
}

impl From<ComparisonError> for DocumentStoreError {
    fn from(err: ComparisonError) -> Self {
        DocumentStoreError::Query(QueryError::Comparison(err))
    }
}
