use thiserror::Error;

/// Errors returned by index queries, the feature-matrix builder and the
/// tokenizer. All of them are local to the failing call: the index is never
/// left partially mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("the specified term does not exist")]
    UnknownTerm,

    #[error("the specified document does not exist")]
    UnknownDocument,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
