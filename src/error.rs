use thiserror::Error;

/// Errors reported by the model constructors, the inference passes and the
/// training loop.
#[derive(Debug, Error)]
pub enum Error {
    /// Empty observation sequence, or a symbol/state outside the model.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A probability table is inconsistent with the declared states/symbols
    /// or a row does not sum to one.
    #[error("malformed model: {0}")]
    MalformedModel(String),
    /// The observation sequence has zero probability under the model.
    #[error("observation sequence has zero probability under the model")]
    DegenerateSequence,
    #[error("numeric instability: {0}")]
    NumericInstability(String),
    /// Unknown trainer option or unparsable option value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
