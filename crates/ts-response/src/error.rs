use thiserror::Error;

/// Why a step payload could not be turned into a snapshot.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("empty step payload")]
    Empty,

    #[error("step payload does not start with an INST element (found {0:?})")]
    MissingInstant(String),

    #[error("step payload ended before </INST> (truncated buffer?)")]
    Truncated,

    #[error("{element} element without required attribute {field}")]
    MissingField { element: &'static str, field: &'static str },

    #[error("cannot coerce {value:?} for field {field}")]
    InvalidValue { field: &'static str, value: String },

    #[error("malformed XML: {0}")]
    Xml(String),
}

pub type ParseResult<T> = Result<T, ParseError>;
