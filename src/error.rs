use thiserror::Error;

/// Crate-wide error type. Variants map directly onto the HTTP error kinds
/// the service surface exposes (`IntoResponse` lives in `http`).
#[derive(Error, Debug)]
pub enum LsiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not acceptable")]
    NotAcceptable,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("geometry error: {0}")]
    Geometry(String),

    #[error("RDF parse error: {0}")]
    Rdf(String),

    #[error("payload store error: {0}")]
    Payload(#[from] sled::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LsiError>;
