use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormPackError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Unsupported attachment type: {0}")]
    UnsupportedAttachment(String),

    #[error("Image conversion failed: {0}")]
    ImageError(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
