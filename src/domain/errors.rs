use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// El modelo no se cargó al arrancar; no hay recarga.
    #[error("Model not loaded")]
    ModelUnavailable,
    #[error("Invalid file type '{0}'. Only JPEG and PNG are supported.")]
    InvalidMediaType(String),
    #[error("Invalid image file: {0}")]
    InvalidImage(String),
    /// La salida del modelo no coincide con ninguna forma conocida.
    #[error("Unexpected model output format: {0}")]
    UnexpectedOutputFormat(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl DomainError {
    /// Errores del cliente (entrada inválida), nunca se reintentan.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidMediaType(_) | DomainError::InvalidImage(_) | DomainError::InvalidInput(_)
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
