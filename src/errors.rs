use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Error de red: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("No autorizado: {0}")]
    Unauthorized(String),

    #[error("El servidor respondió HTTP {status}: {mensaje}")]
    Status { status: u16, mensaje: String },

    #[error("Respuesta inválida del servidor: {0}")]
    Decode(String),

    #[error("Error de almacenamiento local: {0}")]
    Storage(String),

    #[error("Validación fallida: {0}")]
    Validation(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

impl From<ApiError> for String {
    fn from(err: ApiError) -> String {
        err.to_string()
    }
}

impl ApiError {
    /// Un 401 del backend, en cualquiera de sus formas.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized(_) | ApiError::Status { status: 401, .. }
        )
    }
}
