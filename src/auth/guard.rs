use super::session::SessionStore;
use crate::errors::ApiError;
use crate::models::usuario::Usuario;

/// Helper: exige sesión iniciada y devuelve el principal.
pub fn require_session(session: &SessionStore) -> Result<Usuario, ApiError> {
    session
        .usuario()
        .filter(|_| session.is_authenticated())
        .ok_or_else(|| ApiError::Unauthorized("Sesión no iniciada".into()))
}

/// Helper: exige sesión iniciada + rol ADMIN.
pub fn require_admin(session: &SessionStore) -> Result<Usuario, ApiError> {
    let usuario = require_session(session)?;
    if !usuario.es_admin() {
        return Err(ApiError::Unauthorized(
            "Acceso denegado: solo un Admin puede hacer esto".into(),
        ));
    }
    Ok(usuario)
}
