use serde_json::json;
use std::sync::{Arc, Mutex};

use crate::api::ApiClient;
use crate::auth::{guard, SessionStore};
use crate::errors::ApiError;
use crate::log_info;
use crate::models::usuario::{Rol, Usuario, UsuarioWire};

#[derive(Debug, Default)]
struct AdminState {
    roles: Vec<Rol>,
    usuarios: Vec<Usuario>,
}

/// Directorio de usuarios para la consola del admin: roles disponibles,
/// usuarios de una sucursal y cambio de rol. Todo exige rol ADMIN; el rechazo
/// es local, antes de tocar la red.
pub struct AdminStore {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
    estado: Mutex<AdminState>,
}

impl AdminStore {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>) -> Self {
        Self {
            api,
            session,
            estado: Mutex::new(AdminState::default()),
        }
    }

    pub fn roles(&self) -> Vec<Rol> {
        self.estado.lock().unwrap().roles.clone()
    }

    pub fn usuarios(&self) -> Vec<Usuario> {
        self.estado.lock().unwrap().usuarios.clone()
    }

    pub async fn load_roles(&self) -> Result<Vec<Rol>, ApiError> {
        guard::require_admin(&self.session)?;

        let roles: Vec<Rol> = self.api.get("/roles").await?;
        self.estado.lock().unwrap().roles = roles.clone();
        Ok(roles)
    }

    /// Usuarios de una sucursal. El rol llega en el formato que el endpoint
    /// tenga ganas de usar; acá ya sale normalizado.
    pub async fn load_usuarios(&self, sucursal_id: i64) -> Result<Vec<Usuario>, ApiError> {
        guard::require_admin(&self.session)?;

        let wire: Vec<UsuarioWire> = self
            .api
            .get(&format!("/auth/usuarios/sucursal/{}", sucursal_id))
            .await?;
        let usuarios: Vec<Usuario> = wire.into_iter().map(Usuario::from).collect();

        self.estado.lock().unwrap().usuarios = usuarios.clone();
        Ok(usuarios)
    }

    pub async fn cambiar_rol(&self, usuario_id: i64, rol: &Rol) -> Result<(), ApiError> {
        guard::require_admin(&self.session)?;

        self.api
            .put::<serde_json::Value>(
                &format!("/auth/usuarios/{}/rol", usuario_id),
                json!({ "rolId": rol.id }),
            )
            .await?;

        let mut estado = self.estado.lock().unwrap();
        if let Some(usuario) = estado.usuarios.iter_mut().find(|u| u.id == usuario_id) {
            usuario.rol = rol.nombre.clone();
        }

        log_info!(
            "ADMIN",
            "Rol actualizado",
            json!({ "usuarioId": usuario_id, "rol": rol.nombre })
        );
        Ok(())
    }
}
