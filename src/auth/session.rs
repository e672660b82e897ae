use serde_json::json;
use std::sync::{Arc, Mutex};

use crate::api::ApiClient;
use crate::errors::ApiError;
use crate::models::usuario::{LoginResponse, Sucursal, Usuario};
use crate::storage::Storage;
use crate::validation;
use crate::{log_info, log_warn};

/// Estado observable de la sesión. Autenticado ⇔ token y usuario presentes;
/// entre medio solo se observa el flag `cargando`.
#[derive(Debug, Clone, Default)]
struct SessionState {
    usuario: Option<Usuario>,
    sucursal: Option<Sucursal>,
    token: Option<String>,
    cargando: bool,
    error: Option<String>,
}

/// Dueño exclusivo del principal: usuario, sucursal y token, en memoria y
/// persistidos. Hace cumplir la política de cambio de sucursal.
pub struct SessionStore {
    api: Arc<ApiClient>,
    storage: Arc<Storage>,
    estado: Mutex<SessionState>,
}

impl SessionStore {
    pub fn new(api: Arc<ApiClient>, storage: Arc<Storage>) -> Self {
        Self {
            api,
            storage,
            estado: Mutex::new(SessionState::default()),
        }
    }

    // -- Lecturas --

    pub fn usuario(&self) -> Option<Usuario> {
        self.estado.lock().unwrap().usuario.clone()
    }

    pub fn sucursal(&self) -> Option<Sucursal> {
        self.estado.lock().unwrap().sucursal.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.estado.lock().unwrap().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        let estado = self.estado.lock().unwrap();
        estado.token.is_some() && estado.usuario.is_some()
    }

    pub fn es_admin(&self) -> bool {
        self.estado
            .lock()
            .unwrap()
            .usuario
            .as_ref()
            .map(Usuario::es_admin)
            .unwrap_or(false)
    }

    pub fn cargando(&self) -> bool {
        self.estado.lock().unwrap().cargando
    }

    pub fn error(&self) -> Option<String> {
        self.estado.lock().unwrap().error.clone()
    }

    fn set_cargando(&self, valor: bool) {
        self.estado.lock().unwrap().cargando = valor;
    }

    // -- Transiciones --

    /// Autentica contra el backend y deja la sesión lista: usuario
    /// normalizado, sucursal (sintetizada si el servidor no manda una) y las
    /// tres claves persistidas. Si algo falla, el estado previo queda intacto.
    pub async fn login(&self, username: &str, password: &str) -> Result<Usuario, ApiError> {
        validation::validate_username(username).map_err(ApiError::Validation)?;
        validation::validate_password(password).map_err(ApiError::Validation)?;

        self.set_cargando(true);

        let respuesta = match self
            .api
            .post::<LoginResponse>(
                "/auth/login",
                json!({ "username": username, "password": password }),
            )
            .await
        {
            Ok(r) => r,
            Err(e) => {
                let mut estado = self.estado.lock().unwrap();
                estado.cargando = false;
                estado.error = Some(e.to_string());
                return Err(e);
            }
        };

        let usuario = Usuario::from(respuesta.usuario);
        let sucursal = respuesta
            .sucursal
            .unwrap_or_else(|| Sucursal::sintetica(usuario.sucursal_id));

        if let Err(e) = self.persistir(&respuesta.token, &usuario, &sucursal) {
            let mut estado = self.estado.lock().unwrap();
            estado.cargando = false;
            estado.error = Some(e.to_string());
            return Err(e);
        }

        {
            let mut estado = self.estado.lock().unwrap();
            estado.token = Some(respuesta.token);
            estado.usuario = Some(usuario.clone());
            estado.sucursal = Some(sucursal);
            estado.error = None;
            estado.cargando = false;
        }

        log_info!(
            "AUTH",
            "Login correcto",
            json!({ "usuario": usuario.nombre, "rol": usuario.rol, "sucursalId": usuario.sucursal_id })
        );

        Ok(usuario)
    }

    fn persistir(
        &self,
        token: &str,
        usuario: &Usuario,
        sucursal: &Sucursal,
    ) -> Result<(), ApiError> {
        self.storage.set_token(token)?;
        self.storage.set_usuario(usuario)?;
        self.storage.set_sucursal(sucursal)?;
        Ok(())
    }

    /// Invalida la sesión en el servidor (best-effort: un fallo solo se
    /// registra) y limpia incondicionalmente memoria y almacenamiento.
    pub async fn logout(&self) {
        if let Err(e) = self
            .api
            .post::<serde_json::Value>("/auth/logout", json!({}))
            .await
        {
            log_warn!(
                "AUTH",
                &format!("Logout en el servidor falló, se ignora: {}", e)
            );
        }

        self.storage.clear_auth();
        *self.estado.lock().unwrap() = SessionState::default();
        log_info!("AUTH", "Sesión cerrada");
    }

    /// Pide un token nuevo para la sesión vigente. Un refresh fallido es
    /// irrecuperable: fuerza logout.
    pub async fn refresh_token(&self) -> Result<(), ApiError> {
        match self.api.refresh_token().await {
            Ok(token) => {
                self.estado.lock().unwrap().token = Some(token);
                Ok(())
            }
            Err(e) => {
                log_warn!("AUTH", "Refresh de sesión falló, forzando logout");
                self.logout().await;
                Err(e)
            }
        }
    }

    /// Cambia la sucursal activa. Un no-admin solo puede operar su sucursal
    /// asignada: cualquier otro destino se rechaza con log y sin tocar nada.
    pub fn change_sucursal(&self, nueva: Sucursal) -> Result<(), ApiError> {
        let usuario = self
            .usuario()
            .ok_or_else(|| ApiError::Unauthorized("Sesión no iniciada".into()))?;

        if !usuario.es_admin() && nueva.id != usuario.sucursal_id {
            log_warn!(
                "AUTH",
                &format!(
                    "Cambio de sucursal rechazado: {} (rol {}) no puede operar la sucursal {}",
                    usuario.nombre, usuario.rol, nueva.id
                )
            );
            return Ok(());
        }

        self.storage.set_sucursal(&nueva)?;
        self.estado.lock().unwrap().sucursal = Some(nueva);
        Ok(())
    }

    /// Restaura la sesión persistida al arrancar. Devuelve si quedó
    /// autenticada. La sucursal persistida de un admin solo se respeta si es
    /// estructuralmente válida (id > 0); todo otro caso, o un rol no-admin,
    /// sintetiza la sucursal asignada del usuario.
    pub fn check_auth(&self) -> bool {
        self.set_cargando(true);

        let (token, usuario) = match (self.storage.token(), self.storage.usuario()) {
            (Some(t), Some(u)) => (t, u),
            _ => {
                self.set_cargando(false);
                return false;
            }
        };

        let sucursal = match self.storage.sucursal() {
            Some(s) if usuario.es_admin() && s.es_valida() => s,
            _ => Sucursal::sintetica(usuario.sucursal_id),
        };
        let _ = self.storage.set_sucursal(&sucursal);

        let mut estado = self.estado.lock().unwrap();
        estado.token = Some(token);
        estado.usuario = Some(usuario);
        estado.sucursal = Some(sucursal);
        estado.error = None;
        estado.cargando = false;
        true
    }
}
