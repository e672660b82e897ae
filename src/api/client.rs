//! Cliente HTTP del backend
//!
//! Centraliza dos cosas que ningún store debe repetir:
//! - cada request sale con `Authorization: Bearer <token>`, leyendo el token
//!   del almacenamiento persistido al momento de enviar (tolera una sesión en
//!   memoria desactualizada);
//! - ante un 401, un único refresh en vuelo: el primer caller lo ejecuta y el
//!   resto espera y reintenta con el token nuevo. Un request se reintenta a lo
//!   sumo una vez.
//!
//! El cliente se construye explícitamente y se pasa por referencia a los
//! stores; no hay instancia global.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::api::transport::{ApiRequest, ApiResponse, Transport};
use crate::errors::ApiError;
use crate::log_warn;
use crate::models::usuario::RefreshResponse;
use crate::storage::Storage;

const SESION_EXPIRADA: &str = "Sesión expirada, inicie sesión nuevamente";

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    storage: Arc<Storage>,
    /// Serializa los refresh: a lo sumo uno en vuelo.
    refresh_gate: tokio::sync::Mutex<()>,
    /// Generación de refresh completados (con éxito o no). Permite a un
    /// caller encolado detectar que otro ya refrescó mientras esperaba,
    /// incluso si el servidor reemitiera un token idéntico.
    refresh_epoch: AtomicU64,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, storage: Arc<Storage>) -> Self {
        Self {
            transport,
            storage,
            refresh_gate: tokio::sync::Mutex::new(()),
            refresh_epoch: AtomicU64::new(0),
        }
    }

    /// Ejecuta un request con token y manejo de 401.
    pub async fn request(&self, req: ApiRequest) -> Result<Value, ApiError> {
        let token = self.storage.token();
        let tenia_token = token.is_some();
        let epoch_visto = self.refresh_epoch.load(Ordering::Acquire);

        let mut primera = req.clone();
        primera.bearer = token;
        let respuesta = self.transport.execute(primera).await?;

        // Sin token no hay nada que refrescar: un 401 es credencial inválida
        // (p. ej. un login fallido) y se propaga tal cual.
        if respuesta.status != 401 || !tenia_token {
            return Self::into_result(respuesta);
        }

        let token_nuevo = self.refresh_o_espera(epoch_visto).await?;

        let mut reintento = req;
        reintento.bearer = Some(token_nuevo);
        let respuesta = self.transport.execute(reintento).await?;
        // Un segundo 401 ya no reintenta.
        Self::into_result(respuesta)
    }

    /// Refresh explícito (lo usa el store de sesión). Coalesce con cualquier
    /// refresh ya en vuelo.
    pub async fn refresh_token(&self) -> Result<String, ApiError> {
        let epoch_visto = self.refresh_epoch.load(Ordering::Acquire);
        self.refresh_o_espera(epoch_visto).await
    }

    /// Entra a la cola de refresh. Si al tomar el lock otro caller ya completó
    /// un refresh posterior a `epoch_visto`, no se emite otro: se usa lo que
    /// haya quedado en el almacenamiento.
    async fn refresh_o_espera(&self, epoch_visto: u64) -> Result<String, ApiError> {
        let _gate = self.refresh_gate.lock().await;

        if self.refresh_epoch.load(Ordering::Acquire) != epoch_visto {
            return self
                .storage
                .token()
                .ok_or_else(|| ApiError::Unauthorized(SESION_EXPIRADA.into()));
        }

        let resultado = self.ejecutar_refresh().await;
        self.refresh_epoch.fetch_add(1, Ordering::AcqRel);

        match resultado {
            Ok(token) => Ok(token),
            Err(e) => {
                // Sesión irrecuperable: se limpian las credenciales locales y
                // todos los callers encolados reciben el error de autorización.
                self.storage.clear_auth();
                log_warn!("API", "Refresh de token falló; credenciales locales limpiadas");
                Err(e)
            }
        }
    }

    async fn ejecutar_refresh(&self) -> Result<String, ApiError> {
        let mut req = ApiRequest::post("/auth/refresh-token", serde_json::json!({}));
        req.bearer = self.storage.token();

        let respuesta = self.transport.execute(req).await?;
        if !respuesta.is_success() {
            return Err(ApiError::Unauthorized(SESION_EXPIRADA.into()));
        }

        let refresh: RefreshResponse = serde_json::from_value(respuesta.body)?;
        self.storage.set_token(&refresh.token)?;
        Ok(refresh.token)
    }

    fn into_result(respuesta: ApiResponse) -> Result<Value, ApiError> {
        if respuesta.is_success() {
            return Ok(respuesta.body);
        }
        if respuesta.status == 401 {
            return Err(ApiError::Unauthorized(
                mensaje_de(&respuesta.body).unwrap_or_else(|| SESION_EXPIRADA.into()),
            ));
        }
        Err(ApiError::Status {
            status: respuesta.status,
            mensaje: mensaje_de(&respuesta.body).unwrap_or_else(|| respuesta.body.to_string()),
        })
    }

    // -- Atajos tipados --

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let value = self.request(ApiRequest::get(path)).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get_con_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T, ApiError> {
        let value = self.request(ApiRequest::get(path).with_query(query)).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ApiError> {
        let value = self.request(ApiRequest::post(path, body)).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn put<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ApiError> {
        let value = self.request(ApiRequest::put(path, body)).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request(ApiRequest::delete(path)).await?;
        Ok(())
    }
}

fn mensaje_de(body: &Value) -> Option<String> {
    for campo in ["mensaje", "message", "error"] {
        if let Some(s) = body.get(campo).and_then(Value::as_str) {
            return Some(s.to_string());
        }
    }
    body.as_str().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::{ApiRequest, ApiResponse, Transport};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Transporte guionado: acepta un único token "bueno"; todo lo demás da
    /// 401. El refresh tarda lo suficiente para que otros callers se encolen.
    struct FakeTransport {
        token_bueno: StdMutex<String>,
        token_refrescado: String,
        refresh_ok: bool,
        /// false: toda llamada de datos devuelve 401, sirva o no el token.
        aceptar_datos: bool,
        refresh_calls: AtomicU64,
        data_calls: AtomicU64,
        bearers_vistos: StdMutex<Vec<Option<String>>>,
    }

    impl FakeTransport {
        fn new(token_bueno: &str, token_refrescado: &str, refresh_ok: bool) -> Self {
            Self {
                token_bueno: StdMutex::new(token_bueno.to_string()),
                token_refrescado: token_refrescado.to_string(),
                refresh_ok,
                aceptar_datos: true,
                refresh_calls: AtomicU64::new(0),
                data_calls: AtomicU64::new(0),
                bearers_vistos: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn execute(&self, req: ApiRequest) -> Result<ApiResponse, ApiError> {
            if req.path == "/auth/refresh-token" {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(80)).await;
                if self.refresh_ok {
                    *self.token_bueno.lock().unwrap() = self.token_refrescado.clone();
                    return Ok(ApiResponse {
                        status: 200,
                        body: serde_json::json!({ "token": self.token_refrescado }),
                    });
                }
                return Ok(ApiResponse {
                    status: 401,
                    body: serde_json::json!({ "mensaje": "refresh rechazado" }),
                });
            }

            self.data_calls.fetch_add(1, Ordering::SeqCst);
            self.bearers_vistos.lock().unwrap().push(req.bearer.clone());
            tokio::time::sleep(Duration::from_millis(20)).await;

            let bueno = self.token_bueno.lock().unwrap().clone();
            if self.aceptar_datos && req.bearer.as_deref() == Some(bueno.as_str()) {
                Ok(ApiResponse {
                    status: 200,
                    body: serde_json::json!({ "ok": true }),
                })
            } else {
                Ok(ApiResponse {
                    status: 401,
                    body: serde_json::json!({ "mensaje": "token inválido" }),
                })
            }
        }
    }

    fn cliente(fake: Arc<FakeTransport>) -> (Arc<ApiClient>, Arc<Storage>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::new(dir.path()).unwrap());
        let api = Arc::new(ApiClient::new(fake, storage.clone()));
        (api, storage, dir)
    }

    #[tokio::test]
    async fn adjunta_bearer_leido_del_storage() {
        let fake = Arc::new(FakeTransport::new("t1", "t2", true));
        let (api, storage, _dir) = cliente(fake.clone());
        storage.set_token("t1").unwrap();

        let ok: Value = api.get("/categorias").await.unwrap();
        assert_eq!(ok["ok"], true);
        assert_eq!(
            fake.bearers_vistos.lock().unwrap().as_slice(),
            &[Some("t1".to_string())]
        );
    }

    #[tokio::test]
    async fn sin_token_un_401_no_dispara_refresh() {
        let fake = Arc::new(FakeTransport::new("t1", "t2", true));
        let (api, _storage, _dir) = cliente(fake.clone());

        let err = api.get::<Value>("/categorias").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dos_401_concurrentes_un_solo_refresh() {
        let fake = Arc::new(FakeTransport::new("viejo", "t2", true));
        let (api, storage, _dir) = cliente(fake.clone());
        storage.set_token("t1").unwrap(); // distinto de "viejo": el primer envío da 401

        let a = {
            let api = api.clone();
            tokio::spawn(async move { api.get::<Value>("/productos").await })
        };
        let b = {
            let api = api.clone();
            tokio::spawn(async move { api.get::<Value>("/reportes").await })
        };

        let (ra, rb) = (a.await.unwrap(), b.await.unwrap());
        assert!(ra.is_ok() && rb.is_ok());
        assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(storage.token().as_deref(), Some("t2"));

        // Ambos replays salieron con el token nuevo
        let bearers = fake.bearers_vistos.lock().unwrap();
        let con_t2 = bearers
            .iter()
            .filter(|b| b.as_deref() == Some("t2"))
            .count();
        assert_eq!(con_t2, 2);
    }

    #[tokio::test]
    async fn refresh_fallido_limpia_credenciales_y_propaga() {
        let fake = Arc::new(FakeTransport::new("viejo", "t2", false));
        let (api, storage, _dir) = cliente(fake.clone());
        storage.set_token("t1").unwrap();

        let a = {
            let api = api.clone();
            tokio::spawn(async move { api.get::<Value>("/productos").await })
        };
        let b = {
            let api = api.clone();
            tokio::spawn(async move { api.get::<Value>("/reportes").await })
        };

        assert!(a.await.unwrap().unwrap_err().is_unauthorized());
        assert!(b.await.unwrap().unwrap_err().is_unauthorized());
        assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 1);
        assert!(storage.token().is_none());
        assert!(storage.usuario().is_none());
    }

    #[tokio::test]
    async fn un_request_se_reintenta_a_lo_sumo_una_vez() {
        // El refresh funciona, pero el backend sigue contestando 401:
        // exactamente un replay y el error se propaga, sin bucle.
        let mut fake = FakeTransport::new("t1", "t2", true);
        fake.aceptar_datos = false;
        let fake = Arc::new(fake);
        let (api, storage, _dir) = cliente(fake.clone());
        storage.set_token("t1").unwrap();

        let err = api.get::<Value>("/productos").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(fake.data_calls.load(Ordering::SeqCst), 2);
        assert_eq!(fake.refresh_calls.load(Ordering::SeqCst), 1);
    }
}
