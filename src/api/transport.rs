//! Transporte HTTP
//!
//! `Transport` es la costura entre el cliente y la red: ejecuta un request ya
//! armado y devuelve status + cuerpo, sin saber nada de sesiones ni de
//! reintentos. La implementación real va sobre reqwest; los tests enchufan
//! transportes guionados.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::errors::ApiError;

/// Request listo para salir por la red.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Token ya resuelto; lo pone el `ApiClient`, nunca el caller.
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            bearer: None,
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::PUT,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            bearer: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

/// Respuesta cruda: status + cuerpo ya parseado a JSON (`Null` si venía vacío).
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, req: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// Transporte real sobre reqwest, con los timeouts fijos de configuración.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, req: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.base_url, req.path);

        let mut builder = self.client.request(req.method.clone(), &url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(token) = &req.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        let body = if text.is_empty() {
            Value::Null
        } else {
            // Cuerpos no-JSON (proxies, páginas de error) se conservan como string
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Transporte de pruebas con respuestas fijas por método + path.
    /// Las rutas no configuradas devuelven 404.
    pub struct StubTransport {
        rutas: Mutex<HashMap<String, ApiResponse>>,
        pub requests: Mutex<Vec<ApiRequest>>,
    }

    impl StubTransport {
        pub fn new() -> Self {
            Self {
                rutas: Mutex::new(HashMap::new()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn responder(&self, method: &str, path: &str, status: u16, body: Value) {
            self.rutas
                .lock()
                .unwrap()
                .insert(format!("{} {}", method, path), ApiResponse { status, body });
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn execute(&self, req: ApiRequest) -> Result<ApiResponse, ApiError> {
            let clave = format!("{} {}", req.method, req.path);
            self.requests.lock().unwrap().push(req);
            Ok(self
                .rutas
                .lock()
                .unwrap()
                .get(&clave)
                .cloned()
                .unwrap_or(ApiResponse {
                    status: 404,
                    body: Value::Null,
                }))
        }
    }
}
