use std::sync::{Arc, Mutex};

use crate::api::ApiClient;
use crate::auth::{guard, SessionStore};
use crate::errors::ApiError;
use crate::models::gasto::{CrearGastoPayload, Gasto};
use crate::validation;

#[derive(Debug, Default)]
struct GastoState {
    gastos: Vec<Gasto>,
    error: Option<String>,
}

/// Registro y listado de gastos de la sucursal activa. La validación corta
/// antes de emitir el request; el cómputo agregado es del backend.
pub struct GastoStore {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
    estado: Mutex<GastoState>,
}

impl GastoStore {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>) -> Self {
        Self {
            api,
            session,
            estado: Mutex::new(GastoState::default()),
        }
    }

    pub fn gastos(&self) -> Vec<Gasto> {
        self.estado.lock().unwrap().gastos.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.estado.lock().unwrap().error.clone()
    }

    pub async fn registrar_gasto(
        &self,
        concepto: &str,
        monto: f64,
        fecha: &str,
    ) -> Result<Gasto, ApiError> {
        validation::validate_concepto(concepto).map_err(ApiError::Validation)?;
        validation::validate_monto(monto).map_err(ApiError::Validation)?;
        validation::validate_fecha(fecha).map_err(ApiError::Validation)?;

        guard::require_session(&self.session)?;
        let sucursal = self
            .session
            .sucursal()
            .ok_or_else(|| ApiError::Validation("No hay sucursal activa".into()))?;

        let payload = CrearGastoPayload {
            concepto: concepto.trim().to_string(),
            monto,
            fecha: fecha.to_string(),
            sucursal_id: sucursal.id,
        };

        let gasto: Gasto = self
            .api
            .post("/gastos", serde_json::to_value(&payload)?)
            .await?;

        self.estado.lock().unwrap().gastos.push(gasto.clone());
        Ok(gasto)
    }

    /// Gastos del rango. El listado se reemplaza entero; si el fetch falla
    /// queda el anterior y el error a nivel de store.
    pub async fn load_gastos(&self, inicio: &str, fin: &str) -> Result<(), ApiError> {
        validation::validate_rango_fechas(inicio, fin).map_err(ApiError::Validation)?;
        guard::require_session(&self.session)?;

        let query = vec![
            ("inicio".to_string(), inicio.to_string()),
            ("fin".to_string(), fin.to_string()),
        ];

        match self.api.get_con_query::<Vec<Gasto>>("/gastos", query).await {
            Ok(gastos) => {
                let mut estado = self.estado.lock().unwrap();
                estado.gastos = gastos;
                estado.error = None;
                Ok(())
            }
            Err(e) => {
                self.estado.lock().unwrap().error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::testing::StubTransport;
    use crate::models::usuario::Usuario;
    use crate::storage::Storage;
    use serde_json::json;
    use tempfile::tempdir;

    fn armar(stub: Arc<StubTransport>) -> (GastoStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::new(dir.path()).unwrap());
        storage.set_token("t1").unwrap();
        storage
            .set_usuario(&Usuario {
                id: 1,
                nombre: "Ana".into(),
                email: None,
                rol: "CAJERO".into(),
                sucursal_id: 2,
                activo: true,
                permisos: vec![],
            })
            .unwrap();

        let api = Arc::new(ApiClient::new(stub, storage.clone()));
        let session = Arc::new(SessionStore::new(api.clone(), storage));
        assert!(session.check_auth());

        (GastoStore::new(api, session), dir)
    }

    #[tokio::test]
    async fn valida_antes_de_emitir_el_request() {
        let stub = Arc::new(StubTransport::new());
        let (gastos, _dir) = armar(stub.clone());

        assert!(gastos.registrar_gasto("", 100.0, "2025-01-10").await.is_err());
        assert!(gastos.registrar_gasto("hielo", 0.0, "2025-01-10").await.is_err());
        assert!(gastos.registrar_gasto("hielo", 100.0, "10/01/2025").await.is_err());
        assert!(stub.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn registra_contra_la_sucursal_activa() {
        let stub = Arc::new(StubTransport::new());
        stub.responder(
            "POST",
            "/gastos",
            200,
            json!({ "id": 11, "concepto": "hielo", "monto": 100.0, "fecha": "2025-01-10", "sucursalId": 2 }),
        );
        let (gastos, _dir) = armar(stub.clone());

        let gasto = gastos
            .registrar_gasto("  hielo  ", 100.0, "2025-01-10")
            .await
            .unwrap();
        assert_eq!(gasto.sucursal_id, 2);
        assert_eq!(gastos.gastos().len(), 1);

        // el payload viajó con la sucursal de la sesión y el concepto limpio
        let requests = stub.requests.lock().unwrap();
        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(body["sucursalId"], 2);
        assert_eq!(body["concepto"], "hielo");
    }

    #[tokio::test]
    async fn listado_fallido_conserva_el_anterior() {
        let stub = Arc::new(StubTransport::new());
        stub.responder(
            "GET",
            "/gastos",
            200,
            json!([{ "id": 11, "concepto": "hielo", "monto": 100.0, "fecha": "2025-01-10", "sucursalId": 2 }]),
        );
        let (gastos, _dir) = armar(stub.clone());
        gastos.load_gastos("2025-01-01", "2025-01-31").await.unwrap();
        assert_eq!(gastos.gastos().len(), 1);

        stub.responder("GET", "/gastos", 500, json!({ "mensaje": "se rompió" }));
        assert!(gastos.load_gastos("2025-01-01", "2025-01-31").await.is_err());
        assert_eq!(gastos.gastos().len(), 1);
        assert!(gastos.error().is_some());
    }
}
