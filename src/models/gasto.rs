use serde::{Deserialize, Serialize};

/// Gasto registrado contra la sucursal activa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gasto {
    pub id: i64,
    pub concepto: String,
    pub monto: f64,
    /// ISO `YYYY-MM-DD`
    pub fecha: String,
    pub sucursal_id: i64,
    #[serde(default)]
    pub usuario_id: Option<i64>,
}

/// Payload de `POST /gastos`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrearGastoPayload {
    pub concepto: String,
    pub monto: f64,
    pub fecha: String,
    pub sucursal_id: i64,
}
