use chrono::Local;
use serde::{Deserialize, Serialize};

/// Rango de fechas de los reportes, en el formato ISO que consume el
/// backend (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangoFechas {
    pub inicio: String,
    pub fin: String,
}

impl RangoFechas {
    /// Rango inicial: el día de hoy.
    pub fn hoy() -> Self {
        let hoy = Local::now().format("%Y-%m-%d").to_string();
        Self {
            inicio: hoy.clone(),
            fin: hoy,
        }
    }
}

/// Total agregado de una categoría dentro de un resumen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCategoria {
    pub categoria_id: i64,
    pub nombre: String,
    pub total: f64,
}

/// Resumen de ventas o de gastos: misma forma para ambos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumenMovimientos {
    pub total: f64,
    pub cantidad: i64,
    pub promedio: f64,
    #[serde(default)]
    pub por_categoria: Vec<TotalCategoria>,
}

/// Resumen de utilidad del período.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumenUtilidad {
    pub neto: f64,
    /// Margen en %. Indefinido cuando las ventas del período son cero.
    #[serde(default)]
    pub margen: Option<f64>,
    pub promedio_diario: f64,
}

/// Reporte agregado de un período. Se reemplaza entero en cada fetch,
/// nunca se mezcla con el anterior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reporte {
    pub periodo: RangoFechas,
    pub ventas: ResumenMovimientos,
    pub gastos: ResumenMovimientos,
    pub utilidad: ResumenUtilidad,
}

impl Reporte {
    /// margen = neto / ventas.total × 100, indefinido sin ventas.
    pub fn margen_calculado(&self) -> Option<f64> {
        if self.ventas.total > 0.0 {
            Some(self.utilidad.neto / self.ventas.total * 100.0)
        } else {
            None
        }
    }
}

/// Entrada del reporte por sucursal (`GET /reportes/por-sucursal`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReporteSucursal {
    pub sucursal_id: i64,
    pub sucursal_nombre: String,
    #[serde(flatten)]
    pub reporte: Reporte,
}

/// Indicadores globales para el tablero del admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub ventas_hoy: f64,
    pub transacciones_hoy: i64,
    pub ticket_promedio: f64,
    pub sucursales_activas: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reporte(ventas_total: f64, neto: f64) -> Reporte {
        Reporte {
            periodo: RangoFechas {
                inicio: "2025-01-01".into(),
                fin: "2025-01-31".into(),
            },
            ventas: ResumenMovimientos {
                total: ventas_total,
                cantidad: 10,
                promedio: ventas_total / 10.0,
                por_categoria: vec![],
            },
            gastos: ResumenMovimientos {
                total: 0.0,
                cantidad: 0,
                promedio: 0.0,
                por_categoria: vec![],
            },
            utilidad: ResumenUtilidad {
                neto,
                margen: None,
                promedio_diario: 0.0,
            },
        }
    }

    #[test]
    fn margen_definido_con_ventas() {
        assert_eq!(reporte(200.0, 50.0).margen_calculado(), Some(25.0));
    }

    #[test]
    fn margen_indefinido_sin_ventas() {
        assert_eq!(reporte(0.0, -30.0).margen_calculado(), None);
    }
}
