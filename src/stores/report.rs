use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::api::ApiClient;
use crate::auth::{guard, SessionStore};
use crate::errors::ApiError;
use crate::log_warn;
use crate::models::reporte::{Kpis, RangoFechas, Reporte, ReporteSucursal};
use crate::validation;

#[derive(Debug)]
struct ReportState {
    rango: RangoFechas,
    /// Para un admin, el reporte de toda la organización; para los demás, el
    /// único reporte de su propia actividad.
    reporte_general: Option<Reporte>,
    /// Solo admin: reportes cacheados por sucursal (todas se traen juntas).
    por_sucursal: HashMap<i64, Reporte>,
    /// Solo admin.
    kpis: Option<Kpis>,
    filtro_sucursal: Option<i64>,
    error: Option<String>,
    cargando: bool,
}

/// Reportes agregados del período, con alcance según el rol: un admin ve la
/// organización completa más el detalle por sucursal; el resto solo su propia
/// actividad.
pub struct ReportStore {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
    estado: Mutex<ReportState>,
}

impl ReportStore {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>) -> Self {
        Self {
            api,
            session,
            estado: Mutex::new(ReportState {
                rango: RangoFechas::hoy(),
                reporte_general: None,
                por_sucursal: HashMap::new(),
                kpis: None,
                filtro_sucursal: None,
                error: None,
                cargando: false,
            }),
        }
    }

    // -- Lecturas --

    pub fn rango(&self) -> RangoFechas {
        self.estado.lock().unwrap().rango.clone()
    }

    pub fn kpis(&self) -> Option<Kpis> {
        self.estado.lock().unwrap().kpis.clone()
    }

    pub fn reporte_general(&self) -> Option<Reporte> {
        self.estado.lock().unwrap().reporte_general.clone()
    }

    pub fn reporte_de_sucursal(&self, sucursal_id: i64) -> Option<Reporte> {
        self.estado
            .lock()
            .unwrap()
            .por_sucursal
            .get(&sucursal_id)
            .cloned()
    }

    pub fn error(&self) -> Option<String> {
        self.estado.lock().unwrap().error.clone()
    }

    pub fn cargando(&self) -> bool {
        self.estado.lock().unwrap().cargando
    }

    /// Reporte que corresponde mostrar: para no-admin siempre el propio; para
    /// admin el de la sucursal filtrada si hay filtro, si no el general.
    pub fn current_report(&self) -> Option<Reporte> {
        let es_admin = self.session.es_admin();
        let estado = self.estado.lock().unwrap();
        if es_admin {
            if let Some(id) = estado.filtro_sucursal {
                return estado.por_sucursal.get(&id).cloned();
            }
        }
        estado.reporte_general.clone()
    }

    // -- Operaciones --

    /// Trae los reportes del rango vigente según el rol del principal.
    ///
    /// Admin: tres fetches concurrentes (general, por sucursal, KPIs), todo o
    /// nada — si cualquiera falla queda el estado anterior y solo se setea el
    /// error. No-admin: un único fetch de actividad propia; el mapa por
    /// sucursal y los KPIs se limpian porque no aplican a ese rol.
    pub async fn load_reports(&self) -> Result<(), ApiError> {
        let principal = guard::require_session(&self.session)?;
        let rango = self.rango();
        let query = vec![
            ("inicio".to_string(), rango.inicio),
            ("fin".to_string(), rango.fin),
        ];

        {
            let mut estado = self.estado.lock().unwrap();
            estado.cargando = true;
        }

        let resultado = if principal.es_admin() {
            self.cargar_admin(query).await
        } else {
            self.cargar_propio(query).await
        };

        let mut estado = self.estado.lock().unwrap();
        estado.cargando = false;
        if let Err(e) = &resultado {
            log_warn!("REPORTE", &format!("Carga de reportes falló: {}", e));
            estado.error = Some(e.to_string());
        }
        resultado
    }

    async fn cargar_admin(&self, query: Vec<(String, String)>) -> Result<(), ApiError> {
        let general = self
            .api
            .get_con_query::<Reporte>("/reportes/general", query.clone());
        let por_sucursal = self
            .api
            .get_con_query::<Vec<ReporteSucursal>>("/reportes/por-sucursal", query.clone());
        let kpis = self.api.get_con_query::<Kpis>("/reportes/kpis", query);

        let (general, por_sucursal, kpis) = tokio::try_join!(general, por_sucursal, kpis)?;

        let mapa: HashMap<i64, Reporte> = por_sucursal
            .into_iter()
            .map(|r| (r.sucursal_id, r.reporte))
            .collect();

        let mut estado = self.estado.lock().unwrap();
        estado.reporte_general = Some(general);
        estado.por_sucursal = mapa;
        estado.kpis = Some(kpis);
        estado.error = None;
        Ok(())
    }

    async fn cargar_propio(&self, query: Vec<(String, String)>) -> Result<(), ApiError> {
        let propio = self
            .api
            .get_con_query::<Reporte>("/reportes/por-fecha", query)
            .await?;

        let mut estado = self.estado.lock().unwrap();
        estado.reporte_general = Some(propio);
        estado.por_sucursal.clear();
        estado.kpis = None;
        estado.error = None;
        Ok(())
    }

    /// Cambia el rango de fechas; el cambio de filtro dispara el refetch.
    pub async fn set_date_range(&self, inicio: &str, fin: &str) -> Result<(), ApiError> {
        validation::validate_rango_fechas(inicio, fin).map_err(ApiError::Validation)?;

        {
            let mut estado = self.estado.lock().unwrap();
            estado.rango = RangoFechas {
                inicio: inicio.to_string(),
                fin: fin.to_string(),
            };
        }

        self.load_reports().await
    }

    /// Cambia qué reporte cacheado devuelve `current_report` para un admin.
    /// No refetchea: los datos de todas las sucursales ya se trajeron juntos.
    pub fn set_branch_filter(&self, filtro: Option<i64>) {
        self.estado.lock().unwrap().filtro_sucursal = filtro;
    }
}
