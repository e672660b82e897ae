pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod logger;
pub mod models;
pub mod storage;
pub mod stores;
pub mod validation;

use std::path::Path;
use std::sync::Arc;

use api::{ApiClient, ReqwestTransport};
use auth::SessionStore;
use config::AppConfig;
use errors::ApiError;
use storage::Storage;
use stores::{AdminStore, GastoStore, MenuStore, ReportStore};

/// Grafo de la aplicación. Se construye una sola vez al arrancar y los
/// consumidores reciben referencias: no hay instancia global ni lookup
/// implícito que pueda fallar en runtime — usar un store antes de construir
/// el contexto directamente no compila.
pub struct AppContext {
    pub config: AppConfig,
    pub storage: Arc<Storage>,
    pub api: Arc<ApiClient>,
    pub session: Arc<SessionStore>,
    pub menu: Arc<MenuStore>,
    pub reportes: Arc<ReportStore>,
    pub admin: Arc<AdminStore>,
    pub gastos: Arc<GastoStore>,
}

impl AppContext {
    /// Construye el grafo con la configuración del entorno.
    pub fn new(app_data_dir: &Path) -> Result<Self, ApiError> {
        Self::with_config(app_data_dir, AppConfig::load())
    }

    pub fn with_config(app_data_dir: &Path, config: AppConfig) -> Result<Self, ApiError> {
        config.validate().map_err(ApiError::Validation)?;

        if let Err(e) = logger::init_global_logger(app_data_dir, config.logging.clone()) {
            eprintln!("⚠️  No se pudo inicializar el logger: {}", e);
        }

        log_info!(
            "APP",
            "Cliente iniciando",
            serde_json::json!({
                "version": config.version,
                "environment": config.environment.as_str(),
                "api": config.api.base_url,
            })
        );

        let storage = Arc::new(Storage::new(&config.get_storage_dir(app_data_dir))?);
        let transport = Arc::new(ReqwestTransport::new(&config.api)?);
        let api = Arc::new(ApiClient::new(transport, storage.clone()));

        let session = Arc::new(SessionStore::new(api.clone(), storage.clone()));
        let menu = Arc::new(MenuStore::new(api.clone()));
        let reportes = Arc::new(ReportStore::new(api.clone(), session.clone()));
        let admin = Arc::new(AdminStore::new(api.clone(), session.clone()));
        let gastos = Arc::new(GastoStore::new(api.clone(), session.clone()));

        Ok(Self {
            config,
            storage,
            api,
            session,
            menu,
            reportes,
            admin,
            gastos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn el_contexto_arranca_sin_sesion() {
        let dir = tempdir().unwrap();
        let ctx = AppContext::with_config(dir.path(), AppConfig::load()).unwrap();

        assert!(!ctx.session.is_authenticated());
        assert!(!ctx.session.check_auth());
        assert!(ctx.menu.carrito().is_empty());
    }
}
