use crate::config::AppConfig;
use crate::users::repo::UserStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<UserStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Fresh, empty store. Nothing survives a restart.
    pub fn init(config: AppConfig) -> Self {
        Self::from_parts(Arc::new(UserStore::new()), Arc::new(config))
    }

    pub fn from_parts(store: Arc<UserStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::init(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            log_filter: "usermgmt=debug".into(),
            json_logs: false,
            cors_permissive: true,
        })
    }
}
