use std::sync::Arc;

use crate::backend::Backends;
use crate::config::AppConfig;
use crate::schema::SchemaRegistry;
use crate::services::{AuthService, DataService, KeepAliveService, LeaderboardService, Scheduler};

/// Everything a handler needs, built once at startup.
pub struct AppState {
    pub config: AppConfig,
    pub registry: Arc<SchemaRegistry>,
    pub data: DataService,
    pub auth: AuthService,
    pub leaderboard: LeaderboardService,
    pub keep_alive: KeepAliveService,
    pub scheduler: Scheduler,
}

impl AppState {
    pub fn new(config: AppConfig, registry: SchemaRegistry, backends: Backends) -> Self {
        let registry = Arc::new(registry);
        let data = DataService::new(registry.clone(), backends.store);
        let auth = AuthService::new(backends.identity, data.clone());
        let leaderboard = LeaderboardService::new(data.clone());
        let keep_alive = KeepAliveService::new(data.clone(), config.keep_alive.table.clone());

        Self {
            config,
            registry,
            data,
            auth,
            leaderboard,
            keep_alive,
            scheduler: Scheduler::new(),
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
