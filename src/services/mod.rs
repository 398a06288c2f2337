pub mod auth_service;
pub mod data_service;
pub mod keep_alive;
pub mod leaderboard;

pub use auth_service::{AuthService, AuthServiceError, LogOrphanedIdentity, OrphanedIdentity, OrphanedIdentityHook};
pub use data_service::{DataError, DataService};
pub use keep_alive::{KeepAliveService, Scheduler, KEEP_ALIVE_JOB};
pub use leaderboard::{LeaderboardError, LeaderboardService, RankedScore};
