use crate::config::AppConfig;
use crate::services::tier_scanner::TierScanner;
use std::time::Instant;

pub struct AppState {
    pub config: AppConfig,
    pub scanner: TierScanner,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let scanner = TierScanner::new(config.backups_root()).with_read_timeout(config.read_timeout);
        Self {
            config,
            scanner,
            started_at: Instant::now(),
        }
    }
}
