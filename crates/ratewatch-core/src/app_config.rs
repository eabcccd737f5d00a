use std::path::PathBuf;

use crate::strategy::StrategyMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub hotels_path: PathBuf,
    /// Base URL of the WebDriver endpoint (chromedriver, geckodriver, grid).
    pub webdriver_url: String,
    pub headless: bool,
    /// Pool of user agents; one is drawn at random per browser session.
    pub user_agents: Vec<String>,
    pub browser_locale: String,
    pub browser_timezone: String,
    pub navigation_timeout_secs: u64,
    pub parallel_workers: usize,
    pub hotel_pause_min_ms: u64,
    pub hotel_pause_max_ms: u64,
    pub default_strategy: StrategyMode,
    /// Where collected snapshots are written; `None` means stdout.
    pub snapshot_out: Option<PathBuf>,
    pub schedule_session1_cron: String,
    pub schedule_session2_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("hotels_path", &self.hotels_path)
            .field("webdriver_url", &self.webdriver_url)
            .field("headless", &self.headless)
            .field("user_agents", &self.user_agents.len())
            .field("browser_locale", &self.browser_locale)
            .field("browser_timezone", &self.browser_timezone)
            .field("navigation_timeout_secs", &self.navigation_timeout_secs)
            .field("parallel_workers", &self.parallel_workers)
            .field("hotel_pause_min_ms", &self.hotel_pause_min_ms)
            .field("hotel_pause_max_ms", &self.hotel_pause_max_ms)
            .field("default_strategy", &self.default_strategy)
            .field("snapshot_out", &self.snapshot_out)
            .field("schedule_session1_cron", &self.schedule_session1_cron)
            .field("schedule_session2_cron", &self.schedule_session2_cron)
            .finish()
    }
}
