use crate::app_config::{AppConfig, Environment};
use crate::strategy::StrategyMode;
use crate::ConfigError;

const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let env = parse_environment(&or_default("RATEWATCH_ENV", "development"))?;
    let log_level = or_default("RATEWATCH_LOG_LEVEL", "info");
    let hotels_path = PathBuf::from(or_default("RATEWATCH_HOTELS_PATH", "./config/hotels.yaml"));

    let webdriver_url = or_default("RATEWATCH_WEBDRIVER_URL", "http://localhost:9515");
    if !(webdriver_url.starts_with("http://") || webdriver_url.starts_with("https://")) {
        return Err(invalid(
            "RATEWATCH_WEBDRIVER_URL",
            format!("expected an http(s) URL, got '{webdriver_url}'"),
        ));
    }
    let headless = parse_bool("RATEWATCH_HEADLESS", "true")?;

    let user_agents = match lookup("RATEWATCH_USER_AGENTS") {
        Ok(raw) => raw
            .split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>(),
        Err(_) => DEFAULT_USER_AGENTS.iter().map(|s| (*s).to_string()).collect(),
    };
    if user_agents.is_empty() {
        return Err(invalid(
            "RATEWATCH_USER_AGENTS",
            "at least one user agent is required".to_string(),
        ));
    }

    let browser_locale = or_default("RATEWATCH_BROWSER_LOCALE", "fr-FR");
    let browser_timezone = or_default("RATEWATCH_BROWSER_TIMEZONE", "Europe/Paris");
    let navigation_timeout_secs = parse_u64("RATEWATCH_NAVIGATION_TIMEOUT_SECS", "25")?;

    let parallel_workers = parse_usize("RATEWATCH_PARALLEL_WORKERS", "2")?;
    if parallel_workers == 0 {
        return Err(invalid(
            "RATEWATCH_PARALLEL_WORKERS",
            "must be at least 1".to_string(),
        ));
    }

    let hotel_pause_min_ms = parse_u64("RATEWATCH_HOTEL_PAUSE_MIN_MS", "5000")?;
    let hotel_pause_max_ms = parse_u64("RATEWATCH_HOTEL_PAUSE_MAX_MS", "12000")?;
    if hotel_pause_min_ms > hotel_pause_max_ms {
        return Err(ConfigError::Validation(format!(
            "RATEWATCH_HOTEL_PAUSE_MIN_MS ({hotel_pause_min_ms}) exceeds RATEWATCH_HOTEL_PAUSE_MAX_MS ({hotel_pause_max_ms})"
        )));
    }

    let default_strategy = or_default("RATEWATCH_DEFAULT_STRATEGY", "isolated")
        .parse::<StrategyMode>()
        .map_err(|reason| invalid("RATEWATCH_DEFAULT_STRATEGY", reason))?;

    let snapshot_out = lookup("RATEWATCH_SNAPSHOT_OUT")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);

    let schedule_session1_cron = or_default("RATEWATCH_SCHEDULE_SESSION1_CRON", "0 0 6 * * *");
    let schedule_session2_cron = or_default("RATEWATCH_SCHEDULE_SESSION2_CRON", "0 30 6 * * *");

    Ok(AppConfig {
        env,
        log_level,
        hotels_path,
        webdriver_url,
        headless,
        user_agents,
        browser_locale,
        browser_timezone,
        navigation_timeout_secs,
        parallel_workers,
        hotel_pause_min_ms,
        hotel_pause_max_ms,
        default_strategy,
        snapshot_out,
        schedule_session1_cron,
        schedule_session2_cron,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "RATEWATCH_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}
