use dotenv::dotenv;

pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub log_json: bool,
    pub request_timeout_secs: u64,
    pub retention_days: i64,
    pub sufficiency_ratio: f64,
    pub retry_attempts: u32,
    pub default_quote: String,
    pub fetch_budget_secs: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv().ok();

        Ok(Config {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/historical_data.db".to_string()),
            bind_addr: std::env::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:9999".to_string()),
            log_json: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", 30)?,
            retention_days: parse_var("RETENTION_DAYS", 90)?,
            sufficiency_ratio: parse_var("SUFFICIENCY_RATIO", 0.8)?,
            retry_attempts: parse_var("RETRY_ATTEMPTS", 3)?,
            default_quote: std::env::var("DEFAULT_QUOTE")
                .unwrap_or_else(|_| "USDT".to_string())
                .to_uppercase(),
            fetch_budget_secs: match std::env::var("FETCH_BUDGET_SECS") {
                Ok(_) => Some(parse_var("FETCH_BUDGET_SECS", 0)?),
                Err(_) => None,
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/historical_data.db".to_string(),
            bind_addr: "0.0.0.0:9999".to_string(),
            log_json: false,
            request_timeout_secs: 30,
            retention_days: 90,
            sufficiency_ratio: 0.8,
            retry_attempts: 3,
            default_quote: "USDT".to_string(),
            fetch_budget_secs: None,
        }
    }
}

/// Read an optional numeric variable, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: T) -> Result<T, anyhow::Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {}: {} ({})", name, raw, e)),
        Err(_) => Ok(default),
    }
}
