use crate::error::{Error, Result};
use crate::lifecycle::TransitionPolicy;
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub webhook_secret: String,
    pub api_rps: u32,
    pub transition_policy: TransitionPolicy,
    pub state_webhook_url: Option<String>,
    pub slot_suggestion_count: usize,
    pub workday_start_hour: u32,
    pub workday_end_hour: u32,
    pub cors_allowed_origins: Vec<String>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let config = Self {
            server_address: get_env("SERVER_ADDRESS")?,
            webhook_secret: get_env("WEBHOOK_SECRET")?,
            api_rps: get_env_parse("API_RPS")?,
            transition_policy: get_env_parse_or("TRANSITION_POLICY", TransitionPolicy::Strict)?,
            state_webhook_url: env::var("STATE_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            slot_suggestion_count: get_env_parse_or("SLOT_SUGGESTION_COUNT", 5)?,
            workday_start_hour: get_env_parse_or("WORKDAY_START_HOUR", 9)?,
            workday_end_hour: get_env_parse_or("WORKDAY_END_HOUR", 17)?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        };
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.workday_end_hour > 24 || self.workday_start_hour >= self.workday_end_hour {
            return Err(Error::Config(format!(
                "Invalid working hours: {}..{}",
                self.workday_start_hour, self.workday_end_hour
            )));
        }
        if self.slot_suggestion_count == 0 {
            return Err(Error::Config(
                "SLOT_SUGGESTION_COUNT must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(_) => get_env_parse(name),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
