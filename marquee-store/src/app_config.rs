use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub reservation: ReservationRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReservationRules {
    /// How long a hold survives without payment confirmation.
    #[serde(default = "default_hold_seconds")]
    pub hold_seconds: u64,
}

fn default_hold_seconds() -> u64 {
    600
}

impl ReservationRules {
    pub fn hold_duration(&self) -> Duration {
        Duration::from_secs(self.hold_seconds)
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Settings from the environment (with a prefix of MARQUEE)
            // E.g. `MARQUEE__RESERVATION__HOLD_SECONDS=300`
            .add_source(config::Environment::with_prefix("MARQUEE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_duration_from_seconds() {
        let rules = ReservationRules { hold_seconds: 600 };
        assert_eq!(rules.hold_duration(), Duration::from_secs(600));
    }
}
