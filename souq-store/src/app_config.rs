use std::collections::HashMap;
use std::env;

use serde::Deserialize;
use souq_shared::CurrencyTable;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub kafka: KafkaConfig,
    pub storefront: StorefrontConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

/// Storefront business settings. Exchange-rate overrides are layered on top
/// of the built-in table so deployments can pin rates without a rebuild.
#[derive(Debug, Deserialize, Clone)]
pub struct StorefrontConfig {
    #[serde(default = "default_currency")]
    pub default_currency: String,
    #[serde(default)]
    pub exchange_rates: HashMap<String, f64>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl StorefrontConfig {
    pub fn currency_table(&self) -> CurrencyTable {
        let mut table = CurrencyTable::with_defaults();
        for (code, rate) in &self.exchange_rates {
            table.set_rate(code, *rate);
        }
        table
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment-specific file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `SOUQ__SERVER__PORT=9090`
            .add_source(config::Environment::with_prefix("SOUQ").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_overrides_layer_on_defaults() {
        let storefront = StorefrontConfig {
            default_currency: "JOD".to_string(),
            exchange_rates: HashMap::from([("JOD".to_string(), 0.71)]),
        };
        let table = storefront.currency_table();
        assert_eq!(table.rate("JOD"), Some(0.71));
        assert_eq!(table.rate("USD"), Some(1.0));
    }
}
