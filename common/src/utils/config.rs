use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct StoreAuth {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    Online,
    Offline,
    Auto,
}

fn default_service_mode() -> ServiceMode {
    ServiceMode::Auto
}

fn default_store_namespace() -> String {
    "formulation".to_string()
}

fn default_store_database() -> String {
    "formulation".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_embedding_batch_size() -> usize {
    96
}

fn default_admission_capacity() -> usize {
    3
}

fn default_admission_timeout_seconds() -> u64 {
    10
}

fn default_run_timeout_seconds() -> u64 {
    30
}

fn default_memory_budget_mb() -> u64 {
    600
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimension() -> usize {
    1536
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Every process-level configuration field named in the external interface,
/// plus the ambient fields (log level, service mode, HTTP port) the process
/// needs to stand up the rest of the stack. Loaded once at startup via
/// [`get_config`]: file source `config.{toml,json,yaml}` (optional) overlaid
/// by environment variables.
#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub store_uri: String,
    pub store_auth: StoreAuth,
    #[serde(default = "default_store_namespace")]
    pub store_namespace: String,
    #[serde(default = "default_store_database")]
    pub store_database: String,

    pub openai_api_key: String,
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_embedding_base_url")]
    pub embedding_base_url: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,
    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,

    #[serde(default = "default_admission_capacity")]
    pub admission_capacity: usize,
    #[serde(default = "default_admission_timeout_seconds")]
    pub admission_timeout_seconds: u64,
    #[serde(default = "default_run_timeout_seconds")]
    pub run_timeout_seconds: u64,
    #[serde(default = "default_memory_budget_mb")]
    pub memory_budget_mb: u64,

    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_service_mode")]
    pub service_mode: ServiceMode,
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default().separator("__"))
        .build()?;

    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied_when_env_supplies_only_required_fields() {
        // `try_deserialize` on a minimal Config with the serde defaults above
        // should not require anything beyond store_uri/auth/openai key.
        let raw = serde_json::json!({
            "store_uri": "mem://",
            "store_auth": {"username": "root", "password": "root"},
            "openai_api_key": "sk-test",
        });
        let config: AppConfig = serde_json::from_value(raw).expect("deserialize with defaults");
        assert_eq!(config.admission_capacity, 3);
        assert_eq!(config.run_timeout_seconds, 30);
        assert_eq!(config.memory_budget_mb, 600);
        assert_eq!(config.service_mode, ServiceMode::Auto);
    }
}
