use serde::{Deserialize, Serialize};

fn default_ds_name() -> String {
    "master".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_charset() -> String {
    "utf8mb4".to_string()
}

fn default_max_idle_conns() -> u32 {
    8
}

fn default_max_open_conns() -> u32 {
    32
}

fn default_conn_max_lifetime_s() -> u64 {
    600
}

/// One `init_sql` entry describing a single MySQL data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlSourceConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,

    #[serde(default = "default_ds_name")]
    pub ds_name: String,

    #[serde(default = "default_max_idle_conns")]
    pub max_idle_conns: u32,
    #[serde(default = "default_max_open_conns")]
    pub max_open_conns: u32,
    #[serde(default = "default_conn_max_lifetime_s")]
    pub conn_max_lifetime_s: u64,

    #[serde(default)]
    pub slow_query_ms: Option<u64>,
    #[serde(default)]
    pub slow_log_path: Option<String>,

    #[serde(default)]
    pub open_tx: bool,
    #[serde(default)]
    pub auto_id: bool,
    #[serde(default)]
    pub mongo_sync: bool,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_charset")]
    pub charset: String,
}

impl SqlSourceConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }
}
