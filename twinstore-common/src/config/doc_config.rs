use serde::{Deserialize, Serialize};

fn default_ds_name() -> String {
    "master".to_string()
}

fn default_pool_min() -> u32 {
    10
}

fn default_pool_max() -> u32 {
    100
}

fn default_max_connecting() -> u32 {
    10
}

fn default_connect_timeout_s() -> u64 {
    10
}

fn default_socket_timeout_s() -> u64 {
    30
}

fn default_server_selection_timeout_s() -> u64 {
    30
}

fn default_heartbeat_interval_s() -> u64 {
    10
}

fn default_max_conn_idle_time_s() -> u64 {
    60
}

fn default_max_conn_lifetime_s() -> u64 {
    600
}

fn default_auth_mechanism() -> String {
    "SCRAM-SHA-1".to_string()
}

fn default_timeout_ms() -> u64 {
    60_000
}

/// Either a single connection URI or a discrete address list describing
/// how to reach the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocConnectionMode {
    Uri { connection_uri: String },
    Addrs {
        addrs: Vec<String>,
        #[serde(default)]
        direct: bool,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
        #[serde(default = "default_auth_mechanism")]
        auth_mechanism: String,
        #[serde(default)]
        auth_source: Option<String>,
    },
}

/// One `init_doc` entry describing a single document-store data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocSourceConfig {
    #[serde(flatten)]
    pub connection: DocConnectionMode,

    pub database: String,

    #[serde(default = "default_ds_name")]
    pub ds_name: String,

    #[serde(default = "default_pool_min")]
    pub pool_min: u32,
    #[serde(default = "default_pool_max")]
    pub pool_max: u32,
    #[serde(default = "default_max_connecting")]
    pub max_connecting: u32,

    #[serde(default = "default_connect_timeout_s")]
    pub connect_timeout_s: u64,
    #[serde(default = "default_socket_timeout_s")]
    pub socket_timeout_s: u64,
    #[serde(default = "default_server_selection_timeout_s")]
    pub server_selection_timeout_s: u64,
    #[serde(default = "default_heartbeat_interval_s")]
    pub heartbeat_interval_s: u64,
    #[serde(default = "default_max_conn_idle_time_s")]
    pub max_conn_idle_time_s: u64,
    #[serde(default = "default_max_conn_lifetime_s")]
    pub max_conn_lifetime_s: u64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub slow_query_ms: Option<u64>,
    #[serde(default)]
    pub slow_log_path: Option<String>,
}

impl DocSourceConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg: DocSourceConfig = serde_yaml::from_str(
            "connection_uri: mongodb://localhost:27017\ndatabase: app\n",
        )
        .unwrap();
        assert_eq!(cfg.pool_min, 10);
        assert_eq!(cfg.pool_max, 100);
        assert_eq!(cfg.max_connecting, 10);
        assert_eq!(cfg.connect_timeout_s, 10);
        assert_eq!(cfg.socket_timeout_s, 30);
        assert_eq!(cfg.server_selection_timeout_s, 30);
        assert_eq!(cfg.heartbeat_interval_s, 10);
        assert_eq!(cfg.max_conn_idle_time_s, 60);
        assert_eq!(cfg.max_conn_lifetime_s, 600);
    }
}
