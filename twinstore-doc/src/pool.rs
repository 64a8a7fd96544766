use std::time::Duration;

use dashmap::DashMap;
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use mongodb::{Client, Database};

use twinstore_common::config::doc_config::{DocConnectionMode, DocSourceConfig};
use twinstore_common::err::{CoreError, CoreResult};

/// One configured Mongo data source: the client (which owns its own internal
/// connection pool per the driver's own contract), the default database
/// handle, and the config it was built from.
pub struct DocDataSource {
    pub client: Client,
    pub database: Database,
    pub config: DocSourceConfig,
}

/// Process-wide table of named Mongo data sources, populated by `init_doc`.
#[derive(Default)]
pub struct DocDataSourceRegistry {
    sources: DashMap<String, DocDataSource>,
}

impl DocDataSourceRegistry {
    pub fn new() -> Self {
        DocDataSourceRegistry::default()
    }

    /// Unlike `DataSourceRegistry::register` on the RDB side, this is async:
    /// a `connection_uri` with a `mongodb+srv://` scheme requires a DNS seed
    /// -list lookup before `ClientOptions` can be built.
    pub async fn register(&self, config: DocSourceConfig) -> CoreResult<()> {
        let mut opts = match &config.connection {
            DocConnectionMode::Uri { connection_uri } => ClientOptions::parse(connection_uri)
                .await
                .map_err(|e| CoreError::ConfigError(format!("invalid connection_uri: {e}")))?,
            DocConnectionMode::Addrs {
                addrs,
                direct,
                username,
                password,
                auth_mechanism,
                auth_source,
            } => {
                let hosts = addrs
                    .iter()
                    .map(|a| ServerAddress::parse(a))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| CoreError::ConfigError(format!("invalid addrs entry: {e}")))?;

                let mut builder = ClientOptions::builder().hosts(hosts).direct_connection(*direct);
                if let Some(username) = username {
                    let credential = Credential::builder()
                        .username(username.clone())
                        .password(password.clone())
                        .source(auth_source.clone())
                        .mechanism(parse_auth_mechanism(auth_mechanism))
                        .build();
                    builder = builder.credential(credential);
                }
                builder.build()
            }
        };

        opts.max_pool_size = Some(config.pool_max);
        opts.min_pool_size = Some(config.pool_min);
        opts.connect_timeout = Some(Duration::from_secs(config.connect_timeout_s));
        opts.server_selection_timeout = Some(Duration::from_secs(config.server_selection_timeout_s));
        opts.heartbeat_freq = Some(Duration::from_secs(config.heartbeat_interval_s));
        opts.max_idle_time = Some(Duration::from_secs(config.max_conn_idle_time_s));

        let client = Client::with_options(opts).map_err(|e| CoreError::ConfigError(format!("mongo client build failed: {e}")))?;
        let database = client.database(&config.database);
        let ds_name = config.ds_name.clone();
        self.sources.insert(ds_name, DocDataSource { client, database, config });
        Ok(())
    }

    pub fn database(&self, ds_name: &str) -> CoreResult<Database> {
        self.sources
            .get(ds_name)
            .map(|e| e.database.clone())
            .ok_or_else(|| CoreError::DataSourceNotFound(ds_name.to_string()))
    }

    pub fn client(&self, ds_name: &str) -> CoreResult<Client> {
        self.sources
            .get(ds_name)
            .map(|e| e.client.clone())
            .ok_or_else(|| CoreError::DataSourceNotFound(ds_name.to_string()))
    }

    pub fn config_of(&self, ds_name: &str) -> CoreResult<DocSourceConfig> {
        self.sources
            .get(ds_name)
            .map(|e| e.config.clone())
            .ok_or_else(|| CoreError::DataSourceNotFound(ds_name.to_string()))
    }
}

fn parse_auth_mechanism(name: &str) -> mongodb::options::AuthMechanism {
    use mongodb::options::AuthMechanism;
    match name {
        "SCRAM-SHA-256" => AuthMechanism::ScramSha256,
        "MONGODB-X509" => AuthMechanism::MongoDbX509,
        "PLAIN" => AuthMechanism::Plain,
        _ => AuthMechanism::ScramSha1,
    }
}
