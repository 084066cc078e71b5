use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ModelVariant, Strictness};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub providers: ProvidersConfig,
    pub server: ServerConfig,
    pub model: ModelSettings,
    pub collection: CollectionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ProvidersConfig {
    pub amadeus: ProviderConfig,
    pub skylink: ProviderConfig,
    pub kiwi: ProviderConfig,
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_check_port: u16,
}

#[derive(Clone, Debug)]
pub struct ModelSettings {
    pub variant: ModelVariant,
    pub strictness: Strictness,
}

#[derive(Clone, Debug)]
pub struct CollectionConfig {
    pub currency: String,
    pub sample_delay_ms: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub model_variant: Option<ModelVariant>,
    pub strictness: Option<Strictness>,
    pub sample_delay_ms: Option<u64>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://farecast.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            providers: ProvidersConfig {
                amadeus: ProviderConfig {
                    enabled: false,
                    base_url: "https://api.amadeus.test/v2".to_string(),
                    api_key: None,
                },
                skylink: ProviderConfig {
                    enabled: false,
                    base_url: "https://partners.skylink.test/v1".to_string(),
                    api_key: None,
                },
                kiwi: ProviderConfig {
                    enabled: false,
                    base_url: "https://api.tequila.kiwi.test".to_string(),
                    api_key: None,
                },
                request_timeout_secs: 10,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                health_check_port: 8081,
            },
            model: ModelSettings {
                variant: ModelVariant::Standard,
                strictness: Strictness::Balanced,
            },
            collection: CollectionConfig { currency: "USD".to_string(), sample_delay_ms: 200 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("farecast.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(providers) = patch.providers {
            apply_provider_patch(&mut self.providers.amadeus, providers.amadeus);
            apply_provider_patch(&mut self.providers.skylink, providers.skylink);
            apply_provider_patch(&mut self.providers.kiwi, providers.kiwi);
            if let Some(timeout) = providers.request_timeout_secs {
                self.providers.request_timeout_secs = timeout;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
        }

        if let Some(model) = patch.model {
            if let Some(variant) = model.variant {
                self.model.variant = variant;
            }
            if let Some(strictness) = model.strictness {
                self.model.strictness = strictness;
            }
        }

        if let Some(collection) = patch.collection {
            if let Some(currency) = collection.currency {
                self.collection.currency = currency;
            }
            if let Some(delay) = collection.sample_delay_ms {
                self.collection.sample_delay_ms = delay;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("FARECAST_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(level) = env::var("FARECAST_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("FARECAST_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        if let Ok(port) = env::var("FARECAST_SERVER_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "FARECAST_SERVER_PORT".to_string(),
                value: port,
            })?;
        }
        if let Ok(key) = env::var("FARECAST_AMADEUS_API_KEY") {
            self.providers.amadeus.api_key = Some(key.into());
        }
        if let Ok(key) = env::var("FARECAST_SKYLINK_API_KEY") {
            self.providers.skylink.api_key = Some(key.into());
        }
        if let Ok(key) = env::var("FARECAST_KIWI_API_KEY") {
            self.providers.kiwi.api_key = Some(key.into());
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.database_url {
            self.database.url = url;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(variant) = overrides.model_variant {
            self.model.variant = variant;
        }
        if let Some(strictness) = overrides.strictness {
            self.model.strictness = strictness;
        }
        if let Some(delay) = overrides.sample_delay_ms {
            self.collection.sample_delay_ms = delay;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.collection.currency.len() != 3 {
            return Err(ConfigError::Validation(format!(
                "collection.currency must be a three-letter code, got `{}`",
                self.collection.currency
            )));
        }
        for (name, provider) in [
            ("amadeus", &self.providers.amadeus),
            ("skylink", &self.providers.skylink),
            ("kiwi", &self.providers.kiwi),
        ] {
            if provider.enabled && provider.api_key.is_none() {
                return Err(ConfigError::Validation(format!(
                    "providers.{name} is enabled but has no api_key"
                )));
            }
        }
        Ok(())
    }
}

fn apply_provider_patch(target: &mut ProviderConfig, patch: Option<ProviderPatch>) {
    let Some(patch) = patch else { return };
    if let Some(enabled) = patch.enabled {
        target.enabled = enabled;
    }
    if let Some(base_url) = patch.base_url {
        target.base_url = base_url;
    }
    if let Some(api_key) = patch.api_key {
        target.api_key = Some(api_key.into());
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    let default = PathBuf::from("farecast.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let contents = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&contents)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    providers: Option<ProvidersPatch>,
    server: Option<ServerPatch>,
    model: Option<ModelPatch>,
    collection: Option<CollectionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ProvidersPatch {
    amadeus: Option<ProviderPatch>,
    skylink: Option<ProviderPatch>,
    kiwi: Option<ProviderPatch>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderPatch {
    enabled: Option<bool>,
    base_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    health_check_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct ModelPatch {
    variant: Option<ModelVariant>,
    strictness: Option<Strictness>,
}

#[derive(Debug, Default, Deserialize)]
struct CollectionPatch {
    currency: Option<String>,
    sample_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
