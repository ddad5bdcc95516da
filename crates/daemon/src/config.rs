// Application configuration (YAML file + RPCGATE_* environment)

use anyhow::{anyhow, Context, Result};
use ::config::{Config, Environment, File, FileFormat, Map, Source, Value};
use rpcgate_api_http::handler::DEFAULT_MAX_BODY_BYTES;
use rpcgate_core::application::validation::{in_range, require_non_empty, ValidationError};
use rpcgate_core::application::DEFAULT_REQUIRED_HEADER;
use rpcgate_core::domain::Language;
use serde::Deserialize;

/// Overrides the config file location
pub const CONFIG_PATH_ENV: &str = "RPCGATE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const ENV_PREFIX: &str = "RPCGATE";
const ENV_NAME_KEY: &str = "env.name";
const DEFAULT_ENVIRONMENT: &str = "dev";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Section the values were read from (`dev`, `test`, `stg`, `prd`)
    #[serde(skip)]
    pub environment: String,
    pub http: HttpConfig,
    pub logger: LoggerConfig,
    pub locale: LocaleConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin
    pub cors: String,
    pub request_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors: String::new(),
            request_timeout_secs: 30,
            shutdown_grace_secs: 30,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub debug: bool,
    pub log_json: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    pub utc_offset_hours: i32,
    pub language: Language,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 9,
            language: Language::Ja,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Empty disables the check
    pub required_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            required_header: DEFAULT_REQUIRED_HEADER.to_string(),
        }
    }
}

impl AuthConfig {
    pub fn required_header(&self) -> Option<String> {
        let name = self.required_header.trim();
        (!name.is_empty()).then(|| name.to_ascii_lowercase())
    }
}

impl AppConfig {
    /// Load from `$RPCGATE_CONFIG` (default `config.yaml`, optional) and the
    /// process environment.
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let file = File::new(&path, FileFormat::Yaml).required(false);
        Self::load_from(file, environment())
            .with_context(|| format!("failed to load configuration from '{}'", path))
    }

    /// Load from explicit sources; the file holds one section per environment
    /// and `env.name` picks the section.
    pub fn load_from<S>(file: S, env: Environment) -> Result<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        let raw = Config::builder()
            .add_source(file)
            .add_source(env.clone())
            .build()?;

        let name = raw
            .get_string(ENV_NAME_KEY)
            .unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string());
        let section: Map<String, Value> = raw
            .get_table(&name)
            .map_err(|_| anyhow!("unknown environment '{}'", name))?;

        // Section values first, then environment overrides on top
        let mut builder = Config::builder();
        for (key, value) in section {
            builder = builder.set_default(key, value)?;
        }
        let mut config: AppConfig = builder.add_source(env).build()?.try_deserialize()?;
        config.environment = name;

        config
            .validate()
            .map_err(|e| anyhow!("invalid configuration: {}", e))?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        require_non_empty("http.cors", &self.http.cors)?;
        in_range("http.port", self.http.port, 1, u16::MAX)?;
        in_range("http.max_body_bytes", self.http.max_body_bytes, 1, usize::MAX)?;
        in_range("locale.utc_offset_hours", self.locale.utc_offset_hours, -12, 14)?;
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }
}

/// `RPCGATE_HTTP__PORT=9000` → `http.port`
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
