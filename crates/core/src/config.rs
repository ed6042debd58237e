use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["platano.toml", "config/platano.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub discord: DiscordConfig,
    pub gif: GifConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub token: SecretString,
    pub client_id: String,
}

#[derive(Clone, Debug)]
pub struct GifConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
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

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub storage_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub discord_token: Option<String>,
    pub discord_client_id: Option<String>,
    pub gif_enabled: Option<bool>,
    pub gif_base_url: Option<String>,
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
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig { path: PathBuf::from("data/meetups.json") },
            discord: DiscordConfig { token: String::new().into(), client_id: String::new() },
            gif: GifConfig {
                enabled: true,
                base_url: "https://nekotina.com/api/v2".to_string(),
                timeout_secs: 5,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let config = Self::layered(options)?;
        config.validate()?;
        Ok(config)
    }

    /// Same layering as [`AppConfig::load`], but only the storage section is
    /// validated. Operator tooling that reads or repairs the meetup file does
    /// not need Discord credentials.
    pub fn load_storage(options: LoadOptions) -> Result<StorageConfig, ConfigError> {
        let config = Self::layered(options)?;
        validate_storage(&config.storage)?;
        Ok(config.storage)
    }

    fn layered(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(storage) = patch.storage {
            if let Some(path) = storage.path {
                self.storage.path = path;
            }
        }

        if let Some(discord) = patch.discord {
            if let Some(token) = discord.token {
                self.discord.token = token.into();
            }
            if let Some(client_id) = discord.client_id {
                self.discord.client_id = client_id;
            }
        }

        if let Some(gif) = patch.gif {
            if let Some(enabled) = gif.enabled {
                self.gif.enabled = enabled;
            }
            if let Some(base_url) = gif.base_url {
                self.gif.base_url = base_url;
            }
            if let Some(timeout_secs) = gif.timeout_secs {
                self.gif.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
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
        if let Some(value) = read_env("PLATANO_STORAGE_PATH") {
            self.storage.path = PathBuf::from(value);
        }

        // The bare names are what the bot has always read from `.env`.
        if let Some(value) = read_env("PLATANO_DISCORD_TOKEN").or_else(|| read_env("DISCORD_TOKEN"))
        {
            self.discord.token = value.into();
        }
        if let Some(value) =
            read_env("PLATANO_DISCORD_CLIENT_ID").or_else(|| read_env("CLIENT_ID"))
        {
            self.discord.client_id = value;
        }

        if let Some(value) = read_env("PLATANO_GIF_ENABLED") {
            self.gif.enabled = parse_bool("PLATANO_GIF_ENABLED", &value)?;
        }
        if let Some(value) = read_env("PLATANO_GIF_BASE_URL") {
            self.gif.base_url = value;
        }
        if let Some(value) = read_env("PLATANO_GIF_TIMEOUT_SECS") {
            self.gif.timeout_secs = parse_u64("PLATANO_GIF_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PLATANO_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PLATANO_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("PLATANO_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("PLATANO_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("PLATANO_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("PLATANO_LOGGING_LEVEL").or_else(|| read_env("PLATANO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PLATANO_LOGGING_FORMAT").or_else(|| read_env("PLATANO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(storage_path) = overrides.storage_path {
            self.storage.path = storage_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(token) = overrides.discord_token {
            self.discord.token = token.into();
        }
        if let Some(client_id) = overrides.discord_client_id {
            self.discord.client_id = client_id;
        }
        if let Some(enabled) = overrides.gif_enabled {
            self.gif.enabled = enabled;
        }
        if let Some(base_url) = overrides.gif_base_url {
            self.gif.base_url = base_url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_storage(&self.storage)?;
        validate_discord(&self.discord)?;
        validate_gif(&self.gif)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_storage(storage: &StorageConfig) -> Result<(), ConfigError> {
    if storage.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("storage.path must not be empty".to_string()));
    }
    if storage.path.file_name().is_none() {
        return Err(ConfigError::Validation(
            "storage.path must name a file (for example `data/meetups.json`)".to_string(),
        ));
    }
    Ok(())
}

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    if discord.token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "discord.token is required. Get it from https://discord.com/developers/applications > Your Application > Bot".to_string(),
        ));
    }

    let client_id = discord.client_id.trim();
    if client_id.is_empty() {
        return Err(ConfigError::Validation(
            "discord.client_id is required. Get it from https://discord.com/developers/applications > Your Application > General Information".to_string(),
        ));
    }
    if !client_id.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ConfigError::Validation(format!(
            "discord.client_id must be a numeric application id, got `{client_id}`"
        )));
    }

    Ok(())
}

fn validate_gif(gif: &GifConfig) -> Result<(), ConfigError> {
    if gif.timeout_secs == 0 || gif.timeout_secs > 60 {
        return Err(ConfigError::Validation("gif.timeout_secs must be in range 1..=60".to_string()));
    }

    if gif.enabled && !gif.base_url.starts_with("http://") && !gif.base_url.starts_with("https://")
    {
        return Err(ConfigError::Validation(
            "gif.base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    storage: Option<StoragePatch>,
    discord: Option<DiscordPatch>,
    gif: Option<GifPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    token: Option<String>,
    client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GifPatch {
    enabled: Option<bool>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
