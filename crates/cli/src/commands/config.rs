use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use platano_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let entries = [
        (
            "storage.path",
            config.storage.path.display().to_string(),
            source("storage.path", &["PLATANO_STORAGE_PATH"]),
        ),
        (
            "discord.token",
            redact_token(config.discord.token.expose_secret()),
            source("discord.token", &["PLATANO_DISCORD_TOKEN", "DISCORD_TOKEN"]),
        ),
        (
            "discord.client_id",
            config.discord.client_id.clone(),
            source("discord.client_id", &["PLATANO_DISCORD_CLIENT_ID", "CLIENT_ID"]),
        ),
        (
            "gif.enabled",
            config.gif.enabled.to_string(),
            source("gif.enabled", &["PLATANO_GIF_ENABLED"]),
        ),
        (
            "gif.base_url",
            config.gif.base_url.clone(),
            source("gif.base_url", &["PLATANO_GIF_BASE_URL"]),
        ),
        (
            "gif.timeout_secs",
            config.gif.timeout_secs.to_string(),
            source("gif.timeout_secs", &["PLATANO_GIF_TIMEOUT_SECS"]),
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            source("server.bind_address", &["PLATANO_SERVER_BIND_ADDRESS"]),
        ),
        (
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            source("server.health_check_port", &["PLATANO_SERVER_HEALTH_CHECK_PORT"]),
        ),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            source("server.graceful_shutdown_secs", &["PLATANO_SERVER_GRACEFUL_SHUTDOWN_SECS"]),
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            source("logging.level", &["PLATANO_LOGGING_LEVEL", "PLATANO_LOG_LEVEL"]),
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            source("logging.format", &["PLATANO_LOGGING_FORMAT", "PLATANO_LOG_FORMAT"]),
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(entries.iter().map(|(key, value, source)| render_line(key, value, source)));
    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: &str) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the first four characters of long tokens so operators can tell
/// which credential is loaded.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if trimmed.chars().count() > 12 {
        let prefix: String = trimmed.chars().take(4).collect();
        return format!("{prefix}***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, redact_token, render_line};

    #[test]
    fn tokens_are_never_rendered_in_full() {
        assert_eq!(redact_token("   "), "<empty>");
        assert_eq!(redact_token("short"), "<redacted>");
        assert_eq!(redact_token("MTAxNjg0.GhIjKl.very-secret-part"), "MTAx***");
    }

    #[test]
    fn nested_keys_are_found_in_file_documents() {
        let doc: Value = "[storage]\npath = \"x.json\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "storage.path"));
        assert!(!contains_path(&doc, "discord.token"));
    }

    #[test]
    fn lines_show_key_value_and_source() {
        assert_eq!(
            render_line("gif.enabled", "true", "default"),
            "- gif.enabled = true (source: default)"
        );
    }
}
