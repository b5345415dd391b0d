use std::env;
use std::fs;
use std::path::Path;

use bakehouse_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let sources = SourceLookup { doc: config_file_doc.as_ref(), path: config_file_path.as_deref() };

    let fields: Vec<(&str, String, &[&str])> = vec![
        ("database.url", config.database.url.clone(), &["BAKEHOUSE_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["BAKEHOUSE_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["BAKEHOUSE_DATABASE_TIMEOUT_SECS"],
        ),
        ("server.bind_address", config.server.bind_address.clone(), &["BAKEHOUSE_SERVER_BIND_ADDRESS"]),
        ("server.port", config.server.port.to_string(), &["BAKEHOUSE_SERVER_PORT"]),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["BAKEHOUSE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        (
            "clients.lookup_policy",
            config.clients.lookup_policy.as_str().to_string(),
            &["BAKEHOUSE_CLIENTS_LOOKUP_POLICY"],
        ),
        (
            "clients.phone_matching",
            config.clients.phone_matching.as_str().to_string(),
            &["BAKEHOUSE_CLIENTS_PHONE_MATCHING"],
        ),
        (
            "clients.search_default_limit",
            config.clients.search_default_limit.to_string(),
            &["BAKEHOUSE_CLIENTS_SEARCH_DEFAULT_LIMIT"],
        ),
        (
            "clients.search_max_limit",
            config.clients.search_max_limit.to_string(),
            &["BAKEHOUSE_CLIENTS_SEARCH_MAX_LIMIT"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["BAKEHOUSE_LOGGING_LEVEL", "BAKEHOUSE_LOG_LEVEL"],
        ),
        (
            "logging.format",
            config.logging.format.as_str().to_string(),
            &["BAKEHOUSE_LOGGING_FORMAT", "BAKEHOUSE_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(
        fields
            .iter()
            .map(|(key, value, env_keys)| render_line(key, value, sources.describe(key, env_keys))),
    );
    lines.join("\n")
}

struct SourceLookup<'a> {
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

impl SourceLookup<'_> {
    fn describe(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if self.doc.is_some_and(|doc| contains_path(doc, key_path)) {
            let file_path = self
                .path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }

        "default".to_string()
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
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

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::{contains_path, render_line};
    use toml::Value;

    #[test]
    fn nested_keys_are_found_in_file_documents() {
        let doc: Value = "[clients]\nlookup_policy = \"fail_closed\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "clients.lookup_policy"));
        assert!(!contains_path(&doc, "clients.phone_matching"));
        assert!(!contains_path(&doc, "server.port"));
    }

    #[test]
    fn lines_name_their_source() {
        assert_eq!(
            render_line("server.port", "8080", "default".to_string()),
            "- server.port = 8080 (source: default)"
        );
    }
}
