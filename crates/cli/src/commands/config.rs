use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;
use toolshare_core::config::{resolve_config_path, AppConfig, LoadOptions};

use crate::commands::CommandResult;

/// One rendered config key: dotted path, effective value, env vars that set it.
struct ConfigField {
    key_path: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl ConfigField {
    fn new(key_path: &'static str, value: String, env_keys: &'static [&'static str]) -> Self {
        Self { key_path, value, env_keys }
    }
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            let output = format!("config validation failed: {error}");
            return CommandResult { exit_code: 2, output };
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(effective_fields(&config).into_iter().map(|field| {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        render_line(field.key_path, &field.value, source)
    }));

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn effective_fields(config: &AppConfig) -> Vec<ConfigField> {
    let field = ConfigField::new;
    vec![
        field("database.url", config.database.url.clone(), &["TOOLSHARE_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["TOOLSHARE_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["TOOLSHARE_DATABASE_TIMEOUT_SECS"],
        ),
        field(
            "suggestion.debounce_ms",
            config.suggestion.debounce_ms.to_string(),
            &["TOOLSHARE_SUGGESTION_DEBOUNCE_MS"],
        ),
        field(
            "suggestion.min_title_chars",
            config.suggestion.min_title_chars.to_string(),
            &["TOOLSHARE_SUGGESTION_MIN_TITLE_CHARS"],
        ),
        field(
            "suggestion.request_timeout_ms",
            match config.suggestion.request_timeout_ms {
                0 => "<none>".to_string(),
                millis => millis.to_string(),
            },
            &["TOOLSHARE_SUGGESTION_REQUEST_TIMEOUT_MS"],
        ),
        field(
            "booking.collision_policy",
            config.booking.collision_policy.as_str().to_string(),
            &["TOOLSHARE_BOOKING_COLLISION_POLICY"],
        ),
        field(
            "listing.manual_url_prefix",
            config.listing.manual_url_prefix.clone(),
            &["TOOLSHARE_LISTING_MANUAL_URL_PREFIX"],
        ),
        field(
            "listing.min_images",
            config.listing.min_images.to_string(),
            &["TOOLSHARE_LISTING_MIN_IMAGES"],
        ),
        field(
            "listing.max_images",
            config.listing.max_images.to_string(),
            &["TOOLSHARE_LISTING_MAX_IMAGES"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["TOOLSHARE_LOGGING_LEVEL", "TOOLSHARE_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["TOOLSHARE_LOGGING_FORMAT", "TOOLSHARE_LOG_FORMAT"],
        ),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
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

    if config_file_doc.is_some_and(|doc| contains_path(doc, key_path)) {
        let file_path = config_file_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("config file"));
        return format!("file ({})", file_path.display());
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

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use toml::Value;

    use super::{contains_path, field_source};

    #[test]
    fn nested_keys_are_found_in_the_file_document() {
        let doc: Value =
            "[booking]\ncollision_policy = \"reject\"\n".parse().expect("toml document");

        assert!(contains_path(&doc, "booking.collision_policy"));
        assert!(!contains_path(&doc, "booking.max_days"));
        assert!(!contains_path(&doc, "listing.min_images"));
    }

    #[test]
    fn file_source_names_the_config_path() {
        let doc: Value = "[listing]\nmin_images = 3\n".parse().expect("toml document");

        let source = field_source(
            "listing.min_images",
            &["TOOLSHARE_TEST_UNSET_MIN_IMAGES"],
            Some(&doc),
            Some(Path::new("toolshare.toml")),
        );
        assert_eq!(source, "file (toolshare.toml)");

        let fallback = field_source(
            "listing.max_images",
            &["TOOLSHARE_TEST_UNSET_MAX_IMAGES"],
            Some(&doc),
            None,
        );
        assert_eq!(fallback, "default");
    }
}
