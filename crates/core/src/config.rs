use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::availability::CollisionPolicy;
use crate::domain::listing::ListingPolicy;
use crate::suggestions::SuggestionSettings;

pub const DEFAULT_CONFIG_FILE: &str = "toolshare.toml";
pub const NESTED_CONFIG_FILE: &str = "config/toolshare.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub suggestion: SuggestionConfig,
    pub booking: BookingConfig,
    pub listing: ListingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SuggestionConfig {
    pub debounce_ms: u64,
    pub min_title_chars: usize,
    /// Zero disables the timeout.
    pub request_timeout_ms: u64,
}

#[derive(Clone, Debug)]
pub struct BookingConfig {
    pub collision_policy: CollisionPolicy,
}

#[derive(Clone, Debug)]
pub struct ListingConfig {
    pub manual_url_prefix: String,
    pub min_images: usize,
    pub max_images: usize,
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
    pub database_url: Option<String>,
    pub database_max_connections: Option<u32>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub collision_policy: Option<CollisionPolicy>,
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
        let listing = ListingPolicy::default();
        let suggestion = SuggestionSettings::default();
        Self {
            database: DatabaseConfig {
                url: "sqlite://toolshare.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            suggestion: SuggestionConfig {
                debounce_ms: suggestion.debounce.as_millis() as u64,
                min_title_chars: suggestion.min_title_chars,
                request_timeout_ms: 0,
            },
            booking: BookingConfig { collision_policy: CollisionPolicy::default() },
            listing: ListingConfig {
                manual_url_prefix: listing.manual_url_prefix,
                min_images: listing.min_images,
                max_images: listing.max_images,
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
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn suggestion_settings(&self) -> SuggestionSettings {
        let request_timeout = match self.suggestion.request_timeout_ms {
            0 => None,
            millis => Some(Duration::from_millis(millis)),
        };
        SuggestionSettings {
            debounce: Duration::from_millis(self.suggestion.debounce_ms),
            min_title_chars: self.suggestion.min_title_chars,
            request_timeout,
        }
    }

    pub fn listing_policy(&self) -> ListingPolicy {
        ListingPolicy {
            manual_url_prefix: self.listing.manual_url_prefix.clone(),
            min_images: self.listing.min_images,
            max_images: self.listing.max_images,
        }
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

        if let Some(suggestion) = patch.suggestion {
            if let Some(debounce_ms) = suggestion.debounce_ms {
                self.suggestion.debounce_ms = debounce_ms;
            }
            if let Some(min_title_chars) = suggestion.min_title_chars {
                self.suggestion.min_title_chars = min_title_chars;
            }
            if let Some(request_timeout_ms) = suggestion.request_timeout_ms {
                self.suggestion.request_timeout_ms = request_timeout_ms;
            }
        }

        if let Some(collision_policy) = patch.booking.and_then(|booking| booking.collision_policy)
        {
            self.booking.collision_policy = collision_policy;
        }

        if let Some(listing) = patch.listing {
            if let Some(prefix) = listing.manual_url_prefix {
                self.listing.manual_url_prefix = prefix;
            }
            if let Some(min_images) = listing.min_images {
                self.listing.min_images = min_images;
            }
            if let Some(max_images) = listing.max_images {
                self.listing.max_images = max_images;
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
        if let Some(value) = read_env("TOOLSHARE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("TOOLSHARE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("TOOLSHARE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("TOOLSHARE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("TOOLSHARE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TOOLSHARE_SUGGESTION_DEBOUNCE_MS") {
            self.suggestion.debounce_ms = parse_u64("TOOLSHARE_SUGGESTION_DEBOUNCE_MS", &value)?;
        }
        if let Some(value) = read_env("TOOLSHARE_SUGGESTION_MIN_TITLE_CHARS") {
            self.suggestion.min_title_chars =
                parse_usize("TOOLSHARE_SUGGESTION_MIN_TITLE_CHARS", &value)?;
        }
        if let Some(value) = read_env("TOOLSHARE_SUGGESTION_REQUEST_TIMEOUT_MS") {
            self.suggestion.request_timeout_ms =
                parse_u64("TOOLSHARE_SUGGESTION_REQUEST_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = read_env("TOOLSHARE_BOOKING_COLLISION_POLICY") {
            self.booking.collision_policy = value.parse().map_err(ConfigError::Validation)?;
        }

        if let Some(value) = read_env("TOOLSHARE_LISTING_MANUAL_URL_PREFIX") {
            self.listing.manual_url_prefix = value;
        }
        if let Some(value) = read_env("TOOLSHARE_LISTING_MIN_IMAGES") {
            self.listing.min_images = parse_usize("TOOLSHARE_LISTING_MIN_IMAGES", &value)?;
        }
        if let Some(value) = read_env("TOOLSHARE_LISTING_MAX_IMAGES") {
            self.listing.max_images = parse_usize("TOOLSHARE_LISTING_MAX_IMAGES", &value)?;
        }

        let log_level =
            read_env("TOOLSHARE_LOGGING_LEVEL").or_else(|| read_env("TOOLSHARE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TOOLSHARE_LOGGING_FORMAT").or_else(|| read_env("TOOLSHARE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(max_connections) = overrides.database_max_connections {
            self.database.max_connections = max_connections;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(collision_policy) = overrides.collision_policy {
            self.booking.collision_policy = collision_policy;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_suggestion(&self.suggestion)?;
        validate_listing(&self.listing)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Config file that [`AppConfig::load`] would read for the given explicit path.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
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

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_suggestion(suggestion: &SuggestionConfig) -> Result<(), ConfigError> {
    if suggestion.debounce_ms == 0 || suggestion.debounce_ms > 10_000 {
        return Err(ConfigError::Validation(
            "suggestion.debounce_ms must be in range 1..=10000".to_string(),
        ));
    }

    if suggestion.min_title_chars == 0 {
        return Err(ConfigError::Validation(
            "suggestion.min_title_chars must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_listing(listing: &ListingConfig) -> Result<(), ConfigError> {
    let prefix = listing.manual_url_prefix.trim();
    if !prefix.starts_with("http://") && !prefix.starts_with("https://") {
        return Err(ConfigError::Validation(
            "listing.manual_url_prefix must start with http:// or https://".to_string(),
        ));
    }

    if listing.min_images == 0 || listing.min_images > listing.max_images {
        return Err(ConfigError::Validation(format!(
            "listing image bounds are invalid: min_images={} max_images={} (need 1 <= min <= max)",
            listing.min_images, listing.max_images
        )));
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

fn invalid_env(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_env(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_env(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_env(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    suggestion: Option<SuggestionPatch>,
    booking: Option<BookingPatch>,
    listing: Option<ListingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SuggestionPatch {
    debounce_ms: Option<u64>,
    min_title_chars: Option<usize>,
    request_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BookingPatch {
    collision_policy: Option<CollisionPolicy>,
}

#[derive(Debug, Default, Deserialize)]
struct ListingPatch {
    manual_url_prefix: Option<String>,
    min_images: Option<usize>,
    max_images: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
