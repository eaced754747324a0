//! Command-line and file configuration.
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file given with `--config`, or `ledger-records.toml` in the working directory if present
//! 3. Environment variables with the `LEDGER_RECORDS__` prefix, `__` separating nested keys
//!    (e.g. `LEDGER_RECORDS__VALIDATION__MAX_KEY_BYTES=128`)
//! 4. Command-line flags

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use ledger_records_store::DatabaseConfig;
use ledger_records_types::{ErrorCode, config::ValidationConfig};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "LEDGER_RECORDS";

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "ledger-records.toml";

/// Snapshot file used when no data path is configured.
pub const DEFAULT_DATA_FILE: &str = "ledger-records.ldb";

/// Invoke vote tally, real-estate registry and RBAC operations against a
/// local record store.
#[derive(Debug, Parser)]
#[command(name = "ledger-records", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML).
    #[arg(long, global = true, env = "LEDGER_RECORDS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Snapshot file holding the records. Created on first write.
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Vote tally operations (initLedger, castVote, getAllParties, ...).
    Vote(Invocation),
    /// Real-estate registry operations (initLedger, changeOwner, queryAll, ...).
    Registry(Invocation),
    /// RBAC operations (createProject, assignPermissions, getAllRoles, ...).
    Rbac(Invocation),
    /// Configuration utilities.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// An operation name and its positional string arguments.
#[derive(Debug, Clone, clap::Args)]
pub struct Invocation {
    /// Operation name, e.g. `castVote`.
    pub operation: String,
    /// Operation arguments, passed as strings.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Configuration subcommands.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Print the JSON schema of the configuration file.
    Schema,
    /// Print the effective configuration as JSON.
    Show,
}

/// Log output format.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    Text,
    /// One JSON object per event.
    Json,
    /// JSON when stderr is not a terminal, text otherwise.
    #[default]
    Auto,
}

/// Effective configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Snapshot file holding the records.
    #[serde(default = "default_data")]
    pub data: PathBuf,
    /// Whether every commit is fsynced before it is acknowledged.
    #[serde(default = "default_sync_on_commit")]
    pub sync_on_commit: bool,
    /// Whether an invocation waits for another running invocation to release
    /// the data file instead of failing.
    #[serde(default = "default_wait_for_lock")]
    pub wait_for_lock: bool,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
    /// Default log filter, used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Input limits applied by every contract.
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: default_data(),
            sync_on_commit: default_sync_on_commit(),
            wait_for_lock: default_wait_for_lock(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            validation: ValidationConfig::default(),
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// A source could not be read or merged.
    #[snafu(display("Failed to load configuration: {source}"))]
    Load {
        /// Underlying loader error.
        source: config::ConfigError,
    },

    /// Values loaded but violate a constraint.
    #[snafu(display("Invalid configuration: {source}"))]
    Invalid {
        /// Which constraint failed.
        source: ledger_records_types::config::ConfigError,
    },

    /// The configuration or its schema could not be rendered as JSON.
    #[snafu(display("Failed to render configuration: {source}"))]
    Render {
        /// Underlying serializer error.
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// JSON error report: `{"code", "kind", "message"}`.
    pub fn to_json(&self) -> serde_json::Value {
        let code = ErrorCode::AppConfig;
        serde_json::json!({
            "code": code.as_u16(),
            "kind": code.name(),
            "message": self.to_string(),
        })
    }
}

impl Config {
    /// Loads configuration from the given file (or the default file if it
    /// exists) and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if an explicit file is missing or any
    /// source is malformed, and [`ConfigError::Invalid`] if validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let builder = config::Config::builder();

        let builder = match path {
            Some(path) => builder
                .add_source(config::File::from(path).format(config::FileFormat::Toml)),
            None => builder.add_source(
                config::File::with_name(DEFAULT_CONFIG_FILE)
                    .format(config::FileFormat::Toml)
                    .required(false),
            ),
        };

        // Single underscores in field names are preserved
        // (e.g. LEDGER_RECORDS__LOG_LEVEL -> log_level).
        let builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true),
        );

        let config: Config =
            builder.build().context(LoadSnafu)?.try_deserialize().context(LoadSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies command-line overrides.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(data) = &cli.data {
            self.data.clone_from(data);
        }
        if let Some(format) = cli.log_format {
            self.log_format = format;
        }
        self
    }

    /// Validates nested sections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if any limit is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validation.validate().context(InvalidSnafu)
    }

    /// Renders the effective configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Render`] if a value has no JSON form, such as a
    /// data path that is not valid UTF-8.
    pub fn to_pretty_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).context(RenderSnafu)
    }

    /// Store settings derived from this configuration.
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::builder()
            .sync_on_commit(self.sync_on_commit)
            .wait_for_lock(self.wait_for_lock)
            .build()
    }
}

/// Generates the JSON schema of [`Config`].
///
/// # Errors
///
/// Returns [`ConfigError::Render`] if the schema cannot be serialized.
pub fn generate_config_schema() -> Result<String, ConfigError> {
    let schema = schemars::schema_for!(Config);
    serde_json::to_string_pretty(&schema).context(RenderSnafu)
}

fn default_data() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_FILE)
}

fn default_sync_on_commit() -> bool {
    true
}

fn default_wait_for_lock() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use ledger_records_test_utils::TestDir;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.data, PathBuf::from(DEFAULT_DATA_FILE));
        assert!(config.sync_on_commit);
        assert!(config.wait_for_lock);
        assert!(config.database_config().wait_for_lock);
        assert_eq!(config.log_format, LogFormat::Auto);
        assert_eq!(config.validation, ValidationConfig::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = TestDir::new();
        let path = dir.join("settings.toml");
        std::fs::write(
            &path,
            r#"
data = "/var/lib/records.ldb"
sync_on_commit = false
log_format = "json"

[validation]
max_key_bytes = 32
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.data, PathBuf::from("/var/lib/records.ldb"));
        assert!(!config.sync_on_commit);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.validation.max_key_bytes, 32);
        // Unset nested keys keep their defaults
        assert_eq!(config.validation.max_permissions_per_grant, 1024);
    }

    #[test]
    fn test_load_rejects_invalid_limits() {
        let dir = TestDir::new();
        let path = dir.join("settings.toml");
        std::fs::write(&path, "[validation]\nmax_key_bytes = 0\n").unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = TestDir::new();
        let err = Config::load(Some(&dir.join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
        assert_eq!(err.to_json()["kind"], "ConfigError");
    }

    #[test]
    fn test_cli_overrides_win() {
        let cli = Cli::parse_from([
            "ledger-records",
            "--data",
            "/tmp/other.ldb",
            "--log-format",
            "text",
            "vote",
            "castVote",
            "Democrats",
        ]);
        let config = Config::default().with_overrides(&cli);
        assert_eq!(config.data, PathBuf::from("/tmp/other.ldb"));
        assert_eq!(config.log_format, LogFormat::Text);

        let CliCommand::Vote(invocation) = cli.command else {
            panic!("expected vote command");
        };
        assert_eq!(invocation.operation, "castVote");
        assert_eq!(invocation.args, vec!["Democrats".to_string()]);
    }

    #[test]
    fn test_schema_mentions_sections() {
        let schema = generate_config_schema().unwrap();
        assert!(schema.contains("validation"));
        assert!(schema.contains("max_permissions_per_grant"));
        assert!(schema.contains("wait_for_lock"));
    }

    #[test]
    fn test_show_renders_effective_config() {
        let rendered = Config::default().to_pretty_json().unwrap();
        let parsed: Config = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[cfg(unix)]
    #[test]
    fn test_show_reports_unrenderable_config() {
        use std::{ffi::OsString, os::unix::ffi::OsStringExt};

        let config = Config {
            data: PathBuf::from(OsString::from_vec(vec![b'd', 0xFF])),
            ..Config::default()
        };
        let err = config.to_pretty_json().unwrap_err();
        assert!(matches!(err, ConfigError::Render { .. }));
        assert_eq!(err.to_json()["kind"], "ConfigError");
    }
}
