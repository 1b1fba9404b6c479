// crates/sweep-config/src/config.rs
// ============================================================================
// Module: Sweep Harness Configuration
// Description: Configuration loading and validation for the sweep harness.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The store backend is chosen here once per process; every other crate
//! receives already-validated values. Missing optional sections fall back to
//! defaults that match the historical runner (30 second hang timeout,
//! 120 second watcher interval, `database.json` flat file).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "sweep-harness.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "SWEEP_HARNESS_CONFIG";
/// Environment variable naming the device class when the config omits it.
pub const DEVICE_CLASS_ENV_VAR: &str = "ARCH_NAME";
/// Watcher interval variable injected into device-side processes.
pub const WATCHER_ENV_VAR: &str = "TT_METAL_WATCHER";
/// Watcher append-mode variable injected into device-side processes.
pub const WATCHER_APPEND_ENV_VAR: &str = "TT_METAL_WATCHER_APPEND";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for document-store hits per query.
pub(crate) const MAX_ELASTIC_HITS: usize = 10_000;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Sweep harness configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Vector and result store selection.
    #[serde(default)]
    pub store: StoreConfig,
    /// Suite execution settings.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Hardware reset utility.
    #[serde(default)]
    pub reset: ResetConfig,
    /// Watcher diagnostics settings.
    #[serde(default)]
    pub watcher: WatcherConfig,
    /// Default device host.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Registered sweep modules.
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
    /// Event logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HarnessConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::parse(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.execution.validate()?;
        self.reset.validate()?;
        self.watcher.validate()?;
        self.device.validate()?;
        self.logging.validate()?;
        let mut seen = BTreeSet::new();
        for module in &self.modules {
            module.validate()?;
            if !seen.insert(module.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate module name: {}",
                    module.name
                )));
            }
        }
        Ok(())
    }

    /// Returns the module entry with the given name.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|module| module.name == name)
    }

    /// Returns the device host argv for a module, falling back to the default.
    #[must_use]
    pub fn device_command(&self, module: &ModuleConfig) -> Vec<String> {
        module.command.clone().unwrap_or_else(|| self.device.command.clone())
    }
}

// ============================================================================
// SECTION: Store Config
// ============================================================================

/// Store backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Flat structured file.
    #[default]
    Json,
    /// Document-search service.
    Elastic,
}

/// Vector and result store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Selected backend.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Flat file settings.
    #[serde(default)]
    pub json: JsonStoreConfig,
    /// Document-search settings (required for the elastic backend).
    #[serde(default)]
    pub elastic: Option<ElasticStoreConfig>,
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.backend {
            StoreBackend::Json => {
                validate_path_string("store.json.path", &self.json.path.to_string_lossy())
            }
            StoreBackend::Elastic => {
                let Some(elastic) = &self.elastic else {
                    return Err(ConfigError::Invalid(
                        "elastic backend requires [store.elastic]".to_string(),
                    ));
                };
                elastic.validate()
            }
        }
    }
}

/// Flat structured file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonStoreConfig {
    /// Path to the database file.
    #[serde(default = "default_json_path")]
    pub path: PathBuf,
}

impl Default for JsonStoreConfig {
    fn default() -> Self {
        Self {
            path: default_json_path(),
        }
    }
}

/// Document-search backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticStoreConfig {
    /// Base URL of the service.
    pub url: String,
    /// Environment variable holding the basic-auth username.
    #[serde(default = "default_username_env")]
    pub username_env: String,
    /// Environment variable holding the basic-auth password.
    #[serde(default = "default_password_env")]
    pub password_env: String,
    /// Index prefix for vectors; the module name is appended.
    #[serde(default = "default_vector_index_prefix")]
    pub vector_index_prefix: String,
    /// Index prefix for results; the module name is appended.
    #[serde(default = "default_result_index_prefix")]
    pub result_index_prefix: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_elastic_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum hits requested per search.
    #[serde(default = "default_max_hits")]
    pub max_hits: usize,
}

impl ElasticStoreConfig {
    /// Validates document-search settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.url)
            .map_err(|err| ConfigError::Invalid(format!("store.elastic.url is invalid: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(
                "store.elastic.url must use http or https".to_string(),
            ));
        }
        if self.vector_index_prefix.trim().is_empty() || self.result_index_prefix.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "store.elastic index prefixes must be non-empty".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "store.elastic.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_hits == 0 || self.max_hits > MAX_ELASTIC_HITS {
            return Err(ConfigError::Invalid(format!(
                "store.elastic.max_hits must be between 1 and {MAX_ELASTIC_HITS}"
            )));
        }
        Ok(())
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ============================================================================
// SECTION: Execution Config
// ============================================================================

/// Suite execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Hang timeout for modules that do not declare their own.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    /// Time a stopping worker gets to release its device before being killed.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl ExecutionConfig {
    /// Validates execution settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "execution.default_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default hang timeout.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    /// Returns the worker shutdown grace period.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

// ============================================================================
// SECTION: Reset Config
// ============================================================================

/// Hardware reset utility settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetConfig {
    /// Reset argv; `{device_class}` is substituted. Empty disables reset.
    #[serde(default = "default_reset_command")]
    pub command: Vec<String>,
    /// Device class passed to the utility; defaults to `ARCH_NAME`.
    #[serde(default)]
    pub device_class: Option<String>,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            command: default_reset_command(),
            device_class: None,
        }
    }
}

impl ResetConfig {
    /// Validates reset settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_argv("reset.command", &self.command)
    }

    /// Returns the configured device class or the `ARCH_NAME` value.
    #[must_use]
    pub fn resolved_device_class(&self) -> String {
        self.device_class
            .clone()
            .or_else(|| env::var(DEVICE_CLASS_ENV_VAR).ok())
            .unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Watcher Config
// ============================================================================

/// Watcher diagnostics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Watcher polling interval in seconds.
    #[serde(default = "default_watcher_interval_secs")]
    pub interval_secs: u64,
    /// Whether watcher logs are appended rather than truncated.
    #[serde(default = "default_true")]
    pub append: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_watcher_interval_secs(),
            append: true,
        }
    }
}

impl WatcherConfig {
    /// Validates watcher settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "watcher.interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the environment injected into device-side processes.
    #[must_use]
    pub fn env(&self) -> Vec<(String, String)> {
        let mut vars = vec![(WATCHER_ENV_VAR.to_string(), self.interval_secs.to_string())];
        if self.append {
            vars.push((WATCHER_APPEND_ENV_VAR.to_string(), "1".to_string()));
        }
        vars
    }
}

// ============================================================================
// SECTION: Device and Module Config
// ============================================================================

/// Default device host settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device host argv. Empty selects the bundled simulated device host.
    #[serde(default)]
    pub command: Vec<String>,
}

impl DeviceConfig {
    /// Validates device settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_argv("device.command", &self.command)
    }
}

/// Registered sweep module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Module name; also the index suffix in the document store.
    pub name: String,
    /// Module hang timeout override in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Device host argv override.
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

impl ModuleConfig {
    /// Validates a module entry.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("module name must be non-empty".to_string()));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(format!(
                "module {} timeout_secs must be greater than zero",
                self.name
            )));
        }
        if let Some(command) = &self.command {
            if command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "module {} command must be non-empty when set",
                    self.name
                )));
            }
            validate_argv("modules.command", command)?;
        }
        Ok(())
    }

    /// Returns the module hang timeout override.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

// ============================================================================
// SECTION: Logging Config
// ============================================================================

/// Event sink selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSink {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Events discarded.
    None,
}

/// Event logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Sink selector.
    #[serde(default)]
    pub sink: LogSink,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl LoggingConfig {
    /// Validates logging settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (LogSink::File, None) => {
                Err(ConfigError::Invalid("file log sink requires logging.path".to_string()))
            }
            (LogSink::File, Some(path)) => {
                validate_path_string("logging.path", &path.to_string_lossy())
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an argv list; an empty list is allowed, empty entries are not.
fn validate_argv(field: &str, argv: &[String]) -> Result<(), ConfigError> {
    if argv.iter().any(|arg| arg.trim().is_empty()) {
        return Err(ConfigError::Invalid(format!("{field} entries must be non-empty")));
    }
    Ok(())
}

/// Default flat file path.
fn default_json_path() -> PathBuf {
    PathBuf::from("database.json")
}

/// Default basic-auth username variable.
fn default_username_env() -> String {
    "ELASTIC_USERNAME".to_string()
}

/// Default basic-auth password variable.
fn default_password_env() -> String {
    "ELASTIC_PASSWORD".to_string()
}

/// Default vector index prefix.
fn default_vector_index_prefix() -> String {
    "ttnn_sweeps_test_vectors_".to_string()
}

/// Default result index prefix.
fn default_result_index_prefix() -> String {
    "ttnn_sweeps_test_results_".to_string()
}

/// Default document-store request timeout.
const fn default_elastic_timeout_ms() -> u64 {
    30_000
}

/// Default document-store hit limit.
const fn default_max_hits() -> usize {
    MAX_ELASTIC_HITS
}

/// Default hang timeout.
const fn default_timeout_secs() -> u64 {
    30
}

/// Default worker shutdown grace period.
const fn default_shutdown_grace_ms() -> u64 {
    5_000
}

/// Default watcher interval.
const fn default_watcher_interval_secs() -> u64 {
    120
}

/// Default reset utility argv.
fn default_reset_command() -> Vec<String> {
    vec!["tt-smi".to_string(), "-r".to_string(), "0".to_string()]
}

/// Serde default helper for `true`.
const fn default_true() -> bool {
    true
}
