// crates/mission-warden-config/src/config.rs
// ============================================================================
// Module: Mission Warden Configuration
// Description: Configuration loading and validation for Mission Warden.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: mission-warden-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: a mission must never run
//! under limits the operator did not actually set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use mission_warden_core::AliasTable;
use mission_warden_core::DEFAULT_MAX_RETRIES;
use mission_warden_core::DEFAULT_PARALLELISM;
use mission_warden_core::DEFAULT_TIMEOUT_MS;
use mission_warden_core::DispatcherConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "mission-warden.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "MISSION_WARDEN_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum retries allowed after the first invocation attempt.
pub(crate) const MAX_RETRY_LIMIT: u32 = 10;
/// Minimum allowed invocation timeout in milliseconds.
pub(crate) const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum allowed invocation timeout in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 600_000;
/// Maximum allowed dispatch parallelism.
pub(crate) const MAX_PARALLELISM: usize = 64;
/// Maximum allowed approval wait in milliseconds (24 hours).
pub(crate) const MAX_APPROVAL_WAIT_MS: u64 = 86_400_000;
/// Maximum combined agent and alias entries in the identity section.
pub(crate) const MAX_IDENTITY_ENTRIES: usize = 256;
/// Maximum length of one agent id or alias.
pub(crate) const MAX_AGENT_ID_LENGTH: usize = 128;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Mission Warden configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WardenConfig {
    /// Dispatch limit configuration.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Evidence storage configuration.
    #[serde(default)]
    pub evidence: EvidenceConfig,
    /// Identity roster extension configuration.
    #[serde(default)]
    pub identity: IdentityConfig,
}

impl WardenConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path, then [`CONFIG_ENV_VAR`], then
    /// [`DEFAULT_CONFIG_NAME`] in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
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
        self.dispatch.validate()?;
        self.evidence.validate()?;
        self.identity.validate()?;
        Ok(())
    }
}

/// Dispatch limit configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Retries allowed after the first attempt of an invocation.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Timeout handed to adapters on every invocation, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Upper bound on concurrent invocations.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Optional window, in milliseconds, the host polls the mandate source
    /// for approval after a run suspends. Unset disables the wait and
    /// surfaces the suspension immediately.
    #[serde(default)]
    pub approval_wait_ms: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            parallelism: default_parallelism(),
            approval_wait_ms: None,
        }
    }
}

impl DispatchConfig {
    /// Validates dispatch configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries > MAX_RETRY_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "dispatch.max_retries must be at most {MAX_RETRY_LIMIT}"
            )));
        }
        if self.timeout_ms < MIN_TIMEOUT_MS || self.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "dispatch.timeout_ms must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"
            )));
        }
        if self.parallelism == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.parallelism must be at least 1".to_string(),
            ));
        }
        if self.parallelism > MAX_PARALLELISM {
            return Err(ConfigError::Invalid(format!(
                "dispatch.parallelism must be at most {MAX_PARALLELISM}"
            )));
        }
        if let Some(wait) = self.approval_wait_ms {
            if wait > MAX_APPROVAL_WAIT_MS {
                return Err(ConfigError::Invalid(format!(
                    "dispatch.approval_wait_ms must be at most {MAX_APPROVAL_WAIT_MS}"
                )));
            }
        }
        Ok(())
    }

    /// Converts the validated section into dispatcher limits.
    #[must_use]
    pub const fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            max_retries: self.max_retries,
            timeout_ms: self.timeout_ms,
            parallelism: self.parallelism,
        }
    }
}

/// Evidence storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EvidenceConfig {
    /// Root directory under which bundles are stored.
    #[serde(default = "default_evidence_root")]
    pub root: PathBuf,
    /// Root directory against which artifact paths resolve.
    #[serde(default = "default_artifact_root")]
    pub artifact_root: PathBuf,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            root: default_evidence_root(),
            artifact_root: default_artifact_root(),
        }
    }
}

impl EvidenceConfig {
    /// Validates evidence storage configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("evidence.root", &self.root.to_string_lossy())?;
        validate_path_string("evidence.artifact_root", &self.artifact_root.to_string_lossy())?;
        Ok(())
    }
}

/// Identity roster extension configuration.
///
/// Entries here extend the built-in department roster; the combined table is
/// still subject to the alias table build-time invariants.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfig {
    /// Additional canonical agent ids.
    #[serde(default)]
    pub agents: Vec<String>,
    /// Additional alias to canonical-id pairs.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl IdentityConfig {
    /// Validates identity extension configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let total = self.agents.len() + self.aliases.len();
        if total > MAX_IDENTITY_ENTRIES {
            return Err(ConfigError::Invalid(format!(
                "identity section exceeds {MAX_IDENTITY_ENTRIES} entries"
            )));
        }
        for agent in &self.agents {
            validate_identity_entry("identity.agents", agent)?;
        }
        for (alias, target) in &self.aliases {
            validate_identity_entry("identity.aliases", alias)?;
            validate_identity_entry("identity.aliases", target)?;
        }
        Ok(())
    }

    /// Builds the effective alias table: department roster plus extensions.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an entry duplicates or shadows a
    /// roster entry, or an alias targets an unknown agent.
    pub fn alias_table(&self) -> Result<AliasTable, ConfigError> {
        let mut builder = AliasTable::department_builder();
        for agent in &self.agents {
            builder = builder.agent(agent.trim());
        }
        for (alias, target) in &self.aliases {
            builder = builder.alias(alias.trim(), target.trim());
        }
        builder
            .build()
            .map_err(|err| ConfigError::Invalid(format!("identity table: {err}")))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
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

/// Validates the resolved path against security limits.
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
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates one identity entry against length constraints.
fn validate_identity_entry(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} entries must be non-empty")));
    }
    if trimmed.len() > MAX_AGENT_ID_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "{field} entries must be at most {MAX_AGENT_ID_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Default retries after the first attempt.
pub(crate) const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

/// Default invocation timeout in milliseconds.
pub(crate) const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default dispatch parallelism.
pub(crate) const fn default_parallelism() -> usize {
    DEFAULT_PARALLELISM
}

/// Default evidence bundle root directory.
pub(crate) fn default_evidence_root() -> PathBuf {
    PathBuf::from("evidence")
}

/// Default artifact root directory.
pub(crate) fn default_artifact_root() -> PathBuf {
    PathBuf::from(".")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
