//! TOML-based configuration for footprint
//!
//! All tunables live in `footprint.toml`: orchestration limits, logging,
//! storage, the shared HTTP client, per-probe settings, correlation weights
//! and risk constants. Every field has a default, so an empty file (or no file
//! at all) yields a working configuration.
//!
//! ```toml
//! [orchestrator]
//! max_concurrency = 4
//!
//! [probes.breach]
//! api_key_env = "HIBP_KEY"
//! timeout_secs = 15
//!
//! [probes.social.platforms]
//! github = "https://github.com/{}"
//! ```

use crate::types::Capability;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure loaded from footprint.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FootprintConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub http: HttpConfig,

    /// Per-probe settings keyed by capability id
    #[serde(default)]
    pub probes: BTreeMap<String, ProbeConfig>,

    #[serde(default)]
    pub correlation: CorrelationConfig,

    #[serde(default)]
    pub risk: RiskConfig,
}

// ============= Orchestrator Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    #[serde(default = "default_request_spacing_ms")]
    pub default_request_spacing_ms: u64,
}

fn default_max_concurrency() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_request_spacing_ms() -> u64 {
    500
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            default_timeout_secs: default_timeout_secs(),
            default_request_spacing_ms: default_request_spacing_ms(),
        }
    }
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ============= Storage Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
        }
    }
}

// ============= HTTP Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_user_agent() -> String {
    concat!("footprint/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

// ============= Probe Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Overrides `orchestrator.default_timeout_secs`
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Overrides `orchestrator.default_request_spacing_ms`
    #[serde(default)]
    pub request_spacing_ms: Option<u64>,

    /// Environment variable holding this probe's API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Overrides the probe's public endpoint
    #[serde(default)]
    pub base_url: Option<String>,

    /// Additional probe-specific configuration
    #[serde(flatten)]
    pub extra: HashMap<String, toml::Value>,
}

fn default_true() -> bool {
    true
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: None,
            request_spacing_ms: None,
            api_key_env: None,
            base_url: None,
            extra: HashMap::new(),
        }
    }
}

impl ProbeConfig {
    /// A string-valued extra key.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }

    /// A string-array extra key. Non-string entries are skipped.
    pub fn extra_string_list(&self, key: &str) -> Option<Vec<String>> {
        let array = self.extra.get(key)?.as_array()?;
        Some(
            array
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        )
    }

    /// A table of string values, e.g. platform name -> URL template.
    pub fn extra_string_table(&self, key: &str) -> Option<BTreeMap<String, String>> {
        let table = self.extra.get(key)?.as_table()?;
        Some(
            table
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect(),
        )
    }
}

/// Environment variable a capability reads its key from when none is configured.
pub fn default_api_key_env(capability: Capability) -> Option<&'static str> {
    match capability {
        Capability::Breach => Some("HAVEIBEENPWNED_API_KEY"),
        Capability::Deliverability => Some("HUNTER_API_KEY"),
        Capability::Reputation => Some("EMAILREP_API_KEY"),
        Capability::Phone => Some("NUMVERIFY_API_KEY"),
        Capability::Professional => Some("GITHUB_TOKEN"),
        _ => None,
    }
}

// ============= Correlation Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationConfig {
    #[serde(default = "default_identity_weight")]
    pub identity_weight: f64,

    #[serde(default = "default_organization_weight")]
    pub organization_weight: f64,

    #[serde(default = "default_reuse_weight")]
    pub reuse_weight: f64,

    #[serde(default = "default_location_weight")]
    pub location_weight: f64,

    #[serde(default = "default_risk_weight")]
    pub risk_weight: f64,

    /// Added per extra independent source, relative to the base weight
    #[serde(default = "default_corroboration_boost")]
    pub corroboration_boost: f64,

    #[serde(default = "default_cross_platform_min_platforms")]
    pub cross_platform_min_platforms: usize,

    #[serde(default = "default_breach_risk_threshold")]
    pub breach_risk_threshold: u32,
}

fn default_identity_weight() -> f64 {
    0.5
}

fn default_organization_weight() -> f64 {
    0.45
}

fn default_reuse_weight() -> f64 {
    0.4
}

fn default_location_weight() -> f64 {
    0.35
}

fn default_risk_weight() -> f64 {
    0.6
}

fn default_corroboration_boost() -> f64 {
    0.25
}

fn default_cross_platform_min_platforms() -> usize {
    3
}

fn default_breach_risk_threshold() -> u32 {
    3
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            identity_weight: default_identity_weight(),
            organization_weight: default_organization_weight(),
            reuse_weight: default_reuse_weight(),
            location_weight: default_location_weight(),
            risk_weight: default_risk_weight(),
            corroboration_boost: default_corroboration_boost(),
            cross_platform_min_platforms: default_cross_platform_min_platforms(),
            breach_risk_threshold: default_breach_risk_threshold(),
        }
    }
}

// ============= Risk Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Breach count at which the breach component saturates
    #[serde(default = "default_breach_cap")]
    pub breach_cap: u32,

    #[serde(default = "default_breach_max_points")]
    pub breach_max_points: u32,

    #[serde(default = "default_sensitive_breach_points")]
    pub sensitive_breach_points: u32,

    /// Exposed data classes that count as sensitive (case-insensitive)
    #[serde(default = "default_sensitive_data_classes")]
    pub sensitive_data_classes: Vec<String>,

    #[serde(default = "default_phone_medium_points")]
    pub phone_medium_points: u32,

    #[serde(default = "default_phone_high_points")]
    pub phone_high_points: u32,
}

fn default_breach_cap() -> u32 {
    10
}

fn default_breach_max_points() -> u32 {
    60
}

fn default_sensitive_breach_points() -> u32 {
    15
}

fn default_sensitive_data_classes() -> Vec<String> {
    [
        "Passwords",
        "Credit cards",
        "Bank account numbers",
        "Social security numbers",
        "Security questions and answers",
        "Passport numbers",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_phone_medium_points() -> u32 {
    15
}

fn default_phone_high_points() -> u32 {
    30
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            breach_cap: default_breach_cap(),
            breach_max_points: default_breach_max_points(),
            sensitive_breach_points: default_sensitive_breach_points(),
            sensitive_data_classes: default_sensitive_data_classes(),
            phone_medium_points: default_phone_medium_points(),
            phone_high_points: default_phone_high_points(),
        }
    }
}

// ============= Errors & Warnings =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unknown probe '{0}' in [probes] section")]
    UnknownProbe(String),
}

/// A non-fatal configuration observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub kind: ConfigWarningKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarningKind {
    MissingCredential,
    DisabledProbe,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl FootprintConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: FootprintConfig = toml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate value ranges and probe ids.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.orchestrator.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.max_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.orchestrator.default_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.default_timeout_secs must be greater than 0".to_string(),
            ));
        }

        for (id, probe) in &self.probes {
            if id.parse::<Capability>().is_err() {
                return Err(ConfigError::UnknownProbe(id.clone()));
            }
            if probe.timeout_secs == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "probes.{}.timeout_secs must be greater than 0",
                    id
                )));
            }
        }

        let weights = [
            ("identity_weight", self.correlation.identity_weight),
            ("organization_weight", self.correlation.organization_weight),
            ("reuse_weight", self.correlation.reuse_weight),
            ("location_weight", self.correlation.location_weight),
            ("risk_weight", self.correlation.risk_weight),
        ];
        for (name, weight) in weights {
            if !(0.0..=1.0).contains(&weight) {
                return Err(ConfigError::ValidationError(format!(
                    "correlation.{} must be within [0, 1], got {}",
                    name, weight
                )));
            }
        }
        let boost = self.correlation.corroboration_boost;
        if boost.is_nan() || boost < 0.0 {
            return Err(ConfigError::ValidationError(
                "correlation.corroboration_boost must not be negative".to_string(),
            ));
        }
        if self.correlation.cross_platform_min_platforms < 2 {
            return Err(ConfigError::ValidationError(
                "correlation.cross_platform_min_platforms must be at least 2".to_string(),
            ));
        }

        if self.risk.breach_cap == 0 {
            return Err(ConfigError::ValidationError(
                "risk.breach_cap must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate, then report credentials that are referenced but not set.
    pub fn validate_with_warnings(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        self.validate()?;

        let mut warnings = Vec::new();
        for capability in Capability::ALL {
            let probe = self.probe(capability);
            if !probe.enabled {
                warnings.push(ConfigWarning {
                    kind: ConfigWarningKind::DisabledProbe,
                    message: format!("Probe '{}' is disabled", capability),
                });
                continue;
            }
            if let Some(env) = &probe.api_key_env
                && std::env::var(env).map(|v| v.trim().is_empty()).unwrap_or(true)
            {
                warnings.push(ConfigWarning {
                    kind: ConfigWarningKind::MissingCredential,
                    message: format!(
                        "Probe '{}' reads its key from '{}', which is not set",
                        capability, env
                    ),
                });
            }
        }

        Ok(warnings)
    }

    /// Effective settings for one probe, with defaults filled in.
    pub fn probe(&self, capability: Capability) -> ProbeConfig {
        let mut probe = self.probes.get(capability.id()).cloned().unwrap_or_default();
        if probe.api_key_env.is_none() {
            probe.api_key_env = default_api_key_env(capability).map(str::to_string);
        }
        probe
    }

    pub fn probe_timeout(&self, capability: Capability) -> Duration {
        let secs = self
            .probe(capability)
            .timeout_secs
            .unwrap_or(self.orchestrator.default_timeout_secs);
        Duration::from_secs(secs)
    }

    pub fn probe_request_spacing(&self, capability: Capability) -> Duration {
        let ms = self
            .probe(capability)
            .request_spacing_ms
            .unwrap_or(self.orchestrator.default_request_spacing_ms);
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> String {
        r#"
[orchestrator]
max_concurrency = 4
default_timeout_secs = 20

[logging]
level = "debug"
format = "json"

[storage]
results_dir = "/tmp/footprint"

[probes.breach]
timeout_secs = 15
api_key_env = "TEST_HIBP_KEY"

[probes.social]
request_spacing_ms = 250

[probes.social.platforms]
github = "https://github.com/{}"

[probes.external_tool]
enabled = false
binary = "sherlock"

[correlation]
identity_weight = 0.7
"#
        .to_string()
    }

    #[test]
    fn test_parse_config() {
        let config: FootprintConfig =
            toml::from_str(&create_test_config()).expect("Failed to parse config");

        assert_eq!(config.orchestrator.max_concurrency, 4);
        assert_eq!(config.orchestrator.default_request_spacing_ms, 500);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.storage.results_dir, PathBuf::from("/tmp/footprint"));
        assert_eq!(config.correlation.identity_weight, 0.7);
        assert_eq!(config.correlation.reuse_weight, 0.4);
        assert_eq!(config.correlation.location_weight, 0.35);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config: FootprintConfig = toml::from_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.orchestrator.max_concurrency, 10);
        assert_eq!(config.risk.breach_cap, 10);
    }

    #[test]
    fn test_probe_settings_and_defaults() {
        let config: FootprintConfig = toml::from_str(&create_test_config()).unwrap();

        assert_eq!(config.probe_timeout(Capability::Breach), Duration::from_secs(15));
        assert_eq!(config.probe_timeout(Capability::Phone), Duration::from_secs(20));
        assert_eq!(
            config.probe_request_spacing(Capability::Social),
            Duration::from_millis(250)
        );
        assert_eq!(
            config.probe(Capability::Breach).api_key_env.as_deref(),
            Some("TEST_HIBP_KEY")
        );
        assert_eq!(
            config.probe(Capability::Reputation).api_key_env.as_deref(),
            Some("EMAILREP_API_KEY")
        );
        assert!(!config.probe(Capability::ExternalTool).enabled);
        assert_eq!(
            config.probe(Capability::ExternalTool).extra_str("binary"),
            Some("sherlock")
        );

        let platforms = config
            .probe(Capability::Social)
            .extra_string_table("platforms")
            .unwrap();
        assert_eq!(platforms["github"], "https://github.com/{}");
    }

    #[test]
    fn test_unknown_probe_is_rejected() {
        let config: FootprintConfig = toml::from_str("[probes.telepathy]\nenabled = true").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownProbe(id)) if id == "telepathy"
        ));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let zero: FootprintConfig =
            toml::from_str("[orchestrator]\nmax_concurrency = 0").unwrap();
        assert!(zero.validate().is_err());

        let weight: FootprintConfig =
            toml::from_str("[correlation]\nrisk_weight = 1.5").unwrap();
        assert!(weight.validate().is_err());

        let location: FootprintConfig =
            toml::from_str("[correlation]\nlocation_weight = -0.1").unwrap();
        assert!(location.validate().is_err());

        let platforms: FootprintConfig =
            toml::from_str("[correlation]\ncross_platform_min_platforms = 1").unwrap();
        assert!(platforms.validate().is_err());

        let timeout: FootprintConfig = toml::from_str("[probes.phone]\ntimeout_secs = 0").unwrap();
        assert!(timeout.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = FootprintConfig::load("/nonexistent/footprint.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_disabled_probe_warning() {
        let config: FootprintConfig = toml::from_str(&create_test_config()).unwrap();
        let warnings = config.validate_with_warnings().unwrap();
        assert!(warnings.iter().any(|w| w.kind == ConfigWarningKind::DisabledProbe
            && w.message.contains("external_tool")));
    }
}
