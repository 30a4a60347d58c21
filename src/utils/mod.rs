/// Credential lookup for probes that need API keys.
pub mod credentials;
/// Tracing subscriber setup.
pub mod logging;
/// TOML configuration (`footprint.toml`).
pub mod toml_config;
