//! Application configuration for mealiesync.
//!
//! User config lives at `~/.mealiesync/mealiesync.toml`.
//! CLI flags and environment variables override config file values,
//! which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{MealieSyncError, Result};
use crate::types::QueryAssignments;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "mealiesync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".mealiesync";

/// Environment variable that may carry the whole assignment block as JSON.
pub const ASSIGNMENTS_ENV: &str = "MA_QUERY_ASSIGNMENTS";

// ---------------------------------------------------------------------------
// Config structs (matching mealiesync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Connection settings for the Mealie server.
    #[serde(default)]
    pub mealie: MealieConfig,

    /// Schedule and rules for category/tag assignment.
    #[serde(default)]
    pub query_assignments: QueryAssignments,
}

/// `[mealie]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealieConfig {
    /// Base URL used for API calls.
    #[serde(default = "default_url")]
    pub url: String,

    /// Name of the env var holding the API token, or a path to a file with it.
    /// The token itself is never stored in the config file.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Connection attempts (one per second) before startup gives up.
    #[serde(default = "default_startup_grace")]
    pub startup_grace_secs: u64,

    /// How many recipe details may be fetched in parallel.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
}

impl Default for MealieConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            token_env: default_token_env(),
            startup_grace_secs: default_startup_grace(),
            fetch_concurrency: default_fetch_concurrency(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:9000".into()
}
fn default_token_env() -> String {
    "MEALIE_TOKEN".into()
}
fn default_startup_grace() -> u64 {
    30
}
fn default_fetch_concurrency() -> usize {
    1
}

// ---------------------------------------------------------------------------
// Reconcile config (runtime, derived from the file config)
// ---------------------------------------------------------------------------

/// Runtime settings for the reconciliation engine and its scheduler.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Target time between the starts of two cycles.
    pub repeat_interval: Duration,
    /// Deadline applied to each individual store call.
    pub call_timeout: Duration,
    /// Parallel recipe detail fetches per assignment.
    pub fetch_concurrency: usize,
}

impl From<&AppConfig> for ReconcileConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            repeat_interval: Duration::from_secs(config.query_assignments.repeat_secs),
            call_timeout: Duration::from_secs(config.query_assignments.timeout_secs),
            fetch_concurrency: config.mealie.fetch_concurrency.max(1),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.mealiesync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MealieSyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.mealiesync/mealiesync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MealieSyncError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        MealieSyncError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MealieSyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MealieSyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MealieSyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Replace the `[query_assignments]` block with the JSON in `raw`, if any.
///
/// Empty values are ignored so an unset and an empty variable behave alike.
pub fn apply_assignments_override(config: &mut AppConfig, raw: Option<&str>) -> Result<()> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(());
    };

    config.query_assignments = serde_json::from_str(raw).map_err(|e| {
        MealieSyncError::config(format!(
            "failed to parse {ASSIGNMENTS_ENV} as the expected JSON: {e}"
        ))
    })?;
    tracing::debug!(
        assignments = config.query_assignments.assignments.len(),
        "query assignments taken from environment"
    );
    Ok(())
}

/// Check the config for values the engine cannot run with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let url = Url::parse(&config.mealie.url).map_err(|e| {
        MealieSyncError::config(format!("invalid mealie.url '{}': {e}", config.mealie.url))
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(MealieSyncError::config(format!(
            "mealie.url must be http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.mealie.fetch_concurrency == 0 {
        return Err(MealieSyncError::config("mealie.fetch_concurrency must be at least 1"));
    }

    let qa = &config.query_assignments;
    if !qa.assignments.is_empty() {
        if qa.timeout_secs == 0 {
            return Err(MealieSyncError::config(
                "timeout-secs for query assignment must not be 0",
            ));
        }
        if qa.repeat_secs == 0 {
            return Err(MealieSyncError::config(
                "repeat-secs for query assignment must not be 0",
            ));
        }
    }

    Ok(())
}

/// Resolve the API token from the env var named in the config.
pub fn resolve_token(config: &MealieConfig) -> Result<String> {
    let var_name = &config.token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => token_from_value(&val),
        _ => Err(MealieSyncError::config(format!(
            "Mealie API token not found. Set the {var_name} environment variable \
             to the token or to a file containing it."
        ))),
    }
}

/// Interpret `value` as a path to a token file if one exists there, else as the token.
///
/// File support lets container secrets be mounted instead of passed inline.
pub fn token_from_value(value: &str) -> Result<String> {
    let candidate = Path::new(value.trim());
    let token = if candidate.is_file() {
        std::fs::read_to_string(candidate)
            .map_err(|e| MealieSyncError::io(candidate, e))?
            .trim()
            .to_string()
    } else {
        value.trim().to_string()
    };

    if token.is_empty() {
        return Err(MealieSyncError::config("Mealie API token is empty"));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QueryMode;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("token_env"));
        assert!(toml_str.contains("MEALIE_TOKEN"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.mealie.startup_grace_secs, 30);
        assert_eq!(parsed.mealie.fetch_concurrency, 1);
        assert!(parsed.query_assignments.assignments.is_empty());
    }

    #[test]
    fn config_with_assignments() {
        let toml_str = r#"
[mealie]
url = "http://mealie:9000"

[query_assignments]
repeat_secs = 3600
timeout_secs = 30

[[query_assignments.assignments]]
categories = { set = ["Made"], unset = ["NotMade"] }
tags = { set = ["Yummy"] }

[[query_assignments.assignments.queries]]
mode = "add"
params = { queryFilter = "lastMade IS NOT NULL" }

[[query_assignments.assignments.queries]]
mode = "skip"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.mealie.url, "http://mealie:9000");
        assert_eq!(config.query_assignments.repeat_secs, 3600);

        let assignment = &config.query_assignments.assignments[0];
        assert_eq!(assignment.queries.len(), 2);
        assert_eq!(assignment.queries[0].mode, QueryMode::Add);
        assert_eq!(assignment.queries[1].mode, QueryMode::Skip);
        assert!(assignment.queries[1].params.is_empty());
        assert!(assignment.tags.unset.is_empty());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn reconcile_config_from_app_config() {
        let mut app = AppConfig::default();
        app.query_assignments.repeat_secs = 120;
        app.query_assignments.timeout_secs = 7;
        let rc = ReconcileConfig::from(&app);
        assert_eq!(rc.repeat_interval, Duration::from_secs(120));
        assert_eq!(rc.call_timeout, Duration::from_secs(7));
        assert_eq!(rc.fetch_concurrency, 1);
    }

    #[test]
    fn env_override_replaces_assignment_block() {
        let mut config = AppConfig::default();
        let json = r#"{"repeat-secs": 60, "timeout-secs": 5,
            "assignments": [{"queries": [{"params": {}, "mode": "add"}]}]}"#;
        apply_assignments_override(&mut config, Some(json)).unwrap();
        assert_eq!(config.query_assignments.repeat_secs, 60);
        assert_eq!(config.query_assignments.assignments.len(), 1);

        // Blank values leave the file config alone.
        apply_assignments_override(&mut config, Some("   ")).unwrap();
        assert_eq!(config.query_assignments.repeat_secs, 60);
    }

    #[test]
    fn env_override_rejects_bad_json() {
        let mut config = AppConfig::default();
        let err = apply_assignments_override(&mut config, Some("{not json")).unwrap_err();
        assert!(err.to_string().contains(ASSIGNMENTS_ENV));
    }

    #[test]
    fn zero_timeouts_rejected_only_with_assignments() {
        let mut config = AppConfig::default();
        assert!(validate_config(&config).is_ok());

        config.query_assignments.assignments.push(Default::default());
        config.query_assignments.repeat_secs = 60;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("timeout-secs"));

        config.query_assignments.timeout_secs = 10;
        config.query_assignments.repeat_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("repeat-secs"));
    }

    #[test]
    fn non_http_url_rejected() {
        let mut config = AppConfig::default();
        config.mealie.url = "ftp://mealie".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn token_read_from_file_when_path_exists() {
        let path = std::env::temp_dir().join(format!("mealiesync-token-{}", std::process::id()));
        std::fs::write(&path, "  secret-token\n").unwrap();

        let token = token_from_value(path.to_str().unwrap()).unwrap();
        assert_eq!(token, "secret-token");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn token_used_verbatim_when_not_a_file() {
        assert_eq!(token_from_value(" abc.def ").unwrap(), "abc.def");
    }

    #[test]
    fn missing_token_env_is_config_error() {
        let config = MealieConfig {
            token_env: "MEALIESYNC_TEST_NONEXISTENT_TOKEN_12345".into(),
            ..Default::default()
        };
        let err = resolve_token(&config).unwrap_err();
        assert!(err.to_string().contains("token not found"));
    }
}
