//! Builds the [`AppConfig`] from a config file plus environment overrides.
//!
//! Resolution order:
//! 1. `ESUSYNC_CONFIG` names an explicit file; it must be readable.
//! 2. Otherwise `esusync.{json,toml}` then `config.{json,toml}` is probed
//!    in the working directory and each ancestor.
//! 3. Individual `ESUSYNC_*` variables override whatever the file (or the
//!    defaults) provided.

use std::path::{Path, PathBuf};

use esusync_domain::{AppConfig, BackendConfig, SyncError};
use tracing::{debug, info};

use crate::errors::InfraError;

const FILE_CANDIDATES: [&str; 4] =
    ["esusync.json", "esusync.toml", "config.json", "config.toml"];

/// Load configuration using the process environment and working directory.
pub fn load() -> Result<AppConfig, SyncError> {
    let cwd = std::env::current_dir().map_err(InfraError::from)?;
    load_from_dir(&cwd, &|key| std::env::var(key).ok())
}

/// Testable entry point: `lookup` stands in for the process environment.
pub fn load_from_dir(
    dir: &Path,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<AppConfig, SyncError> {
    let mut config = match config_file(dir, lookup)? {
        Some(path) => {
            info!(path = %path.display(), "loading configuration file");
            parse_file(&path)?
        }
        None => {
            debug!("no configuration file found; using defaults");
            default_config()
        }
    };
    apply_env_overrides(&mut config, lookup)?;
    Ok(config)
}

fn default_config() -> AppConfig {
    AppConfig {
        backend: BackendConfig {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: 30,
            max_attempts: 3,
        },
        push: Default::default(),
        downloads: Default::default(),
        cache: Default::default(),
    }
}

fn config_file(
    dir: &Path,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Option<PathBuf>, SyncError> {
    if let Some(explicit) = lookup("ESUSYNC_CONFIG") {
        let path = PathBuf::from(explicit);
        if !path.is_file() {
            return Err(SyncError::Config(format!(
                "ESUSYNC_CONFIG points at a missing file: {}",
                path.display()
            )));
        }
        return Ok(Some(path));
    }

    let mut current = Some(dir);
    while let Some(dir) = current {
        for candidate in FILE_CANDIDATES {
            let path = dir.join(candidate);
            if path.is_file() {
                return Ok(Some(path));
            }
        }
        current = dir.parent();
    }
    Ok(None)
}

fn parse_file(path: &Path) -> Result<AppConfig, SyncError> {
    let raw = std::fs::read_to_string(path).map_err(InfraError::from)?;
    let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
    let parsed = if is_toml {
        toml::from_str(&raw).map_err(|err| format!("{err}"))
    } else {
        serde_json::from_str(&raw).map_err(|err| format!("{err}"))
    };
    parsed.map_err(|err| SyncError::Config(format!("{}: {err}", path.display())))
}

fn apply_env_overrides(
    config: &mut AppConfig,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<(), SyncError> {
    if let Some(value) = lookup("ESUSYNC_BASE_URL") {
        config.backend.base_url = value;
    }
    if let Some(value) = lookup("ESUSYNC_TIMEOUT_SECS") {
        config.backend.timeout_secs = parse_var("ESUSYNC_TIMEOUT_SECS", &value)?;
    }
    if let Some(value) = lookup("ESUSYNC_MAX_ATTEMPTS") {
        config.backend.max_attempts = parse_var("ESUSYNC_MAX_ATTEMPTS", &value)?;
    }
    if let Some(value) = lookup("ESUSYNC_PUSH_PATH") {
        config.push.path = value;
    }
    if let Some(value) = lookup("ESUSYNC_RECONNECT_ATTEMPTS") {
        config.push.reconnect_attempts = parse_var("ESUSYNC_RECONNECT_ATTEMPTS", &value)?;
    }
    if let Some(value) = lookup("ESUSYNC_RECONNECT_DELAY_MS") {
        config.push.reconnect_base_delay_ms = parse_var("ESUSYNC_RECONNECT_DELAY_MS", &value)?;
    }
    if let Some(value) = lookup("ESUSYNC_DOWNLOAD_DIR") {
        config.downloads.dir = PathBuf::from(value);
    }
    if let Some(value) = lookup("ESUSYNC_CACHE_PATH") {
        config.cache.path = PathBuf::from(value);
    }
    Ok(())
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SyncError> {
    value
        .parse()
        .map_err(|_| SyncError::Config(format!("{key} has an unparseable value: {value:?}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_configured() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let config = load_from_dir(tmp.path(), &env(&[])).expect("config");
        assert_eq!(config.backend.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.push.reconnect_attempts, 5);
        assert_eq!(config.push.reconnect_base_delay_ms, 2000);
    }

    #[test]
    fn json_file_in_working_directory_is_picked_up() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            tmp.path().join("esusync.json"),
            r#"{"backend": {"base_url": "http://10.0.0.2:5000", "timeout_secs": 10}}"#,
        )
        .expect("write");

        let config = load_from_dir(tmp.path(), &env(&[])).expect("config");
        assert_eq!(config.backend.base_url, "http://10.0.0.2:5000");
        assert_eq!(config.backend.timeout_secs, 10);
        assert_eq!(config.backend.max_attempts, 3);
    }

    #[test]
    fn toml_file_in_an_ancestor_is_found() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            tmp.path().join("esusync.toml"),
            "[backend]\nbase_url = \"http://10.0.0.3:5000\"\n",
        )
        .expect("write");
        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested).expect("mkdir");

        let config = load_from_dir(&nested, &env(&[])).expect("config");
        assert_eq!(config.backend.base_url, "http://10.0.0.3:5000");
    }

    #[test]
    fn env_overrides_beat_the_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            tmp.path().join("config.json"),
            r#"{"backend": {"base_url": "http://file-wins:5000"}}"#,
        )
        .expect("write");

        let config = load_from_dir(
            tmp.path(),
            &env(&[
                ("ESUSYNC_BASE_URL", "http://env-wins:5000"),
                ("ESUSYNC_RECONNECT_ATTEMPTS", "9"),
                ("ESUSYNC_DOWNLOAD_DIR", "/tmp/artifacts"),
            ]),
        )
        .expect("config");
        assert_eq!(config.backend.base_url, "http://env-wins:5000");
        assert_eq!(config.push.reconnect_attempts, 9);
        assert_eq!(config.downloads.dir, PathBuf::from("/tmp/artifacts"));
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let result = load_from_dir(
            tmp.path(),
            &env(&[("ESUSYNC_CONFIG", "/definitely/not/here.json")]),
        );
        assert!(matches!(result, Err(SyncError::Config(_))));
    }

    #[test]
    fn unparseable_numeric_override_is_a_config_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let result =
            load_from_dir(tmp.path(), &env(&[("ESUSYNC_TIMEOUT_SECS", "soon")]));
        assert!(matches!(result, Err(SyncError::Config(_))));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("esusync.json"), "{").expect("write");
        let result = load_from_dir(tmp.path(), &env(&[]));
        assert!(matches!(result, Err(SyncError::Config(_))));
    }
}
