//! Configuration file loading.
//!
//! The file format follows the extension: `.yaml`/`.yml`, `.toml` or
//! `.json`. Environment overrides are applied after parsing, then the result
//! is validated.

use shopsift_core::{AppConfig, ConfigError, ShopsiftError, ShopsiftResult};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "SHOPSIFT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/settings.yaml";

/// `--config` if given, then `SHOPSIFT_CONFIG`, then the default path.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    std::env::var(CONFIG_ENV_VAR)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn parse_error(path: &Path, reason: impl std::fmt::Display) -> ShopsiftError {
    ShopsiftError::Config(ConfigError::Parse {
        reason: format!("{}: {}", path.display(), reason),
    })
}

/// Parse a config document without env overrides or validation.
pub fn parse_config(path: &Path, contents: &str) -> ShopsiftResult<AppConfig> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| parse_error(path, e)),
        "toml" => toml::from_str(contents).map_err(|e| parse_error(path, e)),
        "json" => serde_json::from_str(contents).map_err(|e| parse_error(path, e)),
        other => Err(parse_error(path, format!("unsupported config format '{}'", other))),
    }
}

/// Load, overlay the environment and validate.
pub fn load_config(explicit: Option<&Path>) -> ShopsiftResult<AppConfig> {
    let path = resolve_config_path(explicit);
    let contents = std::fs::read_to_string(&path).map_err(|e| parse_error(&path, e))?;
    let mut config = parse_config(&path, &contents)?;
    config.apply_env_overrides();
    config.validate()?;
    tracing::info!(
        path = %path.display(),
        base_url = %config.api.base_url,
        batch_size = config.processing.batch_size,
        intelligent_discovery = config.processing.intelligent_discovery,
        "Configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_yaml_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "settings.yaml",
            "api:\n  base_url: https://shop.example.com/api/mcp\n  retries: 5\nprocessing:\n  batch_size: 10\n  strict_filters: true\n",
        );
        let config = parse_config(&path, &std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.api.retries, 5);
        assert_eq!(config.processing.batch_size, 10);
        assert!(config.processing.strict_filters);
        // untouched sections keep defaults
        assert_eq!(config.processing.targeted_limit, AppConfig::default().processing.targeted_limit);
        assert_eq!(config.storage.sheet_name, "Detail");
    }

    #[test]
    fn test_toml_and_json_configs() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = write_file(
            &dir,
            "settings.toml",
            "[api]\nbase_url = \"https://a.example\"\n\n[reducer]\nmax_tags = 3\n",
        );
        let config = parse_config(&toml_path, &std::fs::read_to_string(&toml_path).unwrap()).unwrap();
        assert_eq!(config.api.base_url, "https://a.example");
        assert_eq!(config.reducer.max_tags, 3);

        let json_path = write_file(&dir, "settings.json", r#"{"processing": {"delay_between_requests_secs": 0.0}}"#);
        let config = parse_config(&json_path, &std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(config.processing.delay_between_requests_secs, 0.0);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = parse_config(Path::new("settings.ini"), "").unwrap_err();
        assert!(matches!(err, ShopsiftError::Config(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let err = parse_config(Path::new("settings.yml"), "api: [unclosed").unwrap_err();
        assert!(matches!(err, ShopsiftError::Config(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_resolve_prefers_explicit_then_env() {
        let _guard = EnvVarGuard::set(CONFIG_ENV_VAR, Some("/etc/shopsift.toml"));
        assert_eq!(
            resolve_config_path(Some(Path::new("local.yaml"))),
            PathBuf::from("local.yaml")
        );
        assert_eq!(resolve_config_path(None), PathBuf::from("/etc/shopsift.toml"));

        drop(_guard);
        let _guard = EnvVarGuard::set(CONFIG_ENV_VAR, None);
        assert_eq!(resolve_config_path(None), PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn test_load_validates() {
        let dir = tempfile::tempdir().unwrap();
        let _url = EnvVarGuard::set("SHOPSIFT_API_BASE_URL", None);
        let path = write_file(&dir, "settings.yaml", "processing:\n  batch_size: 5\n");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ShopsiftError::Config(ConfigError::MissingRequired { .. })));

        let path = write_file(&dir, "ok.yaml", "api:\n  base_url: https://shop.example.com/api/mcp\n");
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.api.base_url, "https://shop.example.com/api/mcp");
    }

    #[test]
    fn test_missing_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, ShopsiftError::Config(ConfigError::Parse { .. })));
    }
}
