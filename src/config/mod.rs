use serde::{Deserialize, Serialize};
use std::{
    env,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{dialogue::Pacing, errors::ConfigError, utils};

const TMP_SUFFIX: &str = "tmp";
const DEFAULT_DEMO_LATENCY_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    #[default]
    Demo,
    Remote,
}

impl std::str::FromStr for BackendMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(Self::Demo),
            "remote" => Ok(Self::Remote),
            other => Err(ConfigError::InvalidValue {
                key: "backend.mode",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub mode: BackendMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,
    #[serde(default = "BackendConfig::default_latency_ms")]
    pub demo_latency_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::Demo,
            url: None,
            anon_key: None,
            demo_latency_ms: DEFAULT_DEMO_LATENCY_MS,
        }
    }
}

impl BackendConfig {
    fn default_latency_ms() -> u64 {
        DEFAULT_DEMO_LATENCY_MS
    }

    pub fn demo_latency(&self) -> Duration {
        Duration::from_millis(self.demo_latency_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub pacing: Pacing,
}

impl Config {
    /// Applies `SUPABASE_URL`, `SUPABASE_ANON_KEY`, `FINBOT_BACKEND` and `FINBOT_PACING`.
    ///
    /// Remote settings never switch the mode on their own; only `FINBOT_BACKEND`
    /// or the config file do.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    pub(crate) fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SUPABASE_URL") {
            self.backend.url = Some(url);
        }
        if let Some(key) = lookup("SUPABASE_ANON_KEY") {
            self.backend.anon_key = Some(key);
        }
        if let Some(mode) = lookup("FINBOT_BACKEND") {
            self.backend.mode = mode.parse()?;
        }
        if let Some(raw) = lookup("FINBOT_PACING") {
            let scale: f64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "pacing.scale",
                value: raw.clone(),
            })?;
            self.pacing = Pacing { scale };
        }
        self.validate()
    }

    /// Rejects values the file format accepts but the engine cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.pacing.is_valid() {
            return Err(ConfigError::InvalidValue {
                key: "pacing.scale",
                value: self.pacing.scale.to_string(),
            });
        }
        Ok(())
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_base_dir(utils::app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        fs::create_dir_all(&base)?;
        Ok(Self {
            path: utils::config_file_in(&base),
        })
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            let config: Config = serde_json::from_str(&data)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Loads the file and layers environment overrides on top.
    pub fn resolve(&self) -> Result<Config, ConfigError> {
        let mut config = self.load()?;
        config.apply_env()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_file_yields_demo_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config.backend.mode, BackendMode::Demo);
        assert_eq!(config.pacing, Pacing::default());
    }

    #[test]
    fn save_then_load_keeps_remote_settings() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).unwrap();
        let mut config = Config::default();
        config.backend.mode = BackendMode::Remote;
        config.backend.url = Some("https://demo.supabase.co".into());
        manager.save(&config).unwrap();
        assert_eq!(manager.load().unwrap(), config);
        assert!(!tmp_path(manager.path()).exists());
    }

    #[test]
    fn remote_url_alone_does_not_switch_mode() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("SUPABASE_URL", "https://xyzcompany.supabase.co"),
                ("SUPABASE_ANON_KEY", "public-anon-key"),
            ]))
            .unwrap();
        assert_eq!(config.backend.mode, BackendMode::Demo);
        assert_eq!(config.backend.anon_key.as_deref(), Some("public-anon-key"));
    }

    #[test]
    fn explicit_switch_and_pacing_override() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[("FINBOT_BACKEND", "Remote"), ("FINBOT_PACING", "0")]))
            .unwrap();
        assert_eq!(config.backend.mode, BackendMode::Remote);
        assert_eq!(config.pacing, Pacing::instant());
    }

    #[test]
    fn invalid_pacing_is_reported() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup(&[("FINBOT_PACING", "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "pacing.scale", .. }));
    }

    #[test]
    fn oversized_pacing_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup(&[("FINBOT_PACING", "1e300")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "pacing.scale", .. }));

        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).unwrap();
        fs::write(manager.path(), r#"{"pacing":{"scale":1e300}}"#).unwrap();
        let err = manager.load().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "pacing.scale", .. }));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"backend":{"mode":"remote"}}"#).unwrap();
        assert_eq!(config.backend.mode, BackendMode::Remote);
        assert_eq!(config.backend.demo_latency_ms, 1000);
        assert_eq!(config.pacing.scale, 1.0);
    }
}
