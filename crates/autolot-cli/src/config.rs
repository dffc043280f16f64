// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use autolot_app::{DEFAULT_MESSAGING_DESTINATION, MessagingConfig, normalize_destination};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LLM_IMAGE_MODEL: &str = "gpt-image-1";
const DEFAULT_LLM_API_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_LLM_TIMEOUT: &str = "60s";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub messaging: Messaging,
    #[serde(default)]
    pub llm: Llm,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            messaging: Messaging::default(),
            llm: Llm::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Messaging {
    pub destination: Option<String>,
}

impl Default for Messaging {
    fn default() -> Self {
        Self {
            destination: Some(DEFAULT_MESSAGING_DESTINATION.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Llm {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub image_model: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Llm {
    fn default() -> Self {
        Self {
            enabled: Some(false),
            base_url: Some(DEFAULT_LLM_BASE_URL.to_owned()),
            model: Some(DEFAULT_LLM_MODEL.to_owned()),
            image_model: Some(DEFAULT_LLM_IMAGE_MODEL.to_owned()),
            api_key_env: Some(DEFAULT_LLM_API_KEY_ENV.to_owned()),
            timeout: Some(DEFAULT_LLM_TIMEOUT.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("AUTOLOT_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set AUTOLOT_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(autolot_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values \
                     under [storage], [messaging], and [llm]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            autolot_db::validate_db_path(db_path)?;
        }

        if let Some(destination) = &self.messaging.destination {
            normalize_destination(destination).with_context(|| {
                format!("messaging.destination in {} is invalid", path.display())
            })?;
        }

        if let Some(timeout) = &self.llm.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "llm.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(name) = &self.llm.api_key_env
            && name.trim().is_empty()
        {
            bail!(
                "llm.api_key_env in {} must name an environment variable",
                path.display()
            );
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => autolot_db::default_db_path(),
        }
    }

    pub fn messaging_default(&self) -> Result<MessagingConfig> {
        let destination = self
            .messaging
            .destination
            .as_deref()
            .unwrap_or(DEFAULT_MESSAGING_DESTINATION);
        Ok(MessagingConfig {
            destination: normalize_destination(destination)?,
        })
    }

    pub fn llm_enabled(&self) -> bool {
        self.llm.enabled.unwrap_or(false)
    }

    pub fn llm_base_url(&self) -> &str {
        self.llm
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_LLM_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn llm_model(&self) -> &str {
        self.llm.model.as_deref().unwrap_or(DEFAULT_LLM_MODEL)
    }

    pub fn llm_image_model(&self) -> &str {
        self.llm
            .image_model
            .as_deref()
            .unwrap_or(DEFAULT_LLM_IMAGE_MODEL)
    }

    pub fn llm_timeout(&self) -> Result<Duration> {
        parse_duration(self.llm.timeout.as_deref().unwrap_or(DEFAULT_LLM_TIMEOUT))
    }

    /// The API key named by `llm.api_key_env`, if that variable is set and
    /// non-empty. Local servers usually need none.
    pub fn llm_api_key(&self) -> Option<String> {
        let name = self
            .llm
            .api_key_env
            .as_deref()
            .unwrap_or(DEFAULT_LLM_API_KEY_ENV);
        env::var(name)
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# autolot config\n\
             # Place this file at: {}\n\n\
             version = 1\n\n\
             [storage]\n\
             # Optional. Default is the platform data dir\n\
             # (for example ~/.local/share/autolot/autolot.db)\n\
             # db_path = \"/absolute/path/to/autolot.db\"\n\n\
             [messaging]\n\
             # Phone number that receives appointment requests, digits with country code\n\
             destination = \"{}\"\n\n\
             [llm]\n\
             enabled = false\n\
             base_url = \"{}\"\n\
             model = \"{}\"\n\
             image_model = \"{}\"\n\
             api_key_env = \"{}\"\n\
             timeout = \"{}\"\n",
            path.display(),
            DEFAULT_MESSAGING_DESTINATION,
            DEFAULT_LLM_BASE_URL,
            DEFAULT_LLM_MODEL,
            DEFAULT_LLM_IMAGE_MODEL,
            DEFAULT_LLM_API_KEY_ENV,
            DEFAULT_LLM_TIMEOUT,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 30s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_duration};
    use anyhow::Result;
    use autolot_testkit::temp_config_path;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let (temp, path) = temp_config_path()?;
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert!(!config.llm_enabled());
        assert_eq!(config.messaging_default()?.destination, "12815555555");
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[llm]\nmodel=\"gpt-4o-mini\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[storage], [messaging], and [llm]"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n\
             [messaging]\n\
             destination = \"+1 512-555-0100\"\n\
             [llm]\n\
             enabled = true\n\
             base_url=\"http://localhost:11434/v1\"\n\
             model=\"qwen3\"\n\
             image_model=\"flux\"\n\
             timeout=\"2s\"\n",
        )?;

        let config = Config::load(&path)?;
        assert!(config.llm_enabled());
        assert_eq!(config.llm_model(), "qwen3");
        assert_eq!(config.llm_image_model(), "flux");
        assert_eq!(config.llm_timeout()?, Duration::from_secs(2));
        assert_eq!(config.messaging_default()?.destination, "15125550100");
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn letters_in_destination_are_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[messaging]\ndestination = \"call me\"\n")?;
        let error = Config::load(&path).expect_err("non-numeric destination should fail");
        assert!(format!("{error:#}").contains("must be a phone number"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("AUTOLOT_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("AUTOLOT_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn db_path_prefers_storage_config_over_env_override() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) =
            write_config("version = 1\n[storage]\ndb_path = \"/explicit/from-config.db\"\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("AUTOLOT_DB_PATH", "/from/env.db");
        }
        let config = Config::load(&path)?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("AUTOLOT_DB_PATH");
        }
        assert_eq!(config.db_path()?, PathBuf::from("/explicit/from-config.db"));
        Ok(())
    }

    #[test]
    fn db_path_uses_env_override_when_storage_db_path_missing() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("AUTOLOT_DB_PATH", "/from/env-only.db");
        }
        let config = Config::load(&path)?;
        let resolved = config.db_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("AUTOLOT_DB_PATH");
        }
        assert_eq!(resolved, PathBuf::from("/from/env-only.db"));
        Ok(())
    }

    #[test]
    fn db_path_rejects_uri_style_storage_value() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[storage]\ndb_path = \"https://evil.example/autolot.db\"\n",
        )?;
        let error = Config::load(&path).expect_err("URI db_path should fail validation");
        assert!(error.to_string().contains("looks like a URI"));
        Ok(())
    }

    #[test]
    fn api_key_is_read_from_named_env_var() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) =
            write_config("version = 1\n[llm]\napi_key_env = \"AUTOLOT_TEST_LLM_KEY\"\n")?;
        let config = Config::load(&path)?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("AUTOLOT_TEST_LLM_KEY", " sk-local ");
        }
        let key = config.llm_api_key();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("AUTOLOT_TEST_LLM_KEY");
        }
        assert_eq!(key.as_deref(), Some("sk-local"));
        assert_eq!(config.llm_api_key(), None);
        Ok(())
    }

    #[test]
    fn llm_base_url_trims_trailing_slashes() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[llm]\nbase_url = \"http://localhost:11434/v1///\"\n")?;
        let config = Config::load(&path)?;
        assert_eq!(config.llm_base_url(), "http://localhost:11434/v1");
        Ok(())
    }

    #[test]
    fn llm_timeout_parses_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("oops").is_err());
        Ok(())
    }

    #[test]
    fn llm_timeout_rejects_non_positive_values_in_config() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[llm]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let (_temp, path) = temp_config_path()?;
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[messaging]"));
        std::fs::write(&path, example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.llm_image_model(), "gpt-image-1");
        Ok(())
    }
}
