use std::collections::HashMap;
use std::str::FromStr;

use crate::config::ConfigFile;
use crate::encryption::{cipher_by_name, Cipher};
use crate::error::{GoCdError, Result};

/// A single source of configuration values.
pub trait SettingsProvider: Send + Sync {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Fixed values, used for command-line overrides.
#[derive(Debug, Default, Clone)]
pub struct MapProvider {
    values: HashMap<String, String>,
}

impl MapProvider {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

impl SettingsProvider for MapProvider {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Reads `<PREFIX>_<KEY>` from the process environment.
#[derive(Debug, Clone)]
pub struct EnvironmentProvider {
    prefix: String,
}

impl EnvironmentProvider {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: env_name(prefix),
        }
    }

    fn variable_name(&self, key: &str) -> String {
        format!("{}_{}", self.prefix, env_name(key))
    }
}

fn env_name(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

impl SettingsProvider for EnvironmentProvider {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(self.variable_name(key)).ok()
    }
}

/// One section of a settings file.
#[derive(Debug, Default, Clone)]
pub struct FileProvider {
    values: HashMap<String, String>,
}

impl FileProvider {
    pub fn new(file: &ConfigFile, section: &str) -> Self {
        Self {
            values: file.section(section),
        }
    }
}

impl SettingsProvider for FileProvider {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Resolves settings by asking each provider in turn.
///
/// When `encryption_module` names a known cipher, `get("password")` first
/// looks for `password_encrypted` and returns it decrypted.
pub struct Settings {
    providers: Vec<Box<dyn SettingsProvider>>,
    cipher: Option<Box<dyn Cipher>>,
}

impl Settings {
    pub fn new(providers: Vec<Box<dyn SettingsProvider>>) -> Result<Self> {
        let mut settings = Self {
            providers,
            cipher: None,
        };

        if let Some(module) = settings.lookup("encryption_module") {
            settings.cipher = Some(cipher_by_name(&module)?);
        }

        Ok(settings)
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.providers.iter().find_map(|provider| provider.lookup(key))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(cipher) = &self.cipher {
            if let Some(ciphertext) = self.lookup(&format!("{key}_encrypted")) {
                return Some(cipher.decrypt(&ciphertext));
            }
        }

        self.lookup(key)
    }

    /// Parses a setting, treating blank values as unset.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key).as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|e| {
                GoCdError::Config(format!("Invalid value \"{value}\" for \"{key}\": {e}"))
            }),
        }
    }

    /// Comma separated setting as a list, skipping blank entries.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn cipher(&self) -> Option<&dyn Cipher> {
        self.cipher.as_deref()
    }
}

/// Everything settings can be resolved from, independent of section.
#[derive(Debug, Default, Clone)]
pub struct SettingsSource {
    file: ConfigFile,
    overrides: HashMap<String, HashMap<String, String>>,
}

impl SettingsSource {
    pub fn new(file: ConfigFile) -> Self {
        Self {
            file,
            overrides: HashMap::new(),
        }
    }

    /// Adds a value that takes precedence over environment and file.
    pub fn with_override(mut self, section: &str, key: &str, value: impl Into<String>) -> Self {
        self.overrides
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
        self
    }

    /// Settings for `section`: overrides, then `<SECTION>_*` env vars, then the file.
    pub fn section(&self, section: &str) -> Result<Settings> {
        let overrides = self.overrides.get(section).cloned().unwrap_or_default();

        Settings::new(vec![
            Box::new(MapProvider::new(overrides)),
            Box::new(EnvironmentProvider::new(section)),
            Box::new(FileProvider::new(&self.file, section)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::Caesar;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn map(pairs: &[(&str, &str)]) -> Box<dyn SettingsProvider> {
        Box::new(MapProvider::new(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        ))
    }

    #[test]
    fn test_providers_are_tried_in_order() {
        let settings = Settings::new(vec![
            map(&[("server", "http://first")]),
            map(&[("server", "http://second"), ("user", "ba")]),
        ])
        .unwrap();

        assert_eq!(settings.get("server").as_deref(), Some("http://first"));
        assert_eq!(settings.get("user").as_deref(), Some("ba"));
        assert_eq!(settings.get("password"), None);
    }

    #[test]
    fn test_encrypted_value_takes_precedence_when_cipher_configured() {
        let settings = Settings::new(vec![
            map(&[("encryption_module", "caesar")]),
            map(&[
                ("password", "plain"),
                ("password_encrypted", &Caesar.encrypt("s3cret")),
            ]),
        ])
        .unwrap();

        assert_eq!(settings.get("password").as_deref(), Some("s3cret"));
        assert_eq!(settings.cipher().map(Cipher::name), Some("caesar"));
    }

    #[test]
    fn test_encrypted_values_ignored_without_cipher() {
        let settings = Settings::new(vec![map(&[
            ("password", "plain"),
            ("password_encrypted", "cynva"),
        ])])
        .unwrap();

        assert_eq!(settings.get("password").as_deref(), Some("plain"));
        assert!(settings.cipher().is_none());
    }

    #[test]
    fn test_unknown_cipher_is_a_configuration_error() {
        let result = Settings::new(vec![map(&[("encryption_module", "enigma")])]);

        assert!(matches!(result, Err(GoCdError::Config(_))));
    }

    #[test]
    fn test_environment_provider_uses_prefix() {
        std::env::set_var("GOCDTEST_ENV_SERVER", "http://from-env:8153");
        let provider = EnvironmentProvider::new("gocdtest_env");

        assert_eq!(provider.lookup("server").as_deref(), Some("http://from-env:8153"));
        assert_eq!(provider.lookup("user"), None);
    }

    #[test]
    fn test_environment_names_replace_punctuation() {
        let provider = EnvironmentProvider::new("check_all");

        assert_eq!(
            provider.variable_name("My-Pipeline.v2_warn_run_time"),
            "CHECK_ALL_MY_PIPELINE_V2_WARN_RUN_TIME"
        );
    }

    #[test]
    fn test_get_parsed_and_lists() {
        let settings = Settings::new(vec![map(&[
            ("warn_run_time", " 15 "),
            ("crit_run_time", "soon"),
            ("ignored_pipelines", "Sandbox, ,Experiments,"),
        ])])
        .unwrap();

        assert_eq!(settings.get_parsed::<u64>("warn_run_time").unwrap(), Some(15));
        assert_eq!(settings.get_parsed::<u64>("missing").unwrap(), None);
        assert!(settings.get_parsed::<u64>("crit_run_time").is_err());
        assert_eq!(
            settings.get_list("ignored_pipelines"),
            vec!["Sandbox", "Experiments"]
        );
    }

    #[test]
    fn test_source_layers_overrides_environment_and_file() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(
            temp_file,
            "[gocdtest_layers]\nserver = \"http://file\"\nuser = \"file-user\"\npassword = \"file-pass\"\n"
        )
        .unwrap();
        std::env::set_var("GOCDTEST_LAYERS_USER", "env-user");

        let file = ConfigFile::load_from_path(temp_file.path()).unwrap();
        let source = SettingsSource::new(file).with_override("gocdtest_layers", "server", "http://flag");
        let settings = source.section("gocdtest_layers").unwrap();

        assert_eq!(settings.get("server").as_deref(), Some("http://flag"));
        assert_eq!(settings.get("user").as_deref(), Some("env-user"));
        assert_eq!(settings.get("password").as_deref(), Some("file-pass"));
    }
}
