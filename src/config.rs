use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::error::{GoCdError, Result};

/// Settings file contents: named sections of key/value pairs.
///
/// Values may be written as strings, numbers, booleans or lists; they are
/// all normalised to strings (lists are joined with commas).
///
/// ```toml
/// [gocd]
/// server = "https://go.example.com:8154"
/// user = "monitor"
/// password_encrypted = "frperg"
/// encryption_module = "caesar"
///
/// [check_all]
/// ignored_pipelines = ["Sandbox", "Experiments"]
/// warn_run_time = 20
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    sections: HashMap<String, HashMap<String, String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<RawValue>),
}

impl RawValue {
    fn into_setting(self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s,
            Self::List(items) => items
                .into_iter()
                .map(Self::into_setting)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

type RawSections = HashMap<String, HashMap<String, RawValue>>;

impl ConfigFile {
    /// Default locations, first readable one wins.
    pub fn candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(home) = dirs::home_dir() {
            let dir = home.join(".gocd");
            for ext in ["toml", "yaml", "yml", "json"] {
                candidates.push(dir.join(format!("gocd-cli.{ext}")));
            }
        }
        candidates.push(PathBuf::from("/etc/go/gocd-cli.toml"));

        candidates
    }

    /// Load settings from `path`, or from the first default location that exists.
    ///
    /// Returns an empty configuration if no file is given and none is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        match Self::candidates().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load_from_path(&path),
            None => {
                debug!("No settings file found, using environment only");
                Ok(Self::default())
            }
        }
    }

    /// Load settings from a specific file path, picking the format by extension.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GoCdError::Config(format!("Failed to read settings file {}: {e}", path.display()))
        })?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        let raw: RawSections = match extension {
            "toml" => toml::from_str(&contents)?,
            "json" => serde_json::from_str(&contents)?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)?,
            _ => toml::from_str::<RawSections>(&contents)
                .ok()
                .or_else(|| serde_json::from_str(&contents).ok())
                .or_else(|| serde_yaml::from_str(&contents).ok())
                .ok_or_else(|| {
                    GoCdError::Config(format!(
                        "Failed to parse settings file: {}",
                        path.display()
                    ))
                })?,
        };

        debug!("Loaded settings from {}", path.display());

        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawSections) -> Self {
        let sections = raw
            .into_iter()
            .map(|(section, values)| {
                let values = values
                    .into_iter()
                    .map(|(key, value)| (key, value.into_setting()))
                    .collect();
                (section.to_lowercase(), values)
            })
            .collect();

        Self { sections }
    }

    /// Key/value pairs of one section, empty if the section is missing.
    pub fn section(&self, name: &str) -> HashMap<String, String> {
        self.sections
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(
            temp_file,
            r#"
[gocd]
server = "https://go.example.com:8154"
user = "monitor"

[check_all]
ignored_pipelines = ["Sandbox", "Experiments"]
warn_run_time = 20
verbose = true
"#
        )
        .unwrap();

        let config = ConfigFile::load_from_path(temp_file.path()).unwrap();

        let gocd = config.section("gocd");
        assert_eq!(gocd["server"], "https://go.example.com:8154");
        assert_eq!(gocd["user"], "monitor");

        let check_all = config.section("check_all");
        assert_eq!(check_all["ignored_pipelines"], "Sandbox,Experiments");
        assert_eq!(check_all["warn_run_time"], "20");
        assert_eq!(check_all["verbose"], "true");
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        write!(
            temp_file,
            r#"{{"gocd": {{"server": "http://localhost:8153", "password_encrypted": "frperg"}}}}"#
        )
        .unwrap();

        let config = ConfigFile::load_from_path(temp_file.path()).unwrap();

        assert_eq!(config.section("gocd")["password_encrypted"], "frperg");
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yml").unwrap();
        write!(
            temp_file,
            "gocd:\n  server: http://localhost:8153\ncheck_all:\n  crit_run_time: 90\n"
        )
        .unwrap();

        let config = ConfigFile::load_from_path(temp_file.path()).unwrap();

        assert_eq!(config.section("check_all")["crit_run_time"], "90");
    }

    #[test]
    fn test_unknown_extension_tries_each_format() {
        let mut temp_file = NamedTempFile::with_suffix(".cfg").unwrap();
        write!(temp_file, "[gocd]\nserver = \"http://go:8153\"\n").unwrap();

        let config = ConfigFile::load_from_path(temp_file.path()).unwrap();

        assert_eq!(config.section("gocd")["server"], "http://go:8153");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = ConfigFile::load(Some(Path::new("/nonexistent/gocd-cli.toml")));

        assert!(matches!(result, Err(GoCdError::Config(_))));
    }

    #[test]
    fn test_missing_section_is_empty() {
        assert!(ConfigFile::default().section("gocd").is_empty());
    }
}
