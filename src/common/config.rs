//! Configuration file handling
//!
//! The configuration is read once, environment indirections are resolved
//! eagerly, and the resulting [`Config`] is passed by reference to every
//! component that needs it. It is never mutated afterwards.

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::{config_path, environments_dir};
use super::{Error, Result};
use crate::prerequisites::PrerequisiteDecl;
use crate::sample::HttpMethod;

/// A configuration value that is either literal text or read from an
/// environment variable (`{env: NAME}`)
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SettingValue {
    Env { env: String },
    Literal(String),
}

/// Raw configuration as written in the config file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Base URL of the API under test
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token for prerequisite resource requests
    #[serde(default)]
    pub access_token: Option<SettingValue>,

    /// Wall-clock budget for a single sample
    #[serde(default = "default_sample_timeout", alias = "sample_timeout")]
    pub sample_timeout_secs: u64,

    /// Wall-clock budget for each environment provisioning command
    #[serde(default = "default_environment_timeout", alias = "virtualenv_creation_timeout")]
    pub environment_timeout_secs: u64,

    /// Recreate execution environments even if they already exist
    #[serde(default)]
    pub always_create_environments: bool,

    /// Where execution environments live
    #[serde(default)]
    pub environments_dir: Option<PathBuf>,

    #[serde(default = "default_virtualenv_name")]
    pub virtualenv_name: String,

    #[serde(default = "default_node_project_name", alias = "js_project_dir_name")]
    pub node_project_name: String,

    #[serde(default = "default_python_packages")]
    pub python_packages: Vec<String>,

    #[serde(default = "default_node_packages")]
    pub node_packages: Vec<String>,

    /// File next to each sample holding example parameter values
    #[serde(default = "default_companion_file_name")]
    pub companion_file_name: String,

    /// Directories ending with this suffix are left out of resource paths
    #[serde(default = "default_spec_dir_suffix")]
    pub spec_dir_suffix: String,

    /// Explain passed samples in the report too
    #[serde(default)]
    pub debug: bool,

    /// Static placeholder substitutions (token -> value)
    #[serde(default)]
    pub substitutions: IndexMap<String, SettingValue>,

    /// Response attribute renames keyed by resource path
    #[serde(default, alias = "resp_attr_replacements")]
    pub response_renames: IndexMap<String, Vec<IndexMap<String, String>>>,

    /// Resources created out of band before specific samples
    #[serde(default)]
    pub prerequisites: Vec<PrerequisiteDecl>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            access_token: None,
            sample_timeout_secs: default_sample_timeout(),
            environment_timeout_secs: default_environment_timeout(),
            always_create_environments: false,
            environments_dir: None,
            virtualenv_name: default_virtualenv_name(),
            node_project_name: default_node_project_name(),
            python_packages: default_python_packages(),
            node_packages: default_node_packages(),
            companion_file_name: default_companion_file_name(),
            spec_dir_suffix: default_spec_dir_suffix(),
            debug: false,
            substitutions: IndexMap::new(),
            response_renames: IndexMap::new(),
            prerequisites: Vec::new(),
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:8888".to_string()
}
fn default_sample_timeout() -> u64 {
    30
}
fn default_environment_timeout() -> u64 {
    120
}
fn default_virtualenv_name() -> String {
    ".pot-svt-env".to_string()
}
fn default_node_project_name() -> String {
    ".pot-node".to_string()
}
fn default_python_packages() -> Vec<String> {
    vec!["requests".to_string()]
}
fn default_node_packages() -> Vec<String> {
    vec!["unirest".to_string()]
}
fn default_companion_file_name() -> String {
    "debug.edn".to_string()
}
fn default_spec_dir_suffix() -> String {
    "_spec".to_string()
}

/// Resolved, immutable configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub access_token: Option<String>,
    pub sample_timeout: Duration,
    pub environment_timeout: Duration,
    pub always_create_environments: bool,
    pub environments_dir: PathBuf,
    pub virtualenv_name: String,
    pub node_project_name: String,
    pub python_packages: Vec<String>,
    pub node_packages: Vec<String>,
    pub companion_file_name: String,
    pub spec_dir_suffix: String,
    pub debug: bool,
    pub substitutions: IndexMap<String, String>,
    pub response_renames: IndexMap<String, Vec<IndexMap<String, String>>>,
    pub prerequisites: Vec<PrerequisiteDecl>,
}

impl Default for Config {
    fn default() -> Self {
        Self::build(ConfigFile::default(), None, IndexMap::new())
    }
}

impl Config {
    /// Load configuration from `path`, or from the default config file
    ///
    /// Returns default configuration if no path is given and the default
    /// file doesn't exist. Environment variables are read from the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Some(path.to_path_buf()),
            None => config_path().filter(|p| p.exists()),
        };

        let raw = match file {
            Some(path) => ConfigFile::read(&path)?,
            None => ConfigFile::default(),
        };

        Self::resolve(raw, |name| std::env::var(name).ok())
    }

    /// Resolve environment indirections and normalize values
    ///
    /// Every missing variable is collected so the user sees all of them at
    /// once instead of fixing them one run at a time.
    pub fn resolve<F>(raw: ConfigFile, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut resolve_value = |value: &SettingValue| -> Option<String> {
            match value {
                SettingValue::Literal(text) => Some(text.clone()),
                SettingValue::Env { env } => {
                    let found = lookup(env);
                    if found.is_none() && !missing.contains(env) {
                        missing.push(env.clone());
                    }
                    found
                }
            }
        };

        let access_token = raw.access_token.as_ref().and_then(&mut resolve_value);

        let mut substitutions = IndexMap::new();
        for (token, value) in &raw.substitutions {
            if let Some(text) = resolve_value(value) {
                substitutions.insert(token.clone(), text);
            }
        }

        if !missing.is_empty() {
            return Err(Error::MissingEnvironment(missing));
        }

        if raw.sample_timeout_secs == 0 {
            return Err(Error::Config(
                "sample_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Self::build(raw, access_token, substitutions))
    }

    /// Assemble a configuration from a file whose indirections are resolved
    fn build(
        raw: ConfigFile,
        access_token: Option<String>,
        substitutions: IndexMap<String, String>,
    ) -> Self {
        Self {
            api_url: normalize_api_url(&raw.api_url),
            access_token,
            sample_timeout: Duration::from_secs(raw.sample_timeout_secs),
            environment_timeout: Duration::from_secs(raw.environment_timeout_secs),
            always_create_environments: raw.always_create_environments,
            environments_dir: raw.environments_dir.unwrap_or_else(environments_dir),
            virtualenv_name: raw.virtualenv_name,
            node_project_name: raw.node_project_name,
            python_packages: raw.python_packages,
            node_packages: raw.node_packages,
            companion_file_name: raw.companion_file_name,
            spec_dir_suffix: raw.spec_dir_suffix,
            debug: raw.debug,
            substitutions,
            response_renames: raw.response_renames,
            prerequisites: raw.prerequisites,
        }
    }

    /// Attribute renames (old -> new) configured for a resource path
    pub fn renames_for(&self, path: &str) -> Vec<(String, String)> {
        self.response_renames
            .get(path)
            .map(|maps| {
                maps.iter()
                    .flat_map(|m| m.iter().map(|(from, to)| (from.clone(), to.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Prerequisite declared for exactly this resource path and method
    pub fn prerequisite_for(&self, path: &str, method: HttpMethod) -> Option<&PrerequisiteDecl> {
        self.prerequisites
            .iter()
            .find(|decl| decl.path == path && decl.method == method)
    }
}

impl ConfigFile {
    /// Read a YAML config file, or a TOML one when the extension is `.toml`
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
        let parse_error = |message: String| Error::ConfigParse {
            path: path.display().to_string(),
            message,
        };

        let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
        if is_toml {
            toml::from_str(&content).map_err(|e| parse_error(e.to_string()))
        } else if content.trim().is_empty() {
            Ok(Self::default())
        } else {
            serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))
        }
    }
}

fn normalize_api_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prerequisites::ResourceKind;

    fn parse(yaml: &str) -> ConfigFile {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.sample_timeout, Duration::from_secs(30));
        assert_eq!(config.companion_file_name, "debug.edn");
        assert!(config.substitutions.is_empty());
        assert!(!config.always_create_environments);
    }

    #[test]
    fn test_default_matches_resolved_empty_file() {
        let resolved = Config::resolve(ConfigFile::default(), |_| None).unwrap();
        let config = Config::default();
        assert_eq!(config.api_url, resolved.api_url);
        assert_eq!(config.environments_dir, resolved.environments_dir);
        assert_eq!(config.python_packages, resolved.python_packages);
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_env_substitutions_resolved() {
        let raw = parse(
            r#"
substitutions:
  "<AUTH_TOKEN>": { env: API_TOKEN }
  "<HOST>": "example.com"
access_token: { env: API_TOKEN }
"#,
        );
        let config = Config::resolve(raw, |name| {
            (name == "API_TOKEN").then(|| "secret".to_string())
        })
        .unwrap();
        assert_eq!(config.substitutions["<AUTH_TOKEN>"], "secret");
        assert_eq!(config.substitutions["<HOST>"], "example.com");
        assert_eq!(config.access_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_all_missing_env_reported_together() {
        let raw = parse(
            r#"
access_token: { env: TOKEN_A }
substitutions:
  "<A>": { env: VAR_B }
  "<B>": { env: VAR_C }
  "<C>": { env: VAR_B }
"#,
        );
        match Config::resolve(raw, |_| None) {
            Err(Error::MissingEnvironment(vars)) => {
                assert_eq!(vars, vec!["TOKEN_A", "VAR_B", "VAR_C"]);
            }
            other => panic!("Expected MissingEnvironment, got {:?}", other),
        }
    }

    #[test]
    fn test_renames_and_prerequisites() {
        let raw = parse(
            r#"
resp_attr_replacements:
  api/user:
    - { "@id": id }
    - { name: username }
prerequisites:
  - path: api/users
    method: POST
    resource: Identity
    subs: { "@id": "<username>" }
"#,
        );
        let config = Config::resolve(raw, |_| None).unwrap();
        assert_eq!(
            config.renames_for("api/user"),
            vec![
                ("@id".to_string(), "id".to_string()),
                ("name".to_string(), "username".to_string())
            ]
        );
        assert!(config.renames_for("api/other").is_empty());

        let decl = config.prerequisite_for("api/users", HttpMethod::Post).unwrap();
        assert_eq!(decl.resource, ResourceKind::Identity);
        assert!(config.prerequisite_for("api/users", HttpMethod::Get).is_none());
    }

    #[test]
    fn test_api_url_gets_scheme() {
        let raw = parse("api_url: api.example.com/");
        let config = Config::resolve(raw, |_| None).unwrap();
        assert_eq!(config.api_url, "https://api.example.com");
    }

    #[test]
    fn test_read_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "sample_timeout_secs = 5\ndebug = true\n").unwrap();
        let raw = ConfigFile::read(&path).unwrap();
        assert_eq!(raw.sample_timeout_secs, 5);
        assert!(raw.debug);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "sample_timeot: 5\n").unwrap();
        assert!(matches!(
            ConfigFile::read(&path),
            Err(Error::ConfigParse { .. })
        ));
    }
}
