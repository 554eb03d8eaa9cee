//! # Fiscal client configuration
//!
//! This crate provides the configuration layer shared by the fiscal client crates:
//! - Loading configuration from a `config.yaml` file
//! - Merging it over the embedded default configuration
//! - Environment variable overrides (`FISCAL_CONFIG__SECTION__KEY=value`)
//! - Typed getters and setters over a YAML value tree
//! - A lazily loaded global instance
//!
//! ## Usage
//!
//! ```no_run
//! use fiscalconfig::get_config;
//!
//! let config = get_config()?;
//! let level = config.get_log_min_level()?;
//! config.set_value(&["fiscal", "state"], "41".into())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("fiscal.yaml");

const CONFIG_FILE_NAME: &str = "config.yaml";
const DEFAULT_CONFIG_DIR: &str = ".fiscal";
const ENV_CONFIG_DIR: &str = "FISCAL_CONFIG";
const ENV_PREFIX: &str = "FISCAL_CONFIG__";

const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

lazy_static! {
    static ref CONFIG: Mutex<Option<Arc<Config>>> = Mutex::new(None);
}

/// Generates a typed getter reading a scalar at an arbitrary path.
///
/// Missing keys and values of the wrong type fall back to `default`.
macro_rules! impl_typed_getter {
    ($getter:ident, $ty:ty, $($pattern:pat $(if $guard:expr)? => $value:expr),+ $(,)?) => {
        pub fn $getter(&self, path: &[&str], default: $ty) -> $ty {
            match self.get_value(path) {
                $(Ok($pattern) $(if $guard)? => $value,)+
                Ok(other) => {
                    debug!(path = %path.join("."), value = ?other, "Unexpected value type, using default");
                    default
                }
                Err(_) => default,
            }
        }
    };
}

/// Configuration manager
///
/// Holds the merged YAML tree and the path of the file it is persisted to.
/// Keys are case-insensitive: they are lower-cased on load and on lookup.
#[derive(Debug)]
pub struct Config {
    config_dir: PathBuf,
    path: PathBuf,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(self.data.lock().clone()),
        }
    }
}

impl Config {
    /// Finds the configuration directory
    ///
    /// Lookup order:
    /// 1. The provided `directory` if not empty
    /// 2. The `FISCAL_CONFIG` environment variable
    /// 3. `.fiscal` in the current directory
    /// 4. `.fiscal` in the user's home directory
    ///
    /// Falls back to `.fiscal` in the current directory.
    pub fn find_config_dir(directory: &str) -> PathBuf {
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Using config directory from env");
            return PathBuf::from(env_path);
        }

        let local = Path::new(DEFAULT_CONFIG_DIR);
        if local.exists() {
            return local.to_path_buf();
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(DEFAULT_CONFIG_DIR);
            if home_config.exists() {
                return home_config;
            }
        }

        local.to_path_buf()
    }

    /// Creates the directory if needed and checks it is a writable directory
    fn prepare_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        let probe = path.join(".write_test");
        fs::write(&probe, b"probe")?;
        fs::remove_file(&probe)?;

        Ok(())
    }

    /// Loads the configuration
    ///
    /// The embedded defaults are merged with `config.yaml` from the
    /// configuration directory (when present), keys are lower-cased, then
    /// `FISCAL_CONFIG__*` environment variables are applied. The merged tree
    /// is written back so the file always lists every available key.
    ///
    /// # Arguments
    ///
    /// * `directory` - Configuration directory, or empty for the default lookup
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        Self::prepare_config_dir(&config_dir)?;
        info!(config_dir = %config_dir.display(), "Using config directory");

        let path = config_dir.join(CONFIG_FILE_NAME);

        let mut merged: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path.display(), "Loaded config file");
                let external: Value = serde_yaml::from_slice(&data)?;
                merge_yaml(&mut merged, &lower_keys(external));
            }
            Err(_) => {
                info!(config_file = %path.display(), "Config file not found, using embedded defaults");
            }
        }

        let mut data = lower_keys(merged);
        apply_env_overrides(&mut data, env::vars());

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(data),
        };
        config.save()?;
        Ok(config)
    }

    /// Directory holding `config.yaml`
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Resolves a path relative to the configuration directory
    ///
    /// Absolute paths are returned unchanged.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.config_dir.join(candidate)
        }
    }

    /// Writes the current tree to `config.yaml`
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.data.lock())?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets the value at `path` (e.g. `&["fiscal", "state"]`) and saves the file
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.data.lock();
            set_value_at(&mut data, path, value)?;
        }
        self.save()
    }

    /// Returns a copy of the value at `path`
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock();
        let mut current = &*data;
        for (i, key) in path.iter().enumerate() {
            let Value::Mapping(map) = current else {
                return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
            };
            current = map
                .get(&Value::String(key.to_lowercase()))
                .ok_or_else(|| anyhow!("Path {} does not exist", path[..=i].join(".")))?;
        }
        Ok(current.clone())
    }

    impl_typed_getter!(
        get_string_or,
        String,
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
    );

    impl_typed_getter!(
        get_bool_or,
        bool,
        Value::Bool(b) => b,
        Value::String(s) if s.eq_ignore_ascii_case("true") => true,
        Value::String(s) if s.eq_ignore_ascii_case("false") => false,
    );

    impl_typed_getter!(
        get_u64_or,
        u64,
        Value::Number(n) if n.is_u64() => n.as_u64().unwrap_or_default(),
        Value::String(s) if s.parse::<u64>().is_ok() => s.parse().unwrap_or_default(),
    );

    impl_typed_getter!(
        get_f64_or,
        f64,
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) if s.parse::<f64>().is_ok() => s.parse().unwrap_or_default(),
    );

    /// Reads a sequence of integers, e.g. a list of HTTP status codes
    pub fn get_u64_list(&self, path: &[&str]) -> Result<Vec<u64>> {
        match self.get_value(path)? {
            Value::Sequence(items) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .ok_or_else(|| anyhow!("{} contains a non integer item", path.join(".")))
                })
                .collect(),
            _ => Err(anyhow!("{} is not a sequence", path.join("."))),
        }
    }

    /// Stores a sequence of integers
    pub fn set_u64_list(&self, path: &[&str], values: &[u64]) -> Result<()> {
        let items = values
            .iter()
            .map(|v| Value::Number(Number::from(*v)))
            .collect();
        self.set_value(path, Value::Sequence(items))
    }

    /// Minimum tracing level (`logger.min_level`)
    pub fn get_log_min_level(&self) -> Result<String> {
        Ok(self.get_string_or(
            &["logger", "min_level"],
            DEFAULT_LOG_MIN_LEVEL.to_string(),
        ))
    }

    pub fn set_log_min_level(&self, level: &str) -> Result<()> {
        self.set_value(&["logger", "min_level"], Value::String(level.to_string()))
    }

    /// Whether logs are also written to the console (`logger.enable_console`)
    pub fn get_log_enable_console(&self) -> Result<bool> {
        Ok(self.get_bool_or(
            &["logger", "enable_console"],
            DEFAULT_LOG_ENABLE_CONSOLE,
        ))
    }
}

/// Returns the global configuration, loading it on first use
pub fn get_config() -> Result<Arc<Config>> {
    let mut slot = CONFIG.lock();
    if let Some(config) = slot.as_ref() {
        return Ok(config.clone());
    }
    let config = Arc::new(Config::load_config("")?);
    *slot = Some(config.clone());
    Ok(config)
}

fn set_value_at(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((head, rest)) = path.split_first() else {
        *data = value;
        return Ok(());
    };

    let Value::Mapping(map) = data else {
        return Err(anyhow!("Current node is not a mapping"));
    };

    let key = Value::String(head.to_lowercase());
    if rest.is_empty() {
        map.insert(key, value);
        return Ok(());
    }

    let entry = map
        .entry(key)
        .or_insert(Value::Mapping(Mapping::new()));
    set_value_at(entry, rest, value)
}

/// Applies `FISCAL_CONFIG__A__B=value` overrides to the tree
///
/// Values are parsed as YAML so `true`, `20` or `[500, 503]` keep their type.
fn apply_env_overrides<I>(config: &mut Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(stripped) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<&str> = stripped.split("__").filter(|p| !p.is_empty()).collect();
        if path.is_empty() {
            continue;
        }
        let parsed =
            serde_yaml::from_str::<Value>(&value).unwrap_or_else(|_| Value::String(value.clone()));
        if let Err(err) = set_value_at(config, &path, parsed) {
            debug!(key = %key, error = %err, "Ignoring environment override");
        }
    }
}

fn lower_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (key, lower_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys).collect()),
        other => other,
    }
}

/// Merges `external` into `default`
///
/// Mappings are merged key by key; scalars and sequences are replaced.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_in(dir: &tempfile::TempDir) -> Config {
        Config::load_config(dir.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_defaults_are_loaded_and_saved() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);

        assert_eq!(
            config.get_string_or(&["fiscal", "schema_version"], String::new()),
            "4.00"
        );
        assert_eq!(config.get_u64_or(&["fiscal", "timeout_secs"], 0), 20);
        assert!(dir.path().join("config.yaml").exists());
    }

    #[test]
    fn test_external_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "Fiscal:\n  State: \"41\"\n  verify_ssl: true\n",
        )
        .unwrap();

        let config = load_in(&dir);
        assert_eq!(config.get_string_or(&["fiscal", "state"], String::new()), "41");
        assert!(config.get_bool_or(&["fiscal", "verify_ssl"], false));
        // untouched keys keep their defaults
        assert_eq!(config.get_string_or(&["fiscal", "service"], String::new()), "nfe");
    }

    #[test]
    fn test_set_value_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);
        config
            .set_value(&["fiscal", "base_url"], "https://nfe.example".into())
            .unwrap();

        let reloaded = load_in(&dir);
        assert_eq!(
            reloaded.get_string_or(&["fiscal", "base_url"], String::new()),
            "https://nfe.example"
        );
    }

    #[test]
    fn test_env_overrides_keep_yaml_types() {
        let mut data: Value = serde_yaml::from_str(DEFAULT_CONFIG).unwrap();
        apply_env_overrides(
            &mut data,
            vec![
                ("FISCAL_CONFIG__fiscal__timeout_secs".to_string(), "5".to_string()),
                ("FISCAL_CONFIG__fiscal__retry__statuses".to_string(), "[503]".to_string()),
                ("UNRELATED".to_string(), "x".to_string()),
            ],
        );

        let timeout = &data["fiscal"]["timeout_secs"];
        assert_eq!(timeout.as_u64(), Some(5));
        let statuses = data["fiscal"]["retry"]["statuses"].as_sequence().unwrap();
        assert_eq!(statuses.len(), 1);
    }

    #[test]
    fn test_typed_getters_fall_back_on_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);

        assert_eq!(config.get_u64_or(&["nope", "missing"], 7), 7);
        assert!(config.get_value(&["nope"]).is_err());
        assert_eq!(
            config.get_u64_list(&["fiscal", "retry", "statuses"]).unwrap(),
            vec![500, 502, 503, 504]
        );
        assert!((config.get_f64_or(&["fiscal", "retry", "backoff_factor"], 0.0) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_resolve_path_is_relative_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_in(&dir);

        assert_eq!(config.resolve_path("cert.pfx"), dir.path().join("cert.pfx"));
        assert_eq!(config.resolve_path("/etc/cert.pfx"), PathBuf::from("/etc/cert.pfx"));
    }
}
