//! Runtime settings for the `gibreg` binary.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. `config.toml` (or the `--config` path), if present;
//! 2. the environment-specific sibling `config.<env>.toml`, if present;
//! 3. `GIBREG_*` environment variables (e.g. `GIBREG_STORE_PATH`).

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable selecting the environment-specific config file.
pub const ENV_VAR: &str = "GIBREG_ENV";
pub const DEFAULT_ENV: &str = "production";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
}

fn default_store_path() -> PathBuf { PathBuf::from("gibreg.db") }

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 5233 }

impl Settings {
  /// Load settings layered on top of `path` for the given environment name.
  pub fn load(path: &Path, env: &str) -> Result<Self, config::ConfigError> {
    Self::load_layers(path, env, environment())
  }

  fn load_layers(
    path: &Path,
    env: &str,
    environment: config::Environment,
  ) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(config::File::from(env_specific_path(path, env)).required(false))
      .add_source(environment)
      .build()?
      .try_deserialize()
  }

  /// `store_path` with a leading `~/` expanded to the home directory.
  pub fn resolved_store_path(&self) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    expand_tilde(&self.store_path, home.as_deref())
  }
}

fn environment() -> config::Environment {
  config::Environment::with_prefix("GIBREG").try_parsing(true)
}

/// `dir/config.toml` + `staging` → `dir/config.staging.toml`.
fn env_specific_path(path: &Path, env: &str) -> PathBuf {
  let stem = path
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_else(|| "config".to_string());
  let file_name = match path.extension() {
    Some(ext) => format!("{stem}.{env}.{}", ext.to_string_lossy()),
    None => format!("{stem}.{env}"),
  };
  path.with_file_name(file_name)
}

/// Expand a leading `~` to `home`.
fn expand_tilde(path: &Path, home: Option<&Path>) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Some(home) = home
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_files_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load(&dir.path().join("config.toml"), "test").unwrap();

    assert_eq!(settings.host, "127.0.0.1");
    assert_eq!(settings.port, 5233);
  }

  #[test]
  fn environment_file_overrides_base_file() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("config.toml");
    std::fs::write(&base, "store_path = \"base.db\"\nport = 9000\n").unwrap();
    std::fs::write(
      dir.path().join("config.staging.toml"),
      "store_path = \"staging.db\"\n",
    )
    .unwrap();

    let settings = Settings::load(&base, "staging").unwrap();
    assert_eq!(settings.store_path, PathBuf::from("staging.db"));
    assert_eq!(settings.port, 9000);

    let other = Settings::load(&base, "development").unwrap();
    assert_eq!(other.store_path, PathBuf::from("base.db"));
  }

  #[test]
  fn env_specific_file_name() {
    assert_eq!(
      env_specific_path(Path::new("/etc/gibreg/config.toml"), "production"),
      PathBuf::from("/etc/gibreg/config.production.toml")
    );
    assert_eq!(
      env_specific_path(Path::new("settings"), "dev"),
      PathBuf::from("settings.dev")
    );
  }

  #[test]
  fn prefixed_variables_override_files() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("config.toml");
    std::fs::write(&base, "host = \"0.0.0.0\"\nport = 9000\n").unwrap();
    std::fs::write(dir.path().join("config.staging.toml"), "port = 9001\n")
      .unwrap();

    let vars: config::Map<String, String> =
      [("GIBREG_PORT".to_string(), "9100".to_string())]
        .into_iter()
        .collect();
    let settings =
      Settings::load_layers(&base, "staging", environment().source(Some(vars)))
        .unwrap();

    assert_eq!(settings.port, 9100);
    assert_eq!(settings.host, "0.0.0.0");
  }

  #[test]
  fn leading_tilde_expands_to_home() {
    let home = Path::new("/home/muhasebe");
    assert_eq!(
      expand_tilde(Path::new("~/x.db"), Some(home)),
      PathBuf::from("/home/muhasebe/x.db")
    );
    assert_eq!(
      expand_tilde(Path::new("~/x.db"), None),
      PathBuf::from("~/x.db")
    );
    assert_eq!(
      expand_tilde(Path::new("/srv/~/x.db"), Some(home)),
      PathBuf::from("/srv/~/x.db")
    );
  }

  #[test]
  fn relative_store_path_is_untouched() {
    let settings = Settings {
      store_path: PathBuf::from("data/gibreg.db"),
      host:       default_host(),
      port:       default_port(),
    };
    assert_eq!(settings.resolved_store_path(), PathBuf::from("data/gibreg.db"));
  }
}
