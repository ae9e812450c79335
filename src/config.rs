//! Resolved application configuration.
//!
//! Configuration is code-first: build a [`Config`] with its setters, or read
//! it from `BATON_*` environment variables with [`Config::from_env`]. Handlers
//! get a read-only view through `ctx.config()`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Whether the application runs for local development or in production.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// Parses `development`/`dev` or `production`/`prod`, case-insensitively.
impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(Error::Config(format!("unknown mode `{other}`"))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only settings visible to every handler.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Config {
    root: PathBuf,
    mode: Mode,
    base_path: String,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `BATON_ROOT`, `BATON_MODE` and `BATON_BASE_PATH`. Unset
    /// variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(root) = var("BATON_ROOT") {
            config = config.root(root);
        }
        if let Some(mode) = var("BATON_MODE") {
            config = config.mode(mode.parse()?);
        }
        if let Some(base_path) = var("BATON_BASE_PATH") {
            config = config.base_path(base_path)?;
        }
        Ok(config)
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the prefix the application is mounted under.
    ///
    /// Must be empty or start with `/`; a trailing `/` is dropped.
    pub fn base_path(mut self, base_path: impl Into<String>) -> Result<Self> {
        let base_path = base_path.into();
        if !base_path.is_empty() && !base_path.starts_with('/') {
            return Err(Error::Config(format!(
                "base path `{base_path}` must start with `/`"
            )));
        }
        self.base_path = base_path.trim_end_matches('/').to_owned();
        Ok(self)
    }

    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    pub fn current_mode(&self) -> Mode {
        self.mode
    }

    pub fn mount_path(&self) -> &str {
        &self.base_path
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_vars(vars(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.current_mode(), Mode::Development);
        assert_eq!(config.mount_path(), "");
    }

    #[test]
    fn reads_every_variable() {
        let config = Config::from_vars(vars(&[
            ("BATON_ROOT", "/srv/app"),
            ("BATON_MODE", "PROD"),
            ("BATON_BASE_PATH", "/docs/"),
        ]))
        .unwrap();

        assert_eq!(config.root_dir(), Path::new("/srv/app"));
        assert_eq!(config.current_mode(), Mode::Production);
        assert_eq!(config.mount_path(), "/docs");
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = Config::from_vars(vars(&[("BATON_MODE", "staging")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_relative_base_path() {
        assert!(Config::new().base_path("docs").is_err());
    }
}
