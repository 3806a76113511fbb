//! Session configuration, as read from a toml file.
//!
//! ```toml
//! basedn = "dc=example,dc=com"
//! uid = "cn=manager,cn=internal,dc=example,dc=com"
//! pass = "secret"
//! charset = "UTF-8"
//! filter = "(objectClass=kolabInetOrgPerson)"
//! no_anonymous_bind = true
//! log_level = "debug"
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use sketching::LogLevel;

use crate::filter::{parse, Charset, FilterCompiler};
use crate::prelude::*;

fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    /// The base dn every search runs below, eg `dc=example,dc=com`.
    pub basedn: String,
    /// The dn to bind with. Empty binds anonymously.
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub pass: String,
    /// Either "UTF-8" or "ASCII".
    #[serde(default = "default_charset")]
    pub charset: String,
    /// A filter that is and-ed around every query of the session.
    pub filter: Option<String>,
    #[serde(default)]
    pub no_anonymous_bind: bool,
    #[serde(default)]
    pub log_level: LogLevel,
}

impl DirectoryConfig {
    /// An anonymous configuration for `basedn` with everything else defaulted.
    pub fn for_base(basedn: &str) -> Self {
        DirectoryConfig {
            basedn: basedn.to_string(),
            uid: String::new(),
            pass: String::new(),
            charset: default_charset(),
            filter: None,
            no_anonymous_bind: false,
            log_level: LogLevel::default(),
        }
    }

    pub fn new<P: AsRef<Path>>(config_path: P) -> Result<Self, OperationError> {
        let mut f = File::open(config_path.as_ref()).map_err(|e| {
            admin_error!("Unable to open config file [{:?}] - {:?}", config_path.as_ref(), e);
            OperationError::InvalidConfig(e.to_string())
        })?;

        let mut contents = String::new();
        f.read_to_string(&mut contents).map_err(|e| {
            admin_error!("unable to read contents {:?}", e);
            OperationError::InvalidConfig(e.to_string())
        })?;

        Self::from_toml_str(contents.as_str())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, OperationError> {
        let config: DirectoryConfig = toml::from_str(contents).map_err(|e| {
            admin_error!("unable to parse config {:?}", e);
            OperationError::InvalidConfig(e.to_string())
        })?;

        if config.basedn.trim().is_empty() {
            admin_error!("basedn must not be empty");
            return Err(OperationError::InvalidConfig(
                "basedn must not be empty".to_string(),
            ));
        }
        config.get_charset()?;
        Ok(config)
    }

    /// Install the forest logger at the configured level. Does nothing if a logger is
    /// already installed.
    pub fn start_logging(&self) {
        sketching::start_logging(self.log_level);
        admin_info!(log_level = %self.log_level, basedn = %self.basedn, "logging started");
    }

    pub fn get_charset(&self) -> Result<Charset, OperationError> {
        Charset::from_label(&self.charset)
    }

    /// Build the compiler for this configuration. The base filter has to parse, or every
    /// query of the session would be rejected by the directory.
    pub fn compiler(&self) -> Result<FilterCompiler, OperationError> {
        let compiler = FilterCompiler::new(self.filter.as_deref(), self.get_charset()?);
        if let Some(base) = compiler.base_filter() {
            parse(base).map_err(|e| {
                admin_error!(?e, "invalid base filter {}", base);
                OperationError::InvalidConfig(format!("invalid base filter {}: {}", base, e))
            })?;
        }
        Ok(compiler)
    }
}
