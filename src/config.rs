//! Connection properties.
//!
//! Properties can be built in code, taken from a preset, or loaded from a
//! TOML file:
//!
//! ```toml
//! implementation = "memory"
//! host = "localhost"
//! port = 3306
//! user = "root"
//! password = ""
//! database = "test"
//! ```
//!
//! Missing keys take their [`Default`] values.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Implementation name served by [`MemorySessionFactory`](crate::MemorySessionFactory)
pub const MEMORY_IMPLEMENTATION: &str = "memory";

/// Properties used to open a session
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionProperties {
    /// Name of the session implementation to use
    pub implementation: String,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// User name
    pub user: String,
    /// Password; never printed by `Debug`
    pub password: String,
    /// Cluster connect string, if the implementation uses one
    pub connect_string: Option<String>,
    /// Default database for the session
    pub database: String,
}

impl Default for ConnectionProperties {
    fn default() -> Self {
        ConnectionProperties {
            implementation: MEMORY_IMPLEMENTATION.to_string(),
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            connect_string: None,
            database: "test".to_string(),
        }
    }
}

impl ConnectionProperties {
    /// Properties for a local server with the default user
    pub fn local() -> Self {
        Self::default()
    }

    /// Properties for `user` on a local server
    pub fn for_user(user: impl Into<String>, password: impl Into<String>) -> Self {
        ConnectionProperties {
            user: user.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Parse properties from a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let props: ConnectionProperties = toml::from_str(s)?;
        props.validate()?;
        Ok(props)
    }

    /// Load properties from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Render as a TOML document
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check the properties are usable
    pub fn validate(&self) -> Result<()> {
        if self.implementation.is_empty() {
            return Err(Error::Config("implementation must not be empty".into()));
        }
        if self.host.is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(Error::Config("port must be non-zero".into()));
        }
        Ok(())
    }

    /// Set the implementation name
    pub fn with_implementation(mut self, implementation: impl Into<String>) -> Self {
        self.implementation = implementation.into();
        self
    }

    /// Set the connect string
    pub fn with_connect_string(mut self, connect_string: impl Into<String>) -> Self {
        self.connect_string = Some(connect_string.into());
        self
    }

    /// Set the default database
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ConnectionProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProperties")
            .field("implementation", &self.implementation)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("connect_string", &self.connect_string)
            .field("database", &self.database)
            .finish()
    }
}
