use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ConfigError, EntryError};
use crate::timeout::Timeout;
use crate::{DescriptorBuilder, ServerDescriptor};

/// Path used when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "mcp_servers.json";

/// Key of the tool-provider table in the configuration document.
pub const SERVERS_KEY: &str = "mcp_servers";

/// The parsed configuration document.
///
/// The document is read once and never written back. Key order is kept as
/// it appears in the file.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    path: Option<PathBuf>,
    root: Map<String, Value>,
}

impl Config {
    /// Reads and parses a configuration file.
    ///
    /// Fails if the path does not exist, does not end in `.json`, cannot be
    /// read, or does not hold a JSON object.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_owned()));
        }
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if !is_json {
            return Err(ConfigError::NotJson(path.to_owned()));
        }

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let value: Value =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_owned(),
                source,
            })?;

        let mut config = Self::from_value(value)?;
        config.path = Some(path.to_owned());
        debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Wraps an already parsed document.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let Value::Object(root) = value else {
            return Err(ConfigError::NotAnObject);
        };
        Ok(Self { path: None, root })
    }

    /// Returns the file this configuration was read from.
    #[inline]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the raw document.
    #[inline]
    pub fn raw(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Returns the tool-provider table, if present and an object.
    pub fn server_entries(&self) -> Option<&Map<String, Value>> {
        match self.root.get(SERVERS_KEY)? {
            Value::Object(entries) => Some(entries),
            other => {
                warn!("`{SERVERS_KEY}` is not an object: {other}");
                None
            }
        }
    }
}

/// One row of the tool-provider table.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ServerEntry {
    /// The executable or launcher.
    pub command: String,
    /// Arguments for the command.
    pub args: Vec<String>,
    /// Environment overrides.
    #[serde(default)]
    pub env: Option<BTreeMap<String, String>>,
    /// Handshake bound.
    #[serde(default)]
    pub timeout: Option<Timeout>,
    /// Human readable description.
    #[serde(default)]
    pub description: Option<String>,
}

impl ServerEntry {
    /// Validates the structure of a raw entry.
    ///
    /// `command` and `args` are mandatory; the other fields are optional.
    pub fn parse(value: &Value) -> Result<Self, EntryError> {
        let Value::Object(fields) = value else {
            return Err(EntryError::NotAnObject);
        };
        for field in ["command", "args"] {
            if !fields.contains_key(field) {
                return Err(EntryError::MissingField(field));
            }
        }
        Self::deserialize(value).map_err(EntryError::Malformed)
    }

    /// Builds the descriptor for the provider named `name`.
    pub fn into_descriptor(self, name: &str) -> Result<ServerDescriptor, EntryError> {
        let mut builder = DescriptorBuilder::with_command(name, self.command)
            .with_args(self.args)
            .with_env(self.env);
        if let Some(timeout) = self.timeout {
            builder = builder.with_timeout(timeout.to_duration()?);
        }
        if let Some(description) = self.description {
            builder = builder.with_description(description);
        }
        Ok(builder.build())
    }
}
