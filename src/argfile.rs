//! Argument files: typed template arguments loaded from TOML
//!
//! The CLI accepts an `[args]` table of name = value pairs. TOML types map
//! directly onto argument types (string, integer, float, boolean), so a
//! file doubles as the argument declaration and the argument vector.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::value::{ArgumentDescriptor, TypeRef, Value};

/// Errors that can occur when loading or parsing argument files
#[derive(Error, Debug)]
pub enum ArgFileError {
    #[error("failed to read argument file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse argument file TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("argument '{name}' has unsupported TOML type {ty}")]
    Unsupported { name: String, ty: &'static str },
}

/// TOML structure for deserializing argument files
#[derive(Deserialize)]
struct TomlArgFile {
    #[serde(default)]
    args: toml::Table,
}

/// Template arguments loaded from a TOML file.
///
/// Entries bind in name order, so the binding order is deterministic
/// regardless of the layout of the file.
#[derive(Debug, Clone, Default)]
pub struct ArgFile {
    pub entries: Vec<(ArgumentDescriptor, Value)>,
}

impl ArgFile {
    /// Load arguments from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ArgFileError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load arguments from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ArgFileError> {
        let parsed: TomlArgFile = toml::from_str(content)?;

        let mut entries = Vec::with_capacity(parsed.args.len());
        for (name, value) in parsed.args {
            let (ty, value) = match value {
                toml::Value::String(s) => (TypeRef::String, Value::Str(s)),
                toml::Value::Integer(n) => (TypeRef::Int, Value::Int(n)),
                toml::Value::Float(x) => (TypeRef::Float, Value::Float(x)),
                toml::Value::Boolean(b) => (TypeRef::Bool, Value::Bool(b)),
                toml::Value::Datetime(_) => {
                    return Err(ArgFileError::Unsupported {
                        name,
                        ty: "datetime",
                    })
                }
                toml::Value::Array(_) => {
                    return Err(ArgFileError::Unsupported { name, ty: "array" })
                }
                toml::Value::Table(_) => {
                    return Err(ArgFileError::Unsupported { name, ty: "table" })
                }
            };
            entries.push((ArgumentDescriptor::new(name, ty), value));
        }
        entries.sort_by(|(a, _), (b, _)| a.identifier.cmp(&b.identifier));

        Ok(ArgFile { entries })
    }

    /// The argument descriptors, in binding order
    pub fn descriptors(&self) -> Vec<ArgumentDescriptor> {
        self.entries.iter().map(|(d, _)| d.clone()).collect()
    }

    /// The argument values, in binding order
    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }
}
