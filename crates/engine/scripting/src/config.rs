//! KDL host configuration
//!
//! # Example
//!
//! ```kdl
//! desc "api/roblox.desc.json"
//! libraries "base" "sym" "rbxmk" "fs"
//! format "json" {
//!     Indent "\t"
//! }
//! format "base64" Width=64
//! ```
//!
//! - `desc` names a descriptor file installed as the global descriptor.
//!   Relative paths resolve against the configuration file's directory.
//! - `libraries` lists the libraries to open; all of them when absent.
//! - `format` sets default options for one format, as properties or as
//!   child nodes with a single argument.

use crate::{Error, Result};
use formats::Options;
use rtypes::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Settings applied to a world before scripts run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostConfig {
    pub desc: Option<PathBuf>,
    pub libraries: Option<Vec<String>>,
    pub formats: BTreeMap<String, Options>,
}

impl HostConfig {
    /// Parse a KDL configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::File {
            action: "read",
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_string(&content)?;
        if let (Some(desc), Some(dir)) = (&config.desc, path.parent()) {
            if desc.is_relative() {
                config.desc = Some(dir.join(desc));
            }
        }
        Ok(config)
    }

    /// Parse a KDL configuration string
    pub fn from_string(content: &str) -> Result<Self> {
        let doc: kdl::KdlDocument = content.parse()?;
        let mut config = Self::default();

        for node in doc.nodes() {
            match node.name().value() {
                "desc" => {
                    let [path] = string_args(node)?.try_into().map_err(|_| {
                        Error::Config("desc takes exactly one path".to_string())
                    })?;
                    config.desc = Some(PathBuf::from(path));
                }
                "libraries" => {
                    config
                        .libraries
                        .get_or_insert_with(Vec::new)
                        .extend(string_args(node)?);
                }
                "format" => {
                    let [name] = string_args(node)?.try_into().map_err(|_| {
                        Error::Config("format takes exactly one name".to_string())
                    })?;
                    let options = config.formats.entry(name).or_default();
                    parse_options(node, options)?;
                }
                other => tracing::warn!(node = other, "unknown configuration node"),
            }
        }

        Ok(config)
    }
}

/// Positional arguments of a node, all of which must be strings
fn string_args(node: &kdl::KdlNode) -> Result<Vec<String>> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| match e.value() {
            kdl::KdlValue::String(s) => Ok(s.clone()),
            other => Err(Error::Config(format!(
                "{} expects string arguments, got {other}",
                node.name().value()
            ))),
        })
        .collect()
}

/// Options from a node's properties and single-argument children
fn parse_options(node: &kdl::KdlNode, options: &mut Options) -> Result<()> {
    for entry in node.entries() {
        if let Some(name) = entry.name() {
            options.insert(name.value(), kdl_value(entry.value())?);
        }
    }
    if let Some(children) = node.children() {
        for child in children.nodes() {
            let mut args = child.entries().iter().filter(|e| e.name().is_none());
            match (args.next(), args.next()) {
                (Some(value), None) => options.insert(child.name().value(), kdl_value(value.value())?),
                _ => {
                    return Err(Error::Config(format!(
                        "option {} takes exactly one value",
                        child.name().value()
                    )))
                }
            }
        }
    }
    Ok(())
}

fn kdl_value(value: &kdl::KdlValue) -> Result<Value> {
    Ok(match value {
        kdl::KdlValue::String(s) => Value::String(s.clone()),
        kdl::KdlValue::Integer(i) => Value::Int64(
            i64::try_from(*i).map_err(|_| Error::Config(format!("integer {i} is out of range")))?,
        ),
        kdl::KdlValue::Float(f) => Value::Double(*f),
        kdl::KdlValue::Bool(b) => Value::Bool(*b),
        kdl::KdlValue::Null => Value::Nil,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let kdl = r#"
            desc "api.desc.json"
            libraries "base" "sym"
            libraries "fs"
            format "json" {
                Indent "\t"
            }
            format "base64" Width=64
        "#;

        let config = HostConfig::from_string(kdl).unwrap();
        assert_eq!(config.desc, Some(PathBuf::from("api.desc.json")));
        assert_eq!(
            config.libraries,
            Some(vec!["base".to_string(), "sym".to_string(), "fs".to_string()])
        );
        assert_eq!(config.formats["json"].string("Indent").as_deref(), Some("\t"));
        assert_eq!(config.formats["base64"].int("Width"), Some(64));
    }

    #[test]
    fn test_empty_config_opens_everything() {
        let config = HostConfig::from_string("").unwrap();
        assert_eq!(config, HostConfig::default());
        assert!(config.libraries.is_none());
    }

    #[test]
    fn test_bad_arguments() {
        let err = HostConfig::from_string("desc 1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: desc expects string arguments, got 1"
        );
        assert!(HostConfig::from_string("format \"json\" { Indent }").is_err());
        assert!(HostConfig::from_string("desc {").is_err());
    }

    #[test]
    fn test_relative_desc_resolves_against_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.kdl");
        std::fs::write(&path, "desc \"api.desc.json\"\n").unwrap();

        let config = HostConfig::from_file(&path).unwrap();
        assert_eq!(config.desc, Some(dir.path().join("api.desc.json")));
    }
}
