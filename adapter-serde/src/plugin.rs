use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The closed plugin vocabulary of §3.1: external enumeration tools
/// the archive/package analyzers may shell out to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plugin {
    Tar,
    SevenZip,
}

impl Plugin {
    /// Parse a normalized (lowercased, trimmed) plugin name. `7z` is
    /// the wire spelling for `SevenZip`.
    pub fn parse(name: &str) -> Option<Plugin> {
        match name {
            "tar" => Some(Plugin::Tar),
            "7z" => Some(Plugin::SevenZip),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Plugin::Tar => "tar",
            Plugin::SevenZip => "7z",
        }
    }

    /// The command this plugin invokes for enumeration.
    pub fn command(self) -> &'static str {
        match self {
            Plugin::Tar => "tar",
            Plugin::SevenZip => "7z",
        }
    }
}

impl fmt::Display for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while normalizing a raw plugin-name list into an
/// `EnabledPlugins` set (§4.1 preprocessing steps 1-2).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PluginGateError {
    /// A requested name is outside `{tar, 7z}`.
    Unknown(String),
    /// A requested name appears more than once.
    Duplicate(String),
}

impl fmt::Display for PluginGateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginGateError::Unknown(name) => {
                write!(f, "unknown plugin name: {name}")
            }
            PluginGateError::Duplicate(name) => {
                write!(f, "duplicate plugin name: {name}")
            }
        }
    }
}

impl std::error::Error for PluginGateError {}

/// A normalized, duplicate-free set of requested plugins.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EnabledPlugins(BTreeSet<Plugin>);

impl EnabledPlugins {
    /// Normalize raw plugin-name strings: lowercase, trim, reject
    /// unknown names and duplicates (§4.1 steps 1-3).
    pub fn normalize<I, S>(names: I) -> Result<EnabledPlugins, PluginGateError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for raw in names {
            let trimmed = raw.as_ref().trim().to_ascii_lowercase();
            let plugin = Plugin::parse(&trimmed)
                .ok_or_else(|| PluginGateError::Unknown(trimmed.clone()))?;
            if !set.insert(plugin) {
                return Err(PluginGateError::Duplicate(trimmed));
            }
        }
        Ok(EnabledPlugins(set))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, plugin: Plugin) -> bool {
        self.0.contains(&plugin)
    }

    pub fn iter(&self) -> impl Iterator<Item = Plugin> + '_ {
        self.0.iter().copied()
    }
}
