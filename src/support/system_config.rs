//-
// Copyright (c) 2026, Jason Lingle
//
// This file is part of Mailbackend.
//
// Mailbackend is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailbackend is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along with
// Mailbackend. If not, see <http://www.gnu.org/licenses/>.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::registry::LoaderOptions;
use crate::support::error::ConfigError;

pub const SYSTEM_CONFIG_FILE: &str = "mailbackend.toml";

/// The installation-wide configuration for the backend loader.
///
/// This is stored in a file named `mailbackend.toml` under the configuration
/// root, next to `backends.toml`. The file is optional; all options have
/// defaults.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SystemConfig {
    /// Options controlling how backend definitions are loaded.
    #[serde(default)]
    pub loader: LoaderConfig,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// If true, setting an IMAP-only option on a POP backend is a
    /// configuration error. By default such options are ignored with a
    /// warning.
    pub strict_imap_fields: bool,

    /// If true, a per-host override file named `backends-<host>.toml` is
    /// applied after all other layers.
    pub vhosts: bool,

    /// The host name used to select the per-host override and the preferred
    /// backend.
    ///
    /// If unset, the system host name is used.
    pub hostname: String,
}

impl LoaderConfig {
    pub fn options(&self) -> LoaderOptions {
        LoaderOptions {
            strict_imap_fields: self.strict_imap_fields,
        }
    }
}

impl SystemConfig {
    /// Read `mailbackend.toml` from `root`, falling back to the defaults if
    /// it does not exist.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(SYSTEM_CONFIG_FILE);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if io::ErrorKind::NotFound == e.kind() => {
                return Ok(SystemConfig::default())
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        toml::from_slice(&data)
            .map_err(|source| ConfigError::Syntax { path, source })
    }
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults_without_file() {
        let root = TempDir::new().unwrap();
        let config = SystemConfig::load(root.path()).unwrap();
        assert!(!config.loader.strict_imap_fields);
        assert!(!config.loader.vhosts);
        assert!(config.loader.hostname.is_empty());
        assert_eq!(LoaderOptions::default(), config.loader.options());
    }

    #[test]
    fn parse() {
        let root = TempDir::new().unwrap();
        fs::write(
            root.path().join(SYSTEM_CONFIG_FILE),
            "[loader]\nstrict_imap_fields = true\nvhosts = true\n",
        )
        .unwrap();

        let config = SystemConfig::load(root.path()).unwrap();
        assert!(config.loader.options().strict_imap_fields);
        assert!(config.loader.vhosts);
        assert!(config.loader.hostname.is_empty());
    }

    #[test]
    fn syntax_error() {
        let root = TempDir::new().unwrap();
        fs::write(
            root.path().join(SYSTEM_CONFIG_FILE),
            "[loader]\nvhosts = \"yes\"\n",
        )
        .unwrap();

        assert_matches!(
            Err(ConfigError::Syntax { .. }),
            SystemConfig::load(root.path())
        );
    }
}
