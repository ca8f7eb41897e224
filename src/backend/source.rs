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

//! Reading definition layers from a configuration root.
//!
//! Layers are read, in order, from:
//!
//! - `backends.toml`, the base definitions, which must exist;
//! - `backends.local.toml`, the local override, if it exists;
//! - every `*.toml` file in `backends.d/`, in file name order;
//! - `backends-<host>.toml`, if a virtual host name is given.
//!
//! Each file maps backend ids to tables of backend options, e.g.
//!
//! ```toml
//! [imap]
//! hostspec = "imap.example.com"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::layer::DefinitionLayer;
use crate::support::error::ConfigError;
use crate::support::safe_name::is_safe_host_name;

pub const BASE_FILE: &str = "backends.toml";
pub const LOCAL_FILE: &str = "backends.local.toml";
pub const FRAGMENT_DIR: &str = "backends.d";

/// Read all layers found under `root`.
///
/// `vhost` is the host name to look for a per-host override for, if virtual
/// hosts are enabled.
pub fn read_layers(
    root: &Path,
    vhost: Option<&str>,
) -> Result<Vec<DefinitionLayer>, ConfigError> {
    let mut layers = Vec::new();

    layers.push(read_layer(&root.join(BASE_FILE))?);

    let local = root.join(LOCAL_FILE);
    if local.is_file() {
        layers.push(read_layer(&local)?);
    }

    for fragment in fragments(&root.join(FRAGMENT_DIR))? {
        layers.push(read_layer(&fragment)?);
    }

    if let Some(host) = vhost {
        if is_safe_host_name(host) {
            let host_file = root.join(format!("backends-{}.toml", host));
            if host_file.is_file() {
                layers.push(read_layer(&host_file)?);
            }
        } else {
            warn!(
                "Not looking for a per-host override for unsafe host name {:?}",
                host
            );
        }
    }

    Ok(layers)
}

/// Read and parse one layer file.
pub fn read_layer(path: &Path) -> Result<DefinitionLayer, ConfigError> {
    let data = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let layer = DefinitionLayer::from_toml(name, &data).map_err(|source| {
        ConfigError::Syntax {
            path: path.to_owned(),
            source,
        }
    })?;

    debug!(
        "Read {} backend definition(s) from '{}'",
        layer.backends.len(),
        path.display()
    );
    Ok(layer)
}

fn fragments(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: dir.to_owned(),
        source,
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if io::ErrorKind::NotFound == e.kind() => return Ok(Vec::new()),
        Err(e) => return Err(io_error(e)),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(io_error)?.path();
        let is_toml = path.extension().map_or(false, |ext| "toml" == ext);
        let hidden = path
            .file_name()
            .map_or(true, |n| n.to_string_lossy().starts_with('.'));
        if is_toml && !hidden && path.is_file() {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod test {
    use tempfile::TempDir;

    use super::*;
    use crate::backend::registry::{LoaderOptions, Registry};

    fn write(root: &Path, name: &str, content: &str) {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn names(layers: &[DefinitionLayer]) -> Vec<&str> {
        layers.iter().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn base_only() {
        let root = TempDir::new().unwrap();
        write(root.path(), BASE_FILE, "[imap]\nhostspec = \"localhost\"\n");

        let layers = read_layers(root.path(), None).unwrap();
        assert_eq!(vec![BASE_FILE], names(&layers));
    }

    #[test]
    fn missing_base_is_an_error() {
        let root = TempDir::new().unwrap();
        write(root.path(), LOCAL_FILE, "");

        assert_matches!(
            Err(ConfigError::Io { .. }),
            read_layers(root.path(), None)
        );
    }

    #[test]
    fn syntax_error_names_file() {
        let root = TempDir::new().unwrap();
        write(root.path(), BASE_FILE, "[imap]\nport = \"143\"\n");

        match read_layers(root.path(), None) {
            Err(ConfigError::Syntax { path, .. }) => {
                assert_eq!(root.path().join(BASE_FILE), path);
            }
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn layer_order() {
        let root = TempDir::new().unwrap();
        write(
            root.path(),
            BASE_FILE,
            "[imap]\nname = \"IMAP Server\"\nhostspec = \"localhost\"\n",
        );
        write(root.path(), LOCAL_FILE, "[imap]\nhostspec = \"imap.local\"\n");
        write(root.path(), "backends.d/20-port.toml", "[imap]\nport = 1143\n");
        write(
            root.path(),
            "backends.d/10-host.toml",
            "[imap]\nhostspec = \"imap.d\"\n",
        );
        write(root.path(), "backends.d/notes.txt", "not a layer");
        write(root.path(), "backends.d/.hidden.toml", "this is not toml");
        write(
            root.path(),
            "backends-web1.toml",
            "[imap]\nhostspec = \"imap.web1\"\n",
        );

        let layers = read_layers(root.path(), None).unwrap();
        assert_eq!(
            vec![BASE_FILE, LOCAL_FILE, "10-host.toml", "20-port.toml"],
            names(&layers)
        );

        let layers = read_layers(root.path(), Some("web1")).unwrap();
        assert_eq!(5, layers.len());

        let registry =
            Registry::load(&layers, &LoaderOptions::default()).unwrap();
        let imap = registry.get("imap").unwrap();
        assert_eq!("IMAP Server", imap.name);
        assert_eq!("imap.web1", imap.hostspec);
        assert_eq!(1143, imap.port);

        // Host names which could escape the root are never used
        let layers = read_layers(root.path(), Some("../web1")).unwrap();
        assert_eq!(4, layers.len());
    }
}
