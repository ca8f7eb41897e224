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

use std::sync::{Arc, PoisonError, RwLock};

use log::{error, info};

use super::layer::DefinitionLayer;
use super::registry::{LoaderOptions, Registry};
use crate::support::error::ConfigError;

/// Holds the registry currently in use by the process.
///
/// Readers take a snapshot with `current()`; a reload either publishes a
/// complete new registry or leaves the old one in place. Clones share the
/// same slot.
#[derive(Clone, Debug)]
pub struct ActiveRegistry {
    slot: Arc<RwLock<Arc<Registry>>>,
}

impl ActiveRegistry {
    /// Load the initial registry.
    ///
    /// There is nothing to fall back to here, so failure is fatal to the
    /// caller.
    pub fn start(
        layers: &[DefinitionLayer],
        options: &LoaderOptions,
    ) -> Result<Self, ConfigError> {
        let registry = Registry::load(layers, options)?;
        Ok(ActiveRegistry {
            slot: Arc::new(RwLock::new(Arc::new(registry))),
        })
    }

    /// The registry in effect right now.
    ///
    /// The snapshot stays valid (and unchanged) even if a reload happens
    /// while it is held.
    pub fn current(&self) -> Arc<Registry> {
        // The lock only guards a pointer swap, so a poisoned lock still holds
        // a complete registry.
        let guard = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Load `layers` again and, if they are valid, make the result current.
    ///
    /// On failure the previous registry stays in effect and the error is
    /// both logged and returned.
    pub fn reload(
        &self,
        layers: &[DefinitionLayer],
        options: &LoaderOptions,
    ) -> Result<Arc<Registry>, ConfigError> {
        match Registry::load(layers, options) {
            Ok(registry) => {
                let registry = Arc::new(registry);
                *self.slot.write().unwrap_or_else(PoisonError::into_inner) =
                    Arc::clone(&registry);
                info!("Backend registry reloaded");
                Ok(registry)
            }
            Err(e) => {
                error!("Rejected backend reload, keeping old registry: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use super::*;
    use crate::backend::layer::PartialProfile;

    fn layer(host: &str) -> DefinitionLayer {
        DefinitionLayer::new("base").with(
            "imap",
            PartialProfile {
                hostspec: Some(host.to_owned()),
                ..PartialProfile::default()
            },
        )
    }

    fn host_of(active: &ActiveRegistry) -> String {
        active.current().get("imap").unwrap().hostspec.clone()
    }

    #[test]
    fn start_fails_on_invalid() {
        assert_matches!(
            Err(ConfigError::Invalid(_)),
            ActiveRegistry::start(&[layer("")], &LoaderOptions::default())
        );
    }

    #[test]
    fn reload_swaps_registry() {
        let options = LoaderOptions::default();
        let active = ActiveRegistry::start(&[layer("a")], &options).unwrap();
        let snapshot = active.current();

        let reloaded = active.reload(&[layer("b")], &options).unwrap();
        assert_eq!("b", reloaded.get("imap").unwrap().hostspec);
        assert_eq!("b", host_of(&active));
        // Snapshots taken before the reload are unaffected
        assert_eq!("a", snapshot.get("imap").unwrap().hostspec);
    }

    #[test]
    fn failed_reload_keeps_old_registry() {
        let options = LoaderOptions::default();
        let active = ActiveRegistry::start(&[layer("a")], &options).unwrap();

        assert_matches!(
            Err(ConfigError::Invalid(_)),
            active.reload(&[layer("")], &options)
        );
        assert_eq!("a", host_of(&active));
    }

    #[test]
    fn readers_see_whole_registries() {
        let options = LoaderOptions::default();
        let active = ActiveRegistry::start(&[layer("a")], &options).unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let active = active.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let host = host_of(&active);
                        assert!("a" == host || "b" == host);
                    }
                })
            })
            .collect();

        for host in ["b", "a", "b"].iter() {
            active.reload(&[layer(host)], &options).unwrap();
        }

        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!("b", host_of(&active));
    }
}
