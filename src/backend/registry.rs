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

use indexmap::IndexMap;
use log::info;

use super::layer::{self, DefinitionLayer};
use super::model::BackendProfile;
use super::resolve::resolve;
use crate::support::error::{ConfigError, Problem};

/// Options controlling how strictly definitions are checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoaderOptions {
    /// If true, IMAP-only fields on a POP backend are an error. Otherwise they
    /// are dropped with a warning.
    pub strict_imap_fields: bool,
}

/// The set of resolved backends, keyed by id, in declaration order.
///
/// A `Registry` is immutable once loaded. Reloading builds a new one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Registry {
    backends: IndexMap<String, BackendProfile>,
}

impl Registry {
    /// Fold `layers` in order, apply defaults and validate the result.
    ///
    /// Either every backend is valid and the registry is returned, or every
    /// problem found in every backend is returned together.
    pub fn load(
        layers: &[DefinitionLayer],
        options: &LoaderOptions,
    ) -> Result<Self, ConfigError> {
        let (merged, duplicates) = layer::fold(layers);

        let mut problems: Vec<Problem> = duplicates
            .into_iter()
            .map(|(backend, layer)| Problem::DuplicateBackendId {
                backend,
                layer,
            })
            .collect();

        let mut backends = IndexMap::with_capacity(merged.len());
        for (id, def) in merged {
            let profile = resolve(&id, def, options, &mut problems);
            backends.insert(id, profile);
        }

        if !problems.is_empty() {
            return Err(ConfigError::Invalid(problems));
        }

        let registry = Registry { backends };
        info!(
            "Loaded {} backend(s) ({} enabled) from {} layer(s)",
            registry.len(),
            registry.list_enabled().len(),
            layers.len()
        );
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&BackendProfile> {
        self.backends.get(id)
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// All backends, including disabled ones, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &BackendProfile> {
        self.backends.values()
    }

    /// The backends that may be logged in to, in declaration order.
    pub fn list_enabled(&self) -> Vec<&BackendProfile> {
        self.iter().filter(|b| b.is_enabled()).collect()
    }

    /// Select the backend pre-chosen on the login screen of `host_name`.
    ///
    /// This is the first enabled backend which lists `host_name` as
    /// preferred, or the first enabled backend if none does. Disabled backends
    /// are never selected.
    pub fn resolve_preferred(
        &self,
        host_name: &str,
    ) -> Result<&str, ConfigError> {
        let first = self
            .iter()
            .find(|b| b.is_enabled())
            .ok_or(ConfigError::NoEnabledBackend)?;
        let chosen = self
            .iter()
            .find(|b| b.is_enabled() && b.is_preferred_on(host_name))
            .unwrap_or(first);

        Ok(&chosen.id)
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;
    use crate::backend::layer::PartialProfile;
    use crate::backend::model::*;

    fn def(host: &str) -> PartialProfile {
        PartialProfile {
            hostspec: Some(host.to_owned()),
            ..PartialProfile::default()
        }
    }

    fn preferring(host: &str, preferred: &[&str]) -> PartialProfile {
        PartialProfile {
            preferred: Some(Preferred::Many(
                preferred.iter().map(|&s| s.to_owned()).collect(),
            )),
            ..def(host)
        }
    }

    fn disabled(mut def: PartialProfile) -> PartialProfile {
        def.disabled = Some(true);
        def
    }

    fn load(layers: &[DefinitionLayer]) -> Registry {
        Registry::load(layers, &LoaderOptions::default()).unwrap()
    }

    #[test]
    fn empty() {
        let registry = load(&[]);
        assert!(registry.is_empty());
        assert!(registry.list_enabled().is_empty());
        assert_matches!(
            Err(ConfigError::NoEnabledBackend),
            registry.resolve_preferred("h1")
        );
    }

    #[test]
    fn preferred_host_wins() {
        let registry = load(&[DefinitionLayer::new("base")
            .with("a", preferring("imap-a", &["h1"]))
            .with("b", preferring("imap-b", &["h2"]))]);

        assert_eq!("b", registry.resolve_preferred("h2").unwrap());
        assert_eq!("a", registry.resolve_preferred("h1").unwrap());
        assert_eq!("a", registry.resolve_preferred("h3").unwrap());
        // Exact, case-sensitive match
        assert_eq!("a", registry.resolve_preferred("H2").unwrap());
    }

    #[test]
    fn disabled_never_selected() {
        let registry = load(&[DefinitionLayer::new("base")
            .with("a", disabled(preferring("imap-a", &["h1"])))
            .with("b", def("imap-b"))
            .with("c", preferring("imap-c", &["h3"]))]);

        assert_eq!("b", registry.resolve_preferred("h1").unwrap());
        assert_eq!("c", registry.resolve_preferred("h3").unwrap());
        assert_eq!(
            vec!["b", "c"],
            registry
                .list_enabled()
                .iter()
                .map(|b| b.id.as_str())
                .collect::<Vec<_>>()
        );
        assert!(registry.get("a").is_some());
    }

    #[test]
    fn all_disabled() {
        let registry = load(&[DefinitionLayer::new("base")
            .with("a", disabled(def("")))
            .with("b", disabled(preferring("imap-b", &["h1"])))]);

        assert_eq!(2, registry.len());
        assert!(registry.list_enabled().is_empty());
        assert_matches!(
            Err(ConfigError::NoEnabledBackend),
            registry.resolve_preferred("h1")
        );
    }

    #[test]
    fn port_override_keeps_other_fields() {
        let base = DefinitionLayer::new("base").with(
            "imap",
            PartialProfile {
                name: Some("IMAP Server".to_owned()),
                protocol: Some("imap".to_owned()),
                secure: Some("tls".into()),
                maildomain: Some("example.com".to_owned()),
                ..def("imap.example.com")
            },
        );
        let local = DefinitionLayer::new("local").with(
            "imap",
            PartialProfile {
                port: Some(993),
                ..PartialProfile::default()
            },
        );

        let before = load(&[base.clone()]);
        let after = load(&[base, local]);

        let mut expected = before.get("imap").unwrap().clone();
        assert_eq!(143, expected.port);
        expected.port = 993;
        assert_eq!(&expected, after.get("imap").unwrap());
    }

    #[test]
    fn later_layer_adds_backends() {
        let registry = load(&[
            DefinitionLayer::new("base").with("imap", def("imap.example.com")),
            DefinitionLayer::new("local")
                .with(
                    "imap",
                    PartialProfile {
                        disabled: Some(true),
                        ..PartialProfile::default()
                    },
                )
                .with(
                    "advanced",
                    PartialProfile {
                        hordeauth: Some(true.into()),
                        cache: Some("sql".into()),
                        ..def("imap.example.com")
                    },
                ),
        ]);

        assert_eq!(
            vec!["imap", "advanced"],
            registry.iter().map(|b| b.id.as_str()).collect::<Vec<_>>()
        );
        assert_eq!("advanced", registry.resolve_preferred("any").unwrap());
        let advanced = registry.get("advanced").unwrap();
        assert_eq!(CacheMode::Sql, advanced.cache);
        assert_eq!(143, advanced.port);
    }

    #[test]
    fn problems_are_collected_across_backends() {
        let result = Registry::load(
            &[DefinitionLayer::new("base")
                .with("good", def("imap.example.com"))
                .with(
                    "bad-pop",
                    PartialProfile {
                        protocol: Some("pop".to_owned()),
                        ..def("")
                    },
                )
                .with(
                    "bad-imap",
                    PartialProfile {
                        protocol: Some("smtp".to_owned()),
                        port: Some(-1),
                        ..def("imap.example.com")
                    },
                )],
            &LoaderOptions::default(),
        );

        let err = result.unwrap_err();
        let problems = err.problems();
        assert_eq!(3, problems.len());
        assert_eq!(
            Problem::MissingHostspec {
                backend: "bad-pop".to_owned()
            },
            problems[0]
        );
        assert_eq!(
            vec!["bad-imap", "bad-imap"],
            problems[1..].iter().map(Problem::backend).collect::<Vec<_>>()
        );
    }

    #[test]
    fn exclusive_layer_duplicate() {
        let result = Registry::load(
            &[
                DefinitionLayer::new("base").with("imap", def("a.example.com")),
                DefinitionLayer::exclusive("site")
                    .with("imap", def("b.example.com")),
            ],
            &LoaderOptions::default(),
        );

        assert_eq!(
            &[Problem::DuplicateBackendId {
                backend: "imap".to_owned(),
                layer: "site".to_owned(),
            }],
            result.unwrap_err().problems()
        );
    }

    #[test]
    fn strict_rejects_imap_fields_on_pop() {
        let layers = [DefinitionLayer::new("base").with(
            "pop",
            PartialProfile {
                protocol: Some("pop".to_owned()),
                thread: Some("REFERENCES".to_owned()),
                ..def("pop.example.com")
            },
        )];

        let lenient =
            Registry::load(&layers, &LoaderOptions::default()).unwrap();
        assert_eq!(None, lenient.get("pop").unwrap().imap);

        let strict = Registry::load(
            &layers,
            &LoaderOptions {
                strict_imap_fields: true,
            },
        );
        assert_matches!(
            Some(&Problem::ImapFieldOnPop { field: "thread", .. }),
            strict.unwrap_err().problems().first()
        );
    }

    fn security() -> impl Strategy<Value = Option<&'static str>> {
        prop::option::of(prop_oneof![Just("tls"), Just("ssl"), Just("none")])
    }

    proptest! {
        #[test]
        fn computed_defaults(
            pop in any::<bool>(),
            secure in security(),
        ) {
            let protocol = if pop { "pop" } else { "imap" };
            let registry = load(&[DefinitionLayer::new("base").with(
                "x",
                PartialProfile {
                    protocol: Some(protocol.to_owned()),
                    secure: secure.map(Into::into),
                    ..def("mail.example.com")
                },
            )]);
            let profile = registry.get("x").unwrap();

            let expected_secure = match secure {
                Some(name) => Security::from_name(name).unwrap(),
                None if pop => Security::None,
                None => Security::Tls,
            };
            let expected_port = match (pop, expected_secure) {
                (false, Security::Ssl) => 993,
                (false, _) => 143,
                (true, Security::Ssl) => 995,
                (true, _) => 110,
            };

            prop_assert_eq!(expected_secure, profile.secure);
            prop_assert_eq!(expected_port, profile.port);
        }
    }
}
