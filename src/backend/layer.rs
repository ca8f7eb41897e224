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

//! Definition layers and the field-level merge between them.
//!
//! A layer maps backend ids to *partial* profiles: every field is optional,
//! and fields that accept several types (e.g. `cache`, which is
//! either a boolean or a backend name) are kept in their loose form. Turning a
//! fully merged partial profile into a `BackendProfile` is the job of
//! `resolve`.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::model::{MailboxName, ParamValue, Preferred};

/// A value which is either a boolean or a name, such as `secure = false` or
/// `secure = "tls"`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Setting {
    Flag(bool),
    Name(String),
}

impl From<bool> for Setting {
    fn from(b: bool) -> Self {
        Setting::Flag(b)
    }
}

impl From<&str> for Setting {
    fn from(s: &str) -> Self {
        Setting::Name(s.to_owned())
    }
}

/// Merge a later layer's definition into this one.
///
/// Fields present in `later` overwrite those in `self`; fields absent in
/// `later` are left untouched.
pub trait Merge {
    fn merge_from(&mut self, later: Self);
}

fn replace<T>(slot: &mut Option<T>, later: Option<T>) {
    if later.is_some() {
        *slot = later;
    }
}

fn nest<T: Merge>(slot: &mut Option<T>, later: Option<T>) {
    if let Some(later) = later {
        match slot {
            Some(earlier) => earlier.merge_from(later),
            None => *slot = Some(later),
        }
    }
}

fn extend<K: Ord, V>(
    slot: &mut Option<BTreeMap<K, V>>,
    later: Option<BTreeMap<K, V>>,
) {
    if let Some(later) = later {
        slot.get_or_insert_with(BTreeMap::new).extend(later);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PartialQuota {
    pub driver: Option<String>,
    pub params: Option<BTreeMap<String, ParamValue>>,
}

impl Merge for PartialQuota {
    fn merge_from(&mut self, later: Self) {
        replace(&mut self.driver, later.driver);
        extend(&mut self.params, later.params);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PartialSmtp {
    pub auth: Option<bool>,
    pub debug: Option<Setting>,
    pub horde_auth: Option<bool>,
    pub host: Option<String>,
    pub lmtp: Option<bool>,
    pub localhost: Option<String>,
    pub password: Option<String>,
    pub port: Option<i64>,
    pub secure: Option<Setting>,
    pub timeout: Option<i64>,
    pub username: Option<String>,
}

impl Merge for PartialSmtp {
    fn merge_from(&mut self, later: Self) {
        replace(&mut self.auth, later.auth);
        replace(&mut self.debug, later.debug);
        replace(&mut self.horde_auth, later.horde_auth);
        replace(&mut self.host, later.host);
        replace(&mut self.lmtp, later.lmtp);
        replace(&mut self.localhost, later.localhost);
        replace(&mut self.password, later.password);
        replace(&mut self.port, later.port);
        replace(&mut self.secure, later.secure);
        replace(&mut self.timeout, later.timeout);
        replace(&mut self.username, later.username);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PartialSpamAction {
    pub display: Option<bool>,
    pub email: Option<String>,
    pub email_format: Option<String>,
    pub digest_limit_msgs: Option<i64>,
    pub digest_limit_size: Option<i64>,
    pub null: Option<bool>,
    pub program: Option<String>,
}

impl Merge for PartialSpamAction {
    fn merge_from(&mut self, later: Self) {
        replace(&mut self.display, later.display);
        replace(&mut self.email, later.email);
        replace(&mut self.email_format, later.email_format);
        replace(&mut self.digest_limit_msgs, later.digest_limit_msgs);
        replace(&mut self.digest_limit_size, later.digest_limit_size);
        replace(&mut self.null, later.null);
        replace(&mut self.program, later.program);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PartialSpam {
    pub innocent: Option<PartialSpamAction>,
    pub spam: Option<PartialSpamAction>,
}

impl Merge for PartialSpam {
    fn merge_from(&mut self, later: Self) {
        nest(&mut self.innocent, later.innocent);
        nest(&mut self.spam, later.spam);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PartialAdmin {
    pub user: Option<String>,
    pub password: Option<String>,
    pub userhierarchy: Option<String>,
}

impl Merge for PartialAdmin {
    fn merge_from(&mut self, later: Self) {
        replace(&mut self.user, later.user);
        replace(&mut self.password, later.password);
        replace(&mut self.userhierarchy, later.userhierarchy);
    }
}

/// One layer's definition of one backend.
///
/// Values of the wrong TOML type (e.g. `port = "143"`) fail to parse, so
/// they are reported as a syntax error in the file that holds them rather
/// than collected with the other problems.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PartialProfile {
    pub disabled: Option<bool>,
    pub name: Option<String>,
    pub hostspec: Option<String>,
    pub protocol: Option<String>,
    pub secure: Option<Setting>,
    pub port: Option<i64>,
    pub hordeauth: Option<Setting>,
    pub maildomain: Option<String>,
    pub cache: Option<Setting>,
    pub cache_lifetime: Option<i64>,
    pub timeout: Option<i64>,
    pub sort_force: Option<bool>,
    pub preferred: Option<Preferred>,
    pub debug: Option<Setting>,
    pub debug_raw: Option<bool>,
    pub atc_structure: Option<bool>,
    pub quota: Option<PartialQuota>,
    pub smtp: Option<PartialSmtp>,
    pub spam: Option<PartialSpam>,

    // IMAP only
    pub acl: Option<bool>,
    pub admin: Option<PartialAdmin>,
    pub autocreate_special: Option<bool>,
    pub special_mboxes: Option<BTreeMap<String, MailboxName>>,
    pub capability_ignore: Option<Vec<String>>,
    pub comparator: Option<String>,
    pub id: Option<BTreeMap<String, String>>,
    pub import_limit: Option<i64>,
    pub lang: Option<Vec<String>>,
    pub namespace: Option<Vec<String>>,
    pub thread: Option<String>,
}

impl PartialProfile {
    /// The names of the IMAP-only fields this definition sets.
    pub fn imap_only_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        macro_rules! check {
            ($($field:ident),*) => {$(
                if self.$field.is_some() {
                    fields.push(stringify!($field));
                }
            )*}
        }
        check!(
            acl,
            admin,
            autocreate_special,
            special_mboxes,
            capability_ignore,
            comparator,
            id,
            import_limit,
            lang,
            namespace,
            thread
        );
        fields
    }
}

impl Merge for PartialProfile {
    fn merge_from(&mut self, later: Self) {
        replace(&mut self.disabled, later.disabled);
        replace(&mut self.name, later.name);
        replace(&mut self.hostspec, later.hostspec);
        replace(&mut self.protocol, later.protocol);
        replace(&mut self.secure, later.secure);
        replace(&mut self.port, later.port);
        replace(&mut self.hordeauth, later.hordeauth);
        replace(&mut self.maildomain, later.maildomain);
        replace(&mut self.cache, later.cache);
        replace(&mut self.cache_lifetime, later.cache_lifetime);
        replace(&mut self.timeout, later.timeout);
        replace(&mut self.sort_force, later.sort_force);
        replace(&mut self.preferred, later.preferred);
        replace(&mut self.debug, later.debug);
        replace(&mut self.debug_raw, later.debug_raw);
        replace(&mut self.atc_structure, later.atc_structure);
        nest(&mut self.quota, later.quota);
        nest(&mut self.smtp, later.smtp);
        nest(&mut self.spam, later.spam);

        replace(&mut self.acl, later.acl);
        nest(&mut self.admin, later.admin);
        replace(&mut self.autocreate_special, later.autocreate_special);
        extend(&mut self.special_mboxes, later.special_mboxes);
        replace(&mut self.capability_ignore, later.capability_ignore);
        replace(&mut self.comparator, later.comparator);
        extend(&mut self.id, later.id);
        replace(&mut self.import_limit, later.import_limit);
        replace(&mut self.lang, later.lang);
        replace(&mut self.namespace, later.namespace);
        replace(&mut self.thread, later.thread);
    }
}

/// How a layer's backend ids relate to those of earlier layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerMode {
    /// Ids already defined are merged field by field; new ids are added.
    Merge,
    /// The layer may only add new ids.
    Exclusive,
}

/// One source of backend definitions, e.g. the base file or a local
/// override.
#[derive(Clone, Debug, PartialEq)]
pub struct DefinitionLayer {
    /// Where the layer came from, for diagnostics.
    pub name: String,
    pub mode: LayerMode,
    /// Definitions in declaration order.
    pub backends: IndexMap<String, PartialProfile>,
}

impl DefinitionLayer {
    pub fn new(name: impl Into<String>) -> Self {
        DefinitionLayer {
            name: name.into(),
            mode: LayerMode::Merge,
            backends: IndexMap::new(),
        }
    }

    pub fn exclusive(name: impl Into<String>) -> Self {
        DefinitionLayer {
            mode: LayerMode::Exclusive,
            ..DefinitionLayer::new(name)
        }
    }

    /// Add (or replace) the definition of `id` in this layer.
    pub fn with(mut self, id: impl Into<String>, def: PartialProfile) -> Self {
        self.backends.insert(id.into(), def);
        self
    }

    /// Parse a layer from TOML text whose top-level tables are keyed by
    /// backend id.
    pub fn from_toml(
        name: impl Into<String>,
        text: &[u8],
    ) -> Result<Self, toml::de::Error> {
        Ok(DefinitionLayer {
            backends: toml::from_slice(text)?,
            ..DefinitionLayer::new(name)
        })
    }
}

/// Fold `layers` left to right.
///
/// Returns the merged definitions in the order their ids first appeared,
/// along with the ids an exclusive layer tried to redefine and the name of
/// that layer.
pub(super) fn fold<'a>(
    layers: impl IntoIterator<Item = &'a DefinitionLayer>,
) -> (IndexMap<String, PartialProfile>, Vec<(String, String)>) {
    let mut merged = IndexMap::<String, PartialProfile>::new();
    let mut duplicates = Vec::new();

    for layer in layers {
        for (id, def) in &layer.backends {
            if let Some(earlier) = merged.get_mut(id) {
                if LayerMode::Exclusive == layer.mode {
                    duplicates.push((id.clone(), layer.name.clone()));
                } else {
                    earlier.merge_from(def.clone());
                }
            } else {
                merged.insert(id.clone(), def.clone());
            }
        }
    }

    (merged, duplicates)
}
