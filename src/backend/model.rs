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

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

use super::spam::SpamConfig;

/// Default connection timeout, in seconds, for both the mail server and the
/// SMTP relay.
pub const DEFAULT_TIMEOUT: u64 = 30;
/// Default maximum number of messages a user may import into an IMAP backend.
pub const DEFAULT_IMPORT_LIMIT: u64 = 2500;
/// Default interval, in seconds, between quota refreshes in the UI.
pub const DEFAULT_QUOTA_INTERVAL: u64 = 15 * 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Imap,
    Pop,
}

impl Protocol {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "imap" => Some(Protocol::Imap),
            "pop" => Some(Protocol::Pop),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Protocol::Imap => "imap",
            Protocol::Pop => "pop",
        }
    }

    /// The security mode used when a backend does not configure one.
    pub fn default_security(self) -> Security {
        match self {
            Protocol::Imap => Security::Tls,
            Protocol::Pop => Security::None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the connection to the mail server is secured.
///
/// `Tls` means STARTTLS on the base protocol port; `Ssl` is implicit TLS on
/// the dedicated port and is deprecated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    Tls,
    Ssl,
    None,
}

impl Security {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "tls" => Some(Security::Tls),
            "ssl" => Some(Security::Ssl),
            "none" => Some(Security::None),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Security::Tls => "tls",
            Security::Ssl => "ssl",
            Security::None => "none",
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The well-known port for the given protocol and security mode.
pub fn default_port(protocol: Protocol, security: Security) -> u16 {
    match (protocol, security) {
        (Protocol::Imap, Security::Ssl) => 993,
        (Protocol::Imap, _) => 143,
        (Protocol::Pop, Security::Ssl) => 995,
        (Protocol::Pop, _) => 110,
    }
}

/// Whether the backend reuses the credentials the user logged in to the
/// webmail application with.
///
/// Written out the same way it is configured: `true`, `false` or `"full"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HordeAuth {
    /// Reuse the credentials, with everything from the first `@` of the user
    /// name stripped.
    Enabled,
    /// Reuse the credentials with the user name unmodified.
    Full,
    /// Always require a separate login.
    Disabled,
}

impl HordeAuth {
    /// Derive the name to log in to the mail server with from the
    /// application login name, or `None` if separate credentials are needed.
    pub fn login_name(self, user: &str) -> Option<&str> {
        match self {
            HordeAuth::Enabled => {
                Some(user.split('@').next().unwrap_or(user))
            }
            HordeAuth::Full => Some(user),
            HordeAuth::Disabled => None,
        }
    }
}

impl Serialize for HordeAuth {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        match *self {
            HordeAuth::Enabled => ser.serialize_bool(true),
            HordeAuth::Full => ser.serialize_str("full"),
            HordeAuth::Disabled => ser.serialize_bool(false),
        }
    }
}

/// Where (if anywhere) message data for the backend is cached.
///
/// Written out the same way it is configured: `false` or the backend name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheMode {
    Disabled,
    HordeCache,
    Hashtable,
    NoSql,
    Sql,
}

impl CacheMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cache" => Some(CacheMode::HordeCache),
            "hashtable" => Some(CacheMode::Hashtable),
            "nosql" => Some(CacheMode::NoSql),
            "sql" => Some(CacheMode::Sql),
            _ => None,
        }
    }

    /// The configured backend name, or `None` when caching is off.
    pub fn name(self) -> Option<&'static str> {
        match self {
            CacheMode::Disabled => None,
            CacheMode::HordeCache => Some("cache"),
            CacheMode::Hashtable => Some("hashtable"),
            CacheMode::NoSql => Some("nosql"),
            CacheMode::Sql => Some("sql"),
        }
    }

    pub fn is_enabled(self) -> bool {
        CacheMode::Disabled != self
    }

    /// Whether this cache backend honours `cache_lifetime`.
    pub fn takes_lifetime(self) -> bool {
        matches!(self, CacheMode::HordeCache | CacheMode::Hashtable)
    }
}

impl Default for CacheMode {
    fn default() -> Self {
        CacheMode::Disabled
    }
}

impl Serialize for CacheMode {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        match self.name() {
            Some(name) => ser.serialize_str(name),
            None => ser.serialize_bool(false),
        }
    }
}

/// A loosely-typed driver parameter, as found in `quota.params`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ParamValue>),
    Table(BTreeMap<String, ParamValue>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum QuotaUnit {
    GB,
    MB,
    KB,
}

impl QuotaUnit {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "GB" => Some(QuotaUnit::GB),
            "MB" => Some(QuotaUnit::MB),
            "KB" => Some(QuotaUnit::KB),
            _ => None,
        }
    }

    pub fn bytes(self) -> u64 {
        match self {
            QuotaUnit::GB => 1 << 30,
            QuotaUnit::MB => 1 << 20,
            QuotaUnit::KB => 1 << 10,
        }
    }
}

impl Default for QuotaUnit {
    fn default() -> Self {
        QuotaUnit::MB
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuotaConfig {
    /// The quota driver, e.g. `imap` or `hook`.
    pub driver: String,
    /// Hide the quota display when the server reports no limit.
    pub hide_when_unlimited: bool,
    /// Seconds between quota refreshes in the UI.
    pub interval: u64,
    /// The unit quota figures are displayed in.
    pub unit: QuotaUnit,
    /// All parameters as configured, including the ones above. Drivers such
    /// as `hook` receive these verbatim.
    pub params: BTreeMap<String, ParamValue>,
}

impl QuotaConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

/// A configured credential. Never shown in debug output or dumps.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: String) -> Self {
        Secret(s)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str("********")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    None,
    /// Auto-detect the SSL version.
    Ssl,
    SslV2,
    SslV3,
    Tls,
    /// Direct TLS 1.x connection.
    TlsV1,
    /// Use STARTTLS only if the server offers it.
    TlsIfAvailable,
}

impl SmtpSecurity {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(SmtpSecurity::None),
            "ssl" => Some(SmtpSecurity::Ssl),
            "sslv2" => Some(SmtpSecurity::SslV2),
            "sslv3" => Some(SmtpSecurity::SslV3),
            "tls" => Some(SmtpSecurity::Tls),
            "tlsv1" => Some(SmtpSecurity::TlsV1),
            _ => None,
        }
    }
}

/// SMTP relay settings for mail sent through a backend.
///
/// Options left as `None` fall back to the application-wide SMTP
/// configuration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SmtpConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<SmtpSecurity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lmtp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localhost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<bool>,
    /// Use the credentials of the application-wide SMTP configuration for
    /// whichever of `username` and `password` are not set here.
    pub horde_auth: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
    pub timeout: u64,
    /// Destination of the SMTP debug log.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

impl SmtpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Credentials used to manage user mailboxes from the administration UI.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AdminConfig {
    pub user: String,
    pub password: Secret,
    /// The hierarchy user mailboxes live under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userhierarchy: Option<String>,
}

/// The roles a mailbox can be assigned through `special_mboxes`.
///
/// Serialized as its configuration key, since it is used as a map key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpecialMailbox {
    Drafts,
    Sent,
    Spam,
    Templates,
    Trash,
    /// Localised special mailboxes, mapping IMAP name to display label.
    UserSpecial,
}

impl SpecialMailbox {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "drafts" => Some(SpecialMailbox::Drafts),
            "sent" => Some(SpecialMailbox::Sent),
            "spam" => Some(SpecialMailbox::Spam),
            "templates" => Some(SpecialMailbox::Templates),
            "trash" => Some(SpecialMailbox::Trash),
            "userspecial" => Some(SpecialMailbox::UserSpecial),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SpecialMailbox::Drafts => "drafts",
            SpecialMailbox::Sent => "sent",
            SpecialMailbox::Spam => "spam",
            SpecialMailbox::Templates => "templates",
            SpecialMailbox::Trash => "trash",
            SpecialMailbox::UserSpecial => "userspecial",
        }
    }
}

impl Serialize for SpecialMailbox {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(self.name())
    }
}

/// Either a single UTF-8 IMAP mailbox name, or (for `userspecial`) a map of
/// IMAP mailbox names to display labels.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MailboxName {
    Name(String),
    Localized(BTreeMap<String, String>),
}

/// Either one host name or several.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Preferred {
    One(String),
    Many(Vec<String>),
}

impl Preferred {
    /// Whether `host_name` is listed. The comparison is exact and
    /// case-sensitive.
    pub fn contains(&self, host_name: &str) -> bool {
        match *self {
            Preferred::One(ref h) => h == host_name,
            Preferred::Many(ref hs) => hs.iter().any(|h| h == host_name),
        }
    }
}

/// Settings which only exist for IMAP backends.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImapOptions {
    pub acl: bool,
    pub autocreate_special: bool,
    /// Capabilities to never use, in upper case.
    pub capability_ignore: BTreeSet<String>,
    /// RFC 4790 collation to use instead of the server default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparator: Option<String>,
    /// Maximum number of messages per import; 0 means no limit.
    pub import_limit: u64,
    /// Preferred languages for server messages, most preferred first.
    pub lang: Vec<String>,
    /// Namespaces to add to the ones the server advertises.
    pub namespace: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,
    /// Values sent with the ID command.
    pub id: BTreeMap<String, String>,
    pub special_mboxes: BTreeMap<SpecialMailbox, MailboxName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminConfig>,
}

impl ImapOptions {
    pub fn max_import(&self) -> Option<u64> {
        Some(self.import_limit).filter(|&n| n > 0)
    }

    pub fn ignores_capability(&self, capability: &str) -> bool {
        self.capability_ignore
            .contains(&capability.to_ascii_uppercase())
    }
}

impl Default for ImapOptions {
    fn default() -> Self {
        ImapOptions {
            acl: false,
            autocreate_special: false,
            capability_ignore: BTreeSet::new(),
            comparator: None,
            import_limit: DEFAULT_IMPORT_LIMIT,
            lang: Vec::new(),
            namespace: Vec::new(),
            thread: None,
            id: BTreeMap::new(),
            special_mboxes: BTreeMap::new(),
            admin: None,
        }
    }
}

/// One fully resolved and validated mail backend.
///
/// Profiles are only ever produced by `Registry::load()` and are read-only
/// afterwards.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BackendProfile {
    pub id: String,
    pub disabled: bool,
    /// Label shown in the server list on the login screen.
    pub name: String,
    pub hostspec: String,
    pub protocol: Protocol,
    pub secure: Security,
    pub port: u16,
    pub hordeauth: HordeAuth,
    /// Domain appended to unqualified addresses and used in `From`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maildomain: Option<String>,
    /// Server timeout in seconds.
    pub timeout: u64,
    pub sort_force: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred: Option<Preferred>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
    pub debug_raw: bool,
    /// Whether to use body structures to flag attachments; auto-detected when
    /// unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atc_structure: Option<bool>,
    pub cache: CacheMode,
    /// Seconds cached data is kept; only set for backends that honour it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_lifetime: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spam: Option<SpamConfig>,
    /// Present exactly when `protocol` is IMAP.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imap: Option<ImapOptions>,
}

impl BackendProfile {
    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn cache_expiry(&self) -> Option<Duration> {
        self.cache_lifetime.map(Duration::from_secs)
    }

    /// Whether this backend is listed as preferred for `host_name`.
    pub fn is_preferred_on(&self, host_name: &str) -> bool {
        self.preferred
            .as_ref()
            .map_or(false, |p| p.contains(host_name))
    }
}
