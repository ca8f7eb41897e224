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

//! Turns a fully merged `PartialProfile` into a `BackendProfile`, applying
//! computed defaults and recording every problem found along the way.

use std::collections::BTreeMap;
use std::convert::TryFrom;

use log::warn;

use super::layer::{
    PartialAdmin, PartialProfile, PartialQuota, PartialSmtp, PartialSpam,
    PartialSpamAction, Setting,
};
use super::model::*;
use super::registry::LoaderOptions;
use super::spam::*;
use crate::support::error::Problem;

/// Resolve the definition of backend `id`.
///
/// A profile is always returned; if anything was pushed onto `problems` it
/// contains placeholder values and must not be published.
pub(super) fn resolve(
    id: &str,
    def: PartialProfile,
    options: &LoaderOptions,
    problems: &mut Vec<Problem>,
) -> BackendProfile {
    let mut cx = Resolver {
        backend: id,
        problems,
    };

    let disabled = def.disabled.unwrap_or(false);
    let protocol = cx.protocol(def.protocol.as_deref());
    let secure = cx.security(protocol, def.secure.as_ref());
    let port = def
        .port
        .and_then(|p| cx.port("port", p))
        .unwrap_or_else(|| default_port(protocol, secure));

    let hostspec = def.hostspec.clone().unwrap_or_default();
    if !disabled && hostspec.trim().is_empty() {
        cx.problem(Problem::MissingHostspec {
            backend: id.to_owned(),
        });
    }

    let imap = match protocol {
        Protocol::Imap => Some(cx.imap_options(&def)),
        Protocol::Pop => {
            cx.imap_fields_on_pop(&def, options.strict_imap_fields);
            None
        }
    };

    let (cache, cache_lifetime) =
        cx.cache(def.cache.as_ref(), def.cache_lifetime);

    BackendProfile {
        id: id.to_owned(),
        disabled,
        name: def.name.unwrap_or_else(|| id.to_owned()),
        hostspec,
        protocol,
        secure,
        port,
        hordeauth: cx.hordeauth(def.hordeauth.as_ref()),
        maildomain: def.maildomain,
        timeout: def
            .timeout
            .and_then(|t| cx.count("timeout", t))
            .unwrap_or(DEFAULT_TIMEOUT),
        sort_force: def.sort_force.unwrap_or(false),
        preferred: def.preferred,
        debug: cx.debug("debug", def.debug),
        debug_raw: def.debug_raw.unwrap_or(false),
        atc_structure: def.atc_structure,
        cache,
        cache_lifetime,
        quota: def.quota.and_then(|q| cx.quota(q)),
        smtp: def.smtp.map(|s| cx.smtp(s)),
        spam: def.spam.map(|s| cx.spam(s)),
        imap,
    }
}

struct Resolver<'a> {
    backend: &'a str,
    problems: &'a mut Vec<Problem>,
}

impl Resolver<'_> {
    fn problem(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    fn protocol(&mut self, name: Option<&str>) -> Protocol {
        match name {
            None => Protocol::Imap,
            Some(name) => Protocol::from_name(name).unwrap_or_else(|| {
                self.problem(Problem::InvalidProtocol {
                    backend: self.backend.to_owned(),
                    value: name.to_owned(),
                });
                Protocol::Imap
            }),
        }
    }

    fn security(
        &mut self,
        protocol: Protocol,
        secure: Option<&Setting>,
    ) -> Security {
        let security = match secure {
            None => return protocol.default_security(),
            Some(&Setting::Flag(false)) => Some(Security::None),
            Some(&Setting::Flag(true)) => None,
            Some(&Setting::Name(ref name)) => Security::from_name(name),
        };

        match security {
            Some(Security::Ssl) => {
                warn!(
                    "{}: 'secure = \"ssl\"' is deprecated; \
                     use 'tls' on port {} instead",
                    self.backend,
                    default_port(protocol, Security::Tls)
                );
                Security::Ssl
            }
            Some(security) => security,
            None => {
                self.problem(Problem::InvalidSecurityMode {
                    backend: self.backend.to_owned(),
                    field: "secure",
                    value: setting_text(secure),
                });
                protocol.default_security()
            }
        }
    }

    fn port(&mut self, field: &'static str, value: i64) -> Option<u16> {
        let port = u16::try_from(value).ok().filter(|&p| p > 0);
        if port.is_none() {
            self.problem(Problem::InvalidPort {
                backend: self.backend.to_owned(),
                field,
                value,
            });
        }
        port
    }

    fn count(&mut self, field: impl Into<String>, value: i64) -> Option<u64> {
        let count = u64::try_from(value).ok();
        if count.is_none() {
            self.problem(Problem::InvalidNumericField {
                backend: self.backend.to_owned(),
                field: field.into(),
                value,
            });
        }
        count
    }

    fn hordeauth(&mut self, setting: Option<&Setting>) -> HordeAuth {
        match setting {
            None | Some(&Setting::Flag(true)) => HordeAuth::Enabled,
            Some(&Setting::Flag(false)) => HordeAuth::Disabled,
            Some(&Setting::Name(ref name)) if "full" == name => HordeAuth::Full,
            Some(&Setting::Name(ref name)) => {
                self.problem(Problem::InvalidHordeAuth {
                    backend: self.backend.to_owned(),
                    value: name.clone(),
                });
                HordeAuth::Enabled
            }
        }
    }

    fn debug(
        &mut self,
        field: &str,
        setting: Option<Setting>,
    ) -> Option<String> {
        match setting {
            None | Some(Setting::Flag(false)) => None,
            Some(Setting::Name(dest)) => Some(dest).filter(|d| !d.is_empty()),
            Some(Setting::Flag(true)) => {
                warn!(
                    "{}: '{} = true' names no debug destination; ignoring",
                    self.backend, field
                );
                None
            }
        }
    }

    /// The cache backend, and its lifetime if it honours one.
    fn cache(
        &mut self,
        setting: Option<&Setting>,
        lifetime: Option<i64>,
    ) -> (CacheMode, Option<u64>) {
        let lifetime = lifetime.and_then(|l| self.count("cache_lifetime", l));
        let mode = match setting {
            None | Some(&Setting::Flag(false)) => CacheMode::Disabled,
            Some(&Setting::Flag(true)) => {
                warn!(
                    "{}: 'cache = true' is deprecated; \
                     use 'cache = \"cache\"' or a faster cache backend",
                    self.backend
                );
                CacheMode::HordeCache
            }
            Some(&Setting::Name(ref name)) => {
                match CacheMode::from_name(name) {
                    Some(mode) => mode,
                    None => {
                        self.problem(Problem::InvalidCacheBackend {
                            backend: self.backend.to_owned(),
                            value: name.clone(),
                        });
                        return (CacheMode::Disabled, None);
                    }
                }
            }
        };

        if !mode.takes_lifetime() {
            if lifetime.is_some() {
                warn!(
                    "{}: 'cache_lifetime' has no effect with this cache \
                     backend; ignoring",
                    self.backend
                );
            }
            return (mode, None);
        }

        (mode, lifetime)
    }

    fn quota(&mut self, quota: PartialQuota) -> Option<QuotaConfig> {
        // A quota table without a driver leaves quotas disabled
        let driver = quota.driver.filter(|d| !d.is_empty())?;
        let params = quota.params.unwrap_or_default();

        let hide_when_unlimited = match params.get("hide_when_unlimited") {
            None => false,
            Some(&ParamValue::Bool(b)) => b,
            Some(other) => {
                warn!(
                    "{}: quota 'hide_when_unlimited' is not a boolean ({:?}); \
                     ignoring",
                    self.backend, other
                );
                false
            }
        };

        let interval = match params.get("interval") {
            None => DEFAULT_QUOTA_INTERVAL,
            Some(&ParamValue::Integer(i)) => self
                .count("quota.params.interval", i)
                .unwrap_or(DEFAULT_QUOTA_INTERVAL),
            Some(other) => {
                warn!(
                    "{}: quota 'interval' is not an integer ({:?}); \
                     using the default",
                    self.backend, other
                );
                DEFAULT_QUOTA_INTERVAL
            }
        };

        let unit = match params.get("unit") {
            None => QuotaUnit::default(),
            Some(&ParamValue::String(ref name)) => QuotaUnit::from_name(name)
                .unwrap_or_else(|| {
                    self.problem(Problem::InvalidQuotaUnit {
                        backend: self.backend.to_owned(),
                        value: name.clone(),
                    });
                    QuotaUnit::default()
                }),
            Some(other) => {
                self.problem(Problem::InvalidQuotaUnit {
                    backend: self.backend.to_owned(),
                    value: format!("{:?}", other),
                });
                QuotaUnit::default()
            }
        };

        Some(QuotaConfig {
            driver,
            hide_when_unlimited,
            interval,
            unit,
            params,
        })
    }

    fn smtp(&mut self, smtp: PartialSmtp) -> SmtpConfig {
        let secure = smtp.secure.as_ref().and_then(|secure| {
            let security = match *secure {
                Setting::Flag(false) => Some(SmtpSecurity::None),
                Setting::Flag(true) => Some(SmtpSecurity::TlsIfAvailable),
                Setting::Name(ref name) => SmtpSecurity::from_name(name),
            };
            if security.is_none() {
                self.problem(Problem::InvalidSecurityMode {
                    backend: self.backend.to_owned(),
                    field: "smtp.secure",
                    value: setting_text(Some(secure)),
                });
            }
            security
        });

        SmtpConfig {
            host: smtp.host,
            port: smtp.port.and_then(|p| self.port("smtp.port", p)),
            secure,
            lmtp: smtp.lmtp,
            localhost: smtp.localhost,
            auth: smtp.auth,
            horde_auth: smtp.horde_auth.unwrap_or(false),
            username: smtp.username,
            password: smtp.password.map(Secret::new),
            timeout: smtp
                .timeout
                .and_then(|t| self.count("smtp.timeout", t))
                .unwrap_or(DEFAULT_TIMEOUT),
            debug: self.debug("smtp.debug", smtp.debug),
        }
    }

    fn spam(&mut self, spam: PartialSpam) -> SpamConfig {
        SpamConfig {
            innocent: spam
                .innocent
                .map(|a| self.spam_action("innocent", a, true)),
            spam: spam.spam.map(|a| self.spam_action("spam", a, false)),
        }
    }

    fn spam_action(
        &mut self,
        kind: &str,
        action: PartialSpamAction,
        default_display: bool,
    ) -> SpamAction {
        let field = |name: &str| format!("spam.{}.{}", kind, name);

        let limit_msgs = action
            .digest_limit_msgs
            .and_then(|n| self.count(field("digest_limit_msgs"), n));
        let limit_size = action
            .digest_limit_size
            .and_then(|n| self.count(field("digest_limit_size"), n));
        let has_limits = limit_msgs.is_some() || limit_size.is_some();

        let mut drivers = Vec::new();
        if let Some(address) = action.email {
            let format = match action.email_format.as_deref() {
                None | Some("digest") => Some(EmailFormat::Digest {
                    limit_msgs: limit_msgs.unwrap_or(0),
                    limit_size: limit_size
                        .unwrap_or(DEFAULT_DIGEST_LIMIT_SIZE),
                }),
                Some("redirect") => {
                    if has_limits {
                        warn!(
                            "{}: digest limits for '{}' have no effect \
                             with 'redirect'; ignoring",
                            self.backend, kind
                        );
                    }
                    Some(EmailFormat::Redirect)
                }
                Some(other) => {
                    self.problem(Problem::InvalidSpamFormat {
                        backend: self.backend.to_owned(),
                        field: field("email_format"),
                        value: other.to_owned(),
                    });
                    None
                }
            };

            if let Some(format) = format {
                drivers.push(SpamDriver::Email { address, format });
            }
        } else if action.email_format.is_some() || has_limits {
            warn!(
                "{}: '{}' has email reporting options but no 'email'; \
                 ignoring them",
                self.backend, kind
            );
        }

        if let Some(success) = action.null {
            drivers.push(SpamDriver::Null { success });
        }

        if let Some(command) = action.program {
            drivers.push(SpamDriver::Program { command });
        }

        SpamAction {
            display: action.display.unwrap_or(default_display),
            drivers,
        }
    }

    fn imap_options(&mut self, def: &PartialProfile) -> ImapOptions {
        let defaults = ImapOptions::default();
        ImapOptions {
            acl: def.acl.unwrap_or(defaults.acl),
            autocreate_special: def
                .autocreate_special
                .unwrap_or(defaults.autocreate_special),
            capability_ignore: def
                .capability_ignore
                .iter()
                .flatten()
                .map(|c| c.to_ascii_uppercase())
                .collect(),
            comparator: def.comparator.clone(),
            import_limit: def
                .import_limit
                .and_then(|n| self.count("import_limit", n))
                .unwrap_or(defaults.import_limit),
            lang: def.lang.clone().unwrap_or_default(),
            namespace: def.namespace.clone().unwrap_or_default(),
            thread: def.thread.clone(),
            id: def.id.clone().unwrap_or_default(),
            special_mboxes: def
                .special_mboxes
                .as_ref()
                .map(|m| self.special_mboxes(m))
                .unwrap_or_default(),
            admin: def.admin.as_ref().and_then(|a| self.admin(a)),
        }
    }

    fn special_mboxes(
        &mut self,
        raw: &BTreeMap<String, MailboxName>,
    ) -> BTreeMap<SpecialMailbox, MailboxName> {
        let mut mboxes = BTreeMap::new();
        for (key, value) in raw {
            let kind = match SpecialMailbox::from_key(key) {
                Some(kind) => kind,
                None => {
                    self.problem(Problem::InvalidSpecialMailboxKey {
                        backend: self.backend.to_owned(),
                        key: key.clone(),
                    });
                    continue;
                }
            };

            let well_formed = match *value {
                MailboxName::Name(_) => SpecialMailbox::UserSpecial != kind,
                MailboxName::Localized(_) => {
                    SpecialMailbox::UserSpecial == kind
                }
            };

            if well_formed {
                mboxes.insert(kind, value.clone());
            } else {
                self.problem(Problem::InvalidSpecialMailboxValue {
                    backend: self.backend.to_owned(),
                    key: key.clone(),
                });
            }
        }

        mboxes
    }

    fn admin(&mut self, admin: &PartialAdmin) -> Option<AdminConfig> {
        let user = self.required("admin.user", admin.user.as_ref());
        let password =
            self.required("admin.password", admin.password.as_ref());

        Some(AdminConfig {
            user: user?,
            password: Secret::new(password?),
            userhierarchy: admin.userhierarchy.clone(),
        })
    }

    fn required(
        &mut self,
        field: &'static str,
        value: Option<&String>,
    ) -> Option<String> {
        let value = value.filter(|v| !v.is_empty()).cloned();
        if value.is_none() {
            self.problem(Problem::MissingField {
                backend: self.backend.to_owned(),
                field,
            });
        }
        value
    }

    fn imap_fields_on_pop(&mut self, def: &PartialProfile, strict: bool) {
        for field in def.imap_only_fields() {
            if strict {
                self.problem(Problem::ImapFieldOnPop {
                    backend: self.backend.to_owned(),
                    field,
                });
            } else {
                warn!(
                    "{}: ignoring IMAP-only field '{}' on POP backend",
                    self.backend, field
                );
            }
        }
    }
}

fn setting_text(setting: Option<&Setting>) -> String {
    match setting {
        None => String::new(),
        Some(&Setting::Flag(b)) => b.to_string(),
        Some(&Setting::Name(ref name)) => name.clone(),
    }
}
