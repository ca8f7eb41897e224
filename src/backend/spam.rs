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

//! Spam and innocent reporting settings.
//!
//! Each of the two actions is reported through zero or more drivers. The
//! address of the `email` driver and the command line of the `program` driver
//! may contain placeholders that are expanded per user at report time:
//!
//! - `%u`: the full user name
//! - `%l`: the user name without its domain
//! - `%d`: the domain, empty if the user name has none
//! - `%%`: a literal `%`

use serde::Serialize;

/// Default maximum size of one digest message, in bytes.
pub const DEFAULT_DIGEST_LIMIT_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SpamConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub innocent: Option<SpamAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spam: Option<SpamAction>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpamAction {
    /// For the innocent action, whether it is shown only in the spam mailbox;
    /// for the spam action, whether it is also shown in the spam mailbox.
    pub display: bool,
    pub drivers: Vec<SpamDriver>,
}

impl SpamAction {
    /// The action only appears in the UI if at least one driver reports it.
    pub fn is_active(&self) -> bool {
        !self.drivers.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum SpamDriver {
    Email { address: String, format: EmailFormat },
    /// Report without doing anything, succeeding or failing as configured.
    Null { success: bool },
    /// Pipe the message into an external program.
    Program { command: String },
}

impl SpamDriver {
    /// Return a copy of this driver with all placeholders expanded for
    /// `user`.
    pub fn expanded(&self, user: &str) -> Self {
        match *self {
            SpamDriver::Email {
                ref address,
                format,
            } => SpamDriver::Email {
                address: expand(address, user),
                format,
            },
            SpamDriver::Null { success } => SpamDriver::Null { success },
            SpamDriver::Program { ref command } => SpamDriver::Program {
                command: expand(command, user),
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EmailFormat {
    /// Send the reported messages packaged in `multipart/digest` messages.
    ///
    /// Limits of 0 mean no limit.
    Digest { limit_msgs: u64, limit_size: u64 },
    /// Redirect each message to the reporting address.
    Redirect,
}

/// Expand `%u`, `%l`, `%d` and `%%` in `template`.
///
/// Unknown placeholders are left as-is.
pub fn expand(template: &str, user: &str) -> String {
    let (local, domain) = match user.find('@') {
        Some(at) => (&user[..at], &user[at + 1..]),
        None => (user, ""),
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if '%' != c {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('u') => out.push_str(user),
            Some('l') => out.push_str(local),
            Some('d') => out.push_str(domain),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }

    out
}
