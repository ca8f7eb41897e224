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

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A single violation found while validating one backend definition.
///
/// Every variant names the backend it was found in, so that an operator can
/// fix a whole configuration in one pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    #[error("backend '{backend}': 'hostspec' is required when enabled")]
    MissingHostspec { backend: String },
    #[error("backend '{backend}': '{field}' is required")]
    MissingField {
        backend: String,
        field: &'static str,
    },
    #[error("backend '{backend}': protocol '{value}' is not 'imap' or 'pop'")]
    InvalidProtocol { backend: String, value: String },
    #[error("backend '{backend}': '{field}': unknown security '{value}'")]
    InvalidSecurityMode {
        backend: String,
        field: &'static str,
        value: String,
    },
    #[error("backend '{backend}': '{field}' = {value} is not a valid port")]
    InvalidPort {
        backend: String,
        field: &'static str,
        value: i64,
    },
    #[error("backend '{backend}': '{field}' = {value} must not be negative")]
    InvalidNumericField {
        backend: String,
        field: String,
        value: i64,
    },
    #[error(
        "backend '{backend}': '{field}' = '{value}' \
         is not 'digest' or 'redirect'"
    )]
    InvalidSpamFormat {
        backend: String,
        field: String,
        value: String,
    },
    #[error("backend '{backend}': unknown special mailbox '{key}'")]
    InvalidSpecialMailboxKey { backend: String, key: String },
    #[error("backend '{backend}': special mailbox '{key}' has the wrong shape")]
    InvalidSpecialMailboxValue { backend: String, key: String },
    #[error("backend '{backend}': unknown cache backend '{value}'")]
    InvalidCacheBackend { backend: String, value: String },
    #[error(
        "backend '{backend}': 'hordeauth' = '{value}' \
         is not true, false or 'full'"
    )]
    InvalidHordeAuth { backend: String, value: String },
    #[error("backend '{backend}': unknown quota unit '{value}'")]
    InvalidQuotaUnit { backend: String, value: String },
    #[error("backend '{backend}': '{field}' is only allowed on IMAP backends")]
    ImapFieldOnPop {
        backend: String,
        field: &'static str,
    },
    #[error("backend '{backend}' is already defined before layer '{layer}'")]
    DuplicateBackendId { backend: String, layer: String },
}

impl Problem {
    /// The id of the backend this problem was found in.
    pub fn backend(&self) -> &str {
        match *self {
            Problem::MissingHostspec { ref backend }
            | Problem::MissingField { ref backend, .. }
            | Problem::InvalidProtocol { ref backend, .. }
            | Problem::InvalidSecurityMode { ref backend, .. }
            | Problem::InvalidPort { ref backend, .. }
            | Problem::InvalidNumericField { ref backend, .. }
            | Problem::InvalidSpamFormat { ref backend, .. }
            | Problem::InvalidSpecialMailboxKey { ref backend, .. }
            | Problem::InvalidSpecialMailboxValue { ref backend, .. }
            | Problem::InvalidCacheBackend { ref backend, .. }
            | Problem::InvalidHordeAuth { ref backend, .. }
            | Problem::InvalidQuotaUnit { ref backend, .. }
            | Problem::ImapFieldOnPop { ref backend, .. }
            | Problem::DuplicateBackendId { ref backend, .. } => backend,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{}", Problems(.0))]
    Invalid(Vec<Problem>),
    #[error("No enabled backend is configured")]
    NoEnabledBackend,
    #[error("Error reading '{}': {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Error in config file at '{}': {}", .path.display(), .source)]
    Syntax {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    /// The validation problems carried by this error, if any.
    pub fn problems(&self) -> &[Problem] {
        match *self {
            ConfigError::Invalid(ref problems) => problems,
            _ => &[],
        }
    }
}

struct Problems<'a>(&'a [Problem]);

impl fmt::Display for Problems<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} problem(s) in backend configuration:",
            self.0.len()
        )?;
        for problem in self.0 {
            write!(f, "\n  {}", problem)?;
        }
        Ok(())
    }
}
