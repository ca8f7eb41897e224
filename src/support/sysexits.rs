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

use std::io;

use super::error::ConfigError;

/// A process exit status from `sysexits.h`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Sysexit(pub i32);

pub const EX_USAGE: Sysexit = Sysexit(64);
pub const EX_NOINPUT: Sysexit = Sysexit(66);
pub const EX_SOFTWARE: Sysexit = Sysexit(70);
pub const EX_OSERR: Sysexit = Sysexit(71);
pub const EX_IOERR: Sysexit = Sysexit(74);
pub const EX_CONFIG: Sysexit = Sysexit(78);

impl Sysexit {
    pub fn exit(self) -> ! {
        std::process::exit(self.0)
    }
}

impl From<&ConfigError> for Sysexit {
    fn from(e: &ConfigError) -> Self {
        match *e {
            ConfigError::Io { ref source, .. }
                if io::ErrorKind::NotFound == source.kind() =>
            {
                EX_NOINPUT
            }
            ConfigError::Io { .. } => EX_IOERR,
            ConfigError::Invalid(_)
            | ConfigError::NoEnabledBackend
            | ConfigError::Syntax { .. } => EX_CONFIG,
        }
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn exit_codes() {
        let missing = ConfigError::Io {
            path: PathBuf::from("backends.toml"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(EX_NOINPUT, Sysexit::from(&missing));

        let denied = ConfigError::Io {
            path: PathBuf::from("backends.toml"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "no"),
        };
        assert_eq!(EX_IOERR, Sysexit::from(&denied));

        assert_eq!(EX_CONFIG, Sysexit::from(&ConfigError::NoEnabledBackend));
        assert_eq!(
            EX_CONFIG,
            Sysexit::from(&ConfigError::Invalid(Vec::new()))
        );
    }
}
