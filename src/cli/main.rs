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

use std::path::{Path, PathBuf};

use structopt::StructOpt;

use mailbackend::backend::source;
use mailbackend::backend::Registry;
use mailbackend::support::sysexits::*;
use mailbackend::support::system_config::SystemConfig;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
struct Options {
    /// The directory containing `backends.toml` etc
    /// [default: /etc/mailbackend or /usr/local/etc/mailbackend]
    #[structopt(long, parse(from_os_str))]
    root: Option<PathBuf>,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Load and validate all backend definitions.
    ///
    /// Every problem in every backend is reported, not just the first one.
    /// Nothing is printed to standard output unless the configuration is
    /// valid, in which case a summary of each backend is shown.
    Check,
    /// Show the fully resolved definition of one backend as TOML.
    ///
    /// Passwords are masked.
    Show {
        /// The id of the backend to show.
        id: String,
    },
    /// Print the id of the backend pre-selected on the login screen.
    Preferred {
        /// Select for this host instead of the configured or system host name.
        #[structopt(long)]
        hostname: Option<String>,
    },
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let options = Options::from_clap(&match Options::clap().get_matches_safe()
    {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    let root = options.root.unwrap_or_else(find_root);
    super::logging::init(&root);

    let system_config = SystemConfig::load(&root).unwrap_or_else(|e| {
        eprintln!("{}", e);
        Sysexit::from(&e).exit()
    });

    let host_name = if system_config.loader.hostname.is_empty() {
        system_host_name()
    } else {
        system_config.loader.hostname.clone()
    };

    let vhost = if system_config.loader.vhosts {
        Some(host_name.as_str())
    } else {
        None
    };

    let registry = source::read_layers(&root, vhost)
        .and_then(|layers| {
            Registry::load(&layers, &system_config.loader.options())
        })
        .unwrap_or_else(|e| {
            eprintln!("{}", e);
            Sysexit::from(&e).exit()
        });

    match options.command {
        Command::Check => super::report::check(&registry, &host_name),
        Command::Show { id } => super::report::show(&registry, &id),
        Command::Preferred { hostname } => super::report::preferred(
            &registry,
            hostname.as_deref().unwrap_or(&host_name),
        ),
    }
}

fn find_root() -> PathBuf {
    for candidate in &["/etc/mailbackend", "/usr/local/etc/mailbackend"] {
        if Path::new(candidate).join(source::BASE_FILE).is_file() {
            return PathBuf::from(candidate);
        }
    }

    eprintln!(
        "Neither /etc/mailbackend nor /usr/local/etc/mailbackend looks like\n\
         the configuration root; use --root=/path/to/config if your\n\
         installation is elsewhere."
    );
    EX_CONFIG.exit()
}

fn system_host_name() -> String {
    let mut buf = [0u8; 256];
    let host_name_cstr =
        nix::unistd::gethostname(&mut buf).unwrap_or_else(|e| {
            eprintln!(
                "Failed to determine host name; you may need to \
                 set 'loader.hostname' explicitly: {}",
                e
            );
            EX_OSERR.exit()
        });

    host_name_cstr
        .to_str()
        .unwrap_or_else(|_| {
            eprintln!("System host name is not UTF-8");
            EX_OSERR.exit()
        })
        .to_owned()
}
