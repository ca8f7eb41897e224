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

use std::path::Path;

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};

use mailbackend::support::sysexits::*;

/// Set up logging for a run rooted at `root`.
///
/// Interactive runs log to standard error. Otherwise `logging.toml` in the
/// root configures log4rs if it exists, and syslog is used if not.
pub fn init(root: &Path) {
    if Ok(true) == nix::unistd::isatty(2) {
        init_simple_log();
        return;
    }

    // log4rs and syslog are either/or, since log4rs has no usable syslog
    // appender.
    let log_config_file = root.join("logging.toml");
    if log_config_file.is_file() {
        if let Err(e) =
            log4rs::init_file(&log_config_file, Default::default())
        {
            eprintln!(
                "Failed to initialise logging from '{}': {}",
                log_config_file.display(),
                e
            );
            EX_CONFIG.exit()
        }
    } else {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_MAIL,
            hostname: None,
            process: env!("CARGO_PKG_NAME").to_owned(),
            pid: nix::unistd::getpid().as_raw(),
        };

        let result = syslog::unix(formatter)
            .map_err(|e| e.to_string())
            .and_then(|logger| {
                log::set_boxed_logger(Box::new(syslog::BasicLogger::new(
                    logger,
                )))
                .map_err(|e| e.to_string())
            });
        match result {
            Ok(()) => log::set_max_level(LevelFilter::Info),
            // Without syslog there is still stderr
            Err(e) => {
                init_simple_log();
                log::warn!("Failed to connect to syslog: {}", e);
            }
        }
    }
}

fn init_simple_log() {
    let stderr = ConsoleAppender::builder().target(Target::Stderr).build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Info));

    let result = config
        .map_err(|e| e.to_string())
        .and_then(|config| {
            log4rs::init_config(config)
                .map(|_| ())
                .map_err(|e| e.to_string())
        });
    if let Err(e) = result {
        eprintln!("Failed to initialise logging: {}", e);
        EX_SOFTWARE.exit()
    }
}
