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

use mailbackend::backend::model::{BackendProfile, Protocol};
use mailbackend::backend::Registry;
use mailbackend::support::sysexits::*;

pub fn check(registry: &Registry, host_name: &str) {
    for backend in registry.iter() {
        println!("{}", summarise(backend));
    }

    match registry.resolve_preferred(host_name) {
        Ok(id) => println!("Preferred on {}: {}", host_name, id),
        Err(e) => {
            eprintln!("{}", e);
            Sysexit::from(&e).exit()
        }
    }
}

pub fn show(registry: &Registry, id: &str) {
    let backend = registry.get(id).unwrap_or_else(|| {
        eprintln!("No backend with id '{}'", id);
        EX_USAGE.exit()
    });

    match render(backend) {
        Ok(s) => print!("{}", s),
        Err(e) => {
            eprintln!("Failed to format backend '{}': {}", id, e);
            EX_SOFTWARE.exit()
        }
    }
}

pub fn preferred(registry: &Registry, host_name: &str) {
    match registry.resolve_preferred(host_name) {
        Ok(id) => println!("{}", id),
        Err(e) => {
            eprintln!("{}", e);
            Sysexit::from(&e).exit()
        }
    }
}

/// Format a resolved profile as TOML. Secrets are masked.
pub fn render(backend: &BackendProfile) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(backend)
}

fn summarise(backend: &BackendProfile) -> String {
    let mut line = format!(
        "{}: {} {}:{} ({}",
        backend.id,
        backend.protocol,
        backend.hostspec,
        backend.port,
        backend.secure,
    );

    if backend.cache.is_enabled() {
        line.push_str(", cached");
    }
    if Protocol::Pop == backend.protocol {
        line.push_str(", no mailboxes");
    }
    if backend.smtp.is_some() {
        line.push_str(", own SMTP");
    }
    line.push(')');

    if backend.disabled {
        line.push_str(" [disabled]");
    }
    line
}

#[cfg(test)]
mod test {
    use mailbackend::backend::{
        DefinitionLayer, LoaderOptions, PartialProfile, Registry,
    };

    use super::*;

    const FULL_IMAP: &str = r#"
[imap]
hostspec = "mail.example.com"
hordeauth = "full"
cache = "hashtable"
cache_lifetime = 600
preferred = ["webmail.example.com"]

[imap.special_mboxes]
sent = "Sent"
trash = "Trash"

[imap.special_mboxes.userspecial]
"INBOX.Archive" = "Archive"

[imap.admin]
user = "cyrus"
password = "hunter2"

[imap.quota]
driver = "imap"

[imap.quota.params]
unit = "GB"

[imap.smtp]
host = "smtp.example.com"
username = "relay"
password = "hunter3"

[imap.spam.spam]
email = "spam@example.com"
"#;

    fn load(text: &str) -> Registry {
        let layer =
            DefinitionLayer::from_toml("backends.toml", text.as_bytes())
                .unwrap();
        Registry::load(&[layer], &LoaderOptions::default()).unwrap()
    }

    #[test]
    fn render_full_imap_profile() {
        let registry = load(FULL_IMAP);
        let text = render(registry.get("imap").unwrap()).unwrap();
        let value: toml::Value = toml::from_str(&text).unwrap();

        assert_eq!(
            Some("Sent"),
            value["imap"]["special_mboxes"]["sent"].as_str()
        );
        assert_eq!(
            Some("Archive"),
            value["imap"]["special_mboxes"]["userspecial"]["INBOX.Archive"]
                .as_str()
        );
        assert_eq!(Some("imap"), value["quota"]["driver"].as_str());
        assert_eq!(Some("smtp.example.com"), value["smtp"]["host"].as_str());
        assert_eq!(
            Some("spam@example.com"),
            value["spam"]["spam"]["drivers"][0]["address"].as_str()
        );

        assert!(!text.contains("hunter2"));
        assert!(!text.contains("hunter3"));
        assert_eq!(Some("********"), value["smtp"]["password"].as_str());
        assert_eq!(
            Some("********"),
            value["imap"]["admin"]["password"].as_str()
        );
    }

    #[test]
    fn render_pop_profile() {
        let registry = load(
            "[pop]\nhostspec = \"pop.example.com\"\nprotocol = \"pop\"\n",
        );
        let text = render(registry.get("pop").unwrap()).unwrap();
        let value: toml::Value = toml::from_str(&text).unwrap();

        assert_eq!(Some("pop"), value["protocol"].as_str());
        assert!(value.get("imap").is_none());
        assert_eq!(Some(true), value["hordeauth"].as_bool());
        assert_eq!(Some(false), value["cache"].as_bool());
        assert!(value.get("cache_lifetime").is_none());
    }

    #[test]
    fn rendered_settings_load_back() {
        let registry = load(FULL_IMAP);
        let original = registry.get("imap").unwrap();
        let value: toml::Value =
            toml::from_str(&render(original).unwrap()).unwrap();

        assert_eq!(Some("full"), value["hordeauth"].as_str());
        assert_eq!(Some("hashtable"), value["cache"].as_str());
        assert_eq!(Some(600), value["cache_lifetime"].as_integer());

        let reloaded = Registry::load(
            &[DefinitionLayer::new("dump").with(
                "imap",
                PartialProfile {
                    hostspec: Some("mail.example.com".to_owned()),
                    hordeauth: Some(
                        value["hordeauth"].clone().try_into().unwrap(),
                    ),
                    cache: Some(value["cache"].clone().try_into().unwrap()),
                    cache_lifetime: value["cache_lifetime"].as_integer(),
                    ..PartialProfile::default()
                },
            )],
            &LoaderOptions::default(),
        )
        .unwrap();
        let reloaded = reloaded.get("imap").unwrap();

        assert_eq!(original.hordeauth, reloaded.hordeauth);
        assert_eq!(original.cache, reloaded.cache);
        assert_eq!(original.cache_lifetime, reloaded.cache_lifetime);
    }
}
