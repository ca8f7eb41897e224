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

/// Whether `name` can be embedded in a configuration file name, as in
/// `backends-<name>.toml`.
///
/// This is stricter than what DNS allows.
pub fn is_safe_host_name(name: &str) -> bool {
    !name.is_empty() &&
        // Block directory traversal through .. and hidden files on UNIX
        !name.starts_with('.') &&
        !name.contains('/') &&
        // Only a path separator on Windows, but always block
        !name.contains('\\') &&
        // No whitespace or ASCII control characters
        !name.contains(|c: char| c <= ' ' || c == '\x7F') &&
        // Glob characters would confuse anyone listing the directory
        !name.contains(|c: char| c == '*' || c == '?')
}

#[cfg(test)]
mod test {
    use super::is_safe_host_name;

    #[test]
    fn test_is_safe_host_name() {
        assert!(is_safe_host_name("mail"));
        assert!(is_safe_host_name("mail.example.com"));
        assert!(is_safe_host_name("web-01"));
        assert!(is_safe_host_name("bücher.example"));
        assert!(!is_safe_host_name(""));
        assert!(!is_safe_host_name("."));
        assert!(!is_safe_host_name(".."));
        assert!(!is_safe_host_name(".hidden"));
        assert!(!is_safe_host_name("../etc"));
        assert!(!is_safe_host_name("foo/bar"));
        assert!(!is_safe_host_name("foo\\bar"));
        assert!(!is_safe_host_name("foo bar"));
        assert!(!is_safe_host_name("foo\0"));
        assert!(!is_safe_host_name("fo\x7Fo"));
        assert!(!is_safe_host_name("web*"));
    }
}
