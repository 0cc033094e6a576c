//! Secure handling of HTTP header values.
//!
//! Header values configured for a generic HTTP provider usually carry
//! credentials (`Authorization: Bearer ...`). They are wrapped in
//! `SecretString` as soon as they are loaded, so they never show up in
//! `Debug` output or logs.
//!
//! ## Environment references
//!
//! A configured value may reference environment variables with `${VAR}`:
//!
//! ```ignore
//! headers:
//!   Authorization: "Bearer ${SCORER_TOKEN}"
//! ```
//!
//! References are resolved once, when the provider is built. An unset
//! variable is a configuration error.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::fmt;

use super::ProviderError;

lazy_static! {
    static ref ENV_REFERENCE: Regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
}

/// Where a header value was loaded from.
///
/// Useful for debugging configuration issues without exposing the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Literal value from the configuration file
    Config,
    /// Value that referenced at least one environment variable
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

struct HeaderEntry {
    name: String,
    value: SecretString,
    source: CredentialSource,
}

/// An ordered set of HTTP headers whose values are kept secret.
#[derive(Default)]
pub struct HeaderSet {
    entries: Vec<HeaderEntry>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header, replacing any existing header with the same name
    /// (names compare case-insensitively).
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        source: CredentialSource,
    ) {
        let name = name.into();
        self.entries.retain(|e| !e.name.eq_ignore_ascii_case(&name));
        self.entries.push(HeaderEntry {
            name,
            value: SecretString::from(value.into()),
            source,
        });
    }

    /// Build from configured name/value pairs, expanding `${VAR}` references.
    pub fn from_config(headers: &BTreeMap<String, String>) -> Result<Self, ProviderError> {
        let mut set = Self::new();
        for (name, raw) in headers {
            let (value, source) = expand_env(name, raw)?;
            set.insert(name.as_str(), value, source);
        }
        Ok(set)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Iterate name/value pairs with values exposed.
    ///
    /// # Security
    ///
    /// Only call this when attaching headers to an outgoing request.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.value.expose_secret()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Where the named header's value came from.
    pub fn source(&self, name: &str) -> Option<CredentialSource> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn expand_env(header: &str, raw: &str) -> Result<(String, CredentialSource), ProviderError> {
    if !ENV_REFERENCE.is_match(raw) {
        return Ok((raw.to_string(), CredentialSource::Config));
    }

    let mut missing = None;
    let expanded = ENV_REFERENCE.replace_all(raw, |caps: &Captures| {
        let var = &caps[1];
        std::env::var(var).unwrap_or_else(|_| {
            missing.get_or_insert_with(|| var.to_string());
            String::new()
        })
    });

    match missing {
        Some(var) => Err(ProviderError::NotConfigured(format!(
            "header '{}' references unset environment variable '{}'",
            header, var
        ))),
        None => Ok((expanded.into_owned(), CredentialSource::Environment)),
    }
}

impl fmt::Debug for HeaderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for entry in &self.entries {
            map.entry(&entry.name, &format_args!("[REDACTED] ({})", entry.source));
        }
        map.finish()
    }
}
