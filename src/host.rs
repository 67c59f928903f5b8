use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

const MAX_HOSTNAME_LEN: usize = 253;

/// A scan target. Identity is the raw hostname string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Host(String);

impl Host {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Host {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn hostname_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // One or more labels followed by an alphabetic TLD.
        Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$")
            .expect("static hostname pattern")
    })
}

/// Syntactic check that `name` is a plausible fully qualified DNS hostname.
pub fn is_valid(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_HOSTNAME_LEN && hostname_re().is_match(name)
}

/// Result of filtering a raw host list.
#[derive(Debug, Clone, Default)]
pub struct CleanHosts {
    pub valid: Vec<Host>,
    pub invalid: Vec<String>,
    pub duplicates: Vec<String>,
}

/// Drops invalid names and repeated entries, keeping first occurrences in input order.
pub fn clean<S: AsRef<str>>(raw: &[S]) -> CleanHosts {
    let mut out = CleanHosts::default();
    let mut seen = HashSet::new();
    for name in raw {
        let name = name.as_ref().trim();
        if !is_valid(name) {
            out.invalid.push(name.to_string());
        } else if !seen.insert(name.to_string()) {
            out.duplicates.push(name.to_string());
        } else {
            out.valid.push(Host::new(name));
        }
    }
    out
}
