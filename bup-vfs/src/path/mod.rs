use std::fmt;

pub const SEPARATOR: char = '/';

/// The one URL scheme an address may carry.
pub const SCHEME: &str = "bup:";

/// A request address in normal form: absolute and slash-terminated, with empty
/// segments removed.
///
/// Addresses arrive in many shapes. `bup:/a/b`, `bup:///a/b`, `bup://a/b`,
/// `bup:a/b`, `//a/b` and `/a/b/` all normalise to `/a/b/`: an authority is
/// treated as the first path component, as are any number of leading slashes.
///
/// Everything after the scheme is a plain path: `?`, `#`, `%` and `:` are
/// ordinary name characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> Address {
        let path = raw.strip_prefix(SCHEME).unwrap_or(raw);

        let mut normalized = String::with_capacity(path.len() + 2);
        normalized.push(SEPARATOR);
        for component in path.split(SEPARATOR).filter(|c| !c.is_empty()) {
            normalized.push_str(component);
            normalized.push(SEPARATOR);
        }

        Address(normalized)
    }

    #[inline(always)]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|c| !c.is_empty())
    }

    /// Components below `root`, or `None` when this address is not under it.
    /// `root` must itself be slash-terminated.
    pub fn strip_root(&self, root: &str) -> Option<Vec<String>> {
        debug_assert!(root.ends_with(SEPARATOR));
        let rest = self.0.strip_prefix(root)?;
        Some(split_components(rest))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-empty, slash-separated components of `path`.
pub fn split_components(path: &str) -> Vec<String> {
    path.split(SEPARATOR)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Components joined back for display in errors and logs.
pub fn display_components<S: AsRef<str>>(components: &[S]) -> String {
    let mut out = String::new();
    for (i, component) in components.iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.push_str(component.as_ref());
    }
    out
}
