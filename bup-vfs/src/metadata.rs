use std::collections::HashMap;

pub const DETAILS: &str = "details";
pub const RESUME: &str = "resume";

/// String key/value pairs a transport sends along with a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata(HashMap<String, String>);

impl RequestMetadata {
    pub fn new() -> RequestMetadata {
        RequestMetadata::default()
    }

    pub fn with<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> RequestMetadata {
        self.insert(key, value);
        self
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Requested detail level. Absent or empty means `default`; anything that
    /// is not a number counts as level 0.
    pub fn details(&self, default: u32) -> u32 {
        match self.get(DETAILS).map(str::trim) {
            None | Some("") => default,
            Some(value) => value.parse().unwrap_or(0),
        }
    }

    /// Offset a transfer should continue from, if any was given.
    pub fn resume_offset(&self) -> Option<u64> {
        self.get(RESUME)?.trim().parse().ok()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RequestMetadata(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
