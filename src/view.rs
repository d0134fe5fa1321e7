//! Convenience views over decoded payloads.

use crate::error::Result;
use crate::tar::TarEntry;

/// Reads an entry's payload as text or JSON.
pub trait PayloadView {
    /// Maps every payload byte to the character with the same code.
    ///
    /// No UTF-8 decoding takes place, so multi-byte sequences come out as
    /// one character per byte.
    fn read_as_string(&self) -> String;

    /// Parses [`read_as_string`](PayloadView::read_as_string) as JSON.
    fn read_as_json(&self) -> Result<serde_json::Value>;
}

impl PayloadView for TarEntry {
    fn read_as_string(&self) -> String {
        self.payload.iter().map(|&b| char::from(b)).collect()
    }

    fn read_as_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.read_as_string())?)
    }
}
