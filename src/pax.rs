//! PAX extended headers (POSIX.1-2001).
//!
//! An extended header payload is a run of self-delimited records shaped as
//! `"<length> <key>=<value>\n"`, where `<length>` counts the whole record,
//! itself included.

use log::trace;

use crate::error::{Error, Result};
use crate::tar::TarEntry;
use crate::utf8;

/// Value of a PAX record after coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaxValue {
    Text(String),
    /// The raw value consisted of decimal digits only.
    Integer(u64),
}

impl PaxValue {
    /// Coerces a raw record value. `None` means "delete this attribute".
    fn coerce(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        if raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = raw.parse::<u64>() {
                return Some(PaxValue::Integer(n));
            }
        }
        Some(PaxValue::Text(raw.to_string()))
    }

    pub fn as_text(&self) -> String {
        match self {
            PaxValue::Text(s) => s.clone(),
            PaxValue::Integer(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaxField {
    pub name: String,
    pub value: Option<PaxValue>,
}

/// Ordered fields of one extended header block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaxHeader {
    fields: Vec<PaxField>,
}

impl PaxHeader {
    /// Parses an extended header payload.
    ///
    /// Fails with [`Error::Format`] when a record is malformed, with
    /// [`Error::Truncated`] when a record's length runs past the payload, and
    /// with [`Error::Decode`] when a record is not valid UTF-8.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut fields = Vec::new();
        let mut rest = bytes;
        while !rest.is_empty() {
            let offset = bytes.len() - rest.len();
            let space = rest
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| Error::Format(format!("record at {} has no length", offset)))?;
            let length = utf8::decode(&rest[..space])?
                .parse::<usize>()
                .map_err(|_| Error::Format(format!("record at {} has a bad length", offset)))?;
            if length > rest.len() {
                return Err(Error::Truncated {
                    offset,
                    needed: length,
                    available: rest.len(),
                });
            }

            let record = utf8::decode(&rest[..length])?;
            let (key, value) = split_record(&record)
                .ok_or_else(|| Error::Format(format!("{:?}", record)))?;
            trace!("pax record {}={}", key, value);
            fields.push(PaxField {
                name: key.to_string(),
                value: PaxValue::coerce(value),
            });
            rest = &rest[length..];
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[PaxField] {
        &self.fields
    }

    /// Copies every field onto `entry`.
    ///
    /// `path` lands on the name and drops any ustar name prefix; `linkpath`
    /// lands on the link name. A field without a value removes the attribute.
    pub fn apply_header(&self, entry: &mut TarEntry) {
        for field in &self.fields {
            let name = match field.name.as_str() {
                "path" => {
                    entry.name_prefix = None;
                    "name"
                }
                "linkpath" => "linkname",
                other => other,
            };
            entry.set_attribute(name, field.value.clone());
        }
    }
}

/// Matches `^\d+ ([^=]+)=(.*)\n$` and returns the key and value.
fn split_record(record: &str) -> Option<(&str, &str)> {
    let body = record.strip_suffix('\n')?;
    let (length, pair) = body.split_once(' ')?;
    if length.is_empty() || !length.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (key, value) = pair.split_once('=')?;
    if key.is_empty() || value.contains(['\n', '\r', '\u{2028}', '\u{2029}']) {
        return None;
    }
    Some((key, value))
}
