//! Tar archive decoding
//!
//! # Usage
//!
//! ## Collecting every entry
//!
//! ```rust,no_run
//! use untar_light::tar::read_tar;
//!
//! let tar_data = std::fs::read("archive.tar").unwrap();
//! for entry in read_tar(&tar_data).unwrap() {
//!     println!("{}: {} bytes", entry.name, entry.size);
//! }
//! ```
//!
//! ## Pulling entries one at a time
//!
//! ```rust,no_run
//! use untar_light::tar::ArchiveIterator;
//!
//! let tar_data = std::fs::read("archive.tar").unwrap();
//! let mut archive = ArchiveIterator::new(&tar_data);
//! while archive.has_next() {
//!     let entry = archive.next_entry().unwrap();
//!     println!("{} ({:?})", entry.name, entry.type_flag);
//! }
//! ```

use std::collections::BTreeMap;

use log::{debug, trace, warn};

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::pax::{PaxHeader, PaxValue};

pub const BLOCK_SIZE: usize = 512;

/// Kind of archive member, from the header's type flag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFlag {
    /// `'0'`, or NUL in pre-POSIX archives
    #[default]
    Regular,
    HardLink,
    Symlink,
    CharDevice,
    BlockDevice,
    Directory,
    Fifo,
    Contiguous,
    /// `'g'`: extended header applying to every following entry
    GlobalPax,
    /// `'x'`: extended header applying to the next entry only
    ExtendedPax,
    Other(char),
}

impl TypeFlag {
    fn parse(flag: &str) -> Self {
        match flag.chars().next() {
            None | Some('0') => TypeFlag::Regular,
            Some('1') => TypeFlag::HardLink,
            Some('2') => TypeFlag::Symlink,
            Some('3') => TypeFlag::CharDevice,
            Some('4') => TypeFlag::BlockDevice,
            Some('5') => TypeFlag::Directory,
            Some('6') => TypeFlag::Fifo,
            Some('7') => TypeFlag::Contiguous,
            Some('g') => TypeFlag::GlobalPax,
            Some('x') => TypeFlag::ExtendedPax,
            Some(c) => TypeFlag::Other(c),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            TypeFlag::Regular => '0',
            TypeFlag::HardLink => '1',
            TypeFlag::Symlink => '2',
            TypeFlag::CharDevice => '3',
            TypeFlag::BlockDevice => '4',
            TypeFlag::Directory => '5',
            TypeFlag::Fifo => '6',
            TypeFlag::Contiguous => '7',
            TypeFlag::GlobalPax => 'g',
            TypeFlag::ExtendedPax => 'x',
            TypeFlag::Other(c) => c,
        }
    }
}

/// One decoded archive member.
///
/// Numeric fields are `None` when the header field did not hold a number or
/// when a PAX record deleted them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TarEntry {
    pub name: String,
    pub mode: Option<u64>,
    pub uid: Option<u64>,
    pub gid: Option<u64>,
    /// Payload length from the header. Unparseable sizes read as 0.
    pub size: u64,
    pub mtime: Option<u64>,
    /// Read from the header but never verified.
    pub checksum: Option<u64>,
    pub type_flag: TypeFlag,
    pub linkname: String,
    // ustar fields, set only when the magic contains "ustar"
    pub ustar_format: Option<String>,
    pub version: Option<String>,
    pub uname: Option<String>,
    pub gname: Option<String>,
    pub devmajor: Option<u64>,
    pub devminor: Option<u64>,
    pub name_prefix: Option<String>,
    /// PAX attributes with no dedicated field.
    pub extra: BTreeMap<String, PaxValue>,
    /// File contents; empty unless the entry is a regular file.
    pub payload: Vec<u8>,
}

impl TarEntry {
    pub fn is_file(&self) -> bool {
        self.type_flag == TypeFlag::Regular
    }

    pub fn is_dir(&self) -> bool {
        self.type_flag == TypeFlag::Directory
    }

    /// Sets or, with `None`, removes the attribute called `name`.
    pub fn set_attribute(&mut self, name: &str, value: Option<PaxValue>) {
        let text = value.as_ref().map(PaxValue::as_text);
        match name {
            "name" => self.name = text.unwrap_or_default(),
            "linkname" => self.linkname = text.unwrap_or_default(),
            "uname" => self.uname = text,
            "gname" => self.gname = text,
            "version" => self.version = text,
            "size" => self.size = value.as_ref().and_then(as_number).unwrap_or(0),
            _ => match self.numeric_field(name) {
                Some(slot) => {
                    *slot = value.as_ref().and_then(as_number);
                    // non-integer text such as a fractional mtime stays available raw
                    match value {
                        Some(raw @ PaxValue::Text(_)) => {
                            self.extra.insert(name.to_string(), raw);
                        }
                        _ => {
                            self.extra.remove(name);
                        }
                    }
                }
                None => match value {
                    Some(value) => {
                        self.extra.insert(name.to_string(), value);
                    }
                    None => {
                        self.extra.remove(name);
                    }
                },
            },
        }
    }

    fn numeric_field(&mut self, name: &str) -> Option<&mut Option<u64>> {
        match name {
            "mode" => Some(&mut self.mode),
            "uid" => Some(&mut self.uid),
            "gid" => Some(&mut self.gid),
            "mtime" => Some(&mut self.mtime),
            "checksum" => Some(&mut self.checksum),
            "devmajor" => Some(&mut self.devmajor),
            "devminor" => Some(&mut self.devminor),
            _ => None,
        }
    }
}

fn as_number(value: &PaxValue) -> Option<u64> {
    match value {
        PaxValue::Integer(n) => Some(*n),
        PaxValue::Text(s) => parse_int_prefix(s, 10),
    }
}

/// Parses the leading digits of `text` in `radix`, skipping leading
/// whitespace. Trailing garbage is ignored; no digits at all yields `None`.
pub(crate) fn parse_int_prefix(text: &str, radix: u32) -> Option<u64> {
    let text = text.trim_start();
    let text = text.strip_prefix('+').unwrap_or(text);
    let end = text
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(text.len());
    u64::from_str_radix(&text[..end], radix).ok()
}

/// What a header block turned out to be.
enum Block {
    Entry(TarEntry),
    Global(PaxHeader),
    PerEntry(PaxHeader),
}

/// Lazily decodes the entries of an in-memory archive.
///
/// Extended header blocks are absorbed and applied to the entries they
/// describe; they are never yielded. The global header lives as long as this
/// iterator, so separate iterators never share PAX state.
#[derive(Debug, Clone)]
pub struct ArchiveIterator<'a> {
    cursor: ByteCursor<'a>,
    global_pax_header: Option<PaxHeader>,
    failed: bool,
}

impl<'a> ArchiveIterator<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: ByteCursor::new(data),
            global_pax_header: None,
            failed: false,
        }
    }

    /// True while at least 4 bytes remain and they are not all zero.
    ///
    /// Only the start of the next block is inspected, not the full pair of
    /// zero blocks that formally ends an archive.
    pub fn has_next(&self) -> bool {
        if self.cursor.remaining_size() < 4 {
            return false;
        }
        match self.cursor.peek_u32() {
            Ok(0) => {
                debug!("end of archive at offset {}", self.cursor.position());
                false
            }
            Ok(_) => true,
            Err(_) => false,
        }
    }

    /// Decodes the next entry, absorbing any extended headers in front of it.
    ///
    /// The global header is applied first, then per-entry headers, so
    /// per-entry values win. When several per-entry headers precede one entry
    /// the earliest one wins.
    pub fn next_entry(&mut self) -> Result<TarEntry> {
        let mut pending = Vec::new();
        let mut entry = loop {
            match self.read_block()? {
                Block::Entry(entry) => break entry,
                Block::Global(header) => {
                    debug!("global pax header with {} fields", header.fields().len());
                    self.global_pax_header = Some(header);
                }
                Block::PerEntry(header) => {
                    debug!("pax header with {} fields", header.fields().len());
                    pending.push(header);
                }
            }
        };
        if let Some(global) = &self.global_pax_header {
            global.apply_header(&mut entry);
        }
        for header in pending.iter().rev() {
            header.apply_header(&mut entry);
        }
        Ok(entry)
    }

    fn read_block(&mut self) -> Result<Block> {
        let block_start = self.cursor.position();
        let mut entry = self.read_header()?;
        let header_end = block_start.saturating_add(BLOCK_SIZE);
        self.cursor.set_position(header_end);
        trace!(
            "header at {}: {:?} type {:?} size {}",
            block_start, entry.name, entry.type_flag, entry.size
        );

        let size = usize::try_from(entry.size).map_err(|_| Error::Truncated {
            offset: header_end,
            needed: usize::MAX,
            available: self.cursor.remaining_size(),
        })?;
        let block = match entry.type_flag {
            TypeFlag::Regular => {
                entry.payload = self.cursor.read_buffer(size)?;
                None
            }
            TypeFlag::GlobalPax => Some(Block::Global(PaxHeader::parse(
                &self.cursor.read_buffer(size)?,
            )?)),
            TypeFlag::ExtendedPax => Some(Block::PerEntry(PaxHeader::parse(
                &self.cursor.read_buffer(size)?,
            )?)),
            TypeFlag::Other(c) => {
                warn!("unknown type flag {:?} for {:?}", c, entry.name);
                None
            }
            _ => None,
        };

        let padding = (BLOCK_SIZE - size % BLOCK_SIZE) % BLOCK_SIZE;
        self.cursor
            .set_position(header_end.saturating_add(size).saturating_add(padding));
        Ok(block.unwrap_or(Block::Entry(entry)))
    }

    /// Reads the fixed header fields starting at the cursor.
    ///
    /// mode, uid, gid, checksum and the device numbers are read as decimal;
    /// size and mtime as octal.
    fn read_header(&mut self) -> Result<TarEntry> {
        let cursor = &mut self.cursor;
        let mut entry = TarEntry {
            name: cursor.read_fixed_string(100)?,
            mode: parse_int_prefix(&cursor.read_fixed_string(8)?, 10),
            uid: parse_int_prefix(&cursor.read_fixed_string(8)?, 10),
            gid: parse_int_prefix(&cursor.read_fixed_string(8)?, 10),
            size: parse_int_prefix(&cursor.read_fixed_string(12)?, 8).unwrap_or(0),
            mtime: parse_int_prefix(&cursor.read_fixed_string(12)?, 8),
            checksum: parse_int_prefix(&cursor.read_fixed_string(8)?, 10),
            type_flag: TypeFlag::parse(&cursor.read_fixed_string(1)?),
            linkname: cursor.read_fixed_string(100)?,
            ..TarEntry::default()
        };

        let magic = cursor.read_fixed_string(6)?;
        if magic.contains("ustar") {
            entry.ustar_format = Some(magic);
            entry.version = Some(cursor.read_fixed_string(2)?);
            entry.uname = Some(cursor.read_fixed_string(32)?);
            entry.gname = Some(cursor.read_fixed_string(32)?);
            entry.devmajor = parse_int_prefix(&cursor.read_fixed_string(8)?, 10);
            entry.devminor = parse_int_prefix(&cursor.read_fixed_string(8)?, 10);
            let prefix = cursor.read_fixed_string(155)?;
            if !prefix.is_empty() {
                entry.name = format!("{}/{}", prefix, entry.name);
            }
            entry.name_prefix = Some(prefix);
        }
        Ok(entry)
    }
}

impl Iterator for ArchiveIterator<'_> {
    type Item = Result<TarEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || !self.has_next() {
            return None;
        }
        let result = self.next_entry();
        self.failed = result.is_err();
        Some(result)
    }
}

/// Decodes every entry of a tar archive held in memory.
///
/// Any error aborts the whole decode; no partial list is returned.
pub fn read_tar(data: &[u8]) -> Result<Vec<TarEntry>> {
    ArchiveIterator::new(data).collect()
}
