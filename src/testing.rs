//! In-memory archive construction for tests.

use crate::tar::BLOCK_SIZE;

/// Raw header field texts, written verbatim into their slots.
pub(crate) struct HeaderSpec {
    pub name: String,
    pub mode: String,
    pub uid: String,
    pub gid: String,
    pub mtime: String,
    pub type_flag: u8,
    pub linkname: String,
    pub ustar: bool,
    pub uname: String,
    pub gname: String,
    pub prefix: String,
}

impl Default for HeaderSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            mode: "0000644".into(),
            uid: "0000000".into(),
            gid: "0000000".into(),
            mtime: "00000000000".into(),
            type_flag: b'0',
            linkname: String::new(),
            ustar: true,
            uname: String::new(),
            gname: String::new(),
            prefix: String::new(),
        }
    }
}

fn put(block: &mut [u8], offset: usize, width: usize, value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(width);
    block[offset..offset + len].copy_from_slice(&bytes[..len]);
}

pub(crate) fn header_block(spec: &HeaderSpec, size: usize) -> [u8; BLOCK_SIZE] {
    let mut block = [0u8; BLOCK_SIZE];
    put(&mut block, 0, 100, &spec.name);
    put(&mut block, 100, 8, &spec.mode);
    put(&mut block, 108, 8, &spec.uid);
    put(&mut block, 116, 8, &spec.gid);
    put(&mut block, 124, 12, &format!("{:011o}", size));
    put(&mut block, 136, 12, &spec.mtime);
    block[156] = spec.type_flag;
    put(&mut block, 157, 100, &spec.linkname);
    if spec.ustar {
        put(&mut block, 257, 6, "ustar");
        put(&mut block, 263, 2, "00");
        put(&mut block, 265, 32, &spec.uname);
        put(&mut block, 297, 32, &spec.gname);
        put(&mut block, 345, 155, &spec.prefix);
    }
    let sum: u32 = block
        .iter()
        .enumerate()
        .map(|(i, &b)| if (148..156).contains(&i) { u32::from(b' ') } else { u32::from(b) })
        .sum();
    put(&mut block, 148, 8, &format!("{:06o}\0 ", sum));
    block
}

/// One `"<length> key=value\n"` record with a self-consistent length.
pub(crate) fn pax_record(key: &str, value: &str) -> Vec<u8> {
    let body = key.len() + value.len() + 3;
    let mut length = body + body.to_string().len();
    if length.to_string().len() > body.to_string().len() {
        length += 1;
    }
    format!("{} {}={}\n", length, key, value).into_bytes()
}

#[derive(Default)]
pub(crate) struct ArchiveBuilder {
    data: Vec<u8>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, spec: HeaderSpec, payload: &[u8]) -> Self {
        self.data.extend_from_slice(&header_block(&spec, payload.len()));
        self.data.extend_from_slice(payload);
        let padding = (BLOCK_SIZE - payload.len() % BLOCK_SIZE) % BLOCK_SIZE;
        self.data.resize(self.data.len() + padding, 0);
        self
    }

    pub fn file(self, name: &str, content: &[u8]) -> Self {
        let spec = HeaderSpec {
            name: name.to_string(),
            ..HeaderSpec::default()
        };
        self.entry(spec, content)
    }

    pub fn pax(self, type_flag: u8, records: &[(&str, &str)]) -> Self {
        let payload: Vec<u8> = records.iter().flat_map(|(k, v)| pax_record(k, v)).collect();
        self.raw_pax(type_flag, &payload)
    }

    pub fn raw_pax(self, type_flag: u8, payload: &[u8]) -> Self {
        let spec = HeaderSpec {
            name: "./PaxHeaders/entry".into(),
            type_flag,
            ..HeaderSpec::default()
        };
        self.entry(spec, payload)
    }

    /// Archive bytes without the trailing zero blocks.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.data.extend_from_slice(&[0u8; 2 * BLOCK_SIZE]);
        self.data
    }
}

#[test]
fn pax_record_length_counts_itself() {
    let long = "x".repeat(90);
    for (key, value) in [("a", ""), ("path", long.as_str()), ("k", "12345")] {
        let record = pax_record(key, value);
        let text = String::from_utf8(record.clone()).unwrap();
        let declared: usize = text.split(' ').next().unwrap().parse().unwrap();
        assert_eq!(declared, record.len(), "{text:?}");
    }
}
