//! File-backed storage
//!
//! One file per key inside a directory.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                        │
//! │   Magic: "TKCF" (4) | Version: u16 (2)                   │
//! │   CRC32 of payload: u32 (4) | Payload length: u32 (4)    │
//! ├──────────────────────────────────────────────────────────┤
//! │ Payload: UTF-8 JSON text                                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//! Writes land in a `.tmp` sibling first and are renamed into place.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Result, TableError};

use super::StorageBackend;

/// Magic bytes identifying a tablekit config file
pub const FILE_MAGIC: &[u8; 4] = b"TKCF";

/// Current file format version
const FILE_VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + CRC (4) + Length (4) = 14 bytes
pub const FILE_HEADER_SIZE: usize = 14;

const FILE_EXTENSION: &str = "cfg";

/// Directory-backed storage
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open or create storage in the given directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path holding `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", encode_key(key), FILE_EXTENSION))
    }

    fn encode(value: &str) -> Vec<u8> {
        let payload = value.as_bytes();
        let mut bytes = Vec::with_capacity(FILE_HEADER_SIZE + payload.len());
        bytes.extend_from_slice(FILE_MAGIC);
        bytes.extend_from_slice(&FILE_VERSION.to_le_bytes());
        bytes.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    fn decode(key: &str, bytes: &[u8]) -> Result<String> {
        if bytes.len() < FILE_HEADER_SIZE {
            return Err(TableError::Corruption(format!("'{}': truncated header", key)));
        }
        if &bytes[0..4] != FILE_MAGIC {
            return Err(TableError::Corruption(format!("'{}': bad magic {:?}", key, &bytes[0..4])));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FILE_VERSION {
            return Err(TableError::Corruption(format!("'{}': unsupported format version {}", key, version)));
        }

        let stored_crc = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        let len = u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]) as usize;
        let payload = &bytes[FILE_HEADER_SIZE..];

        if payload.len() != len {
            return Err(TableError::Corruption(format!(
                "'{}': payload length {} does not match header {}",
                key,
                payload.len(),
                len
            )));
        }
        if crc32fast::hash(payload) != stored_crc {
            return Err(TableError::Corruption(format!("'{}': checksum mismatch", key)));
        }

        String::from_utf8(payload.to_vec())
            .map_err(|e| TableError::Corruption(format!("'{}': payload is not UTF-8: {}", key, e)))
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Self::decode(key, &bytes).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension(format!("{}.tmp", FILE_EXTENSION));

        fs::write(&tmp, Self::encode(value)).map_err(|e| TableError::StorageWrite {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        fs::rename(&tmp, &path).map_err(|e| TableError::StorageWrite {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            if let Some(key) = path.file_stem().and_then(|s| s.to_str()).and_then(decode_key) {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

// =============================================================================
// Key <-> file name
// =============================================================================

/// Percent-encode everything outside `[A-Za-z0-9_-]`
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// "ns-sort%2Econfig" → Some("ns-sort.config")
fn decode_key(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
