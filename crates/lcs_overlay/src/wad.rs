//! WAD v3.0 archive reading.
//!
//! A WAD file is laid out as a fixed 272-byte [`WadHeader`], a table of contents
//! of `entry_count` fixed 32-byte [`WadEntry`] records sorted by key, and a data
//! section holding the (possibly pre-compressed) payloads the TOC points into.
//!
//! ```text
//! +--------------------+  0
//! | magic "RW"         |
//! | major 3, minor 0   |
//! | signature [256]    |
//! | checksum  u64      |
//! | entry_count u32    |
//! +--------------------+  272
//! | WadEntry * count   |
//! +--------------------+  272 + 32 * count  (data_offset)
//! | data section       |
//! +--------------------+  data_offset + data_size
//! ```
//!
//! [`Wad`] is an immutable handle: reading never keeps the file open, and a
//! merged archive is produced by [`write_merged_wad`](crate::wad_builder::write_merged_wad)
//! rather than by mutating the handle.

use crate::error::{Error, Result};
use binrw::{binrw, BinRead};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufReader, Seek};

/// Magic tag at the start of every WAD.
pub const WAD_MAGIC: [u8; 2] = *b"RW";
/// The only supported major version.
pub const WAD_MAJOR: u8 = 3;
/// The only supported minor version.
pub const WAD_MINOR: u8 = 0;
/// Size in bytes of the header.
pub const HEADER_SIZE: u64 = 272;
/// Size in bytes of one TOC record.
pub const ENTRY_SIZE: u64 = 32;

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WadHeader {
    pub magic: [u8; 2],
    pub major: u8,
    pub minor: u8,
    pub signature: [u8; 256],
    pub checksum: u64,
    pub entry_count: u32,
}

/// One TOC record.
///
/// Sizes and offsets are signed 32-bit by format convention. `kind` is the
/// storage/compression tag and is passed through untouched.
#[binrw]
#[brw(little)]
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WadEntry {
    pub key: u64,
    pub offset: i32,
    pub compressed_size: i32,
    pub uncompressed_size: i32,
    pub kind: u8,
    #[br(map = |b: u8| b != 0)]
    #[bw(map = |b: &bool| u8::from(*b))]
    pub is_duplicate: bool,
    /// First 8 bytes of the payload's content hash. Not verified here.
    #[brw(pad_before = 2)]
    pub content_hash: u64,
}

/// Handle to one archive on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wad {
    path: Utf8PathBuf,
    #[serde(with = "signature_bytes")]
    signature: [u8; 256],
    checksum: u64,
    entries: BTreeMap<u64, WadEntry>,
    data_offset: u64,
    data_size: u64,
}

impl Wad {
    /// Read the header and table of contents of the archive at `path`.
    ///
    /// Fails with [`Error::Format`] when the magic or version does not match.
    /// A key repeated in the TOC keeps its last record.
    pub fn read(path: &Utf8Path) -> Result<Self> {
        let file = std::fs::File::open(path.as_std_path())?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let header = WadHeader::read(&mut reader)?;
        if header.magic != WAD_MAGIC {
            return Err(Error::Format {
                path: path.to_path_buf(),
                reason: format!("bad magic {:02x?}", header.magic),
            });
        }
        if header.major != WAD_MAJOR || header.minor != WAD_MINOR {
            return Err(Error::Format {
                path: path.to_path_buf(),
                reason: format!(
                    "unsupported version {}.{} (expected {}.{})",
                    header.major, header.minor, WAD_MAJOR, WAD_MINOR
                ),
            });
        }

        let mut entries = BTreeMap::new();
        for _ in 0..header.entry_count {
            let entry = WadEntry::read(&mut reader)?;
            if entries.insert(entry.key, entry).is_some() {
                tracing::debug!("Duplicate TOC key {:016x} in '{}'", entry.key, path);
            }
        }

        let data_offset = reader.stream_position()?;
        let data_size = file_len.saturating_sub(data_offset);

        tracing::trace!(
            "Read WAD '{}': {} entries, data at {} ({} bytes)",
            path,
            entries.len(),
            data_offset,
            data_size
        );

        Ok(Self {
            path: path.to_path_buf(),
            signature: header.signature,
            checksum: header.checksum,
            entries,
            data_offset,
            data_size,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn signature(&self) -> &[u8; 256] {
        &self.signature
    }

    pub fn checksum(&self) -> u64 {
        self.checksum
    }

    /// TOC entries keyed (and therefore ordered) by key.
    pub fn entries(&self) -> &BTreeMap<u64, WadEntry> {
        &self.entries
    }

    pub fn contains(&self, key: u64) -> bool {
        self.entries.contains_key(&key)
    }

    /// Byte offset at which the data section begins.
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// Length of the data section in bytes.
    pub fn data_size(&self) -> u64 {
        self.data_size
    }
}

/// serde has no impls for arrays longer than 32.
mod signature_bytes {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(signature: &[u8; 256], serializer: S) -> Result<S::Ok, S::Error> {
        signature.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 256], D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        bytes
            .try_into()
            .map_err(|v: Vec<u8>| D::Error::invalid_length(v.len(), &"256 signature bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{utf8_tempdir, write_fixture_wad};
    use binrw::BinWrite;
    use std::io::Cursor;

    #[test]
    fn test_header_size() {
        let header = WadHeader {
            magic: WAD_MAGIC,
            major: WAD_MAJOR,
            minor: WAD_MINOR,
            signature: [0u8; 256],
            checksum: 0,
            entry_count: 0,
        };
        let mut writer = Cursor::new(Vec::new());
        header.write(&mut writer).unwrap();
        assert_eq!(writer.position(), HEADER_SIZE);
    }

    #[test]
    fn test_entry_size_and_layout() {
        let entry = WadEntry {
            key: 0x1122334455667788,
            offset: 300,
            compressed_size: 10,
            uncompressed_size: 20,
            kind: 3,
            is_duplicate: true,
            content_hash: 0xAABB,
        };
        let mut writer = Cursor::new(Vec::new());
        entry.write(&mut writer).unwrap();
        let bytes = writer.into_inner();

        assert_eq!(bytes.len() as u64, ENTRY_SIZE);
        assert_eq!(&bytes[0..8], &0x1122334455667788u64.to_le_bytes());
        assert_eq!(&bytes[8..12], &300i32.to_le_bytes());
        assert_eq!(bytes[20], 3);
        assert_eq!(bytes[21], 1);
        assert_eq!(&bytes[22..24], &[0, 0]);
        assert_eq!(&bytes[24..32], &0xAABBu64.to_le_bytes());
    }

    #[test]
    fn test_duplicate_flag_nonzero_is_true() {
        let mut bytes = vec![0u8; ENTRY_SIZE as usize];
        bytes[21] = 7;
        let entry = WadEntry::read(&mut Cursor::new(bytes)).unwrap();
        assert!(entry.is_duplicate);
    }

    #[test]
    fn test_read_fixture() {
        let dir = utf8_tempdir();
        let path = dir.path.join("test.wad.client");
        write_fixture_wad(&path, &[(2, b"bb".as_slice()), (1, b"a".as_slice())]);

        let wad = Wad::read(&path).unwrap();
        assert_eq!(wad.entries().len(), 2);
        assert_eq!(wad.data_offset(), HEADER_SIZE + 2 * ENTRY_SIZE);
        assert_eq!(wad.data_size(), 3);
        assert_eq!(wad.entries().keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(wad.entries()[&2].compressed_size, 2);
        assert!(wad.contains(1));
        assert!(!wad.contains(3));
    }

    #[test]
    fn test_read_rejects_bad_magic() {
        let dir = utf8_tempdir();
        let path = dir.path.join("bad.wad.client");
        write_fixture_wad(&path, &[(1, b"a".as_slice())]);

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] = b'X';
        std::fs::write(&path, bytes).unwrap();

        let err = Wad::read(&path).unwrap_err();
        assert!(matches!(err, Error::Format { .. }), "got {err:?}");
    }

    #[test]
    fn test_read_rejects_other_versions() {
        let dir = utf8_tempdir();
        let path = dir.path.join("v34.wad.client");
        write_fixture_wad(&path, &[(1, b"a".as_slice())]);

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[3] = 4;
        std::fs::write(&path, bytes).unwrap();

        let err = Wad::read(&path).unwrap_err();
        assert!(matches!(err, Error::Format { .. }), "got {err:?}");
    }

    #[test]
    fn test_read_truncated_toc_fails() {
        let dir = utf8_tempdir();
        let path = dir.path.join("short.wad.client");
        write_fixture_wad(&path, &[(1, b"a".as_slice()), (2, b"b".as_slice())]);

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..(HEADER_SIZE + ENTRY_SIZE) as usize]).unwrap();

        assert!(Wad::read(&path).is_err());
    }
}
