//! Fixtures shared by the unit and scenario tests.

use crate::wad::{WadEntry, WadHeader, ENTRY_SIZE, HEADER_SIZE, WAD_MAGIC, WAD_MAJOR, WAD_MINOR};
use binrw::BinWrite;
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Cursor;
use tempfile::TempDir;

/// A temporary directory with its UTF-8 path.
pub struct Utf8TempDir {
    // Held to delete the directory on drop.
    _dir: TempDir,
    pub path: Utf8PathBuf,
}

pub fn utf8_tempdir() -> Utf8TempDir {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    Utf8TempDir { _dir: dir, path }
}

/// Write a valid v3.0 WAD containing `chunks` as uncompressed payloads.
///
/// Entries are sorted by key in the TOC; payloads are laid out in TOC order.
pub fn write_fixture_wad(path: &Utf8Path, chunks: &[(u64, &[u8])]) {
    let mut sorted = chunks.to_vec();
    sorted.sort_by_key(|(key, _)| *key);

    let header = WadHeader {
        magic: WAD_MAGIC,
        major: WAD_MAJOR,
        minor: WAD_MINOR,
        signature: [0x5A; 256],
        checksum: 0xC0FFEE,
        entry_count: sorted.len() as u32,
    };

    let mut out = Cursor::new(Vec::new());
    header.write(&mut out).unwrap();

    let mut offset = HEADER_SIZE + ENTRY_SIZE * sorted.len() as u64;
    for (key, bytes) in &sorted {
        WadEntry {
            key: *key,
            offset: offset as i32,
            compressed_size: bytes.len() as i32,
            uncompressed_size: bytes.len() as i32,
            kind: 0,
            is_duplicate: false,
            content_hash: 0,
        }
        .write(&mut out)
        .unwrap();
        offset += bytes.len() as u64;
    }
    for (_, bytes) in &sorted {
        std::io::Write::write_all(&mut out, bytes).unwrap();
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, out.into_inner()).unwrap();
}

/// Create `path` (and its parents) with `bytes` as content.
pub fn write_file(path: &Utf8Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

/// Move the modification time of `path` a minute ahead, so mtime checks see a change
/// regardless of filesystem timestamp resolution.
pub fn bump_mtime(path: &Utf8Path) {
    let later = std::time::SystemTime::now() + std::time::Duration::from_secs(60);
    std::fs::File::open(path)
        .unwrap()
        .set_modified(later)
        .unwrap();
}

/// Read back the payload of `key` from a WAD on disk using its TOC offsets.
pub fn read_payload(path: &Utf8Path, key: u64) -> Vec<u8> {
    let wad = crate::wad::Wad::read(path).unwrap();
    let entry = wad.entries()[&key];
    let bytes = std::fs::read(path).unwrap();
    let start = entry.offset as usize;
    bytes[start..start + entry.compressed_size as usize].to_vec()
}

/// Write a minimal shell link whose LinkInfo names `target` as its local base path.
pub fn write_shortcut(path: &Utf8Path, target: &str) {
    let mut bytes = vec![0u8; 76];
    bytes[0] = 0x4C;
    bytes[20..24].copy_from_slice(&0x02u32.to_le_bytes());

    let header_size = 28u32;
    let total = header_size + target.len() as u32 + 1;
    for field in [total, header_size, 0, 0, header_size, 0, 0] {
        bytes.extend_from_slice(&field.to_le_bytes());
    }
    bytes.extend_from_slice(target.as_bytes());
    bytes.push(0);
    write_file(path, &bytes);
}
