//! Merged WAD writing.
//!
//! An overlay archive is the base archive's TOC merged with a set of
//! replacement files. The base data section is copied forward verbatim and the
//! replacement payloads are appended after it, so bytes of replaced entries stay
//! in the file but are no longer referenced by the TOC.
//!
//! Both kinds of TOC row implement [`TocEntry`]: a base [`WadEntry`] is moved by
//! the TOC growth, a [`ModFileEntry`] gets a fresh offset in the appended region.

use crate::error::{Error, Result};
use crate::mod_index::ModFileEntry;
use crate::wad::{Wad, WadEntry, WadHeader, ENTRY_SIZE, HEADER_SIZE, WAD_MAGIC, WAD_MAJOR, WAD_MINOR};
use binrw::BinWrite;
use camino::Utf8Path;
use std::collections::BTreeMap;
use std::io::{BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

/// A row of a merged table of contents.
pub trait TocEntry {
    fn key(&self) -> u64;

    /// Serialize the TOC record.
    ///
    /// `offset_delta` is how far the data section moved; `append_offset` is the
    /// next free position after the copied-forward data.
    fn toc_record(&self, offset_delta: i64, append_offset: u64) -> Result<WadEntry>;

    /// Bytes this entry adds after the copied-forward data section.
    fn appended_len(&self) -> u64;

    /// Write the appended payload, returning the byte count written.
    fn write_data(&self, out: &mut dyn Write) -> Result<u64>;
}

impl TocEntry for WadEntry {
    fn key(&self) -> u64 {
        self.key
    }

    fn toc_record(&self, offset_delta: i64, _append_offset: u64) -> Result<WadEntry> {
        let shifted = i64::from(self.offset) + offset_delta;
        Ok(WadEntry {
            offset: to_toc_field(self.key, shifted)?,
            ..*self
        })
    }

    fn appended_len(&self) -> u64 {
        0
    }

    fn write_data(&self, _out: &mut dyn Write) -> Result<u64> {
        Ok(0)
    }
}

impl TocEntry for ModFileEntry {
    fn key(&self) -> u64 {
        self.key
    }

    fn toc_record(&self, _offset_delta: i64, append_offset: u64) -> Result<WadEntry> {
        let size = to_toc_field(self.key, self.size as i64)?;
        Ok(WadEntry {
            key: self.key,
            offset: to_toc_field(self.key, append_offset as i64)?,
            compressed_size: size,
            uncompressed_size: size,
            kind: 0,
            is_duplicate: false,
            content_hash: self.content_hash,
        })
    }

    fn appended_len(&self) -> u64 {
        self.size
    }

    fn write_data(&self, out: &mut dyn Write) -> Result<u64> {
        let file = std::fs::File::open(self.path.as_std_path())?;
        // Read one byte past the indexed size so growth is detected too.
        let copied = std::io::copy(&mut file.take(self.size + 1), out)?;
        if copied != self.size {
            return Err(Error::SizeMismatch {
                path: self.path.clone(),
                expected: self.size,
                actual: copied,
            });
        }
        Ok(copied)
    }
}

fn to_toc_field(key: u64, value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::OffsetOverflow { key, value })
}

/// Statistics from writing one merged archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedWadStats {
    /// Entries in the written TOC.
    pub entries_written: usize,
    /// Base entries replaced by a mod file.
    pub replaced: usize,
    /// Keys that did not exist in the base archive.
    pub added: usize,
    /// Bytes appended after the copied-forward data section.
    pub bytes_appended: u64,
}

/// Write `original` merged with `replacements` to `output`.
///
/// Replacements win on key collision. The archive is assembled in a temporary
/// file next to `output` and renamed over it once complete, so a failed write
/// never leaves a truncated archive at `output`. Parent directories are created
/// as needed.
pub fn write_merged_wad(
    output: &Utf8Path,
    original: &Wad,
    replacements: &BTreeMap<u64, ModFileEntry>,
) -> Result<MergedWadStats> {
    let mut merged: BTreeMap<u64, &dyn TocEntry> = BTreeMap::new();
    for entry in original.entries().values() {
        merged.insert(entry.key, entry);
    }
    let mut replaced = 0usize;
    for entry in replacements.values() {
        if merged.insert(entry.key, entry).is_some() {
            replaced += 1;
        }
    }
    let ordered: Vec<&dyn TocEntry> = merged.into_values().collect();

    for pair in ordered.windows(2) {
        if pair[0].key() >= pair[1].key() {
            return Err(Error::Invariant {
                path: output.to_path_buf(),
                key: pair[1].key(),
            });
        }
    }

    let entry_count = u32::try_from(ordered.len())
        .map_err(|_| Error::Other(format!("Too many entries for '{}'", output)))?;
    let data_offset = HEADER_SIZE + ENTRY_SIZE * u64::from(entry_count);
    let offset_delta = data_offset as i64 - original.data_offset() as i64;

    let mut toc = Cursor::new(Vec::with_capacity(data_offset as usize));
    WadHeader {
        magic: WAD_MAGIC,
        major: WAD_MAJOR,
        minor: WAD_MINOR,
        signature: *original.signature(),
        checksum: original.checksum(),
        entry_count,
    }
    .write(&mut toc)?;

    let mut append_offset = data_offset + original.data_size();
    for entry in &ordered {
        entry.toc_record(offset_delta, append_offset)?.write(&mut toc)?;
        append_offset += entry.appended_len();
    }

    let parent = output
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    std::fs::create_dir_all(parent.as_std_path())?;

    let mut tmp = NamedTempFile::new_in(parent.as_std_path())?;
    let mut bytes_appended = 0u64;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        writer.write_all(toc.get_ref())?;

        let mut source = std::fs::File::open(original.path().as_std_path())?;
        source.seek(SeekFrom::Start(original.data_offset()))?;
        let copied = std::io::copy(&mut source.take(original.data_size()), &mut writer)?;
        if copied != original.data_size() {
            return Err(Error::TruncatedSource {
                path: original.path().to_path_buf(),
                expected: original.data_size(),
                actual: copied,
            });
        }

        for entry in &ordered {
            bytes_appended += entry.write_data(&mut writer)?;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(output.as_std_path())?;

    let stats = MergedWadStats {
        entries_written: ordered.len(),
        replaced,
        added: replacements.len() - replaced,
        bytes_appended,
    };
    tracing::debug!(
        "Wrote '{}': {} entries ({} replaced, {} added, {} bytes appended)",
        output,
        stats.entries_written,
        stats.replaced,
        stats.added,
        stats.bytes_appended
    );
    Ok(stats)
}
