//! Windows shell link (`.lnk`) target resolution.
//!
//! Only the parts of the format needed to recover a local target path are read:
//!
//! ```text
//! ShellLinkHeader   76 bytes, LinkFlags u32 at offset 20
//! LinkTargetIDList  optional (HasLinkTargetIDList), u16 size + payload
//! LinkInfo          u32 size, u32 header size, u32 flags, u32 volume id offset,
//!                   u32 local base path offset, u32 network offset,
//!                   u32 common path suffix offset,
//!                   [u32 unicode local base path offset]   (header size > 28)
//!                   [u32 unicode common path suffix offset] (header size > 32)
//! ```
//!
//! All LinkInfo offsets are relative to the start of the LinkInfo block.
//! Unicode strings take precedence over their ANSI counterparts.

use byteorder::{LittleEndian, ReadBytesExt};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::{Cursor, Seek, SeekFrom};
use thiserror::Error;

const HEADER_SIZE: u64 = 76;
const LINK_FLAGS_OFFSET: u64 = 20;
const LINK_INFO_HEADER_SIZE: i32 = 28;

const HAS_LINK_TARGET_ID_LIST: u32 = 0x01;
const HAS_LINK_INFO: u32 = 0x02;
const FORCE_NO_LINK_INFO: u32 = 0x100;

/// Why a shortcut or game directory could not be resolved.
#[derive(Error, Debug)]
pub enum ResolutionFailure {
    #[error("IO error: {0}")]
    Io(std::io::Error),

    /// The file ends before a structure it declares.
    #[error("Shortcut is truncated")]
    Truncated,

    /// The link carries no usable LinkInfo block.
    #[error("Shortcut has no link info (flags {0:#x})")]
    NoLinkInfo(u32),

    #[error("Shortcut has an invalid string offset {0}")]
    InvalidOffset(i32),

    #[error("Shortcut target is not valid text")]
    InvalidString,

    /// LinkInfo is present but names neither a local path nor a common suffix.
    #[error("Shortcut has an empty target")]
    EmptyTarget,

    /// No `League of Legends.exe` was found at or below the candidate.
    #[error("Not a game directory: {0}")]
    NotAGameDirectory(Utf8PathBuf),
}

impl From<std::io::Error> for ResolutionFailure {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ResolutionFailure::Truncated
        } else {
            ResolutionFailure::Io(e)
        }
    }
}

/// Resolve the target path of the shortcut at `path`.
pub fn resolve_shortcut(path: &Utf8Path) -> Result<String, ResolutionFailure> {
    let bytes = std::fs::read(path.as_std_path())?;
    let target = parse_shortcut(&bytes)?;
    tracing::debug!("Resolved shortcut '{}' -> '{}'", path, target);
    Ok(target)
}

/// Resolve a shortcut already read into memory.
pub fn parse_shortcut(bytes: &[u8]) -> Result<String, ResolutionFailure> {
    if (bytes.len() as u64) < HEADER_SIZE {
        return Err(ResolutionFailure::Truncated);
    }
    let mut reader = Cursor::new(bytes);

    reader.seek(SeekFrom::Start(LINK_FLAGS_OFFSET))?;
    let flags = reader.read_u32::<LittleEndian>()?;
    if flags & HAS_LINK_INFO == 0 || flags & FORCE_NO_LINK_INFO != 0 {
        return Err(ResolutionFailure::NoLinkInfo(flags));
    }

    reader.seek(SeekFrom::Start(HEADER_SIZE))?;
    if flags & HAS_LINK_TARGET_ID_LIST != 0 {
        let id_list_size = reader.read_u16::<LittleEndian>()?;
        reader.seek(SeekFrom::Current(i64::from(id_list_size)))?;
    }

    let info_start = reader.position();
    let _info_size = reader.read_u32::<LittleEndian>()?;
    let header_size = reader.read_i32::<LittleEndian>()?;
    reader.seek(SeekFrom::Current(8))?;
    let local_offset = reader.read_i32::<LittleEndian>()?;
    reader.seek(SeekFrom::Current(4))?;
    let common_offset = reader.read_i32::<LittleEndian>()?;
    let unicode_local_offset = if header_size > LINK_INFO_HEADER_SIZE {
        reader.read_i32::<LittleEndian>()?
    } else {
        0
    };
    let unicode_common_offset = if header_size > LINK_INFO_HEADER_SIZE + 4 {
        reader.read_i32::<LittleEndian>()?
    } else {
        0
    };

    let local = if unicode_local_offset != 0 {
        read_utf16_string(bytes, info_start, unicode_local_offset)?
    } else if local_offset != 0 {
        read_ansi_string(bytes, info_start, local_offset)?
    } else {
        String::new()
    };
    let common = if unicode_common_offset != 0 {
        read_utf16_string(bytes, info_start, unicode_common_offset)?
    } else if common_offset != 0 {
        read_ansi_string(bytes, info_start, common_offset)?
    } else {
        String::new()
    };

    let target = common + &local;
    if target.is_empty() {
        return Err(ResolutionFailure::EmptyTarget);
    }
    Ok(target)
}

fn string_start(bytes: &[u8], info_start: u64, offset: i32) -> Result<usize, ResolutionFailure> {
    let relative = u64::try_from(offset).map_err(|_| ResolutionFailure::InvalidOffset(offset))?;
    let start = usize::try_from(info_start + relative)
        .map_err(|_| ResolutionFailure::InvalidOffset(offset))?;
    if start >= bytes.len() {
        return Err(ResolutionFailure::InvalidOffset(offset));
    }
    Ok(start)
}

fn read_ansi_string(bytes: &[u8], info_start: u64, offset: i32) -> Result<String, ResolutionFailure> {
    let start = string_start(bytes, info_start, offset)?;
    let tail = &bytes[start..];
    let end = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(ResolutionFailure::Truncated)?;
    String::from_utf8(tail[..end].to_vec()).map_err(|_| ResolutionFailure::InvalidString)
}

fn read_utf16_string(bytes: &[u8], info_start: u64, offset: i32) -> Result<String, ResolutionFailure> {
    let start = string_start(bytes, info_start, offset)?;
    let mut reader = Cursor::new(&bytes[start..]);
    let mut units = Vec::new();
    loop {
        let unit = reader.read_u16::<LittleEndian>()?;
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
    String::from_utf16(&units).map_err(|_| ResolutionFailure::InvalidString)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{utf8_tempdir, write_file};

    struct LinkSpec<'a> {
        flags: u32,
        id_list: &'a [u8],
        local: Option<&'a str>,
        common: Option<&'a str>,
        unicode_local: Option<&'a str>,
        unicode_common: Option<&'a str>,
        header_size: i32,
    }

    impl Default for LinkSpec<'_> {
        fn default() -> Self {
            Self {
                flags: HAS_LINK_INFO,
                id_list: &[],
                local: None,
                common: None,
                unicode_local: None,
                unicode_common: None,
                header_size: 28,
            }
        }
    }

    fn build_link(spec: &LinkSpec) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_SIZE as usize];
        out[0] = 0x4C;
        out[20..24].copy_from_slice(&spec.flags.to_le_bytes());

        if spec.flags & HAS_LINK_TARGET_ID_LIST != 0 {
            out.extend_from_slice(&(spec.id_list.len() as u16).to_le_bytes());
            out.extend_from_slice(spec.id_list);
        }

        let fixed = spec.header_size as usize;
        let mut strings: Vec<u8> = Vec::new();
        let mut place = |bytes: Vec<u8>| -> i32 {
            let offset = (fixed + strings.len()) as i32;
            strings.extend_from_slice(&bytes);
            offset
        };
        let ansi = |s: &str| {
            let mut b = s.as_bytes().to_vec();
            b.push(0);
            b
        };
        let wide = |s: &str| {
            let mut b: Vec<u8> = s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
            b.extend_from_slice(&[0, 0]);
            b
        };

        let local = spec.local.map(|s| place(ansi(s))).unwrap_or(0);
        let common = spec.common.map(|s| place(ansi(s))).unwrap_or(0);
        let unicode_local = spec.unicode_local.map(|s| place(wide(s))).unwrap_or(0);
        let unicode_common = spec.unicode_common.map(|s| place(wide(s))).unwrap_or(0);

        let mut info = Vec::new();
        info.extend_from_slice(&((fixed + strings.len()) as u32).to_le_bytes());
        info.extend_from_slice(&spec.header_size.to_le_bytes());
        info.extend_from_slice(&[0u8; 8]);
        info.extend_from_slice(&local.to_le_bytes());
        info.extend_from_slice(&[0u8; 4]);
        info.extend_from_slice(&common.to_le_bytes());
        if spec.header_size > 28 {
            info.extend_from_slice(&unicode_local.to_le_bytes());
        }
        if spec.header_size > 32 {
            info.extend_from_slice(&unicode_common.to_le_bytes());
        }
        out.extend_from_slice(&info);
        out.extend_from_slice(&strings);
        out
    }

    #[test]
    fn test_ansi_local_and_common() {
        let bytes = build_link(&LinkSpec {
            local: Some("C:\\Riot Games\\"),
            common: Some("League of Legends"),
            ..Default::default()
        });
        assert_eq!(parse_shortcut(&bytes).unwrap(), "League of LegendsC:\\Riot Games\\");
    }

    #[test]
    fn test_common_suffix_alone() {
        let bytes = build_link(&LinkSpec {
            common: Some("D:\\Games\\LoL"),
            ..Default::default()
        });
        assert_eq!(parse_shortcut(&bytes).unwrap(), "D:\\Games\\LoL");
    }

    #[test]
    fn test_unicode_takes_precedence() {
        let bytes = build_link(&LinkSpec {
            local: Some("ansi"),
            unicode_local: Some("C:\\Jeux\\Légende"),
            header_size: 36,
            ..Default::default()
        });
        assert_eq!(parse_shortcut(&bytes).unwrap(), "C:\\Jeux\\Légende");
    }

    #[test]
    fn test_skips_target_id_list() {
        let bytes = build_link(&LinkSpec {
            flags: HAS_LINK_INFO | HAS_LINK_TARGET_ID_LIST,
            id_list: &[0xEE; 37],
            local: Some("C:\\Game"),
            ..Default::default()
        });
        assert_eq!(parse_shortcut(&bytes).unwrap(), "C:\\Game");
    }

    #[test]
    fn test_missing_link_info() {
        let bytes = build_link(&LinkSpec {
            flags: 0,
            local: Some("C:\\Game"),
            ..Default::default()
        });
        assert!(matches!(
            parse_shortcut(&bytes),
            Err(ResolutionFailure::NoLinkInfo(0))
        ));

        let bytes = build_link(&LinkSpec {
            flags: HAS_LINK_INFO | FORCE_NO_LINK_INFO,
            local: Some("C:\\Game"),
            ..Default::default()
        });
        assert!(matches!(
            parse_shortcut(&bytes),
            Err(ResolutionFailure::NoLinkInfo(_))
        ));
    }

    #[test]
    fn test_structural_failures() {
        assert!(matches!(
            parse_shortcut(&[0u8; 10]),
            Err(ResolutionFailure::Truncated)
        ));

        let bytes = build_link(&LinkSpec::default());
        assert!(matches!(
            parse_shortcut(&bytes),
            Err(ResolutionFailure::EmptyTarget)
        ));

        let mut bytes = build_link(&LinkSpec {
            local: Some("C:\\Game"),
            ..Default::default()
        });
        // Point the local path offset past the end of the file.
        let local_field = HEADER_SIZE as usize + 16;
        bytes[local_field..local_field + 4].copy_from_slice(&4096i32.to_le_bytes());
        assert!(matches!(
            parse_shortcut(&bytes),
            Err(ResolutionFailure::InvalidOffset(4096))
        ));

        let bytes = build_link(&LinkSpec {
            local: Some("C:\\Game"),
            ..Default::default()
        });
        let unterminated = &bytes[..bytes.len() - 1];
        assert!(matches!(
            parse_shortcut(unterminated),
            Err(ResolutionFailure::Truncated)
        ));
    }

    #[test]
    fn test_resolve_from_disk() {
        let dir = utf8_tempdir();
        let path = dir.path.join("League of Legends.lnk");
        write_file(
            &path,
            &build_link(&LinkSpec {
                local: Some("C:\\Riot Games\\League of Legends\\LeagueClient.exe"),
                ..Default::default()
            }),
        );
        assert_eq!(
            resolve_shortcut(&path).unwrap(),
            "C:\\Riot Games\\League of Legends\\LeagueClient.exe"
        );
        assert!(matches!(
            resolve_shortcut(&dir.path.join("missing.lnk")),
            Err(ResolutionFailure::Io(_))
        ));
    }
}
