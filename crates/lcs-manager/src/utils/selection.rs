//! Persisted disabled-mod selection.
//!
//! The file holds one mod directory name per line. Blank lines are ignored and
//! surrounding whitespace is trimmed.

use camino::Utf8Path;
use std::collections::BTreeSet;
use std::fs;
use std::io;

/// Load the disabled mod names. A missing file means nothing is disabled.
pub fn load_disabled(path: &Utf8Path) -> io::Result<BTreeSet<String>> {
    let content = match fs::read_to_string(path.as_std_path()) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(e) => return Err(e),
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn save_disabled(path: &Utf8Path, disabled: &BTreeSet<String>) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent.as_std_path())?;
    }
    let mut content = String::new();
    for name in disabled {
        content.push_str(name);
        content.push('\n');
    }
    fs::write(path.as_std_path(), content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn temp_list(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("disabled.txt")).unwrap()
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_disabled(&temp_list(&dir)).unwrap().is_empty());
    }

    #[test]
    fn test_blank_lines_and_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_list(&dir);
        fs::write(path.as_std_path(), "  Ahri Skin \n\n\r\nmap-pack\r\n").unwrap();

        let disabled = load_disabled(&path).unwrap();
        assert_eq!(
            disabled.into_iter().collect::<Vec<_>>(),
            vec!["Ahri Skin", "map-pack"]
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_list(&dir);
        let disabled: BTreeSet<String> = ["b".to_string(), "a".to_string()].into();

        save_disabled(&path, &disabled).unwrap();
        assert_eq!(fs::read_to_string(path.as_std_path()).unwrap(), "a\nb\n");
        assert_eq!(load_disabled(&path).unwrap(), disabled);
    }
}
