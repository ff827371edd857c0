use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("filename pattern is valid"));

const MAX_FILENAME_CHARS: usize = 100;

/// File-safe name derived from a thread title
pub fn generate_filename(title: &str) -> String {
    let cleaned = NON_WORD.replace_all(title, "").replace(' ', "_");
    cleaned.chars().take(MAX_FILENAME_CHARS).collect()
}

/// Write `report` to `{dir}/{filename}_{YYYYMMDDHHMMSS}.txt`, creating `dir`
pub fn save_output(dir: impl AsRef<Path>, title: &str, report: &str) -> io::Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let path = dir.join(format!("{}_{}.txt", generate_filename(title), timestamp));
    std::fs::write(&path, report)?;

    info!(path = %path.display(), "Saved summary");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_filename() {
        assert_eq!(generate_filename("Hello, World!!"), "Hello_World");
        assert_eq!(generate_filename("a_b c-d"), "a_b_cd");
        assert_eq!(generate_filename(&"x".repeat(150)).len(), 100);
    }

    #[test]
    fn test_save_output_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("outputs");

        let path = save_output(&dir, "My Thread?", "report body").unwrap();

        assert!(path.starts_with(&dir));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("My_Thread_"));
        assert!(name.ends_with(".txt"));
        assert_eq!(name.len(), "My_Thread_".len() + 14 + ".txt".len());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "report body");
    }
}
