//! Artifact persistence: JSON files written atomically via tmp→rename

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One flat record as returned by the API
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Persistence sink for fetched artifacts.
///
/// Each unit writes a distinct name, so implementations only need to be
/// race-free per name.
pub trait ArtifactStore: Send + Sync {
    /// Whether a complete artifact with this name already exists
    fn exists(&self, name: &str) -> bool;

    /// Persist `records` under `name`, returning the final location
    fn write(&self, name: &str, records: &[Record]) -> io::Result<PathBuf>;
}

/// Stores each artifact as a pretty-printed JSON file in one directory.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Use `dir` as the artifact directory, creating it if needed
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl ArtifactStore for JsonDirStore {
    fn exists(&self, name: &str) -> bool {
        self.path_of(name).is_file()
    }

    fn write(&self, name: &str, records: &[Record]) -> io::Result<PathBuf> {
        let final_path = self.path_of(name);
        let tmp_path = self.dir.join(format!("{name}.tmp"));

        let result = (|| -> io::Result<()> {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.write_all(b"\n")?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
            fs::rename(&tmp_path, &final_path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        Ok(final_path)
    }
}

/// Remove stale .tmp files left behind by an interrupted run
pub fn cleanup_tmp_files(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "tmp") {
            log::warn!("Removing stale tmp file: {}", path.display());
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn records() -> Vec<Record> {
        let value = json!([
            {"year": 2001, "countryCode": 21, "countryName": "Brazil", "carbon": 0.61},
            {"year": 2001, "countryCode": 231, "countryName": "United States", "carbon": 5.4}
        ]);
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn write_then_exists() {
        let dir = TempDir::new().unwrap();
        let store = JsonDirStore::new(dir.path()).unwrap();
        assert!(!store.exists("data_all_2001.json"));

        let path = store.write("data_all_2001.json", &records()).unwrap();
        assert_eq!(path, dir.path().join("data_all_2001.json"));
        assert!(store.exists("data_all_2001.json"));
        assert!(!dir.path().join("data_all_2001.json.tmp").exists());
    }

    #[test]
    fn written_file_is_pretty_json_array() {
        let dir = TempDir::new().unwrap();
        let store = JsonDirStore::new(dir.path()).unwrap();
        let path = store.write("data_all_2001.json", &records()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  {"), "expected indented output");
        let back: Vec<Record> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, records());
    }

    #[test]
    fn overwrite_replaces_content() {
        let dir = TempDir::new().unwrap();
        let store = JsonDirStore::new(dir.path()).unwrap();
        store.write("a.json", &records()).unwrap();
        store.write("a.json", &[]).unwrap();
        let back: Vec<Record> =
            serde_json::from_str(&fs::read_to_string(dir.path().join("a.json")).unwrap()).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn new_creates_missing_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("local_storage").join("raw");
        let store = JsonDirStore::new(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.dir(), nested.as_path());
    }

    #[test]
    fn tmp_file_is_not_an_artifact() {
        let dir = TempDir::new().unwrap();
        let store = JsonDirStore::new(dir.path()).unwrap();
        fs::write(dir.path().join("data_all_2002.json.tmp"), b"[{\"year\":").unwrap();
        assert!(!store.exists("data_all_2002.json"));
    }

    #[test]
    fn cleanup_tmp_files_removes_only_tmp() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("data_all_2000.json.tmp"), b"stale").unwrap();
        fs::write(dir.path().join("data_all_2001.json"), b"[]").unwrap();
        fs::write(dir.path().join("c.tmp"), b"stale2").unwrap();

        assert_eq!(cleanup_tmp_files(dir.path()).unwrap(), 2);

        assert!(!dir.path().join("data_all_2000.json.tmp").exists());
        assert!(dir.path().join("data_all_2001.json").exists());
        assert!(!dir.path().join("c.tmp").exists());
    }
}
