use std::io;
use std::path::PathBuf;

pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> io::Result<()>;
    fn read(&self, ident: &str) -> io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
    fn delete(&self, ident: &str) -> io::Result<()>;
}

/// Local filesystem backend rooted at a base directory.
#[derive(Clone)]
pub struct BackendLocal {
    pub base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(storage_dir: &str) -> io::Result<Self> {
        let path = PathBuf::from(storage_dir);
        std::fs::create_dir_all(&path)?;
        Ok(BackendLocal { base_dir: path })
    }

    fn resolve(&self, ident: &str) -> PathBuf {
        self.base_dir.join(ident)
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        self.resolve(ident).is_file()
    }

    fn read(&self, ident: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(ident))
    }

    // Atomic write: temp file in the same directory, then rename over
    // the destination.
    fn write(&self, ident: &str, data: &[u8]) -> io::Result<()> {
        let path = self.resolve(ident);
        let temp_path = self.resolve(&format!("{ident}.tmp"));

        if let Err(err) = std::fs::write(&temp_path, data) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(err);
        }

        std::fs::rename(&temp_path, &path)
    }

    fn delete(&self, ident: &str) -> io::Result<()> {
        std::fs::remove_file(self.resolve(ident))
    }
}
