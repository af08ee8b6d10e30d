use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use crate::error::{LispError, LispResult};

/// The named storage device behind `:SAVE` and `:LOAD`.
pub trait Storage {
    /// Read the stored text, one entry per line.
    fn read_lines(&mut self) -> LispResult<Vec<String>>;

    /// Replace the stored text.
    fn write(&mut self, text: &str) -> LispResult<()>;
}

/// Storage backed by a single file on disk.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStorage { path: path.into() }
    }

    fn unavailable(&self, e: std::io::Error) -> LispError {
        LispError::StorageUnavailable(format!("{}: {}", self.path.display(), e))
    }
}

impl Storage for FileStorage {
    fn read_lines(&mut self) -> LispResult<Vec<String>> {
        let text = fs::read_to_string(&self.path).map_err(|e| self.unavailable(e))?;
        Ok(text.lines().map(str::to_string).collect())
    }

    fn write(&mut self, text: &str) -> LispResult<()> {
        fs::write(&self.path, text).map_err(|e| self.unavailable(e))
    }
}

/// In-memory storage. Clones share the same buffer, so a caller can keep a
/// handle and inspect what the interpreter wrote.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    contents: Rc<RefCell<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(text: &str) -> Self {
        MemoryStorage {
            contents: Rc::new(RefCell::new(Some(text.to_string()))),
        }
    }

    /// The last text written, if any.
    pub fn contents(&self) -> Option<String> {
        self.contents.borrow().clone()
    }
}

impl Storage for MemoryStorage {
    fn read_lines(&mut self) -> LispResult<Vec<String>> {
        match self.contents.borrow().as_deref() {
            Some(text) => Ok(text.lines().map(str::to_string).collect()),
            None => Err(LispError::StorageUnavailable("nothing saved".into())),
        }
    }

    fn write(&mut self, text: &str) -> LispResult<()> {
        *self.contents.borrow_mut() = Some(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_shares_buffer() {
        let handle = MemoryStorage::new();
        let mut storage = handle.clone();
        assert!(matches!(
            storage.read_lines(),
            Err(LispError::StorageUnavailable(_))
        ));

        storage.write("(SETQ X '1)\n(SETQ Y '2)\n").unwrap();
        assert_eq!(handle.contents().unwrap(), "(SETQ X '1)\n(SETQ Y '2)\n");
        assert_eq!(
            storage.read_lines().unwrap(),
            vec!["(SETQ X '1)".to_string(), "(SETQ Y '2)".to_string()]
        );
    }

    #[test]
    fn test_file_storage_round_trip() {
        let path = std::env::temp_dir().join(format!("cellisp-storage-{}.lisp", std::process::id()));
        let mut storage = FileStorage::new(&path);
        storage.write("(DEFUN F () 1)\n").unwrap();
        assert_eq!(storage.read_lines().unwrap(), vec!["(DEFUN F () 1)".to_string()]);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let mut storage = FileStorage::new("/nonexistent/cellisp/workspace.lisp");
        match storage.read_lines() {
            Err(LispError::StorageUnavailable(msg)) => assert!(msg.contains("workspace.lisp")),
            other => panic!("expected StorageUnavailable, got {:?}", other),
        }
    }
}
