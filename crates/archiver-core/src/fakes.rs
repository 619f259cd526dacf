//! In-memory fakes for the archiver's collaborators (testing only)
//!
//! `MemoryFilesystem` keeps a set of existing paths and records every call;
//! `StaticConfigParser` returns a canned override set.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{ArchiveError, Result};
use crate::fs::Filesystem;
use crate::overrides::{ConfigParser, OverrideSet};

// ---------------------------------------------------------------------------
// MemoryFilesystem
// ---------------------------------------------------------------------------

/// A call made against [`MemoryFilesystem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsOp {
    Exists(PathBuf),
    CreateDirAll(PathBuf),
    Move { src: PathBuf, dst: PathBuf },
}

#[derive(Debug, Default)]
struct FsState {
    paths: BTreeSet<PathBuf>,
    ops: Vec<FsOp>,
    failing_moves: BTreeSet<PathBuf>,
}

/// Filesystem where only the paths it was told about exist.
#[derive(Debug, Default)]
pub struct MemoryFilesystem {
    state: Mutex<FsState>,
}

impl MemoryFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` and its ancestors as existing.
    pub fn with_dir(self, path: impl AsRef<Path>) -> Self {
        self.add_dir(path.as_ref());
        self
    }

    /// Make moves from `src` fail with a permission error.
    pub fn failing_move(self, src: impl Into<PathBuf>) -> Self {
        self.state.lock().unwrap().failing_moves.insert(src.into());
        self
    }

    pub fn add_dir(&self, path: &Path) {
        let mut state = self.state.lock().unwrap();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            state.paths.insert(ancestor.to_path_buf());
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.state.lock().unwrap().paths.contains(path)
    }

    /// Every call, in order.
    pub fn ops(&self) -> Vec<FsOp> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn moves(&self) -> Vec<(PathBuf, PathBuf)> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                FsOp::Move { src, dst } => Some((src, dst)),
                _ => None,
            })
            .collect()
    }

    pub fn created(&self) -> Vec<PathBuf> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                FsOp::CreateDirAll(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    /// Paths passed to `exists`, in order.
    pub fn checked(&self) -> Vec<PathBuf> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                FsOp::Exists(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn clear_ops(&self) {
        self.state.lock().unwrap().ops.clear();
    }
}

impl Filesystem for MemoryFilesystem {
    fn exists(&self, path: &Path) -> bool {
        let mut state = self.state.lock().unwrap();
        state.ops.push(FsOp::Exists(path.to_path_buf()));
        state.paths.contains(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.state
            .lock()
            .unwrap()
            .ops
            .push(FsOp::CreateDirAll(path.to_path_buf()));
        self.add_dir(path);
        Ok(())
    }

    fn move_forced(&self, src: &Path, dst: &Path) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(FsOp::Move {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        });

        if state.failing_moves.contains(src) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "move refused"));
        }
        if !state.paths.contains(src) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such directory"));
        }

        let target = match (state.paths.contains(dst), src.file_name()) {
            (true, Some(name)) => dst.join(name),
            _ => dst.to_path_buf(),
        };

        let moved: Vec<PathBuf> = state
            .paths
            .iter()
            .filter(|p| p.starts_with(src))
            .cloned()
            .collect();
        state.paths.retain(|p| !p.starts_with(&target));
        for path in moved {
            state.paths.remove(&path);
            let rel = path.strip_prefix(src).unwrap_or(Path::new(""));
            state.paths.insert(target.join(rel));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StaticConfigParser
// ---------------------------------------------------------------------------

/// Config parser returning a fixed override set, or a parse failure.
#[derive(Debug, Default)]
pub struct StaticConfigParser {
    overrides: Option<OverrideSet>,
    parsed: Mutex<Vec<PathBuf>>,
}

impl StaticConfigParser {
    pub fn returning(overrides: OverrideSet) -> Self {
        Self {
            overrides: Some(overrides),
            parsed: Mutex::default(),
        }
    }

    /// A parser that reports every file as malformed.
    pub fn malformed() -> Self {
        Self {
            overrides: None,
            parsed: Mutex::default(),
        }
    }

    /// Paths passed to `parse`, in order.
    pub fn parsed(&self) -> Vec<PathBuf> {
        self.parsed.lock().unwrap().clone()
    }
}

impl ConfigParser for StaticConfigParser {
    fn parse(&self, path: &Path) -> Result<OverrideSet> {
        self.parsed.lock().unwrap().push(path.to_path_buf());
        match &self.overrides {
            Some(overrides) => Ok(overrides.clone()),
            None => {
                let source = OverrideSet::from_yaml_str("rcov: [").unwrap_err();
                Err(ArchiveError::ConfigParse {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_dir_marks_ancestors() {
        let fs = MemoryFilesystem::new().with_dir("/a/b/c");
        assert!(fs.contains(Path::new("/a")));
        assert!(fs.contains(Path::new("/a/b/c")));
        assert!(!fs.contains(Path::new("/a/b/d")));
    }

    #[test]
    fn move_into_existing_dir_relocates_subtree() {
        let fs = MemoryFilesystem::new()
            .with_dir("/w/coverage/html")
            .with_dir("/archive");

        fs.move_forced(Path::new("/w/coverage"), Path::new("/archive")).unwrap();

        assert!(!fs.contains(Path::new("/w/coverage")));
        assert!(!fs.contains(Path::new("/w/coverage/html")));
        assert!(fs.contains(Path::new("/archive/coverage/html")));
        assert_eq!(
            fs.moves(),
            vec![(PathBuf::from("/w/coverage"), PathBuf::from("/archive"))]
        );
    }

    #[test]
    fn failing_move_is_recorded_and_errors() {
        let fs = MemoryFilesystem::new()
            .with_dir("/w/coverage")
            .failing_move("/w/coverage");
        let err = fs
            .move_forced(Path::new("/w/coverage"), Path::new("/archive"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(fs.moves().len(), 1);
    }

    #[test]
    fn static_parser_records_paths() {
        let parser = StaticConfigParser::returning(OverrideSet::new());
        parser.parse(Path::new("/w/config/artifacts.yml")).unwrap();
        assert_eq!(parser.parsed(), vec![PathBuf::from("/w/config/artifacts.yml")]);
    }

    #[test]
    fn malformed_parser_fails() {
        let parser = StaticConfigParser::malformed();
        assert!(matches!(
            parser.parse(Path::new("/w/a.yml")),
            Err(ArchiveError::ConfigParse { .. })
        ));
    }
}
