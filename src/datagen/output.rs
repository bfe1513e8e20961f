//! Where generated files go and how they are written.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

use crate::constants::{ASSETS_DIRECTORY, DATA_DIRECTORY};
use crate::core::Identifier;
use crate::datagen::codec::Tree;
use crate::error::ErrorClass;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OutputType {
    DataPack,
    ResourcePack,
}

impl OutputType {
    fn directory(self) -> &'static str {
        match self {
            OutputType::DataPack => DATA_DIRECTORY,
            OutputType::ResourcePack => ASSETS_DIRECTORY,
        }
    }
}

/// Root of one generation run.
#[derive(Clone, Debug)]
pub struct DataOutput {
    root: PathBuf,
}

impl DataOutput {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolver(&self, output_type: OutputType, directory: &str) -> PathResolver {
        PathResolver {
            base: self.root.join(output_type.directory()),
            directory: directory.to_owned(),
        }
    }
}

/// Maps `ns:path` to `<root>/<data|assets>/<ns>/<directory>/<path>.json`.
#[derive(Clone, Debug)]
pub struct PathResolver {
    base: PathBuf,
    directory: String,
}

impl PathResolver {
    pub fn resolve(&self, id: &Identifier, extension: &str) -> PathBuf {
        self.base
            .join(id.namespace())
            .join(&self.directory)
            .join(format!("{}.{}", id.path(), extension))
    }

    pub fn resolve_json(&self, id: &Identifier) -> PathBuf {
        self.resolve(id, "json")
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("writing {path} failed: {source}")]
    Rejected {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The writer as a whole can no longer accept output.
    #[error("writer unavailable: {0}")]
    Unavailable(String),
    #[error("cannot serialize tree for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl WriteError {
    pub fn class(&self) -> ErrorClass {
        match self {
            WriteError::Rejected { .. } | WriteError::Unavailable(_) => ErrorClass::ResourceUnavailable,
            WriteError::Serialize { .. } => ErrorClass::DataDefect,
        }
    }

    pub fn is_systemic(&self) -> bool {
        matches!(self, WriteError::Unavailable(_))
    }
}

pub trait DataWriter: Send + Sync {
    fn write(&self, path: &Path, tree: &Tree) -> Result<(), WriteError>;
}

/// Writes pretty-printed JSON files. Unchanged files are left untouched and
/// new content lands through a temporary file and a rename.
#[derive(Debug, Default)]
pub struct FsWriter {
    written: AtomicUsize,
    unchanged: AtomicUsize,
}

impl FsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }

    pub fn unchanged(&self) -> usize {
        self.unchanged.load(Ordering::Relaxed)
    }
}

/// Per-write sibling of `path`, so concurrent writes never share a temp file.
fn temp_path(path: &Path) -> PathBuf {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().map(|f| f.to_os_string()).unwrap_or_default();
    name.push(format!(".{}.{n}.tmp", std::process::id()));
    path.with_file_name(name)
}

impl DataWriter for FsWriter {
    fn write(&self, path: &Path, tree: &Tree) -> Result<(), WriteError> {
        let mut bytes = serde_json::to_vec_pretty(tree).map_err(|source| WriteError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        bytes.push(b'\n');

        if fs::read(path).is_ok_and(|existing| existing == bytes) {
            self.unchanged.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        let rejected = |source| WriteError::Rejected {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(rejected)?;
        }
        let tmp = temp_path(path);
        fs::write(&tmp, &bytes).map_err(rejected)?;
        fs::rename(&tmp, path).map_err(rejected)?;
        self.written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Keeps every tree in memory, last write per path wins.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    files: Mutex<FxHashMap<PathBuf, Tree>>,
    writes: AtomicUsize,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Tree> {
        self.files.lock().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }

    /// Total calls to `write`, including overwrites.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl DataWriter for MemoryWriter {
    fn write(&self, path: &Path, tree: &Tree) -> Result<(), WriteError> {
        self.files.lock().insert(path.to_path_buf(), tree.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_pack_paths() {
        let output = DataOutput::new("generated");
        let id: Identifier = "modid:my_ore".parse().unwrap();
        let data = output.resolver(OutputType::DataPack, "worldgen/placed_feature");
        assert_eq!(
            data.resolve_json(&id),
            Path::new("generated/data/modid/worldgen/placed_feature/my_ore.json")
        );
        let assets = output.resolver(OutputType::ResourcePack, "models");
        assert_eq!(assets.resolve(&id, "png"), Path::new("generated/assets/modid/models/my_ore.png"));
    }

    #[test]
    fn fs_writer_skips_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/modid/x/a.json");
        let writer = FsWriter::new();
        let tree = serde_json::json!({ "count": 3 });

        writer.write(&path, &tree).unwrap();
        writer.write(&path, &tree).unwrap();
        assert_eq!(writer.written(), 1);
        assert_eq!(writer.unchanged(), 1);
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(serde_json::from_str::<Tree>(&text).unwrap(), tree);

        writer.write(&path, &serde_json::json!({ "count": 4 })).unwrap();
        assert_eq!(writer.written(), 2);
    }

    #[test]
    fn fs_writer_same_path_from_many_threads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/modid/x/same.json");
        let writer = FsWriter::new();

        std::thread::scope(|scope| {
            for t in 0..8 {
                let (writer, path) = (&writer, &path);
                scope.spawn(move || {
                    for i in 0..25 {
                        writer.write(path, &serde_json::json!({ "t": t, "i": i })).unwrap();
                    }
                });
            }
        });

        let text = fs::read_to_string(&path).unwrap();
        let last: Tree = serde_json::from_str(&text).unwrap();
        assert_eq!(last["i"], serde_json::json!(24));
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn fs_writer_rejects_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file").unwrap();
        let err = FsWriter::new()
            .write(&blocker.join("a.json"), &serde_json::json!(1))
            .unwrap_err();
        assert!(matches!(err, WriteError::Rejected { .. }));
        assert!(!err.is_systemic());
    }
}
