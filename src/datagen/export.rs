//! Concurrent encode-and-write of frozen entries.
//!
//! Every path is resolved up front. Each entry then becomes one task that
//! waits for a worker permit, encodes its value and hands the tree to the
//! writer on the blocking pool. All tasks are joined; the export succeeds only
//! if every entry was written. Once the writer reports itself unavailable,
//! tasks that have not started yet are skipped.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::core::Identifier;
use crate::datagen::codec::{Codec, CodecError};
use crate::datagen::entries::{Entry, FrozenEntries};
use crate::datagen::output::{DataWriter, WriteError};
use crate::error::ErrorClass;

#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub worker_count: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ExportReport {
    pub written: usize,
}

#[derive(Debug, Error)]
pub enum EntryFailure {
    #[error("couldn't serialize element {identifier}: {source}")]
    Encode {
        identifier: Identifier,
        #[source]
        source: CodecError,
    },
    #[error("couldn't write {identifier} to {path}: {source}")]
    Write {
        identifier: Identifier,
        path: PathBuf,
        #[source]
        source: WriteError,
    },
    #[error("{identifier} not started, writer unavailable")]
    Skipped { identifier: Identifier },
    #[error("worker for {identifier} panicked")]
    Panicked { identifier: Identifier },
}

impl EntryFailure {
    pub fn identifier(&self) -> &Identifier {
        match self {
            EntryFailure::Encode { identifier, .. }
            | EntryFailure::Write { identifier, .. }
            | EntryFailure::Skipped { identifier }
            | EntryFailure::Panicked { identifier } => identifier,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            EntryFailure::Encode { source, .. } => source.class(),
            EntryFailure::Write { source, .. } => source.class(),
            EntryFailure::Skipped { .. } => ErrorClass::ResourceUnavailable,
            EntryFailure::Panicked { .. } => ErrorClass::DataDefect,
        }
    }
}

/// Every failed entry of one export, in entry order.
#[derive(Debug, Error)]
#[error("export failed for {} of {total} entries", failures.len())]
pub struct ExportFailure {
    pub total: usize,
    pub written: usize,
    pub failures: Vec<EntryFailure>,
    /// The writer became unavailable mid-run.
    pub halted: bool,
}

impl ExportFailure {
    pub fn failed_identifiers(&self) -> Vec<&Identifier> {
        self.failures.iter().map(EntryFailure::identifier).collect()
    }

    pub fn class(&self) -> ErrorClass {
        if self.halted {
            return ErrorClass::ResourceUnavailable;
        }
        self.failures
            .first()
            .map(EntryFailure::class)
            .unwrap_or(ErrorClass::ResourceUnavailable)
    }
}

pub async fn export<T, C, W, F>(
    entries: FrozenEntries<T>,
    codec: Arc<C>,
    resolve: F,
    writer: Arc<W>,
    options: &ExportOptions,
) -> Result<ExportReport, ExportFailure>
where
    T: Send + Sync + 'static,
    C: Codec<T> + ?Sized + 'static,
    W: DataWriter + ?Sized + 'static,
    F: Fn(&Identifier) -> PathBuf,
{
    let total = entries.len();
    let workers = options.worker_count.max(1);
    tracing::info!("Exporting {} entries with {} workers", total, workers);

    let jobs: Vec<_> = entries
        .iter()
        .map(|entry| (Arc::clone(entry), resolve(&entry.identifier)))
        .collect();

    let permits = Arc::new(Semaphore::new(workers));
    let halted = Arc::new(AtomicBool::new(false));
    let handles: Vec<_> = jobs
        .into_iter()
        .map(|(entry, path)| {
            let identifier = entry.identifier.clone();
            let handle = tokio::spawn(export_entry(
                entry,
                path,
                Arc::clone(&codec),
                Arc::clone(&writer),
                Arc::clone(&permits),
                Arc::clone(&halted),
            ));
            (identifier, handle)
        })
        .collect();

    let mut written = 0;
    let mut failures = Vec::new();
    for (identifier, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(_) => Err(EntryFailure::Panicked { identifier }),
        };
        match outcome {
            Ok(()) => written += 1,
            Err(failure) => {
                tracing::warn!("{}", failure);
                failures.push(failure);
            }
        }
    }

    if failures.is_empty() {
        tracing::debug!("Exported {} entries", written);
        Ok(ExportReport { written })
    } else {
        Err(ExportFailure {
            total,
            written,
            failures,
            halted: halted.load(Ordering::Acquire),
        })
    }
}

async fn export_entry<T, C, W>(
    entry: Arc<Entry<T>>,
    path: PathBuf,
    codec: Arc<C>,
    writer: Arc<W>,
    permits: Arc<Semaphore>,
    halted: Arc<AtomicBool>,
) -> Result<(), EntryFailure>
where
    T: Send + Sync + 'static,
    C: Codec<T> + ?Sized + 'static,
    W: DataWriter + ?Sized + 'static,
{
    let identifier = entry.identifier.clone();
    let Ok(_permit) = permits.acquire_owned().await else {
        return Err(EntryFailure::Skipped { identifier });
    };
    if halted.load(Ordering::Acquire) {
        return Err(EntryFailure::Skipped { identifier });
    }

    let work = tokio::task::spawn_blocking(move || {
        let tree = codec.encode(&entry.value).map_err(|source| EntryFailure::Encode {
            identifier: entry.identifier.clone(),
            source,
        })?;
        writer.write(&path, &tree).map_err(|source| EntryFailure::Write {
            identifier: entry.identifier.clone(),
            path,
            source,
        })
    });

    let result = match work.await {
        Ok(result) => result,
        Err(_) => Err(EntryFailure::Panicked { identifier }),
    };
    if let Err(EntryFailure::Write { source, .. }) = &result {
        if source.is_systemic() && !halted.swap(true, Ordering::AcqRel) {
            tracing::error!("Writer unavailable, not starting remaining entries: {}", source);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datagen::codec::{JsonCodec, Tree};
    use crate::datagen::entries::Entries;
    use crate::datagen::output::{FsWriter, MemoryWriter};
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;

    fn id(s: &str) -> Identifier {
        s.parse().unwrap()
    }

    fn path_of(id: &Identifier) -> PathBuf {
        PathBuf::from(format!("out/{}/{}.json", id.namespace(), id.path()))
    }

    fn options(workers: usize) -> ExportOptions {
        ExportOptions { worker_count: workers }
    }

    /// Refuses values equal to its poison.
    struct PickyCodec(u32);

    impl Codec<u32> for PickyCodec {
        fn encode(&self, value: &u32) -> Result<Tree, CodecError> {
            if *value == self.0 {
                Err(CodecError::Encode(format!("{value} is not allowed")))
            } else {
                Ok(serde_json::json!(value))
            }
        }

        fn decode(&self, tree: &Tree) -> Result<u32, CodecError> {
            JsonCodec::<u32>::new().decode(tree)
        }
    }

    /// Every write fails as if the disk went away.
    #[derive(Default)]
    struct GoneWriter {
        attempts: AtomicUsize,
    }

    impl DataWriter for GoneWriter {
        fn write(&self, _path: &Path, _tree: &Tree) -> Result<(), WriteError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(WriteError::Unavailable("disk detached".into()))
        }
    }

    fn three_entries() -> FrozenEntries<u32> {
        let mut entries = Entries::new();
        entries.add(id("modid:first"), 1).unwrap();
        entries.add(id("modid:second"), 2).unwrap();
        entries.add(id("modid:third"), 3).unwrap();
        entries.freeze()
    }

    #[tokio::test]
    async fn writes_every_entry() {
        let writer = Arc::new(MemoryWriter::new());
        let report = export(
            three_entries(),
            Arc::new(JsonCodec::<u32>::new()),
            path_of,
            Arc::clone(&writer),
            &options(2),
        )
        .await
        .unwrap();
        assert_eq!(report.written, 3);
        assert_eq!(writer.get(Path::new("out/modid/third.json")), Some(serde_json::json!(3)));
    }

    #[tokio::test]
    async fn one_encode_failure_fails_the_export_but_not_the_others() {
        let writer = Arc::new(MemoryWriter::new());
        let failure = export(three_entries(), Arc::new(PickyCodec(2)), path_of, Arc::clone(&writer), &options(4))
            .await
            .unwrap_err();

        assert_eq!(failure.failed_identifiers(), [&id("modid:second")]);
        assert!(matches!(failure.failures[0], EntryFailure::Encode { .. }));
        assert_eq!(failure.class(), ErrorClass::DataDefect);
        assert_eq!(failure.written, 2);
        assert!(writer.get(Path::new("out/modid/first.json")).is_some());
        assert!(writer.get(Path::new("out/modid/third.json")).is_some());
        assert!(writer.get(Path::new("out/modid/second.json")).is_none());
    }

    #[tokio::test]
    async fn duplicates_are_both_written() {
        let mut entries = Entries::new();
        entries.add(id("modid:same"), 1u32).unwrap();
        entries.add(id("modid:same"), 2u32).unwrap();
        let writer = Arc::new(MemoryWriter::new());
        let report = export(
            entries.freeze(),
            Arc::new(JsonCodec::<u32>::new()),
            path_of,
            Arc::clone(&writer),
            &options(1),
        )
        .await
        .unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(writer.write_count(), 2);
        assert_eq!(writer.len(), 1);
    }

    #[tokio::test]
    async fn unavailable_writer_stops_new_work() {
        let writer = Arc::new(GoneWriter::default());
        let failure = export(
            three_entries(),
            Arc::new(JsonCodec::<u32>::new()),
            path_of,
            Arc::clone(&writer),
            &options(1),
        )
        .await
        .unwrap_err();

        assert!(failure.halted);
        assert_eq!(failure.class(), ErrorClass::ResourceUnavailable);
        assert_eq!(failure.failures.len(), 3);
        assert_eq!(writer.attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(failure.failures[0], EntryFailure::Write { .. }));
        assert!(matches!(failure.failures[2], EntryFailure::Skipped { .. }));
    }

    #[tokio::test]
    async fn writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let writer = Arc::new(FsWriter::new());
        export(
            three_entries(),
            Arc::new(JsonCodec::<u32>::new()),
            move |id: &Identifier| root.join(id.namespace()).join(format!("{}.json", id.path())),
            Arc::clone(&writer),
            &options(2),
        )
        .await
        .unwrap();
        assert_eq!(writer.written(), 3);
        let text = std::fs::read_to_string(dir.path().join("modid/second.json")).unwrap();
        assert_eq!(text.trim(), "2");
    }
}
