//! Data generation
//! Collects entries per provider, encodes them through codecs, and writes the
//! resulting trees concurrently.

pub mod codec;
pub mod entries;
pub mod export;
pub mod output;
pub mod provider;

// Re-export commonly used types
pub use codec::{Codec, CodecError, JsonCodec, Tree};
pub use entries::{Entries, EntriesError, Entry, FrozenEntries};
pub use export::{EntryFailure, ExportFailure, ExportOptions, ExportReport, export};
pub use output::{DataOutput, DataWriter, FsWriter, MemoryWriter, OutputType, PathResolver, WriteError};
pub use provider::{CodecProvider, DataGenerator, GenerationReport, ProviderError, run_provider};
