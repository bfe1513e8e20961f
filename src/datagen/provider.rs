use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use crate::datagen::codec::Codec;
use crate::datagen::entries::{Entries, EntriesError};
use crate::datagen::export::{ExportFailure, ExportOptions, ExportReport, export};
use crate::datagen::output::{DataOutput, DataWriter, PathResolver};
use crate::error::ErrorClass;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider}: {source}")]
    Entries {
        provider: String,
        #[source]
        source: EntriesError,
    },
    #[error("{provider}: {source}")]
    Export {
        provider: String,
        #[source]
        source: ExportFailure,
    },
}

impl ProviderError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ProviderError::Entries { source, .. } => source.class(),
            ProviderError::Export { source, .. } => source.class(),
        }
    }
}

/// Collects entries of one kind and says where they go.
pub trait CodecProvider: Send + Sync {
    type Value: Send + Sync + 'static;

    fn name(&self) -> &str;

    fn codec(&self) -> Arc<dyn Codec<Self::Value>>;

    fn generate(&self, entries: &mut Entries<Self::Value>) -> Result<(), EntriesError>;

    fn path_resolver(&self, output: &DataOutput) -> PathResolver;
}

type ProviderFuture<'a> = Pin<Box<dyn Future<Output = Result<ExportReport, ProviderError>> + Send + 'a>>;

/// Object-safe view of a [`CodecProvider`].
trait ErasedProvider: Send + Sync {
    fn name(&self) -> &str;

    fn run<'a>(
        &'a self,
        output: &'a DataOutput,
        options: &'a ExportOptions,
        enforce_unique: bool,
        writer: Arc<dyn DataWriter>,
    ) -> ProviderFuture<'a>;
}

impl<P: CodecProvider> ErasedProvider for P {
    fn name(&self) -> &str {
        CodecProvider::name(self)
    }

    fn run<'a>(
        &'a self,
        output: &'a DataOutput,
        options: &'a ExportOptions,
        enforce_unique: bool,
        writer: Arc<dyn DataWriter>,
    ) -> ProviderFuture<'a> {
        Box::pin(run_provider(self, output, options, enforce_unique, writer))
    }
}

/// Generate, freeze, then export one provider's entries.
pub async fn run_provider<P: CodecProvider + ?Sized>(
    provider: &P,
    output: &DataOutput,
    options: &ExportOptions,
    enforce_unique: bool,
    writer: Arc<dyn DataWriter>,
) -> Result<ExportReport, ProviderError> {
    let mut entries = if enforce_unique {
        Entries::enforcing_unique()
    } else {
        Entries::new()
    };
    provider
        .generate(&mut entries)
        .map_err(|source| ProviderError::Entries {
            provider: CodecProvider::name(provider).to_owned(),
            source,
        })?;

    let resolver = provider.path_resolver(output);
    export(
        entries.freeze(),
        provider.codec(),
        move |id| resolver.resolve_json(id),
        writer,
        options,
    )
    .await
    .map_err(|source| ProviderError::Export {
        provider: CodecProvider::name(provider).to_owned(),
        source,
    })
}

#[derive(Debug, Default)]
pub struct GenerationReport {
    pub outcomes: Vec<(String, Result<ExportReport, ProviderError>)>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|(_, r)| r.is_ok())
    }

    pub fn written(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|(_, r)| r.as_ref().ok())
            .map(|r| r.written)
            .sum()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ProviderError> {
        self.outcomes.iter().filter_map(|(_, r)| r.as_ref().err())
    }
}

/// Runs every added provider against one output root.
pub struct DataGenerator {
    output: DataOutput,
    options: ExportOptions,
    enforce_unique: bool,
    providers: Vec<Box<dyn ErasedProvider>>,
}

impl DataGenerator {
    pub fn new(output: DataOutput, options: ExportOptions) -> Self {
        Self {
            output,
            options,
            enforce_unique: false,
            providers: Vec::new(),
        }
    }

    pub fn enforce_unique_identifiers(mut self, enforce: bool) -> Self {
        self.enforce_unique = enforce;
        self
    }

    pub fn add_provider<P: CodecProvider + 'static>(&mut self, provider: P) -> &mut Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn output(&self) -> &DataOutput {
        &self.output
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Every provider runs even when an earlier one failed.
    pub async fn run(&self, writer: Arc<dyn DataWriter>) -> GenerationReport {
        let mut report = GenerationReport::default();
        for provider in &self.providers {
            tracing::info!("Running data provider {}", provider.name());
            let outcome = provider
                .run(&self.output, &self.options, self.enforce_unique, Arc::clone(&writer))
                .await;
            if let Err(e) = &outcome {
                tracing::error!("Data provider failed: {}", e);
            }
            report.outcomes.push((provider.name().to_owned(), outcome));
        }
        report
    }
}
