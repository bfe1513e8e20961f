//! Error classification shared by every module.
//!
//! Each module owns its own `thiserror` enum; all of them report which of the
//! four classes below they belong to so a host can decide whether to skip,
//! retry, or abort.

use thiserror::Error;

/// Broad failure class of any error produced by this crate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ErrorClass {
    /// Malformed input: bad template, bad persisted rotation, unencodable value.
    /// Never retried.
    DataDefect,
    /// Missing ground, rejected write. Scoped to one piece or one entry.
    ResourceUnavailable,
    /// Programmer error such as registering into a sealed engine.
    Misuse,
    /// Post-processing trouble that never changes completion status.
    Cosmetic,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorClass::DataDefect => write!(f, "data defect"),
            ErrorClass::ResourceUnavailable => write!(f, "resource unavailable"),
            ErrorClass::Misuse => write!(f, "configuration misuse"),
            ErrorClass::Cosmetic => write!(f, "cosmetic"),
        }
    }
}

/// Top-level error used by the binary and by hosts that want a single type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Identifier(#[from] crate::core::IdentifierError),
    #[error(transparent)]
    Registry(#[from] crate::core::RegistryError),
    #[error(transparent)]
    Space(#[from] crate::world::SpaceError),
    #[error(transparent)]
    Template(#[from] crate::world::structures::TemplateError),
    #[error(transparent)]
    Piece(#[from] crate::world::structures::PieceError),
    #[error(transparent)]
    Modification(#[from] crate::biome::ModificationError),
    #[error(transparent)]
    Entries(#[from] crate::datagen::EntriesError),
    #[error(transparent)]
    Provider(#[from] crate::datagen::ProviderError),
    #[error(transparent)]
    Save(#[from] crate::save::SaveError),
    #[error(transparent)]
    Settings(#[from] crate::utils::settings::SettingsError),
    #[error("reloaded pieces produced {actual} cells, expected {expected}")]
    ReplayMismatch { expected: usize, actual: usize },
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Identifier(e) => e.class(),
            Error::Registry(e) => e.class(),
            Error::Space(e) => e.class(),
            Error::Template(e) => e.class(),
            Error::Piece(e) => e.class(),
            Error::Modification(e) => e.class(),
            Error::Entries(e) => e.class(),
            Error::Provider(e) => e.class(),
            Error::Save(e) => e.class(),
            Error::Settings(e) => e.class(),
            Error::ReplayMismatch { .. } => ErrorClass::DataDefect,
            Error::Runtime(_) => ErrorClass::ResourceUnavailable,
        }
    }
}
