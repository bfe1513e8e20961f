use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

use crate::error::ErrorClass;
use crate::world::structures::PieceRecord;

const MAGIC_HEADER: &[u8; 4] = b"MGPS";
const VERSION: u32 = 1;
/// Magic, version and payload length.
const HEADER_LEN: u64 = 16;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("cannot access piece file: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a piece file")]
    BadMagic,
    #[error("unsupported piece file version: {0}")]
    UnsupportedVersion(u32),
    #[error("corrupt piece file: {0}")]
    Corrupt(String),
}

impl SaveError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SaveError::Io(_) => ErrorClass::ResourceUnavailable,
            SaveError::BadMagic | SaveError::UnsupportedVersion(_) | SaveError::Corrupt(_) => ErrorClass::DataDefect,
        }
    }
}

/// Pieces planned for a world, persisted between runs.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct SavedPieces {
    pub seed: u32,
    pub pieces: Vec<PieceRecord>,
}

pub fn save_pieces<P: AsRef<Path>>(path: P, saved: &SavedPieces) -> Result<(), SaveError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(MAGIC_HEADER)?;
    writer.write_all(&VERSION.to_le_bytes())?;

    let data = bincode::serialize(saved).map_err(|e| SaveError::Corrupt(e.to_string()))?;

    let size = data.len() as u64;
    writer.write_all(&size.to_le_bytes())?;

    writer.write_all(&data)?;
    writer.flush()?;

    tracing::info!("Saved {} pieces", saved.pieces.len());
    Ok(())
}

pub fn load_pieces<P: AsRef<Path>>(path: P) -> Result<SavedPieces, SaveError> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC_HEADER {
        return Err(SaveError::BadMagic);
    }

    let mut version_bytes = [0u8; 4];
    reader.read_exact(&mut version_bytes)?;
    let version = u32::from_le_bytes(version_bytes);
    if version != VERSION {
        return Err(SaveError::UnsupportedVersion(version));
    }

    let mut size_bytes = [0u8; 8];
    reader.read_exact(&mut size_bytes)?;
    let size = u64::from_le_bytes(size_bytes);
    let remaining = file_len.saturating_sub(HEADER_LEN);
    if size != remaining {
        return Err(SaveError::Corrupt(format!(
            "payload length {size} does not match {remaining} bytes on disk"
        )));
    }

    let mut data = vec![0u8; size as usize];
    reader.read_exact(&mut data)?;

    bincode::deserialize(&data).map_err(|e| SaveError::Corrupt(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Mirror, Rotation};
    use glam::IVec3;

    fn record() -> PieceRecord {
        PieceRecord {
            piece_type: "modid:my_house_piece".parse().unwrap(),
            template: "modid:my_house".parse().unwrap(),
            rotation: Rotation::R270,
            mirror: Mirror::AlongZ,
            anchor: IVec3::new(16, 90, -32),
            y_offset: 0,
        }
    }

    #[test]
    fn pieces_survive_a_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pieces.mgp");
        let saved = SavedPieces {
            seed: 42,
            pieces: vec![record()],
        };
        save_pieces(&path, &saved).unwrap();

        let loaded = load_pieces(&path).unwrap();
        assert_eq!(loaded.seed, 42);
        assert_eq!(loaded.pieces, vec![record()]);
    }

    #[test]
    fn foreign_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.bin");
        std::fs::write(&path, b"R3DW\x01\x00\x00\x00").unwrap();
        let err = load_pieces(&path).unwrap_err();
        assert!(matches!(err, SaveError::BadMagic));
        assert_eq!(err.class(), ErrorClass::DataDefect);
    }

    #[test]
    fn oversized_length_prefix_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.mgp");
        let mut bytes = MAGIC_HEADER.to_vec();
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&(u64::MAX / 2).to_le_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        std::fs::write(&path, bytes).unwrap();

        let err = load_pieces(&path).unwrap_err();
        assert!(matches!(err, SaveError::Corrupt(_)));
        assert_eq!(err.class(), ErrorClass::DataDefect);
    }

    #[test]
    fn truncated_payload_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.mgp");
        save_pieces(
            &path,
            &SavedPieces {
                seed: 7,
                pieces: vec![record()],
            },
        )
        .unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

        assert!(matches!(load_pieces(&path), Err(SaveError::Corrupt(_))));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_pieces(dir.path().join("nope.mgp")).unwrap_err();
        assert_eq!(err.class(), ErrorClass::ResourceUnavailable);
    }
}
