//! Versioned binary stream of [`HybridSnapshot`]s for recording and replay.
//!
//! Layout: big-endian `u32` magic (`HYS1`), big-endian `u32` version, then the snapshot list
//! as CBOR.

use std::io::{self, Read, Write};

use thiserror::Error;

use crate::config::{SNAPSHOT_STREAM_MAGIC, SNAPSHOT_STREAM_VERSION};

use super::snapshot::HybridSnapshot;

#[derive(Debug, Error)]
pub enum SnapshotIoError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("bad snapshot stream magic {0:#010x}")]
    BadMagic(u32),
    #[error("unsupported snapshot stream version: {0}")]
    UnsupportedVersion(u32),
    #[error("snapshot encode failed: {0}")]
    Encode(String),
    #[error("snapshot decode failed: {0}")]
    Decode(String),
}

pub fn write<W: Write>(mut output: W, snapshots: &[HybridSnapshot]) -> Result<(), SnapshotIoError> {
    output.write_all(&SNAPSHOT_STREAM_MAGIC.to_be_bytes())?;
    output.write_all(&SNAPSHOT_STREAM_VERSION.to_be_bytes())?;
    ciborium::into_writer(snapshots, &mut output)
        .map_err(|e| SnapshotIoError::Encode(e.to_string()))?;
    output.flush()?;
    Ok(())
}

pub fn read<R: Read>(mut input: R) -> Result<Vec<HybridSnapshot>, SnapshotIoError> {
    let magic = read_u32(&mut input)?;
    if magic != SNAPSHOT_STREAM_MAGIC {
        return Err(SnapshotIoError::BadMagic(magic));
    }
    let version = read_u32(&mut input)?;
    if version != SNAPSHOT_STREAM_VERSION {
        return Err(SnapshotIoError::UnsupportedVersion(version));
    }
    ciborium::from_reader(&mut input).map_err(|e| SnapshotIoError::Decode(e.to_string()))
}

fn read_u32<R: Read>(input: &mut R) -> Result<u32, SnapshotIoError> {
    let mut bytes = [0u8; 4];
    input.read_exact(&mut bytes)?;
    Ok(u32::from_be_bytes(bytes))
}
