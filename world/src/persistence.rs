//! Versioned save format.
//!
//! A save is a single line of text: `trivia-maze:v1:<digest>:<payload>`,
//! where the payload is the unpadded base64 encoding of a JSON document with
//! named fields and the digest is the lowercase hex SHA-256 of the decoded
//! payload bytes. Decoding validates every layer before any field is trusted.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};
use trivia_maze_core::CorruptSaveError;

use crate::session::GameState;

const SAVE_DOMAIN: &str = "trivia-maze";
const SAVE_VERSION: &str = "v1";

/// Identifier prefix emitted before the digest and payload.
pub const SAVE_HEADER: &str = "trivia-maze:v1";
/// Delimiter separating the prefix, version, digest and payload.
const FIELD_DELIMITER: char = ':';

/// Encodes the state into a save blob.
pub(crate) fn encode(state: &GameState) -> Vec<u8> {
    let json = serde_json::to_vec(state).expect("game state serialization never fails");
    let digest = hex_digest(&json);
    let encoded = STANDARD_NO_PAD.encode(&json);
    format!("{SAVE_HEADER}{FIELD_DELIMITER}{digest}{FIELD_DELIMITER}{encoded}").into_bytes()
}

/// Decodes and validates a save blob.
pub(crate) fn decode(bytes: &[u8]) -> Result<GameState, CorruptSaveError> {
    let text = std::str::from_utf8(bytes).map_err(|_| CorruptSaveError::Unreadable)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CorruptSaveError::Unreadable);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(CorruptSaveError::InvalidPrefix)?;
    if domain != SAVE_DOMAIN {
        return Err(CorruptSaveError::InvalidPrefix);
    }
    let version = parts
        .next()
        .ok_or(CorruptSaveError::MissingSection("version"))?;
    if version != SAVE_VERSION {
        tracing::warn!(version, "rejected save written by another format version");
        return Err(CorruptSaveError::UnsupportedVersion(version.to_owned()));
    }
    let digest = parts
        .next()
        .ok_or(CorruptSaveError::MissingSection("digest"))?;
    let payload = parts
        .next()
        .ok_or(CorruptSaveError::MissingSection("payload"))?;
    if parts.next().is_some() {
        return Err(CorruptSaveError::InvalidEncoding(
            "unexpected trailing section".to_owned(),
        ));
    }

    let json = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(|error| CorruptSaveError::InvalidEncoding(error.to_string()))?;
    if hex_digest(&json) != digest {
        tracing::warn!("rejected save with mismatching digest");
        return Err(CorruptSaveError::DigestMismatch);
    }

    let state: GameState = serde_json::from_slice(&json)
        .map_err(|error| CorruptSaveError::InvalidPayload(error.to_string()))?;
    state.validate()?;
    Ok(state)
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
