use thiserror::Error;

use crate::{Direction, GameStatus, ItemKind};

/// Typed failure returned by every session command.
///
/// No variant leaves the session in a state different from the one observed
/// before the failing command.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GameError {
    /// The maze could not be generated from the requested configuration.
    #[error("maze generation failed: {0}")]
    Generation(#[from] GenerationError),
    /// The current room has no door in the requested direction.
    #[error("there is no door to the {direction}")]
    NoDoor {
        /// Direction the player tried to move in.
        direction: Direction,
    },
    /// The door in the requested direction was sealed by a wrong answer.
    #[error("the door to the {direction} is sealed")]
    SealedDoor {
        /// Direction the player tried to move in.
        direction: Direction,
    },
    /// No door is waiting for an answer.
    #[error("no challenge is waiting for an answer")]
    NoPendingChallenge,
    /// The session reached a terminal status.
    #[error("the game is over ({status})")]
    GameOver {
        /// Terminal status of the session.
        status: GameStatus,
    },
    /// The question provider could not supply a trivia item.
    #[error("question provider failed: {0}")]
    Provider(#[from] ProviderError),
    /// A save blob was rejected.
    #[error("save data rejected: {0}")]
    CorruptSave(#[from] CorruptSaveError),
    /// A command arrived while the session was dispatching notifications.
    #[error("the session is already handling a command")]
    Reentrancy,
    /// The inventory holds no item of the requested kind.
    #[error("there is no {item} in the inventory")]
    MissingItem {
        /// Item the player tried to use.
        item: ItemKind,
    },
    /// The item has no effect in the current situation.
    #[error("the {item} cannot be used right now")]
    ItemNotUsable {
        /// Item the player tried to use.
        item: ItemKind,
    },
}

/// Reasons maze generation may fail.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The grid is empty, a single room, or larger than supported.
    #[error("a {width}x{height} maze is not supported")]
    InvalidDimensions {
        /// Requested number of columns.
        width: u32,
        /// Requested number of rows.
        height: u32,
    },
    /// The extra door density exceeds one.
    #[error("extra door density of {bps} basis points exceeds 10000")]
    InvalidDensity {
        /// Requested density in basis points.
        bps: u16,
    },
    /// More items were requested than rooms can hold them.
    #[error("{requested} items requested but only {capacity} rooms can hold one")]
    TooManyItems {
        /// Requested item count.
        requested: u32,
        /// Number of rooms eligible for an item.
        capacity: u32,
    },
    /// Every attempt produced a maze without an entrance-to-exit path.
    #[error("no solvable maze after {attempts} attempts")]
    Unsolvable {
        /// Number of generation attempts made.
        attempts: u32,
    },
}

/// Failures reported by a question provider.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The store holds no question matching the request.
    #[error("no questions available{}", category_suffix(.category))]
    NoQuestions {
        /// Category that was requested, if any.
        category: Option<String>,
    },
    /// The store could not be reached.
    #[error("question store unavailable: {0}")]
    Unavailable(String),
    /// A saved draw position does not fit this store.
    #[error("question store cannot resume from the saved position: {0}")]
    InvalidSnapshot(String),
}

fn category_suffix(category: &Option<String>) -> String {
    category
        .as_deref()
        .map(|category| format!(" in category '{category}'"))
        .unwrap_or_default()
}

/// Reasons a save blob may be rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CorruptSaveError {
    /// The blob was empty or not text.
    #[error("save data is empty or not valid text")]
    Unreadable,
    /// The blob does not start with the expected format prefix.
    #[error("save data has an unexpected prefix")]
    InvalidPrefix,
    /// The blob was written by an incompatible format version.
    #[error("save format version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// A mandatory section of the blob is missing.
    #[error("save data is missing its {0}")]
    MissingSection(&'static str),
    /// The payload could not be decoded.
    #[error("could not decode save payload: {0}")]
    InvalidEncoding(String),
    /// The payload digest does not match its contents.
    #[error("save payload digest does not match")]
    DigestMismatch,
    /// The payload could not be deserialised.
    #[error("could not parse save payload: {0}")]
    InvalidPayload(String),
    /// The payload parsed but describes an impossible game.
    #[error("save payload is inconsistent: {0}")]
    Inconsistent(String),
}

/// Error returned when parsing a direction or item name fails.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unrecognised {kind} '{value}'")]
pub struct ParseNameError {
    kind: &'static str,
    value: String,
}

impl ParseNameError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}
