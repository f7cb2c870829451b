#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Trivia Maze engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative game session, and the question store. Adapters submit
//! [`Command`] values describing desired mutations, the session executes those
//! commands via its `apply` entry point, and then broadcasts [`Notification`]
//! values to registered observers so a presentation layer can redraw without
//! the model knowing about rendering. Trivia items are obtained through the
//! [`QuestionProvider`] seam.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

mod error;
mod trivia;

pub use error::{CorruptSaveError, GameError, GenerationError, ParseNameError, ProviderError};
pub use trivia::{ChallengeView, QuestionKind, QuestionProvider, TriviaItem};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to the Trivia Maze.";

/// Number of basis points that represent a probability of one.
pub const BASIS_POINTS_SCALE: u16 = 10_000;

/// Commands that express all permissible session mutations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Requests that the player walk through the door in the given direction.
    AttemptMove {
        /// Direction of travel for the attempted move.
        direction: Direction,
    },
    /// Answers the challenge presented by the most recently attempted door.
    SubmitAnswer {
        /// Free-form answer text typed by the player.
        answer: String,
    },
    /// Consumes one item from the inventory.
    UseItem {
        /// Kind of item to consume.
        item: ItemKind,
    },
}

/// Discriminant of a [`Notification`], recorded alongside each event-log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// The player changed rooms.
    Moved,
    /// A door presented its trivia challenge.
    DoorChallenge,
    /// A door left the challenge state.
    DoorResolved,
    /// The inventory changed or an item took effect.
    ItemChanged,
    /// The session status changed.
    StatusChanged,
}

/// State-change message pushed from the session to registered observers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// Confirms that the player moved between two rooms.
    Moved {
        /// Room the player occupied before moving.
        from: RoomCoord,
        /// Room the player occupies after the move.
        to: RoomCoord,
    },
    /// Announces that a door is waiting for an answer.
    DoorChallenge {
        /// Question presented to the player, without its answer.
        challenge: ChallengeView,
    },
    /// Announces that a door reached a terminal lock state.
    DoorResolved {
        /// Door that changed state.
        door: DoorId,
        /// Direction of the door as seen from the player's room.
        direction: Direction,
        /// Terminal state the door settled in.
        state: DoorState,
    },
    /// Reports an inventory change together with the effect that caused it.
    ItemChanged {
        /// Item whose count changed.
        item: ItemKind,
        /// Number of items of this kind held after the change.
        count: u32,
        /// What happened to the item.
        effect: ItemEffect,
    },
    /// Announces a new session status.
    StatusChanged {
        /// Status that became active.
        status: GameStatus,
    },
}

impl Notification {
    /// Returns the discriminant of the notification.
    #[must_use]
    pub const fn kind(&self) -> NotificationKind {
        match self {
            Self::Moved { .. } => NotificationKind::Moved,
            Self::DoorChallenge { .. } => NotificationKind::DoorChallenge,
            Self::DoorResolved { .. } => NotificationKind::DoorResolved,
            Self::ItemChanged { .. } => NotificationKind::ItemChanged,
            Self::StatusChanged { .. } => NotificationKind::StatusChanged,
        }
    }
}

/// Single append-only entry of the session event log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Turn during which the notification was produced.
    pub turn: u64,
    /// Discriminant of the recorded notification.
    pub kind: NotificationKind,
    /// Full notification payload.
    pub notification: Notification,
}

impl EventRecord {
    /// Creates a log record for the provided notification.
    #[must_use]
    pub fn new(turn: u64, notification: Notification) -> Self {
        Self {
            turn,
            kind: notification.kind(),
            notification,
        }
    }
}

/// Effect attached to an [`Notification::ItemChanged`] message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemEffect {
    /// The item was found in a room and added to the inventory.
    PickedUp {
        /// Room that held the item.
        room: RoomCoord,
    },
    /// A suggestion potion produced a hint for the pending challenge.
    Hint {
        /// Hint text to show the player.
        text: String,
    },
    /// A vision potion revealed the listed rooms.
    Revealed {
        /// Rooms that became revealed, in row-major order.
        rooms: Vec<RoomCoord>,
    },
    /// A magic key opened the pending door.
    Unlocked {
        /// Door that was opened.
        door: DoorId,
    },
}

/// Cardinal movement directions available to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// All directions in the order used for room door slots.
    pub const ALL: [Direction; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// Index of the direction inside a room's door slots.
    #[must_use]
    pub const fn slot(self) -> usize {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    /// Lowercase name used in text interfaces.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::East => "east",
            Self::South => "south",
            Self::West => "west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Direction {
    type Err = ParseNameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "n" | "north" | "up" => Ok(Self::North),
            "e" | "east" | "right" => Ok(Self::East),
            "s" | "south" | "down" => Ok(Self::South),
            "w" | "west" | "left" => Ok(Self::West),
            _ => Err(ParseNameError::new("direction", value)),
        }
    }
}

/// Location of a single room expressed as row and column coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomCoord {
    row: u32,
    column: u32,
}

impl RoomCoord {
    /// Creates a new room coordinate.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the room.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the room.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Returns the neighbouring coordinate in `direction` when it lies inside
    /// a grid of `rows` by `columns` rooms.
    #[must_use]
    pub fn neighbor(self, direction: Direction, rows: u32, columns: u32) -> Option<Self> {
        let (row, column) = match direction {
            Direction::North => (self.row.checked_sub(1)?, self.column),
            Direction::East => (self.row, self.column.checked_add(1)?),
            Direction::South => (self.row.checked_add(1)?, self.column),
            Direction::West => (self.row, self.column.checked_sub(1)?),
        };
        (row < rows && column < columns).then_some(Self { row, column })
    }

    /// Direction leading from `self` to an orthogonally adjacent `other`.
    #[must_use]
    pub fn direction_to(self, other: RoomCoord) -> Option<Direction> {
        let row_diff = self.row.abs_diff(other.row);
        let column_diff = self.column.abs_diff(other.column);
        if row_diff + column_diff != 1 {
            return None;
        }

        if column_diff == 1 {
            if other.column > self.column {
                Some(Direction::East)
            } else {
                Some(Direction::West)
            }
        } else if other.row > self.row {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    }
}

impl fmt::Display for RoomCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Unique identifier assigned to a door.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DoorId(u32);

impl DoorId {
    /// Creates a new door identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Lock state of a door.
///
/// States only ever move forward: `Unexplored -> InChallenge -> {Open, Sealed}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoorState {
    /// No trivia item has been bound yet.
    Unexplored,
    /// A trivia item is bound and waiting for an answer.
    InChallenge,
    /// Answered correctly; passable forever.
    Open,
    /// Answered incorrectly; never passable again.
    Sealed,
}

impl DoorState {
    /// Reports whether the door may still become passable.
    #[must_use]
    pub const fn may_become_passable(self) -> bool {
        !matches!(self, Self::Sealed)
    }

    /// Reports whether the door will never change state again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Open | Self::Sealed)
    }

    /// Reports whether a trivia item must be bound in this state.
    #[must_use]
    pub const fn has_bound_item(self) -> bool {
        !matches!(self, Self::Unexplored)
    }
}

/// Role a room plays within the maze.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomKind {
    /// Room the player starts in.
    Entrance,
    /// Room the player must reach to win.
    Exit,
    /// Room that was generated holding an item.
    ItemCache,
    /// Ordinary room.
    Plain,
}

/// Items the player can find and use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemKind {
    /// Opens the pending door without answering its question.
    MagicKey,
    /// Reveals a hint for the pending question.
    SuggestionPotion,
    /// Reveals the rooms surrounding the player.
    VisionPotion,
}

impl ItemKind {
    /// All item kinds in a stable order.
    pub const ALL: [ItemKind; 3] = [Self::MagicKey, Self::SuggestionPotion, Self::VisionPotion];

    /// Lowercase name used in text interfaces.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MagicKey => "magic key",
            Self::SuggestionPotion => "suggestion potion",
            Self::VisionPotion => "vision potion",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ItemKind {
    type Err = ParseNameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "key" | "magic key" | "magic-key" => Ok(Self::MagicKey),
            "suggestion" | "suggestion potion" | "suggestion-potion" => {
                Ok(Self::SuggestionPotion)
            }
            "vision" | "vision potion" | "vision-potion" => Ok(Self::VisionPotion),
            _ => Err(ParseNameError::new("item", value)),
        }
    }
}

/// Overall state of a game session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    /// The game accepts commands.
    InProgress,
    /// The player reached the exit.
    Won,
    /// The exit became unreachable.
    Lost,
}

impl GameStatus {
    /// Reports whether the session no longer accepts commands.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InProgress => "in progress",
            Self::Won => "won",
            Self::Lost => "lost",
        };
        f.write_str(label)
    }
}

/// Parameters for starting a new game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Number of room columns.
    pub width: u32,
    /// Number of room rows.
    pub height: u32,
    /// Seed for maze generation; a fresh one is drawn and recorded when absent.
    pub seed: Option<u64>,
    /// Probability, in basis points, that a non-tree wall becomes an extra door.
    pub extra_door_density_bps: u16,
    /// Number of items scattered through the maze.
    pub item_count: u32,
    /// Category hint forwarded to the question provider.
    pub category: Option<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 5,
            height: 5,
            seed: None,
            extra_door_density_bps: 1_500,
            item_count: 3,
            category: None,
        }
    }
}
