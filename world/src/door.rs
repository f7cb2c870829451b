//! Lock state machine guarding passage between two adjacent rooms.

use serde::{Deserialize, Serialize};
use trivia_maze_core::{DoorId, DoorState, RoomCoord, TriviaItem};

/// Stateful gate between two orthogonally adjacent rooms.
///
/// A door is stored once in the maze and referenced by id from both rooms, so
/// both directions of travel observe the same state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Door {
    id: DoorId,
    rooms: [RoomCoord; 2],
    state: DoorState,
    trivia: Option<TriviaItem>,
}

impl Door {
    pub(crate) fn new(id: DoorId, first: RoomCoord, second: RoomCoord) -> Self {
        let rooms = if first <= second {
            [first, second]
        } else {
            [second, first]
        };
        Self {
            id,
            rooms,
            state: DoorState::Unexplored,
            trivia: None,
        }
    }

    /// Identifier of the door.
    #[must_use]
    pub const fn id(&self) -> DoorId {
        self.id
    }

    /// Rooms joined by the door, in ascending coordinate order.
    #[must_use]
    pub const fn rooms(&self) -> [RoomCoord; 2] {
        self.rooms
    }

    /// Current lock state.
    #[must_use]
    pub const fn state(&self) -> DoorState {
        self.state
    }

    /// Trivia item bound on first encounter, if any.
    #[must_use]
    pub fn trivia(&self) -> Option<&TriviaItem> {
        self.trivia.as_ref()
    }

    /// Reports whether a wrong answer permanently closed the door.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.state == DoorState::Sealed
    }

    /// Room on the far side of the door when standing in `from`.
    #[must_use]
    pub fn other_side(&self, from: RoomCoord) -> Option<RoomCoord> {
        match self.rooms {
            [first, second] if first == from => Some(second),
            [first, second] if second == from => Some(first),
            _ => None,
        }
    }

    /// Binds a trivia item and enters the challenge state.
    ///
    /// Only an unexplored door accepts an item; the bound item never changes
    /// afterwards. Returns whether the transition happened.
    pub(crate) fn bind(&mut self, item: TriviaItem) -> bool {
        if self.state != DoorState::Unexplored {
            return false;
        }
        self.trivia = Some(item);
        self.state = DoorState::InChallenge;
        true
    }

    /// Settles a pending challenge from an answer's correctness.
    pub(crate) fn resolve(&mut self, correct: bool) -> Option<DoorState> {
        if self.state != DoorState::InChallenge {
            return None;
        }
        self.state = if correct {
            DoorState::Open
        } else {
            DoorState::Sealed
        };
        Some(self.state)
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.state.has_bound_item() == self.trivia.is_some()
            && self.rooms[0].direction_to(self.rooms[1]).is_some()
            && self.rooms[0] < self.rooms[1]
    }
}
