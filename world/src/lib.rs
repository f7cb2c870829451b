#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative game model for the Trivia Maze.
//!
//! The [`Session`] owns the maze, the inventory, the turn counter and the
//! event log. Adapters drive it through [`apply`] (or the named command
//! methods), observe it through registered [`Observer`]s, and inspect it
//! through the read-only [`query`] functions.

mod door;
mod maze;
mod navigation;
mod persistence;
mod session;

pub use door::Door;
pub use maze::{Maze, MazeParameters, Room, MAX_DIMENSION, MAX_GENERATION_ATTEMPTS};
pub use persistence::SAVE_HEADER;
pub use session::{apply, Observer, Outcome, Session, SharedSession};

/// Query functions that provide read-only access to the session state.
pub mod query {
    use trivia_maze_core::{
        ChallengeView, Direction, DoorState, EventRecord, GameConfig, GameStatus, ItemKind,
        RoomCoord, WELCOME_BANNER,
    };

    use super::{Maze, Session};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(_session: &Session) -> &'static str {
        WELCOME_BANNER
    }

    /// Provides read-only access to the maze.
    #[must_use]
    pub fn maze(session: &Session) -> &Maze {
        &session.state().maze
    }

    /// Room the player currently occupies.
    #[must_use]
    pub fn player(session: &Session) -> RoomCoord {
        session.state().maze.player()
    }

    /// Current session status.
    #[must_use]
    pub fn status(session: &Session) -> GameStatus {
        session.state().status
    }

    /// Number of successful commands processed so far.
    #[must_use]
    pub fn turn(session: &Session) -> u64 {
        session.state().turn
    }

    /// Seed the maze was generated from.
    #[must_use]
    pub fn seed(session: &Session) -> u64 {
        session.state().seed
    }

    /// Configuration the game was started with.
    #[must_use]
    pub fn config(session: &Session) -> &GameConfig {
        &session.state().config
    }

    /// Number of items of `item` held by the player.
    #[must_use]
    pub fn item_count(session: &Session, item: ItemKind) -> u32 {
        session.state().inventory.get(&item).copied().unwrap_or(0)
    }

    /// Held items and their counts, in a stable order.
    #[must_use]
    pub fn inventory(session: &Session) -> Vec<(ItemKind, u32)> {
        session
            .state()
            .inventory
            .iter()
            .map(|(item, count)| (*item, *count))
            .collect()
    }

    /// Append-only log of every notification produced so far.
    #[must_use]
    pub fn event_log(session: &Session) -> &[EventRecord] {
        &session.state().log
    }

    /// Lock state of the door leaving `room` in `direction`.
    #[must_use]
    pub fn door_state(session: &Session, room: RoomCoord, direction: Direction) -> Option<DoorState> {
        let maze = &session.state().maze;
        maze.door_toward(room, direction)
            .and_then(|id| maze.door(id))
            .map(|door| door.state())
    }

    /// Challenge currently waiting for an answer, if any.
    #[must_use]
    pub fn pending_challenge(session: &Session) -> Option<ChallengeView> {
        let state = session.state();
        let direction = state.pending?;
        let id = state.maze.door_toward(state.maze.player(), direction)?;
        state
            .maze
            .door(id)
            .filter(|door| door.state() == DoorState::InChallenge)
            .and_then(|door| door.trivia())
            .map(|trivia| trivia.challenge(id, direction))
    }
}
