//! Game session: the single entry point for player commands.

use std::{cell::RefCell, collections::BTreeMap, fmt, rc::Rc};

use serde::{Deserialize, Serialize};
use trivia_maze_core::{
    ChallengeView, Command, CorruptSaveError, Direction, DoorId, DoorState, EventRecord,
    GameConfig, GameError, GameStatus, ItemEffect, ItemKind, Notification, QuestionProvider,
    RoomCoord,
};

use crate::{
    maze::{Maze, MazeParameters},
    persistence,
};

/// Receives every notification produced by a session.
///
/// Observers are invoked synchronously, in registration order, on the thread
/// that issued the command.
pub trait Observer {
    /// Handles a single state-change notification.
    fn on_state_changed(&self, notification: &Notification);
}

impl<F> Observer for F
where
    F: Fn(&Notification),
{
    fn on_state_changed(&self, notification: &Notification) {
        self(notification)
    }
}

/// Result of a successful command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The player moved between two rooms.
    Moved {
        /// Room left behind.
        from: RoomCoord,
        /// Room entered.
        to: RoomCoord,
    },
    /// The attempted door is waiting for an answer.
    Challenged(ChallengeView),
    /// A wrong answer sealed the door.
    Sealed {
        /// Door that was sealed.
        door: DoorId,
    },
    /// An item took effect without moving the player.
    ItemUsed {
        /// Item that was consumed.
        item: ItemKind,
        /// Effect produced by the item.
        effect: ItemEffect,
    },
}

/// Serializable state of a session; everything except observers and provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct GameState {
    pub(crate) config: GameConfig,
    pub(crate) seed: u64,
    pub(crate) maze: Maze,
    pub(crate) inventory: BTreeMap<ItemKind, u32>,
    pub(crate) turn: u64,
    pub(crate) status: GameStatus,
    pub(crate) pending: Option<Direction>,
    pub(crate) log: Vec<EventRecord>,
    /// Draw position of the question provider when the state was last touched.
    #[serde(default)]
    pub(crate) provider_cursor: Option<String>,
}

impl GameState {
    fn generate(config: GameConfig) -> Result<Self, GameError> {
        let seed = config.seed.unwrap_or_else(rand::random);
        let maze = Maze::generate(&MazeParameters {
            width: config.width,
            height: config.height,
            seed,
            extra_door_density_bps: config.extra_door_density_bps,
            item_count: config.item_count,
        })?;

        tracing::info!(
            seed,
            width = config.width,
            height = config.height,
            "started new game"
        );

        Ok(Self {
            config,
            seed,
            maze,
            inventory: BTreeMap::new(),
            turn: 0,
            status: GameStatus::InProgress,
            pending: None,
            log: Vec::new(),
            provider_cursor: None,
        })
    }

    /// Checks cross-field invariants of a deserialised state.
    pub(crate) fn validate(&self) -> Result<(), CorruptSaveError> {
        self.maze.validate().map_err(CorruptSaveError::Inconsistent)?;

        let at_exit = self.maze.player() == self.maze.exit();
        if (self.status == GameStatus::Won) != at_exit {
            return Err(CorruptSaveError::Inconsistent(
                "status disagrees with player position".to_owned(),
            ));
        }

        let reachable = self.maze.exit_reachable_from(self.maze.player());
        match self.status {
            GameStatus::InProgress if !reachable => {
                return Err(CorruptSaveError::Inconsistent(
                    "game in progress but the exit is unreachable".to_owned(),
                ));
            }
            GameStatus::Lost if reachable => {
                return Err(CorruptSaveError::Inconsistent(
                    "game lost but the exit is still reachable".to_owned(),
                ));
            }
            _ => {}
        }

        if let Some(direction) = self.pending {
            let pending_state = self
                .maze
                .door_toward(self.maze.player(), direction)
                .and_then(|id| self.maze.door(id))
                .map(|door| door.state());
            if pending_state != Some(DoorState::InChallenge) || self.status.is_terminal() {
                return Err(CorruptSaveError::Inconsistent(
                    "pending challenge does not match any door".to_owned(),
                ));
            }
        }

        let mut previous_turn = 0;
        for record in &self.log {
            if record.turn < previous_turn
                || record.turn > self.turn
                || record.kind != record.notification.kind()
            {
                return Err(CorruptSaveError::Inconsistent(
                    "event log is out of order".to_owned(),
                ));
            }
            previous_turn = record.turn;
        }

        if self.inventory.values().any(|count| *count == 0) {
            return Err(CorruptSaveError::Inconsistent(
                "inventory lists an empty stack".to_owned(),
            ));
        }

        Ok(())
    }

    fn ensure_in_progress(&self) -> Result<(), GameError> {
        if self.status.is_terminal() {
            return Err(GameError::GameOver {
                status: self.status,
            });
        }
        Ok(())
    }

    fn item_count(&self, item: ItemKind) -> u32 {
        self.inventory.get(&item).copied().unwrap_or(0)
    }

    fn consume(&mut self, item: ItemKind) -> u32 {
        let remaining = self.item_count(item).saturating_sub(1);
        if remaining == 0 {
            let _ = self.inventory.remove(&item);
        } else {
            let _ = self.inventory.insert(item, remaining);
        }
        remaining
    }

    /// Door of the pending challenge, verified to still be in challenge.
    fn pending_door(&self) -> Result<(Direction, DoorId), GameError> {
        let direction = self.pending.ok_or(GameError::NoPendingChallenge)?;
        let id = self
            .maze
            .door_toward(self.maze.player(), direction)
            .filter(|id| {
                self.maze
                    .door(*id)
                    .is_some_and(|door| door.state() == DoorState::InChallenge)
            })
            .ok_or(GameError::NoPendingChallenge)?;
        Ok((direction, id))
    }

    /// Walks the player through an open door, collecting items and checking for victory.
    fn enter_through(&mut self, door: DoorId, out: &mut Vec<Notification>) -> Option<RoomCoord> {
        let from = self.maze.player();
        let to = self.maze.door(door)?.other_side(from)?;

        self.maze.set_player(to);
        self.pending = None;
        out.push(Notification::Moved { from, to });

        if let Some(item) = self.maze.room_mut(to).and_then(|room| room.take_item()) {
            let count = self.item_count(item).saturating_add(1);
            let _ = self.inventory.insert(item, count);
            out.push(Notification::ItemChanged {
                item,
                count,
                effect: ItemEffect::PickedUp { room: to },
            });
        }

        if to == self.maze.exit() {
            self.status = GameStatus::Won;
            tracing::info!(turn = self.turn + 1, "player reached the exit");
            out.push(Notification::StatusChanged {
                status: GameStatus::Won,
            });
        }

        Some(to)
    }

    fn challenge_for(&self, direction: Direction, id: DoorId) -> Option<ChallengeView> {
        self.maze
            .door(id)
            .and_then(|door| door.trivia())
            .map(|trivia| trivia.challenge(id, direction))
    }
}

/// One in-progress (or completed) game instance.
pub struct Session {
    state: GameState,
    provider: Box<dyn QuestionProvider>,
    observers: Vec<Rc<dyn Observer>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Starts a new game drawing questions from `provider`.
    pub fn new(config: GameConfig, provider: Box<dyn QuestionProvider>) -> Result<Self, GameError> {
        let mut state = GameState::generate(config)?;
        state.provider_cursor = provider.snapshot();
        Ok(Self {
            state,
            provider,
            observers: Vec::new(),
        })
    }

    /// Rebuilds a session from a blob produced by [`Session::save`].
    ///
    /// The provider resumes from the draw position stored in the save.
    pub fn load(bytes: &[u8], mut provider: Box<dyn QuestionProvider>) -> Result<Self, GameError> {
        let state = persistence::decode(bytes)?;
        if let Some(cursor) = &state.provider_cursor {
            provider.restore(cursor)?;
        }
        tracing::info!(turn = state.turn, seed = state.seed, "loaded saved game");
        Ok(Self {
            state,
            provider,
            observers: Vec::new(),
        })
    }

    /// Replaces the game with a freshly generated one, keeping observers and provider.
    ///
    /// The current game is untouched when generation fails.
    pub fn new_game(&mut self, config: GameConfig) -> Result<(), GameError> {
        let mut state = GameState::generate(config)?;
        state.provider_cursor = self.provider.snapshot();
        self.state = state;
        self.commit(vec![Notification::StatusChanged {
            status: GameStatus::InProgress,
        }]);
        Ok(())
    }

    /// Serialises the full game state into a versioned blob.
    #[must_use]
    pub fn save(&self) -> Vec<u8> {
        persistence::encode(&self.state)
    }

    /// Replaces the game with one decoded from `bytes`, keeping observers and provider.
    ///
    /// The current game is untouched when decoding fails or the provider
    /// rejects the stored draw position.
    pub fn restore(&mut self, bytes: &[u8]) -> Result<(), GameError> {
        let state = persistence::decode(bytes)?;
        if let Some(cursor) = &state.provider_cursor {
            self.provider.restore(cursor)?;
        }
        tracing::info!(turn = state.turn, seed = state.seed, "restored saved game");
        self.state = state;
        Ok(())
    }

    /// Registers an observer; registering the same observer twice has no effect.
    ///
    /// Returns whether the observer was newly added.
    pub fn register(&mut self, observer: Rc<dyn Observer>) -> bool {
        if self.is_registered(&observer) {
            return false;
        }
        self.observers.push(observer);
        true
    }

    /// Removes an observer; removing an unknown observer has no effect.
    ///
    /// Returns whether the observer was registered.
    pub fn unregister(&mut self, observer: &Rc<dyn Observer>) -> bool {
        let before = self.observers.len();
        self.observers
            .retain(|registered| !std::ptr::addr_eq(Rc::as_ptr(registered), Rc::as_ptr(observer)));
        before != self.observers.len()
    }

    fn is_registered(&self, observer: &Rc<dyn Observer>) -> bool {
        self.observers
            .iter()
            .any(|registered| std::ptr::addr_eq(Rc::as_ptr(registered), Rc::as_ptr(observer)))
    }

    /// Tries to walk through the door in `direction`.
    ///
    /// Open doors are crossed immediately. Unexplored doors bind a question
    /// and present it; doors already in challenge present the same question
    /// again. The player only moves once the challenge is answered.
    pub fn attempt_move(&mut self, direction: Direction) -> Result<Outcome, GameError> {
        self.state.ensure_in_progress()?;

        let from = self.state.maze.player();
        let id = self
            .state
            .maze
            .door_toward(from, direction)
            .ok_or(GameError::NoDoor { direction })?;
        let door_state = self
            .state
            .maze
            .door(id)
            .map(|door| door.state())
            .ok_or(GameError::NoDoor { direction })?;

        match door_state {
            DoorState::Sealed => Err(GameError::SealedDoor { direction }),
            DoorState::Open => {
                let mut notifications = Vec::new();
                let to = self
                    .state
                    .enter_through(id, &mut notifications)
                    .ok_or(GameError::NoDoor { direction })?;
                self.commit(notifications);
                Ok(Outcome::Moved { from, to })
            }
            DoorState::Unexplored => {
                let category = self.state.config.category.clone();
                let item = self.provider.next_question(category.as_deref())?;
                if let Some(door) = self.state.maze.door_mut(id) {
                    let _ = door.bind(item);
                }
                self.state.provider_cursor = self.provider.snapshot();
                tracing::debug!(door = id.get(), %direction, "door entered challenge");
                self.present(direction, id)
            }
            DoorState::InChallenge => self.present(direction, id),
        }
    }

    fn present(&mut self, direction: Direction, door: DoorId) -> Result<Outcome, GameError> {
        let challenge = self
            .state
            .challenge_for(direction, door)
            .ok_or(GameError::NoDoor { direction })?;
        self.state.pending = Some(direction);
        self.commit(vec![Notification::DoorChallenge {
            challenge: challenge.clone(),
        }]);
        Ok(Outcome::Challenged(challenge))
    }

    /// Answers the pending challenge.
    ///
    /// A correct answer opens the door and moves the player through it; a
    /// wrong answer seals it for the rest of the game and may lose the game.
    pub fn submit_answer(&mut self, answer: &str) -> Result<Outcome, GameError> {
        self.state.ensure_in_progress()?;
        let (direction, id) = self.state.pending_door()?;

        let correct = self
            .state
            .maze
            .door(id)
            .and_then(|door| door.trivia())
            .is_some_and(|trivia| trivia.check(answer));
        self.resolve(direction, id, correct, Vec::new())
    }

    fn resolve(
        &mut self,
        direction: Direction,
        id: DoorId,
        correct: bool,
        mut notifications: Vec<Notification>,
    ) -> Result<Outcome, GameError> {
        let from = self.state.maze.player();
        let state = self
            .state
            .maze
            .door_mut(id)
            .and_then(|door| door.resolve(correct))
            .ok_or(GameError::NoPendingChallenge)?;
        self.state.pending = None;
        tracing::debug!(door = id.get(), %direction, ?state, "door resolved");

        notifications.push(Notification::DoorResolved {
            door: id,
            direction,
            state,
        });

        let outcome = if state == DoorState::Open {
            match self.state.enter_through(id, &mut notifications) {
                Some(to) => Outcome::Moved { from, to },
                None => Outcome::Sealed { door: id },
            }
        } else {
            if !self.state.maze.exit_reachable_from(from) {
                self.state.status = GameStatus::Lost;
                tracing::info!(turn = self.state.turn + 1, "exit is no longer reachable");
                notifications.push(Notification::StatusChanged {
                    status: GameStatus::Lost,
                });
            }
            Outcome::Sealed { door: id }
        };

        self.commit(notifications);
        Ok(outcome)
    }

    /// Consumes one item from the inventory.
    ///
    /// Magic keys open the pending door and walk through it, suggestion
    /// potions reveal a hint for the pending question, and vision potions
    /// reveal the rooms around the player.
    pub fn use_item(&mut self, item: ItemKind) -> Result<Outcome, GameError> {
        self.state.ensure_in_progress()?;
        if self.state.item_count(item) == 0 {
            return Err(GameError::MissingItem { item });
        }

        match item {
            ItemKind::MagicKey => {
                let (direction, id) = self.state.pending_door()?;
                let count = self.state.consume(item);
                let unlocked = Notification::ItemChanged {
                    item,
                    count,
                    effect: ItemEffect::Unlocked { door: id },
                };
                self.resolve(direction, id, true, vec![unlocked])
            }
            ItemKind::SuggestionPotion => {
                let (direction, id) = self.state.pending_door()?;
                let text = self
                    .state
                    .maze
                    .door(id)
                    .and_then(|door| door.trivia())
                    .and_then(|trivia| trivia.hint())
                    .ok_or(GameError::ItemNotUsable { item })?;
                let count = self.state.consume(item);
                let effect = ItemEffect::Hint { text };
                tracing::debug!(door = id.get(), %direction, "suggestion potion used");
                self.commit(vec![Notification::ItemChanged {
                    item,
                    count,
                    effect: effect.clone(),
                }]);
                Ok(Outcome::ItemUsed { item, effect })
            }
            ItemKind::VisionPotion => {
                let rooms = surrounding_rooms(&self.state.maze);
                for coord in &rooms {
                    if let Some(room) = self.state.maze.room_mut(*coord) {
                        room.mark_revealed();
                    }
                }
                let count = self.state.consume(item);
                let effect = ItemEffect::Revealed { rooms };
                self.commit(vec![Notification::ItemChanged {
                    item,
                    count,
                    effect: effect.clone(),
                }]);
                Ok(Outcome::ItemUsed { item, effect })
            }
        }
    }

    /// Advances the turn, records the notifications and dispatches them.
    fn commit(&mut self, notifications: Vec<Notification>) {
        self.state.turn = self.state.turn.saturating_add(1);
        let turn = self.state.turn;
        for notification in &notifications {
            self.state
                .log
                .push(EventRecord::new(turn, notification.clone()));
        }

        for notification in &notifications {
            for observer in &self.observers {
                observer.on_state_changed(notification);
            }
        }
    }

    pub(crate) fn state(&self) -> &GameState {
        &self.state
    }
}

fn surrounding_rooms(maze: &Maze) -> Vec<RoomCoord> {
    let player = maze.player();
    let mut rooms = Vec::new();
    for row in player.row().saturating_sub(1)..=player.row().saturating_add(1) {
        for column in player.column().saturating_sub(1)..=player.column().saturating_add(1) {
            let coord = RoomCoord::new(row, column);
            if maze.contains(coord) {
                rooms.push(coord);
            }
        }
    }
    rooms
}

/// Applies the provided command to the session.
pub fn apply(session: &mut Session, command: Command) -> Result<Outcome, GameError> {
    match command {
        Command::AttemptMove { direction } => session.attempt_move(direction),
        Command::SubmitAnswer { answer } => session.submit_answer(&answer),
        Command::UseItem { item } => session.use_item(item),
    }
}

/// Shared handle to a session for adapters whose observers hold on to it.
///
/// Every call fails with [`GameError::Reentrancy`] while the session is
/// already borrowed, which is the case during notification dispatch.
#[derive(Clone, Debug)]
pub struct SharedSession {
    inner: Rc<RefCell<Session>>,
}

impl SharedSession {
    /// Wraps a session for shared use.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            inner: Rc::new(RefCell::new(session)),
        }
    }

    /// Applies a command unless the session is busy.
    pub fn apply(&self, command: Command) -> Result<Outcome, GameError> {
        let mut session = self
            .inner
            .try_borrow_mut()
            .map_err(|_| GameError::Reentrancy)?;
        apply(&mut session, command)
    }

    /// Runs a read-only query unless the session is busy.
    pub fn read<R>(&self, query: impl FnOnce(&Session) -> R) -> Result<R, GameError> {
        let session = self.inner.try_borrow().map_err(|_| GameError::Reentrancy)?;
        Ok(query(&session))
    }

    /// Registers an observer unless the session is busy.
    pub fn register(&self, observer: Rc<dyn Observer>) -> Result<bool, GameError> {
        let mut session = self
            .inner
            .try_borrow_mut()
            .map_err(|_| GameError::Reentrancy)?;
        Ok(session.register(observer))
    }

    /// Saves the game unless the session is busy.
    pub fn save(&self) -> Result<Vec<u8>, GameError> {
        self.read(Session::save)
    }

    /// Restores a saved game unless the session is busy.
    pub fn restore(&self, bytes: &[u8]) -> Result<(), GameError> {
        let mut session = self
            .inner
            .try_borrow_mut()
            .map_err(|_| GameError::Reentrancy)?;
        session.restore(bytes)
    }
}
