//! Room graph, player position and seeded maze generation.

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use trivia_maze_core::{
    Direction, DoorId, GenerationError, ItemKind, RoomCoord, RoomKind, BASIS_POINTS_SCALE,
};

use crate::{
    door::Door,
    navigation::{may_become_passable, NavigationField},
};

/// Largest supported number of rows or columns.
pub const MAX_DIMENSION: u32 = 64;

/// Number of generation attempts before giving up on a configuration.
pub const MAX_GENERATION_ATTEMPTS: u32 = 8;

/// Parameters consumed by [`Maze::generate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MazeParameters {
    /// Number of room columns.
    pub width: u32,
    /// Number of room rows.
    pub height: u32,
    /// Seed driving every random decision of the generator.
    pub seed: u64,
    /// Probability, in basis points, that a wall between two rooms becomes an extra door.
    pub extra_door_density_bps: u16,
    /// Number of item caches to place.
    pub item_count: u32,
}

/// A maze cell; node in the traversal graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    coord: RoomCoord,
    doors: [Option<DoorId>; 4],
    visited: bool,
    revealed: bool,
    kind: RoomKind,
    item: Option<ItemKind>,
}

impl Room {
    fn new(coord: RoomCoord) -> Self {
        Self {
            coord,
            doors: [None; 4],
            visited: false,
            revealed: false,
            kind: RoomKind::Plain,
            item: None,
        }
    }

    /// Coordinate identifying the room.
    #[must_use]
    pub const fn coord(&self) -> RoomCoord {
        self.coord
    }

    /// Door in `direction`, if one was carved.
    #[must_use]
    pub const fn door(&self, direction: Direction) -> Option<DoorId> {
        self.doors[direction.slot()]
    }

    /// Whether the player has stood in the room.
    #[must_use]
    pub const fn visited(&self) -> bool {
        self.visited
    }

    /// Whether a vision potion revealed the room.
    #[must_use]
    pub const fn revealed(&self) -> bool {
        self.revealed
    }

    /// Role of the room.
    #[must_use]
    pub const fn kind(&self) -> RoomKind {
        self.kind
    }

    /// Item still lying in the room.
    #[must_use]
    pub const fn item(&self) -> Option<ItemKind> {
        self.item
    }

    pub(crate) fn mark_visited(&mut self) {
        self.visited = true;
    }

    pub(crate) fn mark_revealed(&mut self) {
        self.revealed = true;
    }

    pub(crate) fn take_item(&mut self) -> Option<ItemKind> {
        self.item.take()
    }
}

/// Grid of rooms joined by doors, plus the player's position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maze {
    width: u32,
    height: u32,
    rooms: Vec<Room>,
    doors: Vec<Door>,
    entrance: RoomCoord,
    exit: RoomCoord,
    player: RoomCoord,
}

impl Maze {
    /// Generates a solvable maze, retrying with derived seeds when needed.
    pub fn generate(parameters: &MazeParameters) -> Result<Self, GenerationError> {
        validate_parameters(parameters)?;

        let mut seed = parameters.seed;
        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let maze = carve(parameters, seed);
            let field = NavigationField::toward(&maze, maze.exit, |_| true);
            if field.reaches(maze.entrance) {
                tracing::debug!(
                    attempt,
                    seed,
                    doors = maze.doors.len(),
                    "generated {}x{} maze",
                    parameters.width,
                    parameters.height
                );
                return Ok(maze);
            }

            tracing::warn!(attempt, seed, "generated maze has no entrance-to-exit path");
            seed = derive_retry_seed(seed, attempt);
        }

        Err(GenerationError::Unsolvable {
            attempts: MAX_GENERATION_ATTEMPTS,
        })
    }

    /// Number of columns and rows.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Room the player starts in.
    #[must_use]
    pub const fn entrance(&self) -> RoomCoord {
        self.entrance
    }

    /// Room the player must reach.
    #[must_use]
    pub const fn exit(&self) -> RoomCoord {
        self.exit
    }

    /// Room the player currently occupies.
    #[must_use]
    pub const fn player(&self) -> RoomCoord {
        self.player
    }

    /// Reports whether `coord` lies inside the grid.
    #[must_use]
    pub const fn contains(&self, coord: RoomCoord) -> bool {
        coord.row() < self.height && coord.column() < self.width
    }

    /// Room at `coord`.
    #[must_use]
    pub fn room(&self, coord: RoomCoord) -> Option<&Room> {
        self.room_index(coord).and_then(|index| self.rooms.get(index))
    }

    /// Rooms in row-major order.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter()
    }

    /// Door with the provided identifier.
    #[must_use]
    pub fn door(&self, id: DoorId) -> Option<&Door> {
        usize::try_from(id.get())
            .ok()
            .and_then(|index| self.doors.get(index))
    }

    /// All doors in identifier order.
    pub fn doors(&self) -> impl Iterator<Item = &Door> {
        self.doors.iter()
    }

    /// Door leaving `coord` in `direction`.
    #[must_use]
    pub fn door_toward(&self, coord: RoomCoord, direction: Direction) -> Option<DoorId> {
        self.room(coord).and_then(|room| room.door(direction))
    }

    /// Doors leaving `coord`, paired with their direction.
    pub fn doors_of(&self, coord: RoomCoord) -> impl Iterator<Item = (Direction, &Door)> + '_ {
        let room = self.room(coord);
        Direction::ALL.into_iter().filter_map(move |direction| {
            room.and_then(|room| room.door(direction))
                .and_then(|id| self.door(id))
                .map(|door| (direction, door))
        })
    }

    /// Reports whether the exit can still be reached from `from` through doors
    /// that are not sealed.
    #[must_use]
    pub fn exit_reachable_from(&self, from: RoomCoord) -> bool {
        NavigationField::toward(self, self.exit, may_become_passable).reaches(from)
    }

    pub(crate) fn door_mut(&mut self, id: DoorId) -> Option<&mut Door> {
        usize::try_from(id.get())
            .ok()
            .and_then(|index| self.doors.get_mut(index))
    }

    pub(crate) fn room_mut(&mut self, coord: RoomCoord) -> Option<&mut Room> {
        self.room_index(coord)
            .and_then(|index| self.rooms.get_mut(index))
    }

    pub(crate) fn set_player(&mut self, coord: RoomCoord) {
        self.player = coord;
        if let Some(room) = self.room_mut(coord) {
            room.mark_visited();
        }
    }

    /// Checks the structural invariants of a deserialised maze.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if !dimensions_supported(self.width, self.height) {
            return Err(format!(
                "unsupported dimensions {}x{}",
                self.width, self.height
            ));
        }

        let expected_rooms = usize::try_from(u64::from(self.width) * u64::from(self.height))
            .map_err(|_| "room count overflows".to_owned())?;
        if self.rooms.len() != expected_rooms {
            return Err(format!(
                "expected {expected_rooms} rooms, found {}",
                self.rooms.len()
            ));
        }

        for (name, coord) in [
            ("entrance", self.entrance),
            ("exit", self.exit),
            ("player", self.player),
        ] {
            if !self.contains(coord) {
                return Err(format!("{name} {coord} lies outside the grid"));
            }
        }
        if self.entrance == self.exit {
            return Err("entrance and exit coincide".to_owned());
        }

        for (index, room) in self.rooms.iter().enumerate() {
            if self.room_index(room.coord) != Some(index) {
                return Err(format!("room {} is stored out of order", room.coord));
            }
            for direction in Direction::ALL {
                let Some(id) = room.door(direction) else {
                    continue;
                };
                let door = self
                    .door(id)
                    .ok_or_else(|| format!("room {} references missing door", room.coord))?;
                let far_side = door
                    .other_side(room.coord)
                    .filter(|far| room.coord.direction_to(*far) == Some(direction));
                if far_side.is_none() {
                    return Err(format!(
                        "door {} does not lead {direction} from {}",
                        id.get(),
                        room.coord
                    ));
                }
            }
        }

        for (index, door) in self.doors.iter().enumerate() {
            if usize::try_from(door.id().get()).ok() != Some(index) {
                return Err(format!("door {} is stored out of order", door.id().get()));
            }
            if !door.is_consistent() {
                return Err(format!("door {} is inconsistent", door.id().get()));
            }
            let [first, second] = door.rooms();
            let Some(direction) = first.direction_to(second) else {
                return Err(format!("door {} joins distant rooms", door.id().get()));
            };
            if self.door_toward(first, direction) != Some(door.id())
                || self.door_toward(second, direction.opposite()) != Some(door.id())
            {
                return Err(format!("door {} is detached", door.id().get()));
            }
        }

        if !self.room(self.player).is_some_and(Room::visited) {
            return Err("player room is not marked visited".to_owned());
        }

        Ok(())
    }

    fn room_index(&self, coord: RoomCoord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let row = usize::try_from(coord.row()).ok()?;
        let column = usize::try_from(coord.column()).ok()?;
        let width = usize::try_from(self.width).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    fn empty(width: u32, height: u32) -> Self {
        let mut rooms = Vec::new();
        for row in 0..height {
            for column in 0..width {
                rooms.push(Room::new(RoomCoord::new(row, column)));
            }
        }

        let entrance = RoomCoord::new(0, 0);
        let exit = RoomCoord::new(height.saturating_sub(1), width.saturating_sub(1));
        let mut maze = Self {
            width,
            height,
            rooms,
            doors: Vec::new(),
            entrance,
            exit,
            player: entrance,
        };
        if let Some(room) = maze.room_mut(entrance) {
            room.kind = RoomKind::Entrance;
        }
        if let Some(room) = maze.room_mut(exit) {
            room.kind = RoomKind::Exit;
        }
        maze.set_player(entrance);
        maze
    }

    fn connect(&mut self, from: RoomCoord, direction: Direction) -> bool {
        let Some(to) = from.neighbor(direction, self.height, self.width) else {
            return false;
        };
        if self.door_toward(from, direction).is_some() {
            return false;
        }
        let Ok(raw_id) = u32::try_from(self.doors.len()) else {
            return false;
        };

        let id = DoorId::new(raw_id);
        self.doors.push(Door::new(id, from, to));
        if let Some(room) = self.room_mut(from) {
            room.doors[direction.slot()] = Some(id);
        }
        if let Some(room) = self.room_mut(to) {
            room.doors[direction.opposite().slot()] = Some(id);
        }
        true
    }

    #[cfg(test)]
    pub(crate) fn fully_connected(width: u32, height: u32) -> Self {
        let mut maze = Self::empty(width, height);
        for row in 0..height {
            for column in 0..width {
                for direction in [Direction::East, Direction::South] {
                    let _ = maze.connect(RoomCoord::new(row, column), direction);
                }
            }
        }
        maze
    }
}

fn dimensions_supported(width: u32, height: u32) -> bool {
    (1..=MAX_DIMENSION).contains(&width)
        && (1..=MAX_DIMENSION).contains(&height)
        && width * height >= 2
}

fn validate_parameters(parameters: &MazeParameters) -> Result<(), GenerationError> {
    if !dimensions_supported(parameters.width, parameters.height) {
        return Err(GenerationError::InvalidDimensions {
            width: parameters.width,
            height: parameters.height,
        });
    }

    if parameters.extra_door_density_bps > BASIS_POINTS_SCALE {
        return Err(GenerationError::InvalidDensity {
            bps: parameters.extra_door_density_bps,
        });
    }

    let capacity = parameters.width * parameters.height - 2;
    if parameters.item_count > capacity {
        return Err(GenerationError::TooManyItems {
            requested: parameters.item_count,
            capacity,
        });
    }

    Ok(())
}

/// Randomized depth-first carving followed by extra doors and item caches.
fn carve(parameters: &MazeParameters, seed: u64) -> Maze {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut maze = Maze::empty(parameters.width, parameters.height);

    let mut carved = vec![false; maze.rooms.len()];
    let mut stack = vec![maze.entrance];
    if let Some(index) = maze.room_index(maze.entrance) {
        carved[index] = true;
    }

    while let Some(&current) = stack.last() {
        let candidates: Vec<(Direction, RoomCoord)> = Direction::ALL
            .into_iter()
            .filter_map(|direction| {
                current
                    .neighbor(direction, maze.height, maze.width)
                    .map(|next| (direction, next))
            })
            .filter(|(_, next)| {
                maze.room_index(*next)
                    .is_some_and(|index| !carved[index])
            })
            .collect();

        let Some(&(direction, next)) = candidates.choose(&mut rng) else {
            let _ = stack.pop();
            continue;
        };

        let _ = maze.connect(current, direction);
        if let Some(index) = maze.room_index(next) {
            carved[index] = true;
        }
        stack.push(next);
    }

    let density = parameters.extra_door_density_bps;
    if density > 0 {
        for row in 0..maze.height {
            for column in 0..maze.width {
                let coord = RoomCoord::new(row, column);
                for direction in [Direction::East, Direction::South] {
                    if coord.neighbor(direction, maze.height, maze.width).is_none()
                        || maze.door_toward(coord, direction).is_some()
                    {
                        continue;
                    }
                    if rng.gen_range(0..BASIS_POINTS_SCALE) < density {
                        let _ = maze.connect(coord, direction);
                    }
                }
            }
        }
    }

    let mut caches: Vec<RoomCoord> = maze
        .rooms
        .iter()
        .map(Room::coord)
        .filter(|coord| *coord != maze.entrance && *coord != maze.exit)
        .collect();
    caches.shuffle(&mut rng);
    let item_count = usize::try_from(parameters.item_count).unwrap_or(usize::MAX);
    for (index, coord) in caches.into_iter().take(item_count).enumerate() {
        if let Some(room) = maze.room_mut(coord) {
            room.kind = RoomKind::ItemCache;
            room.item = Some(ItemKind::ALL[index % ItemKind::ALL.len()]);
        }
    }

    maze
}

fn derive_retry_seed(seed: u64, attempt: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(attempt.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(bytes)
}
