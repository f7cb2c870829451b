//! Plain-text presentation of session notifications and the maze.

use std::fmt::Write as _;

use trivia_maze_core::{
    Direction, DoorState, GameStatus, ItemEffect, Notification, QuestionKind, RoomCoord,
};
use trivia_maze_world::{Maze, Observer};

/// Observer that prints every notification to stdout.
#[derive(Debug, Default)]
pub(crate) struct TextView;

impl Observer for TextView {
    fn on_state_changed(&self, notification: &Notification) {
        println!("{}", describe(notification));
    }
}

/// Renders a notification as player-facing text.
pub(crate) fn describe(notification: &Notification) -> String {
    match notification {
        Notification::Moved { to, .. } => format!("You step into room {to}."),
        Notification::DoorChallenge { challenge } => {
            let mut text = format!(
                "The {} door asks a {} question:\n  {}",
                challenge.direction, challenge.category, challenge.prompt
            );
            match challenge.kind {
                QuestionKind::TrueFalse => text.push_str("\n  (true or false)"),
                QuestionKind::MultipleChoice => {
                    for (number, choice) in challenge.choices.iter().enumerate() {
                        let _ = write!(text, "\n  {}) {choice}", number + 1);
                    }
                }
                QuestionKind::ShortAnswer => {}
            }
            text
        }
        Notification::DoorResolved {
            direction, state, ..
        } => match state {
            DoorState::Open => format!("Correct! The {direction} door swings open."),
            DoorState::Sealed => format!("Wrong answer. The {direction} door seals shut."),
            other => format!("The {direction} door is now {other:?}."),
        },
        Notification::ItemChanged {
            item,
            count,
            effect,
        } => match effect {
            ItemEffect::PickedUp { .. } => format!("You found a {item}. You now hold {count}."),
            ItemEffect::Hint { text } => format!("The {item} whispers: {text}"),
            ItemEffect::Revealed { rooms } => {
                format!("The {item} reveals {} rooms around you.", rooms.len())
            }
            ItemEffect::Unlocked { .. } => format!("The {item} turns in the lock."),
        },
        Notification::StatusChanged { status } => match status {
            GameStatus::InProgress => "A new maze awaits.".to_owned(),
            GameStatus::Won => "You reached the exit. You win!".to_owned(),
            GameStatus::Lost => {
                "Every route to the exit is sealed. Game over.".to_owned()
            }
        },
    }
}

/// Draws the maze as ASCII art, showing only what the player has seen.
///
/// `@` marks the player, `X` the exit, `*` a known item. Doors render as a gap
/// when open, `?` when untried, `!` while a question is pending and `#` once
/// sealed.
pub(crate) fn render_map(maze: &Maze) -> String {
    let (width, height) = maze.dimensions();
    let mut map = String::new();

    map.push('+');
    for _ in 0..width {
        map.push_str("---+");
    }
    map.push('\n');

    for row in 0..height {
        map.push('|');
        for column in 0..width {
            let coord = RoomCoord::new(row, column);
            let _ = write!(map, " {} ", room_glyph(maze, coord));
            map.push(door_glyph(maze, coord, Direction::East).unwrap_or('|'));
        }
        map.push('\n');

        map.push('+');
        for column in 0..width {
            let coord = RoomCoord::new(row, column);
            let glyph = door_glyph(maze, coord, Direction::South).unwrap_or('-');
            let _ = write!(map, "-{glyph}-+");
        }
        map.push('\n');
    }

    map
}

fn is_known(maze: &Maze, coord: RoomCoord) -> bool {
    maze.room(coord)
        .is_some_and(|room| room.visited() || room.revealed())
}

fn room_glyph(maze: &Maze, coord: RoomCoord) -> char {
    if coord == maze.player() {
        return '@';
    }
    if coord == maze.exit() {
        return 'X';
    }
    match maze.room(coord) {
        Some(room) if room.visited() || room.revealed() => {
            if room.item().is_some() {
                '*'
            } else {
                '.'
            }
        }
        _ => ' ',
    }
}

/// Glyph for the door leaving `coord`, or `None` where a wall is drawn.
fn door_glyph(maze: &Maze, coord: RoomCoord, direction: Direction) -> Option<char> {
    let (width, height) = maze.dimensions();
    let neighbor = coord.neighbor(direction, height, width)?;
    if !is_known(maze, coord) && !is_known(maze, neighbor) {
        return None;
    }
    let door = maze.door(maze.door_toward(coord, direction)?)?;
    Some(match door.state() {
        DoorState::Open => ' ',
        DoorState::Unexplored => '?',
        DoorState::InChallenge => '!',
        DoorState::Sealed => '#',
    })
}
