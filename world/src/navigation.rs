//! Door-aware distance field used for solvability and loss checks.

use std::collections::VecDeque;

use trivia_maze_core::{DoorState, RoomCoord};

use crate::maze::Maze;

/// Dense door-step distances seeded from a single goal room.
///
/// The field stores the reverse breadth-first search results over doors whose
/// state satisfies the caller's predicate. Distances default to `u16::MAX`
/// for rooms that cannot reach the goal.
#[derive(Clone, Debug, Default)]
pub(crate) struct NavigationField {
    width: u32,
    height: u32,
    distances: Vec<u16>,
}

impl NavigationField {
    /// Builds a field toward `goal` crossing only doors accepted by `is_passable`.
    pub(crate) fn toward<F>(maze: &Maze, goal: RoomCoord, is_passable: F) -> Self
    where
        F: FnMut(DoorState) -> bool,
    {
        let mut field = Self::default();
        field.rebuild_with(maze, goal, is_passable);
        field
    }

    /// Rebuilds the navigation distances using a reverse breadth-first search.
    pub(crate) fn rebuild_with<F>(&mut self, maze: &Maze, goal: RoomCoord, mut is_passable: F)
    where
        F: FnMut(DoorState) -> bool,
    {
        let (width, height) = maze.dimensions();
        let width_usize = usize::try_from(width).unwrap_or(0);
        let height_usize = usize::try_from(height).unwrap_or(0);
        let room_count = width_usize.checked_mul(height_usize).unwrap_or(0);

        self.width = width;
        self.height = height;

        if room_count == 0 {
            self.distances.clear();
            return;
        }

        if self.distances.len() != room_count {
            self.distances = vec![u16::MAX; room_count];
        } else {
            self.distances.fill(u16::MAX);
        }

        let Some(goal_index) = index(width_usize, goal).filter(|_| maze.contains(goal)) else {
            return;
        };

        self.distances[goal_index] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(goal);

        while let Some(room) = queue.pop_front() {
            let Some(current_index) = index(width_usize, room) else {
                continue;
            };
            let current_distance = self.distances[current_index];

            if current_distance >= u16::MAX.saturating_sub(1) {
                continue;
            }

            let next_distance = current_distance + 1;

            for (_, door) in maze.doors_of(room) {
                if !is_passable(door.state()) {
                    continue;
                }

                let Some(neighbor) = door.other_side(room) else {
                    continue;
                };

                let Some(neighbor_index) = index(width_usize, neighbor) else {
                    continue;
                };

                if self.distances[neighbor_index] <= next_distance {
                    continue;
                }

                self.distances[neighbor_index] = next_distance;
                queue.push_back(neighbor);
            }
        }
    }

    /// Distance captured for the provided room, if it lies within the field.
    #[must_use]
    pub(crate) fn distance(&self, room: RoomCoord) -> Option<u16> {
        if room.column() >= self.width || room.row() >= self.height {
            return None;
        }

        let width = usize::try_from(self.width).ok()?;
        index(width, room).and_then(|offset| self.distances.get(offset).copied())
    }

    /// Reports whether `room` can reach the goal.
    #[must_use]
    pub(crate) fn reaches(&self, room: RoomCoord) -> bool {
        self.distance(room).is_some_and(|distance| distance != u16::MAX)
    }
}

/// Every door that is not sealed may still be crossed eventually.
pub(crate) fn may_become_passable(state: DoorState) -> bool {
    state.may_become_passable()
}

fn index(width: usize, room: RoomCoord) -> Option<usize> {
    let column = usize::try_from(room.column()).ok()?;
    let row = usize::try_from(room.row()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}
