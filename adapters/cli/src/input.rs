//! Parsing of typed lines into adapter actions.

use std::path::PathBuf;

use trivia_maze_core::{ChallengeView, Command, Direction, ItemKind, QuestionKind};

/// Action requested by one line of player input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Input {
    /// Command forwarded to the session.
    Command(Command),
    /// Redraw the map.
    Map,
    /// List held items.
    Inventory,
    /// Write a save file, optionally to a path other than the configured one.
    Save(Option<PathBuf>),
    /// Restore a save file, optionally from a path other than the configured one.
    Load(Option<PathBuf>),
    /// Start a fresh game with the configured parameters.
    NewGame,
    /// Show the command summary.
    Help,
    /// Leave the game.
    Quit,
}

/// Command summary printed by `help`.
pub(crate) const HELP: &str = "\
Commands:
  north | east | south | west   try the door in that direction (n, e, s, w)
  answer <text>                 answer the open challenge
  <text>                        answers the open challenge as well
  use key | suggestion | vision use an item
  inventory                     list held items
  map                           draw the maze
  save [path] | load [path]     save or restore the game
  new                           start a new maze
  quit                          leave the game";

impl Input {
    /// Parses a line against the pending `challenge`, if any.
    ///
    /// A line naming one of the challenge's choices is always an answer, even
    /// when it doubles as a command word. Other text that is not a command is
    /// taken as an answer while a challenge is pending.
    pub(crate) fn parse(line: &str, challenge: Option<&ChallengeView>) -> Result<Self, String> {
        let line = line.trim();
        if challenge.is_some_and(|challenge| names_choice(challenge, line)) {
            return Ok(Self::Command(Command::SubmitAnswer {
                answer: line.to_owned(),
            }));
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Err("Type `help` for a list of commands.".to_owned()),
            "quit" | "q" => Ok(Self::Quit),
            "help" | "?" => Ok(Self::Help),
            "map" | "m" => Ok(Self::Map),
            "inventory" | "inv" | "i" => Ok(Self::Inventory),
            "new" => Ok(Self::NewGame),
            "save" => Ok(Self::Save(optional_path(rest))),
            "load" => Ok(Self::Load(optional_path(rest))),
            "use" => rest
                .parse::<ItemKind>()
                .map(|item| Self::Command(Command::UseItem { item }))
                .map_err(|error| error.to_string()),
            "go" | "move" => rest
                .parse::<Direction>()
                .map(|direction| Self::Command(Command::AttemptMove { direction }))
                .map_err(|error| error.to_string()),
            "answer" if !rest.is_empty() => Ok(Self::Command(Command::SubmitAnswer {
                answer: rest.to_owned(),
            })),
            _ => {
                if rest.is_empty() {
                    if let Ok(direction) = word.parse::<Direction>() {
                        return Ok(Self::Command(Command::AttemptMove { direction }));
                    }
                }
                if challenge.is_some() {
                    return Ok(Self::Command(Command::SubmitAnswer {
                        answer: line.to_owned(),
                    }));
                }
                Err(format!(
                    "Unknown command `{word}`. Type `help` for a list of commands."
                ))
            }
        }
    }
}

fn names_choice(challenge: &ChallengeView, line: &str) -> bool {
    challenge
        .choices
        .iter()
        .any(|choice| choice.trim().eq_ignore_ascii_case(line))
}

fn optional_path(rest: &str) -> Option<PathBuf> {
    (!rest.is_empty()).then(|| PathBuf::from(rest))
}

/// Maps a numbered pick such as `2` onto the text of that multiple-choice option.
pub(crate) fn resolve_choice(answer: String, challenge: Option<&ChallengeView>) -> String {
    let Some(challenge) = challenge else {
        return answer;
    };
    if challenge.kind != QuestionKind::MultipleChoice {
        return answer;
    }
    answer
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|number| number.checked_sub(1))
        .and_then(|index| challenge.choices.get(index))
        .cloned()
        .unwrap_or(answer)
}
