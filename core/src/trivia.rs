use serde::{Deserialize, Serialize};

use crate::{Direction, DoorId, ProviderError};

/// Supplies trivia items to the session.
///
/// Implementations must be deterministic for a given store state but may
/// return different items across calls. The call is synchronous; a failure
/// leaves the requesting door untouched so the move can be retried.
///
/// Providers whose draw order depends on internal state expose that state
/// through [`QuestionProvider::snapshot`] so saved games resume with the same
/// questions they would have asked.
pub trait QuestionProvider {
    /// Produces the next trivia item, preferring `category_hint` when given.
    fn next_question(&mut self, category_hint: Option<&str>) -> Result<TriviaItem, ProviderError>;

    /// Opaque draw position stored alongside saved games.
    fn snapshot(&self) -> Option<String> {
        None
    }

    /// Resumes from a value produced by [`QuestionProvider::snapshot`].
    ///
    /// A rejected snapshot must leave the provider unchanged.
    fn restore(&mut self, snapshot: &str) -> Result<(), ProviderError> {
        let _ = snapshot;
        Ok(())
    }
}

impl<P: QuestionProvider + ?Sized> QuestionProvider for Box<P> {
    fn next_question(&mut self, category_hint: Option<&str>) -> Result<TriviaItem, ProviderError> {
        (**self).next_question(category_hint)
    }

    fn snapshot(&self) -> Option<String> {
        (**self).snapshot()
    }

    fn restore(&mut self, snapshot: &str) -> Result<(), ProviderError> {
        (**self).restore(snapshot)
    }
}

/// Format of a trivia question.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Answer is either "true" or "false".
    TrueFalse,
    /// Answer is one of the listed choices.
    MultipleChoice,
    /// Answer is free text.
    ShortAnswer,
}

/// Question together with the data needed to check an answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriviaItem {
    /// Format of the question.
    pub kind: QuestionKind,
    /// Topic the question belongs to.
    #[serde(default)]
    pub category: String,
    /// Question text shown to the player.
    pub prompt: String,
    /// Ordered choices offered to the player; empty for short answers.
    #[serde(default)]
    pub choices: Vec<String>,
    /// Accepted answer.
    pub answer: String,
}

impl TriviaItem {
    /// Creates a true/false question.
    #[must_use]
    pub fn true_false(category: &str, prompt: &str, answer: bool) -> Self {
        Self {
            kind: QuestionKind::TrueFalse,
            category: category.to_owned(),
            prompt: prompt.to_owned(),
            choices: vec!["True".to_owned(), "False".to_owned()],
            answer: if answer { "True" } else { "False" }.to_owned(),
        }
    }

    /// Creates a multiple-choice question whose answer is one of `choices`.
    #[must_use]
    pub fn multiple_choice(category: &str, prompt: &str, choices: &[&str], answer: &str) -> Self {
        Self {
            kind: QuestionKind::MultipleChoice,
            category: category.to_owned(),
            prompt: prompt.to_owned(),
            choices: choices.iter().map(|choice| (*choice).to_owned()).collect(),
            answer: answer.to_owned(),
        }
    }

    /// Creates a short-answer question.
    #[must_use]
    pub fn short_answer(category: &str, prompt: &str, answer: &str) -> Self {
        Self {
            kind: QuestionKind::ShortAnswer,
            category: category.to_owned(),
            prompt: prompt.to_owned(),
            choices: Vec::new(),
            answer: answer.to_owned(),
        }
    }

    /// Checks a candidate answer, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn check(&self, candidate: &str) -> bool {
        normalize(candidate) == normalize(&self.answer)
    }

    /// Produces a hint for the question, if its format supports one.
    ///
    /// Multiple-choice hints name two wrong choices. Short-answer hints show
    /// every other letter of each word, starting with the first.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self.kind {
            QuestionKind::TrueFalse => None,
            QuestionKind::MultipleChoice => {
                let wrong: Vec<&str> = self
                    .choices
                    .iter()
                    .filter(|choice| !self.check(choice))
                    .take(2)
                    .map(String::as_str)
                    .collect();
                if wrong.is_empty() {
                    return None;
                }
                Some(format!(
                    "The correct answer is not one of: {}",
                    wrong.join(", ")
                ))
            }
            QuestionKind::ShortAnswer => {
                let masked: Vec<String> = self
                    .answer
                    .split_whitespace()
                    .map(|word| {
                        word.chars()
                            .enumerate()
                            .map(|(index, letter)| if index % 2 == 0 { letter } else { '_' })
                            .collect()
                    })
                    .collect();
                if masked.is_empty() {
                    return None;
                }
                Some(format!("Hint: {}", masked.join(" ")))
            }
        }
    }

    /// Builds the answer-free view presented to the player.
    #[must_use]
    pub fn challenge(&self, door: DoorId, direction: Direction) -> ChallengeView {
        ChallengeView {
            door,
            direction,
            kind: self.kind,
            category: self.category.clone(),
            prompt: self.prompt.clone(),
            choices: self.choices.clone(),
        }
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Challenge presented when the player tries a door, without its answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeView {
    /// Door guarded by the challenge.
    pub door: DoorId,
    /// Direction of the door from the player's room.
    pub direction: Direction,
    /// Format of the question.
    pub kind: QuestionKind,
    /// Topic of the question.
    pub category: String,
    /// Question text.
    pub prompt: String,
    /// Ordered choices; empty for short answers.
    pub choices: Vec<String>,
}
