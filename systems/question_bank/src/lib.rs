#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! In-memory question store that feeds trivia items to game sessions.
//!
//! Questions are loaded from TOML documents made of `[[questions]]` tables
//! and validated up front. Draws are driven by a seeded `ChaCha8Rng` and never
//! repeat a question within a category until every question of that category
//! has been asked once.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trivia_maze_core::{ProviderError, QuestionKind, QuestionProvider, TriviaItem};

/// Question bank shipped with the game.
pub const BUNDLED_QUESTIONS: &str = include_str!("../data/questions.toml");

/// Errors raised while building a question bank.
#[derive(Debug, Error)]
pub enum BankError {
    /// The TOML document could not be parsed.
    #[error("could not parse question bank: {0}")]
    Parse(#[from] toml::de::Error),
    /// A question failed validation.
    #[error("question {index} is invalid: {reason}")]
    InvalidQuestion {
        /// Zero-based position of the question in the document.
        index: usize,
        /// Description of the problem.
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
struct QuestionFile {
    #[serde(default)]
    questions: Vec<TriviaItem>,
}

/// Resumable draw position of a [`QuestionBank`].
#[derive(Debug, Serialize, Deserialize)]
struct Cursor {
    seed: [u8; 32],
    stream: u64,
    word_pos: u128,
    asked: Vec<bool>,
}

/// Seeded question store implementing [`QuestionProvider`].
#[derive(Clone, Debug)]
pub struct QuestionBank {
    questions: Vec<TriviaItem>,
    asked: Vec<bool>,
    rng: ChaCha8Rng,
}

impl QuestionBank {
    /// Creates a bank from already-built questions.
    pub fn new(questions: Vec<TriviaItem>, seed: u64) -> Result<Self, BankError> {
        let questions = questions
            .into_iter()
            .enumerate()
            .map(|(index, question)| {
                normalize(question)
                    .map_err(|reason| BankError::InvalidQuestion { index, reason })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(questions = questions.len(), seed, "question bank ready");
        Ok(Self {
            asked: vec![false; questions.len()],
            questions,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Parses a bank from a TOML document.
    pub fn from_toml_str(contents: &str, seed: u64) -> Result<Self, BankError> {
        let file: QuestionFile = toml::from_str(contents)?;
        Self::new(file.questions, seed)
    }

    /// Builds the bank shipped with the game.
    pub fn bundled(seed: u64) -> Result<Self, BankError> {
        Self::from_toml_str(BUNDLED_QUESTIONS, seed)
    }

    /// Number of questions in the bank.
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Reports whether the bank holds no questions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Distinct categories, in order of first appearance.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for question in &self.questions {
            if !categories.contains(&question.category.as_str()) {
                categories.push(&question.category);
            }
        }
        categories
    }

    fn matching(&self, category_hint: Option<&str>) -> Vec<usize> {
        self.questions
            .iter()
            .enumerate()
            .filter(|(_, question)| {
                category_hint.map_or(true, |hint| question.category.eq_ignore_ascii_case(hint))
            })
            .map(|(index, _)| index)
            .collect()
    }
}

impl QuestionProvider for QuestionBank {
    fn next_question(&mut self, category_hint: Option<&str>) -> Result<TriviaItem, ProviderError> {
        let candidates = self.matching(category_hint);
        if candidates.is_empty() {
            return Err(ProviderError::NoQuestions {
                category: category_hint.map(str::to_owned),
            });
        }

        let mut fresh: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|index| !self.asked[*index])
            .collect();
        if fresh.is_empty() {
            tracing::debug!(category = ?category_hint, "every question asked; reshuffling");
            for index in &candidates {
                self.asked[*index] = false;
            }
            fresh = candidates;
        }

        let choice = fresh[self.rng.gen_range(0..fresh.len())];
        self.asked[choice] = true;
        Ok(self.questions[choice].clone())
    }

    fn snapshot(&self) -> Option<String> {
        let cursor = Cursor {
            seed: self.rng.get_seed(),
            stream: self.rng.get_stream(),
            word_pos: self.rng.get_word_pos(),
            asked: self.asked.clone(),
        };
        serde_json::to_string(&cursor).ok()
    }

    fn restore(&mut self, snapshot: &str) -> Result<(), ProviderError> {
        let cursor: Cursor = serde_json::from_str(snapshot)
            .map_err(|error| ProviderError::InvalidSnapshot(error.to_string()))?;
        if cursor.asked.len() != self.questions.len() {
            return Err(ProviderError::InvalidSnapshot(format!(
                "saved position covers {} questions but the bank holds {}",
                cursor.asked.len(),
                self.questions.len()
            )));
        }

        let mut rng = ChaCha8Rng::from_seed(cursor.seed);
        rng.set_stream(cursor.stream);
        rng.set_word_pos(cursor.word_pos);
        self.rng = rng;
        self.asked = cursor.asked;
        tracing::debug!(
            asked = self.asked.iter().filter(|asked| **asked).count(),
            "question bank resumed"
        );
        Ok(())
    }
}

fn normalize(mut question: TriviaItem) -> Result<TriviaItem, String> {
    question.prompt = question.prompt.trim().to_owned();
    question.answer = question.answer.trim().to_owned();
    question.category = question.category.trim().to_lowercase();

    if question.prompt.is_empty() {
        return Err("prompt is empty".to_owned());
    }
    if question.answer.is_empty() {
        return Err("answer is empty".to_owned());
    }

    match question.kind {
        QuestionKind::TrueFalse => {
            if !question.check("true") && !question.check("false") {
                return Err(format!("'{}' is neither true nor false", question.answer));
            }
            if question.choices.is_empty() {
                question.choices = vec!["True".to_owned(), "False".to_owned()];
            }
        }
        QuestionKind::MultipleChoice => {
            if question.choices.len() < 2 {
                return Err("multiple choice needs at least two choices".to_owned());
            }
            if !question.choices.iter().any(|choice| question.check(choice)) {
                return Err(format!(
                    "answer '{}' is not among the choices",
                    question.answer
                ));
            }
        }
        QuestionKind::ShortAnswer => {
            if !question.choices.is_empty() {
                return Err("short answers take no choices".to_owned());
            }
        }
    }

    Ok(question)
}
