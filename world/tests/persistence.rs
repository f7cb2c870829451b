use std::{cell::RefCell, rc::Rc};

use trivia_maze_core::{
    ChallengeView, Command, CorruptSaveError, Direction, GameConfig, GameError, GameStatus,
    ItemKind, Notification, ProviderError, QuestionProvider, TriviaItem,
};
use trivia_maze_question_bank::QuestionBank;
use trivia_maze_world::{apply, query, Observer, Outcome, Session, SAVE_HEADER};

#[derive(Clone, Default)]
struct NumberedProvider {
    next: u32,
}

impl QuestionProvider for NumberedProvider {
    fn next_question(&mut self, _: Option<&str>) -> Result<TriviaItem, ProviderError> {
        self.next += 1;
        let answer = if self.next % 2 == 0 { "even" } else { "odd" };
        Ok(TriviaItem::short_answer(
            "parity",
            &format!("Is {} odd or even?", self.next),
            answer,
        ))
    }
}

#[derive(Default)]
struct Recorder {
    notifications: RefCell<Vec<Notification>>,
}

impl Observer for Recorder {
    fn on_state_changed(&self, notification: &Notification) {
        self.notifications.borrow_mut().push(notification.clone());
    }
}

fn config() -> GameConfig {
    GameConfig {
        width: 5,
        height: 4,
        seed: Some(2024),
        extra_door_density_bps: 4_000,
        item_count: 4,
        category: None,
    }
}

fn script() -> Vec<Command> {
    let mut commands = Vec::new();
    for direction in [
        Direction::East,
        Direction::South,
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::North,
    ] {
        commands.push(Command::AttemptMove { direction });
        commands.push(Command::SubmitAnswer {
            answer: "odd".to_owned(),
        });
        commands.push(Command::UseItem {
            item: ItemKind::VisionPotion,
        });
    }
    commands
}

fn run(session: &mut Session, commands: &[Command]) -> Vec<Result<Outcome, GameError>> {
    commands
        .iter()
        .cloned()
        .map(|command| apply(session, command))
        .collect()
}

#[test]
fn reloaded_session_behaves_like_the_original() {
    let provider = NumberedProvider::default();
    let mut original = Session::new(config(), Box::new(provider.clone())).expect("maze");
    let _ = original.attempt_move(Direction::East);
    let _ = original.attempt_move(Direction::South);

    let saved = original.save();
    assert!(saved.starts_with(SAVE_HEADER.as_bytes()));

    // The replay provider must have handed out the same questions as the live one.
    let mut replay_provider = provider;
    let asked = query::maze(&original)
        .doors()
        .filter(|door| door.trivia().is_some())
        .count();
    for _ in 0..asked {
        let _ = replay_provider.next_question(None);
    }
    let mut reloaded = Session::load(&saved, Box::new(replay_provider)).expect("save loads");

    let original_recorder = Rc::new(Recorder::default());
    let reloaded_recorder = Rc::new(Recorder::default());
    assert!(original.register(original_recorder.clone()));
    assert!(reloaded.register(reloaded_recorder.clone()));

    assert_eq!(query::turn(&reloaded), query::turn(&original));
    assert_eq!(query::event_log(&reloaded), query::event_log(&original));
    assert_eq!(
        query::pending_challenge(&reloaded),
        query::pending_challenge(&original)
    );
    assert!(query::pending_challenge(&reloaded).is_some());

    let commands = script();
    assert_eq!(run(&mut original, &commands), run(&mut reloaded, &commands));
    assert_eq!(
        *original_recorder.notifications.borrow(),
        *reloaded_recorder.notifications.borrow()
    );
    assert_eq!(original.save(), reloaded.save());
}

#[test]
fn save_is_stable_until_the_state_changes() {
    let mut session = Session::new(config(), Box::new(NumberedProvider::default())).expect("maze");
    let first = session.save();
    assert_eq!(session.save(), first);

    let _ = session.attempt_move(Direction::East);
    let _ = session.attempt_move(Direction::South);
    assert_ne!(session.save(), first);
}

#[test]
fn corrupt_restore_keeps_the_live_game() {
    let mut session = Session::new(config(), Box::new(NumberedProvider::default())).expect("maze");
    let _ = session.attempt_move(Direction::East);
    let _ = session.attempt_move(Direction::South);
    let before = session.save();

    assert_eq!(
        session.restore(b"not a save"),
        Err(GameError::CorruptSave(CorruptSaveError::InvalidPrefix))
    );
    let mut truncated = before.clone();
    truncated.truncate(before.len() / 2);
    assert!(matches!(
        session.restore(&truncated),
        Err(GameError::CorruptSave(_))
    ));

    assert_eq!(session.save(), before);
}

#[test]
fn restore_keeps_observers_and_provider() {
    let mut session = Session::new(config(), Box::new(NumberedProvider::default())).expect("maze");
    let snapshot = session.save();
    let _ = session.attempt_move(Direction::East);
    let _ = session.attempt_move(Direction::South);

    let recorder = Rc::new(Recorder::default());
    assert!(session.register(recorder.clone()));
    session.restore(&snapshot).expect("snapshot restores");
    assert!(recorder.notifications.borrow().is_empty());
    assert_eq!(query::turn(&session), 0);
    assert!(query::pending_challenge(&session).is_none());

    let _ = session.attempt_move(Direction::East);
    let _ = session.attempt_move(Direction::South);
    assert!(!recorder.notifications.borrow().is_empty());
}

#[test]
fn finished_games_stay_finished_after_loading() {
    let corridor = GameConfig {
        width: 2,
        height: 1,
        item_count: 0,
        ..config()
    };
    let mut session = Session::new(corridor, Box::new(NumberedProvider::default())).expect("maze");
    let _ = session.attempt_move(Direction::East).expect("challenge");
    let _ = session.submit_answer("odd").expect("answer accepted");
    assert_eq!(query::status(&session), GameStatus::Won);

    let mut loaded =
        Session::load(&session.save(), Box::new(NumberedProvider::default())).expect("loads");
    assert_eq!(query::status(&loaded), GameStatus::Won);
    assert_eq!(
        loaded.attempt_move(Direction::West),
        Err(GameError::GameOver {
            status: GameStatus::Won
        })
    );
}

fn bundled_config() -> GameConfig {
    GameConfig {
        width: 3,
        height: 3,
        seed: Some(7),
        extra_door_density_bps: 10_000,
        item_count: 0,
        category: None,
    }
}

fn bundled_bank() -> Box<QuestionBank> {
    Box::new(QuestionBank::bundled(7).expect("bundled bank"))
}

fn challenge_of(outcome: Result<Outcome, GameError>) -> ChallengeView {
    match outcome {
        Ok(Outcome::Challenged(challenge)) => challenge,
        other => panic!("expected a challenge, got {other:?}"),
    }
}

#[test]
fn bundled_bank_resumes_its_draw_order() {
    let mut original = Session::new(bundled_config(), bundled_bank()).expect("maze");
    let east = challenge_of(original.attempt_move(Direction::East));
    let saved = original.save();

    let mut loaded = Session::load(&saved, bundled_bank()).expect("save loads");
    let mut restored = Session::new(bundled_config(), bundled_bank()).expect("maze");
    restored.restore(&saved).expect("save restores");

    let south = challenge_of(original.attempt_move(Direction::South));
    let loaded_south = challenge_of(loaded.attempt_move(Direction::South));
    let restored_south = challenge_of(restored.attempt_move(Direction::South));

    assert_ne!(south.prompt, east.prompt, "a question was asked twice");
    assert_eq!(loaded_south, south);
    assert_eq!(restored_south, south);
    assert_eq!(loaded.save(), original.save());
}

#[test]
fn save_from_another_question_bank_is_rejected() {
    let small = QuestionBank::from_toml_str(
        "[[questions]]\nkind = \"short_answer\"\nprompt = \"Say yes\"\nanswer = \"yes\"\n",
        1,
    )
    .expect("bank parses");
    let mut session = Session::new(bundled_config(), Box::new(small)).expect("maze");
    let _ = session.attempt_move(Direction::East);
    let saved = session.save();

    assert!(matches!(
        Session::load(&saved, bundled_bank()),
        Err(GameError::Provider(ProviderError::InvalidSnapshot(_)))
    ));

    let mut live = Session::new(bundled_config(), bundled_bank()).expect("maze");
    let before = live.save();
    assert!(live.restore(&saved).is_err());
    assert_eq!(live.save(), before);
}
