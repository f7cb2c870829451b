use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use trivia_maze_core::{
    Command, Direction, DoorState, GameConfig, GameError, GameStatus, GenerationError, ItemEffect,
    ItemKind, Notification, NotificationKind, ProviderError, QuestionProvider, RoomCoord,
    TriviaItem,
};
use trivia_maze_world::{apply, query, Observer, Outcome, Session, SharedSession};

#[derive(Clone, Default)]
struct CountingProvider {
    calls: Rc<Cell<u32>>,
}

impl QuestionProvider for CountingProvider {
    fn next_question(&mut self, _: Option<&str>) -> Result<TriviaItem, ProviderError> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        Ok(TriviaItem::short_answer(
            "test",
            &format!("Question {call}"),
            "correct",
        ))
    }
}

struct FlakyProvider {
    failures_left: u32,
}

impl QuestionProvider for FlakyProvider {
    fn next_question(&mut self, _: Option<&str>) -> Result<TriviaItem, ProviderError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(ProviderError::Unavailable("store offline".to_owned()));
        }
        Ok(TriviaItem::short_answer("test", "Say correct", "correct"))
    }
}

struct TrueFalseProvider;

impl QuestionProvider for TrueFalseProvider {
    fn next_question(&mut self, _: Option<&str>) -> Result<TriviaItem, ProviderError> {
        Ok(TriviaItem::true_false("test", "The sky is blue.", true))
    }
}

#[derive(Default)]
struct Recorder {
    notifications: RefCell<Vec<Notification>>,
}

impl Recorder {
    fn kinds(&self) -> Vec<NotificationKind> {
        self.notifications
            .borrow()
            .iter()
            .map(Notification::kind)
            .collect()
    }
}

impl Observer for Recorder {
    fn on_state_changed(&self, notification: &Notification) {
        self.notifications.borrow_mut().push(notification.clone());
    }
}

fn grid_config(width: u32, height: u32, item_count: u32) -> GameConfig {
    GameConfig {
        width,
        height,
        seed: Some(7),
        extra_door_density_bps: 10_000,
        item_count,
        category: None,
    }
}

fn scenario_session() -> Session {
    Session::new(grid_config(3, 3, 0), Box::new(CountingProvider::default()))
        .expect("3x3 maze generates")
}

fn corridor(length: u32, item_count: u32) -> Session {
    Session::new(
        grid_config(length, 1, item_count),
        Box::new(CountingProvider::default()),
    )
    .expect("corridor generates")
}

fn recorder_on(session: &mut Session) -> Rc<Recorder> {
    let recorder = Rc::new(Recorder::default());
    assert!(session.register(recorder.clone()));
    recorder
}

fn walk_east(session: &mut Session) -> Outcome {
    let outcome = session
        .attempt_move(Direction::East)
        .expect("door to the east");
    assert!(matches!(outcome, Outcome::Challenged(_)));
    session.submit_answer("correct").expect("answer accepted")
}

#[test]
fn wrong_answer_seals_the_door_and_keeps_the_player() {
    let mut session = scenario_session();
    assert_eq!(query::player(&session), RoomCoord::new(0, 0));

    let outcome = session.attempt_move(Direction::East).expect("challenge");
    let Outcome::Challenged(challenge) = outcome else {
        panic!("expected a challenge");
    };
    assert_eq!(challenge.direction, Direction::East);
    assert_eq!(query::player(&session), RoomCoord::new(0, 0));

    let outcome = session.submit_answer("wrong").expect("answer accepted");
    assert!(matches!(outcome, Outcome::Sealed { .. }));
    assert_eq!(query::player(&session), RoomCoord::new(0, 0));
    assert_eq!(
        query::door_state(&session, RoomCoord::new(0, 0), Direction::East),
        Some(DoorState::Sealed)
    );

    assert_eq!(
        session.attempt_move(Direction::East),
        Err(GameError::SealedDoor {
            direction: Direction::East
        })
    );
    assert_eq!(query::status(&session), GameStatus::InProgress);
}

#[test]
fn correct_answer_opens_the_door_then_moves() {
    let mut session = scenario_session();
    let recorder = recorder_on(&mut session);

    let _ = session.attempt_move(Direction::East).expect("challenge");
    let outcome = session.submit_answer("  CORRECT ").expect("answer accepted");

    assert_eq!(
        outcome,
        Outcome::Moved {
            from: RoomCoord::new(0, 0),
            to: RoomCoord::new(0, 1),
        }
    );
    assert_eq!(query::player(&session), RoomCoord::new(0, 1));
    assert_eq!(
        recorder.kinds(),
        vec![
            NotificationKind::DoorChallenge,
            NotificationKind::DoorResolved,
            NotificationKind::Moved,
        ]
    );
    assert!(query::maze(&session)
        .room(RoomCoord::new(0, 1))
        .is_some_and(|room| room.visited()));
}

#[test]
fn challenge_is_bound_once_per_door() {
    let provider = CountingProvider::default();
    let calls = provider.calls.clone();
    let mut session =
        Session::new(grid_config(3, 3, 0), Box::new(provider)).expect("maze generates");

    let first = session.attempt_move(Direction::East).expect("challenge");
    let second = session.attempt_move(Direction::East).expect("challenge");
    let _ = session.attempt_move(Direction::South).expect("challenge");
    let third = session.attempt_move(Direction::East).expect("challenge");

    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(calls.get(), 2, "only the east and south doors asked");
}

#[test]
fn answer_applies_to_the_most_recent_attempt() {
    let mut session = scenario_session();
    let _ = session.attempt_move(Direction::East).expect("challenge");
    let _ = session.attempt_move(Direction::South).expect("challenge");

    let _ = session.submit_answer("correct").expect("answer accepted");
    assert_eq!(query::player(&session), RoomCoord::new(1, 0));
    assert_eq!(
        query::door_state(&session, RoomCoord::new(0, 0), Direction::East),
        Some(DoorState::InChallenge)
    );
}

#[test]
fn open_doors_are_shared_by_both_directions() {
    let mut session = scenario_session();
    let _ = walk_east(&mut session);
    assert_eq!(
        query::door_state(&session, RoomCoord::new(0, 1), Direction::West),
        Some(DoorState::Open)
    );

    let outcome = session.attempt_move(Direction::West).expect("open door");
    assert_eq!(
        outcome,
        Outcome::Moved {
            from: RoomCoord::new(0, 1),
            to: RoomCoord::new(0, 0),
        }
    );
}

#[test]
fn invalid_commands_leave_state_untouched() {
    let mut session = scenario_session();
    let before = session.save();

    assert_eq!(
        session.attempt_move(Direction::North),
        Err(GameError::NoDoor {
            direction: Direction::North
        })
    );
    assert_eq!(
        session.submit_answer("anything"),
        Err(GameError::NoPendingChallenge)
    );
    assert_eq!(
        session.use_item(ItemKind::VisionPotion),
        Err(GameError::MissingItem {
            item: ItemKind::VisionPotion
        })
    );

    assert_eq!(session.save(), before);
    assert_eq!(query::turn(&session), 0);
}

#[test]
fn provider_failure_leaves_door_unexplored() {
    let mut session = Session::new(
        grid_config(3, 3, 0),
        Box::new(FlakyProvider { failures_left: 1 }),
    )
    .expect("maze generates");

    assert_eq!(
        session.attempt_move(Direction::East),
        Err(GameError::Provider(ProviderError::Unavailable(
            "store offline".to_owned()
        )))
    );
    assert_eq!(
        query::door_state(&session, RoomCoord::new(0, 0), Direction::East),
        Some(DoorState::Unexplored)
    );
    assert!(query::event_log(&session).is_empty());

    let retry = session.attempt_move(Direction::East).expect("retry succeeds");
    assert!(matches!(retry, Outcome::Challenged(_)));
}

#[test]
fn sealing_the_only_route_loses_the_game() {
    let mut session = corridor(2, 0);
    let recorder = recorder_on(&mut session);

    let _ = session.attempt_move(Direction::East).expect("challenge");
    let _ = session.submit_answer("wrong").expect("answer accepted");

    assert_eq!(query::status(&session), GameStatus::Lost);
    assert_eq!(
        recorder.notifications.borrow().last(),
        Some(&Notification::StatusChanged {
            status: GameStatus::Lost
        })
    );
}

#[test]
fn door_still_in_challenge_keeps_the_exit_reachable() {
    let mut session = Session::new(grid_config(2, 2, 0), Box::new(CountingProvider::default()))
        .expect("grid generates");
    let origin = RoomCoord::new(0, 0);

    let south = session.attempt_move(Direction::South).expect("challenge");
    assert!(matches!(south, Outcome::Challenged(_)));
    let _ = session.attempt_move(Direction::East).expect("challenge");
    let sealed = session.submit_answer("wrong").expect("answer accepted");
    assert!(matches!(sealed, Outcome::Sealed { .. }));

    assert_eq!(query::status(&session), GameStatus::InProgress);
    assert_eq!(
        query::door_state(&session, origin, Direction::South),
        Some(DoorState::InChallenge)
    );

    let _ = session.attempt_move(Direction::South).expect("same challenge");
    let _ = session.submit_answer("wrong").expect("answer accepted");
    assert_eq!(query::status(&session), GameStatus::Lost);
}

#[test]
fn loss_leaves_the_player_a_region_of_several_rooms() {
    let mut session = Session::new(grid_config(3, 2, 0), Box::new(CountingProvider::default()))
        .expect("grid generates");

    let _ = walk_east(&mut session);
    assert_eq!(query::player(&session), RoomCoord::new(0, 1));
    let _ = session.attempt_move(Direction::East).expect("challenge");
    let _ = session.submit_answer("wrong").expect("answer accepted");
    assert_eq!(query::status(&session), GameStatus::InProgress);

    let _ = session.attempt_move(Direction::South).expect("challenge");
    let _ = session.submit_answer("correct").expect("answer accepted");
    assert_eq!(query::player(&session), RoomCoord::new(1, 1));
    let _ = session.attempt_move(Direction::East).expect("challenge");
    let _ = session.submit_answer("wrong").expect("answer accepted");

    assert_eq!(query::status(&session), GameStatus::Lost);
    let maze = query::maze(&session);
    for room in [
        RoomCoord::new(0, 0),
        RoomCoord::new(0, 1),
        RoomCoord::new(1, 0),
        RoomCoord::new(1, 1),
    ] {
        assert!(!maze.exit_reachable_from(room), "exit reachable from {room}");
    }
    assert!(maze.exit_reachable_from(RoomCoord::new(0, 2)));
    assert_eq!(
        query::door_state(&session, RoomCoord::new(1, 1), Direction::West),
        Some(DoorState::Unexplored)
    );
    assert_eq!(
        session.attempt_move(Direction::West),
        Err(GameError::GameOver {
            status: GameStatus::Lost
        })
    );
}

#[test]
fn reaching_the_exit_wins_and_locks_the_session() {
    let mut session = corridor(2, 0);
    let recorder = recorder_on(&mut session);

    let _ = walk_east(&mut session);
    assert_eq!(query::status(&session), GameStatus::Won);
    assert_eq!(
        recorder.kinds(),
        vec![
            NotificationKind::DoorChallenge,
            NotificationKind::DoorResolved,
            NotificationKind::Moved,
            NotificationKind::StatusChanged,
        ]
    );

    let snapshot = session.save();
    let turn = query::turn(&session);
    let game_over = Err(GameError::GameOver {
        status: GameStatus::Won,
    });
    assert_eq!(session.attempt_move(Direction::West), game_over);
    assert_eq!(session.submit_answer("correct"), game_over);
    assert_eq!(session.use_item(ItemKind::MagicKey), game_over);
    assert_eq!(session.save(), snapshot);
    assert_eq!(query::turn(&session), turn);
}

#[test]
fn lost_session_rejects_every_command() {
    let mut session = corridor(2, 0);
    let _ = session.attempt_move(Direction::East).expect("challenge");
    let _ = session.submit_answer("wrong").expect("answer accepted");

    let snapshot = session.save();
    for command in [
        Command::AttemptMove {
            direction: Direction::East,
        },
        Command::SubmitAnswer {
            answer: "correct".to_owned(),
        },
        Command::UseItem {
            item: ItemKind::VisionPotion,
        },
    ] {
        assert_eq!(
            apply(&mut session, command),
            Err(GameError::GameOver {
                status: GameStatus::Lost
            })
        );
    }
    assert_eq!(session.save(), snapshot);
}

#[test]
fn items_are_picked_up_on_entry() {
    let mut session = corridor(3, 1);
    let recorder = recorder_on(&mut session);
    assert_eq!(
        query::maze(&session)
            .room(RoomCoord::new(0, 1))
            .and_then(|room| room.item()),
        Some(ItemKind::MagicKey)
    );

    let _ = walk_east(&mut session);
    assert_eq!(query::item_count(&session, ItemKind::MagicKey), 1);
    assert_eq!(
        recorder.notifications.borrow().last(),
        Some(&Notification::ItemChanged {
            item: ItemKind::MagicKey,
            count: 1,
            effect: ItemEffect::PickedUp {
                room: RoomCoord::new(0, 1)
            },
        })
    );
    assert!(query::maze(&session)
        .room(RoomCoord::new(0, 1))
        .is_some_and(|room| room.item().is_none()));
}

#[test]
fn magic_key_opens_the_pending_door() {
    let mut session = corridor(3, 1);
    let _ = walk_east(&mut session);
    let recorder = recorder_on(&mut session);

    assert_eq!(
        session.use_item(ItemKind::MagicKey),
        Err(GameError::NoPendingChallenge)
    );
    let _ = session.attempt_move(Direction::East).expect("challenge");
    let turn = query::turn(&session);
    let outcome = session.use_item(ItemKind::MagicKey).expect("key works");

    assert_eq!(
        outcome,
        Outcome::Moved {
            from: RoomCoord::new(0, 1),
            to: RoomCoord::new(0, 2),
        }
    );
    assert_eq!(query::turn(&session), turn + 1);
    assert_eq!(query::item_count(&session, ItemKind::MagicKey), 0);
    assert_eq!(query::status(&session), GameStatus::Won);
    assert_eq!(
        recorder.kinds(),
        vec![
            NotificationKind::DoorChallenge,
            NotificationKind::ItemChanged,
            NotificationKind::DoorResolved,
            NotificationKind::Moved,
            NotificationKind::StatusChanged,
        ]
    );
}

#[test]
fn suggestion_potion_reveals_a_hint() {
    let mut session = corridor(4, 2);
    let _ = walk_east(&mut session);
    let _ = walk_east(&mut session);
    assert_eq!(query::item_count(&session, ItemKind::SuggestionPotion), 1);

    let _ = session.attempt_move(Direction::East).expect("challenge");
    let outcome = session
        .use_item(ItemKind::SuggestionPotion)
        .expect("potion works");
    assert_eq!(
        outcome,
        Outcome::ItemUsed {
            item: ItemKind::SuggestionPotion,
            effect: ItemEffect::Hint {
                text: "Hint: c_r_e_t".to_owned()
            },
        }
    );
    assert_eq!(query::item_count(&session, ItemKind::SuggestionPotion), 0);
    assert!(query::pending_challenge(&session).is_some());
}

#[test]
fn suggestion_potion_has_no_hint_for_true_false() {
    let mut session =
        Session::new(grid_config(4, 1, 2), Box::new(TrueFalseProvider)).expect("corridor");
    for _ in 0..2 {
        let _ = session.attempt_move(Direction::East).expect("challenge");
        let _ = session.submit_answer("true").expect("answer accepted");
    }
    let _ = session.attempt_move(Direction::East).expect("challenge");

    assert_eq!(
        session.use_item(ItemKind::SuggestionPotion),
        Err(GameError::ItemNotUsable {
            item: ItemKind::SuggestionPotion
        })
    );
    assert_eq!(query::item_count(&session, ItemKind::SuggestionPotion), 1);
}

#[test]
fn vision_potion_reveals_surrounding_rooms() {
    let mut session = corridor(5, 3);
    for _ in 0..3 {
        let _ = walk_east(&mut session);
    }
    assert_eq!(query::player(&session), RoomCoord::new(0, 3));

    let outcome = session.use_item(ItemKind::VisionPotion).expect("potion works");
    assert_eq!(
        outcome,
        Outcome::ItemUsed {
            item: ItemKind::VisionPotion,
            effect: ItemEffect::Revealed {
                rooms: vec![
                    RoomCoord::new(0, 2),
                    RoomCoord::new(0, 3),
                    RoomCoord::new(0, 4),
                ],
            },
        }
    );
    assert!(query::maze(&session)
        .room(RoomCoord::new(0, 4))
        .is_some_and(|room| room.revealed()));
}

#[test]
fn observers_register_idempotently_and_in_order() {
    let mut session = scenario_session();
    let order = Rc::new(RefCell::new(Vec::new()));

    let first_order = order.clone();
    let first: Rc<dyn Observer> =
        Rc::new(move |_: &Notification| first_order.borrow_mut().push("first"));
    let second_order = order.clone();
    let second: Rc<dyn Observer> =
        Rc::new(move |_: &Notification| second_order.borrow_mut().push("second"));

    assert!(session.register(first.clone()));
    assert!(!session.register(first.clone()));
    assert!(session.register(second.clone()));

    let _ = session.attempt_move(Direction::East).expect("challenge");
    assert_eq!(*order.borrow(), vec!["first", "second"]);

    assert!(session.unregister(&first));
    assert!(!session.unregister(&first));
    let _ = session.attempt_move(Direction::East).expect("challenge");
    assert_eq!(*order.borrow(), vec!["first", "second", "second"]);
}

#[test]
fn event_log_records_every_notification_with_its_turn() {
    let mut session = scenario_session();
    let _ = walk_east(&mut session);

    let log = query::event_log(&session);
    let entries: Vec<(u64, NotificationKind)> =
        log.iter().map(|record| (record.turn, record.kind)).collect();
    assert_eq!(
        entries,
        vec![
            (1, NotificationKind::DoorChallenge),
            (2, NotificationKind::DoorResolved),
            (2, NotificationKind::Moved),
        ]
    );
    assert_eq!(query::turn(&session), 2);
}

struct ReentrantObserver {
    session: RefCell<Option<SharedSession>>,
    results: RefCell<Vec<Result<Outcome, GameError>>>,
}

impl Observer for ReentrantObserver {
    fn on_state_changed(&self, _: &Notification) {
        if let Some(session) = self.session.borrow().as_ref() {
            self.results.borrow_mut().push(session.apply(Command::AttemptMove {
                direction: Direction::South,
            }));
        }
    }
}

#[test]
fn observers_cannot_reenter_the_session() {
    let shared = SharedSession::new(scenario_session());
    let observer = Rc::new(ReentrantObserver {
        session: RefCell::new(Some(shared.clone())),
        results: RefCell::new(Vec::new()),
    });
    assert_eq!(shared.register(observer.clone()), Ok(true));

    let outcome = shared.apply(Command::AttemptMove {
        direction: Direction::East,
    });
    assert!(matches!(outcome, Ok(Outcome::Challenged(_))));
    assert_eq!(*observer.results.borrow(), vec![Err(GameError::Reentrancy)]);
    assert_eq!(
        shared.read(|session| query::door_state(session, RoomCoord::new(0, 0), Direction::South)),
        Ok(Some(DoorState::Unexplored))
    );

    let _ = observer.session.borrow_mut().take();
}

#[test]
fn failed_new_game_keeps_the_current_game() {
    let mut session = scenario_session();
    let _ = session.attempt_move(Direction::East).expect("challenge");
    let before = session.save();

    let invalid = GameConfig {
        width: 0,
        ..grid_config(3, 3, 0)
    };
    assert_eq!(
        session.new_game(invalid),
        Err(GameError::Generation(GenerationError::InvalidDimensions {
            width: 0,
            height: 3
        }))
    );
    assert_eq!(session.save(), before);

    let recorder = recorder_on(&mut session);
    session
        .new_game(grid_config(4, 4, 0))
        .expect("new game starts");
    assert_eq!(query::maze(&session).dimensions(), (4, 4));
    assert_eq!(query::player(&session), RoomCoord::new(0, 0));
    assert_eq!(
        recorder.kinds(),
        vec![NotificationKind::StatusChanged]
    );
}

#[test]
fn unspecified_seed_is_recorded_for_replay() {
    let config = GameConfig {
        seed: None,
        ..grid_config(6, 6, 2)
    };
    let session =
        Session::new(config.clone(), Box::new(CountingProvider::default())).expect("maze");
    let replay = Session::new(
        GameConfig {
            seed: Some(query::seed(&session)),
            ..config
        },
        Box::new(CountingProvider::default()),
    )
    .expect("maze");

    assert_eq!(query::maze(&session), query::maze(&replay));
}
