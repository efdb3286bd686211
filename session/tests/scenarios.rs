use std::{cell::RefCell, rc::Rc};

use tile_cascade_board::{Board, SeededRandom};
use tile_cascade_core::{
    CascadePass, ComboKind, ConfigError, EngineConfig, Position, RandomSource, RejectReason,
    ShapeClass, SpecialKind, TokenType, ValidatedConfig,
};
use tile_cascade_session::{
    Phase, PresentationLayer, RewardPolicy, Session, SessionStats, ShuffleStatus, TurnReward,
};
use tile_cascade_system_match_detection::MatchDetector;

const LAYOUT: [&[u8]; 6] = [
    &[0, 1, 2, 3, 4, 5, 0, 1],
    &[2, 3, 4, 5, 0, 1, 2, 3],
    &[3, 3, 0, 3, 2, 3, 4, 5],
    &[0, 1, 3, 3, 4, 5, 0, 1],
    &[2, 3, 4, 5, 0, 1, 2, 3],
    &[4, 5, 0, 1, 2, 3, 4, 5],
];

const PICKED_UP: Position = Position::new(3, 2);
const DROPPED_ON: Position = Position::new(2, 2);

/// Replays a fixed list of draws, then repeats the last one.
struct Scripted {
    draws: Vec<u32>,
    cursor: usize,
}

impl RandomSource for Scripted {
    fn next_u32(&mut self) -> u32 {
        let value = self
            .draws
            .get(self.cursor)
            .or_else(|| self.draws.last())
            .copied()
            .unwrap_or(0);
        self.cursor += 1;
        value
    }

    fn below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.next_u32() % bound
    }
}

fn config(move_limit: Option<u32>) -> ValidatedConfig {
    let mut config = EngineConfig::new(6, 8, 6);
    config.move_limit = move_limit;
    config.validate().expect("config")
}

fn session_with<R: RandomSource>(config: &ValidatedConfig, rng: R) -> Session<R> {
    let board = Board::from_token_rows(config, &LAYOUT).expect("layout");
    Session::from_board(config, board, rng).expect("session")
}

fn scripted_session() -> Session<Scripted> {
    session_with(
        &config(None),
        Scripted {
            draws: vec![5, 2, 1],
            cursor: 0,
        },
    )
}

fn with_specials(specials: &[(Position, SpecialKind)]) -> Session<SeededRandom> {
    let config = config(None);
    let mut board = Board::from_token_rows(&config, &LAYOUT).expect("layout");
    for (position, kind) in specials {
        let _ = board
            .place_special(*position, TokenType::new(0), *kind)
            .expect("inside board");
    }
    Session::from_board(&config, board, SeededRandom::new(21)).expect("session")
}

#[test]
fn horizontal_four_spawns_column_clearer() {
    let mut session = scripted_session();
    let result = session.request_swap(PICKED_UP, DROPPED_ON);

    assert!(result.accepted);
    assert_eq!(result.reason, None);
    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].shape, ShapeClass::Line4);
    assert_eq!(result.specials_spawned.len(), 1);
    assert_eq!(result.specials_spawned[0].position(), DROPPED_ON);
    assert_eq!(
        result.specials_spawned[0].special_kind(),
        SpecialKind::LineClearColumn
    );
    assert_eq!(result.combo_count, 1);
    assert_eq!(result.score_delta, u64::from(ShapeClass::Line4.base_score()));
    assert_eq!(result.currency_delta, 2);
    assert_eq!(result.shuffle, ShuffleStatus::NotNeeded);

    assert_eq!(result.cascades.len(), 1);
    let pass = &result.cascades[0];
    assert_eq!(
        pass.removed,
        (0..4).map(|column| Position::new(2, column)).collect::<Vec<_>>()
    );
    assert_eq!(pass.fallen.len(), 6);
    assert_eq!(pass.refilled.len(), 3);

    assert_eq!(&result.board_after, session.board());
    assert!(session.board().is_full());
    let stats = session.stats();
    assert_eq!(stats.moves_used, 1);
    assert_eq!(stats.turns_resolved, 1);
    assert_eq!(stats.total_score, 60);
    assert_eq!(stats.longest_streak, 1);
}

#[test]
fn non_adjacent_swap_is_rejected_without_change() {
    let mut session = scripted_session();
    let before = session.board().clone();
    let result = session.request_swap(Position::new(0, 0), Position::new(2, 2));

    assert!(!result.accepted);
    assert_eq!(result.reason, Some(RejectReason::NotAdjacent));
    assert!(result.cascades.is_empty());
    assert_eq!(session.board(), &before);
    assert_eq!(session.stats().moves_used, 0);
}

#[test]
fn out_of_bounds_swap_is_rejected() {
    let mut session = scripted_session();
    let result = session.request_swap(Position::new(5, 7), Position::new(6, 7));
    assert_eq!(result.reason, Some(RejectReason::OutOfBounds));
}

#[test]
fn swap_without_match_is_reverted() {
    let mut session = scripted_session();
    let before = session.board().clone();
    let result = session.request_swap(Position::new(0, 0), Position::new(0, 1));

    assert!(!result.accepted);
    assert_eq!(result.reason, Some(RejectReason::NoMatchFormed));
    assert_eq!(session.board(), &before);
    assert_eq!(session.stats().moves_used, 0);
}

#[test]
fn swapping_two_specials_fires_their_combo() {
    let mut session = with_specials(&[
        (Position::new(4, 1), SpecialKind::LineClearRow),
        (Position::new(4, 2), SpecialKind::LineClearColumn),
    ]);
    let result = session.request_swap(Position::new(4, 1), Position::new(4, 2));

    assert!(result.accepted);
    let combo = result.combo.as_ref().expect("combo");
    assert_eq!(combo.kind, ComboKind::CrossBlast);
    assert_eq!(combo.anchor, Position::new(4, 2));

    let mut expected: Vec<Position> = (0..8).map(|column| Position::new(4, column)).collect();
    expected.extend([0, 1, 2, 3, 5].map(|row| Position::new(row, 2)));
    expected.sort();
    assert_eq!(combo.cells_cleared, expected);
    assert_eq!(combo.derived_score, 13 * 10 + 200);

    let opening = &result.cascades[0];
    assert!(opening.matches.is_empty());
    assert_eq!(opening.removed, expected);
    assert_eq!(opening.combo_count, 0);
    assert_eq!(opening.score_delta, combo.derived_score);
    assert!(session.board().is_full());
}

#[test]
fn single_special_swap_targets_partner_type() {
    let mut session = with_specials(&[(Position::new(5, 0), SpecialKind::ColorClear)]);
    let mut preview = session.board().clone();
    preview
        .swap(Position::new(5, 0), Position::new(5, 1))
        .expect("adjacent");
    let mut expected = preview.view().positions_of(TokenType::new(5));
    expected.push(Position::new(5, 1));
    expected.sort();

    let result = session.request_swap(Position::new(5, 0), Position::new(5, 1));

    assert!(result.accepted);
    assert!(result.combo.is_none());
    assert_eq!(result.cascades[0].removed, expected);
    assert_eq!(result.cascades[0].currency_delta, 0);
    assert_eq!(session.stats().moves_used, 1);
}

#[test]
fn activation_tool_does_not_consume_moves() {
    let config = config(Some(3));
    let mut board = Board::from_token_rows(&config, &LAYOUT).expect("layout");
    let _ = board.place_special(Position::new(0, 0), TokenType::new(0), SpecialKind::AreaBlast);
    let mut session = Session::from_board(&config, board, SeededRandom::new(8)).expect("session");

    let missed = session.activate_special(Position::new(1, 1), None);
    assert_eq!(missed.reason, Some(RejectReason::NoSpecialAtPosition));
    let outside = session.activate_special(Position::new(9, 9), None);
    assert_eq!(outside.reason, Some(RejectReason::OutOfBounds));

    let result = session.activate_special(Position::new(0, 0), None);
    assert!(result.accepted);
    assert_eq!(
        result.cascades[0].removed,
        vec![
            Position::new(0, 0),
            Position::new(0, 1),
            Position::new(1, 0),
            Position::new(1, 1)
        ]
    );
    assert_eq!(result.cascades[0].score_delta, 40);
    assert_eq!(session.moves_remaining(), Some(3));
}

#[test]
fn move_budget_is_enforced() {
    let mut session = session_with(&config(Some(2)), SeededRandom::new(5));
    assert_eq!(session.forfeit_move(), Ok(Some(1)));
    let hint = session.hint().expect("move");
    assert!(session.request_swap(hint.0, hint.1).accepted);
    assert_eq!(session.moves_remaining(), Some(0));

    let hint = session.hint().expect("move");
    let result = session.request_swap(hint.0, hint.1);
    assert_eq!(result.reason, Some(RejectReason::OutOfMoves));
    assert_eq!(session.forfeit_move(), Err(RejectReason::OutOfMoves));
    assert_eq!(session.stats().moves_forfeited, 1);
}

#[test]
fn withdrawn_swap_leaves_no_trace() {
    let mut session = scripted_session();
    let before = session.board().clone();

    let pending = session.plan_swap(PICKED_UP, DROPPED_ON).expect("valid swap");
    assert_eq!(pending.first(), PICKED_UP);
    pending.cancel();
    drop(session.plan_swap(PICKED_UP, DROPPED_ON).expect("valid swap"));

    assert_eq!(session.board(), &before);
    assert_eq!(session.stats(), SessionStats::default());
    assert_eq!(
        session.plan_swap(Position::new(0, 0), Position::new(0, 1)).err(),
        Some(RejectReason::NoMatchFormed)
    );
}

#[test]
fn turns_can_be_pulled_phase_by_phase() {
    let mut session = scripted_session();
    let mut turn = session
        .plan_swap(PICKED_UP, DROPPED_ON)
        .expect("valid swap")
        .commit();

    assert_eq!(turn.phase(), Phase::Detecting);
    assert!(turn.step().is_none());
    assert_eq!(turn.phase(), Phase::Removing);
    assert!(turn.step().is_none());
    assert_eq!(turn.phase(), Phase::FallingGravity);
    assert!(turn.board().element(Position::new(0, 0)).is_some());

    let pass = turn.next_pass().expect("first pass");
    assert_eq!(pass.index, 0);
    assert_eq!(turn.passes().len(), 1);
    assert!(turn.next_pass().is_none());
    assert_eq!(turn.phase(), Phase::Stable);

    let result = turn.finish();
    assert_eq!(result.cascades.len(), 1);
    assert_eq!(session.stats().turns_resolved, 1);
}

#[test]
fn dropped_turn_still_resolves() {
    let mut session = scripted_session();
    {
        let mut turn = session
            .plan_swap(PICKED_UP, DROPPED_ON)
            .expect("valid swap")
            .commit();
        assert!(turn.step().is_none());
    }
    assert!(session.board().is_full());
    assert_eq!(session.stats().turns_resolved, 1);
    assert_eq!(session.stats().total_score, 60);
}

#[derive(Default)]
struct Ledger {
    rewards: Vec<TurnReward>,
    passes: Vec<u32>,
}

struct Recorder(Rc<RefCell<Ledger>>);

impl RewardPolicy for Recorder {
    fn credit(&mut self, reward: &TurnReward) {
        self.0.borrow_mut().rewards.push(*reward);
    }
}

impl PresentationLayer for Recorder {
    fn on_pass(&mut self, pass: &CascadePass) {
        self.0.borrow_mut().passes.push(pass.index);
    }
}

#[test]
fn collaborators_observe_every_turn() {
    let ledger = Rc::new(RefCell::new(Ledger::default()));
    let mut session = scripted_session()
        .with_reward_policy(Box::new(Recorder(Rc::clone(&ledger))))
        .with_presentation(Box::new(Recorder(Rc::clone(&ledger))));

    let result = session.request_swap(PICKED_UP, DROPPED_ON);
    let _ = session.request_swap(Position::new(0, 0), Position::new(0, 2));

    let ledger = ledger.borrow();
    assert_eq!(
        ledger.rewards,
        vec![TurnReward {
            turn: 0,
            score_delta: result.score_delta,
            currency_delta: result.currency_delta,
            combo_count: 1,
        }]
    );
    assert_eq!(ledger.passes, vec![0]);
}

#[test]
fn malformed_configuration_is_fatal() {
    assert!(matches!(
        Session::start(&EngineConfig::new(0, 8, 6), SeededRandom::new(1)),
        Err(ConfigError::ZeroRows)
    ));
    assert!(matches!(
        Session::start(&EngineConfig::new(8, 8, 2), SeededRandom::new(1)),
        Err(ConfigError::TooFewTokenTypes { count: 2 })
    ));
}

#[test]
fn started_session_is_full_and_playable() {
    let session = Session::start(&EngineConfig::new(8, 8, 6), SeededRandom::new(77)).expect("session");
    assert!(session.board().is_full());
    assert!(!session.start_status().is_exhausted());
    assert!(session.hint().is_some());
}

#[test]
fn mismatched_board_is_rejected() {
    let small = EngineConfig::new(3, 3, 4).validate().expect("config");
    let board = Board::new(&small, &mut SeededRandom::new(1));
    assert!(Session::from_board(&config(None), board, SeededRandom::new(1)).is_err());
}

#[test]
fn supplied_board_with_a_run_is_settled_before_play() {
    let config = config(None);
    let mut rows = LAYOUT;
    rows[0] = &[0, 0, 0, 3, 4, 5, 0, 1];
    let board = Board::from_token_rows(&config, &rows).expect("layout");
    assert!(MatchDetector::default().has_any_match(board.view()));

    let session = Session::from_board(&config, board, SeededRandom::new(4)).expect("session");
    assert!(session.board().is_full());
    assert!(!MatchDetector::default().has_any_match(session.board().view()));
    assert_eq!(session.stats().total_score, 0);
    assert_eq!(session.stats().moves_used, 0);
    assert_eq!(session.stats().turns_resolved, 0);
}

#[test]
fn settled_small_board_offers_no_idle_swap() {
    let config = EngineConfig::new(3, 3, 4).validate().expect("config");
    let board = Board::from_token_rows(&config, &[&[0, 0, 0], &[1, 2, 3], &[2, 3, 1]])
        .expect("layout");

    let mut session = Session::from_board(&config, board, SeededRandom::new(1)).expect("session");
    assert!(!MatchDetector::default().has_any_match(session.board().view()));

    if let Some((first, second)) = session.hint() {
        let view = session.board().view();
        assert_ne!(
            view.element(first).map(|element| element.token()),
            view.element(second).map(|element| element.token())
        );
    }
    let token_at = |session: &Session<SeededRandom>, position: Position| {
        session.board().element(position).map(|element| element.token())
    };
    let (left, right) = (Position::new(0, 0), Position::new(0, 1));
    if token_at(&session, left) == token_at(&session, right) {
        let idle = session.request_swap(left, right);
        assert_eq!(idle.reason, Some(RejectReason::NoMatchFormed));
        assert_eq!(session.stats().moves_used, 0);
    }
}
