use proptest::prelude::*;
use tile_cascade_board::{self as board, Board, SeededRandom};
use tile_cascade_core::{Command, EngineConfig, Event, Position};
use tile_cascade_system_cascade::CascadeResolver;
use tile_cascade_system_match_detection::MatchDetector;

/// Commits the first adjacent swap, in row-major order, that forms a match.
fn commit_first_matching_swap(
    board: &mut Board,
    detector: &MatchDetector,
) -> Option<[Position; 2]> {
    let dimensions = board.dimensions();
    for first in dimensions.positions() {
        for second in [first.offset(0, 1), first.offset(1, 0)].into_iter().flatten() {
            if !dimensions.contains(second) {
                continue;
            }
            let mut events = Vec::new();
            board::apply(board, Command::SwapCells { first, second }, &mut events);
            if !matches!(events.as_slice(), [Event::CellsSwapped { .. }]) {
                continue;
            }
            if detector.has_any_match(board.view()) {
                board::apply(board, Command::CommitSwap, &mut events);
                return Some([first, second]);
            }
            board::apply(board, Command::RevertSwap, &mut events);
        }
    }
    None
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn initial_fill_has_no_matches(
        seed in any::<u64>(),
        rows in 3u32..10,
        columns in 3u32..10,
        types in 3u8..8,
    ) {
        let config = EngineConfig::new(rows, columns, types).validate().expect("config");
        let board = Board::new(&config, &mut SeededRandom::new(seed));
        prop_assert!(board.is_full());
        prop_assert!(MatchDetector::new(config.match_min_length()).detect(board.view()).is_empty());
    }

    #[test]
    fn resolution_reaches_a_full_fixed_point(seed in any::<u64>()) {
        let config = EngineConfig::new(7, 7, 5).validate().expect("config");
        let mut rng = SeededRandom::new(seed);
        let mut board = Board::new(&config, &mut rng);
        let mut resolver = CascadeResolver::new(&config);

        if let Some(focus) = commit_first_matching_swap(&mut board, resolver.detector()) {
            resolver.begin_turn(&focus);
            let passes = resolver.resolve(&mut board, &mut rng);
            prop_assert!(!passes.is_empty());
            for (index, pass) in passes.iter().enumerate() {
                let expected = u32::try_from(index + 1).expect("pass index");
                prop_assert_eq!(pass.combo_count, expected);
                prop_assert_eq!(
                    pass.removed.len(),
                    pass.refilled.len() + pass.specials_spawned.len()
                );
            }
        }

        prop_assert!(board.is_full());
        prop_assert_eq!(board.occupied_count(), 49);
        prop_assert!(resolver.detector().detect(board.view()).is_empty());

        let settled = board.clone();
        resolver.begin_turn(&[]);
        prop_assert!(resolver.resolve(&mut board, &mut rng).is_empty());
        prop_assert_eq!(board, settled);
    }

    #[test]
    fn resolution_is_deterministic_for_a_seed(seed in any::<u64>()) {
        let run = |seed: u64| {
            let config = EngineConfig::new(6, 8, 4).validate().expect("config");
            let mut rng = SeededRandom::new(seed);
            let mut board = Board::new(&config, &mut rng);
            let mut resolver = CascadeResolver::new(&config);
            let focus = commit_first_matching_swap(&mut board, resolver.detector());
            resolver.begin_turn(focus.as_ref().map_or(&[][..], |cells| &cells[..]));
            (resolver.resolve(&mut board, &mut rng), board)
        };
        prop_assert_eq!(run(seed), run(seed));
    }
}
