#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Anti-deadlock guard: verifies a stable board still has a move and
//! reshuffles it when it does not.

use serde::{Deserialize, Serialize};
use tile_cascade_board::{self as board, Board};
use tile_cascade_core::{
    choose_index, completes_run_behind, Command, Element, Event, Position, RandomSource,
    TokenType, ValidatedConfig,
};
use tile_cascade_system_match_detection::MatchDetector;
use tracing::{debug, info, warn};

/// Outcome of a solvability check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShuffleStatus {
    /// The board already had a valid move.
    NotNeeded,
    /// The board was rearranged and now has a valid move.
    Reshuffled {
        /// Attempt that succeeded, starting at one.
        attempts: u32,
    },
    /// Every attempt failed; the board was left as it was.
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
    },
}

impl ShuffleStatus {
    /// Reports whether the guard gave up.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Pure system that checks for available moves and reshuffles deadlocked boards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolvabilityGuard {
    detector: MatchDetector,
    max_attempts: u32,
}

impl SolvabilityGuard {
    /// Creates a guard using the configured match length and attempt bound.
    #[must_use]
    pub fn new(config: &ValidatedConfig) -> Self {
        Self {
            detector: MatchDetector::new(config.match_min_length()),
            max_attempts: config.max_shuffle_attempts(),
        }
    }

    /// Finds the first adjacent pair, in row-major order, that makes a valid move.
    ///
    /// A pair is valid when it moves a special element or when swapping it
    /// forms a match. Swaps are simulated on a scratch copy, each one rolled
    /// back before the next is tried.
    #[must_use]
    pub fn find_move(&self, board: &Board) -> Option<(Position, Position)> {
        let mut scratch = board.clone();
        let dimensions = board.dimensions();
        for first in dimensions.positions() {
            for second in [first.offset(0, 1), first.offset(1, 0)].into_iter().flatten() {
                if !dimensions.contains(second) {
                    continue;
                }
                if self.is_valid_move(&mut scratch, first, second) {
                    return Some((first, second));
                }
            }
        }
        None
    }

    /// Reports whether at least one valid move exists.
    #[must_use]
    pub fn has_valid_move(&self, board: &Board) -> bool {
        self.find_move(board).is_some()
    }

    /// Reports whether swapping `first` and `second` is a valid move.
    ///
    /// The board is restored before returning.
    pub fn is_valid_move(&self, board: &mut Board, first: Position, second: Position) -> bool {
        let view = board.view();
        if view.is_special(first) || view.is_special(second) {
            return view.element(first).is_some() && view.element(second).is_some();
        }
        if board.swap(first, second).is_err() {
            return false;
        }
        let view = board.view();
        let forms_match = self.detector.has_match_through(view, first)
            || self.detector.has_match_through(view, second);
        let _ = board.revert_swap();
        forms_match
    }

    /// Ensures the board has a valid move, reshuffling up to the attempt bound.
    ///
    /// Specials stay in place; ordinary tokens are redistributed without
    /// forming matches. Failed attempts leave the board untouched.
    pub fn ensure(
        &self,
        board: &mut Board,
        rng: &mut dyn RandomSource,
        out_events: &mut Vec<Event>,
    ) -> ShuffleStatus {
        if self.has_valid_move(board) {
            return ShuffleStatus::NotNeeded;
        }

        for attempt in 1..=self.max_attempts {
            let Some(tokens) = self.arrangement(board, rng) else {
                debug!(attempt, "reshuffle attempt dead-ended");
                continue;
            };

            let mut candidate = board.clone();
            let mut scratch_events = Vec::new();
            board::apply(
                &mut candidate,
                Command::Rearrange {
                    tokens: tokens.clone(),
                },
                &mut scratch_events,
            );
            if self.detector.has_any_match(candidate.view()) || !self.has_valid_move(&candidate) {
                debug!(attempt, "reshuffle attempt rejected");
                continue;
            }

            board::apply(board, Command::Rearrange { tokens }, out_events);
            info!(attempts = attempt, "board reshuffled");
            return ShuffleStatus::Reshuffled { attempts: attempt };
        }

        warn!(attempts = self.max_attempts, "no valid move after reshuffling");
        ShuffleStatus::Exhausted {
            attempts: self.max_attempts,
        }
    }

    /// Draws one match-free redistribution of the board's ordinary tokens.
    fn arrangement(&self, board: &Board, rng: &mut dyn RandomSource) -> Option<Vec<TokenType>> {
        let view = board.view();
        let dimensions = view.dimensions();
        let mut pool: Vec<TokenType> = view.iter().filter_map(Element::match_token).collect();
        let mut assigned: Vec<Option<TokenType>> = vec![None; dimensions.cell_count()];
        let mut tokens = Vec::with_capacity(pool.len());
        let min_length = board.match_min_length();

        for position in dimensions.positions() {
            if view.element(position).is_none() || view.is_special(position) {
                continue;
            }
            let lookup = |cell: Position| {
                dimensions
                    .index(cell)
                    .and_then(|index| assigned.get(index).copied().flatten())
            };
            let fitting: Vec<usize> = pool
                .iter()
                .enumerate()
                .filter(|(_, token)| !completes_run_behind(lookup, position, **token, min_length))
                .map(|(index, _)| index)
                .collect();
            let pick = choose_index(rng, fitting.len())
                .and_then(|index| fitting.get(index).copied())?;
            let token = pool.swap_remove(pick);
            if let Some(slot) = dimensions
                .index(position)
                .and_then(|index| assigned.get_mut(index))
            {
                *slot = Some(token);
            }
            tokens.push(token);
        }
        Some(tokens)
    }
}
