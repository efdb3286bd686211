#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session facade that wires the Tile Cascade systems to one board.
//!
//! A [`Session`] owns its board, its random source and its collaborators; no
//! state is shared between sessions. Every public operation leaves the board
//! full and free of matches.

mod collaborators;
mod turn;

use std::fmt;

pub use collaborators::{
    NullPresentation, NullRewardPolicy, PresentationLayer, RewardPolicy, TurnReward,
};
pub use tile_cascade_system_cascade::Phase;
pub use tile_cascade_system_solvability::ShuffleStatus;
pub use turn::{PendingSwap, Turn};

use tile_cascade_board::{self as board, validate_swap, Board, LayoutError};
use tile_cascade_core::{
    CascadePass, ComboResolution, Command, ConfigError, Element, EngineConfig, Match, Position,
    RandomSource, RejectReason, TokenType, ValidatedConfig,
};
use tile_cascade_system_cascade::CascadeResolver;
use tile_cascade_system_scoring::ScoreTable;
use tile_cascade_system_solvability::SolvabilityGuard;
use tile_cascade_system_specials::{Clearance, SpawnRules};
use tracing::{debug, info, instrument};

/// Structured outcome of one move request or activation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapResult {
    /// Whether the request changed the board.
    pub accepted: bool,
    /// Why the request was rejected.
    pub reason: Option<RejectReason>,
    /// Every match resolved during the turn, pass by pass.
    pub matches: Vec<Match>,
    /// Every special element created during the turn.
    pub specials_spawned: Vec<Element>,
    /// Special pairing that opened the turn, if two specials were swapped.
    pub combo: Option<ComboResolution>,
    /// One record per Detect → Remove → Fall → Refill cycle.
    pub cascades: Vec<CascadePass>,
    /// Combo streak reached by the turn.
    pub combo_count: u32,
    /// Points earned by the turn.
    pub score_delta: u64,
    /// Currency earned by the turn.
    pub currency_delta: u64,
    /// Outcome of the solvability check that closed the turn.
    pub shuffle: ShuffleStatus,
    /// Board after the turn.
    pub board_after: Board,
}

impl SwapResult {
    fn rejected(reason: RejectReason, board: &Board) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
            matches: Vec::new(),
            specials_spawned: Vec::new(),
            combo: None,
            cascades: Vec::new(),
            combo_count: 0,
            score_delta: 0,
            currency_delta: 0,
            shuffle: ShuffleStatus::NotNeeded,
            board_after: board.clone(),
        }
    }

    fn resolved(
        cascades: Vec<CascadePass>,
        combo: Option<ComboResolution>,
        combo_count: u32,
        shuffle: ShuffleStatus,
        board: &Board,
    ) -> Self {
        Self {
            accepted: true,
            reason: None,
            matches: cascades
                .iter()
                .flat_map(|pass| pass.matches.iter().cloned())
                .collect(),
            specials_spawned: cascades
                .iter()
                .flat_map(|pass| pass.specials_spawned.iter().copied())
                .collect(),
            score_delta: cascades.iter().map(|pass| pass.score_delta).sum(),
            currency_delta: cascades.iter().map(|pass| pass.currency_delta).sum(),
            combo,
            cascades,
            combo_count,
            shuffle,
            board_after: board.clone(),
        }
    }
}

/// Running totals for one session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SessionStats {
    /// Points earned across every turn.
    pub total_score: u64,
    /// Currency earned across every turn.
    pub total_currency: u64,
    /// Moves consumed, forfeits included.
    pub moves_used: u32,
    /// Moves lost to [`Session::forfeit_move`].
    pub moves_forfeited: u32,
    /// Turns that were accepted and resolved.
    pub turns_resolved: u32,
    /// Highest combo streak reached in a single turn.
    pub longest_streak: u32,
    /// Reshuffles performed by the solvability guard.
    pub reshuffles: u32,
}

/// One game session: a board, its random source and its collaborators.
pub struct Session<R: RandomSource> {
    config: ValidatedConfig,
    board: Board,
    rng: R,
    resolver: CascadeResolver,
    guard: SolvabilityGuard,
    reward: Box<dyn RewardPolicy>,
    presentation: Box<dyn PresentationLayer>,
    stats: SessionStats,
    start_status: ShuffleStatus,
}

impl<R: RandomSource> Session<R> {
    /// Validates `config` and starts a session on a freshly filled board.
    ///
    /// The fill never contains a match; if it happens to offer no move the
    /// solvability guard reshuffles it before the session is returned.
    #[instrument(skip(rng))]
    pub fn start(config: &EngineConfig, mut rng: R) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        let board = Board::new(&config, &mut rng);
        let mut session = Self::assemble(config, board, rng);
        session.ensure_playable();
        info!(
            rows = session.config.dimensions().rows(),
            columns = session.config.dimensions().columns(),
            token_types = session.config.token_type_count(),
            status = ?session.start_status,
            "session started"
        );
        Ok(session)
    }

    /// Starts a session on a caller-supplied board.
    ///
    /// Matches already on the board are cleared and refilled without earning
    /// score or consuming a move, and a board left without a valid move is
    /// reshuffled, so the session opens on a stable board.
    pub fn from_board(config: &ValidatedConfig, board: Board, rng: R) -> Result<Self, LayoutError> {
        if board.dimensions() != config.dimensions() {
            return Err(LayoutError::DimensionMismatch {
                expected: config.dimensions().cell_count(),
                actual: board.dimensions().cell_count(),
            });
        }
        let mut session = Self::assemble(config.clone(), board, rng);
        session.resolver.begin_turn(&[]);
        let settled = session.resolver.resolve(&mut session.board, &mut session.rng);
        if !settled.is_empty() {
            debug!(passes = settled.len(), "cleared matches on supplied board");
        }
        session.ensure_playable();
        Ok(session)
    }

    fn ensure_playable(&mut self) {
        let mut events = Vec::new();
        self.start_status = self.guard.ensure(&mut self.board, &mut self.rng, &mut events);
        if matches!(self.start_status, ShuffleStatus::Reshuffled { .. }) {
            self.stats.reshuffles += 1;
        }
    }

    fn assemble(config: ValidatedConfig, board: Board, rng: R) -> Self {
        Self {
            resolver: CascadeResolver::new(&config),
            guard: SolvabilityGuard::new(&config),
            config,
            board,
            rng,
            reward: Box::new(NullRewardPolicy),
            presentation: Box::new(NullPresentation),
            stats: SessionStats::default(),
            start_status: ShuffleStatus::NotNeeded,
        }
    }

    /// Routes turn rewards to `policy`.
    #[must_use]
    pub fn with_reward_policy(mut self, policy: Box<dyn RewardPolicy>) -> Self {
        self.reward = policy;
        self
    }

    /// Routes cascade passes to `layer`.
    #[must_use]
    pub fn with_presentation(mut self, layer: Box<dyn PresentationLayer>) -> Self {
        self.presentation = layer;
        self
    }

    /// Replaces the special spawn rules.
    #[must_use]
    pub fn with_spawn_rules(mut self, rules: SpawnRules) -> Self {
        self.resolver = self.resolver.with_spawn_rules(rules);
        self
    }

    /// Replaces the score table.
    #[must_use]
    pub fn with_score_table(mut self, scores: ScoreTable) -> Self {
        self.resolver = self.resolver.with_score_table(scores);
        self
    }

    /// Validated configuration the session runs under.
    #[must_use]
    pub const fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    /// Current board.
    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// Running totals.
    #[must_use]
    pub const fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Outcome of the solvability check run when the session started.
    #[must_use]
    pub const fn start_status(&self) -> ShuffleStatus {
        self.start_status
    }

    /// Moves left under the configured limit; `None` when unlimited.
    #[must_use]
    pub fn moves_remaining(&self) -> Option<u32> {
        self.config
            .move_limit()
            .map(|limit| limit.saturating_sub(self.stats.moves_used))
    }

    /// First valid move in row-major order, if any.
    #[must_use]
    pub fn hint(&self) -> Option<(Position, Position)> {
        self.guard.find_move(&self.board)
    }

    /// Swaps two cells and resolves the whole turn.
    ///
    /// Rejected requests leave the board untouched and consume no move.
    #[instrument(skip(self))]
    pub fn request_swap(&mut self, first: Position, second: Position) -> SwapResult {
        if let Err(reason) = self.check_swap(first, second) {
            return self.reject(reason);
        }
        self.begin_swap(first, second).finish()
    }

    /// Validates a swap without performing it.
    pub fn plan_swap(
        &mut self,
        first: Position,
        second: Position,
    ) -> Result<PendingSwap<'_, R>, RejectReason> {
        if let Err(reason) = self.check_swap(first, second) {
            debug!(?first, ?second, ?reason, "swap rejected");
            return Err(reason);
        }
        Ok(PendingSwap::new(self, first, second))
    }

    /// Fires the special at `position` without a swap partner.
    ///
    /// A color clear targets `target`, or a random type present on the board
    /// when no target is given. Activations are tools, not moves: they do not
    /// consume the move budget.
    #[instrument(skip(self))]
    pub fn activate_special(&mut self, position: Position, target: Option<TokenType>) -> SwapResult {
        if !self.board.is_valid_position(position) {
            return self.reject(RejectReason::OutOfBounds);
        }
        let generator = *self.resolver.generator();
        let Some(clearance) = generator.activate(self.board.view(), position, target, &mut self.rng)
        else {
            return self.reject(RejectReason::NoSpecialAtPosition);
        };
        self.resolver.begin_clearance(&clearance, None);
        Turn::new(self, None).finish()
    }

    /// Consumes one move without touching the board, e.g. when a move timer expires.
    ///
    /// Returns the moves left afterwards.
    #[instrument(skip(self))]
    pub fn forfeit_move(&mut self) -> Result<Option<u32>, RejectReason> {
        if self.moves_remaining() == Some(0) {
            return Err(RejectReason::OutOfMoves);
        }
        self.stats.moves_used += 1;
        self.stats.moves_forfeited += 1;
        Ok(self.moves_remaining())
    }

    fn check_swap(&mut self, first: Position, second: Position) -> Result<(), RejectReason> {
        if self.moves_remaining() == Some(0) {
            return Err(RejectReason::OutOfMoves);
        }
        validate_swap(self.board.dimensions(), first, second)?;
        if !self.guard.is_valid_move(&mut self.board, first, second) {
            return Err(RejectReason::NoMatchFormed);
        }
        Ok(())
    }

    fn reject(&self, reason: RejectReason) -> SwapResult {
        debug!(?reason, "request rejected");
        SwapResult::rejected(reason, &self.board)
    }

    pub(crate) fn begin_swap(&mut self, first: Position, second: Position) -> Turn<'_, R> {
        let mut events = Vec::new();
        board::apply(&mut self.board, Command::SwapCells { first, second }, &mut events);
        board::apply(&mut self.board, Command::CommitSwap, &mut events);
        self.stats.moves_used += 1;

        let generator = *self.resolver.generator();
        let view = self.board.view();
        let moved_special = view.is_special(first);
        let partner_special = view.is_special(second);

        let mut combo = None;
        let opening: Option<Clearance> = if moved_special && partner_special {
            generator
                .combine(view, first, second, &mut self.rng)
                .map(|effect| {
                    combo = Some(ComboResolution {
                        kind: effect.kind,
                        anchor: effect.anchor,
                        cells_cleared: effect.clearance.cells.clone(),
                        derived_score: 0,
                    });
                    effect.clearance
                })
        } else if moved_special || partner_special {
            let (origin, partner) = if partner_special {
                (second, first)
            } else {
                (first, second)
            };
            let target = view.element(partner).map(Element::token);
            generator.activate(view, origin, target, &mut self.rng)
        } else {
            None
        };

        match opening {
            Some(clearance) => {
                let kind = combo.as_ref().map(|resolution| resolution.kind);
                if let Some(resolution) = combo.as_mut() {
                    resolution.derived_score =
                        self.resolver
                            .scores()
                            .clearance_score(clearance.cells.len(), kind, 0);
                }
                self.resolver.begin_clearance(&clearance, kind);
            }
            None => self.resolver.begin_turn(&[first, second]),
        }
        Turn::new(self, combo)
    }

    pub(crate) fn conclude_turn(
        &mut self,
        cascades: Vec<CascadePass>,
        combo: Option<ComboResolution>,
    ) -> SwapResult {
        let mut events = Vec::new();
        let shuffle = self
            .guard
            .ensure(&mut self.board, &mut self.rng, &mut events);
        if shuffle != ShuffleStatus::NotNeeded {
            self.presentation.on_reshuffle(shuffle);
        }
        if matches!(shuffle, ShuffleStatus::Reshuffled { .. }) {
            self.stats.reshuffles += 1;
        }

        let result = SwapResult::resolved(
            cascades,
            combo,
            self.resolver.combo_counter(),
            shuffle,
            &self.board,
        );
        self.reward.credit(&TurnReward {
            turn: self.stats.turns_resolved,
            score_delta: result.score_delta,
            currency_delta: result.currency_delta,
            combo_count: result.combo_count,
        });

        self.stats.turns_resolved += 1;
        self.stats.total_score = self.stats.total_score.saturating_add(result.score_delta);
        self.stats.total_currency = self.stats.total_currency.saturating_add(result.currency_delta);
        self.stats.longest_streak = self.stats.longest_streak.max(result.combo_count);
        debug!(
            passes = result.cascades.len(),
            score = result.score_delta,
            combo = result.combo_count,
            "turn resolved"
        );
        result
    }
}

impl<R: RandomSource> fmt::Debug for Session<R> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("config", &self.config)
            .field("board", &self.board)
            .field("stats", &self.stats)
            .field("start_status", &self.start_status)
            .finish_non_exhaustive()
    }
}
