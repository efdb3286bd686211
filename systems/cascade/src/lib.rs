#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cascade resolution expressed as an explicit phase state machine.
//!
//! Each pass runs Detecting → Removing → FallingGravity → Refilling and then
//! returns to Detecting; the resolver settles in `Stable` once a detection
//! pass finds nothing. Callers may drive single phases with
//! [`CascadeResolver::step`], whole passes with [`CascadeResolver::next_pass`],
//! or everything at once with [`CascadeResolver::resolve`].

use tile_cascade_board::{self as board, query, Board};
use tile_cascade_core::{
    CascadePass, ComboKind, Command, Event, Position, RandomSource, RefillRecord, TokenType,
    ValidatedConfig,
};
use tile_cascade_system_match_detection::MatchDetector;
use tile_cascade_system_scoring::ScoreTable;
use tile_cascade_system_specials::{Clearance, SpawnRules, SpecialElementGenerator};
use tracing::debug;

/// Phase the resolver will execute on its next step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Scanning the board for matches.
    Detecting,
    /// Emptying matched or cleared cells and spawning earned specials.
    Removing,
    /// Compacting columns toward the bottom row.
    FallingGravity,
    /// Filling vacancies with fresh ordinary tokens.
    Refilling,
    /// No matches remain; the turn is over.
    Stable,
}

/// Drives one turn's cascade against a board.
#[derive(Clone, Debug)]
pub struct CascadeResolver {
    detector: MatchDetector,
    generator: SpecialElementGenerator,
    scores: ScoreTable,
    token_type_count: u8,
    phase: Phase,
    combo_counter: u32,
    pass_index: u32,
    focus: Vec<Position>,
    clearance: Option<Vec<Position>>,
    current: CascadePass,
}

impl CascadeResolver {
    /// Creates a resolver for boards built from `config`, using default spawn and score rules.
    #[must_use]
    pub fn new(config: &ValidatedConfig) -> Self {
        Self {
            detector: MatchDetector::new(config.match_min_length()),
            generator: SpecialElementGenerator::default(),
            scores: ScoreTable::default(),
            token_type_count: config.token_type_count(),
            phase: Phase::Stable,
            combo_counter: 0,
            pass_index: 0,
            focus: Vec::new(),
            clearance: None,
            current: CascadePass::default(),
        }
    }

    /// Replaces the spawn rules.
    #[must_use]
    pub fn with_spawn_rules(mut self, rules: SpawnRules) -> Self {
        self.generator = SpecialElementGenerator::new(rules);
        self
    }

    /// Replaces the score table.
    #[must_use]
    pub fn with_score_table(mut self, scores: ScoreTable) -> Self {
        self.scores = scores;
        self
    }

    /// Detector used for every detection pass.
    #[must_use]
    pub const fn detector(&self) -> &MatchDetector {
        &self.detector
    }

    /// Generator used to spawn and fire specials.
    #[must_use]
    pub const fn generator(&self) -> &SpecialElementGenerator {
        &self.generator
    }

    /// Score table applied to every pass.
    #[must_use]
    pub const fn scores(&self) -> &ScoreTable {
        &self.scores
    }

    /// Phase executed by the next [`step`](Self::step).
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of passes in the current turn that found at least one match.
    #[must_use]
    pub const fn combo_counter(&self) -> u32 {
        self.combo_counter
    }

    /// Reports whether the turn has reached its fixed point.
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.phase == Phase::Stable
    }

    /// Starts a turn after a player swap.
    ///
    /// The combo streak resets; matches found in the first pass place their
    /// specials on whichever focus cell they cover.
    pub fn begin_turn(&mut self, focus: &[Position]) {
        self.reset();
        self.focus = focus.to_vec();
        self.phase = Phase::Detecting;
    }

    /// Starts a turn whose first pass empties a precomputed clearance.
    ///
    /// The opening pass finds no matches, so it does not advance the combo
    /// streak; it is scored per cleared cell plus the combo bonus, if any.
    pub fn begin_clearance(&mut self, clearance: &Clearance, combo: Option<ComboKind>) {
        self.reset();
        self.current.score_delta =
            self.scores
                .clearance_score(clearance.cells.len(), combo, self.combo_counter);
        self.clearance = Some(clearance.cells.clone());
        self.phase = Phase::Removing;
    }

    fn reset(&mut self) {
        self.combo_counter = 0;
        self.pass_index = 0;
        self.focus.clear();
        self.clearance = None;
        self.current = CascadePass::default();
    }

    /// Executes a single phase; returns the pass record once its refill completes.
    pub fn step(&mut self, board: &mut Board, rng: &mut dyn RandomSource) -> Option<CascadePass> {
        match self.phase {
            Phase::Stable => None,
            Phase::Detecting => {
                self.detect(board);
                None
            }
            Phase::Removing => {
                self.remove(board);
                None
            }
            Phase::FallingGravity => {
                self.fall(board);
                None
            }
            Phase::Refilling => Some(self.refill(board, rng)),
        }
    }

    /// Runs phases until the next pass completes; `None` once the board is stable.
    pub fn next_pass(
        &mut self,
        board: &mut Board,
        rng: &mut dyn RandomSource,
    ) -> Option<CascadePass> {
        while !self.is_stable() {
            if let Some(pass) = self.step(board, rng) {
                return Some(pass);
            }
        }
        None
    }

    /// Runs the turn to its fixed point and returns every pass.
    pub fn resolve(&mut self, board: &mut Board, rng: &mut dyn RandomSource) -> Vec<CascadePass> {
        let mut passes = Vec::new();
        while let Some(pass) = self.next_pass(board, rng) {
            passes.push(pass);
        }
        passes
    }

    fn detect(&mut self, board: &Board) {
        let focus = std::mem::take(&mut self.focus);
        let matches = self
            .detector
            .detect_with_focus(query::grid_view(board), &focus);
        if matches.is_empty() {
            self.phase = Phase::Stable;
            return;
        }

        self.combo_counter += 1;
        self.current.score_delta = self.scores.pass_score(&matches, self.combo_counter);
        self.current.currency_delta = self.scores.pass_currency(&matches);
        self.current.matches = matches;
        self.phase = Phase::Removing;
    }

    fn remove(&mut self, board: &mut Board) {
        let mut cells = self.clearance.take().unwrap_or_default();
        cells.extend(self.current.matches.iter().flat_map(|found| found.cells.iter().copied()));

        let mut commands = vec![Command::RemoveCells { cells }];
        commands.extend(
            self.current
                .matches
                .iter()
                .filter_map(|found| self.generator.spawn_for(found)),
        );

        let mut events = Vec::new();
        for command in commands {
            board::apply(board, command, &mut events);
        }
        for event in events {
            match event {
                Event::ElementRemoved { element } => self.current.removed.push(element.position()),
                Event::SpecialSpawned { element } => self.current.specials_spawned.push(element),
                _ => {}
            }
        }
        self.phase = Phase::FallingGravity;
    }

    fn fall(&mut self, board: &mut Board) {
        let mut events = Vec::new();
        board::apply(board, Command::ApplyGravity, &mut events);
        self.current
            .fallen
            .extend(events.into_iter().filter_map(|event| match event {
                Event::ElementFell { fall } => Some(fall),
                _ => None,
            }));
        self.phase = Phase::Refilling;
    }

    fn refill(&mut self, board: &mut Board, rng: &mut dyn RandomSource) -> CascadePass {
        let palette = u32::from(self.token_type_count);
        let tokens: Vec<TokenType> = (0..query::vacancy_count(board))
            .map(|_| TokenType::new(u8::try_from(rng.below(palette)).unwrap_or(0)))
            .collect();

        let mut events = Vec::new();
        board::apply(board, Command::Refill { tokens }, &mut events);
        self.current
            .refilled
            .extend(events.into_iter().filter_map(|event| match event {
                Event::CellRefilled { element } => Some(RefillRecord {
                    position: element.position(),
                    token: element.token(),
                }),
                _ => None,
            }));

        let mut pass = std::mem::take(&mut self.current);
        pass.index = self.pass_index;
        pass.combo_count = self.combo_counter;
        self.pass_index += 1;
        self.phase = Phase::Detecting;

        debug!(
            pass = pass.index,
            matches = pass.matches.len(),
            removed = pass.removed.len(),
            refilled = pass.refilled.len(),
            combo = pass.combo_count,
            score = pass.score_delta,
            "cascade pass resolved"
        );
        pass
    }
}
