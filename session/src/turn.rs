//! Two-phase swaps and stepwise turn resolution.

use tile_cascade_board::Board;
use tile_cascade_core::{CascadePass, ComboResolution, Position, RandomSource};
use tile_cascade_system_cascade::Phase;
use tracing::debug;

use crate::{Session, SwapResult};

/// A validated swap that has not touched the board yet.
///
/// Dropping it, or calling [`cancel`](Self::cancel), withdraws the request
/// with no state change.
pub struct PendingSwap<'s, R: RandomSource> {
    session: &'s mut Session<R>,
    first: Position,
    second: Position,
}

impl<'s, R: RandomSource> PendingSwap<'s, R> {
    pub(crate) fn new(session: &'s mut Session<R>, first: Position, second: Position) -> Self {
        Self {
            session,
            first,
            second,
        }
    }

    /// Cell the player picked up.
    #[must_use]
    pub const fn first(&self) -> Position {
        self.first
    }

    /// Cell the picked element moves into.
    #[must_use]
    pub const fn second(&self) -> Position {
        self.second
    }

    /// Withdraws the swap.
    pub fn cancel(self) {
        debug!(first = ?self.first, second = ?self.second, "swap withdrawn");
    }

    /// Performs the swap and starts resolving its turn.
    ///
    /// From here on the turn cannot be cancelled.
    pub fn commit(self) -> Turn<'s, R> {
        let Self {
            session,
            first,
            second,
        } = self;
        session.begin_swap(first, second)
    }
}

/// An accepted turn whose cascade is being resolved.
///
/// Passes can be pulled one at a time with [`next_pass`](Self::next_pass) or
/// single phases with [`step`](Self::step). Dropping an unfinished turn runs
/// the cascade to completion.
pub struct Turn<'s, R: RandomSource> {
    session: &'s mut Session<R>,
    combo: Option<ComboResolution>,
    passes: Vec<CascadePass>,
    finished: bool,
}

impl<'s, R: RandomSource> Turn<'s, R> {
    pub(crate) fn new(session: &'s mut Session<R>, combo: Option<ComboResolution>) -> Self {
        Self {
            session,
            combo,
            passes: Vec::new(),
            finished: false,
        }
    }

    /// Phase the next [`step`](Self::step) will execute.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.session.resolver.phase()
    }

    /// Board as it stands mid-turn.
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.session.board
    }

    /// Special pairing that opened the turn, if any.
    #[must_use]
    pub fn combo(&self) -> Option<&ComboResolution> {
        self.combo.as_ref()
    }

    /// Passes completed so far.
    #[must_use]
    pub fn passes(&self) -> &[CascadePass] {
        &self.passes
    }

    /// Executes one phase; returns the pass once its refill completes.
    pub fn step(&mut self) -> Option<CascadePass> {
        let session = &mut *self.session;
        let pass = session.resolver.step(&mut session.board, &mut session.rng)?;
        Some(self.record(pass))
    }

    /// Resolves the next full pass; `None` once the board is stable.
    pub fn next_pass(&mut self) -> Option<CascadePass> {
        let session = &mut *self.session;
        let pass = session.resolver.next_pass(&mut session.board, &mut session.rng)?;
        Some(self.record(pass))
    }

    /// Runs the cascade to its fixed point and reports the whole turn.
    pub fn finish(mut self) -> SwapResult {
        self.complete()
    }

    fn record(&mut self, pass: CascadePass) -> CascadePass {
        self.session.presentation.on_pass(&pass);
        self.passes.push(pass.clone());
        pass
    }

    fn complete(&mut self) -> SwapResult {
        while self.next_pass().is_some() {}
        self.finished = true;
        let passes = std::mem::take(&mut self.passes);
        self.session.conclude_turn(passes, self.combo.take())
    }
}

impl<R: RandomSource> Drop for Turn<'_, R> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.complete();
        }
    }
}
