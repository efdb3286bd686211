//! Interfaces for the collaborators a session feeds.

use tile_cascade_core::CascadePass;
use tile_cascade_system_solvability::ShuffleStatus;

/// Score and currency earned by one resolved turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TurnReward {
    /// Zero-based index of the turn within the session.
    pub turn: u32,
    /// Points earned by the turn.
    pub score_delta: u64,
    /// Currency earned by the turn.
    pub currency_delta: u64,
    /// Combo streak reached by the turn.
    pub combo_count: u32,
}

/// Maps engine rewards onto ledger effects; caps and limits live here, not in the engine.
pub trait RewardPolicy {
    /// Receives the rewards of every accepted turn, in order.
    fn credit(&mut self, reward: &TurnReward);
}

/// Observes cascade passes as they are produced, e.g. to animate them.
pub trait PresentationLayer {
    /// Called once per completed pass.
    fn on_pass(&mut self, pass: &CascadePass);

    /// Called when the solvability guard had to reshuffle or gave up.
    fn on_reshuffle(&mut self, _status: ShuffleStatus) {}
}

/// Reward policy that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRewardPolicy;

impl RewardPolicy for NullRewardPolicy {
    fn credit(&mut self, _reward: &TurnReward) {}
}

/// Presentation layer that observes nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPresentation;

impl PresentationLayer for NullPresentation {
    fn on_pass(&mut self, _pass: &CascadePass) {}
}
