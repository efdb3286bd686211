#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Score and currency tables for resolved matches and special activations.

use thiserror::Error;
use tile_cascade_core::{ComboKind, Match, ShapeClass};

/// Default combo-streak bonus, in percent, indexed by the streak counter.
pub const DEFAULT_COMBO_BONUS_PERCENT: [u32; 6] = [0, 0, 50, 100, 150, 200];

/// Points awarded for every cell a special activation clears.
pub const DEFAULT_POINTS_PER_CLEARED_CELL: u64 = 10;

/// Score and currency rules applied to every cascade pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreTable {
    combo_bonus_percent: Vec<u32>,
    points_per_cleared_cell: u64,
}

impl ScoreTable {
    /// Creates a table with a custom streak bonus curve.
    ///
    /// The curve must be non-empty and non-decreasing; streaks beyond its end
    /// use the last entry.
    pub fn new(
        combo_bonus_percent: Vec<u32>,
        points_per_cleared_cell: u64,
    ) -> Result<Self, ScoreTableError> {
        if combo_bonus_percent.is_empty() {
            return Err(ScoreTableError::EmptyBonusCurve);
        }
        if let Some(index) = combo_bonus_percent
            .windows(2)
            .position(|pair| pair[1] < pair[0])
        {
            return Err(ScoreTableError::DecreasingBonus { index: index + 1 });
        }
        Ok(Self {
            combo_bonus_percent,
            points_per_cleared_cell,
        })
    }

    /// Streak bonus in percent for the given combo counter, clamped to the curve.
    #[must_use]
    pub fn combo_bonus_percent(&self, combo_counter: u32) -> u32 {
        let index = usize::try_from(combo_counter).unwrap_or(usize::MAX);
        self.combo_bonus_percent
            .get(index)
            .or_else(|| self.combo_bonus_percent.last())
            .copied()
            .unwrap_or(0)
    }

    /// Scales `points` by the streak multiplier for `combo_counter`.
    #[must_use]
    pub fn apply_multiplier(&self, points: u64, combo_counter: u32) -> u64 {
        let percent = 100 + u64::from(self.combo_bonus_percent(combo_counter));
        points.saturating_mul(percent) / 100
    }

    /// Points earned by the matches of one pass at the given streak.
    #[must_use]
    pub fn pass_score(&self, matches: &[Match], combo_counter: u32) -> u64 {
        matches
            .iter()
            .map(|found| self.apply_multiplier(u64::from(found.score_weight), combo_counter))
            .fold(0, u64::saturating_add)
    }

    /// Points earned by a special activation or combo clearing `cells_cleared` cells.
    #[must_use]
    pub fn clearance_score(
        &self,
        cells_cleared: usize,
        combo: Option<ComboKind>,
        combo_counter: u32,
    ) -> u64 {
        let cells = u64::try_from(cells_cleared).unwrap_or(u64::MAX);
        let base = cells
            .saturating_mul(self.points_per_cleared_cell)
            .saturating_add(combo.map_or(0, combo_bonus));
        self.apply_multiplier(base, combo_counter)
    }

    /// Currency earned by the matches of one pass; activations earn none.
    #[must_use]
    pub fn pass_currency(&self, matches: &[Match]) -> u64 {
        matches
            .iter()
            .map(|found| currency_for(found.shape))
            .fold(0, u64::saturating_add)
    }
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self {
            combo_bonus_percent: DEFAULT_COMBO_BONUS_PERCENT.to_vec(),
            points_per_cleared_cell: DEFAULT_POINTS_PER_CLEARED_CELL,
        }
    }
}

/// Currency awarded for a single match of the given shape.
#[must_use]
pub const fn currency_for(shape: ShapeClass) -> u64 {
    match shape {
        ShapeClass::Line3 => 1,
        ShapeClass::Line4 => 2,
        ShapeClass::LShape | ShapeClass::TShape => 3,
        ShapeClass::Line5Plus => 5,
    }
}

/// Flat bonus awarded on top of the per-cell points for each combo.
#[must_use]
pub const fn combo_bonus(kind: ComboKind) -> u64 {
    match kind {
        ComboKind::CrossBlast => 200,
        ComboKind::BandSweep | ComboKind::MegaBlast => 300,
        ComboKind::MultiColorClear => 350,
        ComboKind::ColorBlast => 500,
        ComboKind::BoardWipe => 800,
    }
}

/// Reasons a custom score table is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ScoreTableError {
    /// The streak bonus curve has no entries.
    #[error("combo bonus curve must have at least one entry")]
    EmptyBonusCurve,
    /// The streak bonus curve decreases.
    #[error("combo bonus decreases at index {index}")]
    DecreasingBonus {
        /// First entry that is lower than its predecessor.
        index: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_cascade_core::{Orientation, Position, TokenType};

    fn found(shape: ShapeClass, length: usize) -> Match {
        Match {
            cells: (0..length)
                .map(|column| Position::new(0, u32::try_from(column).expect("column")))
                .collect(),
            orientation: Orientation::Horizontal,
            shape,
            token: TokenType::new(0),
            score_weight: shape.score_weight(length),
            spawn_pivot: Position::new(0, 0),
        }
    }

    #[test]
    fn first_pass_scores_base_weight() {
        let table = ScoreTable::default();
        assert_eq!(table.pass_score(&[found(ShapeClass::Line4, 4)], 1), 60);
        assert_eq!(table.pass_score(&[found(ShapeClass::Line3, 3)], 0), 30);
    }

    #[test]
    fn streak_multiplier_grows_then_clamps() {
        let table = ScoreTable::default();
        let line = [found(ShapeClass::Line3, 3)];
        assert_eq!(table.pass_score(&line, 2), 45);
        assert_eq!(table.pass_score(&line, 3), 60);
        assert_eq!(table.pass_score(&line, 5), 90);
        assert_eq!(table.pass_score(&line, 40), 90);
        let mut previous = 0;
        for streak in 0..10 {
            let bonus = table.combo_bonus_percent(streak);
            assert!(bonus >= previous);
            previous = bonus;
        }
    }

    #[test]
    fn pass_score_sums_matches() {
        let table = ScoreTable::default();
        let matches = [found(ShapeClass::Line3, 3), found(ShapeClass::Line5Plus, 6)];
        assert_eq!(table.pass_score(&matches, 1), 230);
        assert_eq!(table.pass_currency(&matches), 6);
    }

    #[test]
    fn currency_is_not_proportional_to_score() {
        assert_eq!(currency_for(ShapeClass::Line3), 1);
        assert_eq!(currency_for(ShapeClass::TShape), 3);
        assert_eq!(currency_for(ShapeClass::Line5Plus), 5);
    }

    #[test]
    fn clearance_scores_cells_and_combo_bonus() {
        let table = ScoreTable::default();
        assert_eq!(table.clearance_score(8, None, 0), 80);
        assert_eq!(table.clearance_score(9, Some(ComboKind::CrossBlast), 0), 290);
        assert_eq!(table.clearance_score(9, Some(ComboKind::CrossBlast), 2), 435);
    }

    #[test]
    fn custom_curves_are_validated() {
        assert_eq!(
            ScoreTable::new(Vec::new(), 10),
            Err(ScoreTableError::EmptyBonusCurve)
        );
        assert_eq!(
            ScoreTable::new(vec![0, 50, 20], 10),
            Err(ScoreTableError::DecreasingBonus { index: 2 })
        );
        let table = ScoreTable::new(vec![10], 5).expect("valid curve");
        assert_eq!(table.apply_multiplier(100, 7), 110);
        assert_eq!(table.clearance_score(2, None, 0), 11);
    }
}
