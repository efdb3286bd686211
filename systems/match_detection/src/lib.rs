#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure match detection over immutable grid views.
//!
//! The detector finds maximal straight runs of identical ordinary tokens,
//! joins crossing horizontal and vertical runs into L/T composites, and
//! resolves overlaps so that every cell belongs to at most one match.

use tile_cascade_core::{
    GridView, Match, Orientation, Position, ShapeClass, TokenType, DEFAULT_MATCH_MIN_LENGTH,
};

/// Pure system that classifies runs of identical tokens into matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchDetector {
    min_length: usize,
}

impl MatchDetector {
    /// Creates a detector that accepts runs of at least `min_length` cells.
    #[must_use]
    pub fn new(min_length: u32) -> Self {
        Self {
            min_length: usize::try_from(min_length).unwrap_or(usize::MAX),
        }
    }

    /// Detects every non-overlapping match on the grid.
    ///
    /// Longer matches win contested cells; equal lengths keep first-found
    /// order (horizontal runs row-major, then vertical runs column by column,
    /// then composites).
    #[must_use]
    pub fn detect(&self, view: GridView<'_>) -> Vec<Match> {
        let horizontal = self.collect_runs(view, Orientation::Horizontal);
        let vertical = self.collect_runs(view, Orientation::Vertical);

        let mut candidates: Vec<Match> = horizontal
            .iter()
            .chain(vertical.iter())
            .filter_map(|run| line_match(run.cells.clone(), run.orientation, run.token))
            .collect();
        for across in &horizontal {
            for down in &vertical {
                if let Some(found) = composite_match(across, down) {
                    candidates.push(found);
                }
            }
        }

        candidates.sort_by(|left, right| right.len().cmp(&left.len()));
        self.resolve_overlaps(view, candidates)
    }

    /// Detects matches and moves each spawn pivot onto a focus cell it covers.
    ///
    /// The focus is normally the pair of cells a player just swapped.
    #[must_use]
    pub fn detect_with_focus(&self, view: GridView<'_>, focus: &[Position]) -> Vec<Match> {
        let mut matches = self.detect(view);
        for found in &mut matches {
            found.focus_pivot(focus);
        }
        matches
    }

    /// Reports whether the grid holds at least one run long enough to match.
    #[must_use]
    pub fn has_any_match(&self, view: GridView<'_>) -> bool {
        view.dimensions()
            .positions()
            .any(|position| self.has_match_through(view, position))
    }

    /// Reports whether a run through `position` reaches the minimum length.
    #[must_use]
    pub fn has_match_through(&self, view: GridView<'_>, position: Position) -> bool {
        let Some(token) = view.match_token(position) else {
            return false;
        };
        let extent = |row_step: i64, column_step: i64| {
            let mut length = 0;
            let mut cursor = position;
            while let Some(next) = cursor.offset(row_step, column_step) {
                if view.match_token(next) != Some(token) {
                    break;
                }
                length += 1;
                cursor = next;
            }
            length
        };
        let across = 1 + extent(0, -1) + extent(0, 1);
        let down = 1 + extent(-1, 0) + extent(1, 0);
        across >= self.min_length || down >= self.min_length
    }

    fn collect_runs(&self, view: GridView<'_>, orientation: Orientation) -> Vec<Run> {
        let dimensions = view.dimensions();
        let (outer, inner) = match orientation {
            Orientation::Vertical => (dimensions.columns(), dimensions.rows()),
            _ => (dimensions.rows(), dimensions.columns()),
        };

        let mut runs = Vec::new();
        for major in 0..outer {
            let mut cells = Vec::new();
            let mut current = None;
            for minor in 0..inner {
                let position = match orientation {
                    Orientation::Vertical => Position::new(minor, major),
                    _ => Position::new(major, minor),
                };
                let token = view.match_token(position);
                if token.is_some() && token == current {
                    cells.push(position);
                    continue;
                }
                self.close_run(&mut cells, current, orientation, &mut runs);
                current = token;
                if token.is_some() {
                    cells.push(position);
                }
            }
            self.close_run(&mut cells, current, orientation, &mut runs);
        }
        runs
    }

    fn close_run(
        &self,
        cells: &mut Vec<Position>,
        token: Option<TokenType>,
        orientation: Orientation,
        runs: &mut Vec<Run>,
    ) {
        let cells = std::mem::take(cells);
        if let Some(token) = token {
            if cells.len() >= self.min_length {
                runs.push(Run {
                    cells,
                    orientation,
                    token,
                });
            }
        }
    }

    fn resolve_overlaps(&self, view: GridView<'_>, candidates: Vec<Match>) -> Vec<Match> {
        let dimensions = view.dimensions();
        let mut claimed = vec![false; dimensions.cell_count()];
        let is_claimed = |claimed: &[bool], cell: Position| {
            dimensions
                .index(cell)
                .and_then(|index| claimed.get(index).copied())
                .unwrap_or(true)
        };

        let mut accepted = Vec::new();
        for candidate in candidates {
            let overlaps = candidate.cells.iter().any(|cell| is_claimed(&claimed, *cell));
            let kept = if !overlaps {
                Some(candidate)
            } else if candidate.orientation == Orientation::Composite {
                None
            } else {
                let remainder = longest_unclaimed(&candidate.cells, |cell| is_claimed(&claimed, cell));
                if remainder.len() >= self.min_length {
                    line_match(remainder.to_vec(), candidate.orientation, candidate.token)
                } else {
                    None
                }
            };

            if let Some(found) = kept {
                for cell in &found.cells {
                    if let Some(slot) = dimensions.index(*cell).and_then(|index| claimed.get_mut(index)) {
                        *slot = true;
                    }
                }
                accepted.push(found);
            }
        }
        accepted
    }
}

impl Default for MatchDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_MIN_LENGTH)
    }
}

/// Maximal straight run of one ordinary token.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Run {
    cells: Vec<Position>,
    orientation: Orientation,
    token: TokenType,
}

fn line_match(cells: Vec<Position>, orientation: Orientation, token: TokenType) -> Option<Match> {
    let pivot = cells.get(cells.len().checked_sub(1)? / 2).copied()?;
    let shape = ShapeClass::for_line(cells.len());
    Some(Match {
        score_weight: shape.score_weight(cells.len()),
        cells,
        orientation,
        shape,
        token,
        spawn_pivot: pivot,
    })
}

fn composite_match(across: &Run, down: &Run) -> Option<Match> {
    if across.token != down.token {
        return None;
    }
    let shared = across
        .cells
        .iter()
        .copied()
        .find(|cell| down.cells.contains(cell))?;
    let is_endpoint = |run: &Run| run.cells.first() == Some(&shared) || run.cells.last() == Some(&shared);
    let shape = if is_endpoint(across) && is_endpoint(down) {
        ShapeClass::LShape
    } else {
        ShapeClass::TShape
    };

    let mut cells = across.cells.clone();
    cells.extend(down.cells.iter().copied().filter(|cell| *cell != shared));
    Some(Match {
        score_weight: shape.score_weight(cells.len()),
        cells,
        orientation: Orientation::Composite,
        shape,
        token: across.token,
        spawn_pivot: shared,
    })
}

fn longest_unclaimed<F>(cells: &[Position], is_claimed: F) -> &[Position]
where
    F: Fn(Position) -> bool,
{
    let mut best = 0..0;
    let mut start = 0;
    for (index, cell) in cells.iter().enumerate() {
        if is_claimed(*cell) {
            start = index + 1;
            continue;
        }
        if index + 1 - start > best.len() {
            best = start..index + 1;
        }
    }
    cells.get(best).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(row: u32, columns: std::ops::Range<u32>) -> Vec<Position> {
        columns.map(|column| Position::new(row, column)).collect()
    }

    #[test]
    fn line_pivot_sits_in_the_middle() {
        let found = line_match(row(0, 0..4), Orientation::Horizontal, TokenType::new(1))
            .expect("match");
        assert_eq!(found.spawn_pivot, Position::new(0, 1));
        assert_eq!(found.shape, ShapeClass::Line4);

        let found = line_match(row(0, 0..5), Orientation::Horizontal, TokenType::new(1))
            .expect("match");
        assert_eq!(found.spawn_pivot, Position::new(0, 2));
        assert!(line_match(Vec::new(), Orientation::Horizontal, TokenType::new(1)).is_none());
    }

    #[test]
    fn longest_unclaimed_picks_widest_gap() {
        let cells = row(0, 0..7);
        let claimed = [Position::new(0, 1), Position::new(0, 5)];
        let remainder = longest_unclaimed(&cells, |cell| claimed.contains(&cell));
        assert_eq!(remainder, &cells[2..5]);
        assert!(longest_unclaimed(&cells, |_| true).is_empty());
    }

    #[test]
    fn composite_requires_same_token() {
        let across = Run {
            cells: row(0, 0..3),
            orientation: Orientation::Horizontal,
            token: TokenType::new(1),
        };
        let down = Run {
            cells: (0..3).map(|r| Position::new(r, 0)).collect(),
            orientation: Orientation::Vertical,
            token: TokenType::new(2),
        };
        assert!(composite_match(&across, &down).is_none());

        let down = Run {
            token: TokenType::new(1),
            ..down
        };
        let found = composite_match(&across, &down).expect("composite");
        assert_eq!(found.shape, ShapeClass::LShape);
        assert_eq!(found.len(), 5);
        assert_eq!(found.spawn_pivot, Position::new(0, 0));
    }
}
