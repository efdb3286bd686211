#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative board state management for Tile Cascade.
//!
//! The [`Board`] owns the grid of elements for one session. Systems never
//! mutate it directly: they emit [`Command`] batches that [`apply`] executes,
//! and observe the resulting [`Event`] stream. Read-only access goes through
//! the [`query`] module.

mod random;

pub use random::SeededRandom;

use thiserror::Error;
use tile_cascade_core::{
    choose_index, completes_run_behind, Command, Dimensions, Element, ElementId, Event,
    FallRecord, GridView, Position, RandomSource, RejectReason, SpecialKind, TokenType,
    ValidatedConfig,
};
use tracing::debug;

/// Represents the authoritative grid for one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    dimensions: Dimensions,
    token_type_count: u8,
    match_min_length: u32,
    cells: Vec<Option<Element>>,
    next_element_id: u64,
    swap_snapshot: Option<SwapSnapshot>,
}

/// The two cells touched by the most recent swap, as they were before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SwapSnapshot {
    first: Position,
    first_cell: Option<Element>,
    second: Position,
    second_cell: Option<Element>,
}

impl Board {
    /// Creates a board filled with random tokens and no immediate matches.
    ///
    /// Cells are filled in row-major order; each draws uniformly among the
    /// token types that would not complete a run with the cells to its left
    /// or above it.
    #[must_use]
    pub fn new(config: &ValidatedConfig, rng: &mut dyn RandomSource) -> Self {
        let mut board = Self::empty(config);
        let palette: Vec<TokenType> = (0..board.token_type_count).map(TokenType::new).collect();
        let mut candidates = Vec::with_capacity(palette.len());

        for position in board.dimensions.positions() {
            candidates.clear();
            for token in &palette {
                let lookup = |cell: Position| board.match_token(cell);
                if !completes_run_behind(lookup, position, *token, board.match_min_length) {
                    candidates.push(*token);
                }
            }
            let pick = choose_index(rng, candidates.len())
                .and_then(|index| candidates.get(index).copied())
                .unwrap_or_else(|| TokenType::new(0));
            let element = board.create_ordinary(pick, position);
            let _ = board.set_element(position, Some(element));
        }

        debug!(
            rows = board.dimensions.rows(),
            columns = board.dimensions.columns(),
            "board filled"
        );
        board
    }

    /// Creates a board from an explicit row-major layout.
    ///
    /// Every cell must be occupied and use a token inside the configured
    /// palette. The layout is taken as-is; pre-existing matches are not
    /// removed.
    pub fn from_layout(
        config: &ValidatedConfig,
        layout: &[Option<(TokenType, SpecialKind)>],
    ) -> Result<Self, LayoutError> {
        let mut board = Self::empty(config);
        if layout.len() != board.dimensions.cell_count() {
            return Err(LayoutError::DimensionMismatch {
                expected: board.dimensions.cell_count(),
                actual: layout.len(),
            });
        }

        for (index, cell) in layout.iter().copied().enumerate() {
            let Some(position) = board.dimensions.position(index) else {
                continue;
            };
            let Some((token, special)) = cell else {
                return Err(LayoutError::EmptyCell { position });
            };
            if token.get() >= board.token_type_count {
                return Err(LayoutError::UnknownToken { token, position });
            }
            let id = board.allocate_id();
            let element = Element::special(id, token, special, position);
            let _ = board.set_element(position, Some(element));
        }

        Ok(board)
    }

    /// Creates a board of ordinary tokens from rows of palette indices.
    pub fn from_token_rows(config: &ValidatedConfig, rows: &[&[u8]]) -> Result<Self, LayoutError> {
        let dimensions = config.dimensions();
        let row_count = usize::try_from(dimensions.rows()).unwrap_or(usize::MAX);
        let column_count = usize::try_from(dimensions.columns()).unwrap_or(usize::MAX);
        if rows.len() != row_count || rows.iter().any(|row| row.len() != column_count) {
            return Err(LayoutError::DimensionMismatch {
                expected: dimensions.cell_count(),
                actual: rows.iter().map(|row| row.len()).sum(),
            });
        }

        let layout: Vec<Option<(TokenType, SpecialKind)>> = rows
            .iter()
            .flat_map(|row| row.iter())
            .map(|token| Some((TokenType::new(*token), SpecialKind::None)))
            .collect();
        Self::from_layout(config, &layout)
    }

    fn empty(config: &ValidatedConfig) -> Self {
        let dimensions = config.dimensions();
        Self {
            dimensions,
            token_type_count: config.token_type_count(),
            match_min_length: config.match_min_length(),
            cells: vec![None; dimensions.cell_count()],
            next_element_id: 0,
            swap_snapshot: None,
        }
    }

    /// Board extent; fixed for the lifetime of the board.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Number of ordinary token flavours.
    #[must_use]
    pub const fn token_type_count(&self) -> u8 {
        self.token_type_count
    }

    /// Minimum run length that counts as a match.
    #[must_use]
    pub const fn match_min_length(&self) -> u32 {
        self.match_min_length
    }

    /// Reports whether the position lies inside the board.
    #[must_use]
    pub const fn is_valid_position(&self, position: Position) -> bool {
        self.dimensions.contains(position)
    }

    /// Returns the element occupying the cell; `None` for empty or out-of-bounds cells.
    #[must_use]
    pub fn element(&self, position: Position) -> Option<&Element> {
        self.dimensions
            .index(position)
            .and_then(|index| self.cells.get(index))
            .and_then(Option::as_ref)
    }

    /// Replaces the content of a cell, stamping the element with its new position.
    ///
    /// Returns `false` without mutating anything when the position is out of bounds.
    pub fn set_element(&mut self, position: Position, element: Option<Element>) -> bool {
        let Some(slot) = self
            .dimensions
            .index(position)
            .and_then(|index| self.cells.get_mut(index))
        else {
            return false;
        };
        *slot = element.map(|element| element.at(position));
        true
    }

    /// Replaces the content of a cell with a freshly created special element.
    ///
    /// Returns the new element, or `None` when the position is out of bounds.
    pub fn place_special(
        &mut self,
        position: Position,
        token: TokenType,
        kind: SpecialKind,
    ) -> Option<Element> {
        if !self.is_valid_position(position) {
            return None;
        }
        let element = Element::special(self.allocate_id(), token, kind, position);
        let _ = self.set_element(position, Some(element));
        Some(element)
    }

    /// Exchanges two adjacent cells, capturing both for a later rollback.
    ///
    /// Rejected requests leave the board untouched.
    pub fn swap(&mut self, first: Position, second: Position) -> Result<(), RejectReason> {
        validate_swap(self.dimensions, first, second)?;

        let first_cell = self.element(first).copied();
        let second_cell = self.element(second).copied();
        self.swap_snapshot = Some(SwapSnapshot {
            first,
            first_cell,
            second,
            second_cell,
        });
        let _ = self.set_element(first, second_cell);
        let _ = self.set_element(second, first_cell);
        Ok(())
    }

    /// Restores the two cells captured by the most recent swap.
    ///
    /// Returns the swapped positions, or `None` when no swap is pending.
    pub fn revert_swap(&mut self) -> Option<(Position, Position)> {
        let snapshot = self.swap_snapshot.take()?;
        let _ = self.set_element(snapshot.first, snapshot.first_cell);
        let _ = self.set_element(snapshot.second, snapshot.second_cell);
        Some((snapshot.first, snapshot.second))
    }

    /// Makes the most recent swap permanent by discarding its snapshot.
    pub fn commit_swap(&mut self) -> Option<(Position, Position)> {
        self.swap_snapshot
            .take()
            .map(|snapshot| (snapshot.first, snapshot.second))
    }

    /// Captures a read-only view of the grid.
    #[must_use]
    pub fn view(&self) -> GridView<'_> {
        GridView::new(&self.cells, self.dimensions)
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Reports whether every cell is occupied.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    fn match_token(&self, position: Position) -> Option<TokenType> {
        self.element(position).and_then(Element::match_token)
    }

    fn allocate_id(&mut self) -> ElementId {
        let id = ElementId::new(self.next_element_id);
        self.next_element_id = self.next_element_id.saturating_add(1);
        id
    }

    fn create_ordinary(&mut self, token: TokenType, position: Position) -> Element {
        Element::ordinary(self.allocate_id(), token, position)
    }

    fn remove_cells(&mut self, cells: Vec<Position>, out_events: &mut Vec<Event>) {
        let mut cells = cells;
        cells.sort_unstable();
        cells.dedup();
        for position in cells {
            let Some(slot) = self
                .dimensions
                .index(position)
                .and_then(|index| self.cells.get_mut(index))
            else {
                continue;
            };
            if let Some(element) = slot.take() {
                out_events.push(Event::ElementRemoved { element });
            }
        }
    }

    fn spawn_special(
        &mut self,
        position: Position,
        token: TokenType,
        kind: SpecialKind,
        out_events: &mut Vec<Event>,
    ) {
        if !self.is_valid_position(position) || !kind.is_special() {
            return;
        }
        if let Some(previous) = self.element(position).copied() {
            out_events.push(Event::ElementRemoved { element: previous });
        }
        if let Some(element) = self.place_special(position, token, kind) {
            out_events.push(Event::SpecialSpawned { element });
        }
    }

    fn apply_gravity(&mut self, out_events: &mut Vec<Event>) {
        let rows = self.dimensions.rows();
        for column in 0..self.dimensions.columns() {
            let mut write_row = rows;
            for read_row in (0..rows).rev() {
                let from = Position::new(read_row, column);
                let Some(element) = self.element(from).copied() else {
                    continue;
                };
                write_row -= 1;
                if write_row == read_row {
                    continue;
                }
                let to = Position::new(write_row, column);
                let _ = self.set_element(to, Some(element));
                let _ = self.set_element(from, None);
                out_events.push(Event::ElementFell {
                    fall: FallRecord {
                        from_row: read_row,
                        to_row: write_row,
                        column,
                    },
                });
            }
        }
    }

    fn refill(&mut self, tokens: Vec<TokenType>, out_events: &mut Vec<Event>) {
        let mut tokens = tokens.into_iter();
        for column in 0..self.dimensions.columns() {
            for row in 0..self.dimensions.rows() {
                let position = Position::new(row, column);
                if self.element(position).is_some() {
                    continue;
                }
                let Some(token) = tokens.next() else {
                    return;
                };
                let element = self.create_ordinary(token, position);
                let _ = self.set_element(position, Some(element));
                out_events.push(Event::CellRefilled { element });
            }
        }
    }

    fn rearrange(&mut self, tokens: Vec<TokenType>, out_events: &mut Vec<Event>) {
        let ordinary: Vec<Element> = self
            .view()
            .iter()
            .filter(|element| !element.is_special())
            .copied()
            .collect();
        if ordinary.len() != tokens.len() {
            debug!(
                expected = ordinary.len(),
                actual = tokens.len(),
                "rearrange ignored"
            );
            return;
        }

        for (element, token) in ordinary.iter().zip(tokens) {
            let position = element.position();
            let _ = self.set_element(
                position,
                Some(Element::ordinary(element.id(), token, position)),
            );
        }
        out_events.push(Event::BoardRearranged {
            cells: u32::try_from(ordinary.len()).unwrap_or(u32::MAX),
        });
    }
}

/// Checks that two positions describe a legal swap on a board of the given extent.
pub fn validate_swap(
    dimensions: Dimensions,
    first: Position,
    second: Position,
) -> Result<(), RejectReason> {
    if !dimensions.contains(first) || !dimensions.contains(second) {
        return Err(RejectReason::OutOfBounds);
    }
    if !first.is_adjacent(second) {
        return Err(RejectReason::NotAdjacent);
    }
    Ok(())
}

/// Applies the provided command to the board, mutating state deterministically.
pub fn apply(board: &mut Board, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::SwapCells { first, second } => match board.swap(first, second) {
            Ok(()) => out_events.push(Event::CellsSwapped { first, second }),
            Err(reason) => {
                debug!(?first, ?second, ?reason, "swap rejected");
                out_events.push(Event::SwapRejected {
                    first,
                    second,
                    reason,
                });
            }
        },
        Command::RevertSwap => {
            if let Some((first, second)) = board.revert_swap() {
                out_events.push(Event::SwapReverted { first, second });
            }
        }
        Command::CommitSwap => {
            if let Some((first, second)) = board.commit_swap() {
                out_events.push(Event::SwapCommitted { first, second });
            }
        }
        Command::RemoveCells { cells } => board.remove_cells(cells, out_events),
        Command::SpawnSpecial {
            position,
            token,
            kind,
        } => board.spawn_special(position, token, kind, out_events),
        Command::ApplyGravity => board.apply_gravity(out_events),
        Command::Refill { tokens } => board.refill(tokens, out_events),
        Command::Rearrange { tokens } => board.rearrange(tokens, out_events),
    }
}

/// Query functions that provide read-only access to the board state.
pub mod query {
    use super::Board;
    use tile_cascade_core::{Dimensions, GridView};

    /// Captures a read-only view of the grid.
    #[must_use]
    pub fn grid_view(board: &Board) -> GridView<'_> {
        board.view()
    }

    /// Provides the board extent.
    #[must_use]
    pub fn dimensions(board: &Board) -> Dimensions {
        board.dimensions
    }

    /// Number of empty cells.
    #[must_use]
    pub fn vacancy_count(board: &Board) -> usize {
        board.dimensions.cell_count() - board.occupied_count()
    }
}

/// Reasons a caller-supplied layout is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The layout does not cover the configured board exactly.
    #[error("layout provides {actual} cells but the board has {expected}")]
    DimensionMismatch {
        /// Number of cells on the configured board.
        expected: usize,
        /// Number of cells in the layout.
        actual: usize,
    },
    /// A cell uses a token outside the configured palette.
    #[error("token {} at {position:?} is outside the palette", token.get())]
    UnknownToken {
        /// Offending token.
        token: TokenType,
        /// Cell holding the offending token.
        position: Position,
    },
    /// A cell is empty; boards are always full between operations.
    #[error("cell {position:?} is empty")]
    EmptyCell {
        /// First empty cell in row-major order.
        position: Position,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_cascade_core::EngineConfig;

    fn config(rows: u32, columns: u32) -> ValidatedConfig {
        EngineConfig::new(rows, columns, 4)
            .validate()
            .expect("valid config")
    }

    fn board_from(rows: &[&[u8]]) -> Board {
        let row_count = u32::try_from(rows.len()).expect("rows");
        let column_count = u32::try_from(rows[0].len()).expect("columns");
        Board::from_token_rows(&config(row_count, column_count), rows).expect("layout")
    }

    fn tokens(board: &Board) -> Vec<Vec<Option<u8>>> {
        let dimensions = board.dimensions();
        (0..dimensions.rows())
            .map(|row| {
                (0..dimensions.columns())
                    .map(|column| {
                        board
                            .element(Position::new(row, column))
                            .map(|element| element.token().get())
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn new_board_is_full() {
        let mut rng = SeededRandom::new(11);
        let board = Board::new(&config(6, 8), &mut rng);
        assert!(board.is_full());
        assert_eq!(board.occupied_count(), 48);
        assert!(board.view().iter().all(|element| !element.is_special()));
    }

    #[test]
    fn new_board_is_deterministic_for_seed() {
        let first = Board::new(&config(7, 7), &mut SeededRandom::new(99));
        let second = Board::new(&config(7, 7), &mut SeededRandom::new(99));
        assert_eq!(first, second);
    }

    #[test]
    fn accessors_are_bounds_checked() {
        let mut board = board_from(&[&[0, 1, 2], &[1, 2, 0]]);
        let outside = Position::new(2, 0);
        assert!(!board.is_valid_position(outside));
        assert!(board.element(outside).is_none());
        assert!(!board.set_element(outside, None));
        assert!(board.set_element(Position::new(0, 0), None));
        assert!(board.element(Position::new(0, 0)).is_none());
    }

    #[test]
    fn set_element_stamps_position() {
        let mut board = board_from(&[&[0, 1, 2], &[1, 2, 0]]);
        let element = *board.element(Position::new(0, 0)).expect("element");
        assert!(board.set_element(Position::new(1, 2), Some(element)));
        let moved = board.element(Position::new(1, 2)).expect("moved");
        assert_eq!(moved.position(), Position::new(1, 2));
        assert_eq!(moved.id(), element.id());
    }

    #[test]
    fn swap_rejects_without_mutation() {
        let mut board = board_from(&[&[0, 1, 2], &[1, 2, 0]]);
        let before = board.clone();
        assert_eq!(
            board.swap(Position::new(0, 0), Position::new(1, 1)),
            Err(RejectReason::NotAdjacent)
        );
        assert_eq!(
            board.swap(Position::new(0, 2), Position::new(0, 3)),
            Err(RejectReason::OutOfBounds)
        );
        assert_eq!(board, before);
    }

    #[test]
    fn revert_restores_both_cells() {
        let mut board = board_from(&[&[0, 1, 2], &[1, 2, 0]]);
        let before = tokens(&board);
        board
            .swap(Position::new(0, 0), Position::new(0, 1))
            .expect("swap");
        assert_eq!(tokens(&board)[0], vec![Some(1), Some(0), Some(2)]);
        assert_eq!(
            board.revert_swap(),
            Some((Position::new(0, 0), Position::new(0, 1)))
        );
        assert_eq!(tokens(&board), before);
        assert_eq!(board.revert_swap(), None);
    }

    #[test]
    fn gravity_compacts_columns_stably() {
        let mut board = board_from(&[&[0, 1], &[2, 3], &[1, 0]]);
        let mut events = Vec::new();
        apply(
            &mut board,
            Command::RemoveCells {
                cells: vec![Position::new(2, 0), Position::new(1, 1)],
            },
            &mut events,
        );
        assert_eq!(events.len(), 2);

        events.clear();
        apply(&mut board, Command::ApplyGravity, &mut events);
        assert_eq!(
            tokens(&board),
            vec![vec![None, None], vec![Some(0), Some(1)], vec![Some(2), Some(0)]]
        );
        let falls: Vec<FallRecord> = events
            .iter()
            .filter_map(|event| match event {
                Event::ElementFell { fall } => Some(*fall),
                _ => None,
            })
            .collect();
        assert_eq!(
            falls,
            vec![
                FallRecord {
                    from_row: 1,
                    to_row: 2,
                    column: 0
                },
                FallRecord {
                    from_row: 0,
                    to_row: 1,
                    column: 0
                },
                FallRecord {
                    from_row: 0,
                    to_row: 1,
                    column: 1
                },
            ]
        );
    }

    #[test]
    fn refill_fills_vacancies_column_by_column() {
        let mut board = board_from(&[&[0, 1], &[2, 3], &[1, 0]]);
        let mut events = Vec::new();
        apply(
            &mut board,
            Command::RemoveCells {
                cells: vec![Position::new(0, 0), Position::new(0, 1)],
            },
            &mut events,
        );
        events.clear();
        apply(
            &mut board,
            Command::Refill {
                tokens: vec![TokenType::new(3), TokenType::new(2)],
            },
            &mut events,
        );
        assert!(board.is_full());
        assert_eq!(tokens(&board)[0], vec![Some(3), Some(2)]);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn spawn_special_replaces_cell_content() {
        let mut board = board_from(&[&[0, 1], &[2, 3], &[1, 0]]);
        let mut events = Vec::new();
        apply(
            &mut board,
            Command::SpawnSpecial {
                position: Position::new(1, 1),
                token: TokenType::new(3),
                kind: SpecialKind::AreaBlast,
            },
            &mut events,
        );
        assert!(matches!(events[0], Event::ElementRemoved { .. }));
        assert!(matches!(events[1], Event::SpecialSpawned { .. }));
        assert!(board
            .element(Position::new(1, 1))
            .is_some_and(Element::is_special));
    }

    #[test]
    fn rearrange_requires_one_token_per_ordinary_cell() {
        let mut board = board_from(&[&[0, 1], &[2, 3], &[1, 0]]);
        let _ = board.place_special(
            Position::new(0, 0),
            TokenType::new(0),
            SpecialKind::ColorClear,
        );
        let mut events = Vec::new();
        apply(
            &mut board,
            Command::Rearrange {
                tokens: vec![TokenType::new(0); 6],
            },
            &mut events,
        );
        assert!(events.is_empty());

        let tokens_in_order = [3, 3, 1, 2, 2].map(TokenType::new).to_vec();
        apply(
            &mut board,
            Command::Rearrange {
                tokens: tokens_in_order,
            },
            &mut events,
        );
        assert_eq!(events, vec![Event::BoardRearranged { cells: 5 }]);
        assert_eq!(
            tokens(&board),
            vec![
                vec![Some(0), Some(3)],
                vec![Some(3), Some(1)],
                vec![Some(2), Some(2)]
            ]
        );
        assert!(board
            .element(Position::new(0, 0))
            .is_some_and(Element::is_special));
    }

    #[test]
    fn layout_rejects_empty_cells() {
        let layout = [
            Some((TokenType::new(0), SpecialKind::None)),
            None,
            Some((TokenType::new(1), SpecialKind::ColorClear)),
        ];
        assert_eq!(
            Board::from_layout(&config(1, 3), &layout),
            Err(LayoutError::EmptyCell {
                position: Position::new(0, 1)
            })
        );
    }

    #[test]
    fn layout_rejects_unknown_tokens() {
        let error = Board::from_token_rows(&config(1, 3), &[&[0, 9, 1]]).expect_err("bad token");
        assert_eq!(
            error,
            LayoutError::UnknownToken {
                token: TokenType::new(9),
                position: Position::new(0, 1)
            }
        );
    }
}
