#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tile Cascade engine.
//!
//! This crate defines the message surface that connects the session facade,
//! the authoritative board, and pure systems. Systems read immutable
//! [`GridView`] snapshots and respond with [`Command`] batches describing
//! desired mutations; the board executes those commands via its `apply`
//! entry point and broadcasts [`Event`] values describing what changed.
//! Result records such as [`Match`] and [`CascadePass`] are plain data that
//! presentation and reward collaborators consume.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum run length that counts as a match unless configured otherwise.
pub const DEFAULT_MATCH_MIN_LENGTH: u32 = 3;

/// Number of reshuffles attempted before a board is reported as exhausted.
pub const DEFAULT_MAX_SHUFFLE_ATTEMPTS: u32 = 10;

/// Smallest palette for which a match-free fill is always possible.
pub const MIN_TOKEN_TYPES: u8 = 3;

/// Largest palette the engine accepts.
pub const MAX_TOKEN_TYPES: u8 = 16;

/// Largest number of rows or columns a board may have.
pub const MAX_DIMENSION: u32 = 256;

/// Commands that express all permissible board mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Exchanges the contents of two adjacent cells, remembering both for rollback.
    SwapCells {
        /// Cell the player picked up.
        first: Position,
        /// Cell the picked element moves into.
        second: Position,
    },
    /// Restores the two cells captured by the most recent swap.
    RevertSwap,
    /// Discards the two-cell snapshot, making the most recent swap permanent.
    CommitSwap,
    /// Empties every listed cell.
    RemoveCells {
        /// Cells to clear; empty or out-of-bounds cells are ignored.
        cells: Vec<Position>,
    },
    /// Places a freshly created special element into a cell.
    SpawnSpecial {
        /// Cell that receives the special element.
        position: Position,
        /// Token type inherited from the match that produced the special.
        token: TokenType,
        /// Kind of special to create.
        kind: SpecialKind,
    },
    /// Compacts every column toward the bottom row, preserving relative order.
    ApplyGravity,
    /// Fills empty cells with new ordinary elements.
    ///
    /// Vacancies are visited column by column (left to right), top to bottom
    /// within a column; each consumes the next token in order.
    Refill {
        /// Token types to place, one per vacancy.
        tokens: Vec<TokenType>,
    },
    /// Redistributes ordinary tokens over the ordinary cells in row-major order.
    ///
    /// Special elements stay where they are. The command is ignored unless
    /// exactly one token is supplied per ordinary cell.
    Rearrange {
        /// Token types to assign, one per ordinary cell.
        tokens: Vec<TokenType>,
    },
}

/// Events broadcast by the board after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that two cells exchanged their contents.
    CellsSwapped {
        /// Cell the player picked up.
        first: Position,
        /// Cell the picked element moved into.
        second: Position,
    },
    /// Reports that a swap request was rejected without touching the board.
    SwapRejected {
        /// Cell the player picked up.
        first: Position,
        /// Cell the player attempted to move into.
        second: Position,
        /// Specific reason the swap failed.
        reason: RejectReason,
    },
    /// Confirms that the most recent swap was rolled back.
    SwapReverted {
        /// Cell the player picked up.
        first: Position,
        /// Cell the picked element had moved into.
        second: Position,
    },
    /// Confirms that the most recent swap became permanent.
    SwapCommitted {
        /// Cell the player picked up.
        first: Position,
        /// Cell the picked element moved into.
        second: Position,
    },
    /// Confirms that an element left the board.
    ElementRemoved {
        /// Element as it was immediately before removal.
        element: Element,
    },
    /// Confirms that a special element was created.
    SpecialSpawned {
        /// Newly created special element.
        element: Element,
    },
    /// Confirms that an element dropped within its column.
    ElementFell {
        /// Column and rows describing the drop.
        fall: FallRecord,
    },
    /// Confirms that an empty cell received a new ordinary element.
    CellRefilled {
        /// Newly created element.
        element: Element,
    },
    /// Confirms that ordinary tokens were redistributed.
    BoardRearranged {
        /// Number of ordinary cells that were reassigned.
        cells: u32,
    },
}

/// Location of a single grid cell expressed as row and column coordinates.
///
/// Row zero is the top of the board; gravity pulls toward higher rows. The
/// derived ordering is row-major.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    row: u32,
    column: u32,
}

impl Position {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Computes the Manhattan distance between two positions.
    #[must_use]
    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.row.abs_diff(other.row) + self.column.abs_diff(other.column)
    }

    /// Reports whether the positions are 4-directional neighbours.
    #[must_use]
    pub fn is_adjacent(self, other: Position) -> bool {
        self.manhattan_distance(other) == 1
    }

    /// Returns the position displaced by the provided deltas, if it stays non-negative.
    #[must_use]
    pub fn offset(self, row_delta: i64, column_delta: i64) -> Option<Position> {
        let row = u32::try_from(i64::from(self.row) + row_delta).ok()?;
        let column = u32::try_from(i64::from(self.column) + column_delta).ok()?;
        Some(Position::new(row, column))
    }
}

/// Immutable extent of a board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    rows: u32,
    columns: u32,
}

impl Dimensions {
    /// Creates a new dimension descriptor.
    #[must_use]
    pub const fn new(rows: u32, columns: u32) -> Self {
        Self { rows, columns }
    }

    /// Number of rows on the board.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns on the board.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Total number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        usize::try_from(u64::from(self.rows) * u64::from(self.columns)).unwrap_or(usize::MAX)
    }

    /// Reports whether the position lies inside the board.
    #[must_use]
    pub const fn contains(&self, position: Position) -> bool {
        position.row < self.rows && position.column < self.columns
    }

    /// Converts a position into its row-major storage index.
    #[must_use]
    pub fn index(&self, position: Position) -> Option<usize> {
        if !self.contains(position) {
            return None;
        }
        let row = usize::try_from(position.row).ok()?;
        let column = usize::try_from(position.column).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        Some(row * width + column)
    }

    /// Converts a row-major storage index back into a position.
    #[must_use]
    pub fn position(&self, index: usize) -> Option<Position> {
        let width = usize::try_from(self.columns).ok()?;
        if width == 0 || index >= self.cell_count() {
            return None;
        }
        let row = u32::try_from(index / width).ok()?;
        let column = u32::try_from(index % width).ok()?;
        Some(Position::new(row, column))
    }

    /// Iterates every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> {
        let columns = self.columns;
        (0..self.rows).flat_map(move |row| (0..columns).map(move |column| Position::new(row, column)))
    }
}

/// One of the ordinary token flavours, numbered from zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenType(u8);

impl TokenType {
    /// Creates a token type from its palette index.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Retrieves the palette index.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

/// Power carried by an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpecialKind {
    /// Ordinary element without a power.
    #[default]
    None,
    /// Clears every cell in the element's row.
    LineClearRow,
    /// Clears every cell in the element's column.
    LineClearColumn,
    /// Clears the 3×3 area centred on the element.
    AreaBlast,
    /// Clears every element of one ordinary token type.
    ColorClear,
}

impl SpecialKind {
    /// Reports whether the kind carries a power.
    #[must_use]
    pub const fn is_special(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Unique identifier assigned to every element the board creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(u64);

impl ElementId {
    /// Creates a new element identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Content of a single occupied cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Element {
    id: ElementId,
    token: TokenType,
    special: SpecialKind,
    position: Position,
}

impl Element {
    /// Creates an ordinary element.
    #[must_use]
    pub const fn ordinary(id: ElementId, token: TokenType, position: Position) -> Self {
        Self {
            id,
            token,
            special: SpecialKind::None,
            position,
        }
    }

    /// Creates an element carrying the provided special power.
    #[must_use]
    pub const fn special(
        id: ElementId,
        token: TokenType,
        special: SpecialKind,
        position: Position,
    ) -> Self {
        Self {
            id,
            token,
            special,
            position,
        }
    }

    /// Identifier allocated by the board when the element was created.
    #[must_use]
    pub const fn id(&self) -> ElementId {
        self.id
    }

    /// Token flavour of the element.
    #[must_use]
    pub const fn token(&self) -> TokenType {
        self.token
    }

    /// Special power carried by the element.
    #[must_use]
    pub const fn special_kind(&self) -> SpecialKind {
        self.special
    }

    /// Cell the element occupies.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Reports whether the element carries a special power.
    #[must_use]
    pub const fn is_special(&self) -> bool {
        self.special.is_special()
    }

    /// Token used for match detection; special elements never take part in runs.
    #[must_use]
    pub const fn match_token(&self) -> Option<TokenType> {
        if self.is_special() {
            None
        } else {
            Some(self.token)
        }
    }

    /// Returns a copy of the element relocated to `position`.
    #[must_use]
    pub const fn at(self, position: Position) -> Self {
        Self { position, ..self }
    }
}

/// Axis along which a match was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Run along a row.
    Horizontal,
    /// Run along a column.
    Vertical,
    /// Horizontal and vertical runs sharing a cell.
    Composite,
}

/// Shape classification that drives scoring and special spawning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShapeClass {
    /// Straight run of exactly three.
    Line3,
    /// Straight run of exactly four.
    Line4,
    /// Horizontal and vertical runs joined at a shared end.
    LShape,
    /// Horizontal and vertical runs joined away from at least one end.
    TShape,
    /// Straight run of five or more.
    Line5Plus,
}

/// Weight added for every cell a long run or composite covers beyond five.
const EXTRA_CELL_SCORE: u32 = 50;

impl ShapeClass {
    /// Classifies a straight run by its length.
    #[must_use]
    pub const fn for_line(length: usize) -> Self {
        match length {
            0..=3 => Self::Line3,
            4 => Self::Line4,
            _ => Self::Line5Plus,
        }
    }

    /// Base score awarded for a match of this shape.
    ///
    /// Composite shapes sit between `Line4` and `Line5Plus`.
    #[must_use]
    pub const fn base_score(self) -> u32 {
        match self {
            Self::Line3 => 30,
            Self::Line4 => 60,
            Self::LShape => 90,
            Self::TShape => 100,
            Self::Line5Plus => 150,
        }
    }

    /// Score weight for a match of this shape covering `length` cells.
    ///
    /// Straight runs past five and composites past their minimal five cells
    /// earn 50 points per additional cell, so a larger shape never weighs less
    /// than a line it contains.
    #[must_use]
    pub fn score_weight(self, length: usize) -> u32 {
        match self {
            Self::Line5Plus | Self::LShape | Self::TShape => {
                let extra = u32::try_from(length.saturating_sub(5)).unwrap_or(u32::MAX);
                self.base_score().saturating_add(extra.saturating_mul(EXTRA_CELL_SCORE))
            }
            Self::Line3 | Self::Line4 => self.base_score(),
        }
    }
}

/// A detected run or composite shape of identical ordinary tokens.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Match {
    /// Cells covered by the match, in scan order.
    pub cells: Vec<Position>,
    /// Axis the match was found along.
    pub orientation: Orientation,
    /// Shape classification of the match.
    pub shape: ShapeClass,
    /// Token flavour shared by every cell.
    pub token: TokenType,
    /// Points contributed before any combo-streak multiplier.
    pub score_weight: u32,
    /// Cell that receives a special spawned from this match.
    pub spawn_pivot: Position,
}

impl Match {
    /// Number of cells covered by the match.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the match covers no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reports whether the match covers `position`.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        self.cells.contains(&position)
    }

    /// Moves the spawn pivot onto the first focus cell the match covers.
    ///
    /// Swapped cells are passed as focus so the special appears where the
    /// player acted.
    pub fn focus_pivot(&mut self, focus: &[Position]) {
        if let Some(cell) = focus.iter().copied().find(|cell| self.contains(*cell)) {
            self.spawn_pivot = cell;
        }
    }
}

/// Drop of a single element during gravity compaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FallRecord {
    /// Row the element occupied before falling.
    pub from_row: u32,
    /// Row the element occupies after falling.
    pub to_row: u32,
    /// Column the element fell within.
    pub column: u32,
}

/// Element created to fill a vacancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefillRecord {
    /// Cell that was filled.
    pub position: Position,
    /// Token type placed into the cell.
    pub token: TokenType,
}

/// One Detect → Remove → Fall → Refill cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CascadePass {
    /// Zero-based index of the pass within its turn.
    pub index: u32,
    /// Matches detected at the start of the pass.
    pub matches: Vec<Match>,
    /// Cells emptied during the removing phase, in row-major order.
    pub removed: Vec<Position>,
    /// Element drops recorded during the gravity phase.
    pub fallen: Vec<FallRecord>,
    /// Vacancies filled during the refilling phase.
    pub refilled: Vec<RefillRecord>,
    /// Special elements created during the pass.
    pub specials_spawned: Vec<Element>,
    /// Combo streak value after the pass.
    pub combo_count: u32,
    /// Points earned by the pass.
    pub score_delta: u64,
    /// Currency earned by the pass.
    pub currency_delta: u64,
}

/// Effect produced when two special elements are swapped into each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComboKind {
    /// LineClear + LineClear: full row and column through the anchor.
    CrossBlast,
    /// LineClear + AreaBlast: 3×3 blasts along the line's orientation.
    BandSweep,
    /// LineClear + ColorClear: every instance of up to three token types.
    MultiColorClear,
    /// AreaBlast + AreaBlast: 5×5 blast around the anchor.
    MegaBlast,
    /// AreaBlast + ColorClear: small blasts around every ordinary cell.
    ColorBlast,
    /// ColorClear + ColorClear: every ordinary element on the board.
    BoardWipe,
}

/// Outcome of combining two special elements.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComboResolution {
    /// Combo effect that fired.
    pub kind: ComboKind,
    /// Cell the effect was centred on.
    pub anchor: Position,
    /// Every cell cleared by the combo and any specials it set off, row-major.
    pub cells_cleared: Vec<Position>,
    /// Points awarded for the combo.
    pub derived_score: u64,
}

/// Reasons a move request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// At least one position lies outside the board.
    OutOfBounds,
    /// The positions are not 4-directional neighbours.
    NotAdjacent,
    /// The swap would not form a match and involved no special element.
    NoMatchFormed,
    /// No special element occupies the requested position.
    NoSpecialAtPosition,
    /// The session's move budget is exhausted.
    OutOfMoves,
}

/// Session configuration as supplied by callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of board rows.
    pub rows: u32,
    /// Number of board columns.
    pub columns: u32,
    /// Number of ordinary token flavours.
    pub token_type_count: u8,
    /// Minimum run length that counts as a match.
    pub match_min_length: u32,
    /// Reshuffles attempted before reporting an exhausted board.
    pub max_shuffle_attempts: u32,
    /// Optional number of moves the session allows.
    pub move_limit: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rows: 8,
            columns: 8,
            token_type_count: 6,
            match_min_length: DEFAULT_MATCH_MIN_LENGTH,
            max_shuffle_attempts: DEFAULT_MAX_SHUFFLE_ATTEMPTS,
            move_limit: None,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with default rules for the provided board.
    #[must_use]
    pub fn new(rows: u32, columns: u32, token_type_count: u8) -> Self {
        Self {
            rows,
            columns,
            token_type_count,
            ..Self::default()
        }
    }

    /// Checks every bound the engine relies on.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        if self.rows == 0 {
            return Err(ConfigError::ZeroRows);
        }
        if self.columns == 0 {
            return Err(ConfigError::ZeroColumns);
        }
        if self.rows > MAX_DIMENSION || self.columns > MAX_DIMENSION {
            return Err(ConfigError::BoardTooLarge {
                rows: self.rows,
                columns: self.columns,
                max: MAX_DIMENSION,
            });
        }
        if self.token_type_count < MIN_TOKEN_TYPES {
            return Err(ConfigError::TooFewTokenTypes {
                count: self.token_type_count,
            });
        }
        if self.token_type_count > MAX_TOKEN_TYPES {
            return Err(ConfigError::TooManyTokenTypes {
                count: self.token_type_count,
                max: MAX_TOKEN_TYPES,
            });
        }
        if self.match_min_length < DEFAULT_MATCH_MIN_LENGTH {
            return Err(ConfigError::MatchLengthTooShort {
                length: self.match_min_length,
            });
        }
        if self.match_min_length > self.rows.max(self.columns) {
            return Err(ConfigError::MatchLengthExceedsBoard {
                length: self.match_min_length,
            });
        }
        if self.max_shuffle_attempts == 0 {
            return Err(ConfigError::ZeroShuffleAttempts);
        }
        Ok(ValidatedConfig {
            inner: self.clone(),
        })
    }
}

/// Configuration that passed [`EngineConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedConfig {
    inner: EngineConfig,
}

impl ValidatedConfig {
    /// Board extent.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.inner.rows, self.inner.columns)
    }

    /// Number of ordinary token flavours.
    #[must_use]
    pub const fn token_type_count(&self) -> u8 {
        self.inner.token_type_count
    }

    /// Minimum run length that counts as a match.
    #[must_use]
    pub const fn match_min_length(&self) -> u32 {
        self.inner.match_min_length
    }

    /// Reshuffles attempted before reporting an exhausted board.
    #[must_use]
    pub const fn max_shuffle_attempts(&self) -> u32 {
        self.inner.max_shuffle_attempts
    }

    /// Optional number of moves the session allows.
    #[must_use]
    pub const fn move_limit(&self) -> Option<u32> {
        self.inner.move_limit
    }
}

/// Reasons a configuration is rejected at construction time.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The board must have at least one row.
    #[error("board must have at least one row")]
    ZeroRows,
    /// The board must have at least one column.
    #[error("board must have at least one column")]
    ZeroColumns,
    /// The board exceeds the supported extent on at least one axis.
    #[error("board of {rows}x{columns} exceeds the {max}-cell limit per axis")]
    BoardTooLarge {
        /// Requested number of rows.
        rows: u32,
        /// Requested number of columns.
        columns: u32,
        /// Largest supported rows or columns.
        max: u32,
    },
    /// Fewer token types than a match-free fill requires.
    #[error("at least 3 token types are required, got {count}")]
    TooFewTokenTypes {
        /// Requested number of token types.
        count: u8,
    },
    /// More token types than the engine supports.
    #[error("at most {max} token types are supported, got {count}")]
    TooManyTokenTypes {
        /// Requested number of token types.
        count: u8,
        /// Largest supported palette.
        max: u8,
    },
    /// Runs shorter than three cannot be matches.
    #[error("match length must be at least 3, got {length}")]
    MatchLengthTooShort {
        /// Requested minimum match length.
        length: u32,
    },
    /// No run of the requested length fits on the board.
    #[error("match length {length} does not fit on the board")]
    MatchLengthExceedsBoard {
        /// Requested minimum match length.
        length: u32,
    },
    /// At least one reshuffle attempt is required.
    #[error("at least one shuffle attempt is required")]
    ZeroShuffleAttempts,
}

/// Injectable source of randomness owned by a single session.
///
/// Implementations must be deterministic for a given seed so that sessions
/// can be replayed.
pub trait RandomSource {
    /// Produces the next raw 32-bit value.
    fn next_u32(&mut self) -> u32;

    /// Produces a uniformly distributed value in `0..bound`; returns 0 when `bound` is 0.
    fn below(&mut self, bound: u32) -> u32 {
        if bound <= 1 {
            return 0;
        }
        let threshold = bound.wrapping_neg() % bound;
        loop {
            let product = u64::from(self.next_u32()) * u64::from(bound);
            if (product as u32) >= threshold {
                return (product >> 32) as u32;
            }
        }
    }
}

/// Picks a uniformly distributed index into a collection of `len` items.
pub fn choose_index(rng: &mut dyn RandomSource, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let bound = u32::try_from(len).unwrap_or(u32::MAX);
    usize::try_from(rng.below(bound)).ok()
}

/// Shuffles a slice in place using Fisher-Yates.
pub fn shuffle<T>(rng: &mut dyn RandomSource, items: &mut [T]) {
    for index in (1..items.len()).rev() {
        if let Some(swap_index) = choose_index(rng, index + 1) {
            items.swap(index, swap_index);
        }
    }
}

/// Reports whether placing `token` at `position` completes a run with the cells
/// to its left or above it.
///
/// Fills proceed in row-major order, so only those two directions can already
/// hold tokens. `lookup` returns the match token of a cell, or `None` for
/// empty, special, or out-of-bounds cells.
pub fn completes_run_behind<F>(
    lookup: F,
    position: Position,
    token: TokenType,
    min_length: u32,
) -> bool
where
    F: Fn(Position) -> Option<TokenType>,
{
    let needed = i64::from(min_length.saturating_sub(1));
    let run_to = |row_step: i64, column_step: i64| {
        (1..=needed).all(|distance| {
            position
                .offset(row_step * distance, column_step * distance)
                .and_then(&lookup)
                == Some(token)
        })
    };
    needed > 0 && (run_to(0, -1) || run_to(-1, 0))
}

/// Read-only view into the dense element grid.
#[derive(Clone, Copy, Debug)]
pub struct GridView<'a> {
    cells: &'a [Option<Element>],
    dimensions: Dimensions,
}

impl<'a> GridView<'a> {
    /// Captures a new grid view backed by the provided row-major cell slice.
    #[must_use]
    pub fn new(cells: &'a [Option<Element>], dimensions: Dimensions) -> Self {
        Self { cells, dimensions }
    }

    /// Provides the dimensions of the underlying grid.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Raw row-major cell slice.
    #[must_use]
    pub fn cells(&self) -> &'a [Option<Element>] {
        self.cells
    }

    /// Returns the element occupying the provided cell, if any.
    #[must_use]
    pub fn element(&self, position: Position) -> Option<&'a Element> {
        self.dimensions
            .index(position)
            .and_then(|index| self.cells.get(index))
            .and_then(Option::as_ref)
    }

    /// Token used for match detection at the cell; `None` for empty or special cells.
    #[must_use]
    pub fn match_token(&self, position: Position) -> Option<TokenType> {
        self.element(position).and_then(Element::match_token)
    }

    /// Reports whether the cell holds a special element.
    #[must_use]
    pub fn is_special(&self, position: Position) -> bool {
        self.element(position).is_some_and(Element::is_special)
    }

    /// Iterates occupied cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Element> + 'a {
        self.cells.iter().filter_map(Option::as_ref)
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Ordinary token types currently on the board, ascending.
    #[must_use]
    pub fn ordinary_types_present(&self) -> Vec<TokenType> {
        let mut types: Vec<TokenType> = self.iter().filter_map(Element::match_token).collect();
        types.sort_unstable();
        types.dedup();
        types
    }

    /// Positions of every ordinary element of the given type, row-major.
    #[must_use]
    pub fn positions_of(&self, token: TokenType) -> Vec<Position> {
        self.iter()
            .filter(|element| element.match_token() == Some(token))
            .map(Element::position)
            .collect()
    }
}
