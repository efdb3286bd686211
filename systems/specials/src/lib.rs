#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Special element spawning, activation and combo effects.
//!
//! The generator decides which special a match leaves behind and computes
//! the set of cells an activation clears. Activations chain: a special caught
//! in another special's blast fires as well, in first-in first-out order, and
//! every special fires at most once per clearance.

use std::collections::{BTreeSet, VecDeque};

use tile_cascade_core::{
    choose_index, shuffle, Command, ComboKind, Dimensions, Element, GridView, Match,
    Orientation, Position, RandomSource, ShapeClass, SpecialKind, TokenType,
};

/// Maximum number of token types a line + color combo clears.
pub const MULTI_COLOR_TYPES: usize = 3;

/// Mapping from match shape to the special it leaves behind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnRules {
    composite_kind: SpecialKind,
    long_line_kind: SpecialKind,
}

impl SpawnRules {
    /// Maps L and T shapes to the provided kind instead of a color clear.
    #[must_use]
    pub const fn with_composite_kind(self, kind: SpecialKind) -> Self {
        Self {
            composite_kind: kind,
            ..self
        }
    }

    /// Special spawned by `found`, or [`SpecialKind::None`] for plain runs.
    ///
    /// A four-run leaves a line clearer perpendicular to itself: a horizontal
    /// run spawns a column clearer and a vertical run spawns a row clearer.
    #[must_use]
    pub fn kind_for(&self, found: &Match) -> SpecialKind {
        match found.shape {
            ShapeClass::Line3 => SpecialKind::None,
            ShapeClass::Line4 => match found.orientation {
                Orientation::Vertical => SpecialKind::LineClearRow,
                _ => SpecialKind::LineClearColumn,
            },
            ShapeClass::Line5Plus => self.long_line_kind,
            ShapeClass::LShape | ShapeClass::TShape => self.composite_kind,
        }
    }
}

impl Default for SpawnRules {
    fn default() -> Self {
        Self {
            composite_kind: SpecialKind::ColorClear,
            long_line_kind: SpecialKind::ColorClear,
        }
    }
}

/// Broad family a special belongs to when pairing combos.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Family {
    Line,
    Area,
    Color,
}

fn family(kind: SpecialKind) -> Option<Family> {
    match kind {
        SpecialKind::None => None,
        SpecialKind::LineClearRow | SpecialKind::LineClearColumn => Some(Family::Line),
        SpecialKind::AreaBlast => Some(Family::Area),
        SpecialKind::ColorClear => Some(Family::Color),
    }
}

/// Cells cleared by one activation or combo, including every chained special.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Clearance {
    /// Every cell to empty, row-major.
    pub cells: Vec<Position>,
    /// Special elements that fired, in firing order.
    pub triggered: Vec<Element>,
}

impl Clearance {
    /// Command that empties every cleared cell.
    #[must_use]
    pub fn remove_command(&self) -> Command {
        Command::RemoveCells {
            cells: self.cells.clone(),
        }
    }
}

/// Result of pairing two special elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComboEffect {
    /// Combo that fired.
    pub kind: ComboKind,
    /// Cell the combo was centred on.
    pub anchor: Position,
    /// Cells cleared by the combo and its chain reaction.
    pub clearance: Clearance,
}

/// Pure system that spawns special elements and computes their effects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpecialElementGenerator {
    rules: SpawnRules,
}

impl SpecialElementGenerator {
    /// Creates a generator that spawns according to `rules`.
    #[must_use]
    pub const fn new(rules: SpawnRules) -> Self {
        Self { rules }
    }

    /// Spawn rules in effect.
    #[must_use]
    pub const fn rules(&self) -> SpawnRules {
        self.rules
    }

    /// Command that places the special earned by `found` at its pivot, if any.
    #[must_use]
    pub fn spawn_for(&self, found: &Match) -> Option<Command> {
        let kind = self.rules.kind_for(found);
        kind.is_special().then_some(Command::SpawnSpecial {
            position: found.spawn_pivot,
            token: found.token,
            kind,
        })
    }

    /// Combo produced by pairing two special kinds; `None` unless both are special.
    #[must_use]
    pub fn combo_kind(first: SpecialKind, second: SpecialKind) -> Option<ComboKind> {
        let pair = (family(first)?, family(second)?);
        let kind = match pair {
            (Family::Line, Family::Line) => ComboKind::CrossBlast,
            (Family::Line, Family::Area) | (Family::Area, Family::Line) => ComboKind::BandSweep,
            (Family::Line, Family::Color) | (Family::Color, Family::Line) => {
                ComboKind::MultiColorClear
            }
            (Family::Area, Family::Area) => ComboKind::MegaBlast,
            (Family::Area, Family::Color) | (Family::Color, Family::Area) => ComboKind::ColorBlast,
            (Family::Color, Family::Color) => ComboKind::BoardWipe,
        };
        Some(kind)
    }

    /// Fires the special at `origin` on its own.
    ///
    /// A color clear removes every ordinary element of `target`, or of a type
    /// drawn uniformly from those present when no target is given. Returns
    /// `None` when `origin` does not hold a special.
    pub fn activate(
        &self,
        view: GridView<'_>,
        origin: Position,
        target: Option<TokenType>,
        rng: &mut dyn RandomSource,
    ) -> Option<Clearance> {
        let element = view.element(origin).copied().filter(Element::is_special)?;
        let mut visited = BTreeSet::from([origin]);
        let cells = effect_cells(view, element.special_kind(), origin, target, rng);
        Some(chain_reaction(view, cells, vec![element], &mut visited, rng))
    }

    /// Fires the specials at `first` and `second` as a combo centred on `second`.
    ///
    /// Returns `None` unless both cells hold special elements.
    pub fn combine(
        &self,
        view: GridView<'_>,
        first: Position,
        second: Position,
        rng: &mut dyn RandomSource,
    ) -> Option<ComboEffect> {
        let moved = view.element(first).copied().filter(Element::is_special)?;
        let partner = view.element(second).copied().filter(Element::is_special)?;
        let kind = Self::combo_kind(moved.special_kind(), partner.special_kind())?;

        let mut cells = combo_cells(view, kind, [moved, partner], second, rng);
        let _ = cells.insert(first);
        let _ = cells.insert(second);
        let mut visited = BTreeSet::from([first, second]);
        let clearance = chain_reaction(view, cells, vec![moved, partner], &mut visited, rng);
        Some(ComboEffect {
            kind,
            anchor: second,
            clearance,
        })
    }
}

fn chain_reaction(
    view: GridView<'_>,
    mut cells: BTreeSet<Position>,
    mut triggered: Vec<Element>,
    visited: &mut BTreeSet<Position>,
    rng: &mut dyn RandomSource,
) -> Clearance {
    let mut queue: VecDeque<Position> = cells
        .iter()
        .copied()
        .filter(|cell| view.is_special(*cell) && !visited.contains(cell))
        .collect();

    while let Some(position) = queue.pop_front() {
        if !visited.insert(position) {
            continue;
        }
        let Some(element) = view.element(position).copied() else {
            continue;
        };
        triggered.push(element);
        for cell in effect_cells(view, element.special_kind(), position, None, rng) {
            if cells.insert(cell) && view.is_special(cell) && !visited.contains(&cell) {
                queue.push_back(cell);
            }
        }
    }

    Clearance {
        cells: cells.into_iter().collect(),
        triggered,
    }
}

fn effect_cells(
    view: GridView<'_>,
    kind: SpecialKind,
    origin: Position,
    target: Option<TokenType>,
    rng: &mut dyn RandomSource,
) -> BTreeSet<Position> {
    let dimensions = view.dimensions();
    let mut cells = BTreeSet::from([origin]);
    match kind {
        SpecialKind::None => {}
        SpecialKind::LineClearRow => cells.extend(row_cells(dimensions, origin.row())),
        SpecialKind::LineClearColumn => cells.extend(column_cells(dimensions, origin.column())),
        SpecialKind::AreaBlast => cells.extend(area_cells(dimensions, origin, 1)),
        SpecialKind::ColorClear => {
            let target = target.or_else(|| {
                let present = view.ordinary_types_present();
                choose_index(rng, present.len()).and_then(|index| present.get(index).copied())
            });
            if let Some(token) = target {
                cells.extend(view.positions_of(token));
            }
        }
    }
    cells
}

fn combo_cells(
    view: GridView<'_>,
    kind: ComboKind,
    pair: [Element; 2],
    anchor: Position,
    rng: &mut dyn RandomSource,
) -> BTreeSet<Position> {
    let dimensions = view.dimensions();
    let mut cells = BTreeSet::new();
    match kind {
        ComboKind::CrossBlast => {
            cells.extend(row_cells(dimensions, anchor.row()));
            cells.extend(column_cells(dimensions, anchor.column()));
        }
        ComboKind::BandSweep => {
            let sweeps_rows = pair
                .iter()
                .any(|element| element.special_kind() == SpecialKind::LineClearRow);
            for delta in -1..=1 {
                let (row_delta, column_delta) = if sweeps_rows { (delta, 0) } else { (0, delta) };
                let Some(band) = anchor
                    .offset(row_delta, column_delta)
                    .filter(|cell| dimensions.contains(*cell))
                else {
                    continue;
                };
                if sweeps_rows {
                    cells.extend(row_cells(dimensions, band.row()));
                } else {
                    cells.extend(column_cells(dimensions, band.column()));
                }
            }
        }
        ComboKind::MultiColorClear => {
            let mut present = view.ordinary_types_present();
            shuffle(rng, &mut present);
            for token in present.into_iter().take(MULTI_COLOR_TYPES) {
                cells.extend(view.positions_of(token));
            }
        }
        ComboKind::MegaBlast => cells.extend(area_cells(dimensions, anchor, 2)),
        ComboKind::ColorBlast => {
            for element in view.iter().filter(|element| !element.is_special()) {
                cells.extend(area_cells(dimensions, element.position(), 1));
            }
        }
        ComboKind::BoardWipe => cells.extend(
            view.iter()
                .filter(|element| !element.is_special())
                .map(Element::position),
        ),
    }
    cells
}

fn row_cells(dimensions: Dimensions, row: u32) -> impl Iterator<Item = Position> {
    (0..dimensions.columns()).map(move |column| Position::new(row, column))
}

fn column_cells(dimensions: Dimensions, column: u32) -> impl Iterator<Item = Position> {
    (0..dimensions.rows()).map(move |row| Position::new(row, column))
}

fn area_cells(dimensions: Dimensions, centre: Position, radius: i64) -> Vec<Position> {
    let mut cells = Vec::new();
    for row_delta in -radius..=radius {
        for column_delta in -radius..=radius {
            if let Some(cell) = centre.offset(row_delta, column_delta) {
                if dimensions.contains(cell) {
                    cells.push(cell);
                }
            }
        }
    }
    cells
}
