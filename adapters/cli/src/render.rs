//! Plain-text board rendering.

use std::fmt::Write as _;

use tile_cascade_board::Board;
use tile_cascade_core::{Element, Position, SpecialKind};

const TOKEN_GLYPHS: &[u8] = b"ABCDEFGHIJKLMNOP";

/// Renders one glyph per cell, one line per row.
///
/// Ordinary tokens print as letters and specials as symbols; vacancies print as `.`.
pub(crate) fn board(board: &Board) -> String {
    let dimensions = board.dimensions();
    let mut out = String::new();
    for row in 0..dimensions.rows() {
        let line: String = (0..dimensions.columns())
            .map(|column| {
                board
                    .element(Position::new(row, column))
                    .map_or('.', glyph)
            })
            .collect();
        let _ = writeln!(out, "{line}");
    }
    out
}

fn glyph(element: &Element) -> char {
    match element.special_kind() {
        SpecialKind::None => TOKEN_GLYPHS
            .get(usize::from(element.token().get()))
            .map_or('?', |byte| char::from(*byte)),
        SpecialKind::LineClearRow => '-',
        SpecialKind::LineClearColumn => '|',
        SpecialKind::AreaBlast => '*',
        SpecialKind::ColorClear => '@',
    }
}
