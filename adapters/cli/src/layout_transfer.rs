//! Single-line board snapshots for exporting and importing layouts.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tile_cascade_board::{Board, LayoutError};
use tile_cascade_core::{EngineConfig, SpecialKind, TokenType, ValidatedConfig};

const SNAPSHOT_DOMAIN: &str = "board";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub(crate) const SNAPSHOT_HEADER: &str = "board:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Snapshot of every cell on a board plus the palette it was drawn from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct BoardLayoutSnapshot {
    /// Number of board columns.
    pub(crate) columns: u32,
    /// Number of board rows.
    pub(crate) rows: u32,
    /// Number of ordinary token flavours.
    pub(crate) token_type_count: u8,
    /// Row-major cell contents; `None` marks a vacancy.
    pub(crate) cells: Vec<Option<LayoutCell>>,
}

/// Contents of one occupied cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct LayoutCell {
    /// Palette index of the element.
    pub(crate) token: u8,
    /// Special kind carried by the element.
    #[serde(default)]
    pub(crate) special: SpecialKind,
}

#[derive(Serialize, Deserialize)]
struct SerializableSnapshot {
    token_type_count: u8,
    cells: Vec<Option<LayoutCell>>,
}

impl BoardLayoutSnapshot {
    /// Captures the current contents of `board`.
    pub(crate) fn capture(board: &Board) -> Self {
        let dimensions = board.dimensions();
        let cells = dimensions
            .positions()
            .map(|position| {
                board.element(position).map(|element| LayoutCell {
                    token: element.token().get(),
                    special: element.special_kind(),
                })
            })
            .collect();
        Self {
            columns: dimensions.columns(),
            rows: dimensions.rows(),
            token_type_count: board.token_type_count(),
            cells,
        }
    }

    /// Encodes the snapshot into a single-line string suitable for clipboard transfer.
    pub(crate) fn encode(&self) -> Result<String, LayoutTransferError> {
        let payload = SerializableSnapshot {
            token_type_count: self.token_type_count,
            cells: self.cells.clone(),
        };
        let json = serde_json::to_vec(&payload).map_err(LayoutTransferError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!(
            "{SNAPSHOT_HEADER}:{}x{}:{encoded}",
            self.columns, self.rows
        ))
    }

    /// Decodes a snapshot from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(LayoutTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(LayoutTransferError::MissingVersion)?;
        let dimensions = parts
            .next()
            .ok_or(LayoutTransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(LayoutTransferError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(LayoutTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(LayoutTransferError::UnsupportedVersion(version.to_owned()));
        }

        let (columns, rows) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LayoutTransferError::InvalidEncoding)?;
        let decoded: SerializableSnapshot =
            serde_json::from_slice(&bytes).map_err(LayoutTransferError::InvalidPayload)?;

        let expected = u64::from(columns) * u64::from(rows);
        let actual = decoded.cells.len() as u64;
        if actual != expected {
            return Err(LayoutTransferError::CellCountMismatch { expected, actual });
        }

        Ok(Self {
            columns,
            rows,
            token_type_count: decoded.token_type_count,
            cells: decoded.cells,
        })
    }

    /// Overlays the snapshot's board shape and palette onto `base`.
    pub(crate) fn engine_config(&self, base: &EngineConfig) -> EngineConfig {
        EngineConfig {
            rows: self.rows,
            columns: self.columns,
            token_type_count: self.token_type_count,
            ..base.clone()
        }
    }

    /// Rebuilds the captured board under `config`.
    pub(crate) fn to_board(&self, config: &ValidatedConfig) -> Result<Board, LayoutError> {
        let layout: Vec<Option<(TokenType, SpecialKind)>> = self
            .cells
            .iter()
            .map(|cell| cell.map(|cell| (TokenType::new(cell.token), cell.special)))
            .collect();
        Board::from_layout(config, &layout)
    }
}

/// Errors that can occur while decoding layout transfer strings.
#[derive(Debug, Error)]
pub(crate) enum LayoutTransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("layout string was empty")]
    EmptyPayload,
    /// The prefix segment was missing from the encoded snapshot.
    #[error("layout string is missing the prefix")]
    MissingPrefix,
    /// The encoded snapshot did not contain a version segment.
    #[error("layout string is missing the version")]
    MissingVersion,
    /// The encoded snapshot did not include grid dimensions.
    #[error("layout string is missing the grid dimensions")]
    MissingDimensions,
    /// The encoded snapshot did not include the payload segment.
    #[error("layout string is missing the payload")]
    MissingPayload,
    /// The encoded snapshot used an unexpected prefix segment.
    #[error("layout prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The encoded snapshot used an unsupported version identifier.
    #[error("layout version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed from the encoded snapshot.
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode layout payload")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The payload could not be serialised or deserialised.
    #[error("could not parse layout payload")]
    InvalidPayload(#[source] serde_json::Error),
    /// The payload does not cover the declared grid.
    #[error("layout declares {expected} cells but carries {actual}")]
    CellCountMismatch {
        /// Cells implied by the dimensions segment.
        expected: u64,
        /// Cells present in the payload.
        actual: u64,
    },
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), LayoutTransferError> {
    let invalid = || LayoutTransferError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;

    if columns == 0 || rows == 0 {
        return Err(invalid());
    }

    Ok((columns, rows))
}
