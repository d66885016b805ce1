//! JSON scenario files consumed by the demo driver.

use chess_hazard_core::{CellCoord, PieceConfig, PieceKind};
use serde::Deserialize;

/// Complete description of a demo run loaded from disk.
#[derive(Debug, Deserialize)]
pub(crate) struct Scenario {
    /// Board dimensions and cell size.
    pub board: BoardSpec,
    /// Pieces spawned before the first tick.
    #[serde(default)]
    pub pieces: Vec<PieceSpec>,
    /// Cells blocked by static scenery.
    #[serde(default)]
    pub scenery: Vec<CellCoord>,
    /// Cell the target starts on.
    pub target: CellCoord,
}

/// Board dimensions used to generate the grid.
#[derive(Debug, Deserialize)]
pub(crate) struct BoardSpec {
    /// Number of cell columns.
    pub columns: u32,
    /// Number of cell rows.
    pub rows: u32,
    /// Edge length of each square cell in world units.
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
}

fn default_cell_size() -> f32 {
    1.0
}

/// A piece entry within a scenario file.
#[derive(Debug, Deserialize)]
pub(crate) struct PieceSpec {
    /// Movement rule assigned to the piece.
    pub kind: PieceKind,
    /// Cell the piece starts on.
    pub cell: CellCoord,
    /// Timing and effect parameters; omitted fields use the defaults.
    #[serde(default)]
    pub config: PieceConfig,
}
