#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the chess-hazard subsystem.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative board, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the board executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches. The only
//! capabilities the subsystem consumes from the rest of the game are the
//! [`HazardTarget`] and [`PhysicalBody`] traits.

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier assigned to a hazard piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceId(u32);

impl PieceId {
    /// Creates a new piece identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a telegraph marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(u32);

impl MarkerId {
    /// Creates a new marker identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single board cell expressed as column and row indices.
///
/// Indices are signed because discovered cells may sit below the board
/// origin in either axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: i32,
    row: i32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Column index of the cell.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Row index of the cell.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Returns the coordinate displaced by the provided delta.
    #[must_use]
    pub fn offset(self, delta: CellDelta) -> CellCoord {
        CellCoord::new(
            self.column.saturating_add(delta.columns()),
            self.row.saturating_add(delta.rows()),
        )
    }

    /// Computes the Chebyshev distance between two cell coordinates.
    ///
    /// Two cells are adjacent, diagonals included, when the distance is one.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.column
            .abs_diff(other.column)
            .max(self.row.abs_diff(other.row))
    }
}

/// Displacement between two cell coordinates measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellDelta {
    columns: i32,
    rows: i32,
}

impl CellDelta {
    /// Creates a new displacement from column and row components.
    #[must_use]
    pub const fn new(columns: i32, rows: i32) -> Self {
        Self { columns, rows }
    }

    /// Computes the displacement that moves `from` onto `to`.
    #[must_use]
    pub const fn between(from: CellCoord, to: CellCoord) -> Self {
        Self {
            columns: to.column() - from.column(),
            rows: to.row() - from.row(),
        }
    }

    /// Column component of the displacement.
    #[must_use]
    pub const fn columns(&self) -> i32 {
        self.columns
    }

    /// Row component of the displacement.
    #[must_use]
    pub const fn rows(&self) -> i32 {
        self.rows
    }

    /// Returns the displacement restricted to its column component.
    #[must_use]
    pub const fn column_only(&self) -> Self {
        Self::new(self.columns, 0)
    }

    /// Returns the displacement restricted to its row component.
    #[must_use]
    pub const fn row_only(&self) -> Self {
        Self::new(0, self.rows)
    }

    /// Reports whether both components are zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.columns == 0 && self.rows == 0
    }
}

/// Movement rule assigned to a hazard piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    /// Slides along ranks and files until blocked.
    Rook,
    /// Slides along diagonals until blocked.
    Bishop,
    /// Leaps to the eight knight offsets, ignoring anything in between.
    Knight,
    /// Steps one cell forward or forward-diagonal toward its facing.
    Pawn {
        /// Row direction the pawn considers forward.
        forward: Forward,
    },
}

impl PieceKind {
    /// Reports whether the kind routes in a single hop with no intermediate
    /// cells.
    #[must_use]
    pub const fn is_single_hop(&self) -> bool {
        matches!(self, Self::Knight | Self::Pawn { .. })
    }
}

/// Row direction a pawn treats as forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Forward {
    /// Forward increases the row index.
    PositiveRows,
    /// Forward decreases the row index.
    NegativeRows,
}

impl Forward {
    /// Signed row step corresponding to one forward move.
    #[must_use]
    pub const fn row_step(self) -> i32 {
        match self {
            Self::PositiveRows => 1,
            Self::NegativeRows => -1,
        }
    }
}

/// Timing and effect parameters configured per hazard piece.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PieceConfig {
    /// Traversal speed while moving, measured in cells per second.
    pub tiles_per_second: f32,
    /// Pause between detecting the target and computing a route.
    pub initial_delay: Duration,
    /// Pause between telegraphing a route and attempting to reserve it.
    pub pre_move_delay: Duration,
    /// Damage applied to the target on a successful strike.
    pub damage: f32,
    /// Magnitude of the horizontal push applied on a strike.
    pub push_force: f32,
    /// Minimum interval between two strikes by the same piece.
    pub collision_cooldown: Duration,
}

impl PieceConfig {
    /// Simulated time required to traverse a single cell, if the piece can
    /// move at all.
    #[must_use]
    pub fn step_duration(&self) -> Option<Duration> {
        if self.tiles_per_second > 0.0 {
            Some(Duration::from_secs_f32(1.0 / self.tiles_per_second))
        } else {
            None
        }
    }
}

impl Default for PieceConfig {
    fn default() -> Self {
        Self {
            tiles_per_second: 2.0,
            initial_delay: Duration::from_millis(600),
            pre_move_delay: Duration::from_millis(400),
            damage: 10.0,
            push_force: 6.0,
            collision_cooldown: Duration::from_millis(800),
        }
    }
}

/// Entity registered as the sole occupant of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Occupant {
    /// A hazard piece standing in the cell.
    Piece(PieceId),
    /// Static scenery that blocks sliding movement.
    Scenery,
}

/// Appearance assigned to a cell from its coordinate parity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellShade {
    /// Even column-plus-row parity.
    Light,
    /// Odd column-plus-row parity.
    Dark,
}

impl CellShade {
    /// Derives the shade for the provided coordinate.
    #[must_use]
    pub fn for_coordinate(cell: CellCoord) -> Self {
        let parity = (i64::from(cell.column()) + i64::from(cell.row())).rem_euclid(2);
        if parity == 0 {
            Self::Light
        } else {
            Self::Dark
        }
    }
}

/// Board population strategy selected at configuration time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoardLayout {
    /// A rectangular grid generated from the provided dimensions.
    Generated {
        /// Number of cell columns laid out in the grid.
        columns: u32,
        /// Number of cell rows laid out in the grid.
        rows: u32,
        /// Edge length of each square cell in world units.
        cell_size: f32,
        /// World position of the cell at column zero, row zero.
        origin: Vec3,
    },
    /// Cells already placed in the surrounding world, fed to the board
    /// through [`Command::RegisterCells`].
    Discovered {
        /// Edge length assumed for registered cells in world units.
        cell_size: f32,
        /// World position coordinates are derived relative to.
        origin: Vec3,
    },
}

/// A pre-placed cell reported by the world discovery collaborator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiscoveredCell {
    /// Coordinate declared on the cell entity, if any was assigned.
    pub declared: Option<CellCoord>,
    /// World position of the cell entity.
    pub position: Vec3,
}

/// Commands that express all permissible board mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Configures the board's population strategy.
    ConfigureBoard {
        /// Layout the board should populate itself from.
        layout: BoardLayout,
    },
    /// Re-arms population for a board that missed its first chance.
    RefreshBoard,
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time elapsed since the previous tick.
        dt: Duration,
    },
    /// Supplies discovered cells in response to a discovery request.
    RegisterCells {
        /// Cells reported by the surrounding world.
        cells: Vec<DiscoveredCell>,
    },
    /// Requests that a new hazard piece occupy the provided cell.
    SpawnPiece {
        /// Movement rule assigned to the piece.
        kind: PieceKind,
        /// Cell the piece should initially occupy.
        cell: CellCoord,
        /// Timing and effect parameters for the piece.
        config: PieceConfig,
    },
    /// Requests placement of static blocking scenery.
    PlaceScenery {
        /// Cell the scenery should occupy.
        cell: CellCoord,
    },
    /// Requests exclusive transit rights over an ordered route.
    ReserveRoute {
        /// Piece requesting the reservation.
        piece: PieceId,
        /// Ordered route cells, excluding the piece's current cell.
        route: Vec<CellCoord>,
    },
    /// Releases reservations previously granted to a piece.
    ReleaseRoute {
        /// Piece abandoning its claim.
        piece: PieceId,
        /// Cells whose reservations should be cleared.
        route: Vec<CellCoord>,
    },
    /// Advances a piece onto the next cell of its reserved route.
    StepPiece {
        /// Piece attempting to move.
        piece: PieceId,
        /// Reserved cell the piece arrives at.
        to: CellCoord,
    },
    /// Attaches an expiring telegraph marker to a cell.
    PlaceMarker {
        /// Cell the marker highlights.
        cell: CellCoord,
        /// Time until the board prunes the marker.
        ttl: Duration,
    },
}

/// Events broadcast by the board after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that the board holds at least one cell.
    BoardPopulated {
        /// Number of cells the board ended up with.
        cell_count: usize,
    },
    /// Asks the world discovery collaborator for pre-placed cells.
    CellDiscoveryRequested {
        /// Remaining ticks before the board stops asking.
        attempts_left: u32,
    },
    /// Reports that discovery retries were exhausted without any cells.
    DiscoveryAbandoned,
    /// Confirms that a hazard piece was created.
    PieceSpawned {
        /// Identifier allocated to the piece.
        piece: PieceId,
        /// Movement rule assigned to the piece.
        kind: PieceKind,
        /// Cell the piece occupies after spawning.
        cell: CellCoord,
    },
    /// Reports that a spawn request was rejected.
    PieceSpawnRejected {
        /// Cell provided in the spawn request.
        cell: CellCoord,
        /// Specific reason the spawn failed.
        reason: SpawnError,
    },
    /// Confirms that blocking scenery was placed.
    SceneryPlaced {
        /// Cell the scenery occupies.
        cell: CellCoord,
    },
    /// Reports that a scenery placement request was rejected.
    SceneryRejected {
        /// Cell provided in the placement request.
        cell: CellCoord,
        /// Specific reason the placement failed.
        reason: SpawnError,
    },
    /// Confirms that a full route was reserved for a piece.
    RouteReserved {
        /// Piece now holding the reservations.
        piece: PieceId,
    },
    /// Reports that a route reservation was refused in its entirety.
    RouteDenied {
        /// Piece whose request was refused.
        piece: PieceId,
        /// Specific reason the first failing cell produced.
        reason: ReservationError,
    },
    /// Confirms that a piece's reservations were cleared.
    RouteReleased {
        /// Piece that abandoned its claim.
        piece: PieceId,
    },
    /// Confirms that a piece moved onto the next cell of its route.
    PieceAdvanced {
        /// Piece that advanced.
        piece: PieceId,
        /// Cell the piece occupied before moving.
        from: CellCoord,
        /// Cell the piece occupies after the move.
        to: CellCoord,
    },
    /// Reports that a step request was rejected.
    PieceStepRejected {
        /// Piece whose step was refused.
        piece: PieceId,
        /// Destination provided in the step request.
        to: CellCoord,
        /// Specific reason the step failed.
        reason: StepError,
    },
    /// Confirms that a telegraph marker was attached to a cell.
    MarkerPlaced {
        /// Identifier allocated to the marker.
        marker: MarkerId,
        /// Cell the marker highlights.
        cell: CellCoord,
        /// Simulation time at which the board prunes the marker.
        expires_at: Duration,
    },
    /// Announces that an expired marker was pruned.
    MarkerExpired {
        /// Identifier of the pruned marker.
        marker: MarkerId,
        /// Cell the marker highlighted.
        cell: CellCoord,
    },
}

/// Reasons a spawn or scenery placement request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum SpawnError {
    /// The board holds no cells yet.
    #[error("board has no populated cells")]
    BoardUnpopulated,
    /// The requested cell does not exist on the board.
    #[error("cell does not exist")]
    MissingCell,
    /// The requested cell already holds an occupant.
    #[error("cell is already occupied")]
    Occupied,
}

/// Reasons a route reservation may be refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum ReservationError {
    /// The requested route contained no cells.
    #[error("route is empty")]
    EmptyRoute,
    /// The requesting piece is unknown to the board.
    #[error("requesting piece is unknown")]
    UnknownPiece,
    /// A route cell does not exist on the board.
    #[error("route cell {cell:?} does not exist")]
    MissingCell {
        /// First route cell that failed the check.
        cell: CellCoord,
    },
    /// A route cell is occupied by another entity.
    #[error("route cell {cell:?} is occupied")]
    Occupied {
        /// First route cell that failed the check.
        cell: CellCoord,
    },
    /// A route cell is reserved by another piece.
    #[error("route cell {cell:?} is reserved by another piece")]
    Reserved {
        /// First route cell that failed the check.
        cell: CellCoord,
    },
}

impl ReservationError {
    /// Cell that caused the refusal, when one is identified.
    #[must_use]
    pub const fn cell(&self) -> Option<CellCoord> {
        match self {
            Self::EmptyRoute | Self::UnknownPiece => None,
            Self::MissingCell { cell } | Self::Occupied { cell } | Self::Reserved { cell } => {
                Some(*cell)
            }
        }
    }
}

/// Reasons a piece step may be refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum StepError {
    /// The stepping piece is unknown to the board.
    #[error("stepping piece is unknown")]
    UnknownPiece,
    /// The destination cell does not exist on the board.
    #[error("destination cell does not exist")]
    MissingCell,
    /// The destination cell already holds an occupant.
    #[error("destination cell is occupied")]
    Occupied,
    /// The destination cell is not reserved by the stepping piece.
    #[error("destination cell is not reserved by the piece")]
    NotReserved,
}

/// Immutable representation of a single piece's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PieceSnapshot {
    /// Unique identifier assigned to the piece.
    pub id: PieceId,
    /// Movement rule assigned to the piece.
    pub kind: PieceKind,
    /// Board cell currently occupied by the piece.
    pub cell: CellCoord,
    /// Timing and effect parameters configured at spawn.
    pub config: PieceConfig,
}

/// Read-only snapshot describing all pieces bound to the board.
#[derive(Clone, Debug, Default)]
pub struct PieceView {
    snapshots: Vec<PieceSnapshot>,
}

impl PieceView {
    /// Creates a new piece view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<PieceSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured piece snapshots in identifier order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &PieceSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<PieceSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single cell's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct CellSnapshot {
    /// Coordinate the cell is indexed by.
    pub coordinate: CellCoord,
    /// World position of the cell centre.
    pub position: Vec3,
    /// Edge length of the cell in world units.
    pub size: f32,
    /// Appearance derived from coordinate parity.
    pub shade: CellShade,
    /// Entity currently standing in the cell, if any.
    pub occupant: Option<Occupant>,
    /// Piece currently holding transit rights over the cell, if any.
    pub reservation: Option<PieceId>,
    /// Telegraph markers currently attached to the cell.
    pub markers: Vec<MarkerId>,
}

/// Damageable, pushable entity the hazard pieces hunt.
///
/// The subsystem does not care about the target's health model, death
/// handling, or invulnerability windows; those stay with the implementor.
pub trait HazardTarget {
    /// Live world position of the target.
    fn position(&self) -> Vec3;

    /// Applies damage through the target's own health model.
    fn take_damage(&mut self, amount: f32);

    /// Velocity-bearing body of the target, when it has one.
    fn physics(&mut self) -> Option<&mut dyn PhysicalBody>;

    /// Displaces the target directly, used when no body is available.
    fn translate(&mut self, delta: Vec3);
}

/// Velocity-bearing physical body exposed by a [`HazardTarget`].
pub trait PhysicalBody {
    /// Mass of the body in the game's mass units.
    fn mass(&self) -> f32;

    /// Current velocity of the body.
    fn velocity(&self) -> Vec3;

    /// Replaces the body's velocity with the provided value.
    fn set_velocity(&mut self, velocity: Vec3);
}
