#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative board state management for the chess-hazard subsystem.
//!
//! The [`Board`] owns every cell, the pieces bound to them, and the exclusive
//! occupancy/reservation bookkeeping that keeps autonomously scheduled pieces
//! from overlapping. All mutation flows through [`apply`]; all inspection
//! flows through [`query`].

use std::collections::HashMap;
use std::time::Duration;

use chess_hazard_core::{
    BoardLayout, CellCoord, CellShade, Command, DiscoveredCell, Event, MarkerId, Occupant,
    PieceConfig, PieceId, PieceKind, ReservationError, SpawnError, StepError,
};
use glam::Vec3;

/// Number of ticks a discovering board keeps asking for cells before it
/// gives up and emits the one-time diagnostic.
const DISCOVERY_RETRY_TICKS: u32 = 300;

/// Represents the authoritative chess-hazard board state.
#[derive(Debug)]
pub struct Board {
    layout: Option<BoardLayout>,
    cells: HashMap<CellCoord, Cell>,
    order: Vec<CellCoord>,
    pieces: Vec<PieceState>,
    next_piece: u32,
    next_marker: u32,
    clock: Duration,
    discovery: DiscoveryState,
}

impl Board {
    /// Creates a new, unconfigured board ready for simulation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            layout: None,
            cells: HashMap::new(),
            order: Vec::new(),
            pieces: Vec::new(),
            next_piece: 0,
            next_marker: 0,
            clock: Duration::ZERO,
            discovery: DiscoveryState::idle(),
        }
    }

    fn insert_cell(&mut self, coordinate: CellCoord, position: Vec3, size: f32) {
        let cell = Cell {
            coordinate,
            position,
            size,
            shade: CellShade::for_coordinate(coordinate),
            occupant: None,
            reservation: None,
            markers: Vec::new(),
        };
        if self.cells.insert(coordinate, cell).is_none() {
            self.order.push(coordinate);
        }
    }

    fn allocate_piece_id(&mut self) -> PieceId {
        let id = PieceId::new(self.next_piece);
        self.next_piece = self.next_piece.saturating_add(1);
        id
    }

    fn allocate_marker_id(&mut self) -> MarkerId {
        let id = MarkerId::new(self.next_marker);
        self.next_marker = self.next_marker.saturating_add(1);
        id
    }

    fn piece_index(&self, piece: PieceId) -> Option<usize> {
        self.pieces.iter().position(|state| state.id == piece)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct Cell {
    coordinate: CellCoord,
    position: Vec3,
    size: f32,
    shade: CellShade,
    occupant: Option<Occupant>,
    reservation: Option<PieceId>,
    markers: Vec<Marker>,
}

#[derive(Clone, Copy, Debug)]
struct Marker {
    id: MarkerId,
    expires_at: Duration,
}

#[derive(Clone, Copy, Debug)]
struct PieceState {
    id: PieceId,
    kind: PieceKind,
    cell: CellCoord,
    config: PieceConfig,
}

#[derive(Clone, Copy, Debug)]
struct DiscoveryState {
    attempts_left: u32,
    abandoned: bool,
}

impl DiscoveryState {
    fn idle() -> Self {
        Self {
            attempts_left: 0,
            abandoned: false,
        }
    }

    fn armed() -> Self {
        Self {
            attempts_left: DISCOVERY_RETRY_TICKS,
            abandoned: false,
        }
    }
}

/// Applies the provided command to the board, mutating state deterministically.
pub fn apply(board: &mut Board, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureBoard { layout } => {
            if board.layout.is_some() {
                log::warn!("ignoring board reconfiguration; the board is already configured");
                return;
            }
            board.layout = Some(layout);
            match layout {
                BoardLayout::Generated {
                    columns,
                    rows,
                    cell_size,
                    origin,
                } => generate_cells(board, columns, rows, cell_size, origin, out_events),
                BoardLayout::Discovered { .. } => {
                    board.discovery = DiscoveryState::armed();
                }
            }
        }
        Command::RefreshBoard => match board.layout {
            None => log::warn!("ignoring board refresh; the board was never configured"),
            Some(BoardLayout::Generated {
                columns,
                rows,
                cell_size,
                origin,
            }) => {
                if board.cells.is_empty() {
                    generate_cells(board, columns, rows, cell_size, origin, out_events);
                }
            }
            Some(BoardLayout::Discovered { .. }) => {
                board.discovery = DiscoveryState::armed();
            }
        },
        Command::Tick { dt } => {
            board.clock = board.clock.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
            prune_markers(board, out_events);
            advance_discovery(board, out_events);
        }
        Command::RegisterCells { cells } => match board.layout {
            Some(BoardLayout::Discovered { cell_size, origin }) => {
                register_discovered(board, cell_size, origin, cells, out_events);
            }
            _ => log::warn!("ignoring registered cells; the board does not discover its layout"),
        },
        Command::SpawnPiece { kind, cell, config } => match placement_check(board, cell) {
            Ok(()) => {
                let id = board.allocate_piece_id();
                if let Some(slot) = board.cells.get_mut(&cell) {
                    slot.occupant = Some(Occupant::Piece(id));
                }
                board.pieces.push(PieceState {
                    id,
                    kind,
                    cell,
                    config,
                });
                out_events.push(Event::PieceSpawned {
                    piece: id,
                    kind,
                    cell,
                });
            }
            Err(reason) => {
                log::warn!("piece spawn at {cell:?} rejected: {reason}");
                out_events.push(Event::PieceSpawnRejected { cell, reason });
            }
        },
        Command::PlaceScenery { cell } => match placement_check(board, cell) {
            Ok(()) => {
                if let Some(slot) = board.cells.get_mut(&cell) {
                    slot.occupant = Some(Occupant::Scenery);
                }
                out_events.push(Event::SceneryPlaced { cell });
            }
            Err(reason) => {
                log::warn!("scenery placement at {cell:?} rejected: {reason}");
                out_events.push(Event::SceneryRejected { cell, reason });
            }
        },
        Command::ReserveRoute { piece, route } => match validate_route(board, piece, &route) {
            Ok(()) => {
                for coord in &route {
                    if let Some(cell) = board.cells.get_mut(coord) {
                        cell.reservation = Some(piece);
                    }
                }
                out_events.push(Event::RouteReserved { piece });
            }
            Err(reason) => out_events.push(Event::RouteDenied { piece, reason }),
        },
        Command::ReleaseRoute { piece, route } => {
            for coord in &route {
                if let Some(cell) = board.cells.get_mut(coord) {
                    if cell.reservation == Some(piece) {
                        cell.reservation = None;
                    }
                }
            }
            out_events.push(Event::RouteReleased { piece });
        }
        Command::StepPiece { piece, to } => match step_check(board, piece, to) {
            Ok(index) => {
                let from = board.pieces[index].cell;
                if let Some(cell) = board.cells.get_mut(&from) {
                    if cell.occupant == Some(Occupant::Piece(piece)) {
                        cell.occupant = None;
                    }
                }
                if let Some(cell) = board.cells.get_mut(&to) {
                    cell.occupant = Some(Occupant::Piece(piece));
                    cell.reservation = None;
                }
                board.pieces[index].cell = to;
                out_events.push(Event::PieceAdvanced { piece, from, to });
            }
            Err(reason) => out_events.push(Event::PieceStepRejected { piece, to, reason }),
        },
        Command::PlaceMarker { cell, ttl } => {
            if board.cells.contains_key(&cell) {
                let marker = board.allocate_marker_id();
                let expires_at = board.clock.saturating_add(ttl);
                if let Some(slot) = board.cells.get_mut(&cell) {
                    slot.markers.push(Marker {
                        id: marker,
                        expires_at,
                    });
                }
                out_events.push(Event::MarkerPlaced {
                    marker,
                    cell,
                    expires_at,
                });
            }
        }
    }
}

fn generate_cells(
    board: &mut Board,
    columns: u32,
    rows: u32,
    cell_size: f32,
    origin: Vec3,
    out_events: &mut Vec<Event>,
) {
    if columns == 0 || rows == 0 {
        log::warn!("generated board layout contains no cells; the board stays empty");
        return;
    }
    if cell_size <= 0.0 {
        log::warn!("generated board layout has a non-positive cell size; the board stays empty");
        return;
    }

    for row in 0..rows {
        for column in 0..columns {
            let (Ok(column_index), Ok(row_index)) = (i32::try_from(column), i32::try_from(row))
            else {
                continue;
            };
            let coordinate = CellCoord::new(column_index, row_index);
            let position = origin
                + Vec3::new(
                    column_index as f32 * cell_size,
                    0.0,
                    row_index as f32 * cell_size,
                );
            board.insert_cell(coordinate, position, cell_size);
        }
    }

    out_events.push(Event::BoardPopulated {
        cell_count: board.cells.len(),
    });
}

fn register_discovered(
    board: &mut Board,
    cell_size: f32,
    origin: Vec3,
    cells: Vec<DiscoveredCell>,
    out_events: &mut Vec<Event>,
) {
    if cell_size <= 0.0 {
        log::warn!("discovered board layout has a non-positive cell size; cells were ignored");
        return;
    }

    let was_empty = board.cells.is_empty();
    for discovered in cells {
        let coordinate = match discovered.declared {
            Some(declared) => {
                if board.cells.contains_key(&declared) {
                    log::warn!("ignoring discovered cell with duplicate coordinate {declared:?}");
                    continue;
                }
                declared
            }
            None => derive_coordinate(board, origin, cell_size, discovered.position),
        };
        board.insert_cell(coordinate, discovered.position, cell_size);
    }

    if was_empty && !board.cells.is_empty() {
        out_events.push(Event::BoardPopulated {
            cell_count: board.cells.len(),
        });
    }
}

/// Rounds a world position into grid space, shifting along the column axis
/// until the coordinate is free.
fn derive_coordinate(board: &Board, origin: Vec3, cell_size: f32, position: Vec3) -> CellCoord {
    let relative = (position - origin) / cell_size;
    let mut coordinate = CellCoord::new(relative.x.round() as i32, relative.z.round() as i32);
    while board.cells.contains_key(&coordinate) {
        coordinate = CellCoord::new(coordinate.column().saturating_add(1), coordinate.row());
    }
    coordinate
}

fn prune_markers(board: &mut Board, out_events: &mut Vec<Event>) {
    let clock = board.clock;
    let mut expired: Vec<(MarkerId, CellCoord)> = Vec::new();
    for coordinate in &board.order {
        if let Some(cell) = board.cells.get_mut(coordinate) {
            cell.markers.retain(|marker| {
                if marker.expires_at <= clock {
                    expired.push((marker.id, *coordinate));
                    false
                } else {
                    true
                }
            });
        }
    }
    for (marker, cell) in expired {
        out_events.push(Event::MarkerExpired { marker, cell });
    }
}

fn advance_discovery(board: &mut Board, out_events: &mut Vec<Event>) {
    if !matches!(board.layout, Some(BoardLayout::Discovered { .. })) {
        return;
    }
    if !board.cells.is_empty() || board.discovery.abandoned {
        return;
    }

    if board.discovery.attempts_left > 0 {
        board.discovery.attempts_left -= 1;
        out_events.push(Event::CellDiscoveryRequested {
            attempts_left: board.discovery.attempts_left,
        });
    } else {
        board.discovery.abandoned = true;
        log::warn!(
            "cell discovery exhausted after {DISCOVERY_RETRY_TICKS} ticks; \
             the board stays empty until refreshed"
        );
        out_events.push(Event::DiscoveryAbandoned);
    }
}

fn placement_check(board: &Board, coordinate: CellCoord) -> Result<(), SpawnError> {
    if board.cells.is_empty() {
        return Err(SpawnError::BoardUnpopulated);
    }
    let Some(cell) = board.cells.get(&coordinate) else {
        return Err(SpawnError::MissingCell);
    };
    if cell.occupant.is_some() {
        return Err(SpawnError::Occupied);
    }
    Ok(())
}

/// Checks every route cell before any reservation is written, so a refusal
/// leaves the board untouched.
fn validate_route(
    board: &Board,
    piece: PieceId,
    route: &[CellCoord],
) -> Result<(), ReservationError> {
    if board.piece_index(piece).is_none() {
        return Err(ReservationError::UnknownPiece);
    }
    if route.is_empty() {
        return Err(ReservationError::EmptyRoute);
    }

    for &coordinate in route {
        let Some(cell) = board.cells.get(&coordinate) else {
            return Err(ReservationError::MissingCell { cell: coordinate });
        };
        match cell.occupant {
            None => {}
            Some(Occupant::Piece(occupant)) if occupant == piece => {}
            Some(_) => return Err(ReservationError::Occupied { cell: coordinate }),
        }
        match cell.reservation {
            None => {}
            Some(holder) if holder == piece => {}
            Some(_) => return Err(ReservationError::Reserved { cell: coordinate }),
        }
    }

    Ok(())
}

fn step_check(board: &Board, piece: PieceId, to: CellCoord) -> Result<usize, StepError> {
    let Some(index) = board.piece_index(piece) else {
        return Err(StepError::UnknownPiece);
    };
    let Some(cell) = board.cells.get(&to) else {
        return Err(StepError::MissingCell);
    };
    if cell.occupant.is_some() {
        return Err(StepError::Occupied);
    }
    if cell.reservation != Some(piece) {
        return Err(StepError::NotReserved);
    }
    Ok(index)
}

/// Query functions that provide read-only access to the board state.
pub mod query {
    use std::time::Duration;

    use chess_hazard_core::{
        CellCoord, CellDelta, CellSnapshot, Occupant, PieceId, PieceSnapshot, PieceView,
    };
    use glam::Vec3;

    use super::Board;

    /// Reports whether a cell exists at the provided coordinate.
    #[must_use]
    pub fn exists(board: &Board, coordinate: CellCoord) -> bool {
        board.cells.contains_key(&coordinate)
    }

    /// Captures a read-only snapshot of a single cell.
    #[must_use]
    pub fn cell(board: &Board, coordinate: CellCoord) -> Option<CellSnapshot> {
        board.cells.get(&coordinate).map(|cell| CellSnapshot {
            coordinate: cell.coordinate,
            position: cell.position,
            size: cell.size,
            shade: cell.shade,
            occupant: cell.occupant,
            reservation: cell.reservation,
            markers: cell.markers.iter().map(|marker| marker.id).collect(),
        })
    }

    /// World position of the centre of the cell at the provided coordinate.
    #[must_use]
    pub fn world_position(board: &Board, coordinate: CellCoord) -> Option<Vec3> {
        board.cells.get(&coordinate).map(|cell| cell.position)
    }

    /// Simulation time accumulated from tick commands.
    #[must_use]
    pub fn clock(board: &Board) -> Duration {
        board.clock
    }

    /// Captures a read-only view of the pieces bound to the board.
    #[must_use]
    pub fn piece_view(board: &Board) -> PieceView {
        PieceView::from_snapshots(
            board
                .pieces
                .iter()
                .map(|state| PieceSnapshot {
                    id: state.id,
                    kind: state.kind,
                    cell: state.cell,
                    config: state.config,
                })
                .collect(),
        )
    }

    /// Borrows the board as a read-only grid view for routing queries.
    #[must_use]
    pub fn grid_view(board: &Board) -> GridView<'_> {
        GridView { board }
    }

    /// Read-only view into the cell grid used by movement rules.
    #[derive(Clone, Copy, Debug)]
    pub struct GridView<'a> {
        board: &'a Board,
    }

    impl<'a> GridView<'a> {
        /// Reports whether a cell exists at the provided coordinate.
        #[must_use]
        pub fn exists(&self, coordinate: CellCoord) -> bool {
            self.board.cells.contains_key(&coordinate)
        }

        /// Returns the entity occupying the provided cell, if any.
        #[must_use]
        pub fn occupant(&self, coordinate: CellCoord) -> Option<Occupant> {
            self.board
                .cells
                .get(&coordinate)
                .and_then(|cell| cell.occupant)
        }

        /// Returns the piece holding a reservation on the provided cell.
        #[must_use]
        pub fn reservation(&self, coordinate: CellCoord) -> Option<PieceId> {
            self.board
                .cells
                .get(&coordinate)
                .and_then(|cell| cell.reservation)
        }

        /// Reports whether the cell exists and holds no occupant.
        #[must_use]
        pub fn is_free(&self, coordinate: CellCoord) -> bool {
            self.board
                .cells
                .get(&coordinate)
                .is_some_and(|cell| cell.occupant.is_none())
        }

        /// World position of the centre of the provided cell.
        #[must_use]
        pub fn world_position(&self, coordinate: CellCoord) -> Option<Vec3> {
            self.board
                .cells
                .get(&coordinate)
                .map(|cell| cell.position)
        }

        /// Number of cells the board currently holds.
        #[must_use]
        pub fn cell_count(&self) -> usize {
            self.board.cells.len()
        }

        /// Walks coordinates along the provided step while cells exist,
        /// stopping after including the first occupied cell.
        #[must_use]
        pub fn ray_cells(&self, origin: CellCoord, step: CellDelta) -> Vec<CellCoord> {
            let mut cells = Vec::new();
            if step.is_zero() {
                return cells;
            }

            let mut cursor = origin.offset(step);
            while let Some(cell) = self.board.cells.get(&cursor) {
                cells.push(cursor);
                if cell.occupant.is_some() {
                    break;
                }
                cursor = cursor.offset(step);
            }
            cells
        }

        /// Cell whose centre lies nearest to the provided world position.
        ///
        /// Ties are broken toward the lowest coordinate so lookups stay
        /// deterministic regardless of insertion order.
        #[must_use]
        pub fn nearest_cell(&self, point: Vec3) -> Option<CellCoord> {
            let mut best: Option<(f32, CellCoord)> = None;
            for coordinate in &self.board.order {
                let Some(cell) = self.board.cells.get(coordinate) else {
                    continue;
                };
                let distance = cell.position.distance_squared(point);
                let better = match best {
                    None => true,
                    Some((best_distance, best_coordinate)) => {
                        distance < best_distance
                            || (distance == best_distance && *coordinate < best_coordinate)
                    }
                };
                if better {
                    best = Some((distance, *coordinate));
                }
            }
            best.map(|(_, coordinate)| coordinate)
        }
    }
}
