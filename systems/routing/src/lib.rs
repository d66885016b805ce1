#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure movement rules for the hazard pieces.
//!
//! Each [`PieceKind`] answers the same two questions: which cells does a
//! piece threaten from its current coordinate, and what ordered route reaches
//! a destination. The functions only read the board through [`GridView`];
//! reservation and occupancy arbitration stay with the board.

use chess_hazard_core::{CellCoord, CellDelta, Forward, PieceKind};
use chess_hazard_world::query::GridView;

const AXIS_STEPS: [CellDelta; 4] = [
    CellDelta::new(1, 0),
    CellDelta::new(-1, 0),
    CellDelta::new(0, 1),
    CellDelta::new(0, -1),
];

const DIAGONAL_STEPS: [CellDelta; 4] = [
    CellDelta::new(1, 1),
    CellDelta::new(1, -1),
    CellDelta::new(-1, 1),
    CellDelta::new(-1, -1),
];

const KNIGHT_OFFSETS: [CellDelta; 8] = [
    CellDelta::new(1, 2),
    CellDelta::new(2, 1),
    CellDelta::new(2, -1),
    CellDelta::new(1, -2),
    CellDelta::new(-1, -2),
    CellDelta::new(-2, -1),
    CellDelta::new(-2, 1),
    CellDelta::new(-1, 2),
];

/// Set of coordinates a piece of the provided kind threatens from `origin`.
///
/// Sliding kinds stop at the first occupied cell of each ray, including it;
/// the knight leaps over anything in between.
#[must_use]
pub fn threatened_cells(kind: PieceKind, grid: &GridView<'_>, origin: CellCoord) -> Vec<CellCoord> {
    match kind {
        PieceKind::Rook => sliding_threats(grid, origin, &AXIS_STEPS),
        PieceKind::Bishop => sliding_threats(grid, origin, &DIAGONAL_STEPS),
        PieceKind::Knight => KNIGHT_OFFSETS
            .iter()
            .map(|offset| origin.offset(*offset))
            .filter(|cell| grid.exists(*cell))
            .collect(),
        PieceKind::Pawn { forward } => pawn_threats(grid, origin, forward),
    }
}

/// Ordered route a piece of the provided kind traverses to reach
/// `destination`, excluding `origin` and including `destination`.
///
/// Returns `None` when the destination is unreachable under the kind's rule
/// or a blocker sits strictly between origin and destination.
#[must_use]
pub fn route_to(
    kind: PieceKind,
    grid: &GridView<'_>,
    origin: CellCoord,
    destination: CellCoord,
) -> Option<Vec<CellCoord>> {
    if origin == destination {
        return None;
    }

    match kind {
        PieceKind::Rook => {
            if origin.column() != destination.column() && origin.row() != destination.row() {
                return None;
            }
            sliding_route(grid, origin, destination)
        }
        PieceKind::Bishop => {
            let delta = CellDelta::between(origin, destination);
            if delta.columns().abs() != delta.rows().abs() {
                return None;
            }
            sliding_route(grid, origin, destination)
        }
        PieceKind::Knight => {
            let delta = CellDelta::between(origin, destination);
            if KNIGHT_OFFSETS.contains(&delta) && grid.exists(destination) {
                Some(vec![destination])
            } else {
                None
            }
        }
        PieceKind::Pawn { forward } => {
            if pawn_threats(grid, origin, forward).contains(&destination) {
                Some(vec![destination])
            } else {
                None
            }
        }
    }
}

fn sliding_threats(grid: &GridView<'_>, origin: CellCoord, steps: &[CellDelta]) -> Vec<CellCoord> {
    let mut cells = Vec::new();
    for step in steps {
        cells.extend(grid.ray_cells(origin, *step));
    }
    cells
}

fn pawn_threats(grid: &GridView<'_>, origin: CellCoord, forward: Forward) -> Vec<CellCoord> {
    let row = forward.row_step();
    let mut cells = Vec::new();
    for delta in [CellDelta::new(-1, row), CellDelta::new(1, row)] {
        let cell = origin.offset(delta);
        if grid.exists(cell) {
            cells.push(cell);
        }
    }
    let ahead = origin.offset(CellDelta::new(0, row));
    if grid.is_free(ahead) {
        cells.push(ahead);
    }
    cells
}

fn sliding_route(
    grid: &GridView<'_>,
    origin: CellCoord,
    destination: CellCoord,
) -> Option<Vec<CellCoord>> {
    let delta = CellDelta::between(origin, destination);
    let step = CellDelta::new(delta.columns().signum(), delta.rows().signum());

    let mut route = Vec::new();
    let mut cursor = origin.offset(step);
    loop {
        if !grid.exists(cursor) {
            return None;
        }
        route.push(cursor);
        if cursor == destination {
            break;
        }
        if grid.occupant(cursor).is_some() {
            return None;
        }
        cursor = cursor.offset(step);
    }
    Some(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_hazard_core::{BoardLayout, Command, PieceConfig};
    use chess_hazard_world::{apply, query, Board};
    use glam::Vec3;

    fn board_with_scenery(scenery: &[CellCoord]) -> Board {
        let mut board = Board::new();
        let mut events = Vec::new();
        apply(
            &mut board,
            Command::ConfigureBoard {
                layout: BoardLayout::Generated {
                    columns: 8,
                    rows: 8,
                    cell_size: 1.0,
                    origin: Vec3::ZERO,
                },
            },
            &mut events,
        );
        for cell in scenery {
            apply(&mut board, Command::PlaceScenery { cell: *cell }, &mut events);
        }
        board
    }

    #[test]
    fn rook_threat_stops_at_first_blocker() {
        let board = board_with_scenery(&[CellCoord::new(4, 4)]);
        let grid = query::grid_view(&board);

        let threats = threatened_cells(PieceKind::Rook, &grid, CellCoord::new(4, 0));

        assert!(threats.contains(&CellCoord::new(4, 4)));
        for row in 5..8 {
            assert!(
                !threats.contains(&CellCoord::new(4, row)),
                "cells behind the blocker must not be threatened"
            );
        }
        assert!(threats.contains(&CellCoord::new(0, 0)));
        assert!(threats.contains(&CellCoord::new(7, 0)));
    }

    #[test]
    fn rook_refuses_routes_off_rank_and_file() {
        let board = board_with_scenery(&[]);
        let grid = query::grid_view(&board);

        assert_eq!(
            route_to(
                PieceKind::Rook,
                &grid,
                CellCoord::new(4, 0),
                CellCoord::new(5, 3)
            ),
            None
        );
        assert_eq!(
            route_to(
                PieceKind::Rook,
                &grid,
                CellCoord::new(4, 0),
                CellCoord::new(4, 3)
            ),
            Some(vec![
                CellCoord::new(4, 1),
                CellCoord::new(4, 2),
                CellCoord::new(4, 3),
            ])
        );
    }

    #[test]
    fn rook_route_beyond_blocker_does_not_exist() {
        let board = board_with_scenery(&[CellCoord::new(4, 4)]);
        let grid = query::grid_view(&board);

        assert_eq!(
            route_to(
                PieceKind::Rook,
                &grid,
                CellCoord::new(4, 0),
                CellCoord::new(4, 6)
            ),
            None
        );
    }

    #[test]
    fn bishop_routes_only_on_diagonals() {
        let board = board_with_scenery(&[]);
        let grid = query::grid_view(&board);

        assert_eq!(
            route_to(
                PieceKind::Bishop,
                &grid,
                CellCoord::new(2, 2),
                CellCoord::new(2, 5)
            ),
            None
        );
        assert_eq!(
            route_to(
                PieceKind::Bishop,
                &grid,
                CellCoord::new(2, 2),
                CellCoord::new(5, 5)
            ),
            Some(vec![
                CellCoord::new(3, 3),
                CellCoord::new(4, 4),
                CellCoord::new(5, 5),
            ])
        );
    }

    #[test]
    fn bishop_threat_and_route_respect_blockers() {
        let board = board_with_scenery(&[CellCoord::new(3, 3)]);
        let grid = query::grid_view(&board);

        let threats = threatened_cells(PieceKind::Bishop, &grid, CellCoord::new(2, 2));
        assert!(threats.contains(&CellCoord::new(3, 3)));
        assert!(!threats.contains(&CellCoord::new(4, 4)));

        assert_eq!(
            route_to(
                PieceKind::Bishop,
                &grid,
                CellCoord::new(2, 2),
                CellCoord::new(5, 5)
            ),
            None
        );
    }

    #[test]
    fn knight_leaps_over_occupied_cells() {
        let mut board = board_with_scenery(&[CellCoord::new(1, 1)]);
        let mut events = Vec::new();
        apply(
            &mut board,
            Command::SpawnPiece {
                kind: PieceKind::Knight,
                cell: CellCoord::new(0, 0),
                config: PieceConfig::default(),
            },
            &mut events,
        );
        let grid = query::grid_view(&board);

        let threats = threatened_cells(PieceKind::Knight, &grid, CellCoord::new(0, 0));
        assert!(threats.contains(&CellCoord::new(1, 2)));
        assert!(threats.contains(&CellCoord::new(2, 1)));
        assert_eq!(threats.len(), 2);

        assert_eq!(
            route_to(
                PieceKind::Knight,
                &grid,
                CellCoord::new(0, 0),
                CellCoord::new(1, 2)
            ),
            Some(vec![CellCoord::new(1, 2)])
        );
        assert_eq!(
            route_to(
                PieceKind::Knight,
                &grid,
                CellCoord::new(0, 0),
                CellCoord::new(3, 3)
            ),
            None
        );
    }

    #[test]
    fn pawn_threat_drops_blocked_forward_cell() {
        let board = board_with_scenery(&[CellCoord::new(3, 4)]);
        let grid = query::grid_view(&board);
        let pawn = PieceKind::Pawn {
            forward: Forward::PositiveRows,
        };

        let threats = threatened_cells(pawn, &grid, CellCoord::new(3, 3));
        assert!(threats.contains(&CellCoord::new(2, 4)));
        assert!(threats.contains(&CellCoord::new(4, 4)));
        assert!(!threats.contains(&CellCoord::new(3, 4)));
    }

    #[test]
    fn pawn_routes_are_single_steps_toward_its_facing() {
        let board = board_with_scenery(&[]);
        let grid = query::grid_view(&board);
        let pawn = PieceKind::Pawn {
            forward: Forward::NegativeRows,
        };

        assert_eq!(
            route_to(pawn, &grid, CellCoord::new(3, 3), CellCoord::new(2, 2)),
            Some(vec![CellCoord::new(2, 2)])
        );
        assert_eq!(
            route_to(pawn, &grid, CellCoord::new(3, 3), CellCoord::new(3, 2)),
            Some(vec![CellCoord::new(3, 2)])
        );
        assert_eq!(
            route_to(pawn, &grid, CellCoord::new(3, 3), CellCoord::new(3, 4)),
            None
        );
        assert_eq!(
            route_to(pawn, &grid, CellCoord::new(3, 3), CellCoord::new(3, 1)),
            None
        );
    }

    #[test]
    fn pawn_at_the_edge_threatens_nothing_outside_the_board() {
        let board = board_with_scenery(&[]);
        let grid = query::grid_view(&board);
        let pawn = PieceKind::Pawn {
            forward: Forward::NegativeRows,
        };

        let threats = threatened_cells(pawn, &grid, CellCoord::new(0, 0));
        assert!(threats.is_empty());
    }
}
