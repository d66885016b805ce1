#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Piece lifecycle system that drives every hazard through its attack cycle.
//!
//! Each piece runs the same loop: scan for the target, telegraph the chosen
//! route, reserve it through the board, traverse it cell by cell, and resolve
//! the strike. The system holds per-piece runtime state across ticks,
//! consumes board events and immutable views, and responds exclusively with
//! new command batches; the only side effect it applies itself is the strike
//! on the externally supplied [`HazardTarget`].

use std::collections::BTreeMap;
use std::time::Duration;

use chess_hazard_core::{
    CellCoord, CellDelta, Command, Event, HazardTarget, PieceConfig, PieceId, PieceSnapshot,
    PieceView,
};
use chess_hazard_system_routing as routing;
use chess_hazard_world::query::GridView;
use glam::Vec3;

mod strike;

use strike::Shove;

/// Reservation attempts a piece makes per telegraph cycle before it abandons
/// the attack and returns to scanning.
const REPLAN_LIMIT: u8 = 3;

/// System that advances piece attack lifecycles and applies strike effects.
#[derive(Debug, Default)]
pub struct Lifecycle {
    pieces: BTreeMap<PieceId, PieceRuntime>,
    shoves: Vec<Shove>,
    clock: Duration,
}

impl Lifecycle {
    /// Creates a new lifecycle system with no piece state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes board events and immutable views to advance every piece.
    ///
    /// Pieces are processed in identifier order, so when two pieces contest
    /// a cell within one tick the lower identifier reserves first and the
    /// later one observes the denial. `target` may be absent while the
    /// surrounding world has not produced one yet; pieces then stay in their
    /// scanning phase.
    pub fn handle(
        &mut self,
        events: &[Event],
        pieces: &PieceView,
        grid: &GridView<'_>,
        mut target: Option<&mut dyn HazardTarget>,
        out: &mut Vec<Command>,
    ) {
        let mut dt = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt: delta } = event {
                dt = dt.saturating_add(*delta);
            }
        }
        self.clock = self.clock.saturating_add(dt);

        for snapshot in pieces.iter() {
            let _ = self.pieces.entry(snapshot.id).or_default();
        }

        let target_cell = target
            .as_mut()
            .and_then(|present| grid.nearest_cell(present.position()));

        for event in events {
            self.process_event(event, pieces, grid, target_cell, out);
        }

        let mut strikes = Vec::new();
        for snapshot in pieces.iter() {
            if let Some(runtime) = self.pieces.get_mut(&snapshot.id) {
                advance_piece(runtime, snapshot, grid, target_cell, dt, out, &mut strikes);
            }
        }

        if let Some(target) = target {
            advance_shoves(&mut self.shoves, dt, &mut *target);
            for request in strikes {
                if let Some(runtime) = self.pieces.get_mut(&request.piece) {
                    let _ = strike::perform_strike(
                        self.clock,
                        &mut runtime.last_strike,
                        &request.config,
                        request.origin,
                        &mut *target,
                        &mut self.shoves,
                    );
                }
            }
        }
    }

    /// Continuous world position of a piece for presentation purposes.
    ///
    /// While the piece traverses a route the position interpolates linearly
    /// between the previous and next cell centres by step progress.
    #[must_use]
    pub fn piece_position(&self, piece: &PieceSnapshot, grid: &GridView<'_>) -> Option<Vec3> {
        let runtime = self.pieces.get(&piece.id)?;
        let base = grid.world_position(piece.cell)?;
        match &runtime.phase {
            Phase::Moving {
                route,
                next_index,
                progress,
                ..
            } if *next_index < route.len() => {
                let next = grid.world_position(route[*next_index])?;
                let Some(step) = piece.config.step_duration() else {
                    return Some(base);
                };
                let fraction =
                    (progress.as_secs_f32() / step.as_secs_f32()).clamp(0.0, 1.0);
                Some(base.lerp(next, fraction))
            }
            _ => Some(base),
        }
    }

    fn process_event(
        &mut self,
        event: &Event,
        pieces: &PieceView,
        grid: &GridView<'_>,
        target_cell: Option<CellCoord>,
        out: &mut Vec<Command>,
    ) {
        match event {
            Event::RouteReserved { piece } => {
                if let Some(runtime) = self.pieces.get_mut(piece) {
                    if let Phase::Reserving {
                        route,
                        pending: true,
                        ..
                    } = &mut runtime.phase
                    {
                        let route = std::mem::take(route);
                        runtime.phase = Phase::Moving {
                            route,
                            next_index: 0,
                            progress: Duration::ZERO,
                            awaiting_step: false,
                        };
                    }
                }
            }
            Event::RouteDenied { piece, reason } => {
                let Some(snapshot) = pieces.iter().find(|state| state.id == *piece).copied()
                else {
                    return;
                };
                let Some(runtime) = self.pieces.get_mut(piece) else {
                    return;
                };
                let Phase::Reserving {
                    route,
                    attempts,
                    pending: true,
                    ..
                } = &runtime.phase
                else {
                    return;
                };

                let attempts = attempts + 1;
                let denied_route = route.clone();
                if attempts >= REPLAN_LIMIT {
                    runtime.phase = Phase::Scanning;
                    return;
                }
                let Some(goal) = target_cell else {
                    runtime.phase = Phase::Scanning;
                    return;
                };

                // The target may have moved since the telegraph; when the
                // conflict sits on the very next cell a lateral sidestep is
                // preferred over a full replan.
                let next_route = if reason.cell() == denied_route.first().copied() {
                    lateral_detour(grid, snapshot.cell, &denied_route).or_else(|| {
                        routing::route_to(snapshot.kind, grid, snapshot.cell, goal)
                    })
                } else {
                    routing::route_to(snapshot.kind, grid, snapshot.cell, goal)
                };

                match next_route {
                    Some(route) => {
                        out.push(Command::ReserveRoute {
                            piece: *piece,
                            route: route.clone(),
                        });
                        runtime.phase = Phase::Reserving {
                            wait: Duration::ZERO,
                            route,
                            attempts,
                            pending: true,
                        };
                    }
                    None => runtime.phase = Phase::Scanning,
                }
            }
            Event::PieceAdvanced { piece, to, .. } => {
                let Some(snapshot) = pieces.iter().find(|state| state.id == *piece).copied()
                else {
                    return;
                };
                if let Some(runtime) = self.pieces.get_mut(piece) {
                    if let Phase::Moving {
                        route,
                        next_index,
                        progress,
                        awaiting_step,
                    } = &mut runtime.phase
                    {
                        if *awaiting_step && route.get(*next_index) == Some(to) {
                            *next_index += 1;
                            if let Some(step) = snapshot.config.step_duration() {
                                *progress = progress.saturating_sub(step);
                            }
                            *awaiting_step = false;
                        }
                    }
                }
            }
            Event::PieceStepRejected { piece, .. } => {
                if let Some(runtime) = self.pieces.get_mut(piece) {
                    if let Phase::Moving {
                        route, next_index, ..
                    } = &runtime.phase
                    {
                        let remaining = route[*next_index..].to_vec();
                        if !remaining.is_empty() {
                            out.push(Command::ReleaseRoute {
                                piece: *piece,
                                route: remaining,
                            });
                        }
                        runtime.phase = Phase::Scanning;
                    }
                }
            }
            _ => {}
        }
    }
}

#[derive(Debug, Default)]
struct PieceRuntime {
    phase: Phase,
    last_strike: Option<Duration>,
}

#[derive(Debug, Default)]
enum Phase {
    #[default]
    Scanning,
    Telegraphing {
        wait: Duration,
        target_cell: CellCoord,
    },
    Reserving {
        wait: Duration,
        route: Vec<CellCoord>,
        attempts: u8,
        pending: bool,
    },
    Moving {
        route: Vec<CellCoord>,
        next_index: usize,
        progress: Duration,
        awaiting_step: bool,
    },
    Resolving {
        remaining: Vec<CellCoord>,
    },
}

#[derive(Clone, Copy, Debug)]
struct StrikeRequest {
    piece: PieceId,
    config: PieceConfig,
    origin: Vec3,
}

fn advance_piece(
    runtime: &mut PieceRuntime,
    snapshot: &PieceSnapshot,
    grid: &GridView<'_>,
    target_cell: Option<CellCoord>,
    dt: Duration,
    out: &mut Vec<Command>,
    strikes: &mut Vec<StrikeRequest>,
) {
    let mut budget = dt;

    // Incidental overlap outside the lifecycle proper: a piece standing in
    // the target's cell keeps hurting it, gated only by the cooldown.
    if target_cell == Some(snapshot.cell) {
        queue_strike(strikes, snapshot, grid);
    }

    loop {
        match &mut runtime.phase {
            Phase::Scanning => {
                let Some(goal) = target_cell else {
                    break;
                };
                let threats = routing::threatened_cells(snapshot.kind, grid, snapshot.cell);
                if threats.contains(&goal) {
                    runtime.phase = Phase::Telegraphing {
                        wait: snapshot.config.initial_delay,
                        target_cell: goal,
                    };
                }
                break;
            }
            Phase::Telegraphing { wait, target_cell: goal } => {
                let used = (*wait).min(budget);
                *wait -= used;
                budget -= used;
                if !wait.is_zero() {
                    break;
                }
                let goal = *goal;
                match routing::route_to(snapshot.kind, grid, snapshot.cell, goal) {
                    None => {
                        runtime.phase = Phase::Scanning;
                        break;
                    }
                    Some(route) => {
                        let ttl = marker_ttl(&snapshot.config, route.len());
                        for cell in &route {
                            out.push(Command::PlaceMarker { cell: *cell, ttl });
                        }
                        runtime.phase = Phase::Reserving {
                            wait: snapshot.config.pre_move_delay,
                            route,
                            attempts: 0,
                            pending: false,
                        };
                    }
                }
            }
            Phase::Reserving {
                wait,
                route,
                pending,
                ..
            } => {
                if *pending {
                    break;
                }
                let used = (*wait).min(budget);
                *wait -= used;
                budget -= used;
                if !wait.is_zero() {
                    break;
                }
                *pending = true;
                out.push(Command::ReserveRoute {
                    piece: snapshot.id,
                    route: route.clone(),
                });
                break;
            }
            Phase::Moving {
                route,
                next_index,
                progress,
                awaiting_step,
            } => {
                if *next_index >= route.len() {
                    runtime.phase = Phase::Resolving {
                        remaining: Vec::new(),
                    };
                    continue;
                }
                if target_cell == Some(snapshot.cell) {
                    let remaining = route[*next_index..].to_vec();
                    runtime.phase = Phase::Resolving { remaining };
                    continue;
                }
                let Some(step_duration) = snapshot.config.step_duration() else {
                    log::warn!(
                        "piece {:?} cannot traverse its route; tiles_per_second is not positive",
                        snapshot.id
                    );
                    let remaining = route[*next_index..].to_vec();
                    out.push(Command::ReleaseRoute {
                        piece: snapshot.id,
                        route: remaining,
                    });
                    runtime.phase = Phase::Scanning;
                    break;
                };
                *progress = progress.saturating_add(budget);
                budget = Duration::ZERO;
                if !*awaiting_step && *progress >= step_duration {
                    *awaiting_step = true;
                    out.push(Command::StepPiece {
                        piece: snapshot.id,
                        to: route[*next_index],
                    });
                }
                break;
            }
            Phase::Resolving { remaining } => {
                let remaining = std::mem::take(remaining);
                if !remaining.is_empty() {
                    out.push(Command::ReleaseRoute {
                        piece: snapshot.id,
                        route: remaining,
                    });
                }
                let in_range = match target_cell {
                    Some(goal) if snapshot.kind.is_single_hop() => {
                        snapshot.cell.chebyshev_distance(goal) <= 1
                    }
                    Some(goal) => goal == snapshot.cell,
                    None => false,
                };
                if in_range {
                    queue_strike(strikes, snapshot, grid);
                }
                runtime.phase = Phase::Scanning;
                break;
            }
        }
    }
}

fn queue_strike(strikes: &mut Vec<StrikeRequest>, snapshot: &PieceSnapshot, grid: &GridView<'_>) {
    if strikes.iter().any(|request| request.piece == snapshot.id) {
        return;
    }
    let Some(origin) = grid.world_position(snapshot.cell) else {
        return;
    };
    strikes.push(StrikeRequest {
        piece: snapshot.id,
        config: snapshot.config,
        origin,
    });
}

/// Substitutes the blocked first step with its column-only or row-only
/// sidestep when one exists, is unoccupied, and is unreserved.
fn lateral_detour(
    grid: &GridView<'_>,
    origin: CellCoord,
    route: &[CellCoord],
) -> Option<Vec<CellCoord>> {
    let blocked = *route.first()?;
    let step = CellDelta::between(origin, blocked);
    for alternative in [step.column_only(), step.row_only()] {
        if alternative.is_zero() || alternative == step {
            continue;
        }
        let cell = origin.offset(alternative);
        if grid.is_free(cell) && grid.reservation(cell).is_none() {
            let mut detour = Vec::with_capacity(route.len());
            detour.push(cell);
            detour.extend_from_slice(&route[1..]);
            return Some(detour);
        }
    }
    None
}

fn marker_ttl(config: &PieceConfig, route_len: usize) -> Duration {
    let traversal = config
        .step_duration()
        .map_or(Duration::ZERO, |step| step * route_len as u32);
    config.pre_move_delay.saturating_add(traversal)
}

fn advance_shoves(shoves: &mut Vec<Shove>, dt: Duration, target: &mut dyn HazardTarget) {
    if dt.is_zero() || shoves.is_empty() {
        return;
    }
    for shove in shoves.iter_mut() {
        let slice = dt.min(shove.remaining);
        if slice.is_zero() {
            continue;
        }
        target.translate(shove.velocity * slice.as_secs_f32());
        shove.remaining -= slice;
    }
    shoves.retain(|shove| !shove.remaining.is_zero());
}
