#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the chess-hazard simulation in a terminal.

mod scenario;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chess_hazard_core::{
    BoardLayout, CellCoord, Command, Event, Forward, HazardTarget, Occupant, PhysicalBody,
    PieceConfig, PieceKind,
};
use chess_hazard_system_lifecycle::Lifecycle;
use chess_hazard_world::{self as world, query, Board};
use clap::{Parser, ValueEnum};
use glam::Vec3;
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

use scenario::{BoardSpec, PieceSpec, Scenario};

/// Command-line arguments accepted by the demo driver.
#[derive(Debug, Parser)]
#[command(
    name = "chess-hazard",
    about = "Runs the chess-hazard board simulation in a terminal"
)]
struct Args {
    /// Number of board columns when no scenario file is provided.
    #[arg(long, default_value_t = 8)]
    columns: u32,

    /// Number of board rows when no scenario file is provided.
    #[arg(long, default_value_t = 8)]
    rows: u32,

    /// Piece kind spawned at the board origin when no scenario file is
    /// provided.
    #[arg(long, value_enum, default_value_t = KindArg::Rook)]
    piece: KindArg,

    /// Number of simulation ticks to run.
    #[arg(long, default_value_t = 240)]
    ticks: u32,

    /// Simulated milliseconds advanced per tick.
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,

    /// Seed for the wandering target.
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,

    /// JSON scenario file describing the board, pieces, and target.
    #[arg(long)]
    scenario: Option<PathBuf>,
}

/// Piece kinds selectable from the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl KindArg {
    fn into_kind(self) -> PieceKind {
        match self {
            Self::Rook => PieceKind::Rook,
            Self::Bishop => PieceKind::Bishop,
            Self::Knight => PieceKind::Knight,
            Self::Pawn => PieceKind::Pawn {
                forward: Forward::PositiveRows,
            },
        }
    }
}

/// Terminal stand-in for the damageable, pushable target entity.
#[derive(Debug)]
struct DemoTarget {
    position: Vec3,
    health: f32,
}

impl HazardTarget for DemoTarget {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn take_damage(&mut self, amount: f32) {
        self.health -= amount;
        log::info!("target takes {amount} damage, {:.1} left", self.health);
    }

    fn physics(&mut self) -> Option<&mut dyn PhysicalBody> {
        None
    }

    fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }
}

/// Entry point for the chess-hazard command-line demo.
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let scenario = match &args.scenario {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading scenario {}", path.display()))?;
            serde_json::from_str::<Scenario>(&raw).context("parsing scenario")?
        }
        None => Scenario {
            board: BoardSpec {
                columns: args.columns,
                rows: args.rows,
                cell_size: 1.0,
            },
            pieces: vec![PieceSpec {
                kind: args.piece.into_kind(),
                cell: CellCoord::new(0, 0),
                config: PieceConfig::default(),
            }],
            scenery: Vec::new(),
            target: CellCoord::new(0, i32::try_from(args.rows.saturating_sub(1)).unwrap_or(0)),
        },
    };

    let mut board = Board::new();
    let mut events = Vec::new();
    world::apply(
        &mut board,
        Command::ConfigureBoard {
            layout: BoardLayout::Generated {
                columns: scenario.board.columns,
                rows: scenario.board.rows,
                cell_size: scenario.board.cell_size,
                origin: Vec3::ZERO,
            },
        },
        &mut events,
    );
    for cell in &scenario.scenery {
        world::apply(&mut board, Command::PlaceScenery { cell: *cell }, &mut events);
    }
    for piece in &scenario.pieces {
        world::apply(
            &mut board,
            Command::SpawnPiece {
                kind: piece.kind,
                cell: piece.cell,
                config: piece.config,
            },
            &mut events,
        );
    }
    for event in &events {
        log::debug!("{event:?}");
    }

    let start = query::world_position(&board, scenario.target)
        .context("target start cell is missing from the board")?;
    let mut target = DemoTarget {
        position: start + Vec3::new(0.2, 0.0, 0.1),
        health: 100.0,
    };
    let mut system = Lifecycle::new();
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let dt = Duration::from_millis(args.tick_ms);

    for tick in 0..args.ticks {
        wander(&mut target, &mut rng);
        let events = pump(&mut board, &mut system, &mut target, dt);
        for event in &events {
            log::debug!("tick {tick}: {event:?}");
        }
        for snapshot in query::piece_view(&board).iter() {
            if let Some(position) = system.piece_position(snapshot, &query::grid_view(&board)) {
                log::debug!("tick {tick}: piece {:?} at {position}", snapshot.id);
            }
        }

        if tick % 20 == 0 {
            println!("tick {tick}, target {:.1} hp", target.health);
            render(&board, &scenario.board, &target);
        }
        if target.health <= 0.0 {
            println!("target destroyed on tick {tick}");
            break;
        }
    }

    println!("final state, target {:.1} hp", target.health);
    render(&board, &scenario.board, &target);
    Ok(())
}

/// Drives one tick: applies the tick command, then drains the system's
/// command batches until it settles, recapturing views between batches.
fn pump(
    board: &mut Board,
    system: &mut Lifecycle,
    target: &mut DemoTarget,
    dt: Duration,
) -> Vec<Event> {
    let mut all_events = Vec::new();
    let mut events = Vec::new();
    world::apply(board, Command::Tick { dt }, &mut events);
    loop {
        all_events.extend(events.iter().cloned());
        let mut commands = Vec::new();
        {
            let piece_view = query::piece_view(board);
            let grid = query::grid_view(board);
            system.handle(&events, &piece_view, &grid, Some(&mut *target), &mut commands);
        }
        if commands.is_empty() {
            break;
        }
        events.clear();
        for command in commands {
            world::apply(board, command, &mut events);
        }
    }
    all_events
}

/// Drifts the target a little every tick so pieces have something to hunt.
fn wander(target: &mut DemoTarget, rng: &mut ChaCha8Rng) {
    let jitter = Vec3::new(
        rng.gen_range(-0.12..=0.12),
        0.0,
        rng.gen_range(-0.12..=0.12),
    );
    target.position += jitter;
}

fn render(board: &Board, spec: &BoardSpec, target: &DemoTarget) {
    let grid = query::grid_view(board);
    let target_cell = grid.nearest_cell(target.position);
    let pieces: HashMap<CellCoord, PieceKind> = query::piece_view(board)
        .iter()
        .map(|snapshot| (snapshot.cell, snapshot.kind))
        .collect();

    for row in 0..spec.rows {
        let mut line = String::new();
        for column in 0..spec.columns {
            let coordinate = CellCoord::new(
                i32::try_from(column).unwrap_or(i32::MAX),
                i32::try_from(row).unwrap_or(i32::MAX),
            );
            let glyph = if target_cell == Some(coordinate) {
                'T'
            } else if let Some(kind) = pieces.get(&coordinate) {
                match kind {
                    PieceKind::Rook => 'R',
                    PieceKind::Bishop => 'B',
                    PieceKind::Knight => 'N',
                    PieceKind::Pawn { .. } => 'P',
                }
            } else {
                match query::cell(board, coordinate) {
                    Some(snapshot) if snapshot.occupant == Some(Occupant::Scenery) => '#',
                    Some(snapshot) if !snapshot.markers.is_empty() => '+',
                    Some(snapshot) if snapshot.reservation.is_some() => '*',
                    _ => '.',
                }
            };
            line.push(glyph);
            line.push(' ');
        }
        println!("{line}");
    }
}
