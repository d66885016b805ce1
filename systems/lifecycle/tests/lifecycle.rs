use std::time::Duration;

use chess_hazard_core::{
    BoardLayout, CellCoord, Command, Event, HazardTarget, PhysicalBody, PieceConfig, PieceId,
    PieceKind,
};
use chess_hazard_system_lifecycle::Lifecycle;
use chess_hazard_world::{self as world, query, Board};
use glam::Vec3;

struct TestBody {
    mass: f32,
    velocity: Vec3,
    pushes: u32,
}

impl PhysicalBody for TestBody {
    fn mass(&self) -> f32 {
        self.mass
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
        self.pushes += 1;
    }
}

struct TestTarget {
    position: Vec3,
    hits: Vec<f32>,
    body: Option<TestBody>,
}

impl TestTarget {
    fn at(position: Vec3) -> Self {
        Self {
            position,
            hits: Vec::new(),
            body: None,
        }
    }

    fn with_body(position: Vec3, mass: f32, velocity: Vec3) -> Self {
        Self {
            position,
            hits: Vec::new(),
            body: Some(TestBody {
                mass,
                velocity,
                pushes: 0,
            }),
        }
    }
}

impl HazardTarget for TestTarget {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn take_damage(&mut self, amount: f32) {
        self.hits.push(amount);
    }

    fn physics(&mut self) -> Option<&mut dyn PhysicalBody> {
        self.body
            .as_mut()
            .map(|body| body as &mut dyn PhysicalBody)
    }

    fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }
}

fn configured_board(columns: u32, rows: u32) -> Board {
    let mut board = Board::new();
    world::apply(
        &mut board,
        Command::ConfigureBoard {
            layout: BoardLayout::Generated {
                columns,
                rows,
                cell_size: 1.0,
                origin: Vec3::ZERO,
            },
        },
        &mut Vec::new(),
    );
    board
}

fn spawn_piece(board: &mut Board, kind: PieceKind, cell: CellCoord, config: PieceConfig) -> PieceId {
    let mut events = Vec::new();
    world::apply(
        board,
        Command::SpawnPiece { kind, cell, config },
        &mut events,
    );
    match events.as_slice() {
        [Event::PieceSpawned { piece, .. }] => *piece,
        other => panic!("unexpected spawn events: {other:?}"),
    }
}

/// Drives one tick: applies the tick command, then drains the system's
/// command batches until it settles, recapturing views between batches.
fn pump(
    board: &mut Board,
    system: &mut Lifecycle,
    target: &mut TestTarget,
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

fn piece_cell(board: &Board, piece: PieceId) -> CellCoord {
    query::piece_view(board)
        .into_vec()
        .into_iter()
        .find(|snapshot| snapshot.id == piece)
        .expect("piece exists")
        .cell
}

fn attack_config() -> PieceConfig {
    let mut config = PieceConfig::default();
    config.tiles_per_second = 1.0;
    config.initial_delay = Duration::from_secs(1);
    config.pre_move_delay = Duration::from_secs(1);
    config.damage = 7.5;
    config.push_force = 5.0;
    config.collision_cooldown = Duration::from_secs(5);
    config
}

#[test]
fn rook_detects_telegraphs_reserves_and_strikes() {
    let mut board = configured_board(8, 8);
    let rook = spawn_piece(
        &mut board,
        PieceKind::Rook,
        CellCoord::new(0, 0),
        attack_config(),
    );
    let mut system = Lifecycle::new();
    let mut target =
        TestTarget::with_body(Vec3::new(0.0, 0.0, 5.25), 1.0, Vec3::new(0.0, -3.0, 0.0));

    let mut all_events = Vec::new();
    for _ in 0..8 {
        all_events.extend(pump(
            &mut board,
            &mut system,
            &mut target,
            Duration::from_secs(1),
        ));
    }

    let marker_count = all_events
        .iter()
        .filter(|event| matches!(event, Event::MarkerPlaced { .. }))
        .count();
    assert_eq!(marker_count, 5, "one telegraph marker per route cell");

    let advances: Vec<CellCoord> = all_events
        .iter()
        .filter_map(|event| match event {
            Event::PieceAdvanced { piece, to, .. } if *piece == rook => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(
        advances,
        vec![
            CellCoord::new(0, 1),
            CellCoord::new(0, 2),
            CellCoord::new(0, 3),
            CellCoord::new(0, 4),
            CellCoord::new(0, 5),
        ]
    );
    assert_eq!(piece_cell(&board, rook), CellCoord::new(0, 5));

    assert_eq!(target.hits, vec![7.5], "exactly one damage application");
    let body = target.body.as_ref().expect("body kept");
    assert_eq!(body.pushes, 1, "exactly one push impulse");
    assert!((body.velocity.z - 5.0).abs() < 1e-5);
    assert_eq!(body.velocity.y, -3.0, "vertical velocity preserved");
}

#[test]
fn contested_cell_goes_to_the_first_piece_and_the_second_backs_off() {
    let mut board = configured_board(8, 8);
    let first = spawn_piece(
        &mut board,
        PieceKind::Rook,
        CellCoord::new(2, 0),
        attack_config(),
    );
    let second = spawn_piece(
        &mut board,
        PieceKind::Rook,
        CellCoord::new(0, 4),
        attack_config(),
    );
    let mut system = Lifecycle::new();
    let mut target = TestTarget::at(Vec3::new(2.0, 0.0, 4.25));

    let mut all_events = Vec::new();
    for _ in 0..3 {
        all_events.extend(pump(
            &mut board,
            &mut system,
            &mut target,
            Duration::from_secs(1),
        ));
    }

    assert!(
        all_events.contains(&Event::RouteReserved { piece: first }),
        "first-resumed piece wins the contested cell"
    );
    assert!(
        all_events
            .iter()
            .any(|event| matches!(event, Event::RouteDenied { piece, .. } if *piece == second)),
        "second piece observes the denial in the same tick"
    );

    for column in 0..8 {
        for row in 0..8 {
            let snapshot =
                query::cell(&board, CellCoord::new(column, row)).expect("cell exists");
            assert!(
                snapshot.reservation.is_none() || snapshot.reservation == Some(first),
                "only the winner holds reservations"
            );
        }
    }
    assert_eq!(piece_cell(&board, second), CellCoord::new(0, 4));

    for _ in 0..4 {
        let _ = pump(
            &mut board,
            &mut system,
            &mut target,
            Duration::from_secs(1),
        );
    }
    assert_eq!(piece_cell(&board, first), CellCoord::new(2, 4));
    assert!(!target.hits.is_empty());
}

#[test]
fn blocked_first_step_reroutes_through_the_lateral_alternative() {
    let mut board = configured_board(8, 8);
    let blocker = spawn_piece(
        &mut board,
        PieceKind::Rook,
        CellCoord::new(7, 7),
        attack_config(),
    );
    world::apply(
        &mut board,
        Command::ReserveRoute {
            piece: blocker,
            route: vec![CellCoord::new(1, 1)],
        },
        &mut Vec::new(),
    );

    let mut config = attack_config();
    config.initial_delay = Duration::from_millis(100);
    config.pre_move_delay = Duration::from_millis(100);
    config.tiles_per_second = 2.0;
    let bishop = spawn_piece(&mut board, PieceKind::Bishop, CellCoord::new(0, 0), config);

    let mut system = Lifecycle::new();
    let mut target = TestTarget::at(Vec3::new(3.0, 0.0, 3.25));

    let mut all_events = Vec::new();
    for _ in 0..3 {
        all_events.extend(pump(
            &mut board,
            &mut system,
            &mut target,
            Duration::from_millis(100),
        ));
    }
    for _ in 0..3 {
        all_events.extend(pump(
            &mut board,
            &mut system,
            &mut target,
            Duration::from_millis(500),
        ));
    }

    let advances: Vec<CellCoord> = all_events
        .iter()
        .filter_map(|event| match event {
            Event::PieceAdvanced { piece, to, .. } if *piece == bishop => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(
        advances,
        vec![
            CellCoord::new(1, 0),
            CellCoord::new(2, 2),
            CellCoord::new(3, 3),
        ],
        "the blocked diagonal step is replaced by its lateral alternative"
    );
    assert_eq!(target.hits.len(), 1);
}

#[test]
fn rejected_step_releases_the_rest_of_the_route() {
    let mut board = configured_board(8, 8);
    let mut config = attack_config();
    config.initial_delay = Duration::from_millis(100);
    config.pre_move_delay = Duration::from_millis(100);
    let rook = spawn_piece(&mut board, PieceKind::Rook, CellCoord::new(0, 0), config);

    let mut system = Lifecycle::new();
    let mut target = TestTarget::at(Vec3::new(0.0, 0.0, 4.25));

    for _ in 0..3 {
        let _ = pump(
            &mut board,
            &mut system,
            &mut target,
            Duration::from_millis(100),
        );
    }
    let _ = pump(&mut board, &mut system, &mut target, Duration::from_secs(1));
    assert_eq!(piece_cell(&board, rook), CellCoord::new(0, 1));

    // Something lands in the reserved lane mid-traversal.
    world::apply(
        &mut board,
        Command::PlaceScenery {
            cell: CellCoord::new(0, 2),
        },
        &mut Vec::new(),
    );

    let events = pump(&mut board, &mut system, &mut target, Duration::from_secs(1));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::PieceStepRejected { piece, .. } if *piece == rook)));

    for row in 2..5 {
        let snapshot = query::cell(&board, CellCoord::new(0, row)).expect("cell exists");
        assert_eq!(
            snapshot.reservation, None,
            "abandoned route cells are released"
        );
    }

    for _ in 0..2 {
        let _ = pump(&mut board, &mut system, &mut target, Duration::from_secs(1));
    }
    assert_eq!(
        piece_cell(&board, rook),
        CellCoord::new(0, 1),
        "the blocked piece stays put and keeps scanning"
    );
    assert!(target.hits.is_empty());
}

#[test]
fn overlapping_piece_strikes_through_the_cooldown_and_shoves_the_target() {
    let mut board = configured_board(8, 8);
    let config = PieceConfig {
        push_force: 6.0,
        ..PieceConfig::default()
    };
    let _rook = spawn_piece(&mut board, PieceKind::Rook, CellCoord::new(2, 2), config);

    let mut system = Lifecycle::new();
    let mut target = TestTarget::at(Vec3::new(2.3, 0.0, 2.0));

    for _ in 0..4 {
        let _ = pump(
            &mut board,
            &mut system,
            &mut target,
            Duration::from_millis(100),
        );
    }

    assert_eq!(
        target.hits.len(),
        1,
        "the collision cooldown suppresses repeat strikes"
    );
    assert!(
        (target.position.x - 3.5).abs() < 1e-3,
        "a bodiless target slides through the translate fallback"
    );
}

#[test]
fn knight_withholds_the_strike_when_the_target_slips_away() {
    let mut board = configured_board(8, 8);
    let mut config = attack_config();
    config.initial_delay = Duration::ZERO;
    config.pre_move_delay = Duration::ZERO;
    config.tiles_per_second = 2.0;
    let knight = spawn_piece(&mut board, PieceKind::Knight, CellCoord::new(0, 0), config);

    let mut system = Lifecycle::new();
    let mut target = TestTarget::at(Vec3::new(1.0, 0.0, 2.25));

    let _ = pump(
        &mut board,
        &mut system,
        &mut target,
        Duration::from_millis(100),
    );
    let _ = pump(
        &mut board,
        &mut system,
        &mut target,
        Duration::from_millis(100),
    );

    // The target escapes while the knight is mid-leap.
    target.position = Vec3::new(5.0, 0.0, 5.0);
    let _ = pump(&mut board, &mut system, &mut target, Duration::from_secs(1));

    assert_eq!(piece_cell(&board, knight), CellCoord::new(1, 2));
    assert!(
        target.hits.is_empty(),
        "a vacated destination resolves without a strike"
    );
}
