//! Strike effect applied when a piece reaches the target.

use std::time::Duration;

use chess_hazard_core::{HazardTarget, PieceConfig};
use glam::Vec3;

/// How long a pushed target without a physical body keeps sliding.
const SHOVE_FALLBACK_DURATION: Duration = Duration::from_millis(200);

/// In-flight fallback displacement for a target without a physical body.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Shove {
    pub(crate) velocity: Vec3,
    pub(crate) remaining: Duration,
}

/// Applies damage and the horizontal push to the target.
///
/// The push direction runs from the attacker toward the target with its
/// vertical component zeroed; the magnitude scales with the square root of
/// the body's mass so heavier targets feel the same impulse. A body keeps
/// its vertical velocity; a bodiless target is queued for a short direct
/// translation instead. Returns `false` when the piece's collision cooldown
/// suppressed the strike.
pub(crate) fn perform_strike(
    now: Duration,
    last_strike: &mut Option<Duration>,
    config: &PieceConfig,
    attacker_position: Vec3,
    target: &mut dyn HazardTarget,
    shoves: &mut Vec<Shove>,
) -> bool {
    if let Some(last) = *last_strike {
        if now.saturating_sub(last) < config.collision_cooldown {
            return false;
        }
    }
    *last_strike = Some(now);

    target.take_damage(config.damage);

    let mut direction = target.position() - attacker_position;
    direction.y = 0.0;
    if direction.length_squared() <= f32::EPSILON {
        return true;
    }
    let direction = direction.normalize();

    match target.physics() {
        Some(body) => {
            let magnitude = config.push_force * body.mass().max(0.0).sqrt();
            let vertical = body.velocity().y;
            let mut velocity = direction * magnitude;
            velocity.y = vertical;
            body.set_velocity(velocity);
        }
        None => shoves.push(Shove {
            velocity: direction * config.push_force,
            remaining: SHOVE_FALLBACK_DURATION,
        }),
    }

    true
}
