//! Presentation layer as data.
//!
//! `compose` turns the machine state into a `Scene`: which balls are visible
//! and where, and how each claw assembly is posed. It holds no state and draws
//! no random numbers, so equal inputs always give equal scenes. The canvas
//! painter (`paint`) turns a scene into pixels and owns the purely visual
//! extras (easing, sway wobble, light pulsing).

use crate::machine::sequencer::{ClawPhase, ClawPosition};
use crate::population::{BallStyle, PrizeBall};
use crate::tier::DonationTier;

/// Horizontal offsets (percent) of the claw assemblies relative to the computed claw x.
pub fn claw_offsets(tier: DonationTier) -> &'static [f64] {
    match tier {
        DonationTier::GiantTriple => &[-15.0, 0.0, 15.0],
        _ => &[0.0],
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sway {
    None,
    /// Idle drift while waiting for a donation.
    Slow,
    /// Dramatic wobble before the descent.
    Fast,
}

impl Sway {
    fn for_phase(phase: ClawPhase) -> Self {
        match phase {
            ClawPhase::Idle => Sway::Slow,
            ClawPhase::Pause => Sway::Fast,
            _ => Sway::None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BallSprite {
    pub id: u32,
    /// Percent of the display case.
    pub x: f64,
    pub y: f64,
    pub diameter_px: f64,
    pub rotation: f64,
    pub style: BallStyle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeldBall {
    pub style: BallStyle,
    /// Radius in claw sprite units (0..100 box).
    pub radius: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClawSprite {
    /// Percent of the display case.
    pub x: f64,
    pub y: f64,
    pub size_px: f64,
    pub color: &'static str,
    pub glow: (&'static str, f64),
    pub blade_angle: f64,
    pub sway: Sway,
    /// Blade tips sparkle while closing on the ball.
    pub tip_glow: bool,
    /// Only the grabbing claw ever carries the ball.
    pub grabbing: bool,
    pub payload: Option<HeldBall>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub tier: DonationTier,
    pub phase: ClawPhase,
    /// Marquee lights and warning sign are livelier during a cycle.
    pub active: bool,
    pub balls: Vec<BallSprite>,
    pub claws: Vec<ClawSprite>,
}

pub struct SceneInput<'a> {
    pub phase: ClawPhase,
    pub claw_position: ClawPosition,
    /// Ball picked for the running cycle (hidden from the case once the claw closes).
    pub target: Option<&'a PrizeBall>,
    pub grabbed_ball: Option<&'a PrizeBall>,
    pub tier: DonationTier,
    pub population: &'a [PrizeBall],
    pub active: bool,
}

pub fn compose(input: &SceneInput<'_>) -> Scene {
    let hidden_id = if input.phase.hides_target() {
        input.grabbed_ball.or(input.target).map(|b| b.id)
    } else {
        None
    };

    let balls = input
        .population
        .iter()
        .filter(|b| Some(b.id) != hidden_id)
        .map(|b| BallSprite {
            id: b.id,
            x: b.x,
            y: b.y,
            diameter_px: b.size.diameter_px(),
            rotation: b.rotation,
            style: b.style,
        })
        .collect();

    let payload = match input.grabbed_ball {
        Some(ball) if input.phase.holds_ball() => Some(HeldBall { style: ball.style, radius: ball.size.held_radius() }),
        _ => None,
    };

    let claws = claw_offsets(input.tier)
        .iter()
        .map(|&offset| {
            let grabbing = offset == 0.0;
            ClawSprite {
                x: input.claw_position.x + offset,
                y: input.claw_position.y,
                size_px: input.tier.claw_size_px(),
                color: input.tier.claw_color(),
                glow: input.tier.claw_glow(),
                blade_angle: input.phase.blade_angle(),
                sway: Sway::for_phase(input.phase),
                tip_glow: matches!(input.phase, ClawPhase::Close | ClawPhase::Grab),
                grabbing,
                payload: if grabbing { payload.clone() } else { None },
            }
        })
        .collect();

    Scene { tier: input.tier, phase: input.phase, active: input.active, balls, claws }
}
