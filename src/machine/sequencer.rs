//! Claw animation sequencer.
//!
//! One donation runs the claw through a fixed timeline:
//! approach -> pause -> descend -> open -> close -> grab -> ascend -> idle.
//! Starting a cycle schedules every transition up front as a deadline; the
//! animation loop calls `tick(now)` and all due transitions are applied in order,
//! so a late frame never skips a phase. Cancelling a cycle drops every pending
//! deadline at once.

use std::collections::VecDeque;

use rand::Rng;

use crate::population::{PrizeBall, choose_target};
use crate::tier::{DonationTier, resolve_tier};

// --- Geometry (percent of display case) --------------------------------------

/// Top-centre parking spot between cycles.
pub const REST_POSITION: ClawPosition = ClawPosition { x: 50.0, y: 10.0 };
/// Highest the claw may hover while approaching a ball.
pub const APPROACH_MIN_Y: f64 = 20.0;
const APPROACH_LIFT: f64 = 25.0;
const ASCEND_LIFT: f64 = 30.0;
/// Distance from the claw anchor down to the blade tips (the grip point).
pub const GRIP_OFFSET: f64 = 15.0;
/// Visible floor of the display case. The grip point never goes below it.
pub const FLOOR_LINE: f64 = 97.0;
/// Lowest the claw anchor itself may descend to.
pub const DESCEND_MAX_Y: f64 = 85.0;

// --- Timeline (milliseconds) -------------------------------------------------

/// Time spent in each phase of a cycle, in order.
pub const PHASE_TIMELINE: [(ClawPhase, u32); 7] = [
    (ClawPhase::Approach, 1000),
    (ClawPhase::Pause, 1200),
    (ClawPhase::Descend, 2000),
    (ClawPhase::Open, 500),
    (ClawPhase::Close, 300),
    (ClawPhase::Grab, 400),
    (ClawPhase::Ascend, 1000),
];

/// Delay into `Ascend` before the claw heads back to its rest position.
pub const RETURN_TO_REST_MS: u32 = 500;

/// Full length of one cycle, from `start_cycle` until `CycleComplete`.
pub const CYCLE_DURATION_MS: u32 = {
    let mut total = 0;
    let mut i = 0;
    while i < PHASE_TIMELINE.len() {
        total += PHASE_TIMELINE[i].1;
        i += 1;
    }
    total
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClawPhase {
    #[default]
    Idle,
    Approach,
    Pause,
    Descend,
    Open,
    Close,
    Grab,
    Ascend,
}

impl ClawPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ClawPhase::Idle => "idle",
            ClawPhase::Approach => "approach",
            ClawPhase::Pause => "pause",
            ClawPhase::Descend => "descend",
            ClawPhase::Open => "open",
            ClawPhase::Close => "close",
            ClawPhase::Grab => "grab",
            ClawPhase::Ascend => "ascend",
        }
    }

    /// Blade spread in degrees. Positive opens the blades, negative squeezes them.
    pub fn blade_angle(self) -> f64 {
        match self {
            ClawPhase::Open => 35.0,
            ClawPhase::Close | ClawPhase::Grab | ClawPhase::Ascend => -15.0,
            ClawPhase::Pause => 8.0,
            ClawPhase::Idle | ClawPhase::Approach | ClawPhase::Descend => 5.0,
        }
    }

    /// Phases during which the claw carries the grabbed ball.
    pub fn holds_ball(self) -> bool {
        matches!(self, ClawPhase::Grab | ClawPhase::Ascend)
    }

    /// Phases during which the targeted ball is gone from the case.
    pub fn hides_target(self) -> bool {
        matches!(self, ClawPhase::Close | ClawPhase::Grab | ClawPhase::Ascend)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClawPosition {
    pub x: f64,
    pub y: f64,
}

impl Default for ClawPosition {
    fn default() -> Self {
        REST_POSITION
    }
}

pub fn approach_position(ball: &PrizeBall) -> ClawPosition {
    ClawPosition { x: ball.x, y: (ball.y - APPROACH_LIFT).max(APPROACH_MIN_Y) }
}

/// Anchor position that lines the grip point up with the ball centre, without
/// letting the grip point cross the floor.
pub fn descend_position(ball: &PrizeBall) -> ClawPosition {
    let aligned = ball.y - GRIP_OFFSET;
    let floor_limit = FLOOR_LINE - GRIP_OFFSET;
    ClawPosition { x: ball.x, y: aligned.min(floor_limit).min(DESCEND_MAX_Y) }
}

pub fn ascend_position(ball: &PrizeBall) -> ClawPosition {
    ClawPosition { x: ball.x, y: ball.y - ASCEND_LIFT }
}

pub fn grip_point(position: ClawPosition) -> f64 {
    position.y + GRIP_OFFSET
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClawState {
    pub phase: ClawPhase,
    /// Target for the claw anchor; the painter eases toward it.
    pub position: ClawPosition,
    /// Only set during `Grab` and `Ascend`.
    pub grabbed_ball: Option<PrizeBall>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SequencerEvent {
    PhaseEntered(ClawPhase),
    BallGrabbed(PrizeBall),
    ReturnedToRest,
    CycleComplete { tier: DonationTier },
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Step {
    Enter(ClawPhase),
    ReturnToRest,
    Finish,
}

#[derive(Clone, Copy, Debug)]
struct PendingStep {
    due_ms: f64,
    step: Step,
}

#[derive(Debug, Default)]
pub struct ClawSequencer {
    state: ClawState,
    target: Option<PrizeBall>,
    tier: Option<DonationTier>,
    pending: VecDeque<PendingStep>,
}

impl ClawSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ClawState {
        &self.state
    }

    pub fn phase(&self) -> ClawPhase {
        self.state.phase
    }

    pub fn position(&self) -> ClawPosition {
        self.state.position
    }

    pub fn grabbed_ball(&self) -> Option<&PrizeBall> {
        self.state.grabbed_ball.as_ref()
    }

    /// Ball chosen for the running cycle, if any.
    pub fn target(&self) -> Option<&PrizeBall> {
        self.target.as_ref()
    }

    pub fn is_running(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of scheduled transitions not yet fired.
    pub fn pending_steps(&self) -> usize {
        self.pending.len()
    }

    /// Begin a cycle for `amount`. Any cycle already in flight is cancelled first.
    /// Returns the events fired immediately (entering `Approach`).
    pub fn start_cycle<R: Rng + ?Sized>(
        &mut self,
        amount: u32,
        population: &[PrizeBall],
        now_ms: f64,
        rng: &mut R,
    ) -> Vec<SequencerEvent> {
        self.reset();
        let tier = resolve_tier(amount);
        let Some(target) = choose_target(population, tier.target_ball_size(), rng).cloned() else {
            crate::log::warn("claw cycle requested with an empty prize case");
            return vec![SequencerEvent::CycleComplete { tier }];
        };
        crate::log::info(&format!(
            "claw cycle start: amount={amount} tier={tier} target=#{} ({})",
            target.id,
            target.size.as_str()
        ));

        self.state.phase = ClawPhase::Approach;
        self.state.position = approach_position(&target);
        self.target = Some(target);
        self.tier = Some(tier);

        let mut offset = 0u32;
        for (phase, duration) in PHASE_TIMELINE.iter().copied() {
            if phase != ClawPhase::Approach {
                self.pending.push_back(PendingStep { due_ms: now_ms + offset as f64, step: Step::Enter(phase) });
            }
            if phase == ClawPhase::Ascend {
                self.pending.push_back(PendingStep {
                    due_ms: now_ms + (offset + RETURN_TO_REST_MS) as f64,
                    step: Step::ReturnToRest,
                });
            }
            offset += duration;
        }
        self.pending.push_back(PendingStep { due_ms: now_ms + offset as f64, step: Step::Finish });

        vec![SequencerEvent::PhaseEntered(ClawPhase::Approach)]
    }

    /// Apply every transition due at `now_ms`, in schedule order.
    pub fn tick(&mut self, now_ms: f64) -> Vec<SequencerEvent> {
        let mut events = Vec::new();
        while let Some(next) = self.pending.front().copied() {
            if next.due_ms > now_ms {
                break;
            }
            self.pending.pop_front();
            self.apply(next.step, &mut events);
        }
        events
    }

    /// Cancel the running cycle. Leaves the claw idle, empty-handed and parked.
    /// Returns true when a cycle was actually interrupted.
    pub fn reset(&mut self) -> bool {
        let interrupted = !self.pending.is_empty();
        if interrupted {
            crate::log::info(&format!("claw cycle aborted in phase {}", self.state.phase.as_str()));
        }
        self.pending.clear();
        self.state = ClawState::default();
        self.target = None;
        self.tier = None;
        interrupted
    }

    fn apply(&mut self, step: Step, events: &mut Vec<SequencerEvent>) {
        match step {
            Step::Enter(phase) => {
                self.state.phase = phase;
                if let Some(target) = &self.target {
                    match phase {
                        ClawPhase::Descend => self.state.position = descend_position(target),
                        ClawPhase::Ascend => self.state.position = ascend_position(target),
                        _ => {}
                    }
                }
                events.push(SequencerEvent::PhaseEntered(phase));
                if phase == ClawPhase::Grab {
                    if let Some(target) = self.target.clone() {
                        self.state.grabbed_ball = Some(target.clone());
                        events.push(SequencerEvent::BallGrabbed(target));
                    }
                }
            }
            Step::ReturnToRest => {
                self.state.position = REST_POSITION;
                events.push(SequencerEvent::ReturnedToRest);
            }
            Step::Finish => {
                let tier = self.tier.unwrap_or(DonationTier::Normal);
                self.state = ClawState::default();
                self.target = None;
                self.tier = None;
                events.push(SequencerEvent::PhaseEntered(ClawPhase::Idle));
                events.push(SequencerEvent::CycleComplete { tier });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::{RenderStrategy, generate_population};
    use crate::tier::BallSize;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn population(tier: DonationTier, seed: u64) -> Vec<PrizeBall> {
        generate_population(tier, RenderStrategy::Vector, &mut SmallRng::seed_from_u64(seed))
    }

    fn phases(events: &[SequencerEvent]) -> Vec<ClawPhase> {
        events
            .iter()
            .filter_map(|e| match e {
                SequencerEvent::PhaseEntered(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_cycle_duration_matches_timeline() {
        assert_eq!(CYCLE_DURATION_MS, 6400);
    }

    #[test]
    fn test_phases_visited_in_order_once() {
        let balls = population(DonationTier::Normal, 1);
        let mut rng = SmallRng::seed_from_u64(2);
        let mut seq = ClawSequencer::new();
        let mut events = seq.start_cycle(150, &balls, 0.0, &mut rng);
        let mut t = 0.0;
        while seq.is_running() {
            t += 16.0;
            let fired = seq.tick(t);
            for e in &fired {
                if let SequencerEvent::PhaseEntered(_) = e {
                    assert_eq!(seq.state().grabbed_ball.is_some(), seq.phase().holds_ball());
                }
            }
            events.extend(fired);
        }
        assert_eq!(
            phases(&events),
            vec![
                ClawPhase::Approach,
                ClawPhase::Pause,
                ClawPhase::Descend,
                ClawPhase::Open,
                ClawPhase::Close,
                ClawPhase::Grab,
                ClawPhase::Ascend,
                ClawPhase::Idle,
            ]
        );
        assert!(matches!(events.last(), Some(SequencerEvent::CycleComplete { tier: DonationTier::Normal })));
        assert!(t >= CYCLE_DURATION_MS as f64);
        assert_eq!(seq.position(), REST_POSITION);
        assert!(seq.grabbed_ball().is_none());
    }

    #[test]
    fn test_single_late_tick_fires_everything_in_order() {
        let balls = population(DonationTier::Gold, 4);
        let mut seq = ClawSequencer::new();
        seq.start_cycle(300, &balls, 1_000.0, &mut SmallRng::seed_from_u64(9));
        let events = seq.tick(1_000.0 + 60_000.0);
        assert_eq!(phases(&events).len(), 7);
        assert_eq!(events.iter().filter(|e| matches!(e, SequencerEvent::BallGrabbed(_))).count(), 1);
        assert_eq!(seq.phase(), ClawPhase::Idle);
    }

    #[test]
    fn test_transition_times() {
        let balls = population(DonationTier::Normal, 5);
        let mut seq = ClawSequencer::new();
        seq.start_cycle(100, &balls, 0.0, &mut SmallRng::seed_from_u64(1));
        assert_eq!(seq.phase(), ClawPhase::Approach);
        seq.tick(999.0);
        assert_eq!(seq.phase(), ClawPhase::Approach);
        seq.tick(1000.0);
        assert_eq!(seq.phase(), ClawPhase::Pause);
        seq.tick(2200.0);
        assert_eq!(seq.phase(), ClawPhase::Descend);
        seq.tick(4200.0);
        assert_eq!(seq.phase(), ClawPhase::Open);
        seq.tick(4700.0);
        assert_eq!(seq.phase(), ClawPhase::Close);
        assert!(seq.grabbed_ball().is_none());
        seq.tick(5000.0);
        assert_eq!(seq.phase(), ClawPhase::Grab);
        assert!(seq.grabbed_ball().is_some());
        seq.tick(5400.0);
        assert_eq!(seq.phase(), ClawPhase::Ascend);
        let target = seq.target().cloned().unwrap();
        assert_eq!(seq.position(), ascend_position(&target));
        seq.tick(5900.0);
        assert_eq!(seq.position(), REST_POSITION);
        assert_eq!(seq.phase(), ClawPhase::Ascend);
        seq.tick(6400.0);
        assert_eq!(seq.phase(), ClawPhase::Idle);
        assert!(!seq.is_running());
    }

    #[test]
    fn test_positions_follow_target() {
        let balls = population(DonationTier::Giant, 8);
        let mut seq = ClawSequencer::new();
        seq.start_cycle(600, &balls, 0.0, &mut SmallRng::seed_from_u64(8));
        let target = seq.target().cloned().unwrap();
        assert_eq!(target.size, BallSize::Large);
        assert_eq!(seq.position(), approach_position(&target));
        assert!(seq.position().y >= APPROACH_MIN_Y);
        seq.tick(2200.0);
        let p = seq.position();
        assert_eq!(p, descend_position(&target));
        assert!(grip_point(p) <= FLOOR_LINE);
    }

    #[test]
    fn test_grip_point_never_crosses_floor() {
        for seed in 0..50 {
            for ball in population(DonationTier::GiantTriple, seed) {
                let p = descend_position(&ball);
                assert!(grip_point(p) <= FLOOR_LINE + 1e-9);
                assert!(p.y <= DESCEND_MAX_Y);
                assert_eq!(p.x, ball.x);
            }
        }
        let deep = PrizeBall { y: 140.0, ..population(DonationTier::Normal, 0)[0].clone() };
        assert!(grip_point(descend_position(&deep)) <= FLOOR_LINE);
    }

    #[test]
    fn test_abort_mid_cycle_cancels_pending() {
        let balls = population(DonationTier::Normal, 3);
        let mut seq = ClawSequencer::new();
        seq.start_cycle(150, &balls, 0.0, &mut SmallRng::seed_from_u64(3));
        seq.tick(5_100.0);
        assert_eq!(seq.phase(), ClawPhase::Grab);
        assert!(seq.reset());
        assert_eq!(seq.phase(), ClawPhase::Idle);
        assert!(seq.grabbed_ball().is_none());
        assert!(seq.target().is_none());
        assert_eq!(seq.pending_steps(), 0);
        assert!(seq.tick(100_000.0).is_empty());
        assert!(!seq.reset());
    }

    #[test]
    fn test_restart_replaces_previous_schedule() {
        let balls = population(DonationTier::Normal, 6);
        let mut rng = SmallRng::seed_from_u64(6);
        let mut seq = ClawSequencer::new();
        seq.start_cycle(150, &balls, 0.0, &mut rng);
        seq.tick(3_000.0);
        seq.start_cycle(150, &balls, 3_000.0, &mut rng);
        assert_eq!(seq.phase(), ClawPhase::Approach);
        // The old schedule would have entered Open at 4200.
        let events = seq.tick(4_200.0);
        assert_eq!(phases(&events), vec![ClawPhase::Pause]);
    }

    #[test]
    fn test_blade_angles() {
        assert!(ClawPhase::Open.blade_angle() > ClawPhase::Pause.blade_angle());
        assert!(ClawPhase::Pause.blade_angle() > ClawPhase::Idle.blade_angle());
        assert_eq!(ClawPhase::Close.blade_angle(), ClawPhase::Ascend.blade_angle());
        assert!(ClawPhase::Grab.blade_angle() < 0.0);
    }

    #[test]
    fn test_empty_case_completes_immediately() {
        let mut seq = ClawSequencer::new();
        let events = seq.start_cycle(2000, &[], 0.0, &mut SmallRng::seed_from_u64(0));
        assert_eq!(events, vec![SequencerEvent::CycleComplete { tier: DonationTier::GiantTriple }]);
        assert!(!seq.is_running());
    }
}
