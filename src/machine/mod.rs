//! The claw machine component.
//!
//! Owns the current tier, the prize population and the animation sequencer.
//! Its inputs mirror what the page feeds it: a donation amount and an
//! "animating" switch. Raising the switch starts a cycle; dropping it at any
//! point is a hard reset.

pub mod paint;
pub mod scene;
pub mod sequencer;

use rand::Rng;

use crate::population::{PrizeBall, RenderStrategy, generate_population};
use crate::tier::{DonationTier, resolve_tier};
use scene::{Scene, SceneInput};
use sequencer::{ClawSequencer, SequencerEvent};

pub struct ClawMachine {
    strategy: RenderStrategy,
    donation_amount: u32,
    tier: DonationTier,
    population: Vec<PrizeBall>,
    sequencer: ClawSequencer,
    animating: bool,
}

impl ClawMachine {
    pub fn new<R: Rng + ?Sized>(strategy: RenderStrategy, rng: &mut R) -> Self {
        let tier = resolve_tier(0);
        Self {
            strategy,
            donation_amount: 0,
            tier,
            population: generate_population(tier, strategy, rng),
            sequencer: ClawSequencer::new(),
            animating: false,
        }
    }

    pub fn tier(&self) -> DonationTier {
        self.tier
    }

    pub fn donation_amount(&self) -> u32 {
        self.donation_amount
    }

    pub fn population(&self) -> &[PrizeBall] {
        &self.population
    }

    pub fn sequencer(&self) -> &ClawSequencer {
        &self.sequencer
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    /// Update the donation amount. The population is rebuilt only when the tier
    /// changes; returns true when that happened.
    pub fn set_donation_amount<R: Rng + ?Sized>(&mut self, amount: u32, rng: &mut R) -> bool {
        self.donation_amount = amount;
        let tier = resolve_tier(amount);
        if tier == self.tier {
            return false;
        }
        self.tier = tier;
        self.population = generate_population(tier, self.strategy, rng);
        true
    }

    /// Raise or drop the animating switch. Raising an already raised switch does
    /// nothing; dropping it cancels whatever is scheduled.
    pub fn set_animating<R: Rng + ?Sized>(&mut self, animating: bool, now_ms: f64, rng: &mut R) -> Vec<SequencerEvent> {
        if !animating {
            self.animating = false;
            self.sequencer.reset();
            return Vec::new();
        }
        if self.animating {
            return Vec::new();
        }
        self.animating = true;
        self.sequencer.start_cycle(self.donation_amount, &self.population, now_ms, rng)
    }

    /// Set the amount and (re)start a cycle, cancelling any cycle in flight.
    pub fn start_cycle<R: Rng + ?Sized>(&mut self, amount: u32, now_ms: f64, rng: &mut R) -> Vec<SequencerEvent> {
        self.set_donation_amount(amount, rng);
        self.animating = false;
        self.set_animating(true, now_ms, rng)
    }

    pub fn tick(&mut self, now_ms: f64) -> Vec<SequencerEvent> {
        self.sequencer.tick(now_ms)
    }

    pub fn scene(&self) -> Scene {
        let state = self.sequencer.state();
        scene::compose(&SceneInput {
            phase: state.phase,
            claw_position: state.position,
            target: self.sequencer.target(),
            grabbed_ball: state.grabbed_ball.as_ref(),
            tier: self.tier,
            population: &self.population,
            active: self.animating,
        })
    }
}
