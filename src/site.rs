//! Microsite orchestration.
//!
//! `Microsite` wires the donation flow to the claw machine and the outside
//! collaborators (host page, notices, sound, payment). It is the single place
//! where sequencer events are routed: a grab plays the click sound, a finished
//! cycle reveals the prediction and drops the machine's animating switch.

use rand::Rng;

use crate::config::SiteConfig;
use crate::effects::{Notifier, PaymentWidget, Sound, SoundPlayer};
use crate::error::DonationError;
use crate::flow::{DonationFlow, Prediction};
use crate::host::HostNotifier;
use crate::machine::ClawMachine;
use crate::machine::scene::Scene;
use crate::machine::sequencer::SequencerEvent;
use crate::tier::{DonationTier, resolve_tier};

pub struct Microsite<H, N, S, P, R> {
    flow: DonationFlow<H, N>,
    machine: ClawMachine,
    sound: S,
    payment: P,
    rng: R,
}

impl<H, N, S, P, R> Microsite<H, N, S, P, R>
where
    H: HostNotifier,
    N: Notifier,
    S: SoundPlayer,
    P: PaymentWidget,
    R: Rng,
{
    pub fn new(config: &SiteConfig, host: H, notices: N, sound: S, payment: P, mut rng: R) -> Self {
        let machine = ClawMachine::new(config.render_strategy, &mut rng);
        Self { flow: DonationFlow::new(host, notices, config.minimum_amount), machine, sound, payment, rng }
    }

    pub fn flow(&self) -> &DonationFlow<H, N> {
        &self.flow
    }

    pub fn flow_mut(&mut self) -> &mut DonationFlow<H, N> {
        &mut self.flow
    }

    pub fn machine(&self) -> &ClawMachine {
        &self.machine
    }

    pub fn sound(&self) -> &S {
        &self.sound
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        self.flow.prediction()
    }

    pub fn is_animating(&self) -> bool {
        self.flow.is_animating()
    }

    pub fn open_donation(&mut self) -> bool {
        self.flow.open_modal()
    }

    pub fn close_donation(&mut self) {
        self.flow.close_modal();
    }

    /// Validate and charge `raw`, then start the claw cycle for the confirmed amount.
    pub fn submit_donation(&mut self, raw: &str, now_ms: f64) -> Result<DonationTier, DonationError> {
        let amount = self.flow.submit(raw, &mut self.payment)?;
        Ok(self.start_paid_cycle(amount, now_ms))
    }

    /// Success callback from an external payment widget carrying the confirmed
    /// amount. Ignored while a cycle is already running.
    pub fn report_payment_success(&mut self, amount: u32, now_ms: f64) -> Option<DonationTier> {
        if self.flow.is_animating() {
            crate::log::warn(&format!("payment of {amount} confirmed during a running cycle; ignored"));
            return None;
        }
        self.flow.payment_succeeded(amount);
        Some(self.start_paid_cycle(amount, now_ms))
    }

    fn start_paid_cycle(&mut self, amount: u32, now_ms: f64) -> DonationTier {
        self.sound.play(Sound::PaymentSuccess);
        crate::log::info(&format!("starting claw cycle for {amount}"));
        let events = self.machine.start_cycle(amount, now_ms, &mut self.rng);
        self.route(events);
        resolve_tier(amount)
    }

    /// Failure callback from an external payment widget.
    pub fn report_payment_failure(&mut self, reason: &str) {
        let err = if reason.trim().is_empty() {
            DonationError::PaymentUnavailable
        } else {
            DonationError::PaymentFailed { reason: reason.to_string() }
        };
        self.flow.payment_failed(&err);
    }

    pub fn tick(&mut self, now_ms: f64) {
        let events = self.machine.tick(now_ms);
        self.route(events);
    }

    fn route(&mut self, events: Vec<SequencerEvent>) {
        for event in events {
            match event {
                SequencerEvent::BallGrabbed(_) => self.sound.play(Sound::Grab),
                SequencerEvent::CycleComplete { tier } => {
                    self.flow.complete_cycle(tier, &mut self.rng);
                    self.machine.set_animating(false, 0.0, &mut self.rng);
                }
                SequencerEvent::PhaseEntered(_) | SequencerEvent::ReturnedToRest => {}
            }
        }
    }

    /// Cancel a running cycle. The claw snaps back to rest and no prediction is shown.
    pub fn abort(&mut self, now_ms: f64) -> bool {
        if !self.machine.is_animating() && !self.flow.is_animating() {
            return false;
        }
        crate::log::warn("claw cycle aborted");
        self.machine.set_animating(false, now_ms, &mut self.rng);
        self.flow.abort();
        true
    }

    pub fn dismiss_prediction(&mut self) -> bool {
        self.flow.dismiss_prediction()
    }

    pub fn send_prediction_email(&mut self, email: Option<&str>) -> bool {
        self.flow.send_prediction_email(email)
    }

    pub fn prediction_saved(&mut self, saved: bool) {
        self.flow.prediction_saved(saved);
    }

    pub fn share_unsupported(&mut self) {
        self.flow.share_unsupported();
    }

    pub fn forward_scroll(&mut self, delta_y: f64) {
        self.flow.forward_scroll(delta_y);
    }

    pub fn report_height(&mut self, height: u32) {
        self.flow.report_height(height);
    }

    pub fn scene(&self) -> Scene {
        self.machine.scene()
    }
}
