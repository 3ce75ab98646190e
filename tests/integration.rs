// Integration tests (native) for the `claw-wish` crate.
// These drive the public API end to end with in-memory collaborators, so they
// run under `cargo test` on the host without a browser.

use claw_wish::config::SiteConfig;
use claw_wish::effects::{NoticeKind, Notifier, SimulatedPayment, Sound, SoundPlayer};
use claw_wish::error::DonationError;
use claw_wish::host::{HostMessage, HostNotifier};
use claw_wish::machine::sequencer::{CYCLE_DURATION_MS, ClawPhase, FLOOR_LINE, grip_point};
use claw_wish::population::{BALL_X_MAX, BALL_X_MIN, BALL_Y_MAX, BALL_Y_MIN, RenderStrategy, generate_population};
use claw_wish::site::Microsite;
use claw_wish::tier::{BallSize, DonationTier, resolve_tier, target_ball_size};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::SmallRng;

#[derive(Default)]
struct Host(Vec<HostMessage>);

impl HostNotifier for Host {
    fn post(&mut self, message: HostMessage) {
        self.0.push(message);
    }
}

#[derive(Default)]
struct Notices(Vec<(NoticeKind, String)>);

impl Notifier for Notices {
    fn notify(&mut self, kind: NoticeKind, text: &str) {
        self.0.push((kind, text.to_string()));
    }
}

#[derive(Default)]
struct Sounds(Vec<Sound>);

impl SoundPlayer for Sounds {
    fn play(&mut self, sound: Sound) {
        self.0.push(sound);
    }
}

type Site = Microsite<Host, Notices, Sounds, SimulatedPayment, SmallRng>;

fn site(seed: u64) -> Site {
    Microsite::new(
        &SiteConfig::default(),
        Host::default(),
        Notices::default(),
        Sounds::default(),
        SimulatedPayment,
        SmallRng::seed_from_u64(seed),
    )
}

/// Tick in 16ms frames until `end`, collecting the phase seen on each frame.
fn run_frames(s: &mut Site, start: f64, end: f64) -> Vec<ClawPhase> {
    let mut phases = Vec::new();
    let mut now = start;
    while now <= end {
        s.tick(now);
        let phase = s.machine().sequencer().phase();
        if phases.last() != Some(&phase) {
            phases.push(phase);
        }
        let grabbed = s.machine().sequencer().grabbed_ball().is_some();
        assert_eq!(grabbed, matches!(phase, ClawPhase::Grab | ClawPhase::Ascend), "grabbed ball in {phase:?}");
        let pos = s.machine().sequencer().position();
        assert!(grip_point(pos) <= FLOOR_LINE, "grip point below floor in {phase:?}");
        now += 16.0;
    }
    phases
}

#[test]
fn normal_donation_reveals_catalog_prediction() {
    let mut s = site(150);
    assert_eq!(resolve_tier(150), DonationTier::Normal);
    assert_eq!(target_ball_size(150), BallSize::Small);

    s.open_donation();
    assert_eq!(s.submit_donation("150", 0.0), Ok(DonationTier::Normal));
    let target = s.machine().sequencer().target().cloned().unwrap();
    assert_eq!(target.size, BallSize::Small);

    let phases = run_frames(&mut s, 0.0, CYCLE_DURATION_MS as f64 + 100.0);
    assert_eq!(
        phases,
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

    let prediction = s.prediction().unwrap();
    assert_eq!(prediction.tier, DonationTier::Normal);
    assert!(claw_wish::PREDICTIONS.contains(&prediction.text.as_str()));
    assert_eq!(serde_json::to_value(prediction).unwrap()["tier"], "normal");
    assert_eq!(s.sound().0, vec![Sound::PaymentSuccess, Sound::Grab]);
    assert_eq!(s.flow().host().0, vec![HostMessage::ScrollToMachine, HostMessage::OverlayOpen]);
}

#[test]
fn triple_donation_renders_three_claws() {
    let mut s = site(1000);
    assert_eq!(s.submit_donation("1000", 0.0), Ok(DonationTier::GiantTriple));
    assert_eq!(s.machine().population().len(), 35);
    s.tick(4_000.0);
    let scene = s.scene();
    let center = s.machine().sequencer().position().x;
    let offsets: Vec<f64> = scene.claws.iter().map(|c| c.x - center).collect();
    assert_eq!(offsets.len(), 3);
    for (got, want) in offsets.iter().zip([-15.0, 0.0, 15.0]) {
        assert!((got - want).abs() < 1e-9, "claw offset {got} != {want}");
    }
    assert!(scene.claws.iter().all(|c| c.size_px == DonationTier::GiantTriple.claw_size_px()));
}

#[test]
fn below_minimum_changes_nothing() {
    let mut s = site(50);
    s.open_donation();
    let before = s.machine().population().to_vec();
    let err = s.submit_donation("50", 0.0).unwrap_err();
    assert_eq!(err, DonationError::BelowMinimum { amount: 50, minimum: 100 });
    assert_eq!(s.flow().notices().0.len(), 1);
    assert_eq!(s.flow().notices().0[0].0, NoticeKind::Error);
    assert!(!s.is_animating());
    assert!(s.flow().is_modal_open());
    assert_eq!(s.machine().tier(), DonationTier::Normal);
    assert_eq!(s.machine().population(), &before[..]);
    assert_eq!(s.machine().sequencer().phase(), ClawPhase::Idle);
    assert!(s.flow().host().0.is_empty());
    assert!(s.sound().0.is_empty());
}

#[test]
fn abort_in_every_phase_returns_to_idle() {
    for stop_at in [100.0, 1_500.0, 3_000.0, 4_300.0, 4_800.0, 5_200.0, 5_700.0, 6_200.0] {
        let mut s = site(7);
        s.submit_donation("600", 0.0).unwrap();
        s.tick(stop_at);
        assert!(s.abort(stop_at), "abort at {stop_at}");
        assert_eq!(s.machine().sequencer().phase(), ClawPhase::Idle);
        assert!(s.machine().sequencer().grabbed_ball().is_none());
        s.tick(stop_at + 20_000.0);
        assert_eq!(s.machine().sequencer().phase(), ClawPhase::Idle);
        assert!(s.prediction().is_none());
    }
}

#[test]
fn second_cycle_after_dismissal() {
    let mut s = site(9);
    s.submit_donation("250", 0.0).unwrap();
    s.tick(CYCLE_DURATION_MS as f64);
    assert_eq!(s.prediction().map(|p| p.tier), Some(DonationTier::Gold));
    s.forward_scroll(25.0);
    assert!(s.dismiss_prediction());

    assert!(s.open_donation());
    let start = 10_000.0;
    assert_eq!(s.submit_donation("700", start), Ok(DonationTier::Giant));
    s.tick(start + CYCLE_DURATION_MS as f64);
    assert_eq!(s.prediction().map(|p| p.tier), Some(DonationTier::Giant));
    assert_eq!(
        s.flow().host().0,
        vec![
            HostMessage::ScrollToMachine,
            HostMessage::OverlayOpen,
            HostMessage::ScrollDelta { delta_y: 25.0 },
            HostMessage::OverlayClose,
            HostMessage::ScrollToMachine,
            HostMessage::OverlayOpen,
        ]
    );
}

#[test]
fn late_tick_fires_whole_cycle() {
    let mut s = site(11);
    s.submit_donation("300", 0.0).unwrap();
    // Background tab: the next frame arrives long after the cycle should have ended.
    s.tick(60_000.0);
    assert!(s.prediction().is_some());
    assert_eq!(s.sound().0, vec![Sound::PaymentSuccess, Sound::Grab]);
}

#[test]
fn external_widget_success_runs_full_cycle() {
    let mut s = site(21);
    s.open_donation();
    s.report_payment_failure("card declined");
    assert!(!s.is_animating());
    assert!(s.flow().is_modal_open());

    assert_eq!(s.report_payment_success(1200, 500.0), Some(DonationTier::GiantTriple));
    assert!(!s.flow().is_modal_open());
    assert_eq!(s.machine().population().len(), 35);
    assert_eq!(s.flow().notices().0.last().map(|n| n.0), Some(NoticeKind::Success));

    s.tick(500.0 + CYCLE_DURATION_MS as f64);
    assert_eq!(s.prediction().map(|p| p.tier), Some(DonationTier::GiantTriple));
    assert_eq!(s.sound().0, vec![Sound::PaymentSuccess, Sound::Grab]);
    assert_eq!(s.flow().host().0, vec![HostMessage::ScrollToMachine, HostMessage::OverlayOpen]);
}

#[test]
fn decimal_amount_starts_cycle() {
    let mut s = site(22);
    s.open_donation();
    assert_eq!(s.submit_donation("250.5", 0.0), Ok(DonationTier::Gold));
    assert_eq!(s.flow().donation_amount(), 250);
}

#[test]
fn current_tier_export_names() {
    assert_eq!(claw_wish::current_tier(0), "normal");
    assert_eq!(claw_wish::current_tier(200), "gold");
    assert_eq!(claw_wish::current_tier(999), "giant");
    assert_eq!(claw_wish::current_tier(1000), "giant-triple");
}

proptest! {
    #[test]
    fn tier_is_monotonic(a in 0u32..5_000, b in 0u32..5_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(resolve_tier(lo) <= resolve_tier(hi));
    }

    #[test]
    fn tier_boundaries_are_exact(t in prop::sample::select(vec![200u32, 500, 1000])) {
        prop_assert!(resolve_tier(t - 1) < resolve_tier(t));
        prop_assert_eq!(resolve_tier(t), resolve_tier(t + 1));
    }

    #[test]
    fn population_stays_in_bounds(seed in any::<u64>(), amount in 0u32..3_000) {
        let tier = resolve_tier(amount);
        let balls = generate_population(tier, RenderStrategy::Vector, &mut SmallRng::seed_from_u64(seed));
        let expected = if tier == DonationTier::GiantTriple { 35 } else { 30 };
        prop_assert_eq!(balls.len(), expected);
        for ball in &balls {
            prop_assert!((BALL_X_MIN..=BALL_X_MAX).contains(&ball.x));
            prop_assert!((BALL_Y_MIN..=BALL_Y_MAX).contains(&ball.y));
        }
    }
}
