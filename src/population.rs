//! Prize population: the balls resting at the bottom of the display case.
//!
//! Balls are laid out on an 8-column grid, jittered, then clamped onto the
//! floor line of the case. Later rows sit a little higher so the pile looks
//! stacked. Sizes skew larger for bigger donation tiers. The population is
//! regenerated only when the tier changes (see `machine::ClawMachine`).

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::tier::{BallSize, DonationTier};

// --- Layout ------------------------------------------------------------------

pub const GRID_COLS: u32 = 8;
pub const GRID_ROWS: u32 = 4;
/// Horizontal share of the case covered by the grid (percent).
const GRID_WIDTH: f64 = 80.0;
/// Vertical share of the case covered by the grid (percent).
const GRID_HEIGHT: f64 = 40.0;
const GRID_LEFT: f64 = 10.0;
/// Total jitter span; offsets are centred, so ±4% / ±2%.
const JITTER_X: f64 = 8.0;
const JITTER_Y: f64 = 4.0;
/// Fraction of a cell height each row is lifted by (overlap between rows).
const STACK_OVERLAP: f64 = 0.35;
/// Nominal resting line for the first row.
const REST_LINE: f64 = 96.5;

pub const BALL_X_MIN: f64 = 5.0;
pub const BALL_X_MAX: f64 = 95.0;
pub const BALL_Y_MIN: f64 = 93.0;
pub const BALL_Y_MAX: f64 = 97.0;

/// Probability band for medium balls, taken right after the large band.

// --- Visuals -----------------------------------------------------------------

pub const BALL_PALETTE: [&str; 5] = [
    "#FF1493", // deep pink
    "#20B2AA", // light sea green
    "#9932CC", // dark orchid
    "#00CED1", // dark turquoise
    "#DC143C", // crimson
];

const SMALL_BALL_IMAGES: [&str; 3] = ["balls/small-1.png", "balls/small-2.png", "balls/small-3.png"];
const MEDIUM_BALL_IMAGES: [&str; 3] = ["balls/medium-1.png", "balls/medium-2.png", "balls/medium-3.png"];
const LARGE_BALL_IMAGES: [&str; 3] = ["balls/large-1.png", "balls/large-2.png", "balls/large-3.png"];

/// How balls (and the ball held by the claw) are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStrategy {
    /// Procedural gradient circles coloured from `BALL_PALETTE`.
    #[default]
    Vector,
    /// Bitmap sprites picked from a per-size asset list.
    Image,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BallStyle {
    Color(&'static str),
    /// Asset path relative to the configured asset base.
    Image(&'static str),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrizeBall {
    pub id: u32,
    /// Percent of the display case width.
    pub x: f64,
    /// Percent of the display case height.
    pub y: f64,
    pub size: BallSize,
    pub style: BallStyle,
    /// Decorative rotation in degrees.
    pub rotation: f64,
}

pub fn ball_count(tier: DonationTier) -> usize {
    match tier {
        DonationTier::GiantTriple => 35,
        _ => 30,
    }
}

/// Chance of a single ball being large for the tier.
fn large_probability(tier: DonationTier) -> f64 {
    match tier {
        DonationTier::Giant | DonationTier::GiantTriple => 0.3,
        DonationTier::Gold => 0.2,
        DonationTier::Normal => 0.1,
    }
}

/// Chance of a non-large ball being medium. Drawn with a second, independent roll.
fn medium_probability(tier: DonationTier) -> f64 {
    match tier {
        DonationTier::Giant | DonationTier::GiantTriple => 0.6,
        DonationTier::Gold => 0.5,
        DonationTier::Normal => 0.4,
    }
}

fn sample_size<R: Rng + ?Sized>(tier: DonationTier, rng: &mut R) -> BallSize {
    if rng.random::<f64>() < large_probability(tier) {
        BallSize::Large
    } else if rng.random::<f64>() < medium_probability(tier) {
        BallSize::Medium
    } else {
        BallSize::Small
    }
}

fn images_for(size: BallSize) -> &'static [&'static str] {
    match size {
        BallSize::Small => &SMALL_BALL_IMAGES,
        BallSize::Medium => &MEDIUM_BALL_IMAGES,
        BallSize::Large => &LARGE_BALL_IMAGES,
    }
}

fn sample_style<R: Rng + ?Sized>(strategy: RenderStrategy, size: BallSize, rng: &mut R) -> BallStyle {
    match strategy {
        RenderStrategy::Vector => BallStyle::Color(BALL_PALETTE.choose(rng).copied().unwrap_or(BALL_PALETTE[0])),
        RenderStrategy::Image => {
            let list = images_for(size);
            BallStyle::Image(list.choose(rng).copied().unwrap_or(list[0]))
        }
    }
}

/// Build a fresh population for `tier`. Shape (count, grid, size bands) is fixed;
/// exact positions, sizes and styles come from `rng`.
pub fn generate_population<R: Rng + ?Sized>(
    tier: DonationTier,
    strategy: RenderStrategy,
    rng: &mut R,
) -> Vec<PrizeBall> {
    let cell_w = GRID_WIDTH / GRID_COLS as f64;
    let cell_h = GRID_HEIGHT / GRID_ROWS as f64;
    let count = ball_count(tier);
    let mut balls = Vec::with_capacity(count);
    for i in 0..count as u32 {
        let size = sample_size(tier, rng);
        let col = i % GRID_COLS;
        let row = i / GRID_COLS;
        let jitter_x = (rng.random::<f64>() - 0.5) * JITTER_X;
        let jitter_y = (rng.random::<f64>() - 0.5) * JITTER_Y;
        let x = GRID_LEFT + col as f64 * cell_w + jitter_x;
        let y = REST_LINE - row as f64 * cell_h * STACK_OVERLAP + jitter_y;
        let style = sample_style(strategy, size, rng);
        let rotation = rng.random::<f64>() * 360.0;
        balls.push(PrizeBall {
            id: i,
            x: x.clamp(BALL_X_MIN, BALL_X_MAX),
            y: y.clamp(BALL_Y_MIN, BALL_Y_MAX),
            size,
            style,
            rotation,
        });
    }
    balls
}

/// Pick the ball the claw will go after: a random ball of the preferred size, or
/// any ball when none of that size is present.
pub fn choose_target<'a, R: Rng + ?Sized>(
    population: &'a [PrizeBall],
    preferred: BallSize,
    rng: &mut R,
) -> Option<&'a PrizeBall> {
    let matching: Vec<&PrizeBall> = population.iter().filter(|b| b.size == preferred).collect();
    if matching.is_empty() {
        population.choose(rng)
    } else {
        matching.choose(rng).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn size_counts(tier: DonationTier, rounds: u64) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for seed in 0..rounds {
            let mut rng = SmallRng::seed_from_u64(seed);
            for b in generate_population(tier, RenderStrategy::Vector, &mut rng) {
                match b.size {
                    BallSize::Large => counts.0 += 1,
                    BallSize::Medium => counts.1 += 1,
                    BallSize::Small => counts.2 += 1,
                }
            }
        }
        counts
    }

    #[test]
    fn test_population_counts() {
        let mut rng = SmallRng::seed_from_u64(7);
        for tier in DonationTier::ALL {
            let balls = generate_population(tier, RenderStrategy::Vector, &mut rng);
            let expected = if tier == DonationTier::GiantTriple { 35 } else { 30 };
            assert_eq!(balls.len(), expected, "tier {tier}");
        }
    }

    #[test]
    fn test_positions_within_bounds_and_ids_unique() {
        let mut rng = SmallRng::seed_from_u64(42);
        let balls = generate_population(DonationTier::GiantTriple, RenderStrategy::Image, &mut rng);
        for (i, b) in balls.iter().enumerate() {
            assert_eq!(b.id, i as u32);
            assert!((BALL_X_MIN..=BALL_X_MAX).contains(&b.x), "x out of bounds: {}", b.x);
            assert!((BALL_Y_MIN..=BALL_Y_MAX).contains(&b.y), "y out of bounds: {}", b.y);
            assert!((0.0..360.0).contains(&b.rotation));
        }
    }

    #[test]
    fn test_same_seed_same_population() {
        let a = generate_population(DonationTier::Gold, RenderStrategy::Vector, &mut SmallRng::seed_from_u64(3));
        let b = generate_population(DonationTier::Gold, RenderStrategy::Vector, &mut SmallRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_size_distribution_normal_tier() {
        let (large, medium, small) = size_counts(DonationTier::Normal, 400);
        let total = (large + medium + small) as f64;
        assert!((large as f64 / total - 0.1).abs() < 0.02);
        assert!((medium as f64 / total - 0.36).abs() < 0.03);
        assert!((small as f64 / total - 0.54).abs() < 0.03);
    }

    #[test]
    fn test_size_distribution_giant_tier() {
        let (large, medium, small) = size_counts(DonationTier::Giant, 400);
        let total = (large + medium + small) as f64;
        assert!((large as f64 / total - 0.3).abs() < 0.03);
        assert!((medium as f64 / total - 0.42).abs() < 0.03);
        assert!((small as f64 / total - 0.28).abs() < 0.03);
    }

    #[test]
    fn test_size_distribution_gold_tier() {
        let (large, medium, small) = size_counts(DonationTier::Gold, 400);
        let total = (large + medium + small) as f64;
        assert!((large as f64 / total - 0.2).abs() < 0.03);
        assert!((medium as f64 / total - 0.4).abs() < 0.03);
        assert!((small as f64 / total - 0.4).abs() < 0.03);
    }

    #[test]
    fn test_styles_follow_strategy() {
        let mut rng = SmallRng::seed_from_u64(11);
        for b in generate_population(DonationTier::Normal, RenderStrategy::Vector, &mut rng) {
            match b.style {
                BallStyle::Color(c) => assert!(BALL_PALETTE.contains(&c)),
                BallStyle::Image(_) => panic!("vector strategy produced an image ball"),
            }
        }
        for b in generate_population(DonationTier::Normal, RenderStrategy::Image, &mut rng) {
            match b.style {
                BallStyle::Image(path) => assert!(images_for(b.size).contains(&path)),
                BallStyle::Color(_) => panic!("image strategy produced a colour ball"),
            }
        }
    }

    #[test]
    fn test_choose_target_prefers_size_then_falls_back() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut balls = generate_population(DonationTier::Normal, RenderStrategy::Vector, &mut rng);
        for b in balls.iter_mut() {
            b.size = BallSize::Small;
        }
        balls[4].size = BallSize::Large;
        for _ in 0..20 {
            let t = choose_target(&balls, BallSize::Large, &mut rng).unwrap();
            assert_eq!(t.id, 4);
        }
        // No medium balls at all: any ball is acceptable.
        assert!(choose_target(&balls, BallSize::Medium, &mut rng).is_some());
        assert!(choose_target(&[], BallSize::Small, &mut rng).is_none());
    }
}
