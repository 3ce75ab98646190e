//! Donation tiers.
//!
//! A donation amount maps onto one of four claw tiers. The tier controls how the
//! display case is populated, which ball size the claw goes after, and how large
//! and how many claws are drawn. Thresholds are inclusive lower bounds.

use serde::{Deserialize, Serialize};

/// Lower bound (inclusive) of the gold tier.
pub const GOLD_THRESHOLD: u32 = 200;
/// Lower bound (inclusive) of the giant tier.
pub const GIANT_THRESHOLD: u32 = 500;
/// Lower bound (inclusive) of the three-claw tier.
pub const GIANT_TRIPLE_THRESHOLD: u32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DonationTier {
    Normal,
    Gold,
    Giant,
    GiantTriple,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BallSize {
    Small,
    Medium,
    Large,
}

pub fn resolve_tier(amount: u32) -> DonationTier {
    if amount >= GIANT_TRIPLE_THRESHOLD {
        DonationTier::GiantTriple
    } else if amount >= GIANT_THRESHOLD {
        DonationTier::Giant
    } else if amount >= GOLD_THRESHOLD {
        DonationTier::Gold
    } else {
        DonationTier::Normal
    }
}

/// Ball size the claw prefers to grab for a given donation.
pub fn target_ball_size(amount: u32) -> BallSize {
    resolve_tier(amount).target_ball_size()
}

impl DonationTier {
    pub const ALL: [DonationTier; 4] = [
        DonationTier::Normal,
        DonationTier::Gold,
        DonationTier::Giant,
        DonationTier::GiantTriple,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DonationTier::Normal => "normal",
            DonationTier::Gold => "gold",
            DonationTier::Giant => "giant",
            DonationTier::GiantTriple => "giant-triple",
        }
    }

    pub fn target_ball_size(self) -> BallSize {
        match self {
            DonationTier::Normal => BallSize::Small,
            DonationTier::Gold => BallSize::Medium,
            DonationTier::Giant | DonationTier::GiantTriple => BallSize::Large,
        }
    }

    /// Number of claw assemblies drawn for this tier.
    pub fn claw_count(self) -> usize {
        match self {
            DonationTier::GiantTriple => 3,
            _ => 1,
        }
    }

    /// Edge length of the claw sprite in canvas pixels.
    pub fn claw_size_px(self) -> f64 {
        match self {
            DonationTier::Normal => 80.0,
            DonationTier::Gold => 96.0,
            DonationTier::Giant => 112.0,
            DonationTier::GiantTriple => 128.0,
        }
    }

    pub fn claw_color(self) -> &'static str {
        match self {
            DonationTier::Normal => "hsl(330, 70%, 63%)",
            DonationTier::Gold => "hsl(64, 73%, 48%)",
            DonationTier::Giant | DonationTier::GiantTriple => "hsl(12, 100%, 50%)",
        }
    }

    /// Glow colour and blur radius used behind the claw sprite.
    pub fn claw_glow(self) -> (&'static str, f64) {
        match self {
            DonationTier::Normal => ("hsla(330, 70%, 63%, 0.35)", 8.0),
            DonationTier::Gold => ("hsla(64, 73%, 48%, 0.6)", 12.0),
            DonationTier::Giant | DonationTier::GiantTriple => ("hsla(12, 100%, 50%, 0.7)", 16.0),
        }
    }

    /// Human readable line shown in the donation modal tier list.
    pub fn label(self) -> &'static str {
        match self {
            DonationTier::Normal => "до 200 ₽ — обычная клешня",
            DonationTier::Gold => "200–500 ₽ — золотая клешня",
            DonationTier::Giant => "500–1000 ₽ — гигантская клешня",
            DonationTier::GiantTriple => "от 1000 ₽ — 3 гигантских клешни",
        }
    }
}

impl std::fmt::Display for DonationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BallSize {
    /// Rendered diameter of a ball resting in the display case.
    pub fn diameter_px(self) -> f64 {
        match self {
            BallSize::Small => 45.0,
            BallSize::Medium => 65.0,
            BallSize::Large => 90.0,
        }
    }

    /// Radius of the ball when held between the claw blades (claw sprite units, 0..100).
    pub fn held_radius(self) -> f64 {
        match self {
            BallSize::Small => 9.0,
            BallSize::Medium => 12.0,
            BallSize::Large => 15.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BallSize::Small => "small",
            BallSize::Medium => "medium",
            BallSize::Large => "large",
        }
    }
}
