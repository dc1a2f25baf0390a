//! Fourier seasonality terms

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A periodic component expressed as a truncated Fourier series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FourierTerm {
    pub name: &'static str,
    /// Period in days
    pub period_days: f64,
    pub order: usize,
}

impl FourierTerm {
    pub const DAILY: FourierTerm = FourierTerm {
        name: "daily",
        period_days: 1.0,
        order: 4,
    };

    pub const WEEKLY: FourierTerm = FourierTerm {
        name: "weekly",
        period_days: 7.0,
        order: 3,
    };

    pub const YEARLY: FourierTerm = FourierTerm {
        name: "yearly",
        period_days: 365.25,
        order: 10,
    };

    /// Number of design-matrix columns this term contributes
    pub fn width(&self) -> usize {
        2 * self.order
    }

    /// Append `sin`/`cos` features for a timestamp given in epoch seconds
    pub fn push_features(&self, epoch_secs: f64, out: &mut Vec<f64>) {
        let days = epoch_secs / SECONDS_PER_DAY;
        for i in 1..=self.order {
            let angle = 2.0 * PI * i as f64 * days / self.period_days;
            out.push(angle.sin());
            out.push(angle.cos());
        }
    }
}

/// Which seasonal components to fit. All disabled by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalityConfig {
    #[serde(default)]
    pub daily: bool,
    #[serde(default)]
    pub weekly: bool,
    #[serde(default)]
    pub yearly: bool,
}

impl SeasonalityConfig {
    /// Enabled terms in a fixed order
    pub fn terms(&self) -> Vec<FourierTerm> {
        let mut terms = Vec::new();
        if self.daily {
            terms.push(FourierTerm::DAILY);
        }
        if self.weekly {
            terms.push(FourierTerm::WEEKLY);
        }
        if self.yearly {
            terms.push(FourierTerm::YEARLY);
        }
        terms
    }

    pub fn is_enabled(&self) -> bool {
        self.daily || self.weekly || self.yearly
    }
}
