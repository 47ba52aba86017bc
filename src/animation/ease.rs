#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Ease {
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    /// Overshoots past 1 before settling (back-out, `c1 = 1.70158`).
    OutBack,
    /// Decaying sine oscillation around 1.
    OutElastic,
    /// Critically damped approach; `k` sets how much of the curve is spent near the target.
    CriticallyDamped { k: f64 },
}

impl Ease {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
            Self::OutBack => {
                const C1: f64 = 1.70158;
                const C3: f64 = C1 + 1.0;
                1.0 + C3 * (t - 1.0).powi(3) + C1 * (t - 1.0).powi(2)
            }
            Self::OutElastic => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                let c4 = (2.0 * std::f64::consts::PI) / 3.0;
                2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
            }
            Self::CriticallyDamped { k } => critically_damped(t, k),
        }
    }
}

/// `1 - (1 + k t) e^{-k t}`, rescaled so the curve ends exactly at 1.
///
/// Monotonic non-decreasing on `[0, 1]` for any `k > 0`; non-positive `k` degrades to linear.
fn critically_damped(t: f64, k: f64) -> f64 {
    if !(k.is_finite() && k > 0.0) {
        return t;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let raw = |x: f64| 1.0 - (1.0 + k * x) * (-k * x).exp();
    raw(t) / raw(1.0)
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
