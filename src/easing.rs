use std::f32::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

/// Easing curves applied to a normalized progress value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    #[default]
    CubicOut,
    CubicInOut,
    QuartIn,
    QuartOut,
    QuartInOut,
    SineIn,
    SineOut,
    SineInOut,
    ExpoOut,
    BackOut,
    BounceOut,
}

impl Easing {
    /// Maps `t` (clamped into `[0, 1]`) through the curve.
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadIn => t * t,
            Easing::QuadOut => t * (2.0 - t),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => {
                let t = t - 1.0;
                t * t * t + 1.0
            }
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let t = 2.0 * t - 2.0;
                    1.0 + t * t * t / 2.0
                }
            }
            Easing::QuartIn => t * t * t * t,
            Easing::QuartOut => {
                let t = t - 1.0;
                1.0 - t * t * t * t
            }
            Easing::QuartInOut => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    let t = t - 1.0;
                    1.0 - 8.0 * t * t * t * t
                }
            }
            Easing::SineIn => 1.0 - (t * FRAC_PI_2).cos(),
            Easing::SineOut => (t * FRAC_PI_2).sin(),
            Easing::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
            Easing::ExpoOut => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2.0_f32.powf(-10.0 * t)
                }
            }
            Easing::BackOut => {
                let c = 1.70158;
                let t = t - 1.0;
                (c + 1.0) * t * t * t + c * t * t + 1.0
            }
            Easing::BounceOut => bounce_out(t),
        }
    }

    /// Parses the kebab-case names used in viewer configuration files.
    pub fn from_name(name: &str) -> Option<Self> {
        use Easing::*;
        let easing = match name.trim().to_ascii_lowercase().as_str() {
            "linear" => Linear,
            "quad-in" | "ease-in-quad" => QuadIn,
            "quad-out" | "ease-out-quad" => QuadOut,
            "quad-in-out" | "ease-in-out-quad" => QuadInOut,
            "cubic-in" | "ease-in-cubic" => CubicIn,
            "cubic-out" | "ease-out-cubic" => CubicOut,
            "cubic-in-out" | "ease-in-out-cubic" => CubicInOut,
            "quart-in" | "ease-in-quart" => QuartIn,
            "quart-out" | "ease-out-quart" => QuartOut,
            "quart-in-out" | "ease-in-out-quart" => QuartInOut,
            "sine-in" | "ease-in-sine" => SineIn,
            "sine-out" | "ease-out-sine" => SineOut,
            "sine-in-out" | "ease-in-out-sine" => SineInOut,
            "expo-out" | "ease-out-expo" => ExpoOut,
            "back-out" | "ease-out-back" => BackOut,
            "bounce-out" | "ease-out-bounce" => BounceOut,
            _ => return None,
        };
        Some(easing)
    }
}

fn bounce_out(t: f32) -> f32 {
    const N: f32 = 7.5625;
    const D: f32 = 2.75;
    if t < 1.0 / D {
        N * t * t
    } else if t < 2.0 / D {
        let t = t - 1.5 / D;
        N * t * t + 0.75
    } else if t < 2.5 / D {
        let t = t - 2.25 / D;
        N * t * t + 0.9375
    } else {
        let t = t - 2.625 / D;
        N * t * t + 0.984375
    }
}
