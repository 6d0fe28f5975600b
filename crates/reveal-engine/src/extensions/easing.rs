// extensions/easing.rs
//
// Pure easing functions for tween interpolation.
// No dependencies on the registry or scheduler, just math.

use std::f32::consts::{FRAC_PI_2, PI};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Easing curve mapping normalized progress to eased progress.
///
/// Serialized by name (`"cubic.out"`, `"sine.inOut"`, `"back.out"`). Parsing
/// also accepts the `powerN` family used by page authors: `power1` is quad,
/// `power2` cubic, `power3` quart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Easing {
    /// Constant velocity (no easing).
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    /// Default entrance feel: fast start, gentle settle.
    #[default]
    CubicOut,
    CubicInOut,
    QuartIn,
    QuartOut,
    QuartInOut,
    SineIn,
    SineOut,
    /// Smooth both ends; used for ambient floating.
    SineInOut,
    ExpoIn,
    ExpoOut,
    ExpoInOut,
    /// Overshoot then settle.
    BackIn,
    /// Spring-like pop past the target before settling.
    BackOut,
    BackInOut,
    BounceOut,
    ElasticOut,
}

const BACK_C1: f32 = 1.70158;
const BACK_C2: f32 = BACK_C1 * 1.525;

impl Easing {
    /// Map normalized progress `t` in [0, 1] through the curve. Back and
    /// elastic curves leave [0, 1] on the way.
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadIn => t.powi(2),
            Easing::CubicIn => t.powi(3),
            Easing::QuartIn => t.powi(4),
            Easing::SineIn => sine_in(t),
            Easing::ExpoIn => expo_in(t),
            Easing::BackIn => back_in(t),

            Easing::QuadOut => out(t, |u| u.powi(2)),
            Easing::CubicOut => out(t, |u| u.powi(3)),
            Easing::QuartOut => out(t, |u| u.powi(4)),
            Easing::SineOut => out(t, sine_in),
            Easing::ExpoOut => out(t, expo_in),
            Easing::BackOut => out(t, back_in),
            Easing::BounceOut => bounce_out(t),

            Easing::QuadInOut => in_out(t, |u| u.powi(2)),
            Easing::CubicInOut => in_out(t, |u| u.powi(3)),
            Easing::QuartInOut => in_out(t, |u| u.powi(4)),
            Easing::SineInOut => in_out(t, sine_in),
            Easing::ExpoInOut => in_out(t, expo_in),
            Easing::BackInOut => {
                // Stronger overshoot than mirroring back.in would give.
                let u = 2.0 * t;
                if t < 0.5 {
                    u * u * ((BACK_C2 + 1.0) * u - BACK_C2) / 2.0
                } else {
                    let v = u - 2.0;
                    (v * v * ((BACK_C2 + 1.0) * v + BACK_C2) + 2.0) / 2.0
                }
            }

            Easing::ElasticOut => {
                const PERIOD: f32 = 2.0 * PI / 3.0;
                if t <= 0.0 || t >= 1.0 {
                    t
                } else {
                    2.0_f32.powf(-10.0 * t) * ((10.0 * t - 0.75) * PERIOD).sin() + 1.0
                }
            }
        }
    }

    /// Canonical name, the inverse of [`Easing::from_str`].
    pub fn name(self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::QuadIn => "quad.in",
            Easing::QuadOut => "quad.out",
            Easing::QuadInOut => "quad.inOut",
            Easing::CubicIn => "cubic.in",
            Easing::CubicOut => "cubic.out",
            Easing::CubicInOut => "cubic.inOut",
            Easing::QuartIn => "quart.in",
            Easing::QuartOut => "quart.out",
            Easing::QuartInOut => "quart.inOut",
            Easing::SineIn => "sine.in",
            Easing::SineOut => "sine.out",
            Easing::SineInOut => "sine.inOut",
            Easing::ExpoIn => "expo.in",
            Easing::ExpoOut => "expo.out",
            Easing::ExpoInOut => "expo.inOut",
            Easing::BackIn => "back.in",
            Easing::BackOut => "back.out",
            Easing::BackInOut => "back.inOut",
            Easing::BounceOut => "bounce.out",
            Easing::ElasticOut => "elastic.out",
        }
    }
}

impl FromStr for Easing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "back.out(1.7)" carries a strength parameter; the curve constant is fixed.
        let base = s.split('(').next().unwrap_or(s).trim();
        let (family, mode) = match base.split_once('.') {
            Some((family, mode)) => (family, mode),
            None => (base, "out"),
        };
        let family = match family {
            "linear" | "none" | "power0" => return Ok(Easing::Linear),
            "power1" => "quad",
            "power2" => "cubic",
            "power3" => "quart",
            other => other,
        };
        let easing = match (family, mode) {
            ("quad", "in") => Easing::QuadIn,
            ("quad", "out") => Easing::QuadOut,
            ("quad", "inOut") => Easing::QuadInOut,
            ("cubic", "in") => Easing::CubicIn,
            ("cubic", "out") => Easing::CubicOut,
            ("cubic", "inOut") => Easing::CubicInOut,
            ("quart", "in") => Easing::QuartIn,
            ("quart", "out") => Easing::QuartOut,
            ("quart", "inOut") => Easing::QuartInOut,
            ("sine", "in") => Easing::SineIn,
            ("sine", "out") => Easing::SineOut,
            ("sine", "inOut") => Easing::SineInOut,
            ("expo", "in") => Easing::ExpoIn,
            ("expo", "out") => Easing::ExpoOut,
            ("expo", "inOut") => Easing::ExpoInOut,
            ("back", "in") => Easing::BackIn,
            ("back", "out") => Easing::BackOut,
            ("back", "inOut") => Easing::BackInOut,
            ("bounce", "out") => Easing::BounceOut,
            ("elastic", "out") => Easing::ElasticOut,
            _ => return Err(format!("unknown easing curve `{s}`")),
        };
        Ok(easing)
    }
}

impl TryFrom<String> for Easing {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Easing> for String {
    fn from(value: Easing) -> Self {
        value.name().to_string()
    }
}

/// Ease-out form of an ease-in curve.
#[inline]
fn out(t: f32, curve: impl Fn(f32) -> f32) -> f32 {
    1.0 - curve(1.0 - t)
}

/// Ease-in for the first half, mirrored ease-out for the second.
#[inline]
fn in_out(t: f32, curve: impl Fn(f32) -> f32) -> f32 {
    if t < 0.5 {
        curve(2.0 * t) / 2.0
    } else {
        1.0 - curve(2.0 - 2.0 * t) / 2.0
    }
}

#[inline]
fn sine_in(t: f32) -> f32 {
    1.0 - (t * FRAC_PI_2).cos()
}

#[inline]
fn expo_in(t: f32) -> f32 {
    if t <= 0.0 {
        0.0
    } else {
        2.0_f32.powf(10.0 * t - 10.0)
    }
}

#[inline]
fn back_in(t: f32) -> f32 {
    (BACK_C1 + 1.0) * t.powi(3) - BACK_C1 * t.powi(2)
}

#[inline]
fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;

    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

// ── Interpolation helpers ────────────────────────────────────────────────

/// Linearly interpolate between two values.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Interpolate with easing.
#[inline]
pub fn ease(a: f32, b: f32, t: f32, easing: Easing) -> f32 {
    lerp(a, b, easing.apply(t))
}

/// Round `value` to a multiple of `step`, kept inside the `[from, to]` span.
/// Overshooting curves therefore never display past the target.
#[inline]
pub fn snap_within(value: f32, from: f32, to: f32, step: f32) -> f32 {
    let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
    let clamped = value.clamp(lo, hi);
    if step <= 0.0 {
        return clamped;
    }
    ((clamped / step).round() * step).clamp(lo, hi)
}
