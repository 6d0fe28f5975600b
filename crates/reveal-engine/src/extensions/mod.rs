// extensions/mod.rs
//
// Interpolation building blocks: easing curves and the tween scheduler.
// Decoupled from the registry and triggers; effect controllers opt in.

pub mod easing;
pub mod tween;

pub use easing::{ease, lerp, snap_within, Easing};
pub use tween::{Subject, Tween, TweenScheduler, TweenStatus};
