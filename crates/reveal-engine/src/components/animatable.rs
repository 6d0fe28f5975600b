//! Declared animation intent for a region: start state, end state and timing.

use serde::{Deserialize, Serialize};

use crate::api::error::{RevealError, Result};
use crate::api::types::{props, AnimHandle, ElementId, Property, PropertyMap};
use crate::extensions::easing::Easing;

/// How many times a tween runs past its first cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Repeat {
    #[default]
    None,
    /// Never completes on its own; only cancellation ends it.
    Forever,
    /// Extra cycles after the first.
    Count(u32),
}

/// Timing of one animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimationSpec {
    /// Duration of one cycle in milliseconds. Must be positive.
    pub duration_ms: f32,
    pub easing: Easing,
    /// Wait before the first frame, in milliseconds.
    pub delay_ms: f32,
    pub repeat: Repeat,
    /// On repeat, swap start and end instead of jumping back.
    pub yoyo: bool,
    /// Round interpolated values to this step (counters use 1).
    pub snap: Option<f32>,
}

impl Default for AnimationSpec {
    fn default() -> Self {
        Self {
            duration_ms: 800.0,
            easing: Easing::CubicOut,
            delay_ms: 0.0,
            repeat: Repeat::None,
            yoyo: false,
            snap: None,
        }
    }
}

impl AnimationSpec {
    pub fn new(duration_ms: f32, easing: Easing) -> Self {
        Self {
            duration_ms,
            easing,
            ..Default::default()
        }
    }

    // -- Builder methods --

    pub fn with_delay(mut self, delay_ms: f32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_yoyo(mut self, yoyo: bool) -> Self {
        self.yoyo = yoyo;
        self
    }

    pub fn with_snap(mut self, step: f32) -> Self {
        self.snap = Some(step);
        self
    }

    /// Reject timing that can never produce a sane frame.
    pub fn validate(&self) -> Result<()> {
        if !self.duration_ms.is_finite() || self.duration_ms <= 0.0 {
            return Err(RevealError::invalid_spec(format!(
                "duration must be positive, got {} ms",
                self.duration_ms
            )));
        }
        if !self.delay_ms.is_finite() || self.delay_ms < 0.0 {
            return Err(RevealError::invalid_spec(format!(
                "delay must be non-negative, got {} ms",
                self.delay_ms
            )));
        }
        if let Some(step) = self.snap {
            if !step.is_finite() || step <= 0.0 {
                return Err(RevealError::invalid_spec(format!("snap step must be positive, got {}", step)));
            }
        }
        Ok(())
    }
}

/// Start state, end state and timing, as declared by a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entrance {
    pub initial: PropertyMap,
    pub target: PropertyMap,
    #[serde(default)]
    pub spec: AnimationSpec,
}

impl Entrance {
    pub fn new(initial: PropertyMap, target: PropertyMap, spec: AnimationSpec) -> Self {
        Self { initial, target, spec }
    }

    /// Fade in while rising `distance` pixels into place.
    pub fn fade_rise(distance: f32, spec: AnimationSpec) -> Self {
        Self::new(
            props([(Property::Opacity, 0.0), (Property::TranslateY, distance)]),
            props([(Property::Opacity, 1.0), (Property::TranslateY, 0.0)]),
            spec,
        )
    }

    /// Fade in while sliding horizontally from `offset` pixels.
    pub fn fade_slide_x(offset: f32, spec: AnimationSpec) -> Self {
        Self::new(
            props([(Property::Opacity, 0.0), (Property::TranslateX, offset)]),
            props([(Property::Opacity, 1.0), (Property::TranslateX, 0.0)]),
            spec,
        )
    }

    /// Fade in while growing from zero scale.
    pub fn pop_in(spec: AnimationSpec) -> Self {
        Self::new(
            props([(Property::Opacity, 0.0), (Property::Scale, 0.0)]),
            props([(Property::Opacity, 1.0), (Property::Scale, 1.0)]),
            spec,
        )
    }

    /// Fade in while flipping down from `degrees` around the X axis.
    pub fn flip_x(degrees: f32, spec: AnimationSpec) -> Self {
        Self::new(
            props([(Property::Opacity, 0.0), (Property::RotateX, degrees)]),
            props([(Property::Opacity, 1.0), (Property::RotateX, 0.0)]),
            spec,
        )
    }

    pub fn with_spec(mut self, spec: AnimationSpec) -> Self {
        self.spec = spec;
        self
    }
}

impl Default for Entrance {
    fn default() -> Self {
        Self::fade_rise(50.0, AnimationSpec::default())
    }
}

/// A registered region together with its declared animation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatableElement {
    pub handle: AnimHandle,
    pub element: ElementId,
    pub initial: PropertyMap,
    pub target: PropertyMap,
    pub spec: AnimationSpec,
}

/// Both maps must declare the same keys, and at least one.
pub fn validate_states(initial: &PropertyMap, target: &PropertyMap) -> Result<()> {
    if initial.is_empty() {
        return Err(RevealError::invalid_spec("no properties declared"));
    }
    if let Some(missing) = initial.keys().find(|k| !target.contains_key(k)) {
        return Err(RevealError::invalid_spec(format!("{:?} has no target value", missing)));
    }
    if let Some(missing) = target.keys().find(|k| !initial.contains_key(k)) {
        return Err(RevealError::invalid_spec(format!("{:?} has no initial value", missing)));
    }
    if let Some((p, _)) = initial.iter().chain(target.iter()).find(|(_, v)| !v.is_finite()) {
        return Err(RevealError::invalid_spec(format!("{:?} is not a finite number", p)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_duration() {
        assert!(AnimationSpec::new(0.0, Easing::Linear).validate().is_err());
        assert!(AnimationSpec::new(-5.0, Easing::Linear).validate().is_err());
        assert!(AnimationSpec::new(1.0, Easing::Linear).validate().is_ok());
    }

    #[test]
    fn rejects_negative_delay() {
        let spec = AnimationSpec::default().with_delay(-1.0);
        assert!(spec.validate().unwrap_err().is_invalid_spec());
    }

    #[test]
    fn mismatched_keys_are_invalid() {
        let initial = props([(Property::Opacity, 0.0), (Property::TranslateY, 50.0)]);
        let target = props([(Property::Opacity, 1.0)]);
        assert!(validate_states(&initial, &target).is_err());
        assert!(validate_states(&target, &initial).is_err());
    }

    #[test]
    fn presets_are_balanced() {
        let spec = AnimationSpec::default();
        for entrance in [
            Entrance::fade_rise(50.0, spec),
            Entrance::fade_slide_x(-50.0, spec),
            Entrance::pop_in(spec),
            Entrance::flip_x(90.0, spec),
        ] {
            assert!(validate_states(&entrance.initial, &entrance.target).is_ok());
        }
    }

    #[test]
    fn spec_parses_with_defaults() {
        let spec: AnimationSpec =
            serde_json::from_str(r#"{ "durationMs": 600, "easing": "power3.out", "repeat": "forever" }"#).unwrap();
        assert_eq!(spec.duration_ms, 600.0);
        assert_eq!(spec.easing, Easing::QuartOut);
        assert_eq!(spec.repeat, Repeat::Forever);
        assert_eq!(spec.delay_ms, 0.0);
        assert!(!spec.yoyo);
    }
}
