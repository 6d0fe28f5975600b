use serde::{Deserialize, Serialize};

use crate::api::error::{RevealError, Result};
use crate::components::animatable::{AnimationSpec, Entrance, Repeat};
use crate::extensions::easing::Easing;
use crate::systems::effects::DecodeSpec;
use crate::systems::trigger::{ReentryPolicy, Threshold};

/// Engine configuration, provided by the page or loaded from JSON.
/// Every field has a default, so a partial JSON object is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Threshold for triggers that do not name one (default: top at 80%).
    pub default_threshold: Threshold,
    /// Policy for triggers that do not name one.
    pub default_policy: ReentryPolicy,
    /// Entrance for marked regions that do not declare their own.
    pub entrance: Entrance,
    /// Class that marks a region for automatic entrance animation.
    pub section_marker: String,
    /// Decode timing used by pages that do not pass their own.
    pub decode: DecodeSpec,
    /// Filler glyphs for decode effects.
    pub decode_charset: String,
    /// Milliseconds per typed character.
    pub typewriter_tick_ms: f32,
    /// Vertical travel of a floating element in px.
    pub float_amplitude: f32,
    /// One half-cycle of the float loop.
    pub float_spec: AnimationSpec,
    /// Pointer offset in px per degree of tilt.
    pub tilt_divisor: f32,
    pub tilt_follow: AnimationSpec,
    pub tilt_reset: AnimationSpec,
    /// Seed for filler glyph generation.
    pub rng_seed: u64,
    /// Most interval ticks a single frame may release.
    pub max_catch_up_ticks: u32,
    /// Capacity of the host write buffer, in property writes per frame.
    pub max_writes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_threshold: Threshold::default(),
            default_policy: ReentryPolicy::PlayAndReverseOnExit,
            entrance: Entrance::default(),
            section_marker: "animate-section".to_string(),
            decode: DecodeSpec::default(),
            decode_charset: "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*".to_string(),
            typewriter_tick_ms: 50.0,
            float_amplitude: 10.0,
            float_spec: AnimationSpec::new(2000.0, Easing::SineInOut)
                .with_repeat(Repeat::Forever)
                .with_yoyo(true),
            tilt_divisor: 10.0,
            tilt_follow: AnimationSpec::new(300.0, Easing::CubicOut),
            tilt_reset: AnimationSpec::new(500.0, Easing::CubicOut),
            rng_seed: 42,
            max_catch_up_ticks: 10,
            max_writes: 1024,
        }
    }
}

impl EngineConfig {
    /// Parse a config from a JSON string. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.default_threshold.validate()?;
        self.entrance.spec.validate()?;
        self.decode.validate()?;
        self.float_spec.validate()?;
        self.tilt_follow.validate()?;
        self.tilt_reset.validate()?;
        if self.decode_charset.is_empty() {
            return Err(RevealError::invalid_spec("decode charset is empty"));
        }
        if !self.typewriter_tick_ms.is_finite() || self.typewriter_tick_ms <= 0.0 {
            return Err(RevealError::invalid_spec("typewriter tick must be > 0 ms"));
        }
        if !self.tilt_divisor.is_finite() || self.tilt_divisor <= 0.0 {
            return Err(RevealError::invalid_spec("tilt divisor must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::Property;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.default_threshold, Threshold::TopAt(0.8));
        assert_eq!(config.entrance.spec.duration_ms, 800.0);
        assert_eq!(config.entrance.initial[&Property::TranslateY], 50.0);
        assert_eq!(config.decode.ticks, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(
            r#"{ "defaultPolicy": "replayEachEntry", "defaultThreshold": { "ratio": 0.5 }, "rngSeed": 7 }"#,
        )
        .unwrap();
        assert_eq!(config.default_policy, ReentryPolicy::ReplayEachEntry);
        assert_eq!(config.default_threshold, Threshold::Ratio(0.5));
        assert_eq!(config.rng_seed, 7);
        assert_eq!(config.section_marker, "animate-section");
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(EngineConfig::from_json("{ not json"), Err(RevealError::Json(_))));
        let err = EngineConfig::from_json(r#"{ "decodeCharset": "" }"#).unwrap_err();
        assert!(err.is_invalid_spec());
        let err = EngineConfig::from_json(r#"{ "defaultThreshold": { "ratio": 2.0 } }"#).unwrap_err();
        assert!(err.is_invalid_spec());
    }
}
