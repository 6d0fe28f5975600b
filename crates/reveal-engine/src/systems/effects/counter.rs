use crate::api::error::{RevealError, Result};
use crate::api::types::{AnimHandle, ElementId, Property, TweenId};
use crate::core::surface::Surface;
use crate::extensions::tween::{TweenScheduler, TweenStatus};
use crate::systems::trigger::ReentryPolicy;

use super::{Controller, EffectStatus, Env, StaggerReveal};

/// Largest target an f32 count lands on exactly.
pub const MAX_EXACT_COUNT: u32 = 1 << 24;

/// Counts an element's text from 0 up to `target`.
///
/// The number itself is a snapped `Count` tween; this controller only turns
/// the current value into text after tweens advance each frame.
#[derive(Debug)]
pub struct Counter {
    reveal: StaggerReveal,
    element: ElementId,
    target: u32,
    prefix: String,
    suffix: String,
}

impl Counter {
    /// `handle` must be registered with `Count` going from 0 to `target`.
    pub fn new(handle: AnimHandle, element: ElementId, target: u32) -> Self {
        Self {
            reveal: StaggerReveal::single(handle),
            element,
            target,
            prefix: String::new(),
            suffix: String::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn validate_target(target: u32) -> Result<()> {
        if target > MAX_EXACT_COUNT {
            return Err(RevealError::invalid_spec(format!(
                "count target {} is above {}, past which it cannot be shown exactly",
                target, MAX_EXACT_COUNT
            )));
        }
        Ok(())
    }

    pub fn format(&self, value: f32) -> String {
        let shown = value.round().clamp(0.0, self.target as f32) as u32;
        format!("{}{}{}", self.prefix, shown, self.suffix)
    }

    pub fn render(&self, surface: &mut dyn Surface) {
        let value = surface.value(self.element, Property::Count).unwrap_or(0.0);
        surface.set_text(self.element, &self.format(value));
    }
}

impl Controller for Counter {
    fn status(&self) -> EffectStatus {
        self.reveal.status()
    }

    fn enter(&mut self, env: &mut Env<'_>, policy: ReentryPolicy) -> Result<()> {
        self.reveal.enter(env, policy)?;
        if !self.reveal.status().is_active() {
            return Ok(());
        }
        self.render(env.surface);
        Ok(())
    }

    fn exit(&mut self, env: &mut Env<'_>) -> Result<()> {
        self.reveal.exit(env)
    }

    fn tick(&mut self, _dt: f32, env: &mut Env<'_>) {
        if self.reveal.status() == EffectStatus::Cancelled {
            return;
        }
        self.render(env.surface);
    }

    fn sync(&mut self, tweens: &TweenScheduler, finished: &[(TweenId, TweenStatus)]) {
        self.reveal.sync(tweens, finished);
    }

    fn cancel(&mut self, tweens: &mut TweenScheduler) {
        self.reveal.cancel(tweens);
    }

    fn text_element(&self) -> Option<ElementId> {
        Some(self.element)
    }

    fn handles(&self) -> &[AnimHandle] {
        self.reveal.members()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::props;
    use crate::components::animatable::AnimationSpec;
    use crate::core::surface::ElementStore;
    use crate::extensions::easing::Easing;
    use crate::systems::registry::Registry;

    const E: ElementId = ElementId(3);

    #[test]
    fn counts_up_with_suffix() {
        let mut registry = Registry::new();
        let handle = registry
            .register(
                E,
                props([(Property::Count, 0.0)]),
                props([(Property::Count, 5.0)]),
                AnimationSpec::new(2000.0, Easing::QuadOut).with_snap(1.0),
            )
            .unwrap();
        let mut tweens = TweenScheduler::new();
        let mut store = ElementStore::with_elements([E]);
        let mut counter = Counter::new(handle, E, 5).with_suffix("+");

        let mut env = Env { registry: &registry, tweens: &mut tweens, surface: &mut store };
        counter.enter(&mut env, ReentryPolicy::PlayOnce).unwrap();
        assert_eq!(store.text(E), "0+");

        let mut seen = Vec::new();
        for _ in 0..50 {
            tweens.tick(50.0, &mut store);
            let finished = tweens.drain_finished();
            counter.sync(&tweens, &finished);
            let mut env = Env { registry: &registry, tweens: &mut tweens, surface: &mut store };
            counter.tick(50.0, &mut env);
            seen.push(store.text(E).to_string());
        }

        let values: Vec<u32> = seen.iter().map(|t| t.trim_end_matches('+').parse().unwrap()).collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        // Exactly the target at the 2000 ms mark
        assert_eq!(seen[39], "5+");
        assert!(values.iter().all(|&v| v <= 5));
        assert_eq!(seen.last().map(String::as_str), Some("5+"));
        assert_eq!(counter.status(), EffectStatus::Completed);
    }

    #[test]
    fn format_clamps_and_rounds() {
        let counter = Counter::new(AnimHandle(0), E, 10).with_prefix("$");
        assert_eq!(counter.format(3.6), "$4");
        assert_eq!(counter.format(12.0), "$10");
        assert_eq!(counter.format(-1.0), "$0");
    }

    #[test]
    fn targets_past_exact_floats_are_rejected() {
        assert!(Counter::validate_target(MAX_EXACT_COUNT).is_ok());
        assert!(Counter::validate_target(MAX_EXACT_COUNT + 1).unwrap_err().is_invalid_spec());
    }
}
