//! Stepped text effects: scrambled decode and typewriter.
//!
//! Both run on an `IntervalTimer` fed by frame deltas, so a slow frame
//! releases several steps at once (capped) instead of stretching the effect.

use serde::{Deserialize, Serialize};

use crate::api::error::{RevealError, Result};
use crate::api::types::ElementId;
use crate::core::surface::Surface;
use crate::core::time::IntervalTimer;
use crate::extensions::tween::TweenScheduler;
use crate::systems::trigger::ReentryPolicy;

use super::{Controller, EffectStatus, Env, Rng};

/// Timing of a decode reveal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecodeSpec {
    /// Milliseconds between steps.
    pub tick_ms: f32,
    /// Steps until the exact text is shown.
    pub ticks: u32,
    /// Steps each position stays scrambled after the one before it.
    pub ticks_per_char: u32,
}

impl Default for DecodeSpec {
    fn default() -> Self {
        Self {
            tick_ms: 80.0,
            ticks: 15,
            ticks_per_char: 3,
        }
    }
}

impl DecodeSpec {
    pub fn new(tick_ms: f32, ticks: u32) -> Self {
        Self {
            tick_ms,
            ticks,
            ..Self::default()
        }
    }

    pub fn with_ticks_per_char(mut self, ticks_per_char: u32) -> Self {
        self.ticks_per_char = ticks_per_char;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tick_ms.is_finite() || self.tick_ms <= 0.0 {
            return Err(RevealError::invalid_spec(format!(
                "decode tick must be > 0 ms, got {}",
                self.tick_ms
            )));
        }
        if self.ticks == 0 || self.ticks_per_char == 0 {
            return Err(RevealError::invalid_spec("decode needs at least one tick per run and per character"));
        }
        Ok(())
    }
}

/// Reveals text left to right out of random filler glyphs.
#[derive(Debug)]
pub struct DecodeText {
    element: ElementId,
    target: String,
    glyphs: Vec<char>,
    charset: Vec<char>,
    spec: DecodeSpec,
    rng: Rng,
    timer: Option<IntervalTimer>,
    max_catch_up: u32,
    iteration: u32,
    status: EffectStatus,
}

impl DecodeText {
    pub fn new(element: ElementId, target: &str, spec: DecodeSpec, charset: &str, seed: u64) -> Result<Self> {
        spec.validate()?;
        if target.is_empty() {
            return Err(RevealError::invalid_spec("decode target is empty"));
        }
        let charset: Vec<char> = charset.chars().collect();
        if charset.is_empty() {
            return Err(RevealError::invalid_spec("decode charset is empty"));
        }
        Ok(Self {
            element,
            target: target.to_string(),
            glyphs: target.chars().collect(),
            charset,
            spec,
            rng: Rng::new(seed),
            timer: None,
            max_catch_up: 10,
            iteration: 0,
            status: EffectStatus::Idle,
        })
    }

    pub fn with_max_catch_up(mut self, max_ticks: u32) -> Self {
        self.max_catch_up = max_ticks;
        self
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Begin a fresh run from iteration 0.
    pub fn restart(&mut self) {
        self.iteration = 0;
        self.timer = Some(IntervalTimer::new(self.spec.tick_ms).with_max_catch_up(self.max_catch_up));
        self.status = EffectStatus::Scheduled;
    }

    /// Write the next frame of the reveal.
    pub fn step(&mut self, surface: &mut dyn Surface) {
        if !self.status.is_active() {
            return;
        }
        self.status = EffectStatus::Running;
        // The frame shows the iteration it was built for; the count moves on after.
        let shown = self.iteration;
        self.iteration += 1;
        if self.iteration >= self.spec.ticks {
            surface.set_text(self.element, &self.target);
            self.timer = None;
            self.status = EffectStatus::Completed;
            return;
        }
        let revealed = |i: usize| (i as u32).saturating_mul(self.spec.ticks_per_char) < shown;
        let mut frame = String::with_capacity(self.target.len());
        for (i, &c) in self.glyphs.iter().enumerate() {
            if revealed(i) {
                frame.push(c);
            } else {
                frame.push(self.rng.pick(&self.charset).unwrap_or(c));
            }
        }
        surface.set_text(self.element, &frame);
    }
}

impl Controller for DecodeText {
    fn status(&self) -> EffectStatus {
        self.status
    }

    fn enter(&mut self, _env: &mut Env<'_>, policy: ReentryPolicy) -> Result<()> {
        match self.status {
            EffectStatus::Idle => self.restart(),
            EffectStatus::Completed if policy == ReentryPolicy::ReplayEachEntry => self.restart(),
            _ => {}
        }
        Ok(())
    }

    fn tick(&mut self, dt: f32, env: &mut Env<'_>) {
        let Some(timer) = self.timer.as_mut() else {
            return;
        };
        let steps = timer.accumulate(dt);
        for _ in 0..steps {
            self.step(env.surface);
            if !self.status.is_active() {
                break;
            }
        }
    }

    fn cancel(&mut self, _tweens: &mut TweenScheduler) {
        self.timer = None;
        if self.status != EffectStatus::Completed {
            self.status = EffectStatus::Cancelled;
        }
    }

    fn text_element(&self) -> Option<ElementId> {
        Some(self.element)
    }
}

/// Types lines out one character per step; lines are joined with `\n`.
#[derive(Debug)]
pub struct Typewriter {
    element: ElementId,
    script: Vec<char>,
    shown: usize,
    char_interval_ms: f32,
    timer: Option<IntervalTimer>,
    max_catch_up: u32,
    status: EffectStatus,
}

impl Typewriter {
    pub fn new<S: AsRef<str>>(element: ElementId, lines: &[S], char_interval_ms: f32) -> Result<Self> {
        if !char_interval_ms.is_finite() || char_interval_ms <= 0.0 {
            return Err(RevealError::invalid_spec(format!(
                "typewriter interval must be > 0 ms, got {}",
                char_interval_ms
            )));
        }
        let script = lines
            .iter()
            .map(|line| line.as_ref())
            .collect::<Vec<_>>()
            .join("\n")
            .chars()
            .collect();
        Ok(Self {
            element,
            script,
            shown: 0,
            char_interval_ms,
            timer: None,
            max_catch_up: 10,
            status: EffectStatus::Idle,
        })
    }

    pub fn with_max_catch_up(mut self, max_ticks: u32) -> Self {
        self.max_catch_up = max_ticks;
        self
    }

    /// Characters typed so far.
    pub fn shown(&self) -> usize {
        self.shown
    }

    pub fn restart(&mut self) {
        self.shown = 0;
        self.timer = Some(IntervalTimer::new(self.char_interval_ms).with_max_catch_up(self.max_catch_up));
        self.status = EffectStatus::Scheduled;
    }

    pub fn step(&mut self, surface: &mut dyn Surface) {
        if !self.status.is_active() {
            return;
        }
        self.status = EffectStatus::Running;
        self.shown = (self.shown + 1).min(self.script.len());
        let text: String = self.script[..self.shown].iter().collect();
        surface.set_text(self.element, &text);
        if self.shown == self.script.len() {
            self.timer = None;
            self.status = EffectStatus::Completed;
        }
    }
}

impl Controller for Typewriter {
    fn status(&self) -> EffectStatus {
        self.status
    }

    fn enter(&mut self, _env: &mut Env<'_>, policy: ReentryPolicy) -> Result<()> {
        match self.status {
            EffectStatus::Idle => self.restart(),
            EffectStatus::Completed if policy == ReentryPolicy::ReplayEachEntry => self.restart(),
            _ => {}
        }
        Ok(())
    }

    fn tick(&mut self, dt: f32, env: &mut Env<'_>) {
        let Some(timer) = self.timer.as_mut() else {
            return;
        };
        let steps = timer.accumulate(dt);
        for _ in 0..steps {
            self.step(env.surface);
            if !self.status.is_active() {
                break;
            }
        }
    }

    fn cancel(&mut self, _tweens: &mut TweenScheduler) {
        self.timer = None;
        if self.status != EffectStatus::Completed {
            self.status = EffectStatus::Cancelled;
        }
    }

    fn text_element(&self) -> Option<ElementId> {
        Some(self.element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::surface::ElementStore;
    use crate::systems::registry::Registry;

    const E: ElementId = ElementId(9);
    const CHARSET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

    fn run_frames(effect: &mut dyn Controller, store: &mut ElementStore, frames: usize, dt: f32) -> Vec<String> {
        let registry = Registry::new();
        let mut tweens = TweenScheduler::new();
        let mut texts = Vec::new();
        for _ in 0..frames {
            let mut env = Env { registry: &registry, tweens: &mut tweens, surface: &mut *store };
            effect.tick(dt, &mut env);
            texts.push(store.text(E).to_string());
        }
        texts
    }

    fn start(effect: &mut dyn Controller, store: &mut ElementStore) {
        let registry = Registry::new();
        let mut tweens = TweenScheduler::new();
        let mut env = Env { registry: &registry, tweens: &mut tweens, surface: store };
        effect.enter(&mut env, ReentryPolicy::PlayOnce).unwrap();
    }

    #[test]
    fn decode_settles_on_exact_text() {
        let mut store = ElementStore::with_elements([E]);
        let mut decode = DecodeText::new(E, "Qal", DecodeSpec::new(50.0, 15), CHARSET, 42).unwrap();
        start(&mut decode, &mut store);
        assert_eq!(decode.status(), EffectStatus::Scheduled);

        let texts = run_frames(&mut decode, &mut store, 15, 50.0);
        for text in &texts[..14] {
            assert_eq!(text.chars().count(), 3);
            assert!(text.chars().all(|c| CHARSET.contains(c)));
        }
        assert_eq!(texts[14], "Qal");
        assert_eq!(decode.status(), EffectStatus::Completed);
        assert!(!decode.has_timer());
    }

    #[test]
    fn decode_reveals_left_to_right() {
        let mut store = ElementStore::with_elements([E]);
        let mut decode = DecodeText::new(E, "Qal", DecodeSpec::new(50.0, 15), "#", 1).unwrap();
        start(&mut decode, &mut store);
        let texts = run_frames(&mut decode, &mut store, 8, 50.0);
        // Frame n shows position i exactly once i * 3 < n; the first is all filler
        assert_eq!(texts[0], "###");
        assert_eq!(texts[1], "Q##");
        assert_eq!(texts[3], "Q##");
        assert_eq!(texts[4], "Qa#");
        assert_eq!(texts[6], "Qa#");
        assert_eq!(texts[7], "Qal");
    }

    #[test]
    fn cancelled_decode_freezes() {
        let mut store = ElementStore::with_elements([E]);
        let mut decode = DecodeText::new(E, "Qal", DecodeSpec::new(50.0, 15), CHARSET, 7).unwrap();
        start(&mut decode, &mut store);
        run_frames(&mut decode, &mut store, 5, 50.0);
        let frozen = store.text(E).to_string();
        assert_eq!(decode.iteration(), 5);

        decode.cancel(&mut TweenScheduler::new());
        assert!(!decode.has_timer());
        let texts = run_frames(&mut decode, &mut store, 20, 50.0);
        assert!(texts.iter().all(|t| *t == frozen));
        assert_eq!(decode.status(), EffectStatus::Cancelled);
    }

    #[test]
    fn same_seed_same_frames() {
        let frames = |seed| {
            let mut store = ElementStore::with_elements([E]);
            let mut decode = DecodeText::new(E, "Hello", DecodeSpec::default(), CHARSET, seed).unwrap();
            start(&mut decode, &mut store);
            run_frames(&mut decode, &mut store, 20, 80.0)
        };
        assert_eq!(frames(3), frames(3));
    }

    #[test]
    fn slow_frame_releases_capped_steps() {
        let mut store = ElementStore::with_elements([E]);
        let mut decode = DecodeText::new(E, "Qal", DecodeSpec::new(50.0, 15), CHARSET, 1)
            .unwrap()
            .with_max_catch_up(4);
        start(&mut decode, &mut store);
        run_frames(&mut decode, &mut store, 1, 5000.0);
        assert_eq!(decode.iteration(), 4);
    }

    #[test]
    fn invalid_decode_inputs() {
        assert!(DecodeText::new(E, "", DecodeSpec::default(), CHARSET, 1).is_err());
        assert!(DecodeText::new(E, "x", DecodeSpec::default(), "", 1).is_err());
        assert!(DecodeText::new(E, "x", DecodeSpec::new(0.0, 15), CHARSET, 1).is_err());
    }

    #[test]
    fn typewriter_types_lines() {
        let mut store = ElementStore::with_elements([E]);
        let mut writer = Typewriter::new(E, &["ab", "c"], 50.0).unwrap();
        start(&mut writer, &mut store);
        let texts = run_frames(&mut writer, &mut store, 5, 50.0);
        assert_eq!(texts, vec!["a", "ab", "ab\n", "ab\nc", "ab\nc"]);
        assert_eq!(writer.status(), EffectStatus::Completed);
        assert_eq!(writer.shown(), 4);
    }

    #[test]
    fn typewriter_waits_for_its_interval() {
        let mut store = ElementStore::with_elements([E]);
        let mut writer = Typewriter::new(E, &["hello"], 100.0).unwrap();
        start(&mut writer, &mut store);
        run_frames(&mut writer, &mut store, 1, 60.0);
        assert_eq!(store.text(E), "");
        run_frames(&mut writer, &mut store, 1, 60.0);
        assert_eq!(store.text(E), "h");
    }
}
