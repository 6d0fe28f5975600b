use serde::{Deserialize, Serialize};

use crate::api::error::{RevealError, Result};
use crate::api::types::{AnimHandle, ElementId, TweenId};
use crate::extensions::tween::{Subject, TweenScheduler, TweenStatus};
use crate::systems::trigger::ReentryPolicy;

use super::{aggregate, Controller, EffectStatus, Env, MemberRun};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarqueeDirection {
    #[default]
    Left,
    Right,
}

/// A marquee strip: `copies` identical copies of the content laid side by side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarqueeTrack {
    pub element: ElementId,
    /// Width of one copy in px.
    pub copy_width: f32,
    pub copies: u32,
    /// Width of the visible window in px.
    pub visible_width: f32,
}

impl MarqueeTrack {
    pub fn new(element: ElementId, copy_width: f32, copies: u32, visible_width: f32) -> Self {
        Self {
            element,
            copy_width,
            copies,
            visible_width,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.copy_width * self.copies as f32
    }

    /// The strip must be able to shift by one copy without exposing a gap.
    pub fn validate(&self) -> Result<()> {
        if !self.copy_width.is_finite() || self.copy_width <= 0.0 {
            return Err(RevealError::invalid_spec(format!(
                "marquee copy width must be > 0, got {}",
                self.copy_width
            )));
        }
        if self.copies < 2 {
            return Err(RevealError::invalid_spec("marquee needs at least two copies"));
        }
        if self.content_width() < 2.0 * self.visible_width {
            return Err(RevealError::invalid_spec(format!(
                "marquee content {}px is narrower than twice the window {}px",
                self.content_width(),
                self.visible_width
            )));
        }
        Ok(())
    }

    /// TranslateX at the start and end of one cycle.
    pub fn endpoints(&self, direction: MarqueeDirection) -> (f32, f32) {
        match direction {
            MarqueeDirection::Left => (0.0, -self.copy_width),
            MarqueeDirection::Right => (-self.copy_width, 0.0),
        }
    }

    /// Milliseconds to travel one copy width.
    pub fn cycle_ms(&self, speed_px_per_s: f32) -> Result<f32> {
        if !speed_px_per_s.is_finite() || speed_px_per_s <= 0.0 {
            return Err(RevealError::invalid_spec(format!(
                "marquee speed must be > 0, got {}",
                speed_px_per_s
            )));
        }
        Ok(self.copy_width / speed_px_per_s * 1000.0)
    }

    /// TranslateX after travelling `distance` px from the start.
    pub fn offset_at(&self, distance: f32, direction: MarqueeDirection) -> f32 {
        let d = distance.rem_euclid(self.copy_width);
        match direction {
            MarqueeDirection::Left => -d,
            MarqueeDirection::Right => -self.copy_width + d,
        }
    }
}

/// Endless motion started once and stopped only by cancellation.
///
/// Drives the registered initial → target tween with whatever repeat the
/// registration carries: a yoyo sine for floating elements, a linear wrap
/// for marquees.
#[derive(Debug)]
pub struct LoopMotion {
    handle: AnimHandle,
    run: Option<MemberRun>,
    cancelled: bool,
}

impl LoopMotion {
    pub fn new(handle: AnimHandle) -> Self {
        Self {
            handle,
            run: None,
            cancelled: false,
        }
    }

    pub fn handle(&self) -> AnimHandle {
        self.handle
    }
}

impl Controller for LoopMotion {
    fn status(&self) -> EffectStatus {
        if self.cancelled {
            return EffectStatus::Cancelled;
        }
        aggregate(self.run.iter().map(|run| run.status))
    }

    fn enter(&mut self, env: &mut Env<'_>, _policy: ReentryPolicy) -> Result<()> {
        if self.cancelled || self.status().is_active() {
            return Ok(());
        }
        let Some(entry) = env.registry.get(self.handle) else {
            return Ok(());
        };
        let subjects = Subject::between(entry.element, &entry.initial, &entry.target);
        let tween = env.tweens.start(subjects, entry.spec)?;
        self.run = Some(MemberRun::started(tween, true));
        Ok(())
    }

    fn handles(&self) -> &[AnimHandle] {
        std::slice::from_ref(&self.handle)
    }

    fn sync(&mut self, tweens: &TweenScheduler, finished: &[(TweenId, TweenStatus)]) {
        if let Some(run) = self.run.as_mut() {
            run.sync(tweens, finished);
        }
    }

    fn cancel(&mut self, tweens: &mut TweenScheduler) {
        if let Some(run) = self.run {
            tweens.cancel(run.tween);
        }
        if self.status() != EffectStatus::Completed {
            self.cancelled = true;
        }
    }
}
