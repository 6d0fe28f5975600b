use crate::api::error::{RevealError, Result};
use crate::api::types::{AnimHandle, PropertyMap, TweenId};
use crate::components::animatable::AnimatableElement;
use crate::core::surface::Surface;
use crate::extensions::tween::{Subject, TweenScheduler, TweenStatus};
use crate::systems::trigger::ReentryPolicy;

use super::{aggregate, Controller, EffectStatus, Env, MemberRun};

/// Reveals an ordered group of registered elements. Member `i` starts
/// `delay + i * interval` after the trigger fires.
///
/// A single-member group with zero interval is a plain reveal, which is how
/// fade-slide entrances and progress fills run.
#[derive(Debug)]
pub struct StaggerReveal {
    members: Vec<AnimHandle>,
    interval_ms: f32,
    runs: Vec<Option<MemberRun>>,
    cancelled: bool,
}

impl StaggerReveal {
    pub fn new(members: Vec<AnimHandle>, interval_ms: f32) -> Result<Self> {
        Self::validate(members.len(), interval_ms)?;
        let runs = vec![None; members.len()];
        Ok(Self {
            members,
            interval_ms,
            runs,
            cancelled: false,
        })
    }

    /// Check a group shape before anything is registered for it.
    pub fn validate(count: usize, interval_ms: f32) -> Result<()> {
        if count == 0 {
            return Err(RevealError::invalid_spec("stagger group is empty"));
        }
        if !interval_ms.is_finite() || interval_ms < 0.0 {
            return Err(RevealError::invalid_spec(format!(
                "stagger interval must be >= 0, got {}",
                interval_ms
            )));
        }
        Ok(())
    }

    pub fn single(handle: AnimHandle) -> Self {
        Self {
            members: vec![handle],
            interval_ms: 0.0,
            runs: vec![None],
            cancelled: false,
        }
    }

    pub fn members(&self) -> &[AnimHandle] {
        &self.members
    }

    /// Milliseconds from trigger to the start of member `index`.
    pub fn start_offset(&self, index: usize, delay_ms: f32) -> f32 {
        delay_ms + index as f32 * self.interval_ms
    }

    /// Last known tween status of member `index`.
    pub fn member_status(&self, index: usize) -> Option<TweenStatus> {
        self.runs.get(index).copied().flatten().map(|run| run.status)
    }

    /// Write every member's initial state.
    pub fn apply_initial(&self, env: &mut Env<'_>) {
        for handle in &self.members {
            if let Some(entry) = env.registry.get(*handle) {
                write_state(env.surface, entry, &entry.initial);
            }
        }
    }

    fn start_member(
        &mut self,
        index: usize,
        entry: &AnimatableElement,
        from: &PropertyMap,
        to_target: bool,
        delay_ms: f32,
        tweens: &mut TweenScheduler,
    ) -> Result<()> {
        let to = if to_target { &entry.target } else { &entry.initial };
        let spec = entry.spec.with_delay(delay_ms);
        let tween = tweens.start(Subject::between(entry.element, from, to), spec)?;
        self.runs[index] = Some(MemberRun::started(tween, to_target));
        Ok(())
    }

    /// Point a live run at the target (or back at the initial state).
    /// Returns false when the run is no longer live.
    fn steer(run: &MemberRun, to_target: bool, tweens: &mut TweenScheduler) -> bool {
        if run.heads_to_target == to_target {
            tweens.play_forward(run.tween)
        } else {
            tweens.reverse(run.tween)
        }
    }
}

fn write_state(surface: &mut dyn Surface, entry: &AnimatableElement, state: &PropertyMap) {
    for (&property, &value) in state {
        surface.set_value(entry.element, property, value);
    }
}

fn current_state(surface: &dyn Surface, entry: &AnimatableElement) -> PropertyMap {
    entry
        .initial
        .iter()
        .map(|(&property, &fallback)| (property, surface.value(entry.element, property).unwrap_or(fallback)))
        .collect()
}

impl Controller for StaggerReveal {
    fn status(&self) -> EffectStatus {
        if self.cancelled {
            return EffectStatus::Cancelled;
        }
        aggregate(self.runs.iter().flatten().map(|run| run.status))
    }

    fn handles(&self) -> &[AnimHandle] {
        &self.members
    }

    fn enter(&mut self, env: &mut Env<'_>, policy: ReentryPolicy) -> Result<()> {
        if self.cancelled {
            return Ok(());
        }
        let registry = env.registry;
        for index in 0..self.members.len() {
            let Some(entry) = registry.get(self.members[index]) else {
                continue;
            };
            let offset = self.start_offset(index, entry.spec.delay_ms);
            match policy {
                ReentryPolicy::ReplayEachEntry => {
                    write_state(env.surface, entry, &entry.initial);
                    self.start_member(index, entry, &entry.initial, true, offset, env.tweens)?;
                }
                ReentryPolicy::PlayAndReverseOnExit => {
                    let live = self.runs[index].filter(|run| Self::steer(run, true, env.tweens));
                    if live.is_none() {
                        let from = current_state(&*env.surface, entry);
                        self.start_member(index, entry, &from, true, offset, env.tweens)?;
                    }
                }
                ReentryPolicy::PlayOnce => {
                    self.start_member(index, entry, &entry.initial, true, offset, env.tweens)?;
                }
            }
        }
        Ok(())
    }

    fn exit(&mut self, env: &mut Env<'_>) -> Result<()> {
        if self.cancelled {
            return Ok(());
        }
        let registry = env.registry;
        for index in 0..self.members.len() {
            let Some(run) = self.runs[index] else {
                continue;
            };
            match env.tweens.status(run.tween) {
                Some(TweenStatus::Running) => {
                    Self::steer(&run, false, env.tweens);
                    continue;
                }
                Some(TweenStatus::Pending) => {
                    env.tweens.cancel(run.tween);
                    self.runs[index] = None;
                }
                _ => {}
            }
            let Some(entry) = registry.get(self.members[index]) else {
                continue;
            };
            let from = current_state(&*env.surface, entry);
            if from != entry.initial {
                self.start_member(index, entry, &from, false, 0.0, env.tweens)?;
            }
        }
        Ok(())
    }

    fn sync(&mut self, tweens: &TweenScheduler, finished: &[(TweenId, TweenStatus)]) {
        for run in self.runs.iter_mut().flatten() {
            run.sync(tweens, finished);
        }
    }

    fn cancel(&mut self, tweens: &mut TweenScheduler) {
        for run in self.runs.iter().flatten() {
            tweens.cancel(run.tween);
        }
        if self.status() != EffectStatus::Completed {
            self.cancelled = true;
        }
    }
}
