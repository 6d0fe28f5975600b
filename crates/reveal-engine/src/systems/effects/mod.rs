//! Effect controllers built on the tween scheduler: staggered reveals,
//! counters, continuous loops and stepped text.
//!
//! This module provides the `EffectsState` facade that owns every controller
//! of one context, plus the individual controllers.

mod counter;
mod looping;
mod rng;
mod stagger;
mod text;

pub use counter::Counter;
pub use looping::{LoopMotion, MarqueeDirection, MarqueeTrack};
pub use rng::Rng;
pub use stagger::StaggerReveal;
pub use text::{DecodeSpec, DecodeText, Typewriter};

use std::collections::BTreeMap;

use crate::api::error::Result;
use crate::api::types::{AnimHandle, EffectId, ElementId, TweenId};
use crate::core::surface::Surface;
use crate::extensions::tween::{TweenScheduler, TweenStatus};
use crate::systems::registry::Registry;
use crate::systems::trigger::ReentryPolicy;

/// Lifecycle shared by all controllers. Completed and Cancelled are terminal
/// for a run; re-entry under a replaying policy starts a fresh run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectStatus {
    /// Declared, waiting for its trigger.
    Idle,
    /// Started; waiting for its first frame or its delay.
    Scheduled,
    Running,
    Completed,
    Cancelled,
}

impl EffectStatus {
    pub fn is_active(self) -> bool {
        matches!(self, EffectStatus::Scheduled | EffectStatus::Running)
    }
}

/// What a controller may touch while reacting.
pub struct Env<'a> {
    pub registry: &'a Registry,
    pub tweens: &'a mut TweenScheduler,
    pub surface: &'a mut dyn Surface,
}

/// A self-contained animation behaviour driven by trigger events and frames.
pub trait Controller: std::fmt::Debug {
    fn status(&self) -> EffectStatus;

    /// Trigger fired, or an immediate start.
    fn enter(&mut self, env: &mut Env<'_>, policy: ReentryPolicy) -> Result<()>;

    /// The observed element left view under `PlayAndReverseOnExit`.
    fn exit(&mut self, _env: &mut Env<'_>) -> Result<()> {
        Ok(())
    }

    /// Per-frame work after tweens advanced.
    fn tick(&mut self, _dt: f32, _env: &mut Env<'_>) {}

    /// Fold in tween outcomes since the last sync.
    fn sync(&mut self, _tweens: &TweenScheduler, _finished: &[(TweenId, TweenStatus)]) {}

    /// Stop for good: no further tweens, ticks or writes.
    fn cancel(&mut self, tweens: &mut TweenScheduler);

    /// Element whose text content this controller writes, if any.
    fn text_element(&self) -> Option<ElementId> {
        None
    }

    /// Registrations this controller animates.
    fn handles(&self) -> &[AnimHandle] {
        &[]
    }
}

/// Tween started for one member, with its last known status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MemberRun {
    pub tween: TweenId,
    pub status: TweenStatus,
    /// Whether the tween's forward direction heads to the target state.
    pub heads_to_target: bool,
}

impl MemberRun {
    pub fn started(tween: TweenId, heads_to_target: bool) -> Self {
        Self {
            tween,
            status: TweenStatus::Pending,
            heads_to_target,
        }
    }

    pub fn sync(&mut self, tweens: &TweenScheduler, finished: &[(TweenId, TweenStatus)]) {
        if let Some(status) = tweens.status(self.tween) {
            self.status = status;
        } else if let Some(&(_, status)) = finished.iter().find(|(id, _)| *id == self.tween) {
            self.status = status;
        }
    }
}

/// Fold member statuses into one controller status.
pub(crate) fn aggregate(statuses: impl Iterator<Item = TweenStatus>) -> EffectStatus {
    let mut any = false;
    let mut running = false;
    let mut pending = false;
    let mut all_cancelled = true;
    for status in statuses {
        any = true;
        match status {
            TweenStatus::Running => running = true,
            TweenStatus::Pending => pending = true,
            TweenStatus::Completed | TweenStatus::Cancelled => {}
        }
        if status != TweenStatus::Cancelled {
            all_cancelled = false;
        }
    }
    if !any {
        EffectStatus::Idle
    } else if running {
        EffectStatus::Running
    } else if pending {
        EffectStatus::Scheduled
    } else if all_cancelled {
        EffectStatus::Cancelled
    } else {
        EffectStatus::Completed
    }
}

/// Container for all controllers of one context.
#[derive(Debug)]
pub struct EffectsState {
    controllers: BTreeMap<EffectId, Box<dyn Controller>>,
    next_id: u32,
    pub rng: Rng,
}

impl EffectsState {
    /// Create a new EffectsState with the given RNG seed.
    pub fn new(seed: u64) -> Self {
        Self {
            controllers: BTreeMap::new(),
            next_id: 0,
            rng: Rng::new(seed.wrapping_add(7919)),
        }
    }

    /// Add a controller. A controller that writes text takes the element over
    /// from any other active text writer.
    pub fn insert(&mut self, controller: Box<dyn Controller>, tweens: &mut TweenScheduler) -> EffectId {
        if let Some(element) = controller.text_element() {
            let superseded = self.cancel_text_on(element, tweens);
            if superseded > 0 {
                log::debug!("text of {:?} taken over; {} writer(s) cancelled", element, superseded);
            }
        }
        let id = EffectId(self.next_id);
        self.next_id += 1;
        self.controllers.insert(id, controller);
        id
    }

    pub fn get(&self, id: EffectId) -> Option<&dyn Controller> {
        self.controllers.get(&id).map(|c| c.as_ref())
    }

    pub fn get_mut(&mut self, id: EffectId) -> Option<&mut Box<dyn Controller>> {
        self.controllers.get_mut(&id)
    }

    pub fn status(&self, id: EffectId) -> Option<EffectStatus> {
        self.controllers.get(&id).map(|c| c.status())
    }

    /// Ids of the controllers matching `pred`, in insertion order.
    pub fn find(&self, mut pred: impl FnMut(&dyn Controller) -> bool) -> Vec<EffectId> {
        self.controllers
            .iter()
            .filter(|(_, c)| pred(c.as_ref()))
            .map(|(&id, _)| id)
            .collect()
    }

    /// Cancel a controller and drop it. Its id is unknown afterwards.
    pub fn remove(&mut self, id: EffectId, tweens: &mut TweenScheduler) -> Option<Box<dyn Controller>> {
        let mut controller = self.controllers.remove(&id)?;
        controller.cancel(tweens);
        Some(controller)
    }

    pub fn cancel(&mut self, id: EffectId, tweens: &mut TweenScheduler) -> bool {
        match self.controllers.get_mut(&id) {
            Some(controller) => {
                controller.cancel(tweens);
                true
            }
            None => false,
        }
    }

    /// Cancel every non-terminal controller writing text into `element`.
    pub fn cancel_text_on(&mut self, element: ElementId, tweens: &mut TweenScheduler) -> usize {
        let mut count = 0;
        for controller in self.controllers.values_mut() {
            let terminal = matches!(controller.status(), EffectStatus::Completed | EffectStatus::Cancelled);
            if controller.text_element() == Some(element) && !terminal {
                controller.cancel(tweens);
                count += 1;
            }
        }
        count
    }

    /// Cancel everything still live. Returns how many controllers stopped.
    pub fn cancel_all(&mut self, tweens: &mut TweenScheduler) -> usize {
        let mut count = 0;
        for controller in self.controllers.values_mut() {
            if !matches!(controller.status(), EffectStatus::Completed | EffectStatus::Cancelled) {
                count += 1;
            }
            controller.cancel(tweens);
        }
        count
    }

    pub fn tick_all(&mut self, dt: f32, env: &mut Env<'_>) {
        for controller in self.controllers.values_mut() {
            controller.tick(dt, env);
        }
    }

    pub fn sync_all(&mut self, tweens: &TweenScheduler, finished: &[(TweenId, TweenStatus)]) {
        for controller in self.controllers.values_mut() {
            controller.sync(tweens, finished);
        }
    }

    /// Controllers that are scheduled or running.
    pub fn active_count(&self) -> usize {
        self.controllers.values().filter(|c| c.status().is_active()).count()
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}
