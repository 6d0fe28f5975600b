use std::collections::HashMap;

use glam::Vec2;
use log::{debug, info, warn};

use crate::api::config::EngineConfig;
use crate::api::error::{RevealError, Result};
use crate::api::types::{props, BindingId, EffectId, ElementId, Property, Rect, TweenId};
use crate::assets::manifest::RevealManifest;
use crate::components::animatable::{validate_states, AnimationSpec, Entrance, Repeat};
use crate::components::region::Region;
use crate::core::surface::Surface;
use crate::core::time::FrameSource;
use crate::extensions::easing::Easing;
use crate::extensions::tween::TweenScheduler;
use crate::input::queue::ViewportEvent;
use crate::systems::effects::{
    Controller, Counter, DecodeSpec, DecodeText, EffectStatus, EffectsState, Env, LoopMotion,
    MarqueeDirection, MarqueeTrack, StaggerReveal, Typewriter,
};
use crate::systems::registry::Registry;
use crate::systems::trigger::{Geometry, ReentryPolicy, Threshold, TriggerEvaluator, TriggerKind};

/// When an effect starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    /// On creation, without waiting for the viewport.
    Immediate,
    /// When `observe` crosses `threshold`.
    Viewport {
        observe: ElementId,
        threshold: Threshold,
        policy: ReentryPolicy,
    },
}

impl Trigger {
    pub fn viewport(observe: ElementId, threshold: Threshold, policy: ReentryPolicy) -> Self {
        Trigger::Viewport { observe, threshold, policy }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Trigger::Immediate => Ok(()),
            Trigger::Viewport { threshold, .. } => threshold.validate(),
        }
    }
}

/// Owns everything one mounted page animates: registrations, viewport
/// bindings, tweens and effect controllers.
///
/// Entry points register, bind and return an [`EffectId`]; nothing moves
/// until [`EffectContext::tick`]. Dropping the context releases it.
pub struct EffectContext {
    config: EngineConfig,
    registry: Registry,
    triggers: TriggerEvaluator,
    tweens: TweenScheduler,
    effects: EffectsState,
    /// Which controller reacts to which binding.
    reactions: HashMap<BindingId, EffectId>,
}

impl EffectContext {
    pub fn new(config: EngineConfig) -> Self {
        let effects = EffectsState::new(config.rng_seed);
        Self {
            config,
            registry: Registry::new(),
            triggers: TriggerEvaluator::new(),
            tweens: TweenScheduler::new(),
            effects,
            reactions: HashMap::new(),
        }
    }

    /// Mount a region tree: every marked region gets its entrance, bound to
    /// its own viewport crossing. Fails before registering anything when any
    /// marked region is unknown to the surface or declares a bad entrance.
    pub fn mount(root: &Region, config: EngineConfig, surface: &mut dyn Surface) -> Result<Self> {
        let mut ctx = Self::new(config);
        ctx.mount_region(root, surface)?;
        Ok(ctx)
    }

    /// Mount every region tree of a JSON manifest. The manifest's config, if
    /// present, replaces `config`.
    pub fn mount_manifest(json: &str, config: EngineConfig, surface: &mut dyn Surface) -> Result<Self> {
        let manifest = RevealManifest::from_json(json)?;
        let mut ctx = Self::new(manifest.config.unwrap_or(config));
        for root in &manifest.regions {
            ctx.mount_region(root, surface)?;
        }
        Ok(ctx)
    }

    /// Mount one more region tree into this context. Returns how many
    /// regions were animated.
    pub fn mount_region(&mut self, root: &Region, surface: &mut dyn Surface) -> Result<usize> {
        let marked = root.find_marked(&self.config.section_marker);
        let mut plans = Vec::with_capacity(marked.len());
        let mut defaulted = 0;
        for region in &marked {
            if !surface.is_attached(region.id) {
                return Err(RevealError::UnknownElement(region.id));
            }
            let entrance = match &region.entrance {
                Some(entrance) => entrance.clone(),
                None => {
                    defaulted += 1;
                    self.config.entrance.clone()
                }
            };
            validate_states(&entrance.initial, &entrance.target)?;
            entrance.spec.validate()?;
            let trigger = Trigger::viewport(
                region.id,
                region.threshold.unwrap_or(self.config.default_threshold),
                region.policy.unwrap_or(self.config.default_policy),
            );
            trigger.validate()?;
            plans.push((region.id, entrance, trigger));
        }

        for (element, entrance, trigger) in &plans {
            self.fade_slide_in(&[*element], entrance, *trigger, surface)?;
        }
        info!(
            "mounted {} animated regions ({} with the default entrance)",
            plans.len(),
            defaulted
        );
        Ok(plans.len())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn triggers(&self) -> &TriggerEvaluator {
        &self.triggers
    }

    pub fn tweens(&self) -> &TweenScheduler {
        &self.tweens
    }

    /// Trigger on `observe` with the configured threshold and policy.
    pub fn default_trigger(&self, observe: ElementId) -> Trigger {
        Trigger::viewport(observe, self.config.default_threshold, self.config.default_policy)
    }

    // -- Entry points --

    /// Animate elements from the entrance's initial state to its target.
    pub fn fade_slide_in(
        &mut self,
        elements: &[ElementId],
        entrance: &Entrance,
        trigger: Trigger,
        surface: &mut dyn Surface,
    ) -> Result<EffectId> {
        self.stagger_reveal(elements, entrance, 0.0, trigger, surface)
    }

    /// Animate an ordered group; element `i` starts `delay + i * interval_ms`
    /// after the trigger.
    pub fn stagger_reveal(
        &mut self,
        elements: &[ElementId],
        entrance: &Entrance,
        interval_ms: f32,
        trigger: Trigger,
        surface: &mut dyn Surface,
    ) -> Result<EffectId> {
        trigger.validate()?;
        Self::require_attached(elements, surface)?;
        validate_states(&entrance.initial, &entrance.target)?;
        entrance.spec.validate()?;
        StaggerReveal::validate(elements.len(), interval_ms)?;

        let mut handles = Vec::with_capacity(elements.len());
        for &element in elements {
            handles.push(self.registry.register(
                element,
                entrance.initial.clone(),
                entrance.target.clone(),
                entrance.spec,
            )?);
        }
        let reveal = StaggerReveal::new(handles, interval_ms)?;
        let mut env = Env {
            registry: &self.registry,
            tweens: &mut self.tweens,
            surface: &mut *surface,
        };
        reveal.apply_initial(&mut env);
        self.install(Box::new(reveal), trigger, surface)
    }

    /// Count the element's text from 0 to `target`, rendered as `{n}{suffix}`.
    pub fn count_up_to(
        &mut self,
        element: ElementId,
        target: u32,
        suffix: &str,
        spec: AnimationSpec,
        trigger: Trigger,
        surface: &mut dyn Surface,
    ) -> Result<EffectId> {
        trigger.validate()?;
        Counter::validate_target(target)?;
        Self::require_attached(&[element], surface)?;
        let handle = self.registry.register(
            element,
            props([(Property::Count, 0.0)]),
            props([(Property::Count, target as f32)]),
            spec.with_snap(1.0),
        )?;
        surface.set_value(element, Property::Count, 0.0);
        let counter = Counter::new(handle, element, target).with_suffix(suffix);
        counter.render(surface);
        self.install(Box::new(counter), trigger, surface)
    }

    /// Grow a bar's width from 0 to `percent` of its track.
    pub fn progress_fill(
        &mut self,
        element: ElementId,
        percent: f32,
        spec: AnimationSpec,
        trigger: Trigger,
        surface: &mut dyn Surface,
    ) -> Result<EffectId> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(RevealError::invalid_spec(format!(
                "progress must be within 0..=100, got {}",
                percent
            )));
        }
        let entrance = Entrance::new(
            props([(Property::Width, 0.0)]),
            props([(Property::Width, percent)]),
            spec,
        );
        self.fade_slide_in(&[element], &entrance, trigger, surface)
    }

    /// Bob the element up by `amplitude` px and back, forever, from now.
    pub fn loop_float(
        &mut self,
        element: ElementId,
        amplitude: f32,
        spec: AnimationSpec,
        surface: &mut dyn Surface,
    ) -> Result<EffectId> {
        Self::require_attached(&[element], surface)?;
        let spec = spec.with_repeat(Repeat::Forever).with_yoyo(true);
        let handle = self.registry.register(
            element,
            props([(Property::TranslateY, 0.0)]),
            props([(Property::TranslateY, -amplitude)]),
            spec,
        )?;
        self.install(Box::new(LoopMotion::new(handle)), Trigger::Immediate, surface)
    }

    /// Scroll a marquee strip one copy width per cycle, forever, from now.
    pub fn marquee_loop(
        &mut self,
        track: MarqueeTrack,
        speed_px_per_s: f32,
        direction: MarqueeDirection,
        surface: &mut dyn Surface,
    ) -> Result<EffectId> {
        track.validate()?;
        let cycle_ms = track.cycle_ms(speed_px_per_s)?;
        Self::require_attached(&[track.element], surface)?;
        let (from, to) = track.endpoints(direction);
        let spec = AnimationSpec::new(cycle_ms, Easing::Linear).with_repeat(Repeat::Forever);
        let handle = self.registry.register(
            track.element,
            props([(Property::TranslateX, from)]),
            props([(Property::TranslateX, to)]),
            spec,
        )?;
        surface.set_value(track.element, Property::TranslateX, from);
        self.install(Box::new(LoopMotion::new(handle)), Trigger::Immediate, surface)
    }

    /// Reveal `target` out of scrambled glyphs from the configured charset.
    pub fn decode_text(
        &mut self,
        element: ElementId,
        target: &str,
        spec: DecodeSpec,
        trigger: Trigger,
        surface: &mut dyn Surface,
    ) -> Result<EffectId> {
        trigger.validate()?;
        Self::require_attached(&[element], surface)?;
        let seed = self.effects.rng.fork();
        let decode = DecodeText::new(element, target, spec, &self.config.decode_charset, seed)?
            .with_max_catch_up(self.config.max_catch_up_ticks);
        self.install(Box::new(decode), trigger, surface)
    }

    /// Type `lines` into the element one character per `char_interval_ms`.
    pub fn typewriter(
        &mut self,
        element: ElementId,
        lines: &[&str],
        char_interval_ms: f32,
        trigger: Trigger,
        surface: &mut dyn Surface,
    ) -> Result<EffectId> {
        trigger.validate()?;
        Self::require_attached(&[element], surface)?;
        let writer = Typewriter::new(element, lines, char_interval_ms)?
            .with_max_catch_up(self.config.max_catch_up_ticks);
        self.install(Box::new(writer), trigger, surface)
    }

    /// [`EffectContext::decode_text`] with the configured timing.
    pub fn decode_text_default(
        &mut self,
        element: ElementId,
        target: &str,
        trigger: Trigger,
        surface: &mut dyn Surface,
    ) -> Result<EffectId> {
        let spec = self.config.decode;
        self.decode_text(element, target, spec, trigger, surface)
    }

    /// [`EffectContext::typewriter`] at the configured typing speed.
    pub fn typewriter_default(
        &mut self,
        element: ElementId,
        lines: &[&str],
        trigger: Trigger,
        surface: &mut dyn Surface,
    ) -> Result<EffectId> {
        let interval = self.config.typewriter_tick_ms;
        self.typewriter(element, lines, interval, trigger, surface)
    }

    /// [`EffectContext::loop_float`] with the configured amplitude and timing.
    pub fn loop_float_default(&mut self, element: ElementId, surface: &mut dyn Surface) -> Result<EffectId> {
        let (amplitude, spec) = (self.config.float_amplitude, self.config.float_spec);
        self.loop_float(element, amplitude, spec, surface)
    }

    /// Tilt the element toward the pointer: the further from centre, the
    /// steeper, one degree per `tilt_divisor` px.
    pub fn tilt_toward(
        &mut self,
        element: ElementId,
        pointer: Vec2,
        bounds: Rect,
        surface: &mut dyn Surface,
    ) -> Result<TweenId> {
        Self::require_attached(&[element], surface)?;
        let offset = pointer - bounds.center();
        let divisor = self.config.tilt_divisor;
        let to = props([(Property::RotateX, offset.y / divisor), (Property::RotateY, -offset.x / divisor)]);
        let id = self.tweens.start_to(element, &to, self.config.tilt_follow, &*surface)?;
        self.settle();
        Ok(id)
    }

    /// Ease the element back to no tilt.
    pub fn tilt_reset(&mut self, element: ElementId, surface: &mut dyn Surface) -> Result<TweenId> {
        Self::require_attached(&[element], surface)?;
        let to = props([(Property::RotateX, 0.0), (Property::RotateY, 0.0)]);
        let id = self.tweens.start_to(element, &to, self.config.tilt_reset, &*surface)?;
        self.settle();
        Ok(id)
    }

    fn require_attached(elements: &[ElementId], surface: &dyn Surface) -> Result<()> {
        match elements.iter().find(|&&e| !surface.is_attached(e)) {
            Some(&missing) => Err(RevealError::UnknownElement(missing)),
            None => Ok(()),
        }
    }

    fn install(
        &mut self,
        controller: Box<dyn Controller>,
        trigger: Trigger,
        surface: &mut dyn Surface,
    ) -> Result<EffectId> {
        let binding = match trigger {
            Trigger::Immediate => None,
            Trigger::Viewport { observe, threshold, policy } => Some(self.triggers.bind(observe, threshold, policy)?),
        };
        let id = self.effects.insert(controller, &mut self.tweens);
        match binding {
            Some(binding) => {
                self.reactions.insert(binding, id);
            }
            None => self.react(id, TriggerKind::Enter, ReentryPolicy::PlayOnce, surface)?,
        }
        self.settle();
        Ok(id)
    }

    fn react(&mut self, id: EffectId, kind: TriggerKind, policy: ReentryPolicy, surface: &mut dyn Surface) -> Result<()> {
        let Some(controller) = self.effects.get_mut(id) else {
            return Ok(());
        };
        let mut env = Env {
            registry: &self.registry,
            tweens: &mut self.tweens,
            surface,
        };
        match kind {
            TriggerKind::Enter => controller.enter(&mut env, policy),
            TriggerKind::Exit => controller.exit(&mut env),
        }
    }

    /// Fold finished tweens into controller state.
    fn settle(&mut self) {
        let finished = self.tweens.drain_finished();
        self.effects.sync_all(&self.tweens, &finished);
    }

    // -- Host input --

    /// Feed one geometry sample. Crossings fire on the next tick.
    pub fn observe(&mut self, element: ElementId, geometry: Geometry) {
        self.triggers.report(element, geometry);
    }

    pub fn handle(&mut self, event: ViewportEvent, surface: &mut dyn Surface) {
        match event {
            ViewportEvent::Geometry { element, geometry } => self.observe(element, geometry),
            ViewportEvent::Detached { element } => {
                self.unmount_element(element);
            }
            ViewportEvent::PointerMove { element, pointer, bounds } => {
                if let Err(err) = self.tilt_toward(element, pointer, bounds, surface) {
                    debug!("tilt ignored: {}", err);
                }
            }
            ViewportEvent::PointerLeave { element } => {
                if let Err(err) = self.tilt_reset(element, surface) {
                    debug!("tilt reset ignored: {}", err);
                }
            }
        }
    }

    /// Forget everything tied to an element that left the document: its
    /// bindings, its tweens, its registrations and every controller that
    /// animates only it or writes its text. Returns how many of those went.
    pub fn unmount_element(&mut self, element: ElementId) -> usize {
        let released = self.triggers.forget(element);
        let mut retired: Vec<EffectId> = released
            .iter()
            .filter_map(|binding| self.reactions.remove(binding))
            .collect();
        let registry = &self.registry;
        retired.extend(self.effects.find(|c| {
            let handles = c.handles();
            c.text_element() == Some(element)
                || (!handles.is_empty()
                    && handles
                        .iter()
                        .all(|&h| registry.get(h).map(|e| e.element) == Some(element)))
        }));
        retired.sort();
        retired.dedup();

        let tweens = self.tweens.cancel_element(element);
        let mut registrations = 0;
        for &id in &retired {
            let Some(controller) = self.effects.remove(id, &mut self.tweens) else {
                continue;
            };
            for &handle in controller.handles() {
                if self.registry.unregister(handle).is_some() {
                    registrations += 1;
                }
            }
        }
        registrations += self.registry.unregister_element(element);

        let orphaned: Vec<BindingId> = self
            .reactions
            .iter()
            .filter(|(_, effect)| retired.contains(effect))
            .map(|(&binding, _)| binding)
            .collect();
        for binding in &orphaned {
            self.reactions.remove(binding);
            self.triggers.release(*binding);
        }
        self.settle();

        debug!(
            "unmounted {:?}: {} bindings, {} tweens, {} effects, {} registrations",
            element,
            released.len() + orphaned.len(),
            tweens,
            retired.len(),
            registrations
        );
        released.len() + orphaned.len() + tweens + retired.len() + registrations
    }

    // -- Frame loop --

    /// One frame: dispatch queued crossings, advance tweens, then step
    /// text effects and counters.
    pub fn tick(&mut self, dt: f32, surface: &mut dyn Surface) {
        for event in self.triggers.drain_events(&*surface) {
            let Some(&effect) = self.reactions.get(&event.binding) else {
                continue;
            };
            debug!(
                "{:?} {:?} scrolling {:?} -> {:?}",
                event.element, event.kind, event.direction, effect
            );
            if let Err(err) = self.react(effect, event.kind, event.policy, surface) {
                warn!("{:?} failed to react to {:?}: {}", effect, event.kind, err);
            }
        }
        self.settle();

        self.tweens.tick(dt, surface);
        self.settle();

        let mut env = Env {
            registry: &self.registry,
            tweens: &mut self.tweens,
            surface,
        };
        self.effects.tick_all(dt, &mut env);
        self.settle();
    }

    /// Drive the context from a frame source until it stops.
    /// Returns the number of frames run.
    pub fn run(&mut self, frames: &mut dyn FrameSource, surface: &mut dyn Surface) -> u32 {
        let mut count = 0;
        while let Some(dt) = frames.next_frame() {
            self.tick(dt, surface);
            count += 1;
        }
        count
    }

    pub fn effect_status(&self, id: EffectId) -> Option<EffectStatus> {
        self.effects.status(id)
    }

    pub fn cancel_effect(&mut self, id: EffectId) -> bool {
        let cancelled = self.effects.cancel(id, &mut self.tweens);
        self.settle();
        cancelled
    }

    /// Effects still scheduled or running.
    pub fn active_effects(&self) -> usize {
        self.effects.active_count()
    }

    /// Tear everything down: bindings, effects, tweens and registrations.
    /// Values already applied stay where they are. Safe to call repeatedly.
    pub fn release(&mut self) {
        let watchers = self.triggers.connected_watchers();
        let bindings = self.triggers.release_all();
        let effects = self.effects.cancel_all(&mut self.tweens);
        let tweens = self.tweens.cancel_all();
        let registrations = self.registry.len();
        self.registry.clear();
        self.reactions.clear();
        self.settle();

        if bindings + effects + tweens + registrations == 0 {
            debug!("release: nothing left to tear down");
            return;
        }
        info!(
            "released {} watchers ({} bindings), {} effects, {} tweens, {} registrations",
            watchers, bindings, effects, tweens, registrations
        );
    }
}

impl Drop for EffectContext {
    fn drop(&mut self) {
        self.release();
    }
}
