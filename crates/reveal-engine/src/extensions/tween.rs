// extensions/tween.rs
//
// Tween scheduler: drives numeric property interpolations keyed by
// (ElementId, Property). Decoupled from the registry and triggers.
//
// Usage:
//   let mut tweens = TweenScheduler::new();
//   tweens.start(Subject::between(id, &from, &to), spec)?;
//   tweens.tick(dt_ms, &mut surface);  // Advances all tweens, writes values

use std::collections::{BTreeMap, HashMap};

use crate::api::error::{RevealError, Result};
use crate::api::types::{ElementId, Property, PropertyMap, TweenId};
use crate::components::animatable::{AnimationSpec, Repeat};
use crate::core::surface::Surface;
use super::easing::{lerp, snap_within};

/// One (element, property) pair driven by a tween, with its endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subject {
    pub element: ElementId,
    pub property: Property,
    pub from: f32,
    pub to: f32,
}

impl Subject {
    pub fn new(element: ElementId, property: Property, from: f32, to: f32) -> Self {
        Self { element, property, from, to }
    }

    /// One subject per key of `to`. Keys missing from `from` start at their target.
    pub fn between(element: ElementId, from: &PropertyMap, to: &PropertyMap) -> Vec<Subject> {
        to.iter()
            .map(|(&property, &target)| {
                let start = from.get(&property).copied().unwrap_or(target);
                Subject::new(element, property, start, target)
            })
            .collect()
    }
}

/// Lifecycle of a tween instance. Completed and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenStatus {
    /// Started but still inside its delay.
    Pending,
    Running,
    Completed,
    Cancelled,
}

impl TweenStatus {
    pub fn is_active(self) -> bool {
        matches!(self, TweenStatus::Pending | TweenStatus::Running)
    }
}

/// A single in-flight interpolation.
#[derive(Debug, Clone)]
pub struct Tween {
    subjects: Vec<Subject>,
    spec: AnimationSpec,
    /// Delay still to wait before the first running frame.
    delay_left: f32,
    /// Position inside the current cycle, in ms.
    elapsed: f32,
    /// Direction of travel; reversed tweens count elapsed down toward `from`.
    forward: bool,
    /// Extra cycles still allowed; `None` repeats forever.
    cycles_left: Option<u32>,
    status: TweenStatus,
    /// Last snapped value written per subject. A snapped display never
    /// steps back against the direction of travel, even on bouncing curves.
    held: Vec<Option<f32>>,
}

impl Tween {
    fn new(subjects: Vec<Subject>, spec: AnimationSpec) -> Self {
        let cycles_left = match spec.repeat {
            Repeat::None => Some(0),
            Repeat::Forever => None,
            Repeat::Count(n) => Some(n),
        };
        let held = vec![None; subjects.len()];
        Self {
            subjects,
            spec,
            held,
            delay_left: spec.delay_ms,
            elapsed: 0.0,
            forward: true,
            cycles_left,
            status: TweenStatus::Pending,
        }
    }

    pub fn status(&self) -> TweenStatus {
        self.status
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn spec(&self) -> &AnimationSpec {
        &self.spec
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_forward(&self) -> bool {
        self.forward
    }

    /// Normalized position in the current cycle [0, 1].
    pub fn progress(&self) -> f32 {
        (self.elapsed / self.spec.duration_ms).clamp(0.0, 1.0)
    }

    /// Interpolated value of `subject` at the current position.
    pub fn sample(&self, subject: &Subject) -> f32 {
        let t = self.spec.easing.apply(self.progress());
        let value = lerp(subject.from, subject.to, t);
        match self.spec.snap {
            Some(step) => snap_within(value, subject.from, subject.to, step),
            None => value,
        }
    }

    fn apply(&mut self, surface: &mut dyn Surface) {
        for (i, subject) in self.subjects.iter().enumerate() {
            let mut value = self.sample(subject);
            if self.spec.snap.is_some() {
                let (origin, goal) = if self.forward {
                    (subject.from, subject.to)
                } else {
                    (subject.to, subject.from)
                };
                if let Some(last) = self.held[i] {
                    value = if goal >= origin { value.max(last) } else { value.min(last) };
                }
                self.held[i] = Some(value);
            }
            surface.set_value(subject.element, subject.property, value);
        }
    }

    fn take_cycle(&mut self) -> bool {
        match self.cycles_left {
            None => true,
            Some(0) => false,
            Some(n) => {
                self.cycles_left = Some(n - 1);
                true
            }
        }
    }

    /// Advance by `dt` milliseconds and write the new values.
    /// Returns true when the tween completed during this call.
    pub fn update(&mut self, dt: f32, surface: &mut dyn Surface) -> bool {
        let step = match self.status {
            TweenStatus::Pending => {
                self.delay_left -= dt;
                if self.delay_left > 0.0 {
                    return false;
                }
                let overflow = -self.delay_left;
                self.delay_left = 0.0;
                self.status = TweenStatus::Running;
                overflow
            }
            TweenStatus::Running => dt,
            TweenStatus::Completed | TweenStatus::Cancelled => return false,
        };

        let duration = self.spec.duration_ms;
        if self.forward {
            self.elapsed += step;
        } else {
            self.elapsed -= step;
        }

        let at_boundary = if self.forward {
            self.elapsed >= duration
        } else {
            self.elapsed <= 0.0
        };
        if !at_boundary {
            self.apply(surface);
            return false;
        }

        // Reversal heads back to the start and never repeats
        if self.forward && self.take_cycle() {
            if self.spec.yoyo {
                for subject in &mut self.subjects {
                    std::mem::swap(&mut subject.from, &mut subject.to);
                }
                self.elapsed = 0.0;
            } else {
                self.elapsed %= duration;
            }
            self.held.fill(None);
            self.apply(surface);
            return false;
        }

        // Settle on the exact endpoint
        self.elapsed = if self.forward { duration } else { 0.0 };
        for subject in &self.subjects {
            let end = if self.forward { subject.to } else { subject.from };
            surface.set_value(subject.element, subject.property, end);
        }
        self.status = TweenStatus::Completed;
        true
    }
}

/// Owns every in-flight tween of one context.
///
/// At most one active tween owns a given (element, property); starting a new
/// one cancels the previous owner before it can write again.
#[derive(Debug, Default)]
pub struct TweenScheduler {
    /// Ordered by id, which is also start order.
    tweens: BTreeMap<TweenId, Tween>,
    owners: HashMap<(ElementId, Property), TweenId>,
    next_id: u32,
    /// Tweens that left the scheduler since the last drain.
    finished: Vec<(TweenId, TweenStatus)>,
}

impl TweenScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a tween. Any active tween owning one of the same
    /// (element, property) pairs is cancelled first.
    pub fn start(&mut self, subjects: Vec<Subject>, spec: AnimationSpec) -> Result<TweenId> {
        spec.validate()?;
        if subjects.is_empty() {
            return Err(RevealError::invalid_spec("tween has no subjects"));
        }
        for (i, a) in subjects.iter().enumerate() {
            if subjects[i + 1..].iter().any(|b| (b.element, b.property) == (a.element, a.property)) {
                return Err(RevealError::invalid_spec(format!(
                    "{:?} listed twice for {:?}",
                    a.property, a.element
                )));
            }
        }

        let id = TweenId(self.next_id);
        self.next_id += 1;

        for subject in &subjects {
            if let Some(&previous) = self.owners.get(&(subject.element, subject.property)) {
                log::debug!(
                    "tween {:?} supersedes {:?} on {:?}.{:?}",
                    id, previous, subject.element, subject.property
                );
                self.cancel(previous);
            }
        }
        for subject in &subjects {
            self.owners.insert((subject.element, subject.property), id);
        }
        self.tweens.insert(id, Tween::new(subjects, spec));
        Ok(id)
    }

    /// Start a tween from the surface's current values toward `to`.
    pub fn start_to(
        &mut self,
        element: ElementId,
        to: &PropertyMap,
        spec: AnimationSpec,
        surface: &dyn Surface,
    ) -> Result<TweenId> {
        let subjects = to
            .iter()
            .map(|(&property, &target)| {
                let current = surface.value(element, property).unwrap_or(property.neutral());
                Subject::new(element, property, current, target)
            })
            .collect();
        self.start(subjects, spec)
    }

    /// Stop a tween where it is. The surface keeps its last applied value.
    pub fn cancel(&mut self, id: TweenId) -> bool {
        let Some(tween) = self.tweens.remove(&id) else {
            return false;
        };
        self.release_claims(id, &tween);
        self.finished.push((id, TweenStatus::Cancelled));
        true
    }

    /// Cancel every tween that drives any property of `element`.
    pub fn cancel_element(&mut self, element: ElementId) -> usize {
        let ids: Vec<TweenId> = self
            .tweens
            .iter()
            .filter(|(_, t)| t.subjects.iter().any(|s| s.element == element))
            .map(|(&id, _)| id)
            .collect();
        for &id in &ids {
            self.cancel(id);
        }
        ids.len()
    }

    /// Cancel everything. Returns how many tweens were stopped.
    pub fn cancel_all(&mut self) -> usize {
        let ids: Vec<TweenId> = self.tweens.keys().copied().collect();
        for &id in &ids {
            self.cancel(id);
        }
        ids.len()
    }

    /// Run a live tween backward from where it is now.
    pub fn reverse(&mut self, id: TweenId) -> bool {
        self.set_direction(id, false)
    }

    /// Run a live tween forward from where it is now.
    pub fn play_forward(&mut self, id: TweenId) -> bool {
        self.set_direction(id, true)
    }

    fn set_direction(&mut self, id: TweenId, forward: bool) -> bool {
        match self.tweens.get_mut(&id) {
            Some(tween) => {
                tween.forward = forward;
                true
            }
            None => false,
        }
    }

    /// Advance every tween in start order. Returns the number that completed.
    pub fn tick(&mut self, dt: f32, surface: &mut dyn Surface) -> usize {
        let mut completed = Vec::new();
        for (&id, tween) in self.tweens.iter_mut() {
            if tween.update(dt, surface) {
                completed.push(id);
            }
        }

        for &id in &completed {
            if let Some(tween) = self.tweens.remove(&id) {
                self.release_claims(id, &tween);
                self.finished.push((id, TweenStatus::Completed));
            }
        }
        completed.len()
    }

    fn release_claims(&mut self, id: TweenId, tween: &Tween) {
        for subject in &tween.subjects {
            let key = (subject.element, subject.property);
            if self.owners.get(&key) == Some(&id) {
                self.owners.remove(&key);
            }
        }
    }

    /// Status of a live tween; `None` once it has completed or been cancelled
    /// (see [`TweenScheduler::drain_finished`]).
    pub fn status(&self, id: TweenId) -> Option<TweenStatus> {
        self.tweens.get(&id).map(|t| t.status)
    }

    pub fn get(&self, id: TweenId) -> Option<&Tween> {
        self.tweens.get(&id)
    }

    /// The active tween driving `property` of `element`, if any.
    pub fn owner_of(&self, element: ElementId, property: Property) -> Option<TweenId> {
        self.owners.get(&(element, property)).copied()
    }

    /// Drain tweens that completed or were cancelled since the last call.
    pub fn drain_finished(&mut self) -> Vec<(TweenId, TweenStatus)> {
        std::mem::take(&mut self.finished)
    }

    pub fn running_count(&self) -> usize {
        self.tweens.values().filter(|t| t.status == TweenStatus::Running).count()
    }

    /// Pending plus running.
    pub fn active_count(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::props;
    use crate::core::surface::ElementStore;
    use crate::extensions::easing::Easing;

    const E: ElementId = ElementId(1);

    fn opacity(tweens: &mut TweenScheduler, spec: AnimationSpec) -> TweenId {
        tweens
            .start(vec![Subject::new(E, Property::Opacity, 0.0, 1.0)], spec)
            .unwrap()
    }

    #[test]
    fn tween_linear_opacity() {
        let mut tweens = TweenScheduler::new();
        let mut surface = ElementStore::with_elements([E]);
        let id = opacity(&mut tweens, AnimationSpec::new(1000.0, Easing::Linear));
        assert_eq!(tweens.status(id), Some(TweenStatus::Pending));

        tweens.tick(500.0, &mut surface);
        assert_eq!(tweens.status(id), Some(TweenStatus::Running));
        assert!((surface.value(E, Property::Opacity).unwrap() - 0.5).abs() < 1e-4);

        assert_eq!(tweens.tick(500.0, &mut surface), 1);
        assert_eq!(surface.value(E, Property::Opacity), Some(1.0));
        assert!(tweens.is_empty());
        assert_eq!(tweens.drain_finished(), vec![(id, TweenStatus::Completed)]);
    }

    #[test]
    fn completion_lands_exactly_on_target() {
        let mut tweens = TweenScheduler::new();
        let mut surface = ElementStore::with_elements([E]);
        tweens
            .start(
                vec![Subject::new(E, Property::TranslateY, 50.0, 0.0), Subject::new(E, Property::Scale, 0.3, 1.7)],
                AnimationSpec::new(800.0, Easing::BackOut),
            )
            .unwrap();
        for _ in 0..60 {
            tweens.tick(16.7, &mut surface);
        }
        assert_eq!(surface.value(E, Property::TranslateY), Some(0.0));
        assert_eq!(surface.value(E, Property::Scale), Some(1.7));
    }

    #[test]
    fn delay_keeps_tween_pending() {
        let mut tweens = TweenScheduler::new();
        let mut surface = ElementStore::with_elements([E]);
        let id = opacity(&mut tweens, AnimationSpec::new(100.0, Easing::Linear).with_delay(200.0));

        tweens.tick(150.0, &mut surface);
        assert_eq!(tweens.status(id), Some(TweenStatus::Pending));
        assert_eq!(surface.value(E, Property::Opacity), None);

        // 50 ms of delay left; the other 50 ms advance the tween
        tweens.tick(100.0, &mut surface);
        assert_eq!(tweens.status(id), Some(TweenStatus::Running));
        assert!((surface.value(E, Property::Opacity).unwrap() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn yoyo_forever_swaps_endpoints() {
        let mut tweens = TweenScheduler::new();
        let mut surface = ElementStore::with_elements([E]);
        let spec = AnimationSpec::new(1000.0, Easing::Linear)
            .with_repeat(Repeat::Forever)
            .with_yoyo(true);
        let id = tweens
            .start(vec![Subject::new(E, Property::TranslateY, 0.0, -10.0)], spec)
            .unwrap();

        tweens.tick(1000.0, &mut surface);
        assert_eq!(surface.value(E, Property::TranslateY), Some(-10.0));
        tweens.tick(500.0, &mut surface);
        assert!((surface.value(E, Property::TranslateY).unwrap() + 5.0).abs() < 1e-4);
        tweens.tick(500.0, &mut surface);
        assert_eq!(surface.value(E, Property::TranslateY), Some(0.0));

        for _ in 0..100 {
            tweens.tick(333.0, &mut surface);
        }
        assert_eq!(tweens.status(id), Some(TweenStatus::Running));
    }

    #[test]
    fn loop_without_yoyo_wraps() {
        let mut tweens = TweenScheduler::new();
        let mut surface = ElementStore::with_elements([E]);
        let spec = AnimationSpec::new(1000.0, Easing::Linear).with_repeat(Repeat::Forever);
        tweens
            .start(vec![Subject::new(E, Property::TranslateX, 0.0, -100.0)], spec)
            .unwrap();

        tweens.tick(1250.0, &mut surface);
        assert!((surface.value(E, Property::TranslateX).unwrap() + 25.0).abs() < 1e-3);
    }

    #[test]
    fn repeat_count_completes_after_extra_cycles() {
        let mut tweens = TweenScheduler::new();
        let mut surface = ElementStore::with_elements([E]);
        let spec = AnimationSpec::new(100.0, Easing::Linear)
            .with_repeat(Repeat::Count(2))
            .with_yoyo(true);
        let id = opacity(&mut tweens, spec);

        tweens.tick(100.0, &mut surface);
        tweens.tick(100.0, &mut surface);
        assert_eq!(tweens.status(id), Some(TweenStatus::Running));
        tweens.tick(100.0, &mut surface);
        assert_eq!(tweens.status(id), None);
        // Third cycle runs 0 → 1 again
        assert_eq!(surface.value(E, Property::Opacity), Some(1.0));
    }

    #[test]
    fn new_tween_supersedes_owner() {
        let mut tweens = TweenScheduler::new();
        let mut surface = ElementStore::with_elements([E]);
        let first = opacity(&mut tweens, AnimationSpec::new(1000.0, Easing::Linear));
        tweens.tick(250.0, &mut surface);

        let second = tweens
            .start(vec![Subject::new(E, Property::Opacity, 0.25, 0.0)], AnimationSpec::new(1000.0, Easing::Linear))
            .unwrap();
        assert_eq!(tweens.status(first), None);
        assert_eq!(tweens.owner_of(E, Property::Opacity), Some(second));
        assert_eq!(tweens.active_count(), 1);
        assert_eq!(tweens.drain_finished(), vec![(first, TweenStatus::Cancelled)]);
        // Supersession does not rewind
        assert!((surface.value(E, Property::Opacity).unwrap() - 0.25).abs() < 1e-4);
    }

    #[test]
    fn supersession_only_touches_shared_properties() {
        let mut tweens = TweenScheduler::new();
        let a = tweens
            .start(vec![Subject::new(E, Property::Opacity, 0.0, 1.0)], AnimationSpec::default())
            .unwrap();
        let b = tweens
            .start(vec![Subject::new(ElementId(2), Property::Opacity, 0.0, 1.0)], AnimationSpec::default())
            .unwrap();
        assert_eq!(tweens.status(a), Some(TweenStatus::Pending));
        assert_eq!(tweens.status(b), Some(TweenStatus::Pending));
    }

    #[test]
    fn cancel_leaves_last_value() {
        let mut tweens = TweenScheduler::new();
        let mut surface = ElementStore::with_elements([E]);
        let id = opacity(&mut tweens, AnimationSpec::new(1000.0, Easing::Linear));
        tweens.tick(400.0, &mut surface);
        assert!(tweens.cancel(id));
        assert!(!tweens.cancel(id));
        tweens.tick(400.0, &mut surface);
        assert!((surface.value(E, Property::Opacity).unwrap() - 0.4).abs() < 1e-4);
        assert_eq!(tweens.owner_of(E, Property::Opacity), None);
    }

    #[test]
    fn reverse_retraces_from_current_value() {
        let mut tweens = TweenScheduler::new();
        let mut surface = ElementStore::with_elements([E]);
        let id = opacity(&mut tweens, AnimationSpec::new(1000.0, Easing::Linear));
        tweens.tick(600.0, &mut surface);
        tweens.reverse(id);

        tweens.tick(100.0, &mut surface);
        assert!((surface.value(E, Property::Opacity).unwrap() - 0.5).abs() < 1e-4);

        tweens.tick(500.0, &mut surface);
        assert_eq!(surface.value(E, Property::Opacity), Some(0.0));
        assert_eq!(tweens.status(id), None);
    }

    #[test]
    fn snapped_values_never_overshoot() {
        let mut tweens = TweenScheduler::new();
        let mut surface = ElementStore::with_elements([E]);
        tweens
            .start(
                vec![Subject::new(E, Property::Count, 0.0, 5.0)],
                AnimationSpec::new(2000.0, Easing::BackOut).with_snap(1.0),
            )
            .unwrap();
        let mut last = 0.0;
        for _ in 0..40 {
            tweens.tick(50.0, &mut surface);
            let v = surface.value(E, Property::Count).unwrap();
            assert!(v <= 5.0 && v >= last && v.fract() == 0.0, "bad counter value {}", v);
            last = v;
        }
        assert_eq!(last, 5.0);
    }

    #[test]
    fn snapped_bounce_holds_its_highest_value() {
        let mut tweens = TweenScheduler::new();
        let mut surface = ElementStore::with_elements([E]);
        tweens
            .start(
                vec![Subject::new(E, Property::Count, 0.0, 10.0)],
                AnimationSpec::new(1000.0, Easing::BounceOut).with_snap(1.0),
            )
            .unwrap();
        let mut seen = Vec::new();
        for _ in 0..70 {
            tweens.tick(16.0, &mut surface);
            seen.push(surface.value(E, Property::Count).unwrap());
        }
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "counted back: {:?}", seen);
        assert_eq!(seen.last(), Some(&10.0));
    }

    #[test]
    fn reversed_snapped_tween_only_counts_down() {
        let mut tweens = TweenScheduler::new();
        let mut surface = ElementStore::with_elements([E]);
        let id = tweens
            .start(
                vec![Subject::new(E, Property::Count, 0.0, 10.0)],
                AnimationSpec::new(1000.0, Easing::ElasticOut).with_snap(1.0),
            )
            .unwrap();
        for _ in 0..30 {
            tweens.tick(16.0, &mut surface);
        }
        tweens.reverse(id);
        let mut last = surface.value(E, Property::Count).unwrap();
        for _ in 0..40 {
            tweens.tick(16.0, &mut surface);
            let v = surface.value(E, Property::Count).unwrap();
            assert!(v <= last, "counted up while reversing: {} after {}", v, last);
            last = v;
        }
        assert_eq!(last, 0.0);
    }

    #[test]
    fn start_to_reads_current_values() {
        let mut tweens = TweenScheduler::new();
        let mut surface = ElementStore::with_elements([E]);
        surface.set_value(E, Property::RotateX, 12.0);
        let id = tweens
            .start_to(E, &props([(Property::RotateX, 0.0), (Property::Opacity, 0.0)]), AnimationSpec::default(), &surface)
            .unwrap();
        let subjects = tweens.get(id).unwrap().subjects();
        assert_eq!(subjects[0].from, 1.0); // opacity neutral
        assert_eq!(subjects[1].from, 12.0);
    }

    #[test]
    fn rejects_empty_and_duplicate_subjects() {
        let mut tweens = TweenScheduler::new();
        assert!(tweens.start(Vec::new(), AnimationSpec::default()).is_err());
        let dup = vec![
            Subject::new(E, Property::Opacity, 0.0, 1.0),
            Subject::new(E, Property::Opacity, 1.0, 0.0),
        ];
        assert!(tweens.start(dup, AnimationSpec::default()).is_err());
        assert!(tweens.is_empty());
    }
}
