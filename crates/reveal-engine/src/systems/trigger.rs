//! Trigger evaluator: turns viewport geometry samples into enter/exit events.
//!
//! Bindings that share a threshold share one watcher, so a geometry report
//! evaluates each distinct threshold once. Events are queued and drained
//! once per frame; events for elements that left the document in between
//! are dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::api::error::{RevealError, Result};
use crate::api::types::{AnimHandle, BindingId, ElementId};
use crate::core::surface::Surface;
use crate::systems::registry::Registry;

/// Viewport condition at which a binding counts as "in view".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Threshold {
    /// Element top at or above this fraction of the viewport height
    /// (`TopAt(0.8)`: top of element crosses 80% down the viewport).
    TopAt(f32),
    /// Element top at or above this many pixels from the viewport top.
    TopAtOffset(f32),
    /// At least this fraction of the element is visible.
    Ratio(f32),
}

impl Threshold {
    fn key(self) -> WatcherKey {
        match self {
            Threshold::TopAt(f) => WatcherKey(0, f.to_bits()),
            Threshold::TopAtOffset(px) => WatcherKey(1, px.to_bits()),
            Threshold::Ratio(r) => WatcherKey(2, r.to_bits()),
        }
    }

    pub fn is_met(self, geometry: &Geometry) -> bool {
        match self {
            Threshold::TopAt(fraction) => geometry.top <= fraction * geometry.viewport_height,
            Threshold::TopAtOffset(px) => geometry.top <= px,
            Threshold::Ratio(ratio) if ratio <= 0.0 => geometry.visible_ratio() > 0.0,
            Threshold::Ratio(ratio) => geometry.visible_ratio() >= ratio,
        }
    }

    pub fn validate(self) -> Result<()> {
        let ok = match self {
            Threshold::TopAt(f) => f.is_finite(),
            Threshold::TopAtOffset(px) => px.is_finite(),
            Threshold::Ratio(r) => (0.0..=1.0).contains(&r),
        };
        if ok {
            Ok(())
        } else {
            Err(RevealError::invalid_spec(format!("unusable threshold {:?}", self)))
        }
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::TopAt(0.8)
    }
}

/// Watchers are keyed by the exact threshold bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct WatcherKey(u8, u32);

/// One geometry sample for an observed element, in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    /// Element top relative to the viewport top; negative once scrolled past.
    pub top: f32,
    pub height: f32,
    pub viewport_height: f32,
}

impl Geometry {
    pub fn new(top: f32, height: f32, viewport_height: f32) -> Self {
        Self { top, height, viewport_height }
    }

    /// Fraction of the element inside the viewport.
    pub fn visible_ratio(&self) -> f32 {
        if self.height <= 0.0 {
            return 0.0;
        }
        let visible = (self.top + self.height).min(self.viewport_height) - self.top.max(0.0);
        (visible.max(0.0) / self.height).clamp(0.0, 1.0)
    }
}

/// What happens when a bound element leaves and re-enters view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReentryPolicy {
    /// Enter fires once per binding lifetime.
    #[default]
    PlayOnce,
    /// Enter on every entry, Exit on every departure; the paired tween reverses.
    PlayAndReverseOnExit,
    /// Enter on every entry; the tween restarts from its initial state.
    ReplayEachEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Enter,
    Exit,
}

/// Page scroll direction inferred from consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Down,
    Up,
}

/// Reference to the region whose geometry drives a binding.
/// Observed, never owned: the registry and the host own element lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Observed(ElementId);

impl Observed {
    pub fn element(self) -> ElementId {
        self.0
    }
}

/// Emitted when a binding crosses its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub binding: BindingId,
    pub element: ElementId,
    pub kind: TriggerKind,
    pub direction: ScrollDirection,
    pub policy: ReentryPolicy,
}

#[derive(Debug, Clone)]
struct Binding {
    observed: Observed,
    policy: ReentryPolicy,
    watcher: WatcherKey,
    inside: bool,
    last_top: Option<f32>,
    fired: bool,
}

#[derive(Debug, Clone)]
struct Watcher {
    threshold: Threshold,
    members: Vec<BindingId>,
}

#[derive(Debug, Default)]
pub struct TriggerEvaluator {
    bindings: BTreeMap<BindingId, Binding>,
    watchers: BTreeMap<WatcherKey, Watcher>,
    pending: Vec<TriggerEvent>,
    next_id: u32,
}

impl TriggerEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an observed element to a threshold.
    pub fn bind(&mut self, observed: ElementId, threshold: Threshold, policy: ReentryPolicy) -> Result<BindingId> {
        threshold.validate()?;

        let id = BindingId(self.next_id);
        self.next_id += 1;

        let key = threshold.key();
        self.watchers
            .entry(key)
            .or_insert_with(|| Watcher { threshold, members: Vec::new() })
            .members
            .push(id);
        self.bindings.insert(
            id,
            Binding {
                observed: Observed(observed),
                policy,
                watcher: key,
                inside: false,
                last_top: None,
                fired: false,
            },
        );
        Ok(id)
    }

    /// Bind a registered element, observing its own geometry.
    pub fn bind_handle(
        &mut self,
        registry: &Registry,
        handle: AnimHandle,
        threshold: Threshold,
        policy: ReentryPolicy,
    ) -> Result<BindingId> {
        let element = registry.get(handle).ok_or(RevealError::UnknownHandle(handle))?.element;
        self.bind(element, threshold, policy)
    }

    /// Release a binding; its watcher disconnects with its last member.
    /// Releasing twice is a no-op.
    pub fn release(&mut self, id: BindingId) -> bool {
        let Some(binding) = self.bindings.remove(&id) else {
            return false;
        };
        if let Some(watcher) = self.watchers.get_mut(&binding.watcher) {
            watcher.members.retain(|&m| m != id);
            if watcher.members.is_empty() {
                self.watchers.remove(&binding.watcher);
            }
        }
        self.pending.retain(|e| e.binding != id);
        true
    }

    /// Release every binding observing `element` and drop its pending events.
    pub fn forget(&mut self, element: ElementId) -> Vec<BindingId> {
        let ids: Vec<BindingId> = self
            .bindings
            .iter()
            .filter(|(_, b)| b.observed.element() == element)
            .map(|(&id, _)| id)
            .collect();
        for &id in &ids {
            self.release(id);
        }
        self.pending.retain(|e| e.element != element);
        ids
    }

    /// Disconnect everything. Returns how many bindings were released.
    pub fn release_all(&mut self) -> usize {
        let count = self.bindings.len();
        self.bindings.clear();
        self.watchers.clear();
        self.pending.clear();
        count
    }

    /// Feed one geometry sample for `element`.
    pub fn report(&mut self, element: ElementId, geometry: Geometry) {
        for watcher in self.watchers.values() {
            let met = watcher.threshold.is_met(&geometry);
            for &id in &watcher.members {
                let Some(binding) = self.bindings.get_mut(&id) else {
                    continue;
                };
                if binding.observed.element() != element {
                    continue;
                }

                // Content moving down the viewport means the page scrolled up
                let direction = match binding.last_top {
                    Some(previous) if geometry.top > previous => ScrollDirection::Up,
                    _ => ScrollDirection::Down,
                };
                binding.last_top = Some(geometry.top);

                let kind = if met && !binding.inside {
                    binding.inside = true;
                    match binding.policy {
                        ReentryPolicy::PlayOnce if binding.fired => None,
                        _ => Some(TriggerKind::Enter),
                    }
                } else if !met && binding.inside {
                    binding.inside = false;
                    match binding.policy {
                        ReentryPolicy::PlayAndReverseOnExit => Some(TriggerKind::Exit),
                        _ => None,
                    }
                } else {
                    None
                };

                if let Some(kind) = kind {
                    if kind == TriggerKind::Enter {
                        binding.fired = true;
                    }
                    self.pending.push(TriggerEvent {
                        binding: id,
                        element,
                        kind,
                        direction,
                        policy: binding.policy,
                    });
                }
            }
        }
    }

    /// Take queued events, dropping those whose element left the document.
    pub fn drain_events(&mut self, surface: &dyn Surface) -> Vec<TriggerEvent> {
        let events = std::mem::take(&mut self.pending);
        events
            .into_iter()
            .filter(|event| {
                let attached = surface.is_attached(event.element);
                if !attached {
                    log::debug!(
                        "dropping {:?} for detached element {:?}",
                        event.kind, event.element
                    );
                }
                attached
            })
            .collect()
    }

    pub fn is_bound(&self, id: BindingId) -> bool {
        self.bindings.contains_key(&id)
    }

    pub fn observed(&self, id: BindingId) -> Option<Observed> {
        self.bindings.get(&id).map(|b| b.observed)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Watchers with at least one member.
    pub fn connected_watchers(&self) -> usize {
        self.watchers.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::surface::ElementStore;

    const E: ElementId = ElementId(1);
    const VH: f32 = 1000.0;

    fn at(top: f32) -> Geometry {
        Geometry::new(top, 200.0, VH)
    }

    fn kinds(events: &[TriggerEvent]) -> Vec<TriggerKind> {
        events.iter().map(|e| e.kind).collect()
    }

    /// Scroll the element in, out, in, out, in.
    fn scroll_back_and_forth(triggers: &mut TriggerEvaluator, surface: &ElementStore) -> Vec<TriggerEvent> {
        let mut all = Vec::new();
        for top in [1200.0, 700.0, 900.0, 700.0, 950.0, 600.0] {
            triggers.report(E, at(top));
            all.extend(triggers.drain_events(surface));
        }
        all
    }

    #[test]
    fn shared_thresholds_share_a_watcher() {
        let mut triggers = TriggerEvaluator::new();
        let a = triggers.bind(E, Threshold::TopAt(0.8), ReentryPolicy::PlayOnce).unwrap();
        let b = triggers.bind(ElementId(2), Threshold::TopAt(0.8), ReentryPolicy::PlayOnce).unwrap();
        triggers.bind(ElementId(3), Threshold::TopAt(0.7), ReentryPolicy::PlayOnce).unwrap();
        assert_eq!(triggers.connected_watchers(), 2);

        triggers.release(a);
        assert_eq!(triggers.connected_watchers(), 2);
        triggers.release(b);
        assert_eq!(triggers.connected_watchers(), 1);
        assert!(!triggers.release(b));
    }

    #[test]
    fn play_once_enters_exactly_once() {
        let mut triggers = TriggerEvaluator::new();
        let surface = ElementStore::with_elements([E]);
        triggers.bind(E, Threshold::TopAt(0.8), ReentryPolicy::PlayOnce).unwrap();
        let events = scroll_back_and_forth(&mut triggers, &surface);
        assert_eq!(kinds(&events), vec![TriggerKind::Enter]);
        assert_eq!(events[0].direction, ScrollDirection::Down);
    }

    #[test]
    fn reverse_policy_pairs_enter_and_exit() {
        let mut triggers = TriggerEvaluator::new();
        let surface = ElementStore::with_elements([E]);
        triggers.bind(E, Threshold::TopAt(0.8), ReentryPolicy::PlayAndReverseOnExit).unwrap();
        let events = scroll_back_and_forth(&mut triggers, &surface);
        assert_eq!(
            kinds(&events),
            vec![
                TriggerKind::Enter,
                TriggerKind::Exit,
                TriggerKind::Enter,
                TriggerKind::Exit,
                TriggerKind::Enter,
            ]
        );
        assert_eq!(events[1].direction, ScrollDirection::Up);
        assert_eq!(events[2].direction, ScrollDirection::Down);
    }

    #[test]
    fn replay_enters_on_every_crossing() {
        let mut triggers = TriggerEvaluator::new();
        let surface = ElementStore::with_elements([E]);
        triggers.bind(E, Threshold::TopAt(0.8), ReentryPolicy::ReplayEachEntry).unwrap();
        let events = scroll_back_and_forth(&mut triggers, &surface);
        assert_eq!(kinds(&events), vec![TriggerKind::Enter; 3]);
    }

    #[test]
    fn already_in_view_enters_on_first_sample() {
        let mut triggers = TriggerEvaluator::new();
        let surface = ElementStore::with_elements([E]);
        triggers.bind(E, Threshold::TopAt(0.8), ReentryPolicy::PlayOnce).unwrap();
        triggers.report(E, at(100.0));
        assert_eq!(kinds(&triggers.drain_events(&surface)), vec![TriggerKind::Enter]);
    }

    #[test]
    fn offset_and_ratio_thresholds() {
        let mut triggers = TriggerEvaluator::new();
        let surface = ElementStore::with_elements([E]);
        triggers.bind(E, Threshold::TopAtOffset(300.0), ReentryPolicy::PlayOnce).unwrap();
        triggers.bind(E, Threshold::Ratio(0.5), ReentryPolicy::PlayOnce).unwrap();

        // 100 of 200 px visible: ratio met, offset not
        triggers.report(E, at(900.0));
        assert_eq!(triggers.drain_events(&surface).len(), 1);
        triggers.report(E, at(250.0));
        assert_eq!(triggers.drain_events(&surface).len(), 1);
    }

    #[test]
    fn detached_element_events_are_dropped() {
        let mut triggers = TriggerEvaluator::new();
        let mut surface = ElementStore::with_elements([E]);
        triggers.bind(E, Threshold::TopAt(0.8), ReentryPolicy::PlayOnce).unwrap();
        triggers.report(E, at(100.0));
        surface.detach(E);
        assert!(triggers.drain_events(&surface).is_empty());
        assert_eq!(triggers.pending_count(), 0);
    }

    #[test]
    fn forget_releases_bindings_and_pending_events() {
        let mut triggers = TriggerEvaluator::new();
        let surface = ElementStore::with_elements([E, ElementId(2)]);
        triggers.bind(E, Threshold::TopAt(0.8), ReentryPolicy::ReplayEachEntry).unwrap();
        let other = triggers.bind(ElementId(2), Threshold::TopAt(0.5), ReentryPolicy::PlayOnce).unwrap();
        triggers.report(E, at(100.0));

        assert_eq!(triggers.forget(E).len(), 1);
        assert_eq!(triggers.connected_watchers(), 1);
        assert!(triggers.drain_events(&surface).is_empty());
        assert!(triggers.is_bound(other));
    }

    #[test]
    fn bind_handle_requires_registration() {
        let mut triggers = TriggerEvaluator::new();
        let registry = Registry::new();
        let err = triggers
            .bind_handle(&registry, AnimHandle(4), Threshold::default(), ReentryPolicy::PlayOnce)
            .unwrap_err();
        assert!(matches!(err, RevealError::UnknownHandle(AnimHandle(4))));
    }

    #[test]
    fn invalid_ratio_is_rejected() {
        let mut triggers = TriggerEvaluator::new();
        assert!(triggers.bind(E, Threshold::Ratio(1.5), ReentryPolicy::PlayOnce).is_err());
        assert_eq!(triggers.connected_watchers(), 0);
    }
}
