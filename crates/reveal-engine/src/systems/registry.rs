//! Animatable registry: which regions are candidates for animation and what
//! they declared. Pure bookkeeping: nothing here schedules or touches the surface.

use std::collections::BTreeMap;

use crate::api::error::Result;
use crate::api::types::{AnimHandle, ElementId, PropertyMap};
use crate::components::animatable::{validate_states, AnimatableElement, AnimationSpec};

#[derive(Debug, Default)]
pub struct Registry {
    elements: BTreeMap<AnimHandle, AnimatableElement>,
    next_id: u32,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a region. Fails when the two states declare different
    /// property keys or the timing is unusable.
    pub fn register(
        &mut self,
        element: ElementId,
        initial: PropertyMap,
        target: PropertyMap,
        spec: AnimationSpec,
    ) -> Result<AnimHandle> {
        validate_states(&initial, &target)?;
        spec.validate()?;

        let handle = AnimHandle(self.next_id);
        self.next_id += 1;
        self.elements.insert(
            handle,
            AnimatableElement {
                handle,
                element,
                initial,
                target,
                spec,
            },
        );
        Ok(handle)
    }

    /// Remove a registration. Unknown or already-removed handles are a no-op.
    pub fn unregister(&mut self, handle: AnimHandle) -> Option<AnimatableElement> {
        self.elements.remove(&handle)
    }

    /// Remove every registration for an element.
    pub fn unregister_element(&mut self, element: ElementId) -> usize {
        let before = self.elements.len();
        self.elements.retain(|_, e| e.element != element);
        before - self.elements.len()
    }

    pub fn get(&self, handle: AnimHandle) -> Option<&AnimatableElement> {
        self.elements.get(&handle)
    }

    pub fn is_registered(&self, handle: AnimHandle) -> bool {
        self.elements.contains_key(&handle)
    }

    /// Registrations in handle (registration) order.
    pub fn iter(&self) -> impl Iterator<Item = &AnimatableElement> {
        self.elements.values()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{props, Property};
    use crate::extensions::easing::Easing;

    fn fade() -> (PropertyMap, PropertyMap) {
        (props([(Property::Opacity, 0.0)]), props([(Property::Opacity, 1.0)]))
    }

    #[test]
    fn register_and_get() {
        let mut registry = Registry::new();
        let (initial, target) = fade();
        let handle = registry
            .register(ElementId(7), initial, target, AnimationSpec::default())
            .unwrap();
        let entry = registry.get(handle).unwrap();
        assert_eq!(entry.element, ElementId(7));
        assert_eq!(entry.target[&Property::Opacity], 1.0);
    }

    #[test]
    fn mismatched_keys_fail_at_registration() {
        let mut registry = Registry::new();
        let err = registry
            .register(
                ElementId(1),
                props([(Property::Opacity, 0.0), (Property::TranslateY, 50.0)]),
                props([(Property::Opacity, 1.0)]),
                AnimationSpec::default(),
            )
            .unwrap_err();
        assert!(err.is_invalid_spec());
        assert!(registry.is_empty());
    }

    #[test]
    fn zero_duration_fails() {
        let mut registry = Registry::new();
        let (initial, target) = fade();
        let result = registry.register(ElementId(1), initial, target, AnimationSpec::new(0.0, Easing::Linear));
        assert!(result.unwrap_err().is_invalid_spec());
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut registry = Registry::new();
        let (initial, target) = fade();
        let handle = registry
            .register(ElementId(1), initial, target, AnimationSpec::default())
            .unwrap();
        assert!(registry.unregister(handle).is_some());
        assert!(registry.unregister(handle).is_none());
        assert!(registry.unregister(AnimHandle(99)).is_none());
        assert!(!registry.is_registered(handle));
    }

    #[test]
    fn handles_are_not_reused() {
        let mut registry = Registry::new();
        let (initial, target) = fade();
        let a = registry
            .register(ElementId(1), initial.clone(), target.clone(), AnimationSpec::default())
            .unwrap();
        registry.unregister(a);
        let b = registry
            .register(ElementId(1), initial, target, AnimationSpec::default())
            .unwrap();
        assert_ne!(a, b);
    }
}
