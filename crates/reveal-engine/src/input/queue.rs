use glam::Vec2;

use crate::api::types::{ElementId, Rect};
use crate::systems::trigger::Geometry;

/// Host notifications the context understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportEvent {
    /// Fresh layout sample for an observed element (scroll, resize, load).
    Geometry { element: ElementId, geometry: Geometry },
    /// The element left the document.
    Detached { element: ElementId },
    /// Pointer moved over an element with the given bounds.
    PointerMove { element: ElementId, pointer: Vec2, bounds: Rect },
    /// Pointer left an element.
    PointerLeave { element: ElementId },
}

/// Host events waiting for the next frame.
/// The bridge pushes from JS callbacks; the runner drains once per frame.
#[derive(Debug, Default)]
pub struct ViewportQueue {
    events: Vec<ViewportEvent>,
}

impl ViewportQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(32),
        }
    }

    pub fn push(&mut self, event: ViewportEvent) {
        self.events.push(event);
    }

    /// Drain all pending events. Returns a Vec and clears the queue.
    pub fn drain(&mut self) -> Vec<ViewportEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ViewportEvent> {
        self.events.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}
