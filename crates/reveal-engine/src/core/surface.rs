use crate::api::types::{ElementId, Property, PropertyMap, PropertyWrite};

/// Where interpolated values land.
///
/// The engine never touches the document directly; the host (or a test)
/// implements this and decides what "apply" means.
pub trait Surface {
    /// Write one property value. Unknown or detached elements ignore writes.
    fn set_value(&mut self, element: ElementId, property: Property, value: f32);

    /// Last value written for `property`, if any.
    fn value(&self, element: ElementId, property: Property) -> Option<f32>;

    /// Replace the text content of an element.
    fn set_text(&mut self, element: ElementId, text: &str);

    /// Whether the element is still part of the document.
    fn is_attached(&self, element: ElementId) -> bool;
}

/// State held for one element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementState {
    pub id: ElementId,
    pub attached: bool,
    pub values: PropertyMap,
    pub text: String,
}

impl ElementState {
    pub fn new(id: ElementId) -> Self {
        Self {
            id,
            attached: true,
            values: PropertyMap::new(),
            text: String::new(),
        }
    }
}

/// In-memory surface using a flat Vec.
/// Designed for page-sized element counts (hundreds, not millions).
///
/// Every accepted write is also journaled so a bridge can forward the
/// frame's changes to the host in one buffer.
#[derive(Debug, Default)]
pub struct ElementStore {
    elements: Vec<ElementState>,
    writes: Vec<PropertyWrite>,
    dirty_text: Vec<ElementId>,
}

impl ElementStore {
    pub fn new() -> Self {
        Self {
            elements: Vec::with_capacity(64),
            writes: Vec::with_capacity(256),
            dirty_text: Vec::new(),
        }
    }

    /// Store pre-populated with attached elements.
    pub fn with_elements(ids: impl IntoIterator<Item = ElementId>) -> Self {
        let mut store = Self::new();
        for id in ids {
            store.insert(id);
        }
        store
    }

    /// Attach an element. Re-inserting a detached element re-attaches it.
    pub fn insert(&mut self, id: ElementId) {
        match self.get_mut(id) {
            Some(state) => state.attached = true,
            None => self.elements.push(ElementState::new(id)),
        }
    }

    /// Mark an element as removed from the document. Values are kept.
    pub fn detach(&mut self, id: ElementId) -> bool {
        match self.get_mut(id) {
            Some(state) => {
                state.attached = false;
                true
            }
            None => false,
        }
    }

    /// Forget an element entirely.
    pub fn remove(&mut self, id: ElementId) -> Option<ElementState> {
        let idx = self.elements.iter().position(|e| e.id == id)?;
        Some(self.elements.swap_remove(idx))
    }

    pub fn get(&self, id: ElementId) -> Option<&ElementState> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut ElementState> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    /// Text content, or "" for unknown elements.
    pub fn text(&self, id: ElementId) -> &str {
        self.get(id).map(|e| e.text.as_str()).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementState> {
        self.elements.iter()
    }

    /// Take the writes journaled since the last drain.
    pub fn drain_writes(&mut self) -> Vec<PropertyWrite> {
        std::mem::take(&mut self.writes)
    }

    /// Take the ids whose text changed since the last drain.
    pub fn drain_dirty_text(&mut self) -> Vec<ElementId> {
        std::mem::take(&mut self.dirty_text)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.writes.clear();
        self.dirty_text.clear();
    }
}

impl Surface for ElementStore {
    fn set_value(&mut self, element: ElementId, property: Property, value: f32) {
        let Some(state) = self.elements.iter_mut().find(|e| e.id == element) else {
            return;
        };
        if !state.attached {
            return;
        }
        state.values.insert(property, value);
        self.writes.push(PropertyWrite::new(element, property, value));
    }

    fn value(&self, element: ElementId, property: Property) -> Option<f32> {
        self.get(element).and_then(|e| e.values.get(&property).copied())
    }

    fn set_text(&mut self, element: ElementId, text: &str) {
        let Some(state) = self.elements.iter_mut().find(|e| e.id == element) else {
            return;
        };
        if !state.attached || state.text == text {
            return;
        }
        state.text.clear();
        state.text.push_str(text);
        if !self.dirty_text.contains(&element) {
            self.dirty_text.push(element);
        }
    }

    fn is_attached(&self, element: ElementId) -> bool {
        self.get(element).is_some_and(|e| e.attached)
    }
}
