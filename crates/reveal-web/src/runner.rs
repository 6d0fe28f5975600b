use reveal_engine::bridge::protocol::check_wire_id;
use reveal_engine::{
    EffectContext, ElementId, ElementStore, EngineConfig, Page, Result, RevealManifest, ViewportEvent, ViewportQueue,
    WriteBuffer,
};

/// Generic page runner that wires the engine to the browser frame loop.
///
/// Each concrete page creates a `thread_local!` PageRunner and exports free
/// functions via `#[wasm_bindgen]`, because wasm-bindgen cannot export
/// generic structs directly.
pub struct PageRunner<P: Page> {
    page: P,
    ctx: EffectContext,
    surface: ElementStore,
    queue: ViewportQueue,
    buffer: WriteBuffer,
    config: EngineConfig,
    frame: u32,
    initialized: bool,
    /// Ids whose text changed during the last frame.
    dirty_text: Vec<u32>,
}

impl<P: Page> PageRunner<P> {
    pub fn new(page: P) -> Self {
        let config = page.config();
        let buffer = WriteBuffer::new(config.max_writes);
        Self {
            page,
            ctx: EffectContext::new(config.clone()),
            surface: ElementStore::new(),
            queue: ViewportQueue::new(),
            buffer,
            config,
            frame: 0,
            initialized: false,
            dirty_text: Vec::new(),
        }
    }

    /// Make elements known, then let the page declare its effects.
    pub fn init(&mut self, element_ids: &[u32]) -> Result<()> {
        for &id in element_ids {
            check_wire_id(ElementId(id))?;
        }
        for &id in element_ids {
            self.surface.insert(ElementId(id));
        }
        self.page.init(&mut self.ctx, &mut self.surface)?;
        self.initialized = true;
        Ok(())
    }

    /// Mount the marked regions of a JSON manifest into the running context.
    /// Manifest config is ignored here; the page's config is already live.
    pub fn load_manifest(&mut self, json: &str) -> Result<usize> {
        let manifest = RevealManifest::from_json(json)?;
        if manifest.config.is_some() {
            log::warn!("manifest config ignored: page config is already in use");
        }
        let ids = manifest.element_ids();
        for &id in &ids {
            check_wire_id(id)?;
        }
        for id in ids {
            if self.surface.get(id).is_none() {
                self.surface.insert(id);
            }
        }
        let mut mounted = 0;
        for root in &manifest.regions {
            mounted += self.ctx.mount_region(root, &mut self.surface)?;
        }
        Ok(mounted)
    }

    /// Queue a host event for the next frame. Detachment takes effect on the
    /// surface at once so no later write can reach the element.
    pub fn push_event(&mut self, event: ViewportEvent) {
        if let ViewportEvent::Detached { element } = event {
            self.surface.detach(element);
        }
        self.queue.push(event);
    }

    /// Run one frame: host events, page hook, engine tick, then pack writes.
    pub fn tick(&mut self, dt: f32) {
        if !self.initialized {
            return;
        }
        for event in self.queue.drain() {
            self.ctx.handle(event, &mut self.surface);
        }
        self.page.update(&mut self.ctx, &mut self.surface, dt);
        self.ctx.tick(dt, &mut self.surface);

        self.frame = self.frame.wrapping_add(1);
        let writes = self.surface.drain_writes();
        self.buffer.pack(self.frame, &writes);
        self.dirty_text = self.surface.drain_dirty_text().into_iter().map(|id| id.0).collect();
    }

    /// Tear the context down. Further ticks write nothing.
    pub fn release(&mut self) {
        self.ctx.release();
        self.queue.drain();
    }

    pub fn context(&self) -> &EffectContext {
        &self.ctx
    }

    pub fn surface(&self) -> &ElementStore {
        &self.surface
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---- Pointer accessors for host reads ----

    pub fn writes_ptr(&self) -> *const f32 {
        self.buffer.as_ptr()
    }

    pub fn writes_len(&self) -> u32 {
        self.buffer.write_count() as u32
    }

    pub fn buffer_total_floats(&self) -> u32 {
        self.buffer.len_floats() as u32
    }

    pub fn dirty_text_ptr(&self) -> *const u32 {
        self.dirty_text.as_ptr()
    }

    pub fn dirty_text_len(&self) -> u32 {
        self.dirty_text.len() as u32
    }

    pub fn text(&self, id: u32) -> String {
        self.surface.text(ElementId(id)).to_string()
    }
}
