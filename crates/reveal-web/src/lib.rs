pub mod runner;

pub use runner::PageRunner;

#[doc(hidden)]
pub use {console_error_panic_hook, console_log, log, reveal_engine};

/// Generate all `#[wasm_bindgen]` exports for a page.
///
/// Generates:
/// - `thread_local!` storage for the PageRunner
/// - `with_runner()` helper, a no-op (with a warning) before `page_init`
/// - All wasm-bindgen exports (page_init, page_tick, viewport and pointer
///   handlers, write buffer and text accessors)
///
/// # Usage
///
/// ```ignore
/// use wasm_bindgen::prelude::*;
///
/// mod landing;
/// use landing::Landing;
///
/// reveal_web::export_page!(Landing, "landing");
/// ```
///
/// # Arguments
///
/// - `$page_type`: The page struct type that implements `reveal_engine::Page`
///   and has a `new()` constructor
/// - `$page_name`: A string literal used in log messages
#[macro_export]
macro_rules! export_page {
    ($page_type:ty, $page_name:literal) => {
        use std::cell::RefCell;

        thread_local! {
            static RUNNER: RefCell<Option<$crate::PageRunner<$page_type>>> = RefCell::new(None);
        }

        fn with_runner<R: Default>(f: impl FnOnce(&mut $crate::PageRunner<$page_type>) -> R) -> R {
            RUNNER.with(|cell| match cell.borrow_mut().as_mut() {
                Some(runner) => f(runner),
                None => {
                    $crate::log::warn!("{}: not initialized, call page_init() first", $page_name);
                    R::default()
                }
            })
        }

        #[wasm_bindgen]
        pub fn page_init(element_ids: &[u32]) -> bool {
            $crate::console_error_panic_hook::set_once();
            let _ = $crate::console_log::init_with_level($crate::log::Level::Info);

            let runner = $crate::PageRunner::new(<$page_type>::new());
            RUNNER.with(|cell| {
                *cell.borrow_mut() = Some(runner);
            });

            with_runner(|r| match r.init(element_ids) {
                Ok(()) => {
                    $crate::log::info!("{}: initialized with {} elements", $page_name, element_ids.len());
                    true
                }
                Err(err) => {
                    $crate::log::error!("{}: init failed: {}", $page_name, err);
                    false
                }
            })
        }

        #[wasm_bindgen]
        pub fn page_mount_manifest(json: &str) -> u32 {
            with_runner(|r| match r.load_manifest(json) {
                Ok(mounted) => mounted as u32,
                Err(err) => {
                    $crate::log::error!("{}: manifest rejected: {}", $page_name, err);
                    0
                }
            })
        }

        #[wasm_bindgen]
        pub fn page_tick(dt: f32) {
            with_runner(|r| r.tick(dt));
        }

        #[wasm_bindgen]
        pub fn page_report_geometry(element: u32, top: f32, height: f32, viewport_height: f32) {
            let geometry = $crate::reveal_engine::Geometry::new(top, height, viewport_height);
            with_runner(|r| {
                r.push_event($crate::reveal_engine::ViewportEvent::Geometry {
                    element: $crate::reveal_engine::ElementId(element),
                    geometry,
                })
            });
        }

        #[wasm_bindgen]
        pub fn page_detach(element: u32) {
            with_runner(|r| {
                r.push_event($crate::reveal_engine::ViewportEvent::Detached {
                    element: $crate::reveal_engine::ElementId(element),
                })
            });
        }

        #[wasm_bindgen]
        pub fn page_pointer_move(element: u32, x: f32, y: f32, left: f32, top: f32, width: f32, height: f32) {
            with_runner(|r| {
                r.push_event($crate::reveal_engine::ViewportEvent::PointerMove {
                    element: $crate::reveal_engine::ElementId(element),
                    pointer: $crate::reveal_engine::glam::Vec2::new(x, y),
                    bounds: $crate::reveal_engine::Rect::new(left, top, width, height),
                })
            });
        }

        #[wasm_bindgen]
        pub fn page_pointer_leave(element: u32) {
            with_runner(|r| {
                r.push_event($crate::reveal_engine::ViewportEvent::PointerLeave {
                    element: $crate::reveal_engine::ElementId(element),
                })
            });
        }

        #[wasm_bindgen]
        pub fn page_release() {
            with_runner(|r| r.release());
            $crate::log::info!("{}: released", $page_name);
        }

        // ---- Data accessors ----

        #[wasm_bindgen]
        pub fn get_writes_ptr() -> *const f32 {
            RUNNER.with(|cell| match cell.borrow().as_ref() {
                Some(r) => r.writes_ptr(),
                None => std::ptr::null(),
            })
        }

        #[wasm_bindgen]
        pub fn get_writes_len() -> u32 {
            with_runner(|r| r.writes_len())
        }

        #[wasm_bindgen]
        pub fn get_buffer_total_floats() -> u32 {
            with_runner(|r| r.buffer_total_floats())
        }

        #[wasm_bindgen]
        pub fn get_dirty_text_ptr() -> *const u32 {
            RUNNER.with(|cell| match cell.borrow().as_ref() {
                Some(r) => r.dirty_text_ptr(),
                None => std::ptr::null(),
            })
        }

        #[wasm_bindgen]
        pub fn get_dirty_text_len() -> u32 {
            with_runner(|r| r.dirty_text_len())
        }

        #[wasm_bindgen]
        pub fn get_text(element: u32) -> String {
            with_runner(|r| r.text(element))
        }
    };
}
