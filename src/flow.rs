//! Application event loop.
//!
//! [`run`] opens a window (natively) or mounts a canvas into the container
//! element (wasm), builds a [`ViewerContext`] around a [`WgpuRenderer`], hands
//! it to the caller's setup closure once and then drives
//! [`ViewerContext::frame`] on every redraw until the [`LoopHandle`] is
//! stopped or the window closes.
//!
//! # Lifecycle
//!
//! 1. `resumed`: create the window, set up the GPU (blocking natively, as a
//!    spawned future on wasm) and build the context
//! 2. `window_event`: feed input to the orbit controls, resize on `Resized`,
//!    render on `RedrawRequested`
//! 3. `about_to_wait`: request the next redraw while the loop handle is running

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

use crate::{
    config::ViewerConfig,
    context::ViewerContext,
    error::ViewerError,
    render::{SceneRenderer, WgpuRenderer},
    resources::ResourceTracker,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Cancellation flag of the frame loop. Clones share the flag.
#[derive(Clone, Debug)]
pub struct LoopHandle(Arc<AtomicBool>);

impl LoopHandle {
    /// A running handle.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// No further frames are scheduled after the current one.
    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Re-arms the loop; the next frame is requested on the next event-loop wake-up.
    pub fn resume(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for LoopHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Called once with the freshly initialized context, before the first frame.
pub type Setup = Box<dyn FnOnce(&mut ViewerContext<WgpuRenderer>)>;

pub(crate) enum ViewerEvent {
    #[allow(dead_code)]
    Initialized(Box<ViewerContext<WgpuRenderer>>),
    #[allow(dead_code)]
    Failed(ViewerError),
}

impl std::fmt::Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

/// Frames per second, logged at debug level every few seconds.
#[derive(Debug)]
struct FrameStats {
    since: Instant,
    frames: u32,
}

impl FrameStats {
    const PERIOD: Duration = Duration::from_secs(5);

    fn new() -> Self {
        Self {
            since: Instant::now(),
            frames: 0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let elapsed = self.since.elapsed();
        if elapsed >= Self::PERIOD {
            log::debug!("{:.1} fps", self.frames as f64 / elapsed.as_secs_f64());
            self.frames = 0;
            self.since = Instant::now();
        }
    }
}

struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    proxy: EventLoopProxy<ViewerEvent>,
    config: ViewerConfig,
    setup: Option<Setup>,
    window: Option<Arc<Window>>,
    viewer: Option<ViewerContext<WgpuRenderer>>,
    #[cfg(target_arch = "wasm32")]
    container: Option<(web_sys::Document, web_sys::Element)>,
    stats: FrameStats,
    error: Option<ViewerError>,
}

impl App {
    fn new(
        event_loop: &EventLoop<ViewerEvent>,
        config: ViewerConfig,
        setup: Setup,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            config,
            setup: Some(setup),
            window: None,
            viewer: None,
            #[cfg(target_arch = "wasm32")]
            container: None,
            stats: FrameStats::new(),
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: ViewerError) {
        log::error!("viewer failed: {error}");
        if let Some(viewer) = &self.viewer {
            viewer.loop_handle.stop();
        }
        self.error = Some(error);
        event_loop.exit();
    }

    /// Finishes initialization once the renderer exists.
    fn start(&mut self, mut viewer: ViewerContext<WgpuRenderer>) {
        #[cfg(target_arch = "wasm32")]
        if let Some((document, container)) = &self.container {
            if let Err(e) = viewer.label_renderer.mount(document, container) {
                log::error!("label overlay could not be mounted: {e}");
            }
        }
        if let Some(window) = &self.window {
            let (width, height) = logical_size(window.inner_size(), window.scale_factor());
            viewer.resize(width, height);
        }
        if let Some(setup) = self.setup.take() {
            setup(&mut viewer);
        }
        self.viewer = Some(viewer);
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Converts a window size to the logical pixels the viewer is sized in.
fn logical_size(size: PhysicalSize<u32>, scale_factor: f64) -> (u32, u32) {
    let logical = size.to_logical::<f64>(scale_factor);
    (logical.width.round() as u32, logical.height.round() as u32)
}

/// Looks up the element the viewer mounts into.
#[cfg(target_arch = "wasm32")]
pub fn find_container(id: &str) -> crate::error::Result<(web_sys::Document, web_sys::Element)> {
    let window = web_sys::window().ok_or_else(|| ViewerError::Dom("no global window".into()))?;
    let document = window
        .document()
        .ok_or_else(|| ViewerError::Dom("window has no document".into()))?;
    let container = document
        .get_element_by_id(id)
        .ok_or_else(|| ViewerError::ContainerMissing(id.to_string()))?;
    Ok((document, container))
}

#[cfg(target_arch = "wasm32")]
pub fn append_canvas(
    document: &web_sys::Document,
    container: &web_sys::Element,
) -> crate::error::Result<web_sys::HtmlCanvasElement> {
    let canvas: web_sys::HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(|e| ViewerError::Dom(format!("{e:?}")))?
        .dyn_into()
        .map_err(|_| ViewerError::Dom("created element is not a canvas".into()))?;
    container
        .append_child(&canvas)
        .map_err(|e| ViewerError::Dom(format!("{e:?}")))?;
    Ok(canvas)
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes()
            .with_title("orbit-viewer")
            .with_inner_size(LogicalSize::new(
                self.config.width.max(1),
                self.config.height.max(1),
            ));

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            let mounted = find_container(&self.config.container_id).and_then(|(document, container)| {
                let canvas = append_canvas(&document, &container)?;
                Ok((document, container, canvas))
            });
            match mounted {
                Ok((document, container, canvas)) => {
                    window_attributes = window_attributes.with_canvas(Some(canvas));
                    self.container = Some((document, container));
                }
                Err(e) => return self.fail(event_loop, e),
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, ViewerError::Gpu(format!("window: {e}"))),
        };
        self.window = Some(window.clone());

        let config = self.config.clone();
        let tracker = ResourceTracker::new();
        let scale_factor = window.scale_factor();
        let size = logical_size(window.inner_size(), scale_factor);
        let init = async move {
            let renderer = WgpuRenderer::new(
                window,
                size,
                scale_factor,
                config.renderer.clone(),
                tracker.clone(),
            )
            .await?;
            Ok::<_, ViewerError>(ViewerContext::new(config, renderer, tracker))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init) {
                Ok(viewer) => self.start(viewer),
                Err(e) => self.fail(event_loop, e),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init.await {
                    Ok(viewer) => ViewerEvent::Initialized(Box::new(viewer)),
                    Err(e) => ViewerEvent::Failed(e),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("event loop closed before the viewer finished initializing");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Initialized(viewer) => self.start(*viewer),
            ViewerEvent::Failed(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(viewer) = &mut self.viewer else {
            if let WindowEvent::CloseRequested = event {
                event_loop.exit();
            }
            return;
        };

        let scale_factor = self.window.as_ref().map_or(1.0, |w| w.scale_factor());
        viewer
            .controls
            .handle_window_event(&viewer.camera, &event, scale_factor);

        match event {
            WindowEvent::CloseRequested => {
                viewer.loop_handle.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let (width, height) = logical_size(size, scale_factor);
                viewer.resize(width, height);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if viewer.config.renderer.pixel_ratio.is_none() {
                    viewer.renderer.set_pixel_ratio(scale_factor);
                }
            }
            WindowEvent::RedrawRequested => {
                if !viewer.loop_handle.is_running() {
                    return;
                }
                match viewer.frame() {
                    Ok(()) => self.stats.tick(),
                    Err(ViewerError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                        self.fail(event_loop, wgpu::SurfaceError::OutOfMemory.into())
                    }
                    Err(e) => log::error!("frame failed: {e}"),
                }
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let (Some(window), Some(viewer)) = (&self.window, &self.viewer) {
            if viewer.loop_handle.is_running() {
                window.request_redraw();
            }
        }
    }
}

/// Opens the viewer and blocks until its window is closed (natively).
///
/// `setup` receives the initialized context once, e.g. to add content.
pub fn run(
    config: ViewerConfig,
    setup: impl FnOnce(&mut ViewerContext<WgpuRenderer>) + 'static,
) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        // a second viewer on the same page finds the logger already set
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            log::debug!("console logger already set: {e}");
        }
    }

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config, Box::new(setup))?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Browser entry point: mounts the viewer into the element with `container_id`
/// (default `container-3d`).
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = startViewer)]
pub fn start_viewer(container_id: Option<String>) -> Result<(), JsValue> {
    let mut config = ViewerConfig::default();
    if let Some(id) = container_id {
        config.container_id = id;
    }
    run(config, |_| ()).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_handle_stops_and_resumes() {
        let handle = LoopHandle::new();
        assert!(handle.is_running());
        let shared = handle.clone();
        shared.stop();
        assert!(!handle.is_running());
        handle.resume();
        assert!(shared.is_running());
    }

    #[test]
    fn window_sizes_are_converted_to_logical_pixels() {
        assert_eq!(logical_size(PhysicalSize::new(1600, 1200), 2.0), (800, 600));
        assert_eq!(logical_size(PhysicalSize::new(1001, 750), 1.5), (667, 500));
        assert_eq!(logical_size(PhysicalSize::new(640, 480), 1.0), (640, 480));
    }

    #[test]
    fn default_handle_is_running() {
        assert!(LoopHandle::default().is_running());
    }
}
