//! Application event loop.
//!
//! Bridges winit and the platform-agnostic [`FrameLoop`]: window and pointer
//! events become [`HostEvent`]s on the corridor's queue, and every
//! `RedrawRequested` runs one tick and asks for the next redraw.
//!
//! # Lifecycle
//!
//! 1. `run` validates the configuration and builds the [`Corridor`]
//! 2. `resumed` creates the window and the GPU [`Context`]
//!    (asynchronously on the web, blocking natively)
//! 3. once the context exists, texture loads are started and the first
//!    frame is requested
//! 4. each redraw ticks the frame loop until the window closes or the
//!    surface becomes unavailable

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

use crate::{
    config::CorridorConfig,
    context::Context,
    corridor::Corridor,
    error::CorridorError,
    frame::{FrameLoop, FrameScheduler, HostEvent},
    input::PointerTracker,
    scroll::SystemClock,
};

/// Schedules the next frame through the window's redraw request.
struct RedrawScheduler<'a>(&'a Window);

impl FrameScheduler for RedrawScheduler<'_> {
    fn next_frame(&mut self) -> bool {
        self.0.request_redraw();
        true
    }
}

pub(crate) enum FlowEvent {
    /// Context creation finished on the web; sent from `spawn_local`.
    #[allow(dead_code)]
    Initialized(Result<Box<Context>, CorridorError>),
}

impl std::fmt::Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(Ok(_)) => f.write_str("Initialized(Ok(Context))"),
            Self::Initialized(Err(e)) => f.debug_tuple("Initialized").field(e).finish(),
        }
    }
}

struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: EventLoopProxy<FlowEvent>,
    window_title: String,
    window_size: LogicalSize<u32>,
    corridor: Corridor,
    frame_loop: FrameLoop<SystemClock>,
    ctx: Option<Context>,
    pointer: PointerTracker,
    error: Option<CorridorError>,
}

impl App {
    fn new(
        event_loop: &EventLoop<FlowEvent>,
        config: &CorridorConfig,
        corridor: Corridor,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            window_title: config.window.title.clone(),
            window_size: LogicalSize::new(config.window.width, config.window.height),
            corridor,
            frame_loop: FrameLoop::new(SystemClock::new()),
            ctx: None,
            pointer: PointerTracker::new(),
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: CorridorError) {
        log::error!("{error}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn initialized(&mut self, event_loop: &ActiveEventLoop, ctx: Result<Context, CorridorError>) {
        let ctx = match ctx {
            Ok(ctx) => ctx,
            Err(e) => return self.fail(event_loop, e),
        };

        let window = ctx.window().clone();
        let scale_factor = window.scale_factor();
        let size = window.inner_size().to_logical::<f64>(scale_factor);
        self.corridor
            .events
            .push(HostEvent::PixelDensity(scale_factor));
        self.corridor.events.push(HostEvent::Resized {
            width: size.width,
            height: size.height,
        });

        #[cfg(not(target_arch = "wasm32"))]
        self.corridor.request_assets(self.async_runtime.handle());
        #[cfg(target_arch = "wasm32")]
        self.corridor.request_assets();

        self.ctx = Some(ctx);
        window.request_redraw();
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.ctx.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes()
            .with_title(self.window_title.clone())
            .with_inner_size(self.window_size);

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID));
            match canvas {
                Some(canvas) => {
                    window_attributes = window_attributes.with_canvas(Some(canvas.unchecked_into()));
                }
                None => log::warn!("No #{CANVAS_ID} element, letting winit create one"),
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                return self.fail(event_loop, CorridorError::SurfaceUnavailable(e.to_string()));
            }
        };

        let scene = self.corridor.scene.clone();
        let rig = self.corridor.rig.clone();
        let init_future = async move { Context::new(window, &scene, &rig).await };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let ctx = self.async_runtime.block_on(init_future);
            self.initialized(event_loop, ctx);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let ctx = init_future.await.map(Box::new);
                if proxy.send_event(FlowEvent::Initialized(ctx)).is_err() {
                    log::error!("Event loop closed before the context was ready");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            FlowEvent::Initialized(ctx) => self.initialized(event_loop, ctx.map(|ctx| *ctx)),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let ctx = match &mut self.ctx {
            Some(ctx) => ctx,
            None => return,
        };
        let scale_factor = ctx.window().scale_factor();

        if let Some(host_event) = self.pointer.handle(&event, scale_factor) {
            self.corridor.events.push(host_event);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                let size = size.to_logical::<f64>(scale_factor);
                self.corridor.events.push(HostEvent::Resized {
                    width: size.width,
                    height: size.height,
                });
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.corridor
                    .events
                    .push(HostEvent::PixelDensity(scale_factor));
            }
            WindowEvent::RedrawRequested => {
                match self.frame_loop.tick(&mut self.corridor, ctx) {
                    Ok(()) => {
                        RedrawScheduler(ctx.window()).next_frame();
                    }
                    Err(e) => self.fail(event_loop, e),
                }
            }
            _ => {}
        }
    }
}

/// Open a window and scroll the corridor until it is closed.
///
/// Returns the error that stopped the frame loop, if any.
pub fn run(config: CorridorConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info)?;
    }

    let corridor = Corridor::new(&config)?;

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, &config, corridor)?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
