use anyhow::{Context, Result};
use ouroboros::self_referencing;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::input::translate::translate_window_event;
use crate::input::{InputFrame, InputState};
use crate::render::{GpuApi, RenderContext, WgpuApi};
use crate::time::FrameClock;

use super::runtime::{RuntimeConfig, RuntimeCtx};

/// Everything one window owns. `Gpu` borrows the window, hence the
/// self-referencing struct.
#[self_referencing]
pub(super) struct WindowEntry {
    input: InputState,
    input_frame: InputFrame,
    clock: FrameClock,
    /// Created on the first redraw.
    render: Option<RenderContext<WgpuApi>>,

    window: Window,
    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

impl WindowEntry {
    pub(super) fn open(
        event_loop: &ActiveEventLoop,
        config: RuntimeConfig,
        gpu_init: GpuInit,
    ) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title(config.title)
            .with_inner_size(config.initial_size);
        let window = event_loop.create_window(attrs).context("creating window")?;

        WindowEntryTryBuilder {
            input: InputState::default(),
            input_frame: InputFrame::default(),
            clock: FrameClock::default(),
            render: None,
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("initializing GPU for window")
    }

    pub(super) fn id(&self) -> WindowId {
        self.with_window(|w| w.id())
    }

    pub(super) fn request_redraw(&self) {
        self.with_window(|w| w.request_redraw());
    }

    /// Folds a pointer or focus event into this window's input state.
    pub(super) fn record_input(&mut self, event: &WindowEvent) {
        self.with_mut(|fields| {
            if let Some(ev) = translate_window_event(fields.input, event) {
                fields.input.apply_event(fields.input_frame, ev);
            }
        });
    }

    /// Reconfigures the swapchain and the screen viewport to the window's size.
    pub(super) fn sync_size(&mut self) {
        self.with_mut(|fields| {
            let size = fields.window.inner_size();
            fields.gpu.resize(size);
            if let Some(render) = fields.render.as_mut() {
                render.api_mut().resize(size.width, size.height);
            }
            fields.window.request_redraw();
        });
    }

    /// Runs one frame of `app` on this window.
    ///
    /// A lost device is replaced first and the app told about it.
    pub(super) fn redraw<A: App>(&mut self, app: &mut A, runtime: &mut RuntimeCtx) -> AppControl {
        self.with_mut(|fields| {
            let id = fields.window.id();
            let gpu = fields.gpu;
            let render = fields.render.get_or_insert_with(|| RenderContext::new(wgpu_api(gpu)));

            if render.is_lost() || render.api().is_context_lost() {
                if let Err(e) = gpu.recreate_device() {
                    log::error!("window {id:?}: lost device could not be replaced: {e:#}");
                    return AppControl::Exit;
                }
                render.restore(wgpu_api(gpu));
                app.on_context_restored(id, render.generation());
            }

            let mut ctx = FrameCtx {
                window: WindowCtx { id, window: fields.window },
                gpu,
                render,
                input: fields.input,
                input_frame: fields.input_frame,
                time: fields.clock.tick(),
                runtime,
            };
            let control = app.on_frame(&mut ctx);
            fields.input_frame.clear();
            control
        })
    }
}

fn wgpu_api(gpu: &Gpu<'_>) -> WgpuApi {
    let size = gpu.size();
    WgpuApi::new(gpu.device(), gpu.queue(), gpu.surface_format(), (size.width, size.height))
}
