use std::collections::HashMap;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use crate::core::{App, AppControl};
use crate::device::GpuInit;

use super::entry::WindowEntry;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "umbra".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Window requests made from inside a frame. Applied once the frame returns.
#[derive(Default)]
pub struct RuntimeCtx {
    commands: Vec<Command>,
}

impl RuntimeCtx {
    pub fn create_window(&mut self, config: RuntimeConfig) {
        self.commands.push(Command::Open(config));
    }

    pub fn close_window(&mut self, id: WindowId) {
        self.commands.push(Command::Close(id));
    }

    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }
}

enum Command {
    Open(RuntimeConfig),
    Close(WindowId),
    Exit,
}

/// Drives an [`App`] with winit. Every window gets its own device and
/// render context; all windows redraw continuously.
pub struct Runtime;

impl Runtime {
    pub fn run<A: App + 'static>(initial: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()> {
        let event_loop = EventLoop::new().context("creating event loop")?;
        let mut handler = Handler {
            initial,
            gpu_init,
            app,
            windows: HashMap::new(),
            exiting: false,
        };
        event_loop.run_app(&mut handler).context("event loop failed")
    }
}

struct Handler<A> {
    initial: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,
    windows: HashMap<WindowId, WindowEntry>,
    exiting: bool,
}

impl<A: App> Handler<A> {
    fn open(&mut self, event_loop: &ActiveEventLoop, config: RuntimeConfig) {
        match WindowEntry::open(event_loop, config, self.gpu_init.clone()) {
            Ok(entry) => {
                entry.request_redraw();
                self.windows.insert(entry.id(), entry);
            }
            Err(e) => {
                log::error!("{e:#}");
                self.exiting = true;
            }
        }
    }

    fn close(&mut self, id: WindowId) {
        self.windows.remove(&id);
        if self.windows.is_empty() {
            self.exiting = true;
        }
    }

    fn apply(&mut self, event_loop: &ActiveEventLoop, runtime: RuntimeCtx) {
        for command in runtime.commands {
            match command {
                Command::Open(config) => self.open(event_loop, config),
                Command::Close(id) => self.close(id),
                Command::Exit => self.exiting = true,
            }
        }
    }
}

impl<A: App> ApplicationHandler for Handler<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.windows.is_empty() {
            self.open(event_loop, self.initial.clone());
        }
        if self.exiting {
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exiting {
            event_loop.exit();
            return;
        }
        event_loop.set_control_flow(ControlFlow::Wait);
        for entry in self.windows.values() {
            entry.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(entry) = self.windows.get_mut(&window_id) else { return };
        entry.record_input(&event);
        if self.app.on_window_event(window_id, &event) == AppControl::Exit {
            self.exiting = true;
        }

        match event {
            WindowEvent::CloseRequested => self.close(window_id),
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.windows.get_mut(&window_id) {
                    entry.sync_size();
                }
            }
            WindowEvent::RedrawRequested if !self.exiting => {
                let mut runtime = RuntimeCtx::default();
                if let Some(entry) = self.windows.get_mut(&window_id)
                    && entry.redraw(&mut self.app, &mut runtime) == AppControl::Exit
                {
                    runtime.exit();
                }
                self.apply(event_loop, runtime);
            }
            _ => {}
        }

        if self.exiting {
            event_loop.exit();
        }
    }
}
