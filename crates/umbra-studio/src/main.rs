//! Umbra studio: a small lit scene drawn through the full pipeline.
//!
//! Frame layout:
//! - sprites are drawn into an offscreen target (stage pass)
//! - lights shade the same target additively over a procedural height map
//! - the filter chain copies the result to the window
//!
//! Hovering a sprite tints it; clicking one toggles the grayscale filter.

use winit::dpi::LogicalSize;
use winit::window::WindowId;

use umbra_engine::coords::{ColorRgba, Vec2};
use umbra_engine::core::{App, AppControl, FrameCtx};
use umbra_engine::device::GpuInit;
use umbra_engine::input::MouseButton;
use umbra_engine::logging::{LoggingConfig, init_logging};
use umbra_engine::render::{
    BlendMode, ColorMatrix, Filter, FilterKind, FilterRenderer, GpuApi, LightConfig, LightMaps,
    LightRenderer, PointerInput, RenderContext, RenderError, RenderTarget, StageConfig,
    StageRenderer, TextureFilter, TextureId, TextureOptions, ToneMode,
};
use umbra_engine::scene::{Light, LightFlags, NodeEventKind, NodeId, Scene};
use umbra_engine::window::{Runtime, RuntimeConfig};

const GRID: (usize, usize) = (6, 3);
const SPACING: f32 = 150.0;
const HEIGHT_MAP: u32 = 256;

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "Umbra Studio".to_string(),
        initial_size: LogicalSize::new(1024.0, 640.0),
    };
    Runtime::run(config, GpuInit::default(), Studio::default())
}

#[derive(Default)]
struct Studio {
    demo: Option<Demo>,
}

impl App for Studio {
    fn on_context_restored(&mut self, _window_id: WindowId, generation: u64) {
        log::info!("studio resumed on context generation {generation}");
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let elapsed = ctx.time.elapsed as f32;
        let size = ctx.window.physical_size();
        let pointer = ctx.pointer();

        let slot = &mut self.demo;
        let mut fatal = false;
        let control = ctx.render(|rc| {
            if slot.is_none() {
                match Demo::new(rc) {
                    Ok(demo) => *slot = Some(demo),
                    Err(e) => {
                        fatal = true;
                        return Err(e);
                    }
                }
            }
            let Some(demo) = slot.as_mut() else { return Ok(()) };
            demo.animate(elapsed);
            demo.draw(rc, size, pointer)
        });
        if fatal {
            return AppControl::Exit;
        }

        if let Some(demo) = &mut self.demo {
            demo.handle_events();
        }
        control
    }
}

struct Sprite {
    id: NodeId,
    base: ColorRgba,
    phase: f32,
}

struct Demo {
    scene: Scene,
    stage: StageRenderer,
    lights: LightRenderer,
    filters: FilterRenderer,

    offscreen: TextureId,
    maps: LightMaps,
    chain: Vec<Filter>,

    sprites: Vec<Sprite>,
    board: NodeId,
    orbit: NodeId,
}

impl Demo {
    fn new<A: GpuApi>(rc: &mut RenderContext<A>) -> Result<Self, RenderError> {
        let stage = StageRenderer::new(rc, StageConfig::default())?;
        let lights = LightRenderer::new(rc, LightConfig::default())?;
        let filters = FilterRenderer::new(rc)?;

        let linear = TextureOptions { filter: TextureFilter::Linear, repeat: false };
        let floor = rc.create_texture(
            64,
            64,
            checker(64, 8),
            TextureOptions { repeat: true, ..linear },
        )?;
        let orb = rc.create_texture(64, 64, orb(64), linear)?;
        let height = rc.create_texture(HEIGHT_MAP, HEIGHT_MAP, height_map(HEIGHT_MAP), linear)?;
        let offscreen = rc.create_render_target(1, 1);

        let mut scene = Scene::new();
        let root = scene.root();

        let background = scene.create_image(Some(floor), 1.0, 1.0);
        scene.add_child(root, background).map_err(scene_error)?;

        let board = scene.create_group();
        scene.add_child(root, board).map_err(scene_error)?;

        let mut sprites = Vec::new();
        for row in 0..GRID.1 {
            for col in 0..GRID.0 {
                let id = scene.create_image(Some(orb), 96.0, 96.0);
                scene.add_child(board, id).map_err(scene_error)?;
                let i = row * GRID.0 + col;
                let hue = i as f32 / (GRID.0 * GRID.1) as f32;
                let base = hue_color(hue);
                if let Some(node) = scene.get_mut(id) {
                    node.interactive = true;
                    node.transform.set_anchor(0.5, 0.5);
                    node.transform.set_position(col as f32 * SPACING, row as f32 * SPACING);
                    node.color.set(base);
                    if let Some(d) = node.drawable_mut() {
                        d.blend = if i % 4 == 3 { BlendMode::Add } else { BlendMode::Normal };
                    }
                }
                sprites.push(Sprite { id, base, phase: hue * std::f32::consts::TAU });
            }
        }

        let orbit = scene.create_group();
        scene.add_child(board, orbit).map_err(scene_error)?;
        let lamp = scene.create_light(Light {
            height: 0.8,
            intensity: 1.4,
            flags: LightFlags::CAST_SHADOW | LightFlags::SPECULAR | LightFlags::JITTER,
            specular: 0.5,
            ..Light::point(420.0, ColorRgba::new(1.0, 0.85, 0.6, 1.0))
        });
        scene.add_child(orbit, lamp).map_err(scene_error)?;
        if let Some(node) = scene.get_mut(lamp) {
            node.transform.set_position(260.0, 0.0);
        }

        let sun = scene.create_light(Light {
            intensity: 0.35,
            flags: LightFlags::NONE,
            ..Light::directional(4096.0, 0.6, ColorRgba::new(0.5, 0.6, 1.0, 1.0))
        });
        scene.add_child(root, sun).map_err(scene_error)?;

        let chain = vec![
            Filter::new(FilterKind::ColorMatrix(ColorMatrix::saturation(1.15))),
            Filter::new(FilterKind::Glow {
                radius: 3.0,
                strength: 0.5,
                color: ColorRgba::new(1.0, 0.9, 0.7, 1.0),
            }),
            Filter::disabled(FilterKind::ColorMatrix(ColorMatrix::grayscale())),
            Filter::new(FilterKind::Tone {
                color: ColorRgba::new(0.1, 0.05, 0.2, 1.0),
                mode: ToneMode::SoftLight,
                amount: 0.3,
            }),
        ];

        log::info!("studio scene ready: {} nodes", scene.len());
        Ok(Self {
            scene,
            stage,
            lights,
            filters,
            offscreen,
            maps: LightMaps { height, normal: None, roughness: None },
            chain,
            sprites,
            board,
            orbit,
        })
    }

    fn animate(&mut self, t: f32) {
        if let Some(orbit) = self.scene.get_mut(self.orbit) {
            let center = Vec2::new(
                (GRID.0 - 1) as f32 * SPACING * 0.5,
                (GRID.1 - 1) as f32 * SPACING * 0.5,
            );
            orbit.transform.set_position(center.x, center.y);
            orbit.transform.set_rotation(t * 0.6);
        }
        for sprite in &self.sprites {
            if let Some(node) = self.scene.get_mut(sprite.id) {
                let s = 1.0 + 0.08 * (t * 2.0 + sprite.phase).sin();
                node.transform.set_scale(s, s);
            }
        }
    }

    fn draw<A: GpuApi>(
        &mut self,
        rc: &mut RenderContext<A>,
        (w, h): (u32, u32),
        pointer: PointerInput<'_>,
    ) -> Result<(), RenderError> {
        rc.resize_render_target(self.offscreen, w, h)?;
        self.layout(w, h);

        let target = RenderTarget::Texture(self.offscreen);
        self.stage.render(rc, &mut self.scene, target, Some(pointer))?;

        self.lights.begin();
        self.lights.collect(&self.scene);
        self.lights.render(rc, &self.maps, target)?;

        self.filters.apply(rc, self.offscreen, &self.chain, RenderTarget::Screen)?;
        Ok(())
    }

    /// Stretches the floor over the window and centers the sprite grid.
    fn layout(&mut self, w: u32, h: u32) {
        let (w, h) = (w as f32, h as f32);
        let root = self.scene.root();
        let floor = self.scene.get(root).and_then(|n| n.children().first().copied());
        if let Some(node) = floor.and_then(|id| self.scene.get_mut(id)) {
            node.transform.set_size(w, h);
            if let Some(d) = node.drawable_mut() {
                d.texture_transform_mut().set_repeat(w / 64.0, h / 64.0);
            }
        }
        if let Some(board) = self.scene.get_mut(self.board) {
            let grid_w = (GRID.0 - 1) as f32 * SPACING;
            let grid_h = (GRID.1 - 1) as f32 * SPACING;
            board.transform.set_position((w - grid_w) * 0.5, (h - grid_h) * 0.5);
        }
    }

    fn handle_events(&mut self) {
        let events: Vec<_> = self.stage.drain_events().collect();
        for ev in events {
            // ancestors see bubbled copies; react on the target only
            if ev.node != ev.target {
                continue;
            }
            let Some(sprite) = self.sprites.iter().find(|s| s.id == ev.target) else { continue };
            let base = sprite.base;
            match ev.kind {
                NodeEventKind::Enter => {
                    if let Some(node) = self.scene.get_mut(ev.target) {
                        node.color.set(ColorRgba::WHITE);
                    }
                }
                NodeEventKind::Leave => {
                    if let Some(node) = self.scene.get_mut(ev.target) {
                        node.color.set(base);
                    }
                }
                NodeEventKind::Down(MouseButton::Left) => {
                    let gray = &mut self.chain[2];
                    gray.on = !gray.on;
                    log::info!("grayscale {}", if gray.on { "on" } else { "off" });
                }
                _ => {}
            }
        }
    }
}

fn scene_error(e: umbra_engine::scene::SceneError) -> RenderError {
    RenderError::Backend(e.to_string())
}

fn hue_color(h: f32) -> ColorRgba {
    let channel = |offset: f32| 0.5 + 0.5 * ((h + offset) * std::f32::consts::TAU).cos();
    ColorRgba::new(channel(0.0), channel(2.0 / 3.0), channel(1.0 / 3.0), 1.0)
}

fn checker(size: u32, cell: u32) -> Vec<u8> {
    let mut px = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let v = if (x / cell + y / cell) % 2 == 0 { 46 } else { 34 };
            px.extend_from_slice(&[v, v, v + 8, 255]);
        }
    }
    px
}

/// Soft disc with straight alpha.
fn orb(size: u32) -> Vec<u8> {
    let mut px = Vec::with_capacity((size * size * 4) as usize);
    let c = (size as f32 - 1.0) * 0.5;
    for y in 0..size {
        for x in 0..size {
            let d = Vec2::new(x as f32 - c, y as f32 - c).length() / c;
            let a = (1.0 - d).clamp(0.0, 1.0).powf(0.6);
            let shade = (255.0 * (1.0 - 0.4 * d)).clamp(0.0, 255.0) as u8;
            px.extend_from_slice(&[shade, shade, shade, (a * 255.0) as u8]);
        }
    }
    px
}

/// Screen-space occluders: a ring of pillars and a low wall.
fn height_map(size: u32) -> Vec<u8> {
    let mut px = Vec::with_capacity((size * size * 4) as usize);
    let s = size as f32;
    for y in 0..size {
        for x in 0..size {
            let (u, v) = (x as f32 / s, y as f32 / s);
            let p = Vec2::new(u - 0.5, v - 0.5);
            let angle = p.y.atan2(p.x);
            let ring = (p.length() - 0.3).abs() < 0.03 && (angle * 4.0).sin() > 0.6;
            let wall = (v - 0.8).abs() < 0.015 && (0.2..0.8).contains(&u);
            let top = if ring { 230 } else if wall { 90 } else { 0 };
            px.extend_from_slice(&[top, 0, 160, 255]);
        }
    }
    px
}
