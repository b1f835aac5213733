use umbra_engine::coords::{ColorRgba, Vec2};
use umbra_engine::render::api::TargetHandle;
use umbra_engine::render::filter::FilterUniforms;
use umbra_engine::render::light::{LightInstance, LightUniforms};
use umbra_engine::render::{
    BlendMode, ColorMatrix, Filter, FilterKind, FilterRenderer, FrameStatus, HeadlessApi,
    LightConfig, LightMaps, LightRenderer, RenderContext, RenderError, RenderTarget, TextureId,
    TextureOptions,
};
use umbra_engine::scene::{Light, NodeId, Scene};

fn context() -> RenderContext<HeadlessApi> {
    let mut ctx = RenderContext::new(HeadlessApi::new(320, 240));
    assert_eq!(ctx.begin_frame(1), FrameStatus::Ready);
    ctx
}

fn solid(ctx: &mut RenderContext<HeadlessApi>, w: u32, h: u32) -> TextureId {
    ctx.create_texture(w, h, vec![128; (w * h * 4) as usize], TextureOptions::default())
        .unwrap()
}

// ── filters ────────────────────────────────────────────────────────────────

#[test]
fn empty_chain_copies_the_source() {
    let mut ctx = context();
    let src = ctx.create_render_target(64, 32);
    let mut filters = FilterRenderer::new(&mut ctx).unwrap();

    let blur = Filter::disabled(FilterKind::Blur { radius: 4.0 });
    let passes = filters.apply(&mut ctx, src, &[blur], RenderTarget::Screen).unwrap();
    assert_eq!(passes, 1);
    assert_eq!(filters.scratch(), [None, None]);

    let draws = ctx.api_mut().take_draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].program_name, Some("filter"));
    assert_eq!(draws[0].target, TargetHandle::Screen);
    assert_eq!(draws[0].blend, BlendMode::Normal);
    let u: FilterUniforms = draws[0].uniforms_as().unwrap();
    assert_eq!(u.kind, 0);
    assert_eq!(u.texel, [1.0 / 64.0, 1.0 / 32.0, 64.0, 32.0]);
}

#[test]
fn single_filter_needs_no_scratch() {
    let mut ctx = context();
    let src = solid(&mut ctx, 16, 16);
    let mut filters = FilterRenderer::new(&mut ctx).unwrap();
    let gray = Filter::new(FilterKind::ColorMatrix(ColorMatrix::grayscale()));
    assert_eq!(filters.apply(&mut ctx, src, &[gray], RenderTarget::Screen), Ok(1));
    assert_eq!(filters.scratch(), [None, None]);
}

#[test]
fn chain_ping_pongs_between_scratch_targets() {
    let mut ctx = context();
    let src = ctx.create_render_target(64, 64);
    let mut filters = FilterRenderer::new(&mut ctx).unwrap();
    let chain = [
        Filter::new(FilterKind::ColorMatrix(ColorMatrix::sepia())),
        Filter::new(FilterKind::Blur { radius: 2.0 }),
        Filter::disabled(FilterKind::Pixelate { size: 8.0 }),
        Filter::new(FilterKind::Convolution {
            kernel: [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0],
            divisor: 1.0,
        }),
        Filter::new(FilterKind::ChromaticAberration { offset: Vec2::new(2.0, 0.0) }),
    ];

    let passes = filters.apply(&mut ctx, src, &chain, RenderTarget::Screen).unwrap();
    assert_eq!(passes, 4);
    let [Some(a), Some(b)] = filters.scratch() else { panic!("scratch targets not allocated") };
    assert_ne!(a, b);
    assert_eq!(ctx.texture_size(a), Some((64, 64)));

    let draws = ctx.api_mut().take_draws();
    let kinds: Vec<u32> =
        draws.iter().map(|d| d.uniforms_as::<FilterUniforms>().unwrap().kind).collect();
    assert_eq!(kinds, [2, 4, 1, 9]);

    let api = ctx.api();
    let written: Vec<_> = draws
        .iter()
        .map(|d| match d.target {
            TargetHandle::Framebuffer(fb) => api.framebuffer_texture(fb),
            TargetHandle::Screen => None,
        })
        .collect();
    assert!(written[0].is_some() && written[1].is_some());
    assert_ne!(written[0], written[1]);
    assert_eq!(written[2], written[0]);
    assert_eq!(draws[3].target, TargetHandle::Screen);

    for (i, d) in draws.iter().enumerate() {
        let u: FilterUniforms = d.uniforms_as().unwrap();
        let read = d.units[u.source_unit as usize];
        // each pass reads what the previous one wrote and never its own target
        if i > 0 {
            assert_eq!(read, written[i - 1]);
        }
        if written[i].is_some() {
            assert_ne!(read, written[i]);
        }
    }
}

#[test]
fn scratch_targets_follow_the_source_size() {
    let mut ctx = context();
    let small = ctx.create_render_target(32, 32);
    let large = ctx.create_render_target(128, 64);
    let mut filters = FilterRenderer::new(&mut ctx).unwrap();
    let chain = [
        Filter::new(FilterKind::Blur { radius: 1.0 }),
        Filter::new(FilterKind::Blur { radius: 1.0 }),
    ];

    filters.apply(&mut ctx, small, &chain, RenderTarget::Screen).unwrap();
    let scratch = filters.scratch();
    filters.apply(&mut ctx, large, &chain, RenderTarget::Screen).unwrap();
    assert_eq!(filters.scratch(), scratch);
    let [Some(a), _] = filters.scratch() else { panic!("scratch targets not allocated") };
    assert_eq!(ctx.texture_size(a), Some((128, 64)));
}

#[test]
fn aux_texture_is_bound_on_its_own_unit() {
    let mut ctx = context();
    let src = solid(&mut ctx, 32, 32);
    let mask = solid(&mut ctx, 32, 32);
    let mut filters = FilterRenderer::new(&mut ctx).unwrap();

    let chain = [Filter::new(FilterKind::Mask { mask, invert: true })];
    filters.apply(&mut ctx, src, &chain, RenderTarget::Screen).unwrap();

    let draws = ctx.api_mut().take_draws();
    let u: FilterUniforms = draws[0].uniforms_as().unwrap();
    assert_eq!(u.kind, 8);
    assert_eq!(u.flags, 1);
    assert_ne!(u.source_unit, u.aux_unit);
    assert!(draws[0].units[u.aux_unit as usize].is_some());
    assert_eq!(ctx.unit_occupant(u.aux_unit), Some(mask));
}

#[test]
fn missing_aux_texture_degrades_to_a_copy() {
    let mut ctx = context();
    let src = solid(&mut ctx, 32, 32);
    let map = ctx.create_pending_texture(32, 32, TextureOptions::default());
    let mut filters = FilterRenderer::new(&mut ctx).unwrap();

    let chain = [Filter::new(FilterKind::Displacement { map, scale: Vec2::new(4.0, 4.0) })];
    assert_eq!(filters.apply(&mut ctx, src, &chain, RenderTarget::Screen), Ok(1));
    let draws = ctx.api_mut().take_draws();
    assert_eq!(draws[0].uniforms_as::<FilterUniforms>().unwrap().kind, 0);
}

#[test]
fn unknown_source_is_an_error() {
    let mut ctx = context();
    let src = solid(&mut ctx, 4, 4);
    ctx.remove_texture(src).unwrap();
    let mut filters = FilterRenderer::new(&mut ctx).unwrap();
    assert_eq!(
        filters.apply(&mut ctx, src, &[], RenderTarget::Screen),
        Err(RenderError::UnknownTexture(src))
    );
}

// ── lights ─────────────────────────────────────────────────────────────────

fn light_at(scene: &mut Scene, light: Light, x: f32, y: f32) -> NodeId {
    let id = scene.create_light(light);
    scene.add_child(scene.root(), id).unwrap();
    scene.get_mut(id).unwrap().transform.set_position(x, y);
    id
}

#[test]
fn lights_are_drawn_additively_in_one_call() {
    let mut ctx = context();
    let height = solid(&mut ctx, 320, 240);
    let mut lights = LightRenderer::new(&mut ctx, LightConfig::default()).unwrap();

    let mut scene = Scene::new();
    light_at(&mut scene, Light::point(100.0, ColorRgba::WHITE), 10.0, 10.0);
    light_at(&mut scene, Light::spot(80.0, 0.0, 0.4, ColorRgba::WHITE), 50.0, 10.0);
    light_at(&mut scene, Light::directional(300.0, 1.0, ColorRgba::WHITE), 0.0, 0.0);
    scene.update();

    lights.begin();
    assert_eq!(lights.collect(&scene), 3);
    let maps = LightMaps { height, normal: None, roughness: None };
    assert_eq!(lights.render(&mut ctx, &maps, RenderTarget::Screen), Ok(3));

    let draws = ctx.api_mut().take_draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].program_name, Some("light"));
    assert_eq!(draws[0].blend, BlendMode::Add);
    assert_eq!(draws[0].instance_count, 3);

    let kinds: Vec<u32> =
        draws[0].instances_as::<LightInstance>().iter().map(|l| l.pose.kind).collect();
    assert_eq!(kinds, [0, 1, 2]);
    let u: LightUniforms = draws[0].uniforms_as().unwrap();
    assert_eq!(u.viewport, [320.0, 240.0]);
    assert_eq!(u.maps, 0);
}

#[test]
fn light_records_follow_the_node() {
    let mut ctx = context();
    let height = solid(&mut ctx, 8, 8);
    let normal = solid(&mut ctx, 8, 8);
    let mut lights = LightRenderer::new(&mut ctx, LightConfig::default()).unwrap();

    let mut scene = Scene::new();
    let light = Light {
        intensity: 2.0,
        color: ColorRgba::new(0.5, 0.25, 1.0, 0.8),
        ..Light::point(50.0, ColorRgba::WHITE)
    };
    let id = light_at(&mut scene, light, 100.0, 40.0);
    {
        let node = scene.get_mut(id).unwrap();
        node.transform.set_scale(2.0, 2.0);
        node.color.set_alpha(0.5);
    }
    scene.update();

    lights.begin();
    lights.collect(&scene);
    let maps = LightMaps { height, normal: Some(normal), roughness: None };
    lights.render(&mut ctx, &maps, RenderTarget::Screen).unwrap();

    let draws = ctx.api_mut().take_draws();
    let pose = draws[0].instances_as::<LightInstance>()[0].pose;
    assert_eq!(pose.position, [100.0, 40.0]);
    assert_eq!(pose.radius, 100.0);
    assert_eq!(pose.color, [1.0, 0.5, 2.0, 0.4]);

    let u: LightUniforms = draws[0].uniforms_as().unwrap();
    assert_eq!(u.maps, 1);
    assert_ne!(u.units[0], u.units[1]);
}

#[test]
fn optional_maps_never_displace_the_height_map() {
    let mut ctx = RenderContext::new(HeadlessApi::new(320, 240).with_texture_units(2));
    assert_eq!(ctx.begin_frame(1), FrameStatus::Ready);
    let height = solid(&mut ctx, 8, 8);
    let normal = solid(&mut ctx, 8, 8);
    let roughness = solid(&mut ctx, 8, 8);
    let mut lights = LightRenderer::new(&mut ctx, LightConfig::default()).unwrap();

    let mut scene = Scene::new();
    light_at(&mut scene, Light::point(40.0, ColorRgba::WHITE), 10.0, 10.0);
    scene.update();

    lights.begin();
    lights.collect(&scene);
    let maps = LightMaps { height, normal: Some(normal), roughness: Some(roughness) };
    assert_eq!(lights.render(&mut ctx, &maps, RenderTarget::Screen), Ok(1));

    let draws = ctx.api_mut().take_draws();
    let u: LightUniforms = draws[0].uniforms_as().unwrap();
    assert_eq!(u.maps, 1);
    assert_eq!(ctx.unit_occupant(u.units[0]), Some(height));
    assert_eq!(ctx.unit_occupant(u.units[1]), Some(normal));
    assert_eq!(ctx.stats().unit_flushes, 0);
}

#[test]
fn lights_past_the_maximum_are_dropped() {
    let mut ctx = context();
    let height = solid(&mut ctx, 8, 8);
    let config = LightConfig { max_lights: 2, ..LightConfig::default() };
    let mut lights = LightRenderer::new(&mut ctx, config).unwrap();

    let mut scene = Scene::new();
    for i in 0..3 {
        light_at(&mut scene, Light::point(10.0, ColorRgba::WHITE), i as f32 * 20.0, 0.0);
    }
    scene.update();

    lights.begin();
    assert_eq!(lights.collect(&scene), 2);
    assert_eq!(lights.dropped(), 1);
    assert_eq!(lights.buffers().len(), 2);

    let maps = LightMaps { height, normal: None, roughness: None };
    assert_eq!(lights.render(&mut ctx, &maps, RenderTarget::Screen), Ok(2));

    // a new frame starts empty
    lights.begin();
    assert_eq!(lights.dropped(), 0);
    assert!(lights.buffers().is_empty());
}

#[test]
fn hidden_lights_and_missing_height_maps_draw_nothing() {
    let mut ctx = context();
    let pending = ctx.create_pending_texture(8, 8, TextureOptions::default());
    let mut lights = LightRenderer::new(&mut ctx, LightConfig::default()).unwrap();

    let mut scene = Scene::new();
    let shown = light_at(&mut scene, Light::point(10.0, ColorRgba::WHITE), 0.0, 0.0);
    let hidden = light_at(&mut scene, Light::point(10.0, ColorRgba::WHITE), 0.0, 0.0);
    scene.get_mut(hidden).unwrap().visible = false;
    scene.update();

    lights.begin();
    assert_eq!(lights.collect(&scene), 1);
    let maps = LightMaps { height: pending, normal: None, roughness: None };
    assert_eq!(lights.render(&mut ctx, &maps, RenderTarget::Screen), Ok(0));
    assert!(ctx.api().draws.is_empty());
    assert!(scene.contains(shown));
}
