use std::cell::Cell;
use std::rc::Rc;

use umbra_engine::coords::Vec2;
use umbra_engine::input::{InputEvent, MouseButton, MouseButtonState, PointerButtonEvent};
use umbra_engine::render::api::TargetHandle;
use umbra_engine::render::headless::DrawRecord;
use umbra_engine::render::stage::ImageInstance;
use umbra_engine::render::{
    BlendMode, Filter, FilterKind, FilterRenderer, FrameStatus, HeadlessApi, PointerInput,
    RenderContext, RenderError, RenderTarget, StageConfig, StageRenderer, TextureId, TextureOptions,
};
use umbra_engine::scene::{NodeEventKind, NodeId, Scene};

fn context() -> RenderContext<HeadlessApi> {
    RenderContext::new(HeadlessApi::new(800, 600))
}

fn solid(ctx: &mut RenderContext<HeadlessApi>, w: u32, h: u32) -> TextureId {
    ctx.create_texture(w, h, vec![255; (w * h * 4) as usize], TextureOptions::default())
        .unwrap()
}

fn image(scene: &mut Scene, texture: TextureId, x: f32, y: f32) -> NodeId {
    let id = scene.create_image(Some(texture), 10.0, 10.0);
    scene.add_child(scene.root(), id).unwrap();
    scene.get_mut(id).unwrap().transform.set_position(x, y);
    id
}

fn frame(
    ctx: &mut RenderContext<HeadlessApi>,
    stage: &mut StageRenderer,
    scene: &mut Scene,
    time: u64,
) -> Vec<DrawRecord> {
    assert_eq!(ctx.begin_frame(time), FrameStatus::Ready);
    stage.render(ctx, scene, RenderTarget::Screen, None).unwrap();
    ctx.api_mut().take_draws()
}

#[test]
fn batch_ceiling_splits_draws() {
    let mut ctx = context();
    let tex = solid(&mut ctx, 4, 4);
    let config = StageConfig { batch_size: 4, ..StageConfig::default() };
    let mut stage = StageRenderer::new(&mut ctx, config).unwrap();

    let mut scene = Scene::new();
    for i in 0..4 {
        image(&mut scene, tex, i as f32 * 12.0, 0.0);
    }
    let draws = frame(&mut ctx, &mut stage, &mut scene, 1);
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].instance_count, 4);

    image(&mut scene, tex, 60.0, 0.0);
    let draws = frame(&mut ctx, &mut stage, &mut scene, 2);
    let counts: Vec<u32> = draws.iter().map(|d| d.instance_count).collect();
    assert_eq!(counts, [4, 1]);
}

#[test]
fn blend_changes_split_batches_in_paint_order() {
    let mut ctx = context();
    let tex = solid(&mut ctx, 4, 4);
    let mut stage = StageRenderer::new(&mut ctx, StageConfig::default()).unwrap();

    let mut scene = Scene::new();
    let modes =
        [BlendMode::Normal, BlendMode::Normal, BlendMode::Add, BlendMode::Add, BlendMode::Normal];
    for (i, mode) in modes.into_iter().enumerate() {
        let id = image(&mut scene, tex, i as f32 * 12.0, 0.0);
        scene.get_mut(id).unwrap().drawable_mut().unwrap().blend = mode;
    }

    let draws = frame(&mut ctx, &mut stage, &mut scene, 1);
    let got: Vec<(BlendMode, u32)> = draws.iter().map(|d| (d.blend, d.instance_count)).collect();
    assert_eq!(got, [(BlendMode::Normal, 2), (BlendMode::Add, 2), (BlendMode::Normal, 1)]);
    assert!(draws.iter().all(|d| d.program_name == Some("stage")));
}

#[test]
fn shared_texture_is_bound_once() {
    let mut ctx = context();
    let tex = solid(&mut ctx, 4, 4);
    let mut stage = StageRenderer::new(&mut ctx, StageConfig::default()).unwrap();
    let mut scene = Scene::new();
    for i in 0..3 {
        image(&mut scene, tex, i as f32 * 12.0, 0.0);
    }

    let draws = frame(&mut ctx, &mut stage, &mut scene, 1);
    let stats = ctx.stats();
    assert_eq!(draws.len(), 1);
    assert_eq!(stats.texture_binds, 1);
    assert_eq!(stats.unit_hits, 2);
    assert_eq!(stats.uploads, 1);

    let units: Vec<u32> = draws[0].instances_as::<ImageInstance>().iter().map(|i| i.unit).collect();
    assert_eq!(units, [0, 0, 0]);

    // resident GPU copy is reused by the next frame
    frame(&mut ctx, &mut stage, &mut scene, 2);
    assert_eq!(ctx.stats().uploads, 0);
}

#[test]
fn unit_exhaustion_flushes_exactly_once() {
    let mut ctx = RenderContext::new(HeadlessApi::new(800, 600).with_texture_units(2));
    let textures: Vec<TextureId> = (0..3).map(|_| solid(&mut ctx, 2, 2)).collect();
    let mut stage = StageRenderer::new(&mut ctx, StageConfig::default()).unwrap();
    let mut scene = Scene::new();
    for (i, &tex) in textures.iter().enumerate() {
        image(&mut scene, tex, i as f32 * 12.0, 0.0);
    }

    let draws = frame(&mut ctx, &mut stage, &mut scene, 1);
    assert_eq!(ctx.stats().unit_flushes, 1);
    let counts: Vec<u32> = draws.iter().map(|d| d.instance_count).collect();
    assert_eq!(counts, [2, 1]);

    // the third texture evicted the first from the lowest unit
    assert_eq!(ctx.unit_occupant(0), Some(textures[2]));
    assert_eq!(ctx.unit_occupant(1), Some(textures[1]));
    let last = draws[1].instances_as::<ImageInstance>();
    assert_eq!(last[0].unit, 0);
}

#[test]
fn updated_pixels_are_reuploaded_in_place() {
    let mut ctx = context();
    let tex = solid(&mut ctx, 2, 2);
    let mut stage = StageRenderer::new(&mut ctx, StageConfig::default()).unwrap();
    let mut scene = Scene::new();
    image(&mut scene, tex, 0.0, 0.0);

    let draws = frame(&mut ctx, &mut stage, &mut scene, 1);
    let handle = draws[0].units[0].unwrap();

    ctx.update_texture(tex, vec![7; 16]).unwrap();
    let draws = frame(&mut ctx, &mut stage, &mut scene, 2);
    assert_eq!(draws[0].units[0], Some(handle));
    assert_eq!(ctx.stats().uploads, 1);

    let gpu = ctx.api().texture(handle).unwrap();
    assert_eq!(gpu.uploads, 2);
    assert_eq!(gpu.pixels.as_deref(), Some(&[7u8; 16][..]));
}

#[test]
fn texture_data_length_is_validated() {
    let mut ctx = context();
    let err = ctx
        .create_texture(2, 2, vec![0; 3], TextureOptions::default())
        .unwrap_err();
    assert_eq!(err, RenderError::TextureDataSize { expected: 16, actual: 3 });

    let tex = solid(&mut ctx, 2, 2);
    assert!(ctx.update_texture(tex, vec![0; 15]).is_err());
}

#[test]
fn pending_texture_is_skipped_until_its_pixels_arrive() {
    let mut ctx = context();
    let tex = ctx.create_pending_texture(2, 2, TextureOptions::default());
    let mut stage = StageRenderer::new(&mut ctx, StageConfig::default()).unwrap();
    let mut scene = Scene::new();
    image(&mut scene, tex, 0.0, 0.0);

    assert!(!ctx.texture_ready(tex));
    assert!(frame(&mut ctx, &mut stage, &mut scene, 1).is_empty());

    ctx.update_texture(tex, vec![255; 16]).unwrap();
    let draws = frame(&mut ctx, &mut stage, &mut scene, 2);
    assert_eq!(draws.len(), 1);
}

#[test]
fn removed_texture_is_skipped() {
    let mut ctx = context();
    let gone = solid(&mut ctx, 2, 2);
    let kept = solid(&mut ctx, 2, 2);
    let mut stage = StageRenderer::new(&mut ctx, StageConfig::default()).unwrap();
    let mut scene = Scene::new();
    image(&mut scene, gone, 0.0, 0.0);
    image(&mut scene, kept, 20.0, 0.0);

    ctx.remove_texture(gone).unwrap();
    assert_eq!(ctx.remove_texture(gone), Err(RenderError::UnknownTexture(gone)));

    let draws = frame(&mut ctx, &mut stage, &mut scene, 1);
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].instance_count, 1);
}

#[test]
fn offscreen_nodes_are_culled() {
    let mut ctx = context();
    let tex = solid(&mut ctx, 2, 2);
    let mut scene = Scene::new();
    image(&mut scene, tex, -500.0, -500.0);
    image(&mut scene, tex, 10.0, 10.0);

    let mut stage = StageRenderer::new(&mut ctx, StageConfig::default()).unwrap();
    let draws = frame(&mut ctx, &mut stage, &mut scene, 1);
    assert_eq!(ctx.stats().culled, 1);
    assert_eq!(draws[0].instance_count, 1);

    let config = StageConfig { cull: false, ..StageConfig::default() };
    let mut stage = StageRenderer::new(&mut ctx, config).unwrap();
    let draws = frame(&mut ctx, &mut stage, &mut scene, 2);
    assert_eq!(ctx.stats().culled, 0);
    assert_eq!(draws[0].instance_count, 2);
}

#[test]
fn instances_carry_world_color() {
    let mut ctx = context();
    let tex = solid(&mut ctx, 2, 2);
    let mut stage = StageRenderer::new(&mut ctx, StageConfig::default()).unwrap();
    let mut scene = Scene::new();
    let id = image(&mut scene, tex, 0.0, 0.0);
    scene.get_mut(scene.root()).unwrap().color.set_alpha(0.5);
    scene.get_mut(id).unwrap().color.set_rgb(1.0, 0.0, 0.0);

    let draws = frame(&mut ctx, &mut stage, &mut scene, 1);
    let inst = draws[0].instances_as::<ImageInstance>();
    assert_eq!(inst[0].color, [1.0, 0.0, 0.0, 0.5]);
    assert_eq!(inst[0].translate, [0.0, 0.0]);
}

#[test]
fn render_target_receives_the_clear_and_the_draws() {
    let mut ctx = context();
    let tex = solid(&mut ctx, 2, 2);
    let target = ctx.create_render_target(256, 128);
    let mut stage = StageRenderer::new(&mut ctx, StageConfig::default()).unwrap();
    let mut scene = Scene::new();
    image(&mut scene, tex, 0.0, 0.0);

    assert_eq!(ctx.begin_frame(1), FrameStatus::Ready);
    stage.render(&mut ctx, &mut scene, RenderTarget::Texture(target), None).unwrap();
    let draws = ctx.api_mut().take_draws();
    let TargetHandle::Framebuffer(fb) = draws[0].target else {
        panic!("expected an offscreen target, got {:?}", draws[0].target);
    };
    assert!(ctx.api().framebuffer_texture(fb).is_some());
    assert_eq!(ctx.api().clears.last().map(|c| c.target), Some(draws[0].target));
    assert_eq!(ctx.target_size(RenderTarget::Texture(target)), (256, 128));

    // pixel textures are not targets
    assert_eq!(
        stage.render(&mut ctx, &mut scene, RenderTarget::Texture(tex), None),
        Err(RenderError::NotRenderTarget(tex))
    );
}

#[test]
fn pointer_events_reach_target_and_ancestors() {
    let mut ctx = context();
    let tex = solid(&mut ctx, 2, 2);
    let mut stage = StageRenderer::new(&mut ctx, StageConfig::default()).unwrap();
    let mut scene = Scene::new();
    let group = scene.create_group();
    scene.add_child(scene.root(), group).unwrap();
    let button = scene.create_image(Some(tex), 100.0, 100.0);
    scene.add_child(group, button).unwrap();
    scene.get_mut(button).unwrap().interactive = true;

    let press = [InputEvent::PointerButton(PointerButtonEvent {
        button: MouseButton::Left,
        state: MouseButtonState::Pressed,
        x: 50.0,
        y: 50.0,
    })];
    ctx.begin_frame(1);
    let pointer = PointerInput::new(Some(Vec2::new(50.0, 50.0)), &press);
    stage.render(&mut ctx, &mut scene, RenderTarget::Screen, Some(pointer)).unwrap();

    assert_eq!(stage.hovered(), Some(button));
    let events: Vec<_> = stage.drain_events().map(|e| (e.node, e.target, e.kind)).collect();
    let down = NodeEventKind::Down(MouseButton::Left);
    assert_eq!(
        events,
        [
            (button, button, NodeEventKind::Enter),
            (button, button, down),
            (group, button, down),
            (scene.root(), button, down),
        ]
    );

    ctx.begin_frame(2);
    let pointer = PointerInput::new(Some(Vec2::new(500.0, 500.0)), &[]);
    stage.render(&mut ctx, &mut scene, RenderTarget::Screen, Some(pointer)).unwrap();
    assert_eq!(stage.hovered(), None);
    let events: Vec<_> = stage.drain_events().map(|e| (e.node, e.kind)).collect();
    assert_eq!(events, [(button, NodeEventKind::Leave)]);
}

#[test]
fn idle_textures_are_purged_and_reuploaded_on_demand() {
    let mut ctx = context();
    let tex = solid(&mut ctx, 2, 2);
    let mut stage = StageRenderer::new(&mut ctx, StageConfig::default()).unwrap();
    let mut scene = Scene::new();
    let id = image(&mut scene, tex, 0.0, 0.0);

    frame(&mut ctx, &mut stage, &mut scene, 1);
    assert!(ctx.texture_resident(tex));

    scene.get_mut(id).unwrap().visible = false;
    frame(&mut ctx, &mut stage, &mut scene, 20);
    assert_eq!(ctx.purge_unused(5), 1);
    assert!(!ctx.texture_resident(tex));
    assert!(ctx.texture_ready(tex));

    scene.get_mut(id).unwrap().visible = true;
    frame(&mut ctx, &mut stage, &mut scene, 21);
    assert_eq!(ctx.stats().uploads, 1);
    assert!(ctx.texture_resident(tex));
}

#[test]
fn context_loss_rebuilds_programs_and_textures() {
    let mut ctx = context();
    let tex = solid(&mut ctx, 2, 2);
    let mut stage = StageRenderer::new(&mut ctx, StageConfig::default()).unwrap();
    let mut scene = Scene::new();
    image(&mut scene, tex, 0.0, 0.0);
    frame(&mut ctx, &mut stage, &mut scene, 1);
    assert_eq!(ctx.generation(), 1);

    let restored = Rc::new(Cell::new(0));
    let seen = restored.clone();
    ctx.on_restore(move |generation| seen.set(generation));

    ctx.api_mut().lose_context();
    assert_eq!(ctx.begin_frame(2), FrameStatus::ContextLost);
    assert!(ctx.is_lost());
    assert_eq!(ctx.begin_frame(3), FrameStatus::ContextLost);

    ctx.restore(HeadlessApi::new(800, 600));
    assert_eq!(ctx.generation(), 2);
    assert_eq!(restored.get(), 2);
    assert!(!ctx.texture_resident(tex));

    let draws = frame(&mut ctx, &mut stage, &mut scene, 4);
    assert_eq!(draws.len(), 1);
    assert_eq!(ctx.api().programs_created, 1);
    assert_eq!(ctx.stats().uploads, 1);
    assert!(ctx.texture_resident(tex));
}

#[test]
fn failed_program_makes_the_renderer_unusable() {
    let mut ctx = RenderContext::new(HeadlessApi::new(800, 600).fail_program("stage"));
    let err = StageRenderer::new(&mut ctx, StageConfig::default()).unwrap_err();
    assert!(matches!(err, RenderError::ProgramLink { ref program, .. } if program == "stage"));

    // a renderer that linked once fails permanently after a bad rebuild
    let mut ctx = context();
    let mut stage = StageRenderer::new(&mut ctx, StageConfig::default()).unwrap();
    let mut scene = Scene::new();
    ctx.restore(HeadlessApi::new(800, 600).fail_program("stage"));
    ctx.begin_frame(1);
    let first = stage.render(&mut ctx, &mut scene, RenderTarget::Screen, None);
    assert!(matches!(first, Err(RenderError::ProgramLink { .. })));
    let second = stage.render(&mut ctx, &mut scene, RenderTarget::Screen, None);
    assert_eq!(second, Err(RenderError::RendererUnusable("stage".into())));
}

#[test]
fn later_interactive_sibling_is_hovered() {
    let mut ctx = context();
    let tex = solid(&mut ctx, 2, 2);
    let mut stage = StageRenderer::new(&mut ctx, StageConfig::default()).unwrap();
    let mut scene = Scene::new();
    let a = image(&mut scene, tex, 0.0, 0.0);
    let b = image(&mut scene, tex, 5.0, 5.0);
    // drawn last and overlapping, but not a hit target
    let decoration = image(&mut scene, tex, 6.0, 6.0);
    scene.get_mut(a).unwrap().interactive = true;
    scene.get_mut(b).unwrap().interactive = true;

    ctx.begin_frame(1);
    let pointer = PointerInput::new(Some(Vec2::new(7.0, 7.0)), &[]);
    stage.render(&mut ctx, &mut scene, RenderTarget::Screen, Some(pointer)).unwrap();

    assert_eq!(stage.hovered(), Some(b));
    assert_ne!(stage.hovered(), Some(decoration));
    let events: Vec<_> = stage.drain_events().map(|e| (e.target, e.kind)).collect();
    assert_eq!(events, [(b, NodeEventKind::Enter)]);
}

#[test]
fn target_sampled_by_a_filter_is_unbound_before_drawing_into_it() {
    let mut ctx = context();
    let src = solid(&mut ctx, 8, 8);
    let sprite = solid(&mut ctx, 4, 4);
    let target = ctx.create_render_target(64, 64);
    let mut filters = FilterRenderer::new(&mut ctx).unwrap();
    let mut stage = StageRenderer::new(&mut ctx, StageConfig::default()).unwrap();
    let mut scene = Scene::new();
    image(&mut scene, sprite, 0.0, 0.0);

    assert_eq!(ctx.begin_frame(1), FrameStatus::Ready);
    let chain = [Filter::new(FilterKind::Mask { mask: target, invert: false })];
    filters.apply(&mut ctx, src, &chain, RenderTarget::Screen).unwrap();
    stage.render(&mut ctx, &mut scene, RenderTarget::Texture(target), None).unwrap();

    let draws = ctx.api_mut().take_draws();
    assert_eq!(draws.len(), 2);
    let TargetHandle::Framebuffer(fb) = draws[1].target else {
        panic!("stage draw should go to the offscreen target, got {:?}", draws[1].target);
    };
    let target_texture = ctx.api().framebuffer_texture(fb);
    assert!(target_texture.is_some());
    // the mask pass did sample it
    assert!(draws[0].units.contains(&target_texture));
    assert!(!draws[1].units.contains(&target_texture));
}
