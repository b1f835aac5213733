use umbra_engine::coords::{Vec2, Viewport};
use umbra_engine::scene::{Scene, SceneError, UpdateStats};

fn close(a: Vec2, b: Vec2) -> bool {
    (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
}

/// root → group → (a, b)
fn small_tree() -> (Scene, [umbra_engine::scene::NodeId; 3]) {
    let mut scene = Scene::new();
    let group = scene.create_group();
    let a = scene.create_image(None, 10.0, 10.0);
    let b = scene.create_image(None, 10.0, 10.0);
    scene.add_child(scene.root(), group).unwrap();
    scene.add_child(group, a).unwrap();
    scene.add_child(group, b).unwrap();
    scene.update();
    scene.reset_stats();
    (scene, [group, a, b])
}

#[test]
fn unchanged_scene_recomputes_nothing() {
    let (mut scene, _) = small_tree();
    scene.update();
    assert_eq!(scene.stats(), UpdateStats::default());
}

#[test]
fn moving_a_group_recomputes_its_subtree_only() {
    let (mut scene, [group, a, b]) = small_tree();
    let sibling = scene.create_image(None, 5.0, 5.0);
    scene.add_child(scene.root(), sibling).unwrap();
    scene.update();
    scene.reset_stats();

    scene.get_mut(group).unwrap().transform.set_position(30.0, 40.0);
    scene.update();

    let stats = scene.stats();
    assert_eq!(stats.matrices, 3);
    assert_eq!(stats.colors, 0);
    assert_eq!(stats.texture_matrices, 0);

    let origin = scene.get(a).unwrap().world().transform_point(Vec2::zero());
    assert!(close(origin, Vec2::new(30.0, 40.0)));
    let origin = scene.get(b).unwrap().world().transform_point(Vec2::zero());
    assert!(close(origin, Vec2::new(30.0, 40.0)));
    let origin = scene.get(sibling).unwrap().world().transform_point(Vec2::zero());
    assert!(close(origin, Vec2::zero()));
}

#[test]
fn alpha_edit_touches_colors_not_matrices() {
    let (mut scene, [group, a, _]) = small_tree();
    scene.get_mut(group).unwrap().color.set_alpha(0.5);
    scene.get_mut(a).unwrap().color.set_alpha(0.5);
    scene.update();

    let stats = scene.stats();
    assert_eq!(stats.matrices, 0);
    assert_eq!(stats.colors, 3);
    assert!((scene.get(a).unwrap().world_color().a - 0.25).abs() < 1e-6);
}

#[test]
fn setting_the_same_value_is_not_a_change() {
    let (mut scene, [_, a, _]) = small_tree();
    let node = scene.get_mut(a).unwrap();
    let x = node.transform.x();
    assert!(!node.transform.set_x(x));
    assert!(!node.color.set_alpha(1.0));
    scene.update();
    assert_eq!(scene.stats(), UpdateStats::default());
}

#[test]
fn rotation_refreshes_the_derived_terms_once() {
    let (mut scene, [_, a, _]) = small_tree();
    scene.get_mut(a).unwrap().transform.set_rotation(0.3);
    scene.update();
    scene.update();
    let stats = scene.stats();
    assert_eq!(stats.transforms, 1);
    assert_eq!(stats.matrices, 1);
}

#[test]
fn world_versions_only_grow() {
    let (mut scene, [group, a, _]) = small_tree();
    let mut last = scene.get(a).unwrap().props_version();
    for i in 0..5 {
        scene.get_mut(group).unwrap().transform.set_x(i as f32 + 1.0);
        scene.update();
        let now = scene.get(a).unwrap().props_version();
        assert!(now > last);
        last = now;
    }
}

#[test]
fn hidden_subtrees_are_not_updated() {
    let (mut scene, [group, a, _]) = small_tree();
    scene.get_mut(group).unwrap().visible = false;
    scene.get_mut(a).unwrap().transform.set_position(5.0, 5.0);
    scene.update();
    assert_eq!(scene.stats().matrices, 0);

    scene.get_mut(group).unwrap().visible = true;
    scene.update();
    assert_eq!(scene.stats().matrices, 1);
}

#[test]
fn reattached_node_recomputes_under_new_parent() {
    let (mut scene, [group, a, _]) = small_tree();
    let other = scene.create_group();
    scene.add_child(scene.root(), other).unwrap();
    scene.get_mut(other).unwrap().transform.set_position(100.0, 0.0);
    scene.update();

    scene.add_child(other, a).unwrap();
    assert_eq!(scene.get(a).unwrap().parent(), Some(other));
    assert!(!scene.get(group).unwrap().children().contains(&a));

    scene.update();
    let origin = scene.get(a).unwrap().world().transform_point(Vec2::zero());
    assert!(close(origin, Vec2::new(100.0, 0.0)));
}

#[test]
fn cycles_and_root_moves_are_rejected() {
    let (mut scene, [group, a, _]) = small_tree();
    assert_eq!(
        scene.add_child(a, group),
        Err(SceneError::WouldCycle { parent: a, child: group })
    );
    assert_eq!(
        scene.add_child(group, group),
        Err(SceneError::WouldCycle { parent: group, child: group })
    );
    assert_eq!(scene.add_child(group, scene.root()), Err(SceneError::RootNotAttachable));
    assert_eq!(scene.remove(scene.root()), Err(SceneError::RootNotAttachable));
}

#[test]
fn remove_drops_the_whole_subtree() {
    let (mut scene, [group, a, b]) = small_tree();
    let before = scene.len();
    assert_eq!(scene.remove(group), Ok(3));
    assert_eq!(scene.len(), before - 3);
    assert!(!scene.contains(a) && !scene.contains(b));
    assert!(scene.get(scene.root()).unwrap().children().is_empty());
}

#[test]
fn detach_keeps_the_node_alive() {
    let (mut scene, [group, a, _]) = small_tree();
    scene.detach(a).unwrap();
    assert!(scene.contains(a));
    assert!(!scene.is_attached(a));
    assert!(scene.is_attached(group));
    // detaching twice is a no-op
    assert_eq!(scene.detach(a), Ok(()));
}

#[test]
fn world_matrix_round_trips_through_its_inverse() {
    let mut scene = Scene::new();
    let parent = scene.create_group();
    let child = scene.create_image(None, 40.0, 20.0);
    scene.add_child(scene.root(), parent).unwrap();
    scene.add_child(parent, child).unwrap();
    {
        let t = &mut scene.get_mut(parent).unwrap().transform;
        t.set_position(120.0, 80.0);
        t.set_rotation(0.7);
        t.set_scale(2.0, 1.5);
    }
    {
        let t = &mut scene.get_mut(child).unwrap().transform;
        t.set_position(-10.0, 5.0);
        t.set_skew(0.1, -0.2);
        t.set_anchor(0.5, 0.5);
    }
    scene.update();

    let world = scene.get(child).unwrap().world();
    let inv = world.invert().unwrap();
    for p in [Vec2::zero(), Vec2::new(13.0, -7.0), Vec2::new(250.0, 31.5)] {
        assert!(close(inv.transform_point(world.transform_point(p)), p));
    }
}

#[test]
fn anchor_centers_the_quad_on_the_position() {
    let mut scene = Scene::new();
    let id = scene.create_image(None, 40.0, 20.0);
    scene.add_child(scene.root(), id).unwrap();
    {
        let t = &mut scene.get_mut(id).unwrap().transform;
        t.set_position(100.0, 100.0);
        t.set_anchor(0.5, 0.5);
    }
    scene.update();
    let center = scene.get(id).unwrap().quad_matrix().transform_point(Vec2::new(0.5, 0.5));
    assert!(close(center, Vec2::new(100.0, 100.0)));
}

#[test]
fn later_children_win_hit_tests() {
    let mut scene = Scene::new();
    let below = scene.create_image(None, 50.0, 50.0);
    let above = scene.create_image(None, 50.0, 50.0);
    let passive = scene.create_image(None, 50.0, 50.0);
    for id in [below, above, passive] {
        scene.add_child(scene.root(), id).unwrap();
    }
    scene.get_mut(below).unwrap().interactive = true;
    scene.get_mut(above).unwrap().interactive = true;
    scene.get_mut(above).unwrap().transform.set_position(25.0, 25.0);
    scene.update();

    assert_eq!(scene.node_at(Vec2::new(10.0, 10.0)), Some(below));
    assert_eq!(scene.node_at(Vec2::new(30.0, 30.0)), Some(above));
    assert_eq!(scene.node_at(Vec2::new(200.0, 200.0)), None);

    let local = scene.get(above).unwrap().hit_test(Vec2::new(50.0, 50.0)).unwrap();
    assert!(close(local, Vec2::new(0.5, 0.5)));
}

#[test]
fn bounds_are_recomputed_only_after_a_move() {
    let mut scene = Scene::new();
    let id = scene.create_image(None, 100.0, 50.0);
    scene.add_child(scene.root(), id).unwrap();
    scene.get_mut(id).unwrap().transform.set_position(10.0, 20.0);
    scene.update();
    scene.reset_stats();

    let viewport = Viewport::from_size(800, 600);
    let first = scene.bounds(id, viewport).unwrap();
    let again = scene.bounds(id, viewport).unwrap();
    assert_eq!(first, again);
    assert_eq!(scene.stats().bounds, 1);

    assert!((first.rect.origin.x - 10.0).abs() < 1e-4);
    assert!((first.rect.origin.y - 20.0).abs() < 1e-4);
    assert!((first.rect.size.x - 100.0).abs() < 1e-4);
    assert!((first.rect.size.y - 50.0).abs() < 1e-4);

    scene.get_mut(id).unwrap().transform.set_x(11.0);
    scene.update();
    scene.bounds(id, viewport).unwrap();
    assert_eq!(scene.stats().bounds, 2);

    // groups have no bounds
    assert!(scene.bounds(scene.root(), viewport).is_none());
}
