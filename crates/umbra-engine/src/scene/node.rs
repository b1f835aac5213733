use crate::coords::{Affine2, ColorRgba, Vec2, Viewport};
use crate::versioned::{Cached, Version, Versioned};

use super::graph::{NodeId, UpdateStats};
use super::{Bounds, ColorState, Composable2DTransform, Drawable, Light, TransformState};

/// What a node contributes besides its transform and color.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Pure container.
    Group,
    Image(Drawable),
    Light(Light),
}

/// Parent-side inputs of a node update.
#[derive(Debug, Copy, Clone)]
pub(super) struct Inherited {
    pub world: Affine2,
    pub props: Version,
    pub color: ColorRgba,
    pub color_version: Version,
}

impl Inherited {
    pub const ROOT: Inherited = Inherited {
        world: Affine2::IDENTITY,
        props: Version::ROOT,
        color: ColorRgba::WHITE,
        color_version: Version::ROOT,
    };
}

/// A scene node.
///
/// The world matrix maps the node's content space to surface pixels and is
/// what children compose onto. The node's own quad is that matrix scaled by
/// the node size; see [`Node::quad_matrix`].
#[derive(Debug, Clone)]
pub struct Node {
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,

    pub transform: TransformState,
    pub color: ColorState,
    /// Hidden nodes and their subtrees are neither updated nor drawn.
    pub visible: bool,
    /// Only interactive nodes become pointer targets.
    pub interactive: bool,
    pub kind: NodeKind,

    // inputs: [parent props version, own transform version]
    world: Cached<Affine2, 2>,
    // inputs: [parent color version, own color version]
    world_color: Cached<ColorRgba, 2>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            transform: TransformState::default(),
            color: ColorState::default(),
            visible: true,
            interactive: false,
            kind,
            world: Cached::new(Affine2::IDENTITY),
            world_color: Cached::new(ColorRgba::WHITE),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// World matrix as of the last update.
    pub fn world(&self) -> Affine2 {
        *self.world.value()
    }

    /// Bumped each time the world matrix is recomputed.
    pub fn props_version(&self) -> Version {
        self.world.version()
    }

    pub fn world_color(&self) -> ColorRgba {
        *self.world_color.value()
    }

    pub fn color_version(&self) -> Version {
        self.world_color.version()
    }

    /// Maps the unit quad onto the node's pixel footprint.
    pub fn quad_matrix(&self) -> Affine2 {
        let (w, h) = self.transform.size();
        self.world.value().scale_local(w, h)
    }

    pub fn drawable(&self) -> Option<&Drawable> {
        match &self.kind {
            NodeKind::Image(d) => Some(d),
            _ => None,
        }
    }

    pub fn drawable_mut(&mut self) -> Option<&mut Drawable> {
        match &mut self.kind {
            NodeKind::Image(d) => Some(d),
            _ => None,
        }
    }

    pub fn light(&self) -> Option<&Light> {
        match &self.kind {
            NodeKind::Light(l) => Some(l),
            _ => None,
        }
    }

    pub fn light_mut(&mut self) -> Option<&mut Light> {
        match &mut self.kind {
            NodeKind::Light(l) => Some(l),
            _ => None,
        }
    }

    /// Point in unit-quad coordinates if `point` (surface pixels) falls inside the quad.
    pub fn hit_test(&self, point: Vec2) -> Option<Vec2> {
        let inv = self.quad_matrix().invert()?;
        let local = inv.transform_point(point);
        let inside = (0.0..=1.0).contains(&local.x) && (0.0..=1.0).contains(&local.y);
        inside.then_some(local)
    }

    /// Brings derived transform terms, world matrix, world color and texture
    /// matrix up to date, in that order.
    pub(super) fn update_self(&mut self, parent: &Inherited, stats: &mut UpdateStats) -> Inherited {
        if self.transform.refresh() {
            stats.transforms += 1;
        }

        let local = self.transform.local_matrix();
        let inputs = [parent.props, self.transform.version()];
        if self.world.refresh(inputs, |w| *w = parent.world.compose(&local)) {
            stats.matrices += 1;
        }

        let own = self.color.get();
        let inputs = [parent.color_version, self.color.version()];
        if self.world_color.refresh(inputs, |c| *c = parent.color * own) {
            stats.colors += 1;
        }

        if let NodeKind::Image(d) = &mut self.kind {
            if d.refresh_texture_matrix() {
                stats.texture_matrices += 1;
            }
        }

        Inherited {
            world: *self.world.value(),
            props: self.world.version(),
            color: *self.world_color.value(),
            color_version: self.world_color.version(),
        }
    }

    /// Clip-space corners and pixel bounding box of an image node, computed
    /// lazily from the world matrix of the last update.
    pub fn bounds(&mut self, viewport: Viewport) -> Option<Bounds> {
        self.refresh_bounds(viewport).map(|(_, b)| b)
    }

    pub(super) fn refresh_bounds(&mut self, viewport: Viewport) -> Option<(bool, Bounds)> {
        let quad = self.quad_matrix();
        let props = self.world.version();
        let d = self.drawable_mut()?;
        Some(d.refresh_bounds(&quad, props, viewport))
    }

    /// Forgets every last-seen stamp so the next update recomputes from scratch.
    pub(super) fn reset_stamps(&mut self) {
        self.world.invalidate();
        self.world_color.invalidate();
        if let NodeKind::Image(d) = &mut self.kind {
            d.reset_stamps();
        }
    }
}
