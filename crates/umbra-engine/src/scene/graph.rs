use core::convert::Infallible;

use slotmap::{SlotMap, new_key_type};
use thiserror::Error;

use crate::coords::{Vec2, Viewport};
use crate::render::TextureId;

use super::node::Inherited;
use super::{Bounds, Drawable, Light, Node, NodeKind};

new_key_type! {
    /// Handle to a node stored in a [`Scene`].
    pub struct NodeId;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    WouldCycle { parent: NodeId, child: NodeId },
    #[error("the root node cannot be attached, detached or removed")]
    RootNotAttachable,
}

/// Recomputation counters, accumulated across updates until reset.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct UpdateStats {
    /// Rotation/scale chain refreshes.
    pub transforms: u64,
    pub matrices: u64,
    pub colors: u64,
    pub texture_matrices: u64,
    pub bounds: u64,
}

/// Visitor control after entering a node.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Visit {
    Children,
    /// Do not descend; the subtree is neither updated nor visited.
    Skip,
}

/// Callbacks run during [`Scene::update_with`], right after each node is updated.
pub trait SceneVisitor {
    type Error;

    fn enter(&mut self, id: NodeId, node: &mut Node) -> Result<Visit, Self::Error>;

    fn leave(&mut self, _id: NodeId, _node: &mut Node) -> Result<(), Self::Error> {
        Ok(())
    }
}

struct UpdateOnly;

impl SceneVisitor for UpdateOnly {
    type Error = Infallible;

    fn enter(&mut self, _: NodeId, _: &mut Node) -> Result<Visit, Infallible> {
        Ok(Visit::Children)
    }
}

enum Step {
    Enter(NodeId, Inherited),
    Leave(NodeId),
}

/// Arena-backed scene tree.
///
/// Child order is paint order: later children draw on top and win hit tests.
#[derive(Debug)]
pub struct Scene {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    stats: UpdateStats,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeKind::Group));
        Self {
            nodes,
            root,
            stats: UpdateStats::default(),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes.get(id).ok_or(SceneError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::UnknownNode(id))
    }

    pub fn stats(&self) -> UpdateStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = UpdateStats::default();
    }

    // ── construction ───────────────────────────────────────────────────────

    /// Creates a detached node.
    pub fn create(&mut self, node: Node) -> NodeId {
        self.nodes.insert(node)
    }

    pub fn create_group(&mut self) -> NodeId {
        self.create(Node::new(NodeKind::Group))
    }

    /// Creates a detached image node of `width × height` pixels.
    pub fn create_image(&mut self, texture: Option<TextureId>, width: f32, height: f32) -> NodeId {
        let mut node = Node::new(NodeKind::Image(Drawable::new(texture)));
        node.transform.set_size(width, height);
        self.create(node)
    }

    pub fn create_light(&mut self, light: Light) -> NodeId {
        self.create(Node::new(NodeKind::Light(light)))
    }

    // ── structure ──────────────────────────────────────────────────────────

    /// Appends `child` to `parent`, detaching it from its previous parent first.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        let len = self.node(parent)?.children.len();
        self.insert_child(parent, len, child)
    }

    /// Inserts `child` at `index` (clamped) among `parent`'s children.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), SceneError> {
        if child == self.root {
            return Err(SceneError::RootNotAttachable);
        }
        self.node(parent)?;
        self.node(child)?;
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(SceneError::WouldCycle { parent, child });
        }

        if self.node(child)?.parent.is_some() {
            self.detach(child)?;
        }

        let siblings = &mut self.node_mut(parent)?.children;
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Unlinks `child` from its parent. The subtree stays alive in the arena.
    ///
    /// Detaching a node that has no parent is a no-op.
    pub fn detach(&mut self, child: NodeId) -> Result<(), SceneError> {
        if child == self.root {
            return Err(SceneError::RootNotAttachable);
        }
        let node = self.node_mut(child)?;
        let Some(parent) = node.parent.take() else { return Ok(()) };
        node.reset_stamps();
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        Ok(())
    }

    /// Detaches `id` and drops it with its whole subtree. Returns the number of nodes removed.
    pub fn remove(&mut self, id: NodeId) -> Result<usize, SceneError> {
        self.detach(id)?;
        let mut pending = vec![id];
        let mut removed = 0;
        while let Some(n) = pending.pop() {
            if let Some(node) = self.nodes.remove(n) {
                pending.extend(node.children);
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Parent chain of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            scene: self,
            next: self.nodes.get(id).and_then(|n| n.parent),
        }
    }

    /// `true` if `id` is the root or has the root among its ancestors.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    // ── update ─────────────────────────────────────────────────────────────

    /// Updates every visible node reachable from the root.
    pub fn update(&mut self) {
        match self.update_with(&mut UpdateOnly) {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Depth-first, pre-order update; `visitor` sees each node right after it
    /// was brought up to date. Invisible subtrees are skipped.
    pub fn update_with<V: SceneVisitor>(&mut self, visitor: &mut V) -> Result<(), V::Error> {
        let mut steps = vec![Step::Enter(self.root, Inherited::ROOT)];
        while let Some(step) = steps.pop() {
            match step {
                Step::Enter(id, parent) => {
                    let Some(node) = self.nodes.get_mut(id) else { continue };
                    if !node.visible {
                        continue;
                    }
                    let inherited = node.update_self(&parent, &mut self.stats);
                    if visitor.enter(id, node)? == Visit::Skip {
                        continue;
                    }
                    steps.push(Step::Leave(id));
                    steps.extend(node.children.iter().rev().map(|&c| Step::Enter(c, inherited)));
                }
                Step::Leave(id) => {
                    if let Some(node) = self.nodes.get_mut(id) {
                        visitor.leave(id, node)?;
                    }
                }
            }
        }
        Ok(())
    }

    // ── queries ────────────────────────────────────────────────────────────

    /// Corners and bounding box of an image node, recomputed only if the node
    /// moved since the last call for the same viewport.
    pub fn bounds(&mut self, id: NodeId, viewport: Viewport) -> Option<Bounds> {
        let (recomputed, bounds) = self.nodes.get_mut(id)?.refresh_bounds(viewport)?;
        if recomputed {
            self.stats.bounds += 1;
        }
        Some(bounds)
    }

    /// Topmost visible interactive node under `point`, using world matrices
    /// from the last update.
    pub fn node_at(&self, point: Vec2) -> Option<NodeId> {
        let mut hit = None;
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            let Some(node) = self.nodes.get(id) else { continue };
            if !node.visible {
                continue;
            }
            if node.interactive && node.hit_test(point).is_some() {
                hit = Some(id);
            }
            pending.extend(node.children.iter().rev());
        }
        hit
    }
}

/// Iterator over a node's ancestors, nearest first.
pub struct Ancestors<'a> {
    scene: &'a Scene,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.scene.nodes.get(id).and_then(|n| n.parent);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_adding_moves_node() {
        let mut s = Scene::new();
        let a = s.create_group();
        let b = s.create_group();
        let c = s.create_group();
        s.add_child(s.root(), a).unwrap();
        s.add_child(s.root(), b).unwrap();
        s.add_child(a, c).unwrap();
        s.add_child(b, c).unwrap();
        assert!(s.get(a).unwrap().children().is_empty());
        assert_eq!(s.get(b).unwrap().children(), &[c]);
        assert_eq!(s.get(c).unwrap().parent(), Some(b));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut s = Scene::new();
        let a = s.create_group();
        let b = s.create_group();
        s.add_child(s.root(), a).unwrap();
        s.add_child(a, b).unwrap();
        assert_eq!(s.add_child(b, a), Err(SceneError::WouldCycle { parent: b, child: a }));
        assert_eq!(s.add_child(a, s.root()), Err(SceneError::RootNotAttachable));
    }

    #[test]
    fn remove_drops_subtree() {
        let mut s = Scene::new();
        let a = s.create_group();
        let b = s.create_group();
        let c = s.create_group();
        s.add_child(s.root(), a).unwrap();
        s.add_child(a, b).unwrap();
        s.add_child(b, c).unwrap();
        assert_eq!(s.remove(a).unwrap(), 3);
        assert!(!s.contains(c));
        assert!(s.get(s.root()).unwrap().children().is_empty());
    }

    #[test]
    fn update_is_pre_order_in_child_order() {
        struct Order(Vec<NodeId>);
        impl SceneVisitor for Order {
            type Error = Infallible;
            fn enter(&mut self, id: NodeId, _: &mut Node) -> Result<Visit, Infallible> {
                self.0.push(id);
                Ok(Visit::Children)
            }
        }

        let mut s = Scene::new();
        let a = s.create_group();
        let a1 = s.create_group();
        let b = s.create_group();
        s.add_child(s.root(), a).unwrap();
        s.add_child(s.root(), b).unwrap();
        s.add_child(a, a1).unwrap();

        let mut v = Order(Vec::new());
        s.update_with(&mut v).unwrap();
        assert_eq!(v.0, vec![s.root(), a, a1, b]);
    }

    #[test]
    fn hidden_subtree_is_not_updated() {
        let mut s = Scene::new();
        let a = s.create_group();
        s.add_child(s.root(), a).unwrap();
        s.update();
        s.reset_stats();

        s.get_mut(a).unwrap().visible = false;
        s.get_mut(a).unwrap().transform.set_x(5.0);
        s.update();
        assert_eq!(s.stats().matrices, 0);

        s.get_mut(a).unwrap().visible = true;
        s.update();
        assert_eq!(s.stats().matrices, 1);
    }
}
