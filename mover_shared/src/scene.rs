//! Scene graph.
//!
//! An owned arena of renderable nodes. Each node sits on one render layer;
//! a camera draws a node only when the node's layer is in its culling mask.

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Render layers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderLayers: u32 {
        const DEFAULT = 1 << 0;
        const HIDDEN = 1 << 1;       // Owner's own body, never drawn by its camera
        const NAME_TAG = 1 << 2;
    }
}

impl Default for RenderLayers {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl RenderLayers {
    /// Culling mask of a first-person camera.
    pub fn first_person_mask() -> Self {
        Self::all() - Self::HIDDEN
    }
}

/// Index of a node in its `SceneGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
struct Node {
    name: String,
    layer: RenderLayers,
    children: Vec<NodeId>,
}

/// Arena-backed node tree.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<Node>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root node on the default layer.
    pub fn add_root(&mut self, name: impl Into<String>) -> NodeId {
        self.push(name.into())
    }

    /// Adds a child under `parent`, inheriting the parent's layer.
    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let layer = self.nodes[parent.0].layer;
        let id = self.push(name.into());
        self.nodes[id.0].layer = layer;
        self.nodes[parent.0].children.push(id);
        id
    }

    fn push(&mut self, name: String) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name,
            layer: RenderLayers::DEFAULT,
            children: Vec::new(),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).map(|n| n.name.as_str())
    }

    pub fn layer(&self, id: NodeId) -> Option<RenderLayers> {
        self.nodes.get(id.0).map(|n| n.layer)
    }

    /// Moves `root` and every descendant onto `layer`. Returns the number
    /// of nodes touched.
    pub fn move_to_layer(&mut self, root: NodeId, layer: RenderLayers) -> usize {
        let mut stack = vec![root];
        let mut touched = 0;
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id.0) else {
                continue;
            };
            node.layer = layer;
            touched += 1;
            stack.extend(node.children.iter().copied());
        }
        touched
    }

    /// Whether a camera with `mask` draws the node.
    pub fn is_visible(&self, id: NodeId, mask: RenderLayers) -> bool {
        self.layer(id).is_some_and(|l| mask.intersects(l))
    }

    /// Iterates nodes a camera with `mask` draws.
    pub fn visible(&self, mask: RenderLayers) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| mask.intersects(n.layer))
            .map(|(i, _)| NodeId(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_to_layer_covers_subtree_only() {
        let mut scene = SceneGraph::new();
        let body = scene.add_root("body");
        let arm = scene.add_child(body, "arm");
        let hand = scene.add_child(arm, "hand");
        let other = scene.add_root("tag");
        assert_eq!(scene.name(hand), Some("hand"));
        assert_eq!(scene.name(NodeId(99)), None);

        assert_eq!(scene.move_to_layer(body, RenderLayers::HIDDEN), 3);
        for id in [body, arm, hand] {
            assert_eq!(scene.layer(id), Some(RenderLayers::HIDDEN));
        }
        assert_eq!(scene.layer(other), Some(RenderLayers::DEFAULT));
    }

    #[test]
    fn first_person_mask_skips_hidden() {
        let mut scene = SceneGraph::new();
        let gun = scene.add_root("gun");
        let world = scene.add_root("world");
        scene.move_to_layer(gun, RenderLayers::HIDDEN);

        let mask = RenderLayers::first_person_mask();
        assert!(!scene.is_visible(gun, mask));
        assert!(scene.is_visible(world, mask));
        assert_eq!(scene.visible(mask).collect::<Vec<_>>(), vec![world]);
    }
}
