//! The workspace tree of containers and windows.
//!
//! Nodes live in a slotmap arena and refer to each other by generational
//! keys, so structural churn never leaves dangling parent pointers: unbinding
//! and binding exchange keys, not references. Containers own their children
//! exclusively; a window node back-references its parent non-ownerly and the
//! back-reference is cleared before any re-parenting.

use std::collections::HashMap;

use slotmap::{new_key_type, SlotMap};
use trellis_ipc::WindowId;

use super::dwindle::DwindleCache;
use super::master::MasterCache;
use super::LayoutKind;
use crate::geometry::{Axis, Direction, Rect, Sign};

new_key_type! {
    /// Key of a node in the workspace tree arena.
    pub struct NodeId;
}

/// Pair of values indexed by [`Axis`].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PerAxis<T> {
    pub h: T,
    pub v: T,
}

impl<T: Copy> PerAxis<T> {
    pub fn splat(value: T) -> Self {
        Self { h: value, v: value }
    }

    pub fn get(&self, axis: Axis) -> T {
        match axis {
            Axis::Horizontal => self.h,
            Axis::Vertical => self.v,
        }
    }

    pub fn set(&mut self, axis: Axis, value: T) {
        match axis {
            Axis::Horizontal => self.h = value,
            Axis::Vertical => self.v = value,
        }
    }
}

/// One node of the tree: a container or a window leaf.
#[derive(Debug)]
pub struct Node {
    pub parent: Option<NodeId>,
    /// Adaptive weight per axis: the share of the parent's extent this node
    /// takes on the next layout along that axis.
    pub weight: PerAxis<f64>,
    /// Weight captured when a pointer-resize session first touched this node.
    /// Used to roll the session back if its window disappears mid-drag.
    pub weight_before_resize: Option<PerAxis<f64>>,
    pub kind: NodeKind,
}

#[derive(Debug)]
pub enum NodeKind {
    Container(Container),
    Window(WindowNode),
}

/// Per-layout auxiliary state stored inside the container it belongs to.
///
/// Keeping the cache in the container (rather than a side table keyed by
/// container) ties the cache lifetime to the container lifetime by
/// construction.
#[derive(Debug, Default)]
pub enum ContainerState {
    #[default]
    Plain,
    Dwindle(DwindleCache),
    Master(MasterCache),
}

#[derive(Debug)]
pub struct Container {
    pub children: Vec<NodeId>,
    pub orientation: Axis,
    pub layout: LayoutKind,
    /// Index of the most recently focused child. Anchor for Accordion and
    /// Scroll, descent hint for navigation.
    pub recent_child: usize,
    pub state: ContainerState,
    /// Rect assigned by the last layout pass.
    pub last_rect: Option<Rect>,
    /// Same, in gap-free coordinates.
    pub last_virtual: Option<Rect>,
}

impl Container {
    pub fn new(orientation: Axis, layout: LayoutKind) -> Self {
        Self {
            children: Vec::new(),
            orientation,
            layout,
            recent_child: 0,
            state: ContainerState::Plain,
            last_rect: None,
            last_virtual: None,
        }
    }

    pub fn recent_child_clamped(&self) -> usize {
        self.recent_child.min(self.children.len().saturating_sub(1))
    }
}

#[derive(Debug)]
pub struct WindowNode {
    pub id: WindowId,
    /// Identifier of the owning application, when the backend knows it.
    pub app_id: Option<String>,
    /// Remembered rect for the float/tile round trip.
    pub floating_rect: Option<Rect>,
    pub is_fullscreen: bool,
    /// Rect computed for this window by the most recent layout pass. This is
    /// the model the pointer-resize diff runs against.
    pub last_physical: Option<Rect>,
    /// Same, in gap-free coordinates. Scroll reads the width back from here.
    pub last_virtual: Option<Rect>,
}

/// Everything needed to restore or swap a binding removed by [`Tree::unbind`].
#[derive(Debug, Clone, Copy)]
pub struct BindingToken {
    pub parent: NodeId,
    pub index: usize,
    pub weight: PerAxis<f64>,
}

/// The workspace tree. One per workspace; mutated only by the event loop.
#[derive(Debug)]
pub struct Tree {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    window_index: HashMap<WindowId, NodeId>,
}

impl Tree {
    pub fn new(orientation: Axis, layout: LayoutKind) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node {
            parent: None,
            weight: PerAxis::splat(1.),
            weight_before_resize: None,
            kind: NodeKind::Container(Container::new(orientation, layout)),
        });
        Self {
            nodes,
            root,
            window_index: HashMap::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn container(&self, id: NodeId) -> Option<&Container> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Container(c) => Some(c),
            NodeKind::Window(_) => None,
        }
    }

    pub fn container_mut(&mut self, id: NodeId) -> Option<&mut Container> {
        match &mut self.nodes.get_mut(id)?.kind {
            NodeKind::Container(c) => Some(c),
            NodeKind::Window(_) => None,
        }
    }

    pub fn window(&self, id: NodeId) -> Option<&WindowNode> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Window(w) => Some(w),
            NodeKind::Container(_) => None,
        }
    }

    pub fn window_mut(&mut self, id: NodeId) -> Option<&mut WindowNode> {
        match &mut self.nodes.get_mut(id)?.kind {
            NodeKind::Window(w) => Some(w),
            NodeKind::Container(_) => None,
        }
    }

    /// Node holding a window, by window id.
    pub fn node_for_window(&self, window: WindowId) -> Option<NodeId> {
        self.window_index.get(&window).copied()
    }

    /// Whether the node is currently bound into a container.
    pub fn is_bound(&self, id: NodeId) -> bool {
        id == self.root || self.nodes.get(id).is_some_and(|n| n.parent.is_some())
    }

    /// Index of a node within its parent's child list.
    pub fn own_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.nodes.get(id)?.parent?;
        self.container(parent)?
            .children
            .iter()
            .position(|&c| c == id)
    }

    pub fn weight(&self, id: NodeId, axis: Axis) -> f64 {
        self.nodes.get(id).map_or(1., |n| n.weight.get(axis))
    }

    pub fn set_weight(&mut self, id: NodeId, axis: Axis, value: f64) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.weight.set(axis, value);
        }
    }

    /// Creates a detached window node. Bind it to place it in the tree.
    pub fn create_window(&mut self, window: WindowId, app_id: Option<String>) -> NodeId {
        let id = self.nodes.insert(Node {
            parent: None,
            weight: PerAxis::splat(1.),
            weight_before_resize: None,
            kind: NodeKind::Window(WindowNode {
                id: window,
                app_id,
                floating_rect: None,
                is_fullscreen: false,
                last_physical: None,
                last_virtual: None,
            }),
        });
        self.window_index.insert(window, id);
        id
    }

    /// Creates a detached container node.
    pub fn create_container(&mut self, orientation: Axis, layout: LayoutKind) -> NodeId {
        self.nodes.insert(Node {
            parent: None,
            weight: PerAxis::splat(1.),
            weight_before_resize: None,
            kind: NodeKind::Container(Container::new(orientation, layout)),
        })
    }

    /// Average weight of a container's children per axis, the adaptive weight
    /// given to a newly inserted sibling. 1.0 when there are none.
    fn average_child_weight(&self, parent: NodeId) -> PerAxis<f64> {
        let Some(container) = self.container(parent) else {
            return PerAxis::splat(1.);
        };
        if container.children.is_empty() {
            return PerAxis::splat(1.);
        }
        let n = container.children.len() as f64;
        let mut sum = PerAxis::splat(0.);
        for &child in &container.children {
            let w = self.nodes[child].weight;
            sum.h += w.h;
            sum.v += w.v;
        }
        PerAxis {
            h: sum.h / n,
            v: sum.v / n,
        }
    }

    /// Binds a detached node into a container at `index`. Without an explicit
    /// weight the node receives the average weight of its new siblings.
    pub fn bind(
        &mut self,
        node: NodeId,
        parent: NodeId,
        index: usize,
        weight: Option<PerAxis<f64>>,
    ) {
        debug_assert!(self.nodes[node].parent.is_none(), "node is already bound");
        let weight = weight.unwrap_or_else(|| self.average_child_weight(parent));

        let Some(container) = self.container_mut(parent) else {
            return;
        };
        let index = index.min(container.children.len());
        container.children.insert(index, node);

        let entry = &mut self.nodes[node];
        entry.parent = Some(parent);
        entry.weight = weight;
    }

    /// Removes a node from its parent, returning a token that can restore the
    /// binding. The parent back-reference is cleared first.
    pub fn unbind(&mut self, node: NodeId) -> Option<BindingToken> {
        let entry = self.nodes.get_mut(node)?;
        let parent = entry.parent.take()?;
        let weight = entry.weight;

        let container = self.container_mut(parent)?;
        let index = container.children.iter().position(|&c| c == node)?;
        container.children.remove(index);
        if container.recent_child >= container.children.len() {
            container.recent_child = container.children.len().saturating_sub(1);
        }

        Some(BindingToken {
            parent,
            index,
            weight,
        })
    }

    /// Restores a binding from a token.
    pub fn bind_at(&mut self, node: NodeId, token: BindingToken) {
        self.bind(node, token.parent, token.index, Some(token.weight));
    }

    /// Exchanges two bindings. Each node ends up in the other's slot; the
    /// slots keep their indices and adaptive weights.
    pub fn swap_bindings(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        let parent_a = self.nodes[a].parent;
        let parent_b = self.nodes[b].parent;
        if parent_a.is_some() && parent_a == parent_b {
            let parent = parent_a.unwrap();
            let (i, j) = {
                let container = self.container(parent).unwrap();
                let i = container.children.iter().position(|&c| c == a).unwrap();
                let j = container.children.iter().position(|&c| c == b).unwrap();
                (i, j)
            };
            self.container_mut(parent).unwrap().children.swap(i, j);
            let weight_a = self.nodes[a].weight;
            let weight_b = self.nodes[b].weight;
            self.nodes[a].weight = weight_b;
            self.nodes[b].weight = weight_a;
            return;
        }

        let Some(token_a) = self.unbind(a) else { return };
        let Some(token_b) = self.unbind(b) else {
            // Put the first node back rather than leaving it detached.
            self.bind_at(a, token_a);
            return;
        };
        self.bind_at(a, token_b);
        self.bind_at(b, token_a);
    }

    /// Deletes a window node entirely, unbinding it first if needed.
    pub fn remove_window_node(&mut self, node: NodeId) {
        self.unbind(node);
        if let Some(entry) = self.nodes.remove(node) {
            if let NodeKind::Window(w) = entry.kind {
                self.window_index.remove(&w.id);
            }
        }
    }

    /// Window ids of all leaves under a node, in tree order.
    pub fn collect_windows(&self, node: NodeId) -> Vec<WindowId> {
        let mut out = Vec::new();
        self.collect_windows_into(node, &mut out);
        out
    }

    fn collect_windows_into(&self, node: NodeId, out: &mut Vec<WindowId>) {
        match &self.nodes[node].kind {
            NodeKind::Window(w) => out.push(w.id),
            NodeKind::Container(c) => {
                for &child in &c.children {
                    self.collect_windows_into(child, out);
                }
            }
        }
    }

    /// All container node ids reachable from the root.
    pub fn containers(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if let NodeKind::Container(c) = &self.nodes[id].kind {
                out.push(id);
                stack.extend(c.children.iter().copied());
            }
        }
        out
    }

    /// Walks up from `node` until a container is found whose orientation
    /// matches the direction's axis and in which the child on the path has a
    /// sibling in that direction. Optionally requires a specific layout.
    ///
    /// Returns the container and the path child's index within it.
    pub fn closest_parent_toward(
        &self,
        node: NodeId,
        direction: Direction,
        layout: Option<LayoutKind>,
    ) -> Option<(NodeId, usize)> {
        let axis = direction.axis();
        let mut current = node;
        while let Some(parent) = self.nodes[current].parent {
            if let NodeKind::Container(c) = &self.nodes[parent].kind {
                let index = c.children.iter().position(|&ch| ch == current)?;
                let oriented = c.orientation == axis;
                let layout_ok = layout.map_or(true, |l| c.layout == l);
                if oriented && layout_ok {
                    let has_sibling = match direction.sign() {
                        Sign::Negative => index > 0,
                        Sign::Positive => index + 1 < c.children.len(),
                    };
                    if has_sibling {
                        return Some((parent, index));
                    }
                }
            }
            current = parent;
        }
        None
    }

    /// Nearest ancestor position where the parent container has the given
    /// orientation and more than one child. The returned index is the child
    /// on the path whose weight a resize along `axis` should change.
    pub fn closest_oriented(&self, node: NodeId, axis: Axis) -> Option<(NodeId, usize)> {
        let mut current = node;
        while let Some(parent) = self.nodes[current].parent {
            if let NodeKind::Container(c) = &self.nodes[parent].kind {
                if c.orientation == axis && c.children.len() > 1 {
                    let index = c.children.iter().position(|&ch| ch == current)?;
                    return Some((parent, index));
                }
            }
            current = parent;
        }
        None
    }

    /// Marks the path from the root to `node` as most recent.
    pub fn touch_recent(&mut self, node: NodeId) {
        let mut current = node;
        while let Some(parent) = self.nodes[current].parent {
            let index = {
                let NodeKind::Container(c) = &self.nodes[parent].kind else {
                    break;
                };
                c.children.iter().position(|&ch| ch == current)
            };
            if let Some(index) = index {
                if let NodeKind::Container(c) = &mut self.nodes[parent].kind {
                    c.recent_child = index;
                }
            }
            current = parent;
        }
    }

    /// Descends along the most-recent-child path to a window node.
    pub fn descend_recent(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            match &self.nodes.get(current)?.kind {
                NodeKind::Window(_) => return Some(current),
                NodeKind::Container(c) => {
                    current = *c.children.get(c.recent_child_clamped())?;
                }
            }
        }
    }

    /// Clears every pointer-resize weight memo.
    pub fn reset_weight_memos(&mut self) {
        for node in self.nodes.values_mut() {
            node.weight_before_resize = None;
        }
    }

    /// Rolls back weights touched by an aborted pointer-resize session.
    pub fn restore_weight_memos(&mut self) {
        for node in self.nodes.values_mut() {
            if let Some(weight) = node.weight_before_resize.take() {
                node.weight = weight;
            }
        }
    }

    /// Structural cleanup after edits.
    ///
    /// Removes empty non-root containers, optionally flattens single-child
    /// non-root containers into their parent, and optionally flips the
    /// orientation of containers nested directly inside a same-orientation
    /// container.
    pub fn normalize(&mut self, flatten: bool, alternate_orientation: bool) {
        // Iterate to a fixed point: a flatten can empty another container.
        loop {
            let mut changed = false;

            for id in self.containers() {
                if id == self.root {
                    continue;
                }
                let child_count = match self.container(id) {
                    Some(c) => c.children.len(),
                    None => continue,
                };

                if child_count == 0 {
                    self.unbind(id);
                    self.nodes.remove(id);
                    changed = true;
                } else if flatten && child_count == 1 {
                    let child = self.container(id).unwrap().children[0];
                    let Some(token) = self.unbind(id) else {
                        continue;
                    };
                    // The child takes over the container's slot and weight.
                    self.unbind(child);
                    self.nodes.remove(id);
                    self.bind_at(child, token);
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        if alternate_orientation {
            for id in self.containers() {
                let Some(parent) = self.nodes[id].parent else {
                    continue;
                };
                let Some(parent_orientation) = self.container(parent).map(|c| c.orientation)
                else {
                    continue;
                };
                let container = self.container_mut(id).unwrap();
                if container.layout != LayoutKind::Scroll
                    && container.orientation == parent_orientation
                {
                    container.orientation = parent_orientation.perpendicular();
                }
            }
        }

        for id in self.containers() {
            let container = self.container_mut(id).unwrap();
            container.recent_child = container.recent_child_clamped();
        }
    }

    /// Total number of window leaves known to the tree, bound or floating.
    pub fn window_count(&self) -> usize {
        self.window_index.len()
    }

    /// All window ids known to the tree, bound or floating.
    pub fn known_windows(&self) -> Vec<WindowId> {
        self.window_index.keys().copied().collect()
    }
}
