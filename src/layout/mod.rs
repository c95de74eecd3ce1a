//! Layout engines and the per-workspace layout pass.
//!
//! A workspace owns a tree of containers ([`container::Tree`]); each
//! container carries one of five layouts. A layout pass walks the tree from
//! the workspace rect down, assigning every window a physical rect (what is
//! pushed to the backend) and a virtual rect (the same geometry in gap-free
//! coordinates, which is what the adaptive weights are measured against).
//!
//! Layouts that keep state across passes (Dwindle's split tree, Master's
//! percent) store it inside their container; the pass creates that state
//! lazily on first layout.

use trellis_ipc::{LayoutTreeLayout, LayoutTreeNode, WindowId};

use crate::geometry::{Axis, Rect};

pub mod accordion;
pub mod container;
pub mod dwindle;
pub mod master;
pub mod scroll;
pub mod tiles;
pub mod workspace;


use container::{ContainerState, NodeId, NodeKind, PerAxis, Tree};
use master::{MasterCache, MasterSide};

/// Layout algorithm of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    /// Weighted split along the container's orientation.
    Tiles,
    /// Overlapping full-size children, peeled around the most recent one.
    Accordion,
    /// Binary split tree with per-split ratios.
    Dwindle,
    /// Horizontal carousel anchored on the most recent child.
    Scroll,
    /// First child is the master area, the rest stack beside it.
    Master,
}

/// Gap configuration in pixels.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Gaps {
    /// Gap between sibling tiles, per seam axis.
    pub inner: PerAxis<f64>,
    /// Workspace insets.
    pub outer: OuterGaps,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct OuterGaps {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

/// Resolved engine options. Defaults match an empty config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub default_layout: LayoutKind,
    /// `None` picks the orientation from the monitor's aspect ratio.
    pub default_orientation: Option<Axis>,
    pub accordion_padding: f64,
    pub dwindle_default_split_ratio: f64,
    pub split_width_multiplier: f64,
    pub master_default_percent: f64,
    pub focused_width_ratio: f64,
    pub mouse_sensitivity: f64,
    pub no_outer_gaps_in_fullscreen: bool,
    pub gaps: Gaps,
    pub flatten_containers: bool,
    pub opposite_orientation_for_nested: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            default_layout: LayoutKind::Tiles,
            default_orientation: None,
            accordion_padding: 30.,
            dwindle_default_split_ratio: 1.,
            split_width_multiplier: 1.,
            master_default_percent: 0.5,
            focused_width_ratio: 0.8,
            mouse_sensitivity: 1.,
            no_outer_gaps_in_fullscreen: true,
            gaps: Gaps::default(),
            flatten_containers: true,
            opposite_orientation_for_nested: true,
        }
    }
}

impl Options {
    pub fn from_config(config: &trellis_config::Config) -> Self {
        let layout = &config.layout;
        Self {
            default_layout: match layout.default_layout {
                trellis_config::DefaultLayout::Tiles => LayoutKind::Tiles,
                trellis_config::DefaultLayout::Accordion => LayoutKind::Accordion,
                trellis_config::DefaultLayout::Dwindle => LayoutKind::Dwindle,
                trellis_config::DefaultLayout::Scroll => LayoutKind::Scroll,
                trellis_config::DefaultLayout::Master => LayoutKind::Master,
            },
            default_orientation: match layout.default_orientation {
                trellis_config::DefaultOrientation::Horizontal => Some(Axis::Horizontal),
                trellis_config::DefaultOrientation::Vertical => Some(Axis::Vertical),
                trellis_config::DefaultOrientation::Auto => None,
            },
            accordion_padding: layout.accordion_padding.0,
            dwindle_default_split_ratio: layout.dwindle_default_split_ratio.0,
            split_width_multiplier: layout.split_width_multiplier.0,
            master_default_percent: layout.master_default_percent.0,
            focused_width_ratio: layout.focused_width_ratio.0,
            mouse_sensitivity: layout.mouse_sensitivity.0,
            no_outer_gaps_in_fullscreen: layout.no_outer_gaps_in_fullscreen,
            gaps: Gaps {
                inner: PerAxis {
                    h: layout.gaps.inner.horizontal.0,
                    v: layout.gaps.inner.vertical.0,
                },
                outer: OuterGaps {
                    top: layout.gaps.outer.top.0,
                    bottom: layout.gaps.outer.bottom.0,
                    left: layout.gaps.outer.left.0,
                    right: layout.gaps.outer.right.0,
                },
            },
            flatten_containers: layout.normalization.flatten_containers,
            opposite_orientation_for_nested: layout
                .normalization
                .opposite_orientation_for_nested_containers,
        }
    }
}

/// One window placement produced by a layout pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafLayout {
    pub node: NodeId,
    pub window: WindowId,
    pub rect: Rect,
}

/// State threaded through one layout pass over a workspace tree.
pub(crate) struct LayoutPass<'a> {
    pub tree: &'a mut Tree,
    pub options: &'a Options,
    /// Window currently under pointer-driven resize, if any. Its rect is
    /// owned by the user's pointer while the flag is set.
    pub manipulated: Option<WindowId>,
    pub out: Vec<LeafLayout>,
}

impl<'a> LayoutPass<'a> {
    pub fn new(
        tree: &'a mut Tree,
        options: &'a Options,
        manipulated: Option<WindowId>,
    ) -> Self {
        Self {
            tree,
            options,
            manipulated,
            out: Vec::new(),
        }
    }

    /// Lays out a subtree into `rect`, with `virt` being the same cell in
    /// gap-free coordinates.
    pub fn layout_node(&mut self, node: NodeId, rect: Rect, virt: Rect) {
        enum Dispatch {
            Window(WindowId),
            Container(LayoutKind, usize),
        }

        let dispatch = match &mut self.tree.get_mut(node).expect("node exists").kind {
            NodeKind::Window(w) => {
                w.last_physical = Some(rect);
                w.last_virtual = Some(virt);
                Dispatch::Window(w.id)
            }
            NodeKind::Container(c) => {
                c.last_rect = Some(rect);
                c.last_virtual = Some(virt);
                Dispatch::Container(c.layout, c.children.len())
            }
        };

        match dispatch {
            Dispatch::Window(window) => {
                self.out.push(LeafLayout { node, window, rect });
            }
            Dispatch::Container(_, 0) => {}
            Dispatch::Container(layout, _) => match layout {
                LayoutKind::Tiles => tiles::layout(self, node, rect, virt),
                LayoutKind::Accordion => accordion::layout(self, node, rect),
                LayoutKind::Scroll => scroll::layout(self, node, rect),
                LayoutKind::Master => {
                    self.ensure_master_cache(node);
                    master::layout(self, node, rect, virt);
                }
                LayoutKind::Dwindle => dwindle::layout(self, node, rect),
            },
        }
    }

    fn ensure_master_cache(&mut self, node: NodeId) {
        let percent = self.options.master_default_percent;
        let container = self.tree.container_mut(node).expect("container exists");
        if !matches!(container.state, ContainerState::Master(_)) {
            container.state = ContainerState::Master(MasterCache::new(percent, MasterSide::Left));
        }
    }

    /// Records a window placement. Used by layouts that bypass the recursive
    /// dispatch (Dwindle positions windows from its own split tree).
    pub fn push_window(&mut self, window: WindowId, rect: Rect) {
        let Some(node) = self.tree.node_for_window(window) else {
            return;
        };
        if let Some(w) = self.tree.window_mut(node) {
            w.last_physical = Some(rect);
            w.last_virtual = Some(rect);
        }
        self.out.push(LeafLayout { node, window, rect });
    }
}

fn ipc_layout(layout: LayoutKind) -> LayoutTreeLayout {
    match layout {
        LayoutKind::Tiles => LayoutTreeLayout::Tiles,
        LayoutKind::Accordion => LayoutTreeLayout::Accordion,
        LayoutKind::Dwindle => LayoutTreeLayout::Dwindle,
        LayoutKind::Scroll => LayoutTreeLayout::Scroll,
        LayoutKind::Master => LayoutTreeLayout::Master,
    }
}

/// Dumps a tree into the ipc representation.
pub fn dump_tree(tree: &Tree, focused: Option<NodeId>) -> LayoutTreeNode {
    fn dump_node(tree: &Tree, id: NodeId, focus_path: &[NodeId]) -> LayoutTreeNode {
        let node = tree.get(id).expect("node exists");
        let focused = focus_path.contains(&id);
        match &node.kind {
            NodeKind::Window(w) => LayoutTreeNode {
                window_id: Some(w.id.0),
                layout: None,
                horizontal: None,
                focused,
                rect: w
                    .last_physical
                    .map(|r| (r.loc.x, r.loc.y, r.size.w, r.size.h)),
                children: Vec::new(),
            },
            NodeKind::Container(c) => LayoutTreeNode {
                window_id: None,
                layout: Some(ipc_layout(c.layout)),
                horizontal: Some(c.orientation == Axis::Horizontal),
                focused,
                rect: c.last_rect.map(|r| (r.loc.x, r.loc.y, r.size.w, r.size.h)),
                children: c
                    .children
                    .iter()
                    .map(|&child| dump_node(tree, child, focus_path))
                    .collect(),
            },
        }
    }

    let mut focus_path = Vec::new();
    if let Some(mut current) = focused {
        focus_path.push(current);
        while let Some(parent) = tree.get(current).and_then(|n| n.parent) {
            focus_path.push(parent);
            current = parent;
        }
    }

    dump_node(tree, tree.root(), &focus_path)
}

/// Compact textual rendering of a tree, for snapshots and logs.
pub fn render_tree(tree: &Tree) -> String {
    fn write_node(tree: &Tree, id: NodeId, out: &mut String, indent: usize) {
        for _ in 0..indent {
            out.push_str("  ");
        }
        let node = tree.get(id).expect("node exists");
        match &node.kind {
            NodeKind::Window(w) => {
                out.push_str(&format!("window {}", w.id));
                if let Some(r) = w.last_physical {
                    out.push_str(&format!(" [{r}]"));
                }
                out.push('\n');
            }
            NodeKind::Container(c) => {
                let orientation = match c.orientation {
                    Axis::Horizontal => "h",
                    Axis::Vertical => "v",
                };
                let layout = match c.layout {
                    LayoutKind::Tiles => "tiles",
                    LayoutKind::Accordion => "accordion",
                    LayoutKind::Dwindle => "dwindle",
                    LayoutKind::Scroll => "scroll",
                    LayoutKind::Master => "master",
                };
                out.push_str(&format!("{layout} {orientation}"));
                if let Some(r) = c.last_rect {
                    out.push_str(&format!(" [{r}]"));
                }
                out.push('\n');
                for &child in &c.children {
                    write_node(tree, child, out, indent + 1);
                }
            }
        }
    }

    let mut out = String::new();
    write_node(tree, tree.root(), &mut out, 0);
    out
}
