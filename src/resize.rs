//! Discrete and pointer-driven resize.
//!
//! Discrete resizes come from commands and dispatch on the layout of the
//! window's containing container: Dwindle forwards to the split-tree cache,
//! Master converts pixels to a percent delta, Tiles and Scroll edit adaptive
//! weights (Tiles redistributes the delta across siblings to keep the weight
//! sum invariant, Scroll widths are absolute).
//!
//! Pointer-driven resizes arrive as backend notifications at arbitrary rates.
//! A 16 ms debouncer caps processing at roughly display rate; each accepted
//! event is diffed against the window's last layout rect, reduced to a single
//! moving edge, and applied like a discrete resize with the window flagged as
//! manipulated for the duration of the drag.

use std::time::Duration;

use arrayvec::ArrayVec;
use bitflags::bitflags;
use tracing::trace;
use trellis_ipc::{ResizeDimension, SizeChange, WindowId};

use crate::clock::Clock;
use crate::engine::CommandError;
use crate::geometry::{Axis, Rect, Sign};
use crate::layout::container::{ContainerState, NodeId, Tree};
use crate::layout::master::MasterSide;
use crate::layout::{LayoutKind, Options};

/// Pointer events closer together than this are dropped.
pub const POINTER_DEBOUNCE: Duration = Duration::from_millis(16);

/// Edge movements below this are treated as noise.
const EDGE_THRESHOLD: f64 = 1.;

bitflags! {
    /// Edges of a window rect.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResizeEdge: u8 {
        const LEFT = 1;
        const RIGHT = 1 << 1;
        const TOP = 1 << 2;
        const BOTTOM = 1 << 3;
    }
}

impl ResizeEdge {
    /// Axis of a single-edge value.
    fn axis(self) -> Axis {
        if self.intersects(ResizeEdge::LEFT | ResizeEdge::RIGHT) {
            Axis::Horizontal
        } else {
            Axis::Vertical
        }
    }

    fn sign(self) -> Sign {
        if self.intersects(ResizeEdge::LEFT | ResizeEdge::TOP) {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }
}

/// Per-axis resize directions handed to the dwindle cache.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEdges {
    pub horizontal: Option<Sign>,
    pub vertical: Option<Sign>,
}

impl ResizeEdges {
    fn from_edge(edge: ResizeEdge) -> Self {
        let mut edges = Self::default();
        match edge.axis() {
            Axis::Horizontal => edges.horizontal = Some(edge.sign()),
            Axis::Vertical => edges.vertical = Some(edge.sign()),
        }
        edges
    }
}

/// Applies a discrete resize command to a tiled window.
pub(crate) fn resize_window(
    tree: &mut Tree,
    options: &Options,
    workspace_rect: Rect,
    window_node: NodeId,
    dimension: ResizeDimension,
    change: SizeChange,
) -> Result<(), CommandError> {
    let parent = tree
        .get(window_node)
        .and_then(|n| n.parent)
        .ok_or(CommandError::FloatingNotSupported)?;
    let (layout, orientation) = {
        let container = tree.container(parent).ok_or(CommandError::FloatingNotSupported)?;
        (container.layout, container.orientation)
    };

    match layout {
        LayoutKind::Dwindle => {
            let window = tree.window(window_node).expect("window node").id;
            let (pixels, should_grow) = match change {
                SizeChange::Set(v) => (v as f64, true),
                SizeChange::Adjust(v) => (v.abs() as f64, v >= 0),
            };
            let (delta, edges) = match dimension {
                ResizeDimension::Width => (
                    (pixels, 0.),
                    ResizeEdges {
                        horizontal: Some(Sign::Positive),
                        vertical: None,
                    },
                ),
                ResizeDimension::Height => (
                    (0., pixels),
                    ResizeEdges {
                        horizontal: None,
                        vertical: Some(Sign::Positive),
                    },
                ),
                ResizeDimension::Smart => (
                    (pixels, pixels),
                    ResizeEdges {
                        horizontal: Some(Sign::Positive),
                        vertical: Some(Sign::Positive),
                    },
                ),
                ResizeDimension::SmartOpposite => (
                    (pixels, -pixels),
                    ResizeEdges {
                        horizontal: Some(Sign::Positive),
                        vertical: Some(Sign::Negative),
                    },
                ),
            };

            if let Some(dwindle) = dwindle_ancestor(tree, window_node) {
                if let Some(container) = tree.container_mut(dwindle) {
                    if let ContainerState::Dwindle(cache) = &mut container.state {
                        cache.resize(window, delta, should_grow, edges, workspace_rect, 1., true);
                    }
                }
            }
            Ok(())
        }

        LayoutKind::Master => {
            match dimension {
                ResizeDimension::Width | ResizeDimension::Smart => {}
                ResizeDimension::Height | ResizeDimension::SmartOpposite => {
                    return Err(CommandError::MasterHeightUnsupported);
                }
            }

            let rect = tree
                .container(parent)
                .and_then(|c| c.last_rect)
                .unwrap_or(workspace_rect);
            let available = (rect.size.w - options.gaps.inner.h).max(1.);

            let Some(container) = tree.container_mut(parent) else {
                return Ok(());
            };
            let ContainerState::Master(cache) = &mut container.state else {
                return Ok(());
            };
            match change {
                SizeChange::Set(v) => cache.set_percent(v as f64 / available),
                SizeChange::Adjust(v) => {
                    // A right-sided master is controlled from the other
                    // direction: the seam sits on its left.
                    let side_sign = match cache.side() {
                        MasterSide::Left => 1.,
                        MasterSide::Right => -1.,
                    };
                    cache.set_percent(cache.percent() + side_sign * v as f64 / available);
                }
            }
            Ok(())
        }

        LayoutKind::Tiles | LayoutKind::Scroll | LayoutKind::Accordion => {
            let axis = match dimension {
                ResizeDimension::Width => Axis::Horizontal,
                ResizeDimension::Height => Axis::Vertical,
                ResizeDimension::Smart => orientation,
                ResizeDimension::SmartOpposite => orientation.perpendicular(),
            };
            let Some((oriented_parent, index)) = tree.closest_oriented(window_node, axis) else {
                trace!("no oriented ancestor for resize, ignoring");
                return Ok(());
            };
            let target = tree.container(oriented_parent).expect("container").children[index];
            let current = tree.weight(target, axis);
            let delta = match change {
                SizeChange::Set(v) => v as f64 - current,
                SizeChange::Adjust(v) => v as f64,
            };
            let redistribute =
                tree.container(oriented_parent).expect("container").layout != LayoutKind::Scroll;
            apply_weight_delta(tree, oriented_parent, index, axis, delta, redistribute);
            Ok(())
        }
    }
}

/// Adjusts a child weight, optionally spreading the opposite delta across its
/// siblings so the weight sum stays put. The delta is clamped so neither the
/// target nor any sibling drops below one pixel.
fn apply_weight_delta(
    tree: &mut Tree,
    parent: NodeId,
    index: usize,
    axis: Axis,
    delta: f64,
    redistribute: bool,
) {
    let children = tree.container(parent).expect("container").children.clone();
    let target = children[index];
    let current = tree.weight(target, axis);

    if !redistribute {
        tree.set_weight(target, axis, (current + delta).max(1.));
        return;
    }

    let siblings: Vec<NodeId> = children
        .iter()
        .copied()
        .enumerate()
        .filter_map(|(i, c)| (i != index).then_some(c))
        .collect();
    if siblings.is_empty() {
        return;
    }
    let count = siblings.len() as f64;
    let min_sibling = siblings
        .iter()
        .map(|&s| tree.weight(s, axis))
        .fold(f64::INFINITY, f64::min);

    let delta = delta
        .min((min_sibling - 1.).max(0.) * count)
        .max(1. - current);
    if delta == 0. {
        return;
    }

    tree.set_weight(target, axis, current + delta);
    let share = delta / count;
    for sibling in siblings {
        let weight = tree.weight(sibling, axis);
        tree.set_weight(sibling, axis, weight - share);
    }
}

/// Nearest ancestor container with the Dwindle layout.
fn dwindle_ancestor(tree: &Tree, node: NodeId) -> Option<NodeId> {
    let mut current = node;
    while let Some(parent) = tree.get(current).and_then(|n| n.parent) {
        if tree
            .container(parent)
            .is_some_and(|c| c.layout == LayoutKind::Dwindle)
        {
            return Some(parent);
        }
        current = parent;
    }
    None
}

/// State machine for pointer-driven resize sessions.
///
/// The backend reports rect changes while the user drags; the driver picks
/// the moving edge, flags the window as manipulated and applies the change.
/// When the drag ends the session settles: the flag clears, weight memos and
/// box snapshots reset, and the caller issues a refresh.
#[derive(Debug, Default)]
pub struct PointerResizeDriver {
    last_event: Option<Duration>,
}

impl PointerResizeDriver {
    /// Handles one backend resize notification. Returns whether it was
    /// applied (debounced or unattributable events are dropped).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn handle_resized(
        &mut self,
        tree: &mut Tree,
        options: &Options,
        workspace_rect: Rect,
        clock: &Clock,
        manipulated: &mut Option<WindowId>,
        window: WindowId,
        current: Rect,
    ) -> bool {
        let now = clock.now();
        let debounced = self
            .last_event
            .is_some_and(|t| now.saturating_sub(t) < POINTER_DEBOUNCE);
        self.last_event = Some(now);
        if debounced {
            trace!("debounced pointer resize for window {window}");
            return false;
        }

        let Some(node) = tree.node_for_window(window) else {
            return false;
        };
        let Some(last) = tree.window(node).and_then(|w| w.last_physical) else {
            return false;
        };

        // Diff into edge movements, scanned in fixed priority order; the
        // first one past the threshold wins.
        let moves: ArrayVec<(ResizeEdge, f64), 4> = ArrayVec::from([
            (ResizeEdge::LEFT, last.left() - current.left()),
            (ResizeEdge::BOTTOM, current.bottom() - last.bottom()),
            (ResizeEdge::TOP, last.top() - current.top()),
            (ResizeEdge::RIGHT, current.right() - last.right()),
        ]);
        let Some(&(edge, diff)) = moves.iter().find(|(_, d)| d.abs() > EDGE_THRESHOLD) else {
            return false;
        };

        let Some(parent) = tree.get(node).and_then(|n| n.parent) else {
            return false;
        };
        let layout = tree.container(parent).expect("container").layout;
        let should_grow = diff > 0.;

        // Flag before mutating: any layout pass interleaved with the resize
        // must see the session and freeze its snapshots.
        *manipulated = Some(window);
        trace!("pointer resize: window {window} {edge:?} by {diff}");

        match layout {
            LayoutKind::Dwindle => {
                let delta = if edge == ResizeEdge::LEFT {
                    (-diff, 0.)
                } else if edge == ResizeEdge::RIGHT {
                    (diff, 0.)
                } else if edge == ResizeEdge::TOP {
                    (0., -diff)
                } else {
                    (0., diff)
                };
                if let Some(dwindle) = dwindle_ancestor(tree, node) {
                    if let Some(container) = tree.container_mut(dwindle) {
                        if let ContainerState::Dwindle(cache) = &mut container.state {
                            cache.resize(
                                window,
                                delta,
                                should_grow,
                                ResizeEdges::from_edge(edge),
                                workspace_rect,
                                options.mouse_sensitivity,
                                true,
                            );
                        }
                    }
                }
            }

            LayoutKind::Tiles | LayoutKind::Scroll | LayoutKind::Accordion => {
                let axis = edge.axis();
                if let Some((oriented_parent, index)) = tree.closest_oriented(node, axis) {
                    let target =
                        tree.container(oriented_parent).expect("container").children[index];
                    if let Some(entry) = tree.get_mut(target) {
                        if entry.weight_before_resize.is_none() {
                            entry.weight_before_resize = Some(entry.weight);
                        }
                    }
                    let redistribute = tree
                        .container(oriented_parent)
                        .expect("container")
                        .layout
                        != LayoutKind::Scroll;
                    apply_weight_delta(tree, oriented_parent, index, axis, diff, redistribute);
                }
            }

            LayoutKind::Master => {
                if edge.axis() == Axis::Horizontal {
                    let index = tree.own_index(node).unwrap_or(0);
                    let rect = tree
                        .container(parent)
                        .and_then(|c| c.last_rect)
                        .unwrap_or(workspace_rect);
                    let available = (rect.size.w - options.gaps.inner.h).max(1.);
                    if let Some(container) = tree.container_mut(parent) {
                        if let ContainerState::Master(cache) = &mut container.state {
                            // Growing the master widens it; growing a stack
                            // window narrows the master.
                            let role_sign = if index == 0 { 1. } else { -1. };
                            cache.set_percent(
                                cache.percent() + role_sign * diff / available,
                            );
                        }
                    }
                }
            }
        }

        true
    }

    /// Settles the session at the end of a drag. The caller refreshes after.
    pub(crate) fn drag_ended(&mut self, tree: &mut Tree, manipulated: &mut Option<WindowId>) {
        *manipulated = None;
        self.last_event = None;
        tree.reset_weight_memos();
        for id in tree.containers() {
            if let Some(container) = tree.container_mut(id) {
                if let ContainerState::Dwindle(cache) = &mut container.state {
                    cache.clear_snapshots();
                }
            }
        }
    }

    /// Aborts the session because its window disappeared: rolls partially
    /// applied weights back, then settles.
    pub(crate) fn abort(&mut self, tree: &mut Tree, manipulated: &mut Option<WindowId>) {
        tree.restore_weight_memos();
        self.drag_ended(tree, manipulated);
    }
}

#[cfg(test)]
mod tests {
    use trellis_ipc::WindowId;

    use super::*;

    fn tiled_tree(weights: &[f64]) -> (Tree, Vec<NodeId>) {
        let mut tree = Tree::new(Axis::Horizontal, LayoutKind::Tiles);
        let root = tree.root();
        let mut nodes = Vec::new();
        for (i, &w) in weights.iter().enumerate() {
            let node = tree.create_window(WindowId(i as u64 + 1), None);
            tree.bind(node, root, i, None);
            tree.set_weight(node, Axis::Horizontal, w);
            nodes.push(node);
        }
        (tree, nodes)
    }

    #[test]
    fn weight_delta_keeps_the_sum() {
        let (mut tree, nodes) = tiled_tree(&[300., 300., 300.]);
        let root = tree.root();
        apply_weight_delta(&mut tree, root, 0, Axis::Horizontal, 60., true);

        assert_eq!(tree.weight(nodes[0], Axis::Horizontal), 360.);
        assert_eq!(tree.weight(nodes[1], Axis::Horizontal), 270.);
        assert_eq!(tree.weight(nodes[2], Axis::Horizontal), 270.);
        let sum: f64 = nodes
            .iter()
            .map(|&n| tree.weight(n, Axis::Horizontal))
            .sum();
        assert_eq!(sum, 900.);
    }

    #[test]
    fn weight_delta_clamps_at_one_pixel_siblings() {
        let (mut tree, nodes) = tiled_tree(&[300., 5., 300.]);
        let root = tree.root();
        apply_weight_delta(&mut tree, root, 0, Axis::Horizontal, 500., true);

        // The smallest sibling stops at one pixel.
        assert_eq!(tree.weight(nodes[1], Axis::Horizontal), 1.);
        let sum: f64 = nodes
            .iter()
            .map(|&n| tree.weight(n, Axis::Horizontal))
            .sum();
        assert_eq!(sum, 605.);
    }

    #[test]
    fn absolute_weight_delta_touches_only_the_target() {
        let (mut tree, nodes) = tiled_tree(&[400., 400.]);
        let root = tree.root();
        apply_weight_delta(&mut tree, root, 1, Axis::Horizontal, -100., false);

        assert_eq!(tree.weight(nodes[0], Axis::Horizontal), 400.);
        assert_eq!(tree.weight(nodes[1], Axis::Horizontal), 300.);
    }

    #[test]
    fn resize_edges_carry_the_axis_and_sign() {
        let left = ResizeEdges::from_edge(ResizeEdge::LEFT);
        assert_eq!(left.horizontal, Some(Sign::Negative));
        assert_eq!(left.vertical, None);

        let bottom = ResizeEdges::from_edge(ResizeEdge::BOTTOM);
        assert_eq!(bottom.horizontal, None);
        assert_eq!(bottom.vertical, Some(Sign::Positive));
    }
}
