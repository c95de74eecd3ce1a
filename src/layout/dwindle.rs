//! Binary split tree for the Dwindle layout.
//!
//! The cache persists across layout passes so split ratios survive window
//! churn elsewhere in the tree. It is authoritative for split geometry as
//! long as its recorded window set matches the container's; when the sets
//! diverge the cache rebuilds from the container's flat window list, except
//! while a window is under pointer-driven resize, in which case the rebuild
//! waits for the drag to settle.
//!
//! Every node keeps its last computed rect (`bbox`). During a pointer drag
//! each node additionally freezes a `bbox_snapshot`: ratio updates divide by
//! the snapshot instead of the live rect, so the resize feedback loop
//! (backend reports a rect, we update a ratio, the layout moves the rect,
//! the backend reports again) converges instead of compounding.

use slotmap::{new_key_type, SlotMap};
use tracing::warn;
use trellis_ipc::WindowId;

use super::container::{ContainerState, NodeId};
use super::{LayoutPass, Options};
use crate::backend::WindowBackend;
use crate::geometry::{Axis, Rect, Sign};
use crate::resize::ResizeEdges;

new_key_type! {
    /// Key of a node in a dwindle split tree.
    pub struct SplitId;
}

pub const RATIO_MIN: f64 = 0.1;
pub const RATIO_MAX: f64 = 1.9;

/// Distance from a workspace edge within which a node counts as pinned to it.
const EDGE_SNAP: f64 = 10.;

#[derive(Debug, Default)]
pub struct DwindleCache {
    nodes: SlotMap<SplitId, SplitNode>,
    root: Option<SplitId>,
    /// Window set recorded at the last rebuild, in container order.
    windows: Vec<WindowId>,
}

#[derive(Debug)]
struct SplitNode {
    parent: Option<SplitId>,
    /// Last computed rect.
    bbox: Rect,
    /// Rect frozen at the start of a pointer-resize session.
    bbox_snapshot: Option<Rect>,
    kind: SplitKind,
}

#[derive(Debug, Clone, Copy)]
enum SplitKind {
    Leaf {
        window: WindowId,
    },
    Split {
        /// First child's share: sizes are `ratio / (ratio + 1)` and
        /// `1 / (ratio + 1)` of the seam-adjusted extent.
        ratio: f64,
        /// A vertical seam: children sit side by side and split the width.
        vertical: bool,
        first: SplitId,
        second: SplitId,
    },
}

/// Lays out a Dwindle container. Entry point from the layout pass dispatch.
pub(super) fn layout(pass: &mut LayoutPass, node: NodeId, rect: Rect) {
    let windows = pass.tree.collect_windows(node);

    // Detach the cache so window nodes can be updated while walking it.
    let container = pass.tree.container_mut(node).expect("container exists");
    let mut state = std::mem::take(&mut container.state);
    if !matches!(state, ContainerState::Dwindle(_)) {
        state = ContainerState::Dwindle(DwindleCache::default());
    }
    let ContainerState::Dwindle(cache) = &mut state else {
        unreachable!()
    };

    if cache.needs_rebuild(&windows) {
        if pass.manipulated.is_none() {
            cache.rebuild(&windows, rect, pass.options);
        } else {
            tracing::debug!("deferring split tree rebuild until the drag settles");
        }
    }

    let manipulated = pass.manipulated;
    let options = pass.options;
    cache.layout(rect, options, manipulated, &mut |window, child_rect| {
        pass.push_window(window, child_rect);
    });

    pass.tree.container_mut(node).expect("container exists").state = state;
}

impl DwindleCache {
    /// Whether the recorded window set differs from `windows`.
    pub fn needs_rebuild(&self, windows: &[WindowId]) -> bool {
        if self.windows.len() != windows.len() {
            return true;
        }
        let mut recorded: Vec<_> = self.windows.clone();
        let mut current: Vec<_> = windows.to_vec();
        recorded.sort();
        current.sort();
        recorded != current
    }

    /// Rebuilds the split tree from a flat window list.
    ///
    /// Windows are split in halves; each split's seam orientation follows the
    /// subtree rect's aspect ratio, biased by `split_width_multiplier`.
    pub fn rebuild(&mut self, windows: &[WindowId], rect: Rect, options: &Options) {
        self.nodes.clear();
        self.root = None;
        self.windows = windows.to_vec();
        if windows.is_empty() {
            return;
        }
        let root = self.build(windows, rect, options);
        self.root = Some(root);
    }

    fn build(&mut self, windows: &[WindowId], rect: Rect, options: &Options) -> SplitId {
        if windows.len() == 1 {
            return self.nodes.insert(SplitNode {
                parent: None,
                bbox: rect,
                bbox_snapshot: None,
                kind: SplitKind::Leaf { window: windows[0] },
            });
        }

        let mid = windows.len() / 2;
        let vertical = split_vertically(rect, options.split_width_multiplier);
        let ratio = options.dwindle_default_split_ratio;
        let axis = seam_axis(vertical);
        let extent = rect.extent(axis);
        let first_extent = extent * ratio / (ratio + 1.);

        let mut first_rect = rect;
        first_rect.set_extent(axis, first_extent);
        let mut second_rect = rect;
        second_rect.set_pos(axis, rect.pos(axis) + first_extent);
        second_rect.set_extent(axis, extent - first_extent);

        let first = self.build(&windows[..mid], first_rect, options);
        let second = self.build(&windows[mid..], second_rect, options);
        let id = self.nodes.insert(SplitNode {
            parent: None,
            bbox: rect,
            bbox_snapshot: None,
            kind: SplitKind::Split {
                ratio,
                vertical,
                first,
                second,
            },
        });
        self.nodes[first].parent = Some(id);
        self.nodes[second].parent = Some(id);
        id
    }

    /// Recursive layout pass over the split tree.
    ///
    /// `push` receives every leaf placement, including the manipulated
    /// window's: the caller keeps the model fresh for all windows and skips
    /// the backend write for the one the pointer owns.
    pub fn layout(
        &mut self,
        rect: Rect,
        options: &Options,
        manipulated: Option<WindowId>,
        push: &mut dyn FnMut(WindowId, Rect),
    ) {
        if let Some(root) = self.root {
            self.layout_node(root, rect, options, manipulated, push);
        }
    }

    fn layout_node(
        &mut self,
        id: SplitId,
        rect: Rect,
        options: &Options,
        manipulated: Option<WindowId>,
        push: &mut dyn FnMut(WindowId, Rect),
    ) {
        let kind = {
            let node = &mut self.nodes[id];
            if manipulated.is_none() {
                node.bbox = rect;
                node.bbox_snapshot = None;
            } else {
                if node.bbox_snapshot.is_none() {
                    node.bbox_snapshot = Some(node.bbox);
                }
                node.bbox = rect;
            }
            node.kind
        };

        match kind {
            SplitKind::Leaf { window } => push(window, rect),
            SplitKind::Split {
                ratio,
                vertical,
                first,
                second,
            } => {
                let axis = seam_axis(vertical);
                let gap = options.gaps.inner.get(axis);
                let extent = rect.extent(axis);
                let inner_space = (extent - gap).max(0.);
                let first_extent = (inner_space * ratio / (ratio + 1.)).round();
                let second_extent = inner_space - first_extent;

                let mut first_rect = rect;
                first_rect.set_extent(axis, first_extent);
                let mut second_rect = rect;
                second_rect.set_pos(axis, rect.pos(axis) + first_extent + gap);
                second_rect.set_extent(axis, second_extent);

                self.layout_node(first, first_rect, options, manipulated, push);
                self.layout_node(second, second_rect, options, manipulated, push);
            }
        }
    }

    /// Applies a resize to the splits controlling a window.
    ///
    /// In smart mode an axis is dropped when the window is pinned to both of
    /// the workspace edges on that axis, and the delta is applied to both the
    /// outer controlling split and the compensating inner one; standard mode
    /// touches only the outer split.
    #[allow(clippy::too_many_arguments)]
    pub fn resize(
        &mut self,
        window: WindowId,
        delta: (f64, f64),
        should_grow: bool,
        edges: ResizeEdges,
        workspace_box: Rect,
        sensitivity: f64,
        smart: bool,
    ) {
        let Some(leaf) = self.leaf_for_window(window) else {
            return;
        };
        let (mut dx, mut dy) = delta;

        if smart {
            let bbox = self.nodes[leaf].bbox;
            let left = (bbox.left() - workspace_box.left()).abs() < EDGE_SNAP;
            let right = (bbox.right() - workspace_box.right()).abs() < EDGE_SNAP;
            let top = (bbox.top() - workspace_box.top()).abs() < EDGE_SNAP;
            let bottom = (bbox.bottom() - workspace_box.bottom()).abs() < EDGE_SNAP;
            if left && right {
                dx = 0.;
            }
            if top && bottom {
                dy = 0.;
            }
        }
        if edges.horizontal.is_none() {
            dx = 0.;
        }
        if edges.vertical.is_none() {
            dy = 0.;
        }
        if dx == 0. && dy == 0. {
            return;
        }

        let growth = if should_grow { 1. } else { -1. };
        for (axis, d, sign) in [
            (Axis::Horizontal, dx, edges.horizontal),
            (Axis::Vertical, dy, edges.vertical),
        ] {
            if d == 0. {
                continue;
            }
            let Some(sign) = sign else { continue };
            let Some((outer, outer_first)) = self.controlling_split(leaf, axis, sign, true)
            else {
                continue;
            };

            let orientation = if outer_first { 1. } else { -1. };
            let signed_px = orientation * growth * d.abs() * sensitivity;
            self.bump_ratio(outer, axis, signed_px);

            // The inner split is the nearest ancestor on the opposite side;
            // nudging it by the same amount keeps the neighbours across
            // nested splits balanced.
            if smart {
                if let Some((inner, _)) = self.controlling_split(leaf, axis, sign, false) {
                    self.bump_ratio(inner, axis, signed_px);
                }
            }
        }
    }

    /// Nearest ancestor split along `axis` where the subtree containing
    /// `from` sits on the drag side (`same_side`) or opposite it.
    ///
    /// Returns the split and whether the subtree is its first child.
    fn controlling_split(
        &self,
        from: SplitId,
        axis: Axis,
        edge: Sign,
        same_side: bool,
    ) -> Option<(SplitId, bool)> {
        let mut current = from;
        while let Some(parent) = self.nodes[current].parent {
            if let SplitKind::Split {
                vertical, first, ..
            } = self.nodes[parent].kind
            {
                if seam_axis(vertical) == axis {
                    let is_first = first == current;
                    let drag_side_is_first = edge == Sign::Positive;
                    let matches = if same_side {
                        is_first == drag_side_is_first
                    } else {
                        is_first != drag_side_is_first
                    };
                    if matches {
                        return Some((parent, is_first));
                    }
                }
            }
            current = parent;
        }
        None
    }

    fn bump_ratio(&mut self, id: SplitId, axis: Axis, signed_px: f64) {
        let node = &mut self.nodes[id];
        // The snapshot, when frozen, is the divisor: live rects move under
        // the pointer and would feed the resize back into itself.
        let basis = node.bbox_snapshot.unwrap_or(node.bbox);
        let size = basis.extent(axis);
        if size <= 0. {
            return;
        }
        if let SplitKind::Split { ratio, .. } = &mut node.kind {
            *ratio = (*ratio + signed_px / size).clamp(RATIO_MIN, RATIO_MAX);
        }
    }

    /// Resets every split ratio to the configured default.
    pub fn balance(&mut self, default_ratio: f64) {
        for node in self.nodes.values_mut() {
            if let SplitKind::Split { ratio, .. } = &mut node.kind {
                *ratio = default_ratio;
            }
        }
    }

    pub fn clear_snapshots(&mut self) {
        for node in self.nodes.values_mut() {
            node.bbox_snapshot = None;
        }
    }

    pub fn has_snapshots(&self) -> bool {
        self.nodes.values().any(|n| n.bbox_snapshot.is_some())
    }

    /// Refreshes leaf rects from the backend. Tolerates windows that were
    /// moved outside the layout system; failures leave the recorded rect.
    pub fn sync_from_backend<B: WindowBackend>(&mut self, backend: &mut B) {
        let leaves: Vec<(SplitId, WindowId)> = self
            .nodes
            .iter()
            .filter_map(|(id, node)| match node.kind {
                SplitKind::Leaf { window } => Some((id, window)),
                SplitKind::Split { .. } => None,
            })
            .collect();
        for (id, window) in leaves {
            match backend.get_rect(window) {
                Ok(rect) => self.nodes[id].bbox = rect,
                Err(err) => warn!("keeping stale geometry for window {window}: {err}"),
            }
        }
    }

    /// Leaf windows with their recorded rects.
    pub fn leaves(&self) -> Vec<(WindowId, Rect)> {
        self.nodes
            .values()
            .filter_map(|node| match node.kind {
                SplitKind::Leaf { window } => Some((window, node.bbox)),
                SplitKind::Split { .. } => None,
            })
            .collect()
    }

    fn leaf_for_window(&self, window: WindowId) -> Option<SplitId> {
        self.nodes.iter().find_map(|(id, node)| match node.kind {
            SplitKind::Leaf { window: w } if w == window => Some(id),
            _ => None,
        })
    }

    /// Exchanges the windows of two leaves, keeping the split geometry.
    pub fn swap_windows(&mut self, a: WindowId, b: WindowId) {
        let Some(leaf_a) = self.leaf_for_window(a) else {
            return;
        };
        let Some(leaf_b) = self.leaf_for_window(b) else {
            return;
        };
        self.nodes[leaf_a].kind = SplitKind::Leaf { window: b };
        self.nodes[leaf_b].kind = SplitKind::Leaf { window: a };
    }

    /// Recorded window set from the last rebuild.
    pub fn recorded_windows(&self) -> &[WindowId] {
        &self.windows
    }

    /// Window ids reachable as leaves from the root.
    pub fn reachable_windows(&self) -> Vec<WindowId> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.collect_reachable(root, &mut out);
        }
        out
    }

    fn collect_reachable(&self, id: SplitId, out: &mut Vec<WindowId>) {
        match self.nodes[id].kind {
            SplitKind::Leaf { window } => out.push(window),
            SplitKind::Split { first, second, .. } => {
                self.collect_reachable(first, out);
                self.collect_reachable(second, out);
            }
        }
    }

    /// All split ratios, for diagnostics and invariant checks.
    pub fn split_ratios(&self) -> Vec<f64> {
        self.nodes
            .values()
            .filter_map(|node| match node.kind {
                SplitKind::Split { ratio, .. } => Some(ratio),
                SplitKind::Leaf { .. } => None,
            })
            .collect()
    }

    /// Indented rendering of the split tree, for logs and tests.
    pub fn render(&self) -> String {
        fn write_node(cache: &DwindleCache, id: SplitId, out: &mut String, indent: usize) {
            for _ in 0..indent {
                out.push_str("  ");
            }
            match cache.nodes[id].kind {
                SplitKind::Leaf { window } => {
                    out.push_str(&format!("leaf {window}\n"));
                }
                SplitKind::Split {
                    ratio,
                    vertical,
                    first,
                    second,
                } => {
                    let seam = if vertical { "v" } else { "h" };
                    out.push_str(&format!("split {seam} {ratio:.2}\n"));
                    write_node(cache, first, out, indent + 1);
                    write_node(cache, second, out, indent + 1);
                }
            }
        }

        match self.root {
            Some(root) => {
                let mut out = String::new();
                write_node(self, root, &mut out, 0);
                out
            }
            None => "<empty>\n".to_string(),
        }
    }
}

/// Axis a seam divides: a vertical seam splits the width.
fn seam_axis(vertical: bool) -> Axis {
    if vertical {
        Axis::Horizontal
    } else {
        Axis::Vertical
    }
}

/// A wide subtree splits side by side, a tall one top to bottom. The
/// multiplier biases the decision toward one or the other.
fn split_vertically(rect: Rect, multiplier: f64) -> bool {
    if rect.size.h <= 0. {
        return true;
    }
    rect.size.w / rect.size.h / multiplier >= 1.
}
