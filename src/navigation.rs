//! Spatial focus navigation.
//!
//! Each layout resolves neighbours its own way: ordered layouts walk the
//! container tree, Dwindle compares recorded window geometry (tolerating
//! windows that were moved outside the layout system), Accordion has no
//! spatial neighbours.

use ordered_float::OrderedFloat;
use tracing::trace;

use crate::backend::WindowBackend;
use crate::geometry::{Axis, Direction, Rect, Sign};
use crate::layout::container::{ContainerState, NodeId, NodeKind, Tree};
use crate::layout::{LayoutKind, Options};

/// Minimum perpendicular overlap, as a share of the smaller extent, for two
/// boxes to count as neighbours. Rejects diagonal adjacency.
const MIN_OVERLAP_RATIO: f64 = 0.1;

/// Slack added to the inner gap when testing edge adjacency.
const EDGE_TOUCH_SLACK: f64 = 5.;

/// How a layout resolves spatial neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationProvider {
    /// Walk the container tree.
    Tree,
    /// Compare recorded window geometry.
    Geometric,
}

/// Provider for a container layout. `None` means no spatial navigation.
pub fn provider_for(layout: LayoutKind) -> Option<NavigationProvider> {
    match layout {
        LayoutKind::Tiles | LayoutKind::Master | LayoutKind::Scroll => {
            Some(NavigationProvider::Tree)
        }
        LayoutKind::Dwindle => Some(NavigationProvider::Geometric),
        LayoutKind::Accordion => None,
    }
}

/// Finds the spatial neighbour of a window node in a direction. Returns
/// `None` at layout boundaries.
pub fn neighbor<B: WindowBackend>(
    tree: &mut Tree,
    backend: &mut B,
    options: &Options,
    from: NodeId,
    direction: Direction,
) -> Option<NodeId> {
    let parent = tree.get(from)?.parent?;
    let layout = tree.container(parent)?.layout;
    match provider_for(layout)? {
        NavigationProvider::Tree => tree_neighbor(tree, from, direction),
        NavigationProvider::Geometric => {
            geometric_neighbor(tree, backend, options, from, direction)
        }
    }
}

fn tree_neighbor(tree: &Tree, from: NodeId, direction: Direction) -> Option<NodeId> {
    // Master puts its children in two areas, so sibling order alone cannot
    // answer direction queries inside it.
    let mut start = from;
    if let Some(parent) = tree.get(from).and_then(|n| n.parent) {
        if tree
            .container(parent)
            .is_some_and(|c| c.layout == LayoutKind::Master)
        {
            if let Some(target) = master_neighbor(tree, parent, from, direction) {
                return enter_from(tree, target, direction);
            }
            // Boundary of the master container: keep walking up from it.
            start = parent;
        }
    }

    let (parent, index) = tree.closest_parent_toward(start, direction, None)?;
    let target_index = match direction.sign() {
        Sign::Negative => index - 1,
        Sign::Positive => index + 1,
    };
    let target = tree.container(parent)?.children[target_index];
    enter_from(tree, target, direction)
}

/// Neighbour lookup inside a Master container: horizontally between the
/// master and the stack, vertically within the stack.
fn master_neighbor(
    tree: &Tree,
    container_id: NodeId,
    from: NodeId,
    direction: Direction,
) -> Option<NodeId> {
    let container = tree.container(container_id)?;
    let index = container.children.iter().position(|&c| c == from)?;
    let master_is_left = match &container.state {
        ContainerState::Master(cache) => cache.side() == crate::layout::master::MasterSide::Left,
        _ => true,
    };
    if container.children.len() < 2 {
        return None;
    }

    match direction.axis() {
        Axis::Horizontal => {
            let toward_stack = (direction == Direction::Right) == master_is_left;
            if index == 0 && toward_stack {
                // Enter the stack at its most recent window.
                let recent = container.recent_child_clamped().max(1);
                container.children.get(recent).copied()
            } else if index > 0 && !toward_stack {
                Some(container.children[0])
            } else {
                None
            }
        }
        Axis::Vertical => {
            if index == 0 {
                return None;
            }
            let target = match direction.sign() {
                Sign::Negative => index - 1,
                Sign::Positive => index + 1,
            };
            if target < 1 {
                return None;
            }
            container.children.get(target).copied()
        }
    }
}

/// Descends into a subtree entered while moving in `direction`: along the
/// movement axis snap to the face nearest the source, elsewhere follow the
/// most recent child.
fn enter_from(tree: &Tree, node: NodeId, direction: Direction) -> Option<NodeId> {
    let mut current = node;
    loop {
        match &tree.get(current)?.kind {
            NodeKind::Window(_) => return Some(current),
            NodeKind::Container(c) => {
                if c.children.is_empty() {
                    return None;
                }
                current = if c.orientation == direction.axis() {
                    match direction.sign() {
                        Sign::Positive => c.children[0],
                        Sign::Negative => *c.children.last().unwrap(),
                    }
                } else {
                    c.children[c.recent_child_clamped()]
                };
            }
        }
    }
}

fn geometric_neighbor<B: WindowBackend>(
    tree: &mut Tree,
    backend: &mut B,
    options: &Options,
    from: NodeId,
    direction: Direction,
) -> Option<NodeId> {
    let window = match &tree.get(from)?.kind {
        NodeKind::Window(w) => w.id,
        NodeKind::Container(_) => return None,
    };
    let dwindle = nearest_dwindle(tree, from)?;

    let leaves = {
        let container = tree.container_mut(dwindle)?;
        let ContainerState::Dwindle(cache) = &mut container.state else {
            return None;
        };
        // Re-read geometry first: the user may have dragged windows around
        // outside the layout system since the last pass.
        cache.sync_from_backend(backend);
        cache.leaves()
    };
    let src_box = leaves.iter().find(|(w, _)| *w == window)?.1;

    let perpendicular = direction.axis().perpendicular();
    let gap = options.gaps.inner.get(direction.axis());
    let tolerance = gap + EDGE_TOUCH_SLACK;

    let (best, _) = leaves
        .into_iter()
        .filter(|&(w, _)| w != window)
        .filter_map(|(w, bbox)| {
            let (src_face, candidate_face) = match direction {
                Direction::Left => (src_box.left(), bbox.right()),
                Direction::Right => (src_box.right(), bbox.left()),
                Direction::Up => (src_box.top(), bbox.bottom()),
                Direction::Down => (src_box.bottom(), bbox.top()),
            };
            if (src_face - candidate_face).abs() >= tolerance {
                return None;
            }
            let overlap = interval_overlap(src_box, bbox, perpendicular);
            let min_extent = src_box.extent(perpendicular).min(bbox.extent(perpendicular));
            (overlap >= MIN_OVERLAP_RATIO * min_extent).then_some((w, overlap))
        })
        .max_by_key(|&(_, overlap)| OrderedFloat(overlap))?;

    trace!("geometric neighbour of {window} {direction:?}: {best}");
    tree.node_for_window(best)
}

fn nearest_dwindle(tree: &Tree, node: NodeId) -> Option<NodeId> {
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

fn interval_overlap(a: Rect, b: Rect, axis: Axis) -> f64 {
    let lo = a.pos(axis).max(b.pos(axis));
    let hi = (a.pos(axis) + a.extent(axis)).min(b.pos(axis) + b.extent(axis));
    (hi - lo).max(0.)
}
