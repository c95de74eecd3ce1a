//! Horizontal carousel layout.
//!
//! The most recent child is the anchor. It is placed near the centre of the
//! container with a peek of the neighbours on either side; the remaining
//! children run contiguously left and right of it and may extend past the
//! container rect (the backend clips). Widths are sticky: once a child has
//! been laid out its horizontal weight records the assigned width, so
//! resizes survive anchor changes. A child that has never been laid out gets
//! `focused_width_ratio` of the container width.
//!
//! After balance-sizes the recorded widths are cleared; each child collapses
//! back to the default width on its next layout.

use super::container::{NodeId, NodeKind};
use super::LayoutPass;
use crate::geometry::{Axis, Rect};

pub(super) fn layout(pass: &mut LayoutPass, node: NodeId, rect: Rect) {
    let (children, anchor) = {
        let container = pass.tree.container(node).expect("container exists");
        (container.children.clone(), container.recent_child_clamped())
    };

    if children.len() == 1 {
        pass.tree.set_weight(children[0], Axis::Horizontal, rect.size.w);
        pass.layout_node(children[0], rect, rect);
        return;
    }

    let ratio = pass.options.focused_width_ratio;
    let total = rect.size.w;
    let widths: Vec<f64> = children
        .iter()
        .map(|&child| {
            previous_width(pass, child).unwrap_or_else(|| (ratio * total).round())
        })
        .collect();

    // Anchor placement leaves (1 - ratio) / 2 of the container peeking on
    // either side when the anchor has the default width.
    let anchor_x = (rect.left() + (1. - ratio) / 2. * total).round();

    let mut positions = vec![0.; children.len()];
    positions[anchor] = anchor_x;
    let mut cursor = anchor_x + widths[anchor];
    for i in anchor + 1..children.len() {
        positions[i] = cursor;
        cursor += widths[i];
    }
    cursor = anchor_x;
    for i in (0..anchor).rev() {
        cursor -= widths[i];
        positions[i] = cursor;
    }

    for (i, &child) in children.iter().enumerate() {
        let child_rect = Rect::from_loc_and_size(positions[i], rect.top(), widths[i], rect.size.h);
        pass.tree.set_weight(child, Axis::Horizontal, widths[i]);
        pass.layout_node(child, child_rect, child_rect);
    }
}

/// Width this child was last laid out with, if any.
///
/// The horizontal weight is the authoritative record (discrete resizes edit
/// it in place); it only counts once the child has actually been laid out.
fn previous_width(pass: &LayoutPass, child: NodeId) -> Option<f64> {
    let node = pass.tree.get(child)?;
    let laid_out = match &node.kind {
        NodeKind::Window(w) => w.last_virtual.is_some(),
        NodeKind::Container(c) => c.last_virtual.is_some(),
    };
    laid_out.then(|| node.weight.get(Axis::Horizontal))
}
