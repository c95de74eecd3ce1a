//! Weighted tile layout.
//!
//! Children split the container's extent along its orientation in proportion
//! to their adaptive weights. Weights are measured in gap-free pixels; any
//! deficit between the weight sum and the available span (weights drift as
//! monitors change) is spread equally across children before distribution, so
//! after every pass the weights sum back to the available span.

use super::container::NodeId;
use super::LayoutPass;
use crate::geometry::{split_with_gaps, Rect};

pub(super) fn layout(pass: &mut LayoutPass, node: NodeId, rect: Rect, virt: Rect) {
    let (axis, children) = {
        let container = pass.tree.container(node).expect("container exists");
        (container.orientation, container.children.clone())
    };
    let n = children.len();
    let inner = pass.options.gaps.inner.get(axis);
    let available = (rect.extent(axis) - inner * (n - 1) as f64).max(0.);

    let mut weights: Vec<f64> = children
        .iter()
        .map(|&child| pass.tree.weight(child, axis))
        .collect();
    let sum: f64 = weights.iter().sum();
    let deficit = available - sum;
    if deficit != 0. {
        let share = deficit / n as f64;
        for weight in &mut weights {
            *weight += share;
        }
    }
    for (&child, &weight) in children.iter().zip(&weights) {
        pass.tree.set_weight(child, axis, weight);
    }

    let cells = split_with_gaps(rect.pos(axis), &weights, inner);
    let mut virtual_pos = virt.pos(axis);
    for ((&child, &(pos, extent)), &weight) in children.iter().zip(&cells).zip(&weights) {
        let mut child_rect = rect;
        child_rect.set_pos(axis, pos);
        child_rect.set_extent(axis, extent);

        let mut child_virt = child_rect;
        child_virt.set_pos(axis, virtual_pos);
        child_virt.set_extent(axis, weight);
        virtual_pos += weight;

        pass.layout_node(child, child_rect, child_virt);
    }
}

#[cfg(test)]
mod tests {
    use trellis_ipc::WindowId;

    use crate::geometry::{Axis, Rect};
    use crate::layout::container::Tree;
    use crate::layout::{LayoutKind, LayoutPass, Options};

    fn tiled_tree(n: u64) -> Tree {
        let mut tree = Tree::new(Axis::Horizontal, LayoutKind::Tiles);
        let root = tree.root();
        for i in 0..n {
            let node = tree.create_window(WindowId(i + 1), None);
            tree.bind(node, root, i as usize, None);
        }
        tree
    }

    #[test]
    fn equal_weights_round_to_cover_the_rect() {
        let mut tree = tiled_tree(3);
        let mut options = Options::default();
        options.gaps.inner.h = 10.;
        let rect = Rect::from_loc_and_size(0., 0., 900., 400.);

        let mut pass = LayoutPass::new(&mut tree, &options, None);
        pass.layout_node(pass.tree.root(), rect, rect);
        let out = pass.out;

        let rects: Vec<_> = out.iter().map(|l| l.rect).collect();
        assert_eq!(rects[0], Rect::from_loc_and_size(0., 0., 293., 400.));
        assert_eq!(rects[1], Rect::from_loc_and_size(303., 0., 294., 400.));
        assert_eq!(rects[2], Rect::from_loc_and_size(607., 0., 293., 400.));
    }

    #[test]
    fn weights_sum_to_available_span_after_layout() {
        let mut tree = tiled_tree(4);
        let root = tree.root();
        let children = tree.container(root).unwrap().children.clone();
        tree.set_weight(children[0], Axis::Horizontal, 3.);

        let mut options = Options::default();
        options.gaps.inner.h = 8.;
        let rect = Rect::from_loc_and_size(0., 0., 1280., 720.);

        let mut pass = LayoutPass::new(&mut tree, &options, None);
        pass.layout_node(root, rect, rect);

        let sum: f64 = children
            .iter()
            .map(|&c| tree.weight(c, Axis::Horizontal))
            .sum();
        let available = 1280. - 3. * 8.;
        assert!((sum - available).abs() < 1e-6);
    }

    #[test]
    fn unequal_weights_keep_proportions() {
        let mut tree = tiled_tree(2);
        let root = tree.root();
        let children = tree.container(root).unwrap().children.clone();
        // Pixel-scaled weights with no deficit split 3:1 exactly.
        tree.set_weight(children[0], Axis::Horizontal, 750.);
        tree.set_weight(children[1], Axis::Horizontal, 250.);

        let rect = Rect::from_loc_and_size(0., 0., 1000., 500.);
        let options = Options::default();
        let mut pass = LayoutPass::new(&mut tree, &options, None);
        pass.layout_node(root, rect, rect);
        let out = pass.out;

        assert_eq!(out[0].rect.size.w, 750.);
        assert_eq!(out[1].rect.size.w, 250.);
        assert_eq!(out[1].rect.loc.x, 750.);
    }
}
