//! Accordion layout.
//!
//! Every child gets the full container rect minus padding peels along the
//! orientation axis. Peels depend on the child's position relative to the
//! most recent child: outer edges get none, the sides facing the most recent
//! child get a double peel, every other interior side gets a single one. The
//! result is a stack where the most recent child's edges stay visible.

use super::container::NodeId;
use super::LayoutPass;
use crate::geometry::Rect;

pub(super) fn layout(pass: &mut LayoutPass, node: NodeId, rect: Rect) {
    let (axis, children, recent) = {
        let container = pass.tree.container(node).expect("container exists");
        (
            container.orientation,
            container.children.clone(),
            container.recent_child_clamped(),
        )
    };
    let last = children.len() - 1;
    let padding = pass.options.accordion_padding;

    for (i, &child) in children.iter().enumerate() {
        let start_peels = if i == 0 {
            0.
        } else if i == recent + 1 {
            2.
        } else {
            1.
        };
        let end_peels = if i == last {
            0.
        } else if i + 1 == recent {
            2.
        } else {
            1.
        };

        let mut child_rect = rect;
        child_rect.set_pos(axis, rect.pos(axis) + start_peels * padding);
        child_rect.set_extent(
            axis,
            (rect.extent(axis) - (start_peels + end_peels) * padding).max(0.),
        );
        pass.layout_node(child, child_rect, child_rect);
    }
}

#[cfg(test)]
mod tests {
    use trellis_ipc::WindowId;

    use crate::geometry::{Axis, Rect};
    use crate::layout::container::Tree;
    use crate::layout::{LayoutKind, LayoutPass, Options};

    fn accordion_tree(n: u64, recent: usize) -> Tree {
        let mut tree = Tree::new(Axis::Horizontal, LayoutKind::Accordion);
        let root = tree.root();
        for i in 0..n {
            let node = tree.create_window(WindowId(i + 1), None);
            tree.bind(node, root, i as usize, None);
        }
        tree.container_mut(root).unwrap().recent_child = recent;
        tree
    }

    #[test]
    fn single_child_takes_the_full_rect() {
        let mut tree = accordion_tree(1, 0);
        let rect = Rect::from_loc_and_size(0., 0., 800., 600.);
        let options = Options::default();
        let mut pass = LayoutPass::new(&mut tree, &options, None);
        pass.layout_node(pass.tree.root(), rect, rect);
        assert_eq!(pass.out[0].rect, rect);
    }

    #[test]
    fn peels_follow_the_most_recent_child() {
        // Four children, the most recent is index 1, padding 30.
        let mut tree = accordion_tree(4, 1);
        let rect = Rect::from_loc_and_size(0., 0., 1000., 600.);
        let options = Options::default();
        let mut pass = LayoutPass::new(&mut tree, &options, None);
        pass.layout_node(pass.tree.root(), rect, rect);
        let rects: Vec<_> = pass.out.iter().map(|l| l.rect).collect();

        // First child: outer edge bare, double peel facing the recent child.
        assert_eq!(rects[0], Rect::from_loc_and_size(0., 0., 940., 600.));
        // The recent child: single peel on both interior sides.
        assert_eq!(rects[1], Rect::from_loc_and_size(30., 0., 940., 600.));
        // Right neighbour of the recent child: double peel on its left.
        assert_eq!(rects[2], Rect::from_loc_and_size(60., 0., 910., 600.));
        // Last child: peel only on its interior side.
        assert_eq!(rects[3], Rect::from_loc_and_size(30., 0., 970., 600.));
    }

    #[test]
    fn vertical_accordion_peels_top_and_bottom() {
        let mut tree = Tree::new(Axis::Vertical, LayoutKind::Accordion);
        let root = tree.root();
        for i in 0..3u64 {
            let node = tree.create_window(WindowId(i + 1), None);
            tree.bind(node, root, i as usize, None);
        }
        tree.container_mut(root).unwrap().recent_child = 2;

        let rect = Rect::from_loc_and_size(0., 0., 800., 900.);
        let options = Options::default();
        let mut pass = LayoutPass::new(&mut tree, &options, None);
        pass.layout_node(root, rect, rect);
        let rects: Vec<_> = pass.out.iter().map(|l| l.rect).collect();

        // All widths untouched.
        assert!(rects.iter().all(|r| r.size.w == 800.));
        // Last child is most recent: its upper neighbour gets a double peel
        // at the bottom.
        assert_eq!(rects[1].loc.y, 30.);
        assert_eq!(rects[1].size.h, 900. - 30. - 60.);
        assert_eq!(rects[2], Rect::from_loc_and_size(0., 30., 800., 870.));
    }
}
