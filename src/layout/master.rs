//! Master/stack layout.
//!
//! The first child is the master and takes `percent` of the available width;
//! the remaining children stack vertically in the rest. The percent and the
//! master side live in a [`MasterCache`] stored in the container, created on
//! first layout and dropped when the container's layout changes away.

use super::container::{ContainerState, NodeId};
use super::LayoutPass;
use crate::geometry::{split_with_gaps, Rect};

pub const MASTER_PERCENT_MIN: f64 = 0.1;
pub const MASTER_PERCENT_MAX: f64 = 0.9;

/// Which side of the container holds the master area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasterCache {
    percent: f64,
    side: MasterSide,
}

impl MasterCache {
    pub fn new(percent: f64, side: MasterSide) -> Self {
        Self {
            percent: percent.clamp(MASTER_PERCENT_MIN, MASTER_PERCENT_MAX),
            side,
        }
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    pub fn set_percent(&mut self, percent: f64) {
        self.percent = percent.clamp(MASTER_PERCENT_MIN, MASTER_PERCENT_MAX);
    }

    pub fn side(&self) -> MasterSide {
        self.side
    }

    pub fn set_side(&mut self, side: MasterSide) {
        self.side = side;
    }
}

pub(super) fn layout(pass: &mut LayoutPass, node: NodeId, rect: Rect, virt: Rect) {
    let (children, percent, side) = {
        let container = pass.tree.container(node).expect("container exists");
        let ContainerState::Master(cache) = &container.state else {
            unreachable!("master layout without a cache");
        };
        (container.children.clone(), cache.percent(), cache.side())
    };

    if children.len() == 1 {
        pass.layout_node(children[0], rect, virt);
        return;
    }

    let inner_h = pass.options.gaps.inner.h;
    let inner_v = pass.options.gaps.inner.v;
    let available = (rect.size.w - inner_h).max(0.);
    let master_width = (available * percent).round();
    let stack_width = available - master_width;

    let (master_x, stack_x) = match side {
        MasterSide::Left => (rect.left(), rect.left() + master_width + inner_h),
        MasterSide::Right => (rect.left() + stack_width + inner_h, rect.left()),
    };

    let master_rect = Rect::from_loc_and_size(master_x, rect.top(), master_width, rect.size.h);
    let mut master_virt = master_rect;
    master_virt.loc.x = match side {
        MasterSide::Left => virt.left(),
        MasterSide::Right => virt.left() + stack_width,
    };
    pass.layout_node(children[0], master_rect, master_virt);

    let stack = &children[1..];
    let count = stack.len();
    let equal = ((rect.size.h - inner_v * (count - 1) as f64) / count as f64).max(0.);
    let heights = vec![equal; count];
    let cells = split_with_gaps(rect.top(), &heights, inner_v);
    for (&child, &(y, height)) in stack.iter().zip(&cells) {
        let child_rect = Rect::from_loc_and_size(stack_x, y, stack_width, height);
        pass.layout_node(child, child_rect, child_rect);
    }
}

#[cfg(test)]
mod tests {
    use trellis_ipc::WindowId;

    use crate::geometry::{Axis, Rect};
    use crate::layout::container::{ContainerState, Tree};
    use crate::layout::{LayoutKind, LayoutPass, Options};

    fn master_tree(n: u64) -> Tree {
        let mut tree = Tree::new(Axis::Horizontal, LayoutKind::Master);
        let root = tree.root();
        for i in 0..n {
            let node = tree.create_window(WindowId(i + 1), None);
            tree.bind(node, root, i as usize, None);
        }
        tree
    }

    fn run_layout(tree: &mut Tree, options: &Options, rect: Rect) -> Vec<Rect> {
        let root = tree.root();
        let mut pass = LayoutPass::new(tree, options, None);
        pass.layout_node(root, rect, rect);
        let mut rects: Vec<_> = pass.out.clone();
        rects.sort_by_key(|l| l.window.0);
        rects.into_iter().map(|l| l.rect).collect()
    }

    #[test]
    fn master_and_stack_split_the_width() {
        let mut tree = master_tree(3);
        let mut options = Options::default();
        options.gaps.inner = crate::layout::container::PerAxis::splat(10.);
        let rect = Rect::from_loc_and_size(0., 0., 1000., 600.);
        let rects = run_layout(&mut tree, &options, rect);

        assert_eq!(rects[0], Rect::from_loc_and_size(0., 0., 495., 600.));
        assert_eq!(rects[1], Rect::from_loc_and_size(505., 0., 495., 295.));
        assert_eq!(rects[2], Rect::from_loc_and_size(505., 305., 495., 295.));
    }

    #[test]
    fn right_sided_master_swaps_the_areas() {
        let mut tree = master_tree(2);
        let root = tree.root();
        let mut options = Options::default();
        options.gaps.inner = crate::layout::container::PerAxis::splat(10.);
        let rect = Rect::from_loc_and_size(0., 0., 1000., 600.);
        run_layout(&mut tree, &options, rect);

        match &mut tree.container_mut(root).unwrap().state {
            ContainerState::Master(cache) => cache.set_side(super::MasterSide::Right),
            _ => unreachable!(),
        }
        let rects = run_layout(&mut tree, &options, rect);

        assert_eq!(rects[0], Rect::from_loc_and_size(505., 0., 495., 600.));
        assert_eq!(rects[1], Rect::from_loc_and_size(0., 0., 495., 600.));
    }

    #[test]
    fn single_child_takes_the_full_rect() {
        let mut tree = master_tree(1);
        let rect = Rect::from_loc_and_size(0., 0., 1000., 600.);
        let rects = run_layout(&mut tree, &Options::default(), rect);
        assert_eq!(rects[0], rect);
    }

    #[test]
    fn percent_is_clamped() {
        let mut cache = super::MasterCache::new(0.5, super::MasterSide::Left);
        cache.set_percent(0.05);
        assert_eq!(cache.percent(), 0.1);
        cache.set_percent(2.);
        assert_eq!(cache.percent(), 0.9);
    }
}
