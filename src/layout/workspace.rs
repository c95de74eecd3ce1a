//! A workspace: one tree of tiled windows plus the auxiliary buckets, bound
//! to a monitor.

use trellis_ipc::WindowId;

use super::container::Tree;
use super::{LayoutPass, LeafLayout, Options};
use crate::backend::Monitor;
use crate::geometry::{Axis, Rect};

#[derive(Debug)]
pub struct Workspace {
    pub tree: Tree,
    pub monitor: Monitor,
    /// Windows placed by the user, not the engine. Their nodes stay in the
    /// arena, detached from the tree.
    pub floating: Vec<WindowId>,
    pub minimized: Vec<WindowId>,
    pub fullscreen: Vec<WindowId>,
    pub popups: Vec<WindowId>,
    /// Applications whose windows are currently hidden.
    pub hidden_apps: Vec<String>,
}

impl Workspace {
    pub fn new(monitor: Monitor, options: &Options) -> Self {
        // Carousels only run sideways.
        let orientation = if options.default_layout == super::LayoutKind::Scroll {
            Axis::Horizontal
        } else {
            options.default_orientation.unwrap_or({
                let frame = monitor.visible_frame;
                if frame.size.w >= frame.size.h {
                    Axis::Horizontal
                } else {
                    Axis::Vertical
                }
            })
        };
        Self {
            tree: Tree::new(orientation, options.default_layout),
            monitor,
            floating: Vec::new(),
            minimized: Vec::new(),
            fullscreen: Vec::new(),
            popups: Vec::new(),
            hidden_apps: Vec::new(),
        }
    }

    /// Workspace rect: the monitor's visible frame inset by the outer gaps.
    pub fn rect(&self, options: &Options) -> Rect {
        let outer = &options.gaps.outer;
        self.monitor
            .visible_frame
            .inset(outer.top, outer.bottom, outer.left, outer.right)
    }

    /// Runs a full layout pass over the tree. Fullscreen windows override
    /// their tiled placement and cover the visible frame, keeping the outer
    /// gaps only when configured to.
    pub fn layout(&mut self, options: &Options, manipulated: Option<WindowId>) -> Vec<LeafLayout> {
        let rect = self.rect(options);
        let root = self.tree.root();
        let mut pass = LayoutPass::new(&mut self.tree, options, manipulated);
        pass.layout_node(root, rect, rect);
        let mut out = pass.out;

        if !self.fullscreen.is_empty() {
            let fullscreen_rect = if options.no_outer_gaps_in_fullscreen {
                self.monitor.visible_frame
            } else {
                rect
            };
            out.retain(|leaf| !self.fullscreen.contains(&leaf.window));
            for &window in &self.fullscreen {
                let Some(node) = self.tree.node_for_window(window) else {
                    continue;
                };
                if let Some(w) = self.tree.window_mut(node) {
                    w.last_physical = Some(fullscreen_rect);
                }
                out.push(LeafLayout {
                    node,
                    window,
                    rect: fullscreen_rect,
                });
            }
        }

        out
    }

    /// Re-targets the workspace to another monitor. Floating windows keep
    /// their size and translate proportionally into the new visible frame;
    /// the returned placements still need pushing to the backend.
    pub fn set_monitor(&mut self, monitor: Monitor) -> Vec<(WindowId, Rect)> {
        let old = self.monitor.visible_frame;
        let new = monitor.visible_frame;
        self.monitor = monitor;

        let mut moved = Vec::new();
        for &window in &self.floating {
            let Some(node) = self.tree.node_for_window(window) else {
                continue;
            };
            let Some(w) = self.tree.window_mut(node) else {
                continue;
            };
            let Some(rect) = w.floating_rect else {
                continue;
            };
            let rel_x = if old.size.w > 0. {
                (rect.left() - old.left()) / old.size.w
            } else {
                0.
            };
            let rel_y = if old.size.h > 0. {
                (rect.top() - old.top()) / old.size.h
            } else {
                0.
            };
            let translated = Rect::from_loc_and_size(
                (new.left() + rel_x * new.size.w).round(),
                (new.top() + rel_y * new.size.h).round(),
                rect.size.w,
                rect.size.h,
            );
            w.floating_rect = Some(translated);
            moved.push((window, translated));
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn monitor(x: f64, y: f64, w: f64, h: f64) -> Monitor {
        Monitor {
            name: "test".into(),
            frame: Rect::from_loc_and_size(x, y, w, h),
            visible_frame: Rect::from_loc_and_size(x, y + 25., w, h - 25.),
        }
    }

    #[test]
    fn workspace_rect_applies_outer_gaps() {
        let mut options = Options::default();
        options.gaps.outer.top = 10.;
        options.gaps.outer.left = 20.;
        let ws = Workspace::new(monitor(0., 0., 1280., 825.), &options);
        assert_eq!(ws.rect(&options), Rect::from_loc_and_size(20., 35., 1260., 790.));
    }

    #[test]
    fn auto_orientation_follows_monitor_aspect() {
        let options = Options::default();
        let wide = Workspace::new(monitor(0., 0., 1920., 1105.), &options);
        assert_eq!(
            wide.tree.container(wide.tree.root()).unwrap().orientation,
            Axis::Horizontal
        );
        let tall = Workspace::new(monitor(0., 0., 1080., 1945.), &options);
        assert_eq!(
            tall.tree.container(tall.tree.root()).unwrap().orientation,
            Axis::Vertical
        );
    }

    #[test]
    fn floating_windows_translate_proportionally() {
        let options = Options::default();
        let mut ws = Workspace::new(monitor(0., 0., 1000., 825.), &options);
        let node = ws.tree.create_window(WindowId(1), None);
        ws.tree.window_mut(node).unwrap().floating_rect =
            Some(Rect::from_loc_and_size(250., 225., 400., 300.));
        ws.floating.push(WindowId(1));

        let moved = ws.set_monitor(monitor(2000., 0., 2000., 825.));
        assert_eq!(moved.len(), 1);
        let rect = moved[0].1;
        // A quarter of the way across the old monitor stays a quarter across
        // the new one; the size is untouched.
        assert_eq!(rect.loc, Point::new(2500., 225.));
        assert_eq!(rect.size.w, 400.);
        assert_eq!(rect.size.h, 300.);
    }
}
