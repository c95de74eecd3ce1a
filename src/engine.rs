//! Command dispatch and the refresh pass.
//!
//! The engine is driven by a single-threaded event loop: commands, backend
//! notifications and monitor changes all arrive here, mutate the workspace
//! tree and caches, and end in a refresh pass that walks the active
//! workspace and pushes the resulting rects to the backend.
//!
//! Mutable cross-command state (focus, the pointer-manipulated window) lives
//! in a [`Session`] value threaded through every entry point rather than in
//! globals. Errors never escape as panics: command failures are returned to
//! the caller, backend failures are absorbed and logged, and anything that
//! leaves a cache inconsistent is repaired by the next rebuild.

use thiserror::Error;
use tracing::{debug, warn};
use trellis_ipc::{
    Command, LayoutSelector, LayoutTreeNode, Reply, ResizeDimension, Response, SizeChange,
    WindowId,
};

use crate::backend::{Monitor, MonitorProvider, WindowBackend};
use crate::clock::Clock;
use crate::geometry::{Axis, Direction, Rect};
use crate::layout::container::{ContainerState, NodeId, PerAxis};
use crate::layout::master::{MasterCache, MasterSide, MASTER_PERCENT_MAX, MASTER_PERCENT_MIN};
use crate::layout::workspace::Workspace;
use crate::layout::{dump_tree, dwindle, LayoutKind, Options};
use crate::navigation;
use crate::resize::{self, PointerResizeDriver};

/// Errors reported back to the command's IO surface. Engine state is left
/// unchanged when one of these is returned.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    #[error("no window is focused")]
    NoWindowFocused,
    #[error("the focused window is not tiling")]
    NonTiling,
    #[error("resizing floating windows is not supported")]
    FloatingNotSupported,
    #[error("height resize is not supported in the master layout")]
    MasterHeightUnsupported,
    #[error("the focused window is not in a master layout")]
    NotMasterLayout,
    #[error("the focused window is already the master")]
    AlreadyMaster,
}

/// Mutable cross-command state, threaded through every entry point.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub focused: Option<WindowId>,
    /// Window whose rect is owned by an ongoing pointer drag. At most one at
    /// any instant.
    pub manipulated: Option<WindowId>,
}

pub struct Engine<B> {
    backend: B,
    clock: Clock,
    options: Options,
    workspaces: Vec<Workspace>,
    active: usize,
    pointer: PointerResizeDriver,
}

impl<B: WindowBackend> Engine<B> {
    pub fn new(backend: B, monitors: Vec<Monitor>, options: Options, clock: Clock) -> Self {
        let mut workspaces: Vec<Workspace> = monitors
            .into_iter()
            .map(|monitor| Workspace::new(monitor, &options))
            .collect();
        if workspaces.is_empty() {
            warn!("no monitors reported, starting with a zero-sized workspace");
            workspaces.push(Workspace::new(
                Monitor {
                    name: String::new(),
                    frame: Rect::default(),
                    visible_frame: Rect::default(),
                },
                &options,
            ));
        }
        Self {
            backend,
            clock,
            options,
            workspaces,
            active: 0,
            pointer: PointerResizeDriver::default(),
        }
    }

    /// [`Engine::new`] with the monitors read from a provider.
    pub fn with_monitor_provider<P: MonitorProvider>(
        backend: B,
        provider: &P,
        options: Options,
        clock: Clock,
    ) -> Self {
        Self::new(backend, provider.monitors(), options, clock)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Swaps in a new configuration and relayouts.
    pub fn update_config(&mut self, session: &Session, options: Options) {
        self.options = options;
        self.refresh(session);
    }

    pub fn active_workspace(&self) -> &Workspace {
        &self.workspaces[self.active]
    }

    pub fn active_workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspaces[self.active]
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Applies one command. The session is updated in place; the outcome is
    /// the command's result.
    pub fn apply_command(
        &mut self,
        session: &mut Session,
        command: &Command,
    ) -> Result<Response, CommandError> {
        debug!("applying {command:?}");
        match command {
            Command::Layout { selector } => self.set_layout(session, *selector)?,
            Command::Resize { dimension, change } => {
                self.resize_focused(session, *dimension, *change)?
            }
            Command::BalanceSizes => self.balance_sizes(session),
            Command::PromoteMaster => self.promote_master(session)?,
            Command::Focus { direction } => self.focus_direction(session, (*direction).into())?,
            Command::Move { direction } => self.move_direction(session, (*direction).into())?,
            Command::ToggleFloat => self.toggle_float(session)?,
        }
        Ok(Response::Handled)
    }

    /// [`Engine::apply_command`] with the error rendered for the IO surface.
    pub fn dispatch(&mut self, session: &mut Session, command: &Command) -> Reply {
        self.apply_command(session, command)
            .map_err(|err| err.to_string())
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    fn focused_node(&self, session: &Session) -> Result<NodeId, CommandError> {
        let id = session.focused.ok_or(CommandError::NoWindowFocused)?;
        self.workspaces[self.active]
            .tree
            .node_for_window(id)
            .ok_or(CommandError::NoWindowFocused)
    }

    fn set_layout(
        &mut self,
        session: &mut Session,
        selector: LayoutSelector,
    ) -> Result<(), CommandError> {
        match selector {
            LayoutSelector::Tiling => return self.retile_focused(session),
            LayoutSelector::Floating => return self.float_focused(session),
            _ => {}
        }

        let focused = session.focused.ok_or(CommandError::NoWindowFocused)?;
        let node = self.focused_node(session)?;
        let ws = &mut self.workspaces[self.active];
        if ws.floating.contains(&focused) {
            return Err(CommandError::NonTiling);
        }
        let parent = ws
            .tree
            .get(node)
            .and_then(|n| n.parent)
            .ok_or(CommandError::NonTiling)?;

        if matches!(selector, LayoutSelector::Horizontal | LayoutSelector::Vertical) {
            let orientation = if selector == LayoutSelector::Horizontal {
                Axis::Horizontal
            } else {
                Axis::Vertical
            };
            let container = ws.tree.container_mut(parent).expect("container exists");
            if container.layout == LayoutKind::Scroll {
                // Carousels only run sideways.
                debug!("ignoring orientation change on a scroll container");
            } else {
                container.orientation = orientation;
            }
            self.refresh(session);
            return Ok(());
        }

        let (layout, orientation, side) = match selector {
            LayoutSelector::Tiles => (LayoutKind::Tiles, None, None),
            LayoutSelector::HTiles => (LayoutKind::Tiles, Some(Axis::Horizontal), None),
            LayoutSelector::VTiles => (LayoutKind::Tiles, Some(Axis::Vertical), None),
            LayoutSelector::Accordion => (LayoutKind::Accordion, None, None),
            LayoutSelector::HAccordion => (LayoutKind::Accordion, Some(Axis::Horizontal), None),
            LayoutSelector::VAccordion => (LayoutKind::Accordion, Some(Axis::Vertical), None),
            LayoutSelector::Dwindle => (LayoutKind::Dwindle, None, None),
            LayoutSelector::Scroll => (LayoutKind::Scroll, Some(Axis::Horizontal), None),
            LayoutSelector::Master => (LayoutKind::Master, None, None),
            LayoutSelector::MasterLeft => (LayoutKind::Master, None, Some(MasterSide::Left)),
            LayoutSelector::MasterRight => (LayoutKind::Master, None, Some(MasterSide::Right)),
            _ => unreachable!("handled above"),
        };

        let default_percent = self.options.master_default_percent;
        let container = ws.tree.container_mut(parent).expect("container exists");
        if container.layout != layout {
            // Caches do not outlive their layout.
            container.state = ContainerState::Plain;
        }
        container.layout = layout;
        if let Some(orientation) = orientation {
            container.orientation = orientation;
        }
        if layout == LayoutKind::Master {
            match (&mut container.state, side) {
                (ContainerState::Master(cache), Some(side)) => cache.set_side(side),
                (ContainerState::Master(_), None) => {}
                (state, side) => {
                    *state = ContainerState::Master(MasterCache::new(
                        default_percent,
                        side.unwrap_or(MasterSide::Left),
                    ));
                }
            }
        }

        self.refresh(session);
        Ok(())
    }

    fn resize_focused(
        &mut self,
        session: &mut Session,
        dimension: ResizeDimension,
        change: SizeChange,
    ) -> Result<(), CommandError> {
        let focused = session.focused.ok_or(CommandError::NoWindowFocused)?;
        let node = self.focused_node(session)?;
        let ws = &mut self.workspaces[self.active];
        if ws.floating.contains(&focused) {
            return Err(CommandError::FloatingNotSupported);
        }
        let rect = ws.rect(&self.options);
        resize::resize_window(&mut ws.tree, &self.options, rect, node, dimension, change)?;
        self.refresh(session);
        Ok(())
    }

    /// Resets weights, split ratios and the master percent to their defaults.
    /// Scroll widths collapse back on each child's next layout.
    fn balance_sizes(&mut self, session: &Session) {
        let default_ratio = self.options.dwindle_default_split_ratio;
        let default_percent = self.options.master_default_percent;
        let ws = &mut self.workspaces[self.active];

        for id in ws.tree.containers() {
            let children = ws.tree.container(id).expect("container").children.clone();
            for child in children {
                if let Some(node) = ws.tree.get_mut(child) {
                    node.weight = PerAxis::splat(1.);
                }
            }
            let container = ws.tree.container_mut(id).expect("container");
            container.last_virtual = None;
            match &mut container.state {
                ContainerState::Dwindle(cache) => cache.balance(default_ratio),
                ContainerState::Master(cache) => cache.set_percent(default_percent),
                ContainerState::Plain => {}
            }
        }
        for window in ws.tree.known_windows() {
            if let Some(node) = ws.tree.node_for_window(window) {
                if let Some(w) = ws.tree.window_mut(node) {
                    w.last_virtual = None;
                }
            }
        }

        self.refresh(session);
    }

    fn promote_master(&mut self, session: &mut Session) -> Result<(), CommandError> {
        let node = self.focused_node(session)?;
        let ws = &mut self.workspaces[self.active];
        let parent = ws
            .tree
            .get(node)
            .and_then(|n| n.parent)
            .ok_or(CommandError::NotMasterLayout)?;
        let container = ws
            .tree
            .container(parent)
            .ok_or(CommandError::NotMasterLayout)?;
        if container.layout != LayoutKind::Master {
            return Err(CommandError::NotMasterLayout);
        }
        let index = ws.tree.own_index(node).expect("bound node has an index");
        if index == 0 {
            return Err(CommandError::AlreadyMaster);
        }

        let master = container.children[0];
        ws.tree.swap_bindings(node, master);
        ws.tree.touch_recent(node);
        self.refresh(session);
        Ok(())
    }

    fn focus_direction(
        &mut self,
        session: &mut Session,
        direction: Direction,
    ) -> Result<(), CommandError> {
        let node = self.focused_node(session)?;
        let Self {
            backend,
            options,
            workspaces,
            active,
            ..
        } = self;
        let ws = &mut workspaces[*active];

        let Some(target) = navigation::neighbor(&mut ws.tree, backend, options, node, direction)
        else {
            // Boundary: stay put.
            return Ok(());
        };
        let Some(target_id) = ws.tree.window(target).map(|w| w.id) else {
            return Ok(());
        };

        ws.tree.touch_recent(target);
        session.focused = Some(target_id);
        if let Err(err) = backend.focus(target_id) {
            warn!("backend refused focus for window {target_id}: {err}");
        }
        // The anchor moved; Accordion and Scroll need a pass.
        self.refresh(session);
        Ok(())
    }

    fn move_direction(
        &mut self,
        session: &mut Session,
        direction: Direction,
    ) -> Result<(), CommandError> {
        let focused = session.focused.ok_or(CommandError::NoWindowFocused)?;
        let node = self.focused_node(session)?;
        if self.workspaces[self.active].floating.contains(&focused) {
            return Err(CommandError::NonTiling);
        }

        let Self {
            backend,
            options,
            workspaces,
            active,
            ..
        } = self;
        let ws = &mut workspaces[*active];
        let Some(target) = navigation::neighbor(&mut ws.tree, backend, options, node, direction)
        else {
            return Ok(());
        };
        let Some(target_id) = ws.tree.window(target).map(|w| w.id) else {
            return Ok(());
        };

        let parent_a = ws.tree.get(node).and_then(|n| n.parent);
        let parent_b = ws.tree.get(target).and_then(|n| n.parent);
        ws.tree.swap_bindings(node, target);

        // Within one dwindle container the window set is unchanged, so the
        // cache will not rebuild; mirror the swap into its leaves.
        if parent_a.is_some() && parent_a == parent_b {
            let parent = parent_a.unwrap();
            if let Some(container) = ws.tree.container_mut(parent) {
                if let ContainerState::Dwindle(cache) = &mut container.state {
                    cache.swap_windows(focused, target_id);
                }
            }
        }

        ws.tree.touch_recent(node);
        self.refresh(session);
        Ok(())
    }

    fn toggle_float(&mut self, session: &mut Session) -> Result<(), CommandError> {
        let focused = session.focused.ok_or(CommandError::NoWindowFocused)?;
        if self.workspaces[self.active].floating.contains(&focused) {
            self.retile_focused(session)
        } else {
            self.float_focused(session)
        }
    }

    /// Tiling to floating: detach the leaf and restore the memoized floating
    /// rect, falling back to centring the window at its current size.
    fn float_focused(&mut self, session: &mut Session) -> Result<(), CommandError> {
        let focused = session.focused.ok_or(CommandError::NoWindowFocused)?;
        let node = self.focused_node(session)?;
        let ws = &mut self.workspaces[self.active];
        if ws.floating.contains(&focused) {
            return Ok(());
        }

        let workspace_rect = ws.rect(&self.options);
        let current = ws.tree.window(node).and_then(|w| w.last_physical);
        let memo = ws.tree.window(node).and_then(|w| w.floating_rect);
        let target = memo.unwrap_or_else(|| {
            let size = current.map(|r| r.size).unwrap_or(workspace_rect.size);
            Rect::from_loc_and_size(
                (workspace_rect.left() + (workspace_rect.size.w - size.w) / 2.).round(),
                (workspace_rect.top() + (workspace_rect.size.h - size.h) / 2.).round(),
                size.w,
                size.h,
            )
        });

        ws.tree.unbind(node);
        ws.floating.push(focused);
        if let Some(w) = ws.tree.window_mut(node) {
            w.floating_rect = Some(target);
        }
        let flatten = self.options.flatten_containers;
        let alternate = self.options.opposite_orientation_for_nested;
        ws.tree.normalize(flatten, alternate);

        if let Err(err) = self.backend.set_frame(focused, target) {
            warn!("backend refused float rect for window {focused}: {err}");
        }
        self.refresh(session);
        Ok(())
    }

    /// Floating to tiling: memoize the current rect and rebind the leaf next
    /// to the most recent tiled window.
    fn retile_focused(&mut self, session: &mut Session) -> Result<(), CommandError> {
        let focused = session.focused.ok_or(CommandError::NoWindowFocused)?;
        let ws = &mut self.workspaces[self.active];
        if !ws.floating.contains(&focused) {
            return Ok(());
        }
        let node = ws
            .tree
            .node_for_window(focused)
            .ok_or(CommandError::NoWindowFocused)?;

        match self.backend.get_rect(focused) {
            Ok(rect) => {
                if let Some(w) = ws.tree.window_mut(node) {
                    w.floating_rect = Some(rect);
                }
            }
            Err(err) => warn!("keeping stale float memo for window {focused}: {err}"),
        }
        ws.floating.retain(|&w| w != focused);

        let root = ws.tree.root();
        let (parent, index) = match ws.tree.descend_recent(root) {
            Some(anchor) if anchor != node => {
                let parent = ws.tree.get(anchor).and_then(|n| n.parent).unwrap_or(root);
                let index = ws.tree.own_index(anchor).map_or(0, |i| i + 1);
                (parent, index)
            }
            _ => {
                let end = ws.tree.container(root).map_or(0, |c| c.children.len());
                (root, end)
            }
        };
        ws.tree.bind(node, parent, index, None);
        ws.tree.touch_recent(node);
        self.refresh(session);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Structural events from the backend
    // ------------------------------------------------------------------

    /// A new window appeared. It is inserted beside the focused window, or at
    /// the end of the most recent container, and takes focus.
    pub fn window_added(&mut self, session: &mut Session, window: WindowId, app_id: Option<String>) {
        let ws = &mut self.workspaces[self.active];
        if ws.tree.node_for_window(window).is_some() {
            debug!("window {window} is already tracked");
            return;
        }

        let node = ws.tree.create_window(window, app_id);
        let root = ws.tree.root();
        let (parent, index) = match session
            .focused
            .and_then(|f| ws.tree.node_for_window(f))
            .filter(|&f| ws.tree.is_bound(f))
        {
            Some(focused) => {
                let parent = ws.tree.get(focused).and_then(|n| n.parent).unwrap_or(root);
                let index = ws.tree.own_index(focused).map_or(0, |i| i + 1);
                (parent, index)
            }
            None => {
                let end = ws.tree.container(root).map_or(0, |c| c.children.len());
                (root, end)
            }
        };
        ws.tree.bind(node, parent, index, None);
        ws.tree.touch_recent(node);
        session.focused = Some(window);
        self.refresh(session);
    }

    /// A window disappeared. Its leaf is unbound in the same event; focus
    /// falls back along the most recent path.
    pub fn window_removed(&mut self, session: &mut Session, window: WindowId) {
        let active = self.active;
        let Some(node) = self.workspaces[active].tree.node_for_window(window) else {
            return;
        };

        if session.manipulated == Some(window) {
            // The drag can never settle normally now.
            self.pointer
                .abort(&mut self.workspaces[active].tree, &mut session.manipulated);
        }

        let ws = &mut self.workspaces[active];
        ws.floating.retain(|&w| w != window);
        ws.minimized.retain(|&w| w != window);
        ws.fullscreen.retain(|&w| w != window);
        ws.popups.retain(|&w| w != window);
        ws.tree.remove_window_node(node);

        let flatten = self.options.flatten_containers;
        let alternate = self.options.opposite_orientation_for_nested;
        ws.tree.normalize(flatten, alternate);

        if session.focused == Some(window) {
            let root = ws.tree.root();
            session.focused = ws
                .tree
                .descend_recent(root)
                .and_then(|n| ws.tree.window(n))
                .map(|w| w.id);
        }
        self.refresh(session);
    }

    /// Pointer-driven resize notification from the backend.
    pub fn handle_window_resized(
        &mut self,
        session: &mut Session,
        window: WindowId,
        current: Rect,
    ) {
        let Self {
            workspaces,
            active,
            options,
            pointer,
            clock,
            ..
        } = self;
        let ws = &mut workspaces[*active];
        let rect = ws.rect(options);
        let applied = pointer.handle_resized(
            &mut ws.tree,
            options,
            rect,
            clock,
            &mut session.manipulated,
            window,
            current,
        );
        if applied {
            self.refresh(session);
        }
    }

    /// The pointer drag on a window ended: settle the session and relayout.
    pub fn pointer_drag_ended(&mut self, session: &mut Session, window: WindowId) {
        if session.manipulated.is_some() && session.manipulated != Some(window) {
            warn!("drag end for window {window} while another window is manipulated");
        }
        let ws = &mut self.workspaces[self.active];
        self.pointer.drag_ended(&mut ws.tree, &mut session.manipulated);
        self.refresh(session);
    }

    /// A floating window was moved by the user; remember where.
    pub fn window_moved(&mut self, _session: &Session, window: WindowId, rect: Rect) {
        let ws = &mut self.workspaces[self.active];
        if !ws.floating.contains(&window) {
            return;
        }
        if let Some(node) = ws.tree.node_for_window(window) {
            if let Some(w) = ws.tree.window_mut(node) {
                w.floating_rect = Some(rect);
            }
        }
    }

    /// A popup appeared. Popups are tracked but never tiled.
    pub fn popup_added(&mut self, _session: &Session, window: WindowId, app_id: Option<String>) {
        let ws = &mut self.workspaces[self.active];
        if ws.tree.node_for_window(window).is_some() {
            return;
        }
        ws.tree.create_window(window, app_id);
        ws.popups.push(window);
    }

    /// Minimizes a window out of the tree, or restores it at the end of the
    /// most recent container.
    pub fn set_minimized(&mut self, session: &mut Session, window: WindowId, minimized: bool) {
        let ws = &mut self.workspaces[self.active];
        let Some(node) = ws.tree.node_for_window(window) else {
            return;
        };

        if minimized {
            if ws.minimized.contains(&window) {
                return;
            }
            ws.tree.unbind(node);
            ws.minimized.push(window);
            let flatten = self.options.flatten_containers;
            let alternate = self.options.opposite_orientation_for_nested;
            ws.tree.normalize(flatten, alternate);
            if session.focused == Some(window) {
                let root = ws.tree.root();
                session.focused = ws
                    .tree
                    .descend_recent(root)
                    .and_then(|n| ws.tree.window(n))
                    .map(|w| w.id);
            }
        } else {
            if !ws.minimized.contains(&window) {
                return;
            }
            ws.minimized.retain(|&w| w != window);
            let root = ws.tree.root();
            let end = ws.tree.container(root).map_or(0, |c| c.children.len());
            ws.tree.bind(node, root, end, None);
            ws.tree.touch_recent(node);
            session.focused = Some(window);
        }
        self.refresh(session);
    }

    /// Hides or reveals every window of an application.
    pub fn set_app_hidden(&mut self, session: &mut Session, app_id: &str, hidden: bool) {
        let ws = &mut self.workspaces[self.active];
        let matching: Vec<WindowId> = ws
            .tree
            .known_windows()
            .into_iter()
            .filter(|&w| {
                ws.tree
                    .node_for_window(w)
                    .and_then(|n| ws.tree.window(n))
                    .and_then(|w| w.app_id.as_deref())
                    == Some(app_id)
            })
            .collect();

        if hidden {
            if !ws.hidden_apps.iter().any(|a| a == app_id) {
                ws.hidden_apps.push(app_id.to_string());
            }
            for window in matching {
                let Some(node) = ws.tree.node_for_window(window) else {
                    continue;
                };
                if ws.floating.contains(&window) || ws.minimized.contains(&window) {
                    continue;
                }
                ws.tree.unbind(node);
                if session.focused == Some(window) {
                    session.focused = None;
                }
            }
            let flatten = self.options.flatten_containers;
            let alternate = self.options.opposite_orientation_for_nested;
            ws.tree.normalize(flatten, alternate);
            if session.focused.is_none() {
                let root = ws.tree.root();
                session.focused = ws
                    .tree
                    .descend_recent(root)
                    .and_then(|n| ws.tree.window(n))
                    .map(|w| w.id);
            }
        } else {
            ws.hidden_apps.retain(|a| a != app_id);
            for window in matching {
                let Some(node) = ws.tree.node_for_window(window) else {
                    continue;
                };
                if ws.tree.is_bound(node)
                    || ws.floating.contains(&window)
                    || ws.minimized.contains(&window)
                {
                    continue;
                }
                let root = ws.tree.root();
                let end = ws.tree.container(root).map_or(0, |c| c.children.len());
                ws.tree.bind(node, root, end, None);
            }
        }
        self.refresh(session);
    }

    /// Marks a window fullscreen or returns it to its tiled rect.
    pub fn set_fullscreen(&mut self, session: &Session, window: WindowId, fullscreen: bool) {
        let ws = &mut self.workspaces[self.active];
        let Some(node) = ws.tree.node_for_window(window) else {
            return;
        };
        if let Some(w) = ws.tree.window_mut(node) {
            w.is_fullscreen = fullscreen;
        }
        ws.fullscreen.retain(|&w| w != window);
        if fullscreen {
            ws.fullscreen.push(window);
        }
        self.refresh(session);
    }

    /// The active workspace's monitor changed geometry or identity.
    pub fn monitor_changed(&mut self, session: &Session, monitor: Monitor) {
        let ws = &mut self.workspaces[self.active];
        let moved = ws.set_monitor(monitor);
        for (window, rect) in moved {
            if let Err(err) = self.backend.set_frame(window, rect) {
                warn!("backend refused translated rect for window {window}: {err}");
            }
        }
        self.refresh(session);
    }

    // ------------------------------------------------------------------
    // Refresh and introspection
    // ------------------------------------------------------------------

    /// Full refresh: relayout the active workspace and push every rect,
    /// skipping the window a pointer drag currently owns.
    pub fn refresh(&mut self, session: &Session) {
        let Self {
            workspaces,
            active,
            options,
            backend,
            ..
        } = self;
        let ws = &mut workspaces[*active];
        let out = ws.layout(options, session.manipulated);
        for leaf in &out {
            if session.manipulated == Some(leaf.window) {
                continue;
            }
            if let Err(err) = backend.set_frame(leaf.window, leaf.rect) {
                warn!("backend rejected rect for window {}: {err}", leaf.window);
            }
        }
    }

    /// Layout tree of the active workspace, for IPC and diagnostics.
    pub fn layout_tree(&self, session: &Session) -> LayoutTreeNode {
        let ws = &self.workspaces[self.active];
        let focused = session.focused.and_then(|id| ws.tree.node_for_window(id));
        dump_tree(&ws.tree, focused)
    }

    /// Panics if a reachable state violates the engine invariants. Test and
    /// debugging aid.
    pub fn verify_invariants(&self, session: &Session) {
        let ws = &self.workspaces[self.active];
        let tree = &ws.tree;

        for id in tree.containers() {
            let container = tree.container(id).expect("container");

            for &child in &container.children {
                assert_eq!(
                    tree.get(child).and_then(|n| n.parent),
                    Some(id),
                    "child parent back-reference is stale"
                );
            }

            if container.layout == LayoutKind::Tiles {
                if let (Some(rect), false) = (container.last_rect, container.children.is_empty()) {
                    let axis = container.orientation;
                    let inner = self.options.gaps.inner.get(axis);
                    let available =
                        (rect.extent(axis) - inner * (container.children.len() - 1) as f64).max(0.);
                    let sum: f64 = container
                        .children
                        .iter()
                        .map(|&c| tree.weight(c, axis))
                        .sum();
                    assert!(
                        (sum - available).abs() < 1e-3,
                        "tile weights sum to {sum}, expected {available}"
                    );
                }
            }

            match &container.state {
                ContainerState::Dwindle(cache) => {
                    assert_eq!(
                        container.layout,
                        LayoutKind::Dwindle,
                        "dwindle cache on a non-dwindle container"
                    );
                    for ratio in cache.split_ratios() {
                        assert!(
                            (dwindle::RATIO_MIN..=dwindle::RATIO_MAX).contains(&ratio),
                            "split ratio {ratio} out of bounds"
                        );
                    }
                    let mut recorded: Vec<_> = cache.recorded_windows().to_vec();
                    let mut reachable = cache.reachable_windows();
                    recorded.sort();
                    reachable.sort();
                    assert_eq!(recorded, reachable, "split tree lost track of its leaves");
                    if cache.has_snapshots() {
                        assert!(
                            session.manipulated.is_some(),
                            "box snapshots outlived the drag"
                        );
                    }
                }
                ContainerState::Master(cache) => {
                    assert_eq!(
                        container.layout,
                        LayoutKind::Master,
                        "master cache on a non-master container"
                    );
                    assert!(
                        (MASTER_PERCENT_MIN..=MASTER_PERCENT_MAX).contains(&cache.percent()),
                        "master percent {} out of bounds",
                        cache.percent()
                    );
                }
                ContainerState::Plain => {}
            }
        }
    }
}
