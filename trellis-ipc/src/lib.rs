//! Types for communicating with the trellis layout engine.
//!
//! Every command the engine consumes, and every value those commands carry, is
//! defined here so that frontends (CLI, key-binding dispatch, IPC clients) and
//! the engine agree on one wire format.

#![warn(missing_docs)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stable identifier of a window, assigned by the window backend.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Change to a window dimension in pixels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeChange {
    /// Set the dimension to an absolute pixel value.
    Set(i32),
    /// Adjust the dimension by a pixel delta.
    Adjust(i32),
}

impl FromStr for SizeChange {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix('+') {
            let value: i32 = rest.parse().map_err(|_| "expected a number after +")?;
            Ok(Self::Adjust(value))
        } else if let Some(rest) = s.strip_prefix('-') {
            let value: i32 = rest.parse().map_err(|_| "expected a number after -")?;
            Ok(Self::Adjust(-value))
        } else {
            let value: i32 = s.parse().map_err(|_| "expected a number")?;
            Ok(Self::Set(value))
        }
    }
}

impl fmt::Display for SizeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set(v) => write!(f, "{v}"),
            Self::Adjust(v) if *v >= 0 => write!(f, "+{v}"),
            Self::Adjust(v) => write!(f, "{v}"),
        }
    }
}

/// Which dimension a resize command operates on.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum ResizeDimension {
    /// The window width.
    Width,
    /// The window height.
    Height,
    /// Both axes, following the container's own orientation where one applies.
    Smart,
    /// Both axes with the perpendicular one inverted.
    SmartOpposite,
}

/// Cardinal direction for focus and move operations.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Towards negative x.
    Left,
    /// Towards positive x.
    Right,
    /// Towards negative y.
    Up,
    /// Towards positive y.
    Down,
}

/// Argument of the `layout` command.
///
/// Covers layout changes, orientation changes, and the tiling/floating toggle
/// for the focused window.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum LayoutSelector {
    /// Weighted tiles in the container's current orientation.
    Tiles,
    /// Weighted tiles, horizontal.
    HTiles,
    /// Weighted tiles, vertical.
    VTiles,
    /// Accordion in the container's current orientation.
    Accordion,
    /// Accordion, horizontal.
    HAccordion,
    /// Accordion, vertical.
    VAccordion,
    /// Binary-tree dwindle.
    Dwindle,
    /// Horizontal carousel.
    Scroll,
    /// Master area plus stack, keeping the current side.
    Master,
    /// Master area on the left.
    MasterLeft,
    /// Master area on the right.
    MasterRight,
    /// Change the container orientation to horizontal.
    Horizontal,
    /// Change the container orientation to vertical.
    Vertical,
    /// Return the focused window to the tiling tree.
    Tiling,
    /// Float the focused window.
    Floating,
}

/// A single engine command.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::Subcommand))]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    /// Change the layout or orientation of the focused window's container.
    Layout {
        /// Target layout, orientation, or tiling state.
        #[cfg_attr(feature = "clap", arg(value_enum))]
        selector: LayoutSelector,
    },
    /// Resize the focused window.
    Resize {
        /// Dimension to change.
        #[cfg_attr(feature = "clap", arg(value_enum))]
        dimension: ResizeDimension,
        /// Pixel amount: `n` sets, `+n` and `-n` adjust.
        change: SizeChange,
    },
    /// Reset weights, split ratios, and the master percent to their defaults.
    BalanceSizes,
    /// Swap the focused window into the master slot of its Master container.
    PromoteMaster,
    /// Move focus to the spatial neighbour in a direction.
    Focus {
        /// Direction to look in.
        #[cfg_attr(feature = "clap", arg(value_enum))]
        direction: Direction,
    },
    /// Swap the focused window with its spatial neighbour in a direction.
    Move {
        /// Direction to look in.
        #[cfg_attr(feature = "clap", arg(value_enum))]
        direction: Direction,
    },
    /// Toggle the focused window between tiling and floating.
    ToggleFloat,
}

/// Successful command result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum Response {
    /// The command ran; there is nothing else to say.
    Handled,
    /// The layout tree of the active workspace.
    LayoutTree(LayoutTreeNode),
}

/// Reply to a command: success or a human-readable error message.
pub type Reply = Result<Response, String>;

/// Layout of a container node in a [`LayoutTreeNode`] dump.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutTreeLayout {
    /// Weighted tiles.
    Tiles,
    /// Accordion.
    Accordion,
    /// Binary-tree dwindle.
    Dwindle,
    /// Horizontal carousel.
    Scroll,
    /// Master area plus stack.
    Master,
}

/// One node of a layout-tree dump.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LayoutTreeNode {
    /// Window id for leaves, `None` for containers.
    pub window_id: Option<u64>,
    /// Container layout, `None` for leaves.
    pub layout: Option<LayoutTreeLayout>,
    /// Whether the container is horizontal; `None` for leaves.
    pub horizontal: Option<bool>,
    /// Whether this node is on the focus path.
    pub focused: bool,
    /// The node's most recent rectangle as `(x, y, w, h)`, if laid out.
    pub rect: Option<(f64, f64, f64, f64)>,
    /// Child nodes, in order.
    pub children: Vec<LayoutTreeNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_change_parsing() {
        assert_eq!("500".parse::<SizeChange>(), Ok(SizeChange::Set(500)));
        assert_eq!("+50".parse::<SizeChange>(), Ok(SizeChange::Adjust(50)));
        assert_eq!("-50".parse::<SizeChange>(), Ok(SizeChange::Adjust(-50)));
        assert!("fifty".parse::<SizeChange>().is_err());
        assert!("+".parse::<SizeChange>().is_err());
    }

    #[test]
    fn size_change_display_round_trips() {
        for change in [
            SizeChange::Set(120),
            SizeChange::Adjust(35),
            SizeChange::Adjust(-35),
        ] {
            let s = change.to_string();
            assert_eq!(s.parse::<SizeChange>(), Ok(change));
        }
    }

    #[test]
    fn command_serialization() {
        let command = Command::Resize {
            dimension: ResizeDimension::SmartOpposite,
            change: SizeChange::Adjust(-10),
        };
        let json = serde_json::to_string(&command).unwrap();
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, command);
    }
}
