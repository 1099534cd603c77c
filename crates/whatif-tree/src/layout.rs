//! Positions and edges for drawing a [`NodeStore`] as a tree.
//!
//! Layout never mutates the store; it only reads the parent/child links,
//! which the store guarantees form a single rooted tree.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{format_date, NodeType};
use crate::store::NodeStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LayoutDirection {
    /// Top to bottom
    #[default]
    #[serde(rename = "TB")]
    TopBottom,
    /// Left to right
    #[serde(rename = "LR")]
    LeftRight,
}

/// Narrow screens stack the tree vertically
pub fn responsive_direction(width: u32) -> LayoutDirection {
    if width < 768 {
        LayoutDirection::TopBottom
    } else {
        LayoutDirection::LeftRight
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptions {
    pub direction: LayoutDirection,
    pub node_width: f64,
    pub node_height: f64,
    /// Gap between depth levels
    pub rank_sep: f64,
    /// Gap between siblings on the same level
    pub node_sep: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::TopBottom,
            node_width: 300.0,
            node_height: 200.0,
            rank_sep: 100.0,
            node_sep: 80.0,
        }
    }
}

impl LayoutOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direction(mut self, direction: LayoutDirection) -> Self {
        self.direction = direction;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Edges into alternate nodes are drawn animated
    pub animated: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layout {
    /// Top-left corner of every node
    pub positions: HashMap<String, Position>,
    pub edges: Vec<LayoutEdge>,
    /// Display form of every node's date
    pub dates: HashMap<String, String>,
}

/// Anything that turns a tree into something drawable
pub trait LayoutEngine: Send + Sync {
    fn layout(&self, store: &NodeStore) -> Layout;
}

/// Layered layout: depth picks the rank, leaves get consecutive slots in
/// depth-first order, and each parent is centred over its children.
#[derive(Debug, Clone, Default)]
pub struct TreeLayout {
    options: LayoutOptions,
}

impl TreeLayout {
    pub fn new(options: LayoutOptions) -> Self {
        Self { options }
    }

    fn assign_slots(store: &NodeStore) -> HashMap<String, f64> {
        let mut slots = HashMap::with_capacity(store.len());
        let mut next_leaf = 0.0;

        // post-order walk without recursion: (node, children already pushed)
        let mut stack: Vec<(&str, bool)> = vec![(store.root_id(), false)];
        while let Some((id, expanded)) = stack.pop() {
            let Some(node) = store.get(id) else { continue };

            if node.child_ids.is_empty() {
                slots.insert(id.to_string(), next_leaf);
                next_leaf += 1.0;
            } else if expanded {
                let first = node.child_ids.first().and_then(|c| slots.get(c)).copied().unwrap_or(0.0);
                let last = node.child_ids.last().and_then(|c| slots.get(c)).copied().unwrap_or(first);
                slots.insert(id.to_string(), (first + last) / 2.0);
            } else {
                stack.push((id, true));
                for child in node.child_ids.iter().rev() {
                    stack.push((child.as_str(), false));
                }
            }
        }

        slots
    }
}

impl LayoutEngine for TreeLayout {
    fn layout(&self, store: &NodeStore) -> Layout {
        let opts = &self.options;
        let slots = Self::assign_slots(store);

        let positions = store
            .nodes()
            .filter_map(|node| {
                let slot = *slots.get(&node.id)?;
                let rank = node.depth as f64;
                let position = match opts.direction {
                    LayoutDirection::TopBottom => Position {
                        x: slot * (opts.node_width + opts.node_sep),
                        y: rank * (opts.node_height + opts.rank_sep),
                    },
                    LayoutDirection::LeftRight => Position {
                        x: rank * (opts.node_width + opts.rank_sep),
                        y: slot * (opts.node_height + opts.node_sep),
                    },
                };
                Some((node.id.clone(), position))
            })
            .collect();

        let edges = store
            .nodes()
            .filter_map(|node| {
                let parent = node.parent_id.as_ref()?;
                Some(LayoutEdge {
                    id: format!("{}-{}", parent, node.id),
                    source: parent.clone(),
                    target: node.id.clone(),
                    animated: node.node_type == NodeType::Alternate,
                })
            })
            .collect();

        let dates = store
            .nodes()
            .map(|node| (node.id.clone(), format_date(&node.date)))
            .collect();

        Layout { positions, edges, dates }
    }
}
