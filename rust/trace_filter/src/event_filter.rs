// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Event filter dialog. Lists the trace's events grouped by system; answering
//! it does not filter anything yet.

use log::info;
use serde::Deserialize;
use serde::Serialize;

pub const ALL_EVENTS_LABEL: &str = "All";

/// An event format known to the trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFormat {
    pub id: u32,
    pub system: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventNode {
    pub label: String,
    pub children: Vec<EventNode>,
}

impl EventNode {
    fn leaf(label: &str) -> Self {
        Self {
            label: label.to_string(),
            children: vec![],
        }
    }

    /// Total number of nodes below this one.
    pub fn descendants(&self) -> usize {
        self.children.iter().map(|c| 1 + c.descendants()).sum()
    }
}

/// Build the tree the dialog shows: "All", then one node per system, then
/// the events of that system. Events are sorted by system, name, then id.
pub fn build_event_tree(events: &[EventFormat]) -> EventNode {
    let mut sorted: Vec<&EventFormat> = events.iter().collect();
    sorted.sort_by(|a, b| {
        a.system
            .cmp(&b.system)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut root = EventNode::leaf(ALL_EVENTS_LABEL);
    for event in sorted {
        let same_system = root
            .children
            .last()
            .is_some_and(|sys| sys.label == event.system);
        if !same_system {
            root.children.push(EventNode::leaf(&event.system));
        }
        if let Some(sys) = root.children.last_mut() {
            sys.children.push(EventNode::leaf(&event.name));
        }
    }
    root
}

#[derive(Debug)]
pub struct EventFilterDialog {
    tree: EventNode,
}

impl EventFilterDialog {
    pub const TITLE: &'static str = "Filter Events";

    pub fn open(events: &[EventFormat]) -> Self {
        Self {
            tree: build_event_tree(events),
        }
    }

    pub fn tree(&self) -> &EventNode {
        &self.tree
    }

    // TODO: apply the chosen events to the trace store once it can filter
    // rows by event id.
    pub fn accept(self) {
        info!("{}: accept", Self::TITLE);
    }

    pub fn reject(self) {
        info!("{}: reject", Self::TITLE);
    }
}
