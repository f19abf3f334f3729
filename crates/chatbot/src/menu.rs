//! Option tree and transition function.
//!
//! Options are kept in an arena keyed by id; parents and children are
//! looked up, never linked. Siblings are ordered by ordinal, numerically when
//! the ordinal is a number, then by id.

use std::{cmp::Ordering, collections::HashMap};

use helpline_common::types::{MenuPosition, OptionId, QueueOption};

pub const RESTART: &str = "00";
pub const BACK: &str = "0";
pub const HAND_OFF: &str = "#";

/// What a token does from a given position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Clear the queue and route the ticket again.
    Restart,
    /// Stop the chatbot and wait for a human.
    HandOff,
    MoveTo(MenuPosition),
    /// No match; show the current menu again.
    Stay,
}

impl Transition {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Restart => "restart",
            Self::HandOff => "hand_off",
            Self::MoveTo(_) => "move",
            Self::Stay => "stay",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MenuTree {
    options: HashMap<OptionId, QueueOption>,
    roots: Vec<OptionId>,
    children: HashMap<OptionId, Vec<OptionId>>,
}

impl MenuTree {
    pub fn new(options: impl IntoIterator<Item = QueueOption>) -> Self {
        let options: HashMap<_, _> = options.into_iter().map(|o| (o.id, o)).collect();
        let mut roots = Vec::new();
        let mut children: HashMap<OptionId, Vec<OptionId>> = HashMap::new();
        for option in options.values() {
            match option.parent_id {
                Some(parent) => children.entry(parent).or_default().push(option.id),
                None => roots.push(option.id),
            }
        }

        let order = |a: &OptionId, b: &OptionId| sibling_order(&options[a], &options[b]);
        roots.sort_by(order);
        for ids in children.values_mut() {
            ids.sort_by(order);
        }

        Self {
            options,
            roots,
            children,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: OptionId) -> Option<&QueueOption> {
        self.options.get(&id)
    }

    #[must_use]
    pub fn roots(&self) -> Vec<&QueueOption> {
        self.resolve(&self.roots)
    }

    #[must_use]
    pub fn children(&self, id: OptionId) -> Vec<&QueueOption> {
        self.children
            .get(&id)
            .map(|ids| self.resolve(ids))
            .unwrap_or_default()
    }

    /// Position one level up from `id`.
    #[must_use]
    pub fn parent(&self, id: OptionId) -> MenuPosition {
        let parent = self.get(id).and_then(|o| o.parent_id);
        match parent {
            Some(p) if self.options.contains_key(&p) => MenuPosition::Node(p),
            _ => MenuPosition::Root,
        }
    }

    /// Drop a position that no longer exists in the tree.
    #[must_use]
    pub fn normalize(&self, at: MenuPosition) -> MenuPosition {
        match at {
            MenuPosition::Node(id) if !self.options.contains_key(&id) => MenuPosition::Root,
            other => other,
        }
    }

    /// Next move for `token` at `at`.
    ///
    /// With `consume` false the token at the root is not read as a choice;
    /// the root menu is shown instead. A node with a single child descends
    /// to it whatever the token.
    #[must_use]
    pub fn transition(&self, at: MenuPosition, token: &str, consume: bool) -> Transition {
        let token = token.trim();
        if token == RESTART {
            return Transition::Restart;
        }

        match self.normalize(at) {
            MenuPosition::Root => {
                if !consume || token == BACK {
                    return Transition::Stay;
                }
                let roots = self.roots();
                match_token(&roots, token)
                    .map_or(Transition::Stay, |o| Transition::MoveTo(MenuPosition::Node(o.id)))
            },
            MenuPosition::Node(id) => {
                if token == HAND_OFF {
                    return Transition::HandOff;
                }
                if token == BACK {
                    return Transition::MoveTo(self.parent(id));
                }
                let children = self.children(id);
                if let [only] = children.as_slice() {
                    return Transition::MoveTo(MenuPosition::Node(only.id));
                }
                match_token(&children, token)
                    .map_or(Transition::Stay, |o| Transition::MoveTo(MenuPosition::Node(o.id)))
            },
        }
    }

    fn resolve(&self, ids: &[OptionId]) -> Vec<&QueueOption> {
        ids.iter().filter_map(|id| self.options.get(id)).collect()
    }
}

/// Ordinal first, then option id.
fn match_token<'a>(candidates: &[&'a QueueOption], token: &str) -> Option<&'a QueueOption> {
    if token.is_empty() {
        return None;
    }
    candidates
        .iter()
        .find(|o| o.ordinal.trim() == token)
        .or_else(|| candidates.iter().find(|o| o.id.to_string() == token))
        .copied()
}

fn sibling_order(a: &QueueOption, b: &QueueOption) -> Ordering {
    let key = |o: &QueueOption| match o.ordinal.trim().parse::<u64>() {
        Ok(n) => (0, n, String::new()),
        Err(_) => (1, 0, o.ordinal.clone()),
    };
    key(a).cmp(&key(b)).then(a.id.cmp(&b.id))
}
