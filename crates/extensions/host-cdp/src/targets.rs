//! Stable integer ids for CDP target ids.

use std::collections::{HashMap, HashSet};

use tabwatch_protocols::TabId;

/// Two-way map between CDP target ids and tab ids.
///
/// Ids are handed out in increasing order and never reused, so a tab that
/// is closed and reopened under the same target id gets a fresh one.
#[derive(Debug)]
pub struct TargetMap {
    by_target: HashMap<String, TabId>,
    by_tab: HashMap<TabId, String>,
    next_id: TabId,
}

impl Default for TargetMap {
    fn default() -> Self {
        Self {
            by_target: HashMap::new(),
            by_tab: HashMap::new(),
            next_id: 1,
        }
    }
}

impl TargetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `target_id`, assigning one on first sight.
    pub fn id_for(&mut self, target_id: &str) -> TabId {
        if let Some(id) = self.by_target.get(target_id) {
            return *id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.by_target.insert(target_id.to_string(), id);
        self.by_tab.insert(id, target_id.to_string());
        id
    }

    pub fn target_for(&self, tab_id: TabId) -> Option<&str> {
        self.by_tab.get(&tab_id).map(String::as_str)
    }

    /// Forget every target not in `live`.
    pub fn retain(&mut self, live: &HashSet<&str>) {
        self.by_target.retain(|target, _| live.contains(target.as_str()));
        let by_target = &self.by_target;
        self.by_tab.retain(|_, target| by_target.contains_key(target));
    }

    pub fn len(&self) -> usize {
        self.by_target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty()
    }
}
