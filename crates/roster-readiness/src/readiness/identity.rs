use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::domain::{Soldier, SoldierId};

/// Canonical form used to join free-text names against the roster.
pub fn normalize_name(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}', '\u{200e}', '\u{200f}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "soldiers", rename_all = "snake_case")]
pub enum NameMatch {
    Matched(SoldierId),
    Unmatched,
    /// Several roster entries share the normalized name; nothing is attributed.
    Ambiguous(Vec<SoldierId>),
}

impl NameMatch {
    pub fn soldier(&self) -> Option<&SoldierId> {
        match self {
            NameMatch::Matched(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameConflict {
    pub normalized_name: String,
    pub soldiers: Vec<SoldierId>,
}

/// Normalized-name index over the whole roster, inactive soldiers included.
#[derive(Debug, Clone, Default)]
pub struct IdentityMatcher {
    index: HashMap<String, Vec<SoldierId>>,
}

impl IdentityMatcher {
    pub fn from_roster(roster: &[Soldier]) -> Self {
        let mut index: HashMap<String, Vec<SoldierId>> = HashMap::new();
        for soldier in roster {
            let key = normalize_name(&soldier.full_name);
            if key.is_empty() {
                continue;
            }
            let ids = index.entry(key).or_default();
            if !ids.contains(&soldier.id) {
                ids.push(soldier.id.clone());
            }
        }

        Self { index }
    }

    pub fn match_name(&self, name: &str) -> NameMatch {
        match self.index.get(&normalize_name(name)) {
            None => NameMatch::Unmatched,
            Some(ids) if ids.len() == 1 => NameMatch::Matched(ids[0].clone()),
            Some(ids) => {
                let mut ids = ids.clone();
                ids.sort();
                NameMatch::Ambiguous(ids)
            }
        }
    }

    /// Roster entries that collide after normalization, ordered by name.
    pub fn conflicts(&self) -> Vec<NameConflict> {
        let ordered: BTreeMap<&String, &Vec<SoldierId>> = self
            .index
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .collect();

        ordered
            .into_iter()
            .map(|(name, ids)| {
                let mut soldiers = ids.clone();
                soldiers.sort();
                NameConflict {
                    normalized_name: name.clone(),
                    soldiers,
                }
            })
            .collect()
    }
}
