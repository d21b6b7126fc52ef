use std::collections::HashMap;

/// One configured alias: a sender `address` (optionally scoped to a
/// `channel`) mapped to a human-readable `label`.
#[derive(Debug, Clone)]
pub struct OwnerAlias {
    pub address: String,
    pub channel: Option<String>,
    pub label: String,
}

/// Precomputed O(1) lookup for owner-alias labelling, built once at
/// construction from a caller-supplied alias list. A scoped `(address,
/// channel)` match wins over an unscoped `address` match; no match leaves
/// labelling off.
#[derive(Debug, Clone, Default)]
pub struct OwnerAliasIndex {
    scoped: HashMap<(String, String), String>,
    unscoped: HashMap<String, String>,
}

impl OwnerAliasIndex {
    pub fn new(aliases: &[OwnerAlias]) -> Self {
        let mut scoped = HashMap::new();
        let mut unscoped = HashMap::new();
        for alias in aliases {
            match &alias.channel {
                Some(channel) => {
                    scoped.insert((alias.address.clone(), channel.clone()), alias.label.clone());
                }
                None => {
                    unscoped.insert(alias.address.clone(), alias.label.clone());
                }
            }
        }
        Self { scoped, unscoped }
    }

    pub fn label_for(&self, address: &str, channel: &str) -> Option<&str> {
        self.scoped
            .get(&(address.to_string(), channel.to_string()))
            .or_else(|| self.unscoped.get(address))
            .map(String::as_str)
    }
}
