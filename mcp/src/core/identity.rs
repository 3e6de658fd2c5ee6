//! Content-derived identifiers for aggregated tools and prompts.
//!
//! An id is `<prefix><hash>`: the prefix names the item kind and the hash is
//! the first [`ID_HASH_LEN`] hex chars of BLAKE3 over `server_name` followed
//! by `item_name`. No salt, so ids survive process restarts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Hex characters kept from the digest.
pub const ID_HASH_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Tool,
    Prompt,
}

impl ItemKind {
    pub fn prefix(self) -> char {
        match self {
            ItemKind::Tool => 'f',
            ItemKind::Prompt => 'p',
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Tool => f.write_str("tool"),
            ItemKind::Prompt => f.write_str("prompt"),
        }
    }
}

pub fn identify(kind: ItemKind, server_name: &str, item_name: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(server_name.as_bytes());
    hasher.update(item_name.as_bytes());
    let hex = hasher.finalize().to_hex();

    let mut id = String::with_capacity(1 + ID_HASH_LEN);
    id.push(kind.prefix());
    id.push_str(&hex[..ID_HASH_LEN]);
    id
}

#[inline]
pub fn tool_id(server_name: &str, tool_name: &str) -> String {
    identify(ItemKind::Tool, server_name, tool_name)
}

#[inline]
pub fn prompt_id(server_name: &str, prompt_name: &str) -> String {
    identify(ItemKind::Prompt, server_name, prompt_name)
}
