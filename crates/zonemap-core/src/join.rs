//! Polygon id -> registry key resolution.

use crate::ids::{candidate_variants, clean_identifier, loose_key};
use crate::registry::Registry;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Which rule produced a match, in the order the rules are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchKind {
    /// One of the polygon id's candidate variants is a key or a key's variant.
    Variant,
    /// The trimmed polygon id is literally a key.
    ExactKey,
    /// Equal after case, whitespace, `.0` and zero-run folding.
    Stripped,
    /// The polygon id appears in an entry's description.
    Description,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Variant => "variant",
            Self::ExactKey => "exactKey",
            Self::Stripped => "stripped",
            Self::Description => "description",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub key: String,
    pub kind: MatchKind,
}

/// Maps every key to itself, then every candidate variant of every key to its key.
///
/// Keys are inserted first so an id that is itself a key never resolves to a different key that
/// merely shares a variant with it. Among variants, the first key in registry order wins.
pub fn build_variant_table<'a>(
    keys: impl Iterator<Item = &'a String> + Clone,
) -> FxHashMap<String, String> {
    let mut table = FxHashMap::default();
    for key in keys.clone() {
        table.insert(key.clone(), key.clone());
    }
    for key in keys {
        for variant in candidate_variants(Some(key.as_str())) {
            match table.get(&variant) {
                None => {
                    table.insert(variant, key.clone());
                }
                Some(owner) if owner != key => {
                    tracing::debug!(
                        variant = %variant,
                        owner = %owner,
                        other = %key,
                        "identifier variant shared by two zones; keeping the first"
                    );
                }
                Some(_) => {}
            }
        }
    }
    table
}

/// Resolves a raw polygon identifier against `registry`; first hit wins:
///
/// 1. candidate variants of `raw`, in order, probed in the variant table
/// 2. the trimmed id as a literal key
/// 3. loose comparison against every key ([`loose_key`])
/// 4. the id as a token (or, for multi-word ids, a substring) of an entry's description
///
/// `None` means the zone simply has no data.
pub fn resolve(registry: &Registry, raw: Option<&str>) -> Option<Resolution> {
    let raw = raw?;
    let hit = |key: &str, kind| {
        Some(Resolution {
            key: key.to_string(),
            kind,
        })
    };

    let table = registry.variant_table();
    for candidate in candidate_variants(Some(raw)) {
        if let Some(key) = table.get(&candidate) {
            return hit(key, MatchKind::Variant);
        }
    }

    // Subsumed by the variant lookup: registry keys are cleaned, and the cleaned id is always the
    // first candidate, so no match reaches this step today.
    let trimmed = raw.trim();
    if !trimmed.is_empty() && registry.contains_key(trimmed) {
        return hit(trimmed, MatchKind::ExactKey);
    }

    let loose = loose_key(raw);
    if loose.is_empty() {
        return None;
    }
    if let Some(key) = registry.keys().find(|key| loose_key(key) == loose) {
        return hit(key, MatchKind::Stripped);
    }

    let needle = clean_identifier(raw).to_lowercase();
    let multi_word = needle.contains(char::is_whitespace);
    for (key, status) in registry.iter() {
        let Some(description) = status.description.as_deref() else {
            continue;
        };
        let haystack = description.to_lowercase();
        let matched = if multi_word {
            haystack.contains(&needle)
        } else {
            haystack
                .split(|c: char| !c.is_alphanumeric())
                .filter(|token| !token.is_empty())
                .any(|token| token == needle || loose_key(token) == loose)
        };
        if matched {
            return hit(key, MatchKind::Description);
        }
    }
    None
}
