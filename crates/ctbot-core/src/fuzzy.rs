//! Fuzzy string similarity and ranked top-K extraction.
//!
//! Scores are integers in `0..=100`. Inputs are normalized (lowercased,
//! non-alphanumerics turned into token separators) before comparison, so the
//! matcher is case-insensitive and treats `net/minecraft/Entity` as three
//! tokens. The combined [`weighted_ratio`] picks the best of a plain edit
//! ratio, a best-substring ratio, and token sort/set ratios, scaled down when
//! the two strings differ a lot in length.

use std::cmp::Reverse;
use std::collections::BTreeSet;

/// A similarity score in `0..=100`.
pub type Score = u8;

/// Token ratios are trusted slightly less than a direct comparison.
const TOKEN_SCALE: f64 = 0.95;

/// Length ratio at which substring matching takes over.
const PARTIAL_THRESHOLD: f64 = 1.5;

/// One ranked candidate.
#[derive(Debug)]
pub struct Match<'a, T> {
    pub item: &'a T,
    pub score: Score,
    /// Position of `item` in the candidate slice.
    pub index: usize,
}

/// Records that expose an owning class, used for the re-ranking pass.
pub trait Owned {
    fn owner(&self) -> &str;
}

/// Return the `limit` candidates whose `key` best matches `query`.
///
/// Results are ordered by descending score; equal scores keep their corpus
/// order. An empty candidate slice yields an empty result.
pub fn extract_top<'a, T, F>(
    query: &str,
    candidates: &'a [T],
    key: F,
    limit: usize,
) -> Vec<Match<'a, T>>
where
    F: Fn(&T) -> &str,
{
    let query = normalize(query);
    let mut scored: Vec<Match<'a, T>> = candidates
        .iter()
        .enumerate()
        .map(|(index, item)| Match {
            item,
            score: weighted(&query, &normalize(key(item))),
            index,
        })
        .collect();
    // `sort_by_key` is stable.
    scored.sort_by_key(|m| Reverse(m.score));
    scored.truncate(limit);
    scored
}

/// Reorder `items` by how well their owner matches `owner_hint`, best first.
///
/// Never adds or drops an element. Equal scores keep their input order, and a
/// blank hint leaves the order untouched.
pub fn rerank_by_owner<T: Owned>(mut items: Vec<T>, owner_hint: &str) -> Vec<T> {
    let hint = normalize(owner_hint);
    if hint.is_empty() {
        return items;
    }
    items.sort_by_cached_key(|item| Reverse(weighted(&hint, &normalize(item.owner()))));
    items
}

/// Best-of-several similarity between `a` and `b`.
pub fn weighted_ratio(a: &str, b: &str) -> Score {
    weighted(&normalize(a), &normalize(b))
}

/// Edit-distance similarity of the whole strings.
pub fn ratio(a: &str, b: &str) -> Score {
    edit_ratio(&normalize(a), &normalize(b))
}

/// Similarity of the shorter string to its best-matching window in the longer one.
pub fn partial_ratio(a: &str, b: &str) -> Score {
    best_window(&normalize(a), &normalize(b))
}

/// Similarity after splitting into token sets, comparing the shared tokens
/// with each side's remainder.
pub fn token_set_ratio(a: &str, b: &str) -> Score {
    token_set(&normalize(a), &normalize(b), edit_ratio)
}

/// Lowercase, replace anything that is not alphanumeric with a space, trim.
fn normalize(s: &str) -> String {
    let mapped: String = s
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    mapped.trim().to_string()
}

fn weighted(a: &str, b: &str) -> Score {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let (len_a, len_b) = (a.chars().count() as f64, b.chars().count() as f64);
    let len_ratio = len_a.max(len_b) / len_a.min(len_b);
    let base = f64::from(edit_ratio(a, b));

    let best = if len_ratio < PARTIAL_THRESHOLD {
        let sorted = f64::from(token_sort(a, b, edit_ratio)) * TOKEN_SCALE;
        let set = f64::from(token_set(a, b, edit_ratio)) * TOKEN_SCALE;
        base.max(sorted).max(set)
    } else {
        let scale = if len_ratio > 8.0 { 0.6 } else { 0.9 };
        let partial = f64::from(best_window(a, b)) * scale;
        let sorted = f64::from(token_sort(a, b, best_window)) * TOKEN_SCALE * scale;
        let set = f64::from(token_set(a, b, best_window)) * TOKEN_SCALE * scale;
        base.max(partial).max(sorted).max(set)
    };
    best.round().clamp(0.0, 100.0) as Score
}

fn edit_ratio(a: &str, b: &str) -> Score {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as Score
}

fn best_window(a: &str, b: &str) -> Score {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let width = short.chars().count();
    if width == 0 {
        return 0;
    }

    let long: Vec<char> = long.chars().collect();
    if long.len() == width {
        return edit_ratio(short, &long.iter().collect::<String>());
    }

    let mut best = 0;
    for window in long.windows(width) {
        let candidate: String = window.iter().collect();
        best = best.max(edit_ratio(short, &candidate));
        if best == 100 {
            break;
        }
    }
    best
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn token_sort(a: &str, b: &str, scorer: fn(&str, &str) -> Score) -> Score {
    scorer(&sorted_tokens(a), &sorted_tokens(b))
}

fn token_set(a: &str, b: &str, scorer: fn(&str, &str) -> Score) -> Score {
    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();

    let shared = join(set_a.intersection(&set_b));
    let only_a = join(set_a.difference(&set_b));
    let only_b = join(set_b.difference(&set_a));

    let with_a = join_nonempty(&shared, &only_a);
    let with_b = join_nonempty(&shared, &only_b);

    scorer(&shared, &with_a)
        .max(scorer(&shared, &with_b))
        .max(scorer(&with_a, &with_b))
}

fn join<S: AsRef<str>>(tokens: impl Iterator<Item = S>) -> String {
    tokens
        .map(|t| t.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_nonempty(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct Owner(&'static str, u32);

    impl Owned for Owner {
        fn owner(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_identical_strings_score_100() {
        assert_eq!(weighted_ratio("Entity", "entity"), 100);
        assert_eq!(ratio("ChatLib", "CHATLIB"), 100);
    }

    #[test]
    fn test_unrelated_strings_score_low() {
        assert!(weighted_ratio("renderWorld", "xyzzy") < 30);
    }

    #[test]
    fn test_empty_input_scores_zero() {
        assert_eq!(weighted_ratio("", "Entity"), 0);
        assert_eq!(weighted_ratio("!!!", "Entity"), 0);
    }

    #[test]
    fn test_substring_scores_high() {
        assert_eq!(partial_ratio("player", "EntityPlayerSP"), 100);
        assert!(weighted_ratio("Player", "EntityPlayerSP") >= 85);
    }

    #[test]
    fn test_token_reordering_scores_high() {
        assert_eq!(token_set_ratio("world render", "render world"), 100);
        assert!(weighted_ratio("world.render", "render world") >= 95);
    }

    #[test]
    fn test_token_set_ignores_extra_tokens() {
        assert_eq!(token_set_ratio("client minecraft", "net minecraft client"), 100);
    }

    #[test]
    fn test_exact_match_outranks_superstring() {
        assert!(weighted_ratio("Entity", "Entity") > weighted_ratio("Entity", "EntityPlayer"));
    }

    #[test]
    fn test_extract_top_orders_and_limits() {
        let names = ["Renderer", "Tessellator", "Render", "GlStateManager", "RenderHelper"];
        let top = extract_top("render", &names, |s| *s, 3);
        assert_eq!(top.len(), 3);
        assert_eq!(*top[0].item, "Render");
        assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_extract_top_is_stable_on_ties() {
        let names = ["Alpha", "alpha", "ALPHA"];
        let top = extract_top("alpha", &names, |s| *s, 5);
        let order: Vec<usize> = top.iter().map(|m| m.index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_extract_top_limit_beyond_len() {
        let names = ["a", "b"];
        assert_eq!(extract_top("a", &names, |s| *s, 10).len(), 2);
    }

    #[test]
    fn test_extract_top_empty_candidates() {
        let names: [&str; 0] = [];
        assert!(extract_top("anything", &names, |s| *s, 5).is_empty());
    }

    #[test]
    fn test_rerank_prefers_matching_owner() {
        let items = vec![
            Owner("GuiScreen", 1),
            Owner("EntityRenderer", 2),
            Owner("Minecraft", 3),
        ];
        let ranked = rerank_by_owner(items, "EntityRender");
        assert_eq!(ranked[0], Owner("EntityRenderer", 2));
    }

    #[test]
    fn test_rerank_handles_owner_paths() {
        let items = vec![
            Owner("net/minecraft/client/gui/GuiScreen", 1),
            Owner("net/minecraft/client/renderer/EntityRenderer", 2),
        ];
        let ranked = rerank_by_owner(items, "EntityRenderer");
        assert_eq!(ranked[0].1, 2);
    }

    #[test]
    fn test_rerank_is_a_permutation() {
        let items = vec![
            Owner("Alpha", 1),
            Owner("Beta", 2),
            Owner("Gamma", 3),
            Owner("Beta", 4),
        ];
        let mut ranked = rerank_by_owner(items.clone(), "beta");
        assert_eq!(ranked.len(), items.len());
        ranked.sort_by_key(|o| o.1);
        assert_eq!(ranked, items);
    }

    #[test]
    fn test_rerank_ties_keep_input_order() {
        let items = vec![Owner("Beta", 1), Owner("Zeta", 2), Owner("Beta", 3)];
        let ranked = rerank_by_owner(items, "beta");
        assert_eq!(ranked[0].1, 1);
        assert_eq!(ranked[1].1, 3);
    }

    #[test]
    fn test_rerank_blank_hint_is_noop() {
        let items = vec![Owner("B", 1), Owner("A", 2)];
        assert_eq!(rerank_by_owner(items.clone(), "  "), items);
    }
}
