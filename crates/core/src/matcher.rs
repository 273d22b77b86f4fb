//! Tiered product-name resolution.
//!
//! Free-text product mentions coming out of the classifier are rarely exact
//! catalog names. Resolution walks a fixed ladder of increasingly permissive
//! tiers; the first tier that produces at least one candidate decides the
//! outcome. Zero candidates fall through to the next tier.
//!
//! 1. exact name (case-insensitive)            -> confidence 100
//! 2. name starts with query                   -> 95 unique / 90 ambiguous
//! 3. name contains every query word (>= 2)    -> 85 unique / 80 ambiguous
//! 4. name contains the whole phrase           -> 75 unique / 70 ambiguous
//! 5. best fuzzy score >= threshold            -> that score
//! 6. nothing usable: top fuzzy hints >= 40    -> not found

use crate::domain::product::Product;

/// Default minimum fuzzy score to accept a tier-5 match.
pub const DEFAULT_FUZZY_THRESHOLD: u8 = 60;

/// Fuzzy hints below this score are too noisy to suggest.
const SUGGESTION_FLOOR: u8 = 40;

/// Ambiguous tiers and the not-found fallback cap their suggestion lists.
const MAX_SUGGESTIONS: usize = 5;

/// Words this short carry no signal in the multi-word tier ("de", "el", ...).
const MIN_TOKEN_LEN: usize = 3;

#[derive(Clone, Debug, PartialEq)]
pub enum MatchOutcome {
    /// Case-insensitive full-name hit.
    Exact(Product),
    /// Exactly one candidate at some tier; confidence identifies the tier
    /// (or the computed score for fuzzy matches).
    Unique { product: Product, confidence: u8 },
    /// Several candidates at the same tier; the caller must re-prompt.
    Ambiguous { suggestions: Vec<String>, confidence: u8 },
    /// No tier produced a usable match; suggestions are best-effort hints.
    NotFound { suggestions: Vec<String> },
}

impl MatchOutcome {
    pub fn confidence(&self) -> u8 {
        match self {
            Self::Exact(_) => 100,
            Self::Unique { confidence, .. } | Self::Ambiguous { confidence, .. } => *confidence,
            Self::NotFound { .. } => 0,
        }
    }
}

/// Resolve `query` against the active slice of the catalog.
///
/// `products` is expected in store iteration order: non-fuzzy ambiguous tiers
/// keep that order when truncating to five suggestions, only the fuzzy tiers
/// re-rank by score.
pub fn resolve(query: &str, products: &[Product], threshold: u8) -> MatchOutcome {
    let query = query.trim();
    if query.is_empty() || products.is_empty() {
        return MatchOutcome::NotFound { suggestions: Vec::new() };
    }

    let query_lower = query.to_lowercase();

    // Tier 1: exact.
    if let Some(product) = products.iter().find(|p| p.name.to_lowercase() == query_lower) {
        return MatchOutcome::Exact(product.clone());
    }

    // Tier 2: prefix.
    if let Some(outcome) =
        decide_tier(products, 95, 90, |name| name.starts_with(&query_lower))
    {
        return outcome;
    }

    // Tier 3: every significant word contained, order-independent.
    let words: Vec<&str> = query_lower
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_TOKEN_LEN)
        .collect();
    if query_lower.split_whitespace().count() >= 2 && !words.is_empty() {
        if let Some(outcome) = decide_tier(products, 85, 80, |name| {
            words.iter().all(|word| name.contains(word))
        }) {
            return outcome;
        }
    }

    // Tier 4: whole phrase as substring.
    if let Some(outcome) = decide_tier(products, 75, 70, |name| name.contains(&query_lower)) {
        return outcome;
    }

    // Tier 5: best fuzzy match above the acceptance threshold.
    let mut scored: Vec<(u8, &Product)> =
        products.iter().map(|p| (token_sort_ratio(&query_lower, &p.name), p)).collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    if let Some(&(best_score, best)) = scored.first() {
        if best_score >= threshold {
            return MatchOutcome::Unique { product: best.clone(), confidence: best_score };
        }
    }

    // Tier 6: ranked fuzzy hints only.
    let suggestions = scored
        .iter()
        .take(MAX_SUGGESTIONS)
        .filter(|(score, _)| *score >= SUGGESTION_FLOOR)
        .map(|(_, p)| p.name.clone())
        .collect();

    MatchOutcome::NotFound { suggestions }
}

fn decide_tier(
    products: &[Product],
    unique_confidence: u8,
    ambiguous_confidence: u8,
    matches: impl Fn(&str) -> bool,
) -> Option<MatchOutcome> {
    let hits: Vec<&Product> =
        products.iter().filter(|p| matches(&p.name.to_lowercase())).collect();

    match hits.len() {
        0 => None,
        1 => Some(MatchOutcome::Unique {
            product: hits[0].clone(),
            confidence: unique_confidence,
        }),
        _ => Some(MatchOutcome::Ambiguous {
            suggestions: hits.iter().take(MAX_SUGGESTIONS).map(|p| p.name.clone()).collect(),
            confidence: ambiguous_confidence,
        }),
    }
}

/// Token-order-insensitive similarity on a 0-100 scale: both sides are
/// lowercased, split on whitespace, sorted, rejoined, then compared with
/// normalized Levenshtein. "cuaderno azul" and "azul cuaderno" score 100.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let normalize = |s: &str| {
        let lowered = s.to_lowercase();
        let mut tokens: Vec<&str> = lowered.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.join(" ")
    };

    let left = normalize(a);
    let right = normalize(b);
    if left.is_empty() && right.is_empty() {
        return 100;
    }

    (strsim::normalized_levenshtein(&left, &right) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::product::{Category, CategoryId, Product, ProductId};

    use super::{resolve, token_sort_ratio, MatchOutcome, DEFAULT_FUZZY_THRESHOLD};

    fn catalog(names: &[&str]) -> Vec<Product> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Product {
                id: ProductId(i as i64 + 1),
                name: name.to_string(),
                sale_price: Decimal::new(150, 2),
                cost_price: Decimal::new(90, 2),
                current_stock: 10,
                minimum_stock: 2,
                category: Category { id: CategoryId(1), name: "Papelería".to_string() },
                active: true,
            })
            .collect()
    }

    fn resolve_default(query: &str, names: &[&str]) -> MatchOutcome {
        resolve(query, &catalog(names), DEFAULT_FUZZY_THRESHOLD)
    }

    #[test]
    fn exact_match_ignores_case_and_wins_over_everything() {
        let outcome = resolve_default("cuaderno", &["Cuaderno", "Cuaderno Azul"]);
        match outcome {
            MatchOutcome::Exact(product) => assert_eq!(product.name, "Cuaderno"),
            other => panic!("expected exact, got {other:?}"),
        }
    }

    #[test]
    fn unique_prefix_scores_95() {
        let outcome = resolve_default("lapi", &["Lapicero Azul", "Borrador"]);
        assert!(matches!(
            outcome,
            MatchOutcome::Unique { confidence: 95, ref product } if product.name == "Lapicero Azul"
        ));
    }

    #[test]
    fn prefix_tie_reports_both_names_in_store_order() {
        let outcome = resolve_default("cuaderno", &["Cuaderno Azul", "Cuaderno Rojo"]);
        match outcome {
            MatchOutcome::Ambiguous { suggestions, confidence } => {
                assert_eq!(confidence, 90);
                assert_eq!(suggestions, vec!["Cuaderno Azul", "Cuaderno Rojo"]);
            }
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn ambiguous_suggestions_cap_at_five() {
        let names = ["Caja A", "Caja B", "Caja C", "Caja D", "Caja E", "Caja F", "Caja G"];
        match resolve_default("caja", &names) {
            MatchOutcome::Ambiguous { suggestions, .. } => assert_eq!(suggestions.len(), 5),
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn multi_word_containment_matches_out_of_order() {
        let outcome =
            resolve_default("azul cuaderno", &["Cuaderno Grande Azul", "Cuaderno Rojo"]);
        assert!(matches!(
            outcome,
            MatchOutcome::Unique { confidence: 85, ref product }
                if product.name == "Cuaderno Grande Azul"
        ));
    }

    #[test]
    fn multi_word_tier_ignores_short_tokens() {
        // "de" is dropped; only "tijeras" must be contained.
        let outcome = resolve_default("tijeras de", &["Tijeras Escolares", "Borrador"]);
        assert!(matches!(outcome, MatchOutcome::Unique { confidence: 85, .. }));
    }

    #[test]
    fn whole_phrase_containment_scores_75() {
        let outcome = resolve_default("grande", &["Cuaderno Grande", "Borrador"]);
        assert!(matches!(
            outcome,
            MatchOutcome::Unique { confidence: 75, ref product }
                if product.name == "Cuaderno Grande"
        ));
    }

    #[test]
    fn phrase_containment_tie_is_ambiguous_at_70() {
        let outcome = resolve_default("grande", &["Cuaderno Grande", "Caja Grande"]);
        assert!(matches!(outcome, MatchOutcome::Ambiguous { confidence: 70, .. }));
    }

    #[test]
    fn typo_resolves_through_fuzzy_tier() {
        // Scenario F: transposition scores 75, above the default threshold.
        let outcome = resolve_default("cuadreno", &["Cuaderno"]);
        match outcome {
            MatchOutcome::Unique { product, confidence } => {
                assert_eq!(product.name, "Cuaderno");
                assert!(confidence >= DEFAULT_FUZZY_THRESHOLD, "score {confidence}");
            }
            other => panic!("expected fuzzy unique, got {other:?}"),
        }
    }

    #[test]
    fn hopeless_query_returns_not_found_without_weak_hints() {
        let outcome = resolve_default("zzzzqqqq", &["Cuaderno", "Borrador"]);
        match outcome {
            MatchOutcome::NotFound { suggestions } => assert!(suggestions.is_empty()),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn near_miss_below_threshold_still_yields_hints() {
        // Same typo as the fuzzy test, but with an acceptance threshold the
        // score cannot reach: the name degrades to a suggestion.
        let outcome = resolve("cuadreno", &catalog(&["Cuaderno"]), 99);
        match outcome {
            MatchOutcome::NotFound { suggestions } => {
                assert_eq!(suggestions, vec!["Cuaderno"]);
            }
            other => panic!("expected not found with hints, got {other:?}"),
        }
    }

    #[test]
    fn blank_query_short_circuits() {
        assert_eq!(
            resolve_default("   ", &["Cuaderno"]),
            MatchOutcome::NotFound { suggestions: Vec::new() }
        );
    }

    #[test]
    fn empty_catalog_short_circuits() {
        assert_eq!(
            resolve("cuaderno", &[], DEFAULT_FUZZY_THRESHOLD),
            MatchOutcome::NotFound { suggestions: Vec::new() }
        );
    }

    #[test]
    fn token_sort_ratio_is_order_insensitive() {
        assert_eq!(token_sort_ratio("cuaderno azul", "azul cuaderno"), 100);
    }

    #[test]
    fn token_sort_ratio_scores_transposition_above_threshold() {
        let score = token_sort_ratio("cuadreno", "cuaderno");
        assert!(score >= DEFAULT_FUZZY_THRESHOLD, "score {score}");
    }

    #[test]
    fn confidence_accessor_reflects_variant() {
        assert_eq!(resolve_default("cuaderno", &["Cuaderno"]).confidence(), 100);
        assert_eq!(resolve_default("zzz", &["Cuaderno"]).confidence(), 0);
    }
}
