//! Keyword overlap fallback ranking.
//!
//! Used when no vector search is possible (provider down, artifacts
//! missing). Each record is flattened into a lowercase blob of its
//! description and keywords for the requested language; query tokens are
//! matched by substring containment. The score rewards both coverage (how
//! many query tokens matched) and specificity (matched token length
//! relative to blob length), clamped to at most 1.

use std::cmp::Ordering as CmpOrdering;

use crate::data::{CodeRecord, Language, ResultSource, ScoredResult};

/// Tokens this short carry no signal.
const SHORT_TOKEN_LEN: usize = 2;

/// Scores at or below this floor are dropped as noise.
const NOISE_FLOOR: f32 = 0.05;

/// Function words carrying no signal, in both dataset languages.
const STOP_WORDS: &[&str] = &[
    "and", "the", "for", "with", "from", "not", "this", "that", "these", "those", "của", "hoặc",
    "cái", "trong", "cho", "với", "không", "này", "kia", "các",
];

/// Split a query into lowercase tokens, dropping tokens of two characters
/// or fewer and common function words.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|token| {
            token.chars().count() > SHORT_TOKEN_LEN && !STOP_WORDS.contains(&token.as_str())
        })
        .collect()
}

/// Rank records by keyword overlap with the query.
///
/// Results are sorted by descending score; ties keep input order. A query
/// with no usable tokens yields an empty result set, not an error.
pub fn rank(
    query: &str,
    records: &[CodeRecord],
    top_k: usize,
    language: Language,
) -> Vec<ScoredResult> {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut results = Vec::new();
    for record in records {
        let blob = record_blob(record, language);
        let blob_chars = blob.chars().count();
        if blob_chars == 0 {
            continue;
        }

        let mut matched = 0usize;
        let mut specificity = 0.0f32;
        for token in &tokens {
            if blob.contains(token.as_str()) {
                matched += 1;
                let weight = token.chars().count() as f32 / blob_chars as f32 * 10.0;
                specificity += weight.min(1.0);
            }
        }
        if matched == 0 {
            continue;
        }

        let coverage = matched as f32 / tokens.len() as f32;
        let score = (specificity * coverage).min(1.0);
        if score <= NOISE_FLOOR {
            continue;
        }

        results.push(ScoredResult {
            record: record.clone(),
            score,
            source: ResultSource::Keyword,
        });
    }

    // Stable sort: equal scores keep their input order.
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(CmpOrdering::Equal));
    results.truncate(top_k);
    results
}

/// Lowercase description plus keywords for the language, space-joined.
fn record_blob(record: &CodeRecord, language: Language) -> String {
    let description = record.description_for(language);
    let keywords = record.keywords_for(language);

    let mut blob = String::with_capacity(
        description.len() + keywords.iter().map(|k| k.len() + 1).sum::<usize>(),
    );
    blob.push_str(description);
    for keyword in keywords {
        blob.push(' ');
        blob.push_str(keyword);
    }
    blob.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(
        code: &str,
        description: &str,
        keywords: &[&str],
    ) -> CodeRecord {
        CodeRecord {
            code: code.to_string(),
            label: format!("label {code}"),
            label_alt: None,
            description: description.to_string(),
            description_alt: None,
            group_id: "01".to_string(),
            section_id: "I".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            keywords_alt: None,
        }
    }

    fn make_records() -> Vec<CodeRecord> {
        vec![
            make_record(
                "847130",
                "Portable computers",
                &["laptop", "notebook", "computer"],
            ),
            make_record("090210", "Green tea", &["tea", "beverage"]),
        ]
    }

    #[test]
    fn test_tokenize_drops_short_tokens_and_stop_words() {
        assert!(tokenize("a an the").is_empty());
        assert!(tokenize("").is_empty());
        assert_eq!(tokenize("Red wine of France"), vec!["red", "wine", "france"]);
    }

    #[test]
    fn test_stopword_query_yields_empty_results() {
        // "the" appears in the blob, but stopword-like tokens never match.
        let records = vec![make_record("010121", "Horses of the pure breed", &[])];
        assert!(rank("a an the", &records, 10, Language::Primary).is_empty());
    }

    #[test]
    fn test_coverage_orders_results() {
        let records = make_records();
        let results = rank("portable computer tea", &records, 10, Language::Primary);

        assert_eq!(results.len(), 2);
        // Two of three tokens matched beats one of three.
        assert_eq!(results[0].record.code, "847130");
        assert_eq!(results[1].record.code, "090210");
        assert!(results[0].score > results[1].score);
        assert!(results.iter().all(|r| r.source == ResultSource::Keyword));
    }

    #[test]
    fn test_score_clamped_to_one() {
        let results = rank("laptop computer", &make_records(), 10, Language::Primary);
        assert_eq!(results[0].record.code, "847130");
        assert_eq!(results[0].score, 1.0);
    }

    #[test]
    fn test_noise_floor_drops_weak_matches() {
        // One three-char token against a blob of several hundred chars
        // scores below the floor.
        let description = format!("tea {}", "filler".repeat(100));
        let records = vec![make_record("090210", &description, &[])];

        assert!(rank("tea", &records, 10, Language::Primary).is_empty());
    }

    #[test]
    fn test_unmatched_records_are_dropped() {
        let results = rank("laptop", &make_records(), 10, Language::Primary);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.code, "847130");
    }

    #[test]
    fn test_ties_keep_input_order() {
        // Each record matches one of the two tokens with full specificity.
        let records = make_records();
        let results = rank("laptop beverage", &records, 10, Language::Primary);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].score, results[1].score);
        assert_eq!(results[0].record.code, "847130");
        assert_eq!(results[1].record.code, "090210");
    }

    #[test]
    fn test_top_k_truncates() {
        let results = rank("tea computer", &make_records(), 1, Language::Primary);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_alt_language_blob() {
        let mut record = make_record("847130", "Portable computers", &["laptop"]);
        record.description_alt = Some("Máy tính xách tay".to_string());
        record.keywords_alt = Some(vec!["máy tính".to_string()]);
        let records = vec![record];

        let results = rank("máy tính", &records, 10, Language::Alt);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 1.0);

        // The primary blob does not contain the alt-language tokens.
        assert!(rank("máy tính", &records, 10, Language::Primary).is_empty());
    }

    #[test]
    fn test_alt_language_falls_back_to_primary_fields() {
        // No alt translation: the alt-language blob is the primary one.
        let records = make_records();
        let results = rank("laptop", &records, 10, Language::Alt);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.code, "847130");
    }
}
