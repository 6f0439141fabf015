/// Cross-query bookkeeping: which related phrases recur across input queries,
/// and the run-wide top-N ranking.
use std::collections::HashMap;

use crate::classifier::normalize;
use crate::model::{FrequencyResult, QueryId, RelatedPhrase};

/// Normalized phrase → ids of the input queries it appeared under.
///
/// Occurrences are counted per distinct query: recording a phrase twice for
/// the same query leaves its occurrence list unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupIndex {
    occurrences: HashMap<String, Vec<QueryId>>,
    /// Keys in first-occurrence order.
    order: Vec<String>,
}

/// A phrase seen under two or more queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub phrase: String,
    pub occurrences: usize,
}

impl DedupIndex {
    /// Register that `phrase` appeared while processing `query_id`.
    ///
    /// Returns `true` only for the phrase's first occurrence in the run.
    pub fn record(&mut self, query_id: QueryId, phrase: &str) -> bool {
        let key = normalize(phrase);
        match self.occurrences.get_mut(&key) {
            Some(queries) => {
                if !queries.contains(&query_id) {
                    queries.push(query_id);
                }
                false
            }
            None => {
                self.order.push(key.clone());
                self.occurrences.insert(key, vec![query_id]);
                true
            }
        }
    }

    /// Number of distinct queries the phrase appeared under (0 if never seen).
    pub fn occurrences(&self, phrase: &str) -> usize {
        self.occurrences
            .get(&normalize(phrase))
            .map_or(0, Vec::len)
    }

    pub fn queries_for(&self, phrase: &str) -> &[QueryId] {
        self.occurrences
            .get(&normalize(phrase))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_duplicate(&self, phrase: &str) -> bool {
        self.occurrences(phrase) >= 2
    }

    /// Phrases seen under at least two queries, in first-occurrence order.
    pub fn duplicates(&self) -> Vec<Duplicate> {
        self.order
            .iter()
            .filter_map(|key| {
                let count = self.occurrences.get(key).map_or(0, Vec::len);
                (count >= 2).then(|| Duplicate {
                    phrase: key.clone(),
                    occurrences: count,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}

/// The `n` highest-count related phrases across all results.
///
/// Entries sharing a normalized phrase are merged into one, keeping the
/// first-seen spelling and position and the largest count. The sort is stable,
/// so equal counts stay in first-seen order.
pub fn top_n<'a, I>(results: I, n: usize) -> Vec<RelatedPhrase>
where
    I: IntoIterator<Item = &'a FrequencyResult>,
{
    let mut merged: Vec<RelatedPhrase> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for result in results {
        for entry in &result.related {
            let key = normalize(&entry.phrase);
            match positions.get(&key) {
                Some(&idx) => {
                    merged[idx].count = merged[idx].count.max(entry.count);
                }
                None => {
                    positions.insert(key, merged.len());
                    merged.push(entry.clone());
                }
            }
        }
    }

    merged.sort_by(|a, b| b.count.cmp(&a.count));
    merged.truncate(n);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(entries: &[(&str, u64)]) -> FrequencyResult {
        FrequencyResult {
            total_count: entries.iter().map(|(_, c)| c).sum(),
            related: entries
                .iter()
                .map(|(p, c)| RelatedPhrase {
                    phrase: p.to_string(),
                    count: *c,
                })
                .collect(),
        }
    }

    #[test]
    fn first_occurrence_is_reported_once() {
        let mut index = DedupIndex::default();
        assert!(index.record(0, "ремонт квартир"));
        assert!(!index.record(1, "Ремонт  квартир"));
        assert_eq!(index.occurrences("ремонт квартир"), 2);
        assert!(index.is_duplicate("РЕМОНТ КВАРТИР"));
        assert_eq!(index.queries_for("ремонт квартир"), &[0, 1]);
    }

    #[test]
    fn same_query_counts_once() {
        let mut index = DedupIndex::default();
        assert!(index.record(3, "ремонт квартир"));
        assert!(!index.record(3, "ремонт квартир"));
        assert_eq!(index.occurrences("ремонт квартир"), 1);
        assert!(!index.is_duplicate("ремонт квартир"));
        assert!(index.duplicates().is_empty());
    }

    #[test]
    fn duplicates_in_first_occurrence_order() {
        let mut index = DedupIndex::default();
        index.record(0, "b");
        index.record(0, "a");
        index.record(0, "c");
        index.record(1, "a");
        index.record(1, "b");
        index.record(2, "a");

        assert_eq!(index.len(), 3);
        assert_eq!(
            index.duplicates(),
            vec![
                Duplicate {
                    phrase: "b".to_string(),
                    occurrences: 2
                },
                Duplicate {
                    phrase: "a".to_string(),
                    occurrences: 3
                },
            ]
        );
    }

    #[test]
    fn unknown_phrase_has_no_occurrences() {
        let index = DedupIndex::default();
        assert_eq!(index.len(), 0);
        assert_eq!(index.occurrences("anything"), 0);
        assert!(index.queries_for("anything").is_empty());
    }

    #[test]
    fn top_n_orders_by_count_then_first_seen() {
        let results = vec![
            result(&[("low", 5), ("tie-first", 50)]),
            result(&[("high", 900), ("tie-second", 50)]),
        ];
        let top = top_n(&results, 10);
        let phrases: Vec<&str> = top.iter().map(|p| p.phrase.as_str()).collect();
        assert_eq!(phrases, vec!["high", "tie-first", "tie-second", "low"]);
    }

    #[test]
    fn top_n_truncates_and_merges_repeats() {
        let results = vec![
            result(&[("ремонт квартир", 100), ("дизайн", 40)]),
            result(&[("Ремонт квартир", 120), ("плитка", 60)]),
        ];
        let top = top_n(&results, 2);
        assert_eq!(
            top,
            vec![
                RelatedPhrase {
                    phrase: "ремонт квартир".to_string(),
                    count: 120
                },
                RelatedPhrase {
                    phrase: "плитка".to_string(),
                    count: 60
                },
            ]
        );
    }

    #[test]
    fn top_n_of_nothing_is_empty() {
        let results: Vec<FrequencyResult> = Vec::new();
        assert!(top_n(&results, 10).is_empty());
        assert!(top_n(&[result(&[("a", 1)])], 0).is_empty());
    }
}
