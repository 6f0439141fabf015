use chrono::NaiveDateTime;
use wordstat_common::error::ErrorKind;

use crate::aggregate::DedupIndex;

/// Index of an input query within the run, in input order.
pub type QueryId = usize;

/// A related phrase with its monthly count, in the order the API returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedPhrase {
    pub phrase: String,
    pub count: u64,
}

/// Frequency data for one input query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyResult {
    /// Aggregate monthly volume of the root phrase.
    pub total_count: u64,
    pub related: Vec<RelatedPhrase>,
}

impl FrequencyResult {
    /// Related phrases ordered by count, highest first. Ties keep API order.
    pub fn ranked(&self) -> Vec<&RelatedPhrase> {
        let mut ranked: Vec<&RelatedPhrase> = self.related.iter().collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked
    }
}

/// Why a query produced no data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFailure {
    pub phrase: String,
    pub attempts: u32,
    pub last_error: String,
    /// `true` when the last error was transient and the attempt budget ran out.
    pub exhausted: bool,
}

impl QueryFailure {
    pub fn new(phrase: &str, attempts: u32, last_error: String, kind: ErrorKind) -> Self {
        Self {
            phrase: phrase.to_string(),
            attempts,
            last_error,
            exhausted: kind == ErrorKind::Transient,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(FrequencyResult),
    Failure(QueryFailure),
}

impl FetchOutcome {
    pub fn result(&self) -> Option<&FrequencyResult> {
        match self {
            FetchOutcome::Success(result) => Some(result),
            FetchOutcome::Failure(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub query: String,
    pub outcome: FetchOutcome,
}

/// Everything one run produced, consumed once by the renderer and exporter.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub started_at: NaiveDateTime,
    pub queries: Vec<QueryOutcome>,
    pub index: DedupIndex,
}

impl RunResult {
    pub fn new(started_at: NaiveDateTime) -> Self {
        Self {
            started_at,
            queries: Vec::new(),
            index: DedupIndex::default(),
        }
    }

    pub fn success_count(&self) -> usize {
        self.queries.iter().filter(|q| q.outcome.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.queries.len() - self.success_count()
    }

    pub fn results(&self) -> impl Iterator<Item = &FrequencyResult> {
        self.queries.iter().filter_map(|q| q.outcome.result())
    }

    pub fn failures(&self) -> Vec<QueryFailure> {
        self.queries
            .iter()
            .filter_map(|q| match &q.outcome {
                FetchOutcome::Failure(f) => Some(f.clone()),
                FetchOutcome::Success(_) => None,
            })
            .collect()
    }
}

/// Closed set of intent categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Commercial,
    Informational,
    Price,
    Comparison,
    Other,
}

impl Category {
    pub fn emoji(self) -> &'static str {
        match self {
            Category::Commercial => "🛒",
            Category::Informational => "📚",
            Category::Price => "💰",
            Category::Comparison => "⚖️",
            Category::Other => "🔍",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Category::Commercial => "Коммерческий",
            Category::Informational => "Информационный",
            Category::Price => "Ценовой",
            Category::Comparison => "Сравнение",
            Category::Other => "Прочее",
        }
    }

    /// Stable machine-readable name used in exports.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Commercial => "commercial",
            Category::Informational => "informational",
            Category::Price => "price",
            Category::Comparison => "comparison",
            Category::Other => "other",
        }
    }
}
