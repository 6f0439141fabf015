/// Sequential run loop: fetch one query, record its related phrases, pause,
/// move to the next. A failed query never stops the loop.
use chrono::NaiveDateTime;
use tracing::{error, info, warn};

use wordstat_common::error::FetchError;
use wordstat_common::wordstat::{
    is_auth_failure, TopRequestsRequest, TopRequestsResponse, WordstatClient, WordstatTransport,
};

use crate::config::Settings;
use crate::error::RunError;
use crate::model::{
    FetchOutcome, FrequencyResult, QueryFailure, QueryOutcome, RelatedPhrase, RunResult,
};

pub struct Pipeline<T> {
    client: WordstatClient<T>,
    settings: Settings,
}

impl<T: WordstatTransport> Pipeline<T> {
    pub fn new(client: WordstatClient<T>, settings: Settings) -> Self {
        Self { client, settings }
    }

    /// Process every query in order.
    ///
    /// Returns `RunError::NoData` when not a single query succeeded, so a
    /// report is only ever rendered from at least one result.
    pub async fn run(
        &self,
        queries: &[String],
        started_at: NaiveDateTime,
    ) -> Result<RunResult, RunError> {
        let mut run = RunResult::new(started_at);

        for (query_id, query) in queries.iter().enumerate() {
            if query_id > 0 && !self.settings.request_delay.is_zero() {
                tokio::time::sleep(self.settings.request_delay).await;
            }

            info!(
                query = %query,
                position = query_id + 1,
                total = queries.len(),
                "fetching query"
            );
            let outcome = self.fetch(query).await;

            if let FetchOutcome::Success(result) = &outcome {
                let new_phrases = result
                    .related
                    .iter()
                    .filter(|related| run.index.record(query_id, &related.phrase))
                    .count();
                info!(
                    query = %query,
                    total_count = result.total_count,
                    related = result.related.len(),
                    new_phrases,
                    "query processed"
                );
            }

            run.queries.push(QueryOutcome {
                query: query.clone(),
                outcome,
            });
        }

        info!(
            succeeded = run.success_count(),
            failed = run.failure_count(),
            distinct_phrases = run.index.len(),
            "run finished"
        );

        if run.success_count() == 0 {
            return Err(RunError::NoData {
                failures: run.failures(),
            });
        }
        Ok(run)
    }

    async fn fetch(&self, query: &str) -> FetchOutcome {
        let request = TopRequestsRequest {
            phrase: query.to_string(),
            regions: vec![self.settings.region_code],
            devices: self.settings.devices.clone(),
        };

        match self.client.top_requests(&request).await {
            Ok(resp) => FetchOutcome::Success(into_result(resp)),
            Err(err) => {
                if let FetchError::Upstream { status, .. } = &err.last {
                    if is_auth_failure(*status) {
                        warn!(%status, "wordstat rejected the token, check YANDEX_WORDSTAT_TOKEN");
                    }
                }
                error!(
                    query = %query,
                    attempts = err.attempts,
                    error = %err.last,
                    "query failed, continuing with the next one"
                );
                FetchOutcome::Failure(QueryFailure::new(
                    query,
                    err.attempts,
                    err.last.to_string(),
                    err.kind(),
                ))
            }
        }
    }
}

fn into_result(resp: TopRequestsResponse) -> FrequencyResult {
    FrequencyResult {
        total_count: resp.total_count,
        related: resp
            .top_requests
            .into_iter()
            .map(|entry| RelatedPhrase {
                phrase: entry.phrase,
                count: entry.count,
            })
            .collect(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::Instant;
    use wordstat_common::wordstat::{PhraseCount, StatusCode, WordstatClientConfig};

    use super::*;

    /// Answers per phrase; phrases without an entry always fail with 503.
    pub(crate) struct FakeTransport {
        answers: HashMap<String, TopRequestsResponse>,
        pub(crate) calls: Mutex<Vec<String>>,
        call_times: Mutex<Vec<Instant>>,
    }

    impl FakeTransport {
        pub(crate) fn new() -> Self {
            Self {
                answers: HashMap::new(),
                calls: Mutex::new(Vec::new()),
                call_times: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn with(mut self, phrase: &str, total: u64, related: &[(&str, u64)]) -> Self {
            self.answers.insert(
                phrase.to_string(),
                TopRequestsResponse {
                    request_phrase: Some(phrase.to_string()),
                    total_count: total,
                    top_requests: related
                        .iter()
                        .map(|(p, c)| PhraseCount {
                            phrase: p.to_string(),
                            count: *c,
                        })
                        .collect(),
                },
            );
            self
        }
    }

    #[async_trait]
    impl WordstatTransport for FakeTransport {
        async fn top_requests(
            &self,
            request: &TopRequestsRequest,
        ) -> Result<TopRequestsResponse, FetchError> {
            self.calls.lock().unwrap().push(request.phrase.clone());
            self.call_times.lock().unwrap().push(Instant::now());
            self.answers
                .get(&request.phrase)
                .cloned()
                .ok_or_else(|| FetchError::Upstream {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    message: "service unavailable".to_string(),
                })
        }
    }

    pub(crate) fn settings() -> Settings {
        Settings {
            city: "Москва".to_string(),
            region_code: 213,
            devices: vec!["all".to_string()],
            results_limit: 10,
            request_delay: Duration::ZERO,
        }
    }

    pub(crate) fn timestamp() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 10, 19)
            .and_then(|d| d.and_hms_opt(12, 30, 0))
            .unwrap()
    }

    pub(crate) fn pipeline(transport: FakeTransport) -> Pipeline<FakeTransport> {
        let config = WordstatClientConfig {
            retry_base_delay: Duration::ZERO,
            ..WordstatClientConfig::default()
        };
        Pipeline::new(WordstatClient::new(transport, &config), settings())
    }

    fn queries(list: &[&str]) -> Vec<String> {
        list.iter().map(|q| q.to_string()).collect()
    }

    #[tokio::test]
    async fn failed_query_does_not_stop_the_run() {
        let transport = FakeTransport::new().with(
            "ремонт квартир",
            1520,
            &[("ремонт квартир под ключ", 800), ("ремонт квартир цена", 300)],
        );
        let pipeline = pipeline(transport);

        let run = pipeline
            .run(&queries(&["дизайн интерьера", "ремонт квартир"]), timestamp())
            .await
            .unwrap();

        assert_eq!(run.success_count(), 1);
        assert_eq!(run.failure_count(), 1);

        let failure = &run.failures()[0];
        assert_eq!(failure.phrase, "дизайн интерьера");
        assert_eq!(failure.attempts, 3);
        assert!(failure.exhausted);

        // Three attempts for the failing phrase, one for the other.
        let calls = pipeline.client_calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls.last().map(String::as_str), Some("ремонт квартир"));
    }

    #[tokio::test]
    async fn related_phrases_are_indexed_per_query() {
        let transport = FakeTransport::new()
            .with("ремонт квартир", 1000, &[("ремонт под ключ", 500), ("дизайн", 50)])
            .with("отделка квартир", 700, &[("Ремонт под ключ", 450), ("плитка", 90)]);
        let run = pipeline(transport)
            .run(&queries(&["ремонт квартир", "отделка квартир"]), timestamp())
            .await
            .unwrap();

        assert_eq!(run.index.occurrences("ремонт под ключ"), 2);
        assert_eq!(run.index.occurrences("плитка"), 1);
        assert_eq!(run.index.duplicates().len(), 1);
    }

    #[tokio::test]
    async fn all_failures_is_no_data() {
        let run = pipeline(FakeTransport::new())
            .run(&queries(&["a", "b"]), timestamp())
            .await;

        match run {
            Err(RunError::NoData { failures }) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].phrase, "a");
                assert_eq!(failures[1].phrase, "b");
            }
            Ok(_) => panic!("expected NoData"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delay_runs_between_queries_only() {
        let transport = FakeTransport::new()
            .with("a", 10, &[])
            .with("b", 20, &[])
            .with("c", 30, &[]);
        let delay = Duration::from_secs(2);
        let settings = Settings {
            request_delay: delay,
            ..settings()
        };
        let client_config = WordstatClientConfig {
            retry_base_delay: Duration::ZERO,
            ..WordstatClientConfig::default()
        };
        let pipeline = Pipeline::new(WordstatClient::new(transport, &client_config), settings);

        let start = Instant::now();
        pipeline
            .run(&queries(&["a", "b", "c"]), timestamp())
            .await
            .unwrap();
        let elapsed = start.elapsed();

        let times = pipeline.client.transport().call_times.lock().unwrap().clone();
        assert_eq!(times.len(), 3);
        assert_eq!(times[0] - start, Duration::ZERO);
        for pair in times.windows(2) {
            assert_eq!(pair[1] - pair[0], delay);
        }
        // Two gaps for three queries, nothing after the last one.
        assert_eq!(elapsed, delay * 2);
    }

    impl Pipeline<FakeTransport> {
        fn client_calls(&self) -> Vec<String> {
            self.client.transport().calls.lock().unwrap().clone()
        }
    }
}
