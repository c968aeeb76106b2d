//! End-to-end dispatch tests
//!
//! Full `process_all` runs over HTTP: warm-up, batching, requeueing of
//! missing ids and the final report.

#[cfg(test)]
mod tests {
    use crate::common::{EchoReviews, RecordFactory, requested_ids, test_config};
    use llm_batch_dispatch::{Dispatcher, ErrorKind};
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::collections::{HashMap, HashSet};
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PRIME_MARKER: &str = "Cache priming request";

    async fn batch_requests(server: &MockServer) -> Vec<Vec<String>> {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|request| request.body_json::<Value>().ok())
            .map(|body| requested_ids(&body))
            .filter(|ids| !ids.is_empty())
            .collect()
    }

    // ==================== Happy Path ====================

    /// Twelve records in batches of five complete in a single wave
    #[tokio::test]
    async fn test_full_run_single_wave() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(EchoReviews::new())
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let dispatcher = Dispatcher::from_config(config).await.unwrap();
        let report = dispatcher
            .process_all(RecordFactory::notes(12), None)
            .await
            .unwrap();

        assert_eq!(report.total_count, 12);
        assert_eq!(report.results.len(), 12);
        assert!(report.permanently_failed.is_empty());
        assert_eq!(report.batches_sent, 3);
        assert_eq!(report.final_concurrency, 11);
        assert!(report.is_conserved());

        let positions: HashSet<usize> =
            report.results.iter().map(|r| r.original_position).collect();
        assert_eq!(positions, (0..12).collect());

        let sizes: Vec<usize> = batch_requests(&server).await.iter().map(Vec::len).collect();
        let mut sorted = sizes.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![2, 5, 5]);
    }

    /// Ids dropped from the first response are requeued and completed
    #[tokio::test]
    async fn test_missing_ids_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(EchoReviews::dropping_last_for(1))
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let dispatcher = Dispatcher::from_config(config).await.unwrap();

        let progress = Mutex::new(Vec::new());
        let on_progress = |done: usize, total: usize| progress.lock().push((done, total));
        let report = dispatcher
            .process_all(RecordFactory::notes(5), Some(&on_progress))
            .await
            .unwrap();

        assert_eq!(report.results.len(), 5);
        assert!(report.permanently_failed.is_empty());
        assert_eq!(report.waves, 2);
        assert_eq!(*progress.lock(), vec![(4, 5), (5, 5)]);

        let requests = batch_requests(&server).await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1], vec![requests[0][4].clone()]);
    }

    /// Results keep the endpoint's judgment fields alongside the id
    #[tokio::test]
    async fn test_result_fields_and_placeholders() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(EchoReviews::new())
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let dispatcher = Dispatcher::from_config(config).await.unwrap();
        let report = dispatcher
            .process_all(RecordFactory::notes(3), None)
            .await
            .unwrap();

        let merged = report.with_placeholders();
        assert_eq!(merged.len(), 3);
        for (position, result) in merged.iter().enumerate() {
            assert_eq!(result.original_position, position);
            assert_eq!(result.id.len(), 5);
            assert_eq!(result.fields["reason"], "none");
        }
    }

    // ==================== Failures ====================

    /// A persistently rejecting endpoint ends with every item failed once
    /// its budget is spent, and placeholders cover all of them
    #[tokio::test]
    async fn test_permanent_failures_get_placeholders() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri());
        config.dispatch.max_retries = 2;
        let dispatcher = Dispatcher::from_config(config).await.unwrap();
        let report = dispatcher
            .process_all(RecordFactory::notes(6), None)
            .await
            .unwrap();

        assert!(report.results.is_empty());
        assert_eq!(report.permanently_failed.len(), 6);
        assert!(report.is_conserved());

        let mut appearances: HashMap<String, usize> = HashMap::new();
        for ids in batch_requests(&server).await {
            for id in ids {
                *appearances.entry(id).or_default() += 1;
            }
        }
        assert!(appearances.values().all(|&n| n == 3));

        let placeholders = report.with_placeholders();
        assert_eq!(placeholders.len(), 6);
        assert!(placeholders.iter().all(|p| p.fields["needs_review"] == true));
        assert!(placeholders.iter().all(|p| p.fields["reason"] == "api_failure"));
        assert!(
            report.permanently_failed[0].reason.starts_with("PERMISSION:"),
            "unexpected reason {}",
            report.permanently_failed[0].reason
        );
    }

    /// Running out of identifiers aborts before anything is sent
    #[tokio::test]
    async fn test_capacity_exceeded() {
        use llm_batch_dispatch::core::dispatch::IdentityAssigner;

        let server = MockServer::start().await;
        let config = test_config(&server.uri());
        let dispatcher = Dispatcher::from_config(config)
            .await
            .unwrap()
            .with_identity(IdentityAssigner::new("xy", 2, 50).unwrap());

        let err = dispatcher
            .process_all(RecordFactory::notes(5), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    // ==================== Prompt Cache ====================

    /// A stale cache is primed once, then left alone while fresh
    #[tokio::test]
    async fn test_cache_primed_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains(PRIME_MARKER))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "OK"}],
                "usage": {"cache_creation_input_tokens": 4096}
            })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(EchoReviews::new())
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri());
        config.cache.enabled = true;
        let dispatcher = Dispatcher::from_config(config).await.unwrap();

        assert!(dispatcher.prompt_cache().is_stale());
        dispatcher
            .process_all(RecordFactory::notes(4), None)
            .await
            .unwrap();
        dispatcher
            .process_all(RecordFactory::notes(4), None)
            .await
            .unwrap();
        assert!(!dispatcher.prompt_cache().is_stale());
    }

    /// A failed prime does not stop the run
    #[tokio::test]
    async fn test_failed_prime_is_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains(PRIME_MARKER))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(EchoReviews::new())
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri());
        config.cache.enabled = true;
        let dispatcher = Dispatcher::from_config(config).await.unwrap();

        let report = dispatcher
            .process_all(RecordFactory::notes(4), None)
            .await
            .unwrap();
        assert_eq!(report.results.len(), 4);
        assert!(dispatcher.prompt_cache().is_stale());
    }
}
