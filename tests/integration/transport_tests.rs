//! Batch transport integration tests
//!
//! Exercises `HttpEndpoint` and the transport retry loop against a local HTTP
//! server: status classification, retry budgets, envelope parsing and headers.

#[cfg(test)]
mod tests {
    use crate::common::{EchoReviews, RecordFactory, messages_body, test_config};
    use llm_batch_dispatch::config::Config;
    use llm_batch_dispatch::core::dispatch::{
        BackoffPolicy, Batch, BatchEncoder, BatchTransport, ConcurrencyController, HttpEndpoint,
        ResponseClassifier, WorkItem,
    };
    use llm_batch_dispatch::utils::error::ErrorKind;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(
        config: &Config,
        max_retries: u32,
    ) -> (BatchTransport<HttpEndpoint>, Arc<ConcurrencyController>) {
        let endpoint = Arc::new(HttpEndpoint::new(&config.endpoint).unwrap());
        let encoder = Arc::new(BatchEncoder::new(
            &config.endpoint,
            &config.prompt,
            "Review each session note.",
        ));
        let concurrency = Arc::new(ConcurrencyController::new(8, 1, 16));
        let backoff = BackoffPolicy {
            base: 2,
            unit_ms: 1,
            jitter_ms: 0,
            max_retries,
        };

        let transport = BatchTransport::new(
            endpoint,
            encoder,
            ResponseClassifier::new(&config.endpoint, config.prompt.results_key.clone()),
            backoff,
            concurrency.clone(),
        );
        (transport, concurrency)
    }

    fn batch(ids: &[&str]) -> Batch {
        Batch {
            number: 1,
            items: ids
                .iter()
                .enumerate()
                .map(|(i, id)| WorkItem::new(*id, RecordFactory::note(i), i))
                .collect(),
        }
    }

    // ==================== Successful Calls ====================

    /// A clean response reconciles every id and reports usage
    #[tokio::test]
    async fn test_successful_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(EchoReviews::new())
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let (transport, concurrency) = transport(&config, 3);

        let outcome = transport
            .send(&batch(&["aaaaa", "bbbbb", "ccccc"]), &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.valid_results.len(), 3);
        assert_eq!(outcome.usage.cache_read_input_tokens, 2048);
        assert_eq!(concurrency.current(), 8);
    }

    /// Judgments wrapped in markdown fences are still parsed
    #[tokio::test]
    async fn test_fenced_judgments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(EchoReviews::fenced())
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let (transport, _) = transport(&config, 3);

        let outcome = transport
            .send(&batch(&["aaaaa", "bbbbb"]), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.received_ids, vec!["aaaaa", "bbbbb"]);
    }

    /// The request carries the rendered records and cacheable instructions
    #[tokio::test]
    async fn test_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("--- Row ID: aaaaa ---"))
            .and(body_string_contains("Student Name: Student 0"))
            .and(body_string_contains("\"cache_control\":{\"type\":\"ephemeral\"}"))
            .and(header("content-type", "application/json"))
            .respond_with(EchoReviews::new())
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let (transport, _) = transport(&config, 0);

        transport
            .send(&batch(&["aaaaa"]), &CancellationToken::new())
            .await
            .unwrap();
    }

    /// Vendor credentials are only sent when configured
    #[tokio::test]
    async fn test_api_key_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-api-key", "sk-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(EchoReviews::new())
            .expect(1)
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri());
        config.endpoint.api_key = Some("sk-test".to_string());
        config.endpoint.api_version = Some("2023-06-01".to_string());
        let (transport, _) = transport(&config, 0);

        transport
            .send(&batch(&["aaaaa"]), &CancellationToken::new())
            .await
            .unwrap();
    }

    // ==================== Retries ====================

    /// Persistent rate limiting spends the budget and surfaces RATE_LIMIT
    #[tokio::test]
    async fn test_rate_limit_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .expect(3)
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let (transport, concurrency) = transport(&config, 2);

        let err = transport
            .send(&batch(&["aaaaa"]), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(err.status(), Some(429));
        assert!(err.to_string().starts_with("RATE_LIMIT:"));
        // One shrink per scheduled retry
        assert_eq!(concurrency.current(), 2);
    }

    /// A server error followed by success recovers inside the transport
    #[tokio::test]
    async fn test_server_error_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(EchoReviews::new())
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let (transport, concurrency) = transport(&config, 2);

        let outcome = transport
            .send(&batch(&["aaaaa", "bbbbb"]), &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(concurrency.current(), 4);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    /// Client-class errors are not retried
    #[tokio::test]
    async fn test_invalid_request_fails_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "type": "error",
                "error": {"type": "invalid_request_error", "message": "prompt is too long"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let (transport, concurrency) = transport(&config, 5);

        let err = transport
            .send(&batch(&["aaaaa"]), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.to_string(), "INVALID_REQUEST: prompt is too long");
        assert_eq!(concurrency.current(), 8);
    }

    /// An unmapped 4xx is a non-retryable HTTP_ERROR
    #[tokio::test]
    async fn test_unmapped_client_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(418).set_body_string("teapot"))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let (transport, _) = transport(&config, 5);

        let err = transport
            .send(&batch(&["aaaaa"]), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HttpError);
        assert!(!err.is_retryable());
    }

    // ==================== Envelope Errors ====================

    /// A body without the results array is a structure error, not retried
    #[tokio::test]
    async fn test_structure_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(messages_body(r#"{"items": []}"#)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let (transport, _) = transport(&config, 5);

        let err = transport
            .send(&batch(&["aaaaa"]), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructureError);
    }

    /// Unparsable judgment text is retried as a parse error
    #[tokio::test]
    async fn test_parse_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(messages_body("Sorry, I cannot help.")),
            )
            .expect(2)
            .mount(&server)
            .await;

        let config = test_config(&server.uri());
        let (transport, _) = transport(&config, 1);

        let err = transport
            .send(&batch(&["aaaaa"]), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }

    /// Nothing listening on the port is a retryable network error
    #[tokio::test]
    async fn test_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let uri = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let config = test_config(&uri);
        let (transport, _) = transport(&config, 1);

        let err = transport
            .send(&batch(&["aaaaa"]), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkError);
    }
}
