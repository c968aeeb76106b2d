//! Error handling integration tests
//!
//! Every upstream failure class ends up as a per-item outcome; none of them
//! aborts a run.

#[cfg(test)]
mod tests {
    use crate::common::{RecordFactory, test_config};
    use llm_batch_dispatch::Dispatcher;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn run_against(status: u16, body: &str) -> llm_batch_dispatch::RunReport {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;

        let mut config = test_config(&server.uri());
        config.dispatch.max_retries = 0;
        let dispatcher = Dispatcher::from_config(config).await.unwrap();
        dispatcher
            .process_all(RecordFactory::notes(7), None)
            .await
            .unwrap()
    }

    // ==================== Status Classes ====================

    /// Each failure class is carried into the failed item's reason
    #[tokio::test]
    async fn test_failure_tags_reach_failed_items() {
        let cases = [
            (400, "INVALID_REQUEST:"),
            (403, "PERMISSION:"),
            (404, "NOT_FOUND:"),
            (413, "TOO_LARGE:"),
            (429, "RATE_LIMIT:"),
            (500, "SERVER_ERROR:"),
            (529, "OVERLOADED:"),
            (502, "HTTP_ERROR:"),
        ];

        for (status, tag) in cases {
            let report = run_against(status, "upstream said no").await;
            assert!(report.is_conserved(), "status {}", status);
            assert!(report.results.is_empty());
            assert_eq!(report.permanently_failed.len(), 7);
            assert!(
                report
                    .permanently_failed
                    .iter()
                    .all(|item| item.reason.starts_with(tag)),
                "status {} should be tagged {}",
                status,
                tag
            );
        }
    }

    /// A body that is not JSON at all is a parse failure
    #[tokio::test]
    async fn test_garbage_body() {
        let report = run_against(200, "<html>proxy error</html>").await;
        assert!(report.is_conserved());
        assert!(
            report
                .permanently_failed
                .iter()
                .all(|item| item.reason.starts_with("PARSE_ERROR:"))
        );
    }

    /// Envelope mismatches are structure failures
    #[tokio::test]
    async fn test_wrong_envelope() {
        let report = run_against(200, r#"{"choices": []}"#).await;
        assert!(
            report
                .permanently_failed
                .iter()
                .all(|item| item.reason.starts_with("STRUCTURE_ERROR:"))
        );
    }
}
