// End-to-end tests for the analysis API.
//
// The router is driven with `tower::ServiceExt::oneshot` and the model
// provider is stubbed with WireMock, so every test exercises the real
// pipeline from HTTP request to HTTP response.

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::catalog::CatalogClient;
    use crate::config::Config;
    use crate::llm_client::LlmClient;
    use crate::routes::build_router;
    use crate::state::AppState;

    const RESUME: &str = "5 years Python backend experience";
    const JOB: &str = "Senior Python Engineer";

    /// Builds the real router with both clients pointed at the mock provider.
    fn test_app(provider: &MockServer, llm_timeout: Duration) -> axum::Router {
        let config = Config {
            openrouter_api_key: "test-key".to_string(),
            openrouter_base_url: provider.uri(),
            default_model: "configured/default-model".to_string(),
            llm_timeout_secs: llm_timeout.as_secs().max(1),
            max_upload_bytes: 1024 * 1024,
            port: 0,
            rust_log: "warn".to_string(),
        };
        let state = AppState {
            catalog: CatalogClient::new(provider.uri(), config.openrouter_api_key.clone()),
            llm: LlmClient::new(provider.uri(), config.openrouter_api_key.clone(), llm_timeout),
            config,
        };
        build_router(state)
    }

    /// A chat-completion response whose assistant content is `content`.
    fn completion_body(model: &str, content: &str) -> Value {
        json!({
            "id": "gen-test",
            "model": model,
            "choices": [
                {"message": {"role": "assistant", "content": content}}
            ]
        })
    }

    /// A well-formed analysis payload with the given overall relevancy.
    fn report_payload(overall: i64) -> String {
        json!({
            "relevancy_score": {"overall": overall, "skills": 90, "experience": 78, "education": 60},
            "reliability_score": 75,
            "learning_potential": 88,
            "suspicious": "No",
            "red_flags": [],
            "key_achievements": {
                "directly_relevant": ["Led migration to Kubernetes"],
                "transferable": ["Mentored four junior engineers"]
            }
        })
        .to_string()
    }

    fn analyze_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_analyze_happy_path_returns_parsed_report() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"model": "test/model"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body("test/model", &report_payload(82))),
            )
            .expect(1)
            .mount(&provider)
            .await;

        let app = test_app(&provider, Duration::from_secs(5));
        let response = app
            .oneshot(analyze_request(json!({
                "resume_text": RESUME,
                "job_posting": JOB,
                "model_id": "test/model"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["relevancy_score"]["overall"], 82);
        assert_eq!(body["relevancy_score"]["skills"], 90);
        assert_eq!(body["model_used"], "test/model");
        assert_eq!(body["suspicious"], "No");
        assert!(body["raw_model_text"].as_str().unwrap().contains("82"));
    }

    #[tokio::test]
    async fn test_analyze_parses_payload_wrapped_in_prose_and_fences() {
        let provider = MockServer::start().await;
        let noisy = format!(
            "Sure! Here is the analysis:\n```json\n{}\n```\nHope this helps.",
            report_payload(64)
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion_body("test/model", &noisy)),
            )
            .mount(&provider)
            .await;

        let app = test_app(&provider, Duration::from_secs(5));
        let response = app
            .oneshot(analyze_request(json!({
                "resume_text": RESUME,
                "job_posting": JOB,
                "model_id": "test/model"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["relevancy_score"]["overall"], 64);
    }

    #[tokio::test]
    async fn test_rate_limited_surfaces_immediately_without_retry() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1) // no retry on 429
            .mount(&provider)
            .await;

        let app = test_app(&provider, Duration::from_secs(5));
        let response = app
            .oneshot(analyze_request(json!({
                "resume_text": RESUME,
                "job_posting": JOB,
                "model_id": "test/model"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = json_body(response).await;
        assert_eq!(body["detail"]["suggest_model_change"], true);
    }

    #[tokio::test]
    async fn test_transient_5xx_is_retried_once_then_succeeds() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&provider)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body("test/model", &report_payload(70))),
            )
            .expect(1)
            .mount(&provider)
            .await;

        let app = test_app(&provider, Duration::from_secs(5));
        let response = app
            .oneshot(analyze_request(json!({
                "resume_text": RESUME,
                "job_posting": JOB,
                "model_id": "test/model"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["relevancy_score"]["overall"], 70);
    }

    #[tokio::test]
    async fn test_persistent_5xx_gives_up_after_single_retry() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2) // the initial attempt plus exactly one retry
            .mount(&provider)
            .await;

        let app = test_app(&provider, Duration::from_secs(5));
        let response = app
            .oneshot(analyze_request(json!({
                "resume_text": RESUME,
                "job_posting": JOB,
                "model_id": "test/model"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        // Infrastructure failure, not a model-quality failure.
        assert_eq!(body["detail"]["suggest_model_change"], false);
    }

    #[tokio::test]
    async fn test_missing_job_posting_fails_fast_without_upstream_call() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&provider)
            .await;

        let app = test_app(&provider, Duration::from_secs(5));
        let response = app
            .oneshot(analyze_request(json!({
                "resume_text": RESUME,
                "job_posting": "   "
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["detail"]["suggest_model_change"], false);
        assert_eq!(body["detail"]["message"], "job_posting cannot be empty");
    }

    #[tokio::test]
    async fn test_invocation_timeout_suggests_model_change() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body("test/model", &report_payload(50)))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&provider)
            .await;

        let app = test_app(&provider, Duration::from_secs(1));
        let response = app
            .oneshot(analyze_request(json!({
                "resume_text": RESUME,
                "job_posting": JOB,
                "model_id": "test/model"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = json_body(response).await;
        assert_eq!(body["detail"]["suggest_model_change"], true);
    }

    #[tokio::test]
    async fn test_unparseable_model_reply_suggests_model_change() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                "test/model",
                "I am sorry, I cannot produce JSON today.",
            )))
            .mount(&provider)
            .await;

        let app = test_app(&provider, Duration::from_secs(5));
        let response = app
            .oneshot(analyze_request(json!({
                "resume_text": RESUME,
                "job_posting": JOB,
                "model_id": "test/model"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["detail"]["suggest_model_change"], true);
        assert_eq!(body["detail"]["message"], "LLM did not return valid JSON");
    }

    #[tokio::test]
    async fn test_default_model_resolves_to_first_free_catalog_entry() {
        let provider = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"id": "paid/model", "pricing": {"prompt": "0.00001"}},
                    {"id": "meta-llama/llama-3.3-70b-instruct:free"}
                ]
            })))
            .mount(&provider)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(
                json!({"model": "meta-llama/llama-3.3-70b-instruct:free"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                "meta-llama/llama-3.3-70b-instruct:free",
                &report_payload(77),
            )))
            .expect(1)
            .mount(&provider)
            .await;

        let app = test_app(&provider, Duration::from_secs(5));
        let response = app
            .oneshot(analyze_request(json!({
                "resume_text": RESUME,
                "job_posting": JOB
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["model_used"], "meta-llama/llama-3.3-70b-instruct:free");
    }

    #[tokio::test]
    async fn test_unreachable_catalog_degrades_to_configured_default() {
        let provider = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&provider)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"model": "configured/default-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                "configured/default-model",
                &report_payload(55),
            )))
            .expect(1)
            .mount(&provider)
            .await;

        let app = test_app(&provider, Duration::from_secs(5));
        let response = app
            .oneshot(analyze_request(json!({
                "resume_text": RESUME,
                "job_posting": JOB
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["model_used"], "configured/default-model");
    }

    #[tokio::test]
    async fn test_list_models_returns_catalog_with_free_flags() {
        let provider = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {
                        "id": "anthropic/claude-3.5-sonnet",
                        "name": "Claude 3.5 Sonnet",
                        "context_length": 200000,
                        "pricing": {"prompt": "0.000003", "completion": "0.000015"}
                    },
                    {"id": "qwen/qwen-2.5-72b-instruct:free", "name": "Qwen 2.5 72B (free)"}
                ]
            })))
            .mount(&provider)
            .await;

        let app = test_app(&provider, Duration::from_secs(5));
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/models")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let models = body.as_array().unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0]["is_free"], false);
        assert_eq!(models[1]["is_free"], true);
        assert_eq!(models[0]["context_length"], 200000);
    }

    #[tokio::test]
    async fn test_list_models_maps_catalog_failure_to_bad_gateway() {
        let provider = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&provider)
            .await;

        let app = test_app(&provider, Duration::from_secs(5));
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/models")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["detail"]["suggest_model_change"], false);
    }

    #[tokio::test]
    async fn test_health_endpoint_is_alive() {
        let provider = MockServer::start().await;
        let app = test_app(&provider, Duration::from_secs(5));
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
    }

    // ── multipart upload path ───────────────────────────────────────────────

    /// Minimal DOCX container holding the given paragraphs.
    fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::FileOptions::default();
            writer.start_file("word/document.xml", options).unwrap();
            let body: String = paragraphs
                .iter()
                .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
                .collect();
            writer
                .write_all(
                    format!(
                        "<?xml version=\"1.0\"?><w:document><w:body>{body}</w:body></w:document>"
                    )
                    .as_bytes(),
                )
                .unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn multipart_request(
        filename: &str,
        file_bytes: &[u8],
        job_posting: &str,
        model_id: Option<&str>,
    ) -> Request<Body> {
        const BOUNDARY: &str = "----resumatch-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file_bytes);
        body.extend_from_slice(
            format!(
                "\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; \
                 name=\"job_posting\"\r\n\r\n{job_posting}"
            )
            .as_bytes(),
        );
        if let Some(model_id) = model_id {
            body.extend_from_slice(
                format!(
                    "\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; \
                     name=\"model_id\"\r\n\r\n{model_id}"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/analyze/file")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_analyze_file_extracts_docx_and_runs_pipeline() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body("test/model", &report_payload(82))),
            )
            .expect(1)
            .mount(&provider)
            .await;

        let docx = docx_bytes(&["Jane Doe", RESUME]);
        let app = test_app(&provider, Duration::from_secs(5));
        let response = app
            .oneshot(multipart_request("resume.docx", &docx, JOB, Some("test/model")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["relevancy_score"]["overall"], 82);
        assert_eq!(body["model_used"], "test/model");
    }

    #[tokio::test]
    async fn test_analyze_file_rejects_unsupported_format() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&provider)
            .await;

        let app = test_app(&provider, Duration::from_secs(5));
        let response = app
            .oneshot(multipart_request(
                "resume.txt",
                b"plain text resume",
                JOB,
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let body = json_body(response).await;
        assert_eq!(body["detail"]["suggest_model_change"], false);
    }

    #[tokio::test]
    async fn test_analyze_file_without_resume_field_is_rejected() {
        let provider = MockServer::start().await;
        let app = test_app(&provider, Duration::from_secs(5));

        const BOUNDARY: &str = "----resumatch-test-boundary";
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; \
             name=\"job_posting\"\r\n\r\n{JOB}\r\n--{BOUNDARY}--\r\n"
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/analyze/file")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["detail"]["message"], "multipart field 'resume' is required");
    }
}
