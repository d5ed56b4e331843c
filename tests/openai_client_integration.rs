use assert_matches::assert_matches;
use futures::StreamExt;
use handbook_chat::{
    ApiError, ChatMessage, ChatRequest, LlmProvider, OpenAiClient, SearchQuery, VectorStoreStatus,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "sk-test";

async fn setup() -> (MockServer, OpenAiClient) {
    let server = MockServer::start().await;
    let client = OpenAiClient::new(&format!("{}/v1", server.uri()), API_KEY.to_string(), Duration::from_secs(5))
        .expect("client should build");
    (server, client)
}

#[tokio::test]
async fn test_upload_file_sends_multipart_with_purpose() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/v1/files"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_string_contains("assistants"))
        .and(body_string_contains("handbook.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file-abc123",
            "object": "file",
            "bytes": 8,
            "filename": "handbook.pdf",
            "purpose": "assistants"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("handbook.pdf");
    std::fs::write(&pdf, b"%PDF-1.4").unwrap();

    let file = client.upload_file(&pdf).await.unwrap();
    assert_eq!(file.id, "file-abc123");
    assert_eq!(file.filename, "handbook.pdf");
    assert_eq!(file.bytes, 8);
}

#[tokio::test]
async fn test_upload_missing_file_is_not_an_api_error() {
    let (_server, client) = setup().await;
    let err = client
        .upload_file(std::path::Path::new("does/not/exist.pdf"))
        .await
        .unwrap_err();
    assert!(err.downcast_ref::<ApiError>().is_none());
}

#[tokio::test]
async fn test_create_and_get_vector_store() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/v1/vector_stores"))
        .and(body_json(json!({ "name": "FreeBSD Handbook", "file_ids": ["file-1", "file-2"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "vs_1",
            "object": "vector_store",
            "name": "FreeBSD Handbook",
            "status": "in_progress",
            "file_counts": { "in_progress": 2, "completed": 0, "failed": 0, "cancelled": 0, "total": 2 }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/vector_stores/vs_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "vs_1",
            "object": "vector_store",
            "name": "FreeBSD Handbook",
            "status": "completed",
            "file_counts": { "in_progress": 0, "completed": 2, "failed": 0, "cancelled": 0, "total": 2 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client
        .create_vector_store("FreeBSD Handbook", &["file-1".to_string(), "file-2".to_string()])
        .await
        .unwrap();
    assert_eq!(created.status, VectorStoreStatus::InProgress);
    assert_eq!(created.file_counts.in_progress, 2);

    let fetched = client.get_vector_store(&created.id).await.unwrap();
    assert!(fetched.is_completed());
    assert_eq!(fetched.file_counts.completed, 2);
}

#[tokio::test]
async fn test_search_vector_store_maps_results() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/v1/vector_stores/vs_1/search"))
        .and(body_json(json!({ "query": "What is FreeBSD?", "max_num_results": 10 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "vector_store.search_results.page",
            "search_query": "What is FreeBSD?",
            "data": [
                {
                    "file_id": "file-1",
                    "filename": "handbook.pdf",
                    "score": 0.9,
                    "attributes": {},
                    "content": [{ "type": "text", "text": "FreeBSD is an operating system." }]
                },
                {
                    "file_id": "file-2",
                    "filename": "ports.pdf",
                    "score": 0.5,
                    "attributes": {},
                    "content": [{ "type": "text", "text": "The Ports Collection." }]
                }
            ],
            "has_more": false,
            "next_page": null
        })))
        .mount(&server)
        .await;

    let query = SearchQuery { text: "What is FreeBSD?".to_string(), max_results: 10 };
    let chunks = client.search_vector_store("vs_1", &query).await.unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].filename, "handbook.pdf");
    assert_eq!(chunks[0].text, "FreeBSD is an operating system.");
    assert_eq!(chunks[1].score, 0.5);
}

#[tokio::test]
async fn test_stream_chat_yields_deltas() {
    let (server, client) = setup().await;
    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"FreeBSD \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"is an OS.\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_json(json!({
            "model": "gpt-test",
            "messages": [
                { "role": "system", "content": "Be brief." },
                { "role": "user", "content": "What is FreeBSD?" }
            ],
            "stream": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
        .mount(&server)
        .await;

    let request = ChatRequest {
        model: "gpt-test".to_string(),
        messages: vec![ChatMessage::system("Be brief."), ChatMessage::user("What is FreeBSD?")],
    };
    let deltas: Vec<String> = client
        .stream_chat(&request)
        .await
        .unwrap()
        .map(|d| d.unwrap())
        .collect()
        .await;

    assert_eq!(deltas, vec!["FreeBSD ".to_string(), "is an OS.".to_string()]);
}

#[tokio::test]
async fn test_unauthorized_maps_to_api_error() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/v1/vector_stores/vs_1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided", "type": "invalid_request_error", "code": "invalid_api_key" }
        })))
        .mount(&server)
        .await;

    let err = client.get_vector_store("vs_1").await.unwrap_err();
    let api_error = err.downcast_ref::<ApiError>().expect("should be an ApiError");
    assert_matches!(api_error, ApiError::Unauthorized { .. });
    assert_eq!(api_error.report(), "UnauthorizedError: Incorrect API key provided");
}

#[tokio::test]
async fn test_unexpected_body_is_format_error() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/v1/vector_stores"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy page</html>"))
        .mount(&server)
        .await;

    let err = client.create_vector_store("Docs", &[]).await.unwrap_err();
    assert_matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Format(_)));
}

#[tokio::test]
async fn test_connection_failure_is_not_an_api_error() {
    // Bind to get a free port, then release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let base_url = format!("http://{addr}/v1");

    let client = OpenAiClient::new(&base_url, API_KEY.to_string(), Duration::from_secs(2)).unwrap();
    let err = client.get_vector_store("vs_1").await.unwrap_err();
    assert!(err.downcast_ref::<ApiError>().is_none());
}
