//! Integration tests for IssueClient using wiremock.

use ventus_auth::Session;
use ventus_services::{
    ApiClient, AttachmentUpload, CreateIssueRequest, FilterKey, IssueClient, IssueGateway,
    QueryIntent, RetryConfig, ServiceError, UpdateIssueRequest,
};
use wiremock::matchers::{
    body_json, body_string_contains, header, header_regex, method, path, query_param,
    query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn meta(id: i64, name: &str, order: i32) -> serde_json::Value {
    serde_json::json!({"id": id, "name": name, "color": "#ccc", "order": order})
}

/// Helper to create a test issue
fn test_issue(id: i64, title: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "description": null,
        "status": {"id": 1, "name": "New", "color": "#00f", "order": 1, "slug": "new", "is_closed": false},
        "issue_type": meta(1, "Bug", 1),
        "severity": meta(2, "Normal", 2),
        "priority": meta(3, "High", 3),
        "creator": {"id": 1, "username": "admin", "first_name": "Ada", "last_name": "Min", "avatar_url": null},
        "assignee": null,
        "created_at": "2026-01-30T12:00:00Z",
        "updated_at": "2026-01-30T12:00:00Z",
        "deadline": null,
        "watchers": []
    })
}

fn page_body(count: u64, items: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({"count": count, "next": null, "previous": null, "results": items})
}

fn client_for(server: &MockServer) -> IssueClient {
    let api = ApiClient::new(&format!("{}/api/v1", server.uri()), Session::from_api_key("secret-key"))
        .with_retry_config(RetryConfig::new(2, 1, 5));
    IssueClient::from_api(api)
}

#[tokio::test]
async fn test_fetch_page_sends_key_and_paging() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/issues/"))
        .and(header("Authorization", "ApiKey secret-key"))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "15"))
        .and(query_param_is_missing("q"))
        .and(query_param_is_missing("status"))
        .and(query_param_is_missing("assignee_id"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body(42, vec![test_issue(16, "Sixteen"), test_issue(17, "Seventeen")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut intent = QueryIntent::new(15);
    intent.page = 2;

    let page = client_for(&mock_server).fetch_page(&intent).await.unwrap();

    assert_eq!(page.total_count, 42);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, 16);
    assert_eq!(page.items[1].title, "Seventeen");
}

#[tokio::test]
async fn test_fetch_page_sends_search_and_filters() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/issues/"))
        .and(query_param("q", "crash"))
        .and(query_param("status", "4"))
        .and(query_param("creator_id", "7"))
        .and(query_param_is_missing("priority"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(0, vec![])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut intent = QueryIntent::new(15);
    intent.search_term = "crash".to_string();
    intent.filters.set(FilterKey::Status, Some(4));
    intent.filters.set(FilterKey::Creator, Some(7));

    let page = client_for(&mock_server).fetch_page(&intent).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 0);
}

#[tokio::test]
async fn test_fetch_page_retries_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/issues/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/issues/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1, vec![test_issue(1, "One")])))
        .mount(&mock_server)
        .await;

    let page = client_for(&mock_server)
        .fetch_page(&QueryIntent::new(15))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn test_persistent_server_error_is_categorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/issues/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .fetch_page(&QueryIntent::new(15))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Server { status: 500, .. }));
}

#[tokio::test]
async fn test_unauthorized_is_categorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/issues/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .fetch_page(&QueryIntent::new(15))
        .await
        .unwrap_err();
    assert!(err.is_auth_failure());
}

#[tokio::test]
async fn test_update_item_sends_only_changed_fields() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/v1/issues/5/"))
        .and(body_json(serde_json::json!({"title": "Renamed", "assignee_id": null})))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_issue(5, "Renamed")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let changes = UpdateIssueRequest {
        title: Some("Renamed".to_string()),
        assignee_id: Some(None),
        ..Default::default()
    };
    let issue = client_for(&mock_server).update_item(5, &changes).await.unwrap();
    assert_eq!(issue.title, "Renamed");
}

#[tokio::test]
async fn test_update_item_validation_error_has_fields() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/api/v1/issues/5/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "title": ["This field may not be blank."]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let changes = UpdateIssueRequest {
        title: Some(String::new()),
        ..Default::default()
    };
    let err = client_for(&mock_server).update_item(5, &changes).await.unwrap_err();

    match err {
        ServiceError::Validation { fields, .. } => {
            assert_eq!(fields["title"], vec!["This field may not be blank.".to_string()]);
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_item_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/issues/99/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"detail": "Not found."})))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server).get_item(99).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_create_and_delete_item() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/issues/"))
        .and(body_json(serde_json::json!({"title": "New bug", "priority_id": 3})))
        .respond_with(ResponseTemplate::new(201).set_body_json(test_issue(50, "New bug")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/issues/50/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let request = CreateIssueRequest {
        priority_id: Some(3),
        ..CreateIssueRequest::titled("New bug")
    };
    let created = client.create_item(&request).await.unwrap();
    assert_eq!(created.id, 50);

    client.delete_item(50).await.unwrap();
}

#[tokio::test]
async fn test_bulk_create_posts_array() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/issues/bulk_create/"))
        .and(body_json(serde_json::json!([{"title": "A"}, {"title": "B"}])))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!([test_issue(1, "A"), test_issue(2, "B")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let created = client_for(&mock_server)
        .bulk_create(&[CreateIssueRequest::titled("A"), CreateIssueRequest::titled("B")])
        .await
        .unwrap();
    assert_eq!(created.len(), 2);
}

#[tokio::test]
async fn test_fetch_options_loads_all_kinds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/settings/statuses/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": 1, "name": "New", "color": "#00f", "order": 1, "slug": "new", "is_closed": false}
        ])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/settings/priorities/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([meta(1, "Low", 1), meta(2, "High", 2)])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/settings/severities/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1, vec![meta(1, "Minor", 1)])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/settings/types/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let options = client_for(&mock_server).fetch_options().await.unwrap();
    assert_eq!(options.statuses.len(), 1);
    assert_eq!(options.priorities.len(), 2);
    assert_eq!(options.severities[0].name, "Minor");
    assert!(options.issue_types.is_empty());
}

#[tokio::test]
async fn test_comments_and_attachments() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/comments/"))
        .and(query_param("issue_id", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "id": 1, "issue": 5, "text": "First",
            "author": {"id": 1, "username": "admin"},
            "created_at": "2026-01-30T12:00:00Z", "updated_at": "2026-01-30T12:00:00Z"
        }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/comments/"))
        .and(body_json(serde_json::json!({"issue": 5, "text": "Second"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": 2, "issue": 5, "text": "Second",
            "author": {"id": 1, "username": "admin"},
            "created_at": "2026-01-30T12:05:00Z"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/attachments/"))
        .and(query_param("issue_id", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": 8, "issue": 5, "file_name": "log.txt", "file_url": "http://files/log.txt"}
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/attachments/8/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    assert_eq!(client.list_comments(5).await.unwrap().len(), 1);
    assert_eq!(client.add_comment(5, "Second").await.unwrap().id, 2);
    let attachments = client.list_attachments(5).await.unwrap();
    assert_eq!(attachments[0].file_name.as_deref(), Some("log.txt"));
    client.delete_attachment(8).await.unwrap();
}

#[tokio::test]
async fn test_upload_attachment_is_multipart() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/attachments/"))
        .and(header("Authorization", "ApiKey secret-key"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"issue\""))
        .and(body_string_contains("filename=\"crash.log\""))
        .and(body_string_contains("stack trace here"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": 12, "issue": 5, "file_name": "crash.log",
            "file_url": "http://files/crash.log",
            "uploaded_at": "2026-01-30T12:10:00Z"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let upload = AttachmentUpload::new("crash.log", b"stack trace here".to_vec())
        .with_mime_type("text/plain");
    let attachment = client_for(&mock_server)
        .upload_attachment(5, upload)
        .await
        .unwrap();
    assert_eq!(attachment.id, 12);
    assert_eq!(attachment.issue, 5);
}

#[tokio::test]
async fn test_rejected_upload_is_validation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/attachments/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"file": ["File too large."]})),
        )
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .upload_attachment(5, AttachmentUpload::new("huge.bin", vec![0; 64]))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, ServiceError::Validation { fields, .. } if fields.contains_key("file")),
        "{:?}",
        err
    );
}

#[tokio::test]
async fn test_no_key_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = IssueClient::new(&mock_server.uri(), Session::new());
    let err = client.fetch_page(&QueryIntent::new(15)).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotAuthenticated));
}
