use drivelist_core::{
    DriveClient, DriveError, EntryKind, ErrorKind, FOLDER_MIME_TYPE, FolderCount, ListingQuery,
    ListingScope, SearchScope,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> DriveClient {
    DriveClient::with_base_url(&server.uri(), Some("test-key".into())).unwrap()
}

#[tokio::test]
async fn fetch_page_sends_browse_query_and_maps_entries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", "trashed = false and 'root-1' in parents"))
        .and(query_param("key", "test-key"))
        .and(query_param("pageSize", "100"))
        .and(query_param("orderBy", "folder,modifiedTime desc"))
        .and(query_param_is_missing("corpora"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nextPageToken": "cursor-2",
            "files": [
                {
                    "id": "d1",
                    "name": "Cases",
                    "mimeType": FOLDER_MIME_TYPE,
                    "modifiedTime": "2024-05-02T00:00:00Z",
                    "webViewLink": "https://drive.example/d1"
                },
                {
                    "id": "f1",
                    "name": "scan.pdf",
                    "mimeType": "application/pdf",
                    "size": "512",
                    "modifiedTime": "2024-05-01T00:00:00Z"
                }
            ]
        })))
        .mount(&server)
        .await;

    let page = client(&server)
        .fetch_page(&ListingQuery::browse("root-1"), 100, None)
        .await
        .unwrap();

    assert_eq!(page.next_cursor.as_deref(), Some("cursor-2"));
    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.entries[0].kind, EntryKind::Folder);
    assert_eq!(page.entries[1].size_bytes(), Some(512));
}

#[tokio::test]
async fn page_size_hint_is_clamped_to_remote_ceiling() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("pageSize", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)
        .fetch_page(&ListingQuery::browse("root-1"), 5000, None)
        .await
        .unwrap();

    assert!(page.entries.is_empty());
    assert_eq!(page.next_cursor, None);
}

#[tokio::test]
async fn cursor_is_round_tripped_verbatim() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("pageToken", "opaque/+token=="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{ "id": "f9", "name": "late.txt", "mimeType": "text/plain",
                        "modifiedTime": "2024-01-01T00:00:00Z" }]
        })))
        .mount(&server)
        .await;

    let page = client(&server)
        .fetch_page(
            &ListingQuery::browse("root-1"),
            10,
            Some("opaque/+token=="),
        )
        .await
        .unwrap();

    assert_eq!(page.entries[0].id, "f9");
}

#[tokio::test]
async fn global_search_requests_all_drives_without_parent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", "trashed = false and name contains 'scan'"))
        .and(query_param("corpora", "allDrives"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let scope = ListingScope::for_filter("root-1", Some("scan"), SearchScope::Global);
    client(&server)
        .fetch_page(&ListingQuery::new(scope), 50, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn missing_credential_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = DriveClient::with_base_url(&server.uri(), Some("  ".into())).unwrap();
    let err = client
        .fetch_page(&ListingQuery::browse("root-1"), 10, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::NoCredential));
}

#[tokio::test]
async fn error_responses_are_classified() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("pageToken", "stale"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "Invalid Value",
                "errors": [{ "reason": "invalid", "location": "pageToken" }]
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", "trashed = false and 'missing' in parents"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": 404, "message": "File not found: missing." }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", "trashed = false and 'private' in parents"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": 403,
                "message": "The user does not have sufficient permissions",
                "errors": [{ "reason": "insufficientFilePermissions" }]
            }
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let stale = client
        .fetch_page(&ListingQuery::browse("root-1"), 10, Some("stale"))
        .await
        .unwrap_err();
    assert_eq!(stale.kind(), ErrorKind::InvalidCursor);

    let missing = client
        .fetch_page(&ListingQuery::browse("missing"), 10, None)
        .await
        .unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    let private = client
        .fetch_page(&ListingQuery::browse("private"), 10, None)
        .await
        .unwrap_err();
    assert_eq!(private.kind(), ErrorKind::AccessDenied);
}

#[tokio::test]
async fn child_folder_count_queries_folders_only() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param(
            "q",
            format!("trashed = false and 'd1' in parents and mimeType = '{FOLDER_MIME_TYPE}'"),
        ))
        .and(query_param("pageSize", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                { "id": "c1", "name": "2023", "mimeType": FOLDER_MIME_TYPE,
                  "modifiedTime": "2024-01-01T00:00:00Z" },
                { "id": "c2", "name": "2024", "mimeType": FOLDER_MIME_TYPE,
                  "modifiedTime": "2024-01-02T00:00:00Z" }
            ]
        })))
        .mount(&server)
        .await;

    assert_eq!(
        client(&server).fetch_child_folder_count("d1").await,
        FolderCount::Counted(2)
    );
}

#[tokio::test]
async fn child_folder_count_absorbs_failures() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
        .mount(&server)
        .await;

    assert_eq!(
        client(&server).fetch_child_folder_count("d1").await,
        FolderCount::Unknown
    );
}

#[tokio::test]
async fn unrenderable_time_bound_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let offset = time::UtcOffset::from_hms(0, 0, 30).unwrap();
    let bound = time::OffsetDateTime::UNIX_EPOCH.to_offset(offset);
    let query = ListingQuery::browse("root-1").modified_since(Some(bound));
    let err = client(&server)
        .fetch_page(&query, 10, None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Malformed);
}
