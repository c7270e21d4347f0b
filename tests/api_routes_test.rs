use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use m3u_organizer::{
    backup::BackupService,
    config::Config,
    database::Database,
    ingest::PlaylistFetcher,
    web::{create_router, AppState},
};

const SAMPLE_M3U: &str = "#EXTM3U\r\n\
    #EXTINF:-1 tvg-id=\"a1\" group-title=\"News\",Channel A\r\n\
    http://example.com/a\r\n\
    #EXTINF:-1 group-title=\"Sports\",Channel B\r\n\
    http://example.com/b\r\n\
    #EXTINF:-1,Channel C\r\n\
    http://example.com/c\r\n";

async fn test_app(tag: &str) -> Router {
    let base = std::env::temp_dir().join(format!(
        "m3u-organizer-api-test-{}-{}",
        tag,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&base);
    std::fs::create_dir_all(&base).unwrap();

    let mut config = Config::default();
    config.database.url = format!("sqlite://{}", base.join("test.db").display());
    config.database.max_connections = Some(1);
    config.storage.backup_path = base.join("backups");

    let database = Database::new(&config.database).await.unwrap();
    database.migrate().await.unwrap();

    let backup = BackupService::new(&config);
    let fetcher = PlaylistFetcher::new(config.import.fetch_timeout_secs);

    create_router(AppState {
        database,
        config,
        fetcher,
        backup,
    })
}

// Helper function to send requests to the app
async fn send_request(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request_builder = Request::builder().method(method).uri(uri);

    let request = if let Some(body) = body {
        request_builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    } else {
        request_builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(json!({}))
    };

    (status, json)
}

// Same as send_request but keeps the body as raw text (for M3U exports)
async fn send_request_text(
    app: &Router,
    uri: &str,
) -> (StatusCode, Vec<(String, String)>, String) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
        .collect();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, headers, String::from_utf8(body_bytes.to_vec()).unwrap())
}

async fn import_sample(app: &Router, name: &str) -> i64 {
    let (status, body) = send_request(
        app,
        Method::POST,
        "/api/playlist",
        Some(json!({ "name": name, "content": SAMPLE_M3U })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["id"].as_i64().unwrap()
}

fn exported_names(m3u: &str) -> Vec<String> {
    m3u.lines()
        .filter(|l| l.starts_with("#EXTINF:"))
        .map(|l| l.rsplit(',').next().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app("health").await;
    let (status, body) = send_request(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_import_and_get_playlist() {
    let app = test_app("import").await;
    let id = import_sample(&app, "My List").await;

    let (status, list) = send_request(&app, Method::GET, "/api/playlist", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["name"], "My List");
    assert_eq!(list[0]["channelCount"], 3);

    let (status, playlist) =
        send_request(&app, Method::GET, &format!("/api/playlist/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let channels = playlist["channels"].as_array().unwrap();
    assert_eq!(channels.len(), 3);
    // order is dense, zero-based, matching source order
    for (index, channel) in channels.iter().enumerate() {
        assert_eq!(channel["order"], index as i64);
    }
    assert_eq!(channels[0]["name"], "Channel A");
    assert_eq!(channels[0]["tvgId"], "a1");
    assert_eq!(channels[2]["groupTitle"], "");
}

#[tokio::test]
async fn test_import_without_content_is_rejected() {
    let app = test_app("import-empty").await;
    let (status, body) = send_request(
        &app,
        Method::POST,
        "/api/playlist",
        Some(json!({ "name": "empty" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("no content"));
}

#[tokio::test]
async fn test_get_missing_playlist_returns_404() {
    let app = test_app("missing").await;
    let (status, _) = send_request(&app, Method::GET, "/api/playlist/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send_request_text(&app, "/api/export/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_export_applies_group_order() {
    let app = test_app("group-order").await;
    let id = import_sample(&app, "ordered").await;

    let (status, _) = send_request(
        &app,
        Method::PUT,
        &format!("/api/playlist/{}/group-order", id),
        Some(json!({ "groupOrder": ["Sports", "News"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, m3u) =
        send_request_text(&app, &format!("/api/export/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(m3u.starts_with("#EXTM3U\r\n"));
    // Sports first, then News; uncategorized Channel C is not in group-order
    // and sorts after all recognized groups
    assert_eq!(exported_names(&m3u), vec!["Channel B", "Channel A", "Channel C"]);

    let content_type = headers
        .iter()
        .find(|(k, _)| k == "content-type")
        .map(|(_, v)| v.clone())
        .unwrap();
    assert_eq!(content_type, "text/plain; charset=utf-8");
    assert!(headers
        .iter()
        .any(|(k, v)| k == "access-control-allow-origin" && v == "*"));
}

#[tokio::test]
async fn test_export_hidden_filtering_and_full_mode() {
    let app = test_app("hidden").await;
    let id = import_sample(&app, "hidden").await;

    let (status, playlist) = send_request(
        &app,
        Method::PUT,
        &format!("/api/playlist/{}/hidden-groups", id),
        Some(json!({ "hiddenGroups": ["Sports", "全部"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // the "all channels" pseudo-group can never be hidden
    assert_eq!(playlist["hiddenGroups"], "[\"Sports\"]");

    let (_, _, current) = send_request_text(&app, &format!("/api/export/{}", id)).await;
    assert_eq!(exported_names(&current), vec!["Channel A", "Channel C"]);

    let (_, _, full) = send_request_text(&app, &format!("/api/export/{}?full=1", id)).await;
    assert_eq!(
        exported_names(&full),
        vec!["Channel A", "Channel B", "Channel C"]
    );
}

#[tokio::test]
async fn test_export_hidden_channels() {
    let app = test_app("hidden-channels").await;
    let id = import_sample(&app, "hidden-channels").await;

    let (_, playlist) =
        send_request(&app, Method::GET, &format!("/api/playlist/{}", id), None).await;
    let first_id = playlist["channels"][0]["id"].as_i64().unwrap();

    let (status, _) = send_request(
        &app,
        Method::PUT,
        &format!("/api/playlist/{}/hidden-channels", id),
        Some(json!({ "hiddenChannels": [first_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, _, current) = send_request_text(&app, &format!("/api/export/{}", id)).await;
    assert_eq!(exported_names(&current), vec!["Channel B", "Channel C"]);
}

#[tokio::test]
async fn test_export_download_headers() {
    let app = test_app("download").await;
    let id = import_sample(&app, "dl").await;

    let (status, headers, _) =
        send_request_text(&app, &format!("/api/export/{}?download=1&full=1", id)).await;
    assert_eq!(status, StatusCode::OK);

    let content_type = headers
        .iter()
        .find(|(k, _)| k == "content-type")
        .map(|(_, v)| v.clone())
        .unwrap();
    assert_eq!(content_type, "application/vnd.apple.mpegurl");

    let disposition = headers
        .iter()
        .find(|(k, _)| k == "content-disposition")
        .map(|(_, v)| v.clone())
        .unwrap();
    assert!(disposition.starts_with("attachment; filename*=UTF-8''dl_"));
    // 完整版, percent-encoded
    assert!(disposition.contains("%E5%AE%8C%E6%95%B4%E7%89%88.m3u"));
}

#[tokio::test]
async fn test_channel_crud_and_group_order_append() {
    let app = test_app("channel-crud").await;
    let id = import_sample(&app, "crud").await;

    let (status, _) = send_request(
        &app,
        Method::PUT,
        &format!("/api/playlist/{}/group-order", id),
        Some(json!({ "groupOrder": ["News"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Adding a channel in a new group appends it to group-order
    let (status, channel) = send_request(
        &app,
        Method::POST,
        &format!("/api/playlist/{}/channel", id),
        Some(json!({ "name": "Kids 1", "url": "http://example.com/k", "groupTitle": "Kids" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(channel["order"], 3);
    let channel_id = channel["id"].as_i64().unwrap();

    let (_, playlist) =
        send_request(&app, Method::GET, &format!("/api/playlist/{}", id), None).await;
    assert_eq!(playlist["groupOrder"], "[\"News\",\"Kids\"]");

    // Edit keeps omitted fields
    let (status, updated) = send_request(
        &app,
        Method::PATCH,
        &format!("/api/channel/{}", channel_id),
        Some(json!({ "name": "Kids One" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Kids One");
    assert_eq!(updated["url"], "http://example.com/k");
    assert_eq!(updated["groupTitle"], "Kids");

    let (status, _) = send_request(
        &app,
        Method::DELETE,
        &format!("/api/channel/{}", channel_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_request(
        &app,
        Method::DELETE,
        &format!("/api/channel/{}", channel_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_move_and_delete() {
    let app = test_app("batch").await;
    let id = import_sample(&app, "batch").await;

    let (_, playlist) =
        send_request(&app, Method::GET, &format!("/api/playlist/{}", id), None).await;
    let ids: Vec<i64> = playlist["channels"]
        .as_array()
        .unwrap()
        .iter()
        .take(2)
        .map(|c| c["id"].as_i64().unwrap())
        .collect();

    let (status, _) = send_request(
        &app,
        Method::PATCH,
        "/api/channel/batch",
        Some(json!({ "action": "move", "ids": ids, "data": { "groupTitle": "Moved" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, playlist) =
        send_request(&app, Method::GET, &format!("/api/playlist/{}", id), None).await;
    assert_eq!(playlist["channels"][0]["groupTitle"], "Moved");
    assert_eq!(playlist["channels"][1]["groupTitle"], "Moved");

    let (status, _) = send_request(
        &app,
        Method::PATCH,
        "/api/channel/batch",
        Some(json!({ "action": "delete", "ids": ids })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, playlist) =
        send_request(&app, Method::GET, &format!("/api/playlist/{}", id), None).await;
    assert_eq!(playlist["channels"].as_array().unwrap().len(), 1);

    // move without a target group is a validation error
    let (status, _) = send_request(
        &app,
        Method::PATCH,
        "/api/channel/batch",
        Some(json!({ "action": "move", "ids": [1] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sort_channels_rewrites_order() {
    let app = test_app("sort").await;
    let id = import_sample(&app, "sort").await;

    let (_, playlist) =
        send_request(&app, Method::GET, &format!("/api/playlist/{}", id), None).await;
    let mut ids: Vec<i64> = playlist["channels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    ids.reverse();

    let (status, _) = send_request(
        &app,
        Method::PUT,
        &format!("/api/playlist/{}/sort", id),
        Some(json!({ "channelIds": ids })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, playlist) =
        send_request(&app, Method::GET, &format!("/api/playlist/{}", id), None).await;
    let names: Vec<&str> = playlist["channels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Channel C", "Channel B", "Channel A"]);
}

#[tokio::test]
async fn test_group_rename_and_delete() {
    let app = test_app("group-ops").await;
    let id = import_sample(&app, "groups").await;

    let (status, _) = send_request(
        &app,
        Method::PUT,
        &format!("/api/playlist/{}/group-order", id),
        Some(json!({ "groupOrder": ["News", "Sports"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_request(
        &app,
        Method::POST,
        &format!("/api/playlist/{}/group/rename", id),
        Some(json!({ "from": "Sports", "to": "体育" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, playlist) =
        send_request(&app, Method::GET, &format!("/api/playlist/{}", id), None).await;
    assert_eq!(playlist["groupOrder"], "[\"News\",\"体育\"]");
    assert_eq!(playlist["channels"][1]["groupTitle"], "体育");

    let (status, _) = send_request(
        &app,
        Method::POST,
        &format!("/api/playlist/{}/group/delete", id),
        Some(json!({ "name": "体育" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, playlist) =
        send_request(&app, Method::GET, &format!("/api/playlist/{}", id), None).await;
    assert_eq!(playlist["groupOrder"], "[\"News\"]");
    // channels from the deleted group become uncategorized
    assert_eq!(playlist["channels"][1]["groupTitle"], "");
}

#[tokio::test]
async fn test_reimport_replaces_channels_and_resets_group_order() {
    let app = test_app("reimport").await;
    let id = import_sample(&app, "reimport").await;

    let (status, _) = send_request(
        &app,
        Method::PUT,
        &format!("/api/playlist/{}/group-order", id),
        Some(json!({ "groupOrder": ["Sports"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let replacement = "#EXTM3U\n#EXTINF:-1 group-title=\"Movies\",Channel Z\nhttp://example.com/z\n";
    let (status, _) = send_request(
        &app,
        Method::PUT,
        &format!("/api/playlist/{}", id),
        Some(json!({ "content": replacement })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, playlist) =
        send_request(&app, Method::GET, &format!("/api/playlist/{}", id), None).await;
    assert_eq!(playlist["groupOrder"], Value::Null);
    let channels = playlist["channels"].as_array().unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0]["name"], "Channel Z");
    assert_eq!(channels[0]["order"], 0);
}

#[tokio::test]
async fn test_playlist_rename_and_delete() {
    let app = test_app("rename-delete").await;
    let id = import_sample(&app, "old name").await;

    let (status, renamed) = send_request(
        &app,
        Method::PATCH,
        &format!("/api/playlist/{}", id),
        Some(json!({ "name": "new name" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "new name");

    let (status, _) = send_request(
        &app,
        Method::PATCH,
        &format!("/api/playlist/{}", id),
        Some(json!({ "name": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_request(
        &app,
        Method::DELETE,
        &format!("/api/playlist/{}", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) =
        send_request(&app, Method::GET, &format!("/api/playlist/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_backup_lifecycle() {
    let app = test_app("backup").await;
    import_sample(&app, "backed up").await;

    let (status, created) = send_request(&app, Method::POST, "/api/backup", None).await;
    assert_eq!(status, StatusCode::OK);
    let name = created["name"].as_str().unwrap().to_string();
    assert!(name.starts_with("backup-"));

    let (status, list) = send_request(&app, Method::GET, "/api/backup", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = send_request(
        &app,
        Method::POST,
        &format!("/api/backup/{}/restore", name),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_request(
        &app,
        Method::DELETE,
        &format!("/api/backup/{}", name),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_request(&app, Method::GET, "/api/backup", None).await;
    assert_eq!(status, StatusCode::OK);
}
