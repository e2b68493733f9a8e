use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, StatusCode, header};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use rax_media_server::auth::PermissionLevel;
use rax_media_server::config::{RuntimeConfig, ServerConfig, StartupConfig, UserEntry};
use rax_media_server::protocol::router;
use rax_media_server::transfer::MimePolicy;
use rax_media_server::AppState;

const BOUNDARY: &str = "rax-test-boundary";

// Helper holding the temporary media root alive for the test's duration
struct TestApp {
    _dir: TempDir,
    root: PathBuf,
    app: Router,
}

fn test_config(root: &Path) -> ServerConfig {
    ServerConfig {
        startup: StartupConfig {
            bind_address: "127.0.0.1".into(),
            port: 3000,
            media_root: root.to_string_lossy().into_owned(),
            static_dir: None,
            stream_buffer_size: 16,
            session_ttl_secs: 3600,
            confine_symlinks: true,
            mime_policy: MimePolicy::PerExtension,
            enable_rename: true,
            login_max_attempts: 5,
            login_window_secs: 300,
            users: vec![
                UserEntry {
                    username: "admin".into(),
                    password: "admin123".into(),
                    level: PermissionLevel::Editor,
                },
                UserEntry {
                    username: "guest".into(),
                    password: "guest123".into(),
                    level: PermissionLevel::Viewer,
                },
            ],
        },
        runtime: RuntimeConfig {
            max_file_size_mb: 1,
            max_upload_files: 3,
        },
    }
}

// Helper to setup test environment
fn setup_with(adjust: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("media");
    fs::create_dir_all(root.join("albums")).unwrap();
    let sample: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    fs::write(root.join("clip.mp4"), &sample).unwrap();
    fs::write(root.join("albums/photo.jpg"), b"jpeg bytes").unwrap();
    fs::write(dir.path().join("secret.txt"), b"outside the root").unwrap();

    let mut config = test_config(&root);
    adjust(&mut config);
    let state = Arc::new(AppState::from_config(config).unwrap());
    TestApp {
        root: state.resolver.root().to_path_buf(),
        _dir: dir,
        app: router(state),
    }
}

fn setup() -> TestApp {
    setup_with(|_| {})
}

fn sample_bytes() -> Vec<u8> {
    (0..1000u32).map(|i| (i % 251) as u8).collect()
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn ranged(uri: &str, cookie: &str, range: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::RANGE, range)
        .body(Body::empty())
        .unwrap()
}

async fn try_login(app: &Router, username: &str, password: &str) -> Response<Body> {
    send(
        app,
        json_request(
            "POST",
            "/api/login",
            None,
            json!({ "username": username, "password": password }),
        ),
    )
    .await
}

/// Log in and return the `name=value` pair to send back as `Cookie`
async fn login(app: &Router, username: &str, password: &str) -> String {
    let response = try_login(app, username, password).await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn header_value<'a>(response: &'a Response<Body>, name: header::HeaderName) -> &'a str {
    response.headers().get(name).unwrap().to_str().unwrap()
}

// (field name, optional file name, content)
fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    name, file_name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(cookie: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let t = setup();
    let response = try_login(&t.app, "admin", "admin123").await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = header_value(&response, header::SET_COOKIE).to_string();
    assert!(set_cookie.starts_with("media_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));
    assert!(set_cookie.contains("Path=/"));

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["username"], "admin");
    assert_eq!(body["level"], "editor");
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let t = setup();
    let response = try_login(&t.app, "admin", "wrong").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_repeated_failures_are_rate_limited() {
    let t = setup();
    for _ in 0..5 {
        let response = try_login(&t.app, "admin", "wrong").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    // locked out even with the right password
    let response = try_login(&t.app, "admin", "admin123").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // other usernames are unaffected
    let response = try_login(&t.app, "guest", "guest123").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_routes_require_session() {
    let t = setup();
    for uri in ["/api/list", "/media?path=clip.mp4", "/api/session"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = send(&t.app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }

    let response = send(&t.app, get("/api/list", "media_session=bogus")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_and_logout() {
    let t = setup();
    let cookie = login(&t.app, "guest", "guest123").await;

    let response = send(&t.app, get("/api/session", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["username"], "guest");
    assert_eq!(body["level"], "viewer");

    let response = send(&t.app, json_request("POST", "/api/logout", Some(&cookie), json!({}))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&t.app, get("/api/session", &cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_root_and_round_trip_paths() {
    let t = setup();
    let cookie = login(&t.app, "guest", "guest123").await;

    let response = send(&t.app, get("/api/list", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["name"], "albums");
    assert_eq!(files[0]["isDirectory"], true);
    assert_eq!(files[0]["path"], "/albums/");
    assert_eq!(files[1]["path"], "/clip.mp4");

    let response = send(&t.app, get("/api/list?path=/albums/", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["files"][0]["path"], "/albums/photo.jpg");
}

#[tokio::test]
async fn test_list_rejects_escape() {
    let t = setup();
    let cookie = login(&t.app, "guest", "guest123").await;
    let response = send(&t.app, get("/api/list?path=albums/../..", &cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_media_full_file() {
    let t = setup();
    let cookie = login(&t.app, "guest", "guest123").await;

    let response = send(&t.app, get("/media?path=clip.mp4", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_LENGTH), "1000");
    assert_eq!(header_value(&response, header::CONTENT_TYPE), "video/mp4");
    assert_eq!(header_value(&response, header::ACCEPT_RANGES), "bytes");
    assert_eq!(body_bytes(response).await, sample_bytes());
}

#[tokio::test]
async fn test_media_byte_range() {
    let t = setup();
    let cookie = login(&t.app, "guest", "guest123").await;

    let response = send(
        &t.app,
        ranged("/media?path=/clip.mp4", &cookie, "bytes=200-299"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        header_value(&response, header::CONTENT_RANGE),
        "bytes 200-299/1000"
    );
    assert_eq!(header_value(&response, header::CONTENT_LENGTH), "100");
    assert_eq!(body_bytes(response).await, sample_bytes()[200..300].to_vec());
}

#[tokio::test]
async fn test_media_open_ended_range() {
    let t = setup();
    let cookie = login(&t.app, "guest", "guest123").await;

    let response = send(&t.app, ranged("/media?path=clip.mp4", &cookie, "bytes=900-")).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        header_value(&response, header::CONTENT_RANGE),
        "bytes 900-999/1000"
    );
    assert_eq!(header_value(&response, header::CONTENT_LENGTH), "100");
    assert_eq!(body_bytes(response).await, sample_bytes()[900..].to_vec());
}

#[tokio::test]
async fn test_media_unsatisfiable_range() {
    let t = setup();
    let cookie = login(&t.app, "guest", "guest123").await;

    let response = send(
        &t.app,
        ranged("/media?path=clip.mp4", &cookie, "bytes=2000-3000"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(
        header_value(&response, header::CONTENT_RANGE),
        "bytes */1000"
    );
}

#[tokio::test]
async fn test_media_missing_file_hides_paths() {
    let t = setup();
    let cookie = login(&t.app, "guest", "guest123").await;

    let response = send(&t.app, get("/media?path=nope.mp4", &cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert_eq!(body, "Not found");
    assert!(!body.contains(&*t.root.to_string_lossy()));
}

#[tokio::test]
async fn test_media_traversal_is_forbidden() {
    let t = setup();
    let cookie = login(&t.app, "guest", "guest123").await;

    for uri in [
        "/media?path=albums/../../secret.txt",
        "/media?path=albums%2F..%2F..%2Fsecret.txt",
        "/media?path=albums%5C..%5C..%5Csecret.txt",
    ] {
        let response = send(&t.app, get(uri, &cookie)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
        let body = String::from_utf8(body_bytes(response).await).unwrap();
        assert_eq!(body, "Forbidden");
    }

    // leading parents are stripped, so this stays inside the root
    let response = send(&t.app, get("/media?path=../../secret.txt", &cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_media_requires_path() {
    let t = setup();
    let cookie = login(&t.app, "guest", "guest123").await;

    for uri in ["/media", "/media?path="] {
        let response = send(&t.app, get(uri, &cookie)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_upload_stores_media_and_skips_others() {
    let t = setup();
    let cookie = login(&t.app, "admin", "admin123").await;

    let body = multipart_body(&[
        ("path", None, b"/trips/2024"),
        ("mediaFiles", Some("beach.png"), b"png bytes"),
        ("mediaFiles", Some("notes.txt"), b"not media"),
    ]);
    let response = send(&t.app, upload_request(&cookie, body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    let uploaded = body["uploaded"].as_array().unwrap();
    assert_eq!(uploaded.len(), 1);
    assert_eq!(uploaded[0]["name"], "beach.png");
    assert_eq!(uploaded[0]["path"], "/trips/2024/beach.png");

    let target = t.root.join("trips/2024");
    assert_eq!(fs::read(target.join("beach.png")).unwrap(), b"png bytes");
    assert!(!target.join("notes.txt").exists());
    let leftovers: Vec<_> = fs::read_dir(&target)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .filter(|n| n.to_string_lossy().starts_with('.'))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_upload_defaults_to_root() {
    let t = setup();
    let cookie = login(&t.app, "admin", "admin123").await;

    let body = multipart_body(&[("mediaFiles", Some("new.webm"), b"webm")]);
    let response = send(&t.app, upload_request(&cookie, body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(t.root.join("new.webm").exists());
}

#[tokio::test]
async fn test_upload_rejections() {
    let t = setup();
    let cookie = login(&t.app, "admin", "admin123").await;

    // nothing acceptable
    let body = multipart_body(&[("mediaFiles", Some("notes.txt"), b"text")]);
    let response = send(&t.app, upload_request(&cookie, body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // target directory outside the root
    let body = multipart_body(&[
        ("path", None, b"albums/../../elsewhere"),
        ("mediaFiles", Some("a.jpg"), b"jpg"),
    ]);
    let response = send(&t.app, upload_request(&cookie, body)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // too many files
    let body = multipart_body(&[
        ("mediaFiles", Some("1.jpg"), b"1"),
        ("mediaFiles", Some("2.jpg"), b"2"),
        ("mediaFiles", Some("3.jpg"), b"3"),
        ("mediaFiles", Some("4.jpg"), b"4"),
    ]);
    let response = send(&t.app, upload_request(&cookie, body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_too_large_leaves_nothing_behind() {
    let t = setup();
    let cookie = login(&t.app, "admin", "admin123").await;

    let big = vec![7u8; 1024 * 1024 + 1];
    let body = multipart_body(&[("mediaFiles", Some("huge.mp4"), &big)]);
    let response = send(&t.app, upload_request(&cookie, body)).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let names: Vec<String> = fs::read_dir(&t.root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(!names.iter().any(|n| n.contains("huge.mp4")));
}

#[tokio::test]
async fn test_viewer_cannot_mutate() {
    let t = setup();
    let cookie = login(&t.app, "guest", "guest123").await;

    let body = multipart_body(&[("mediaFiles", Some("a.jpg"), b"jpg")]);
    let response = send(&t.app, upload_request(&cookie, body)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &t.app,
        json_request("DELETE", "/api/delete", Some(&cookie), json!({ "path": "/clip.mp4" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(t.root.join("clip.mp4").exists());

    let response = send(
        &t.app,
        json_request("POST", "/api/mkdir", Some(&cookie), json!({ "name": "x" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(!t.root.join("x").exists());
}

#[tokio::test]
async fn test_delete_entries() {
    let t = setup();
    let cookie = login(&t.app, "admin", "admin123").await;

    let response = send(
        &t.app,
        json_request("DELETE", "/api/delete", Some(&cookie), json!({ "path": "/albums/" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!t.root.join("albums").exists());

    let response = send(
        &t.app,
        json_request("DELETE", "/api/delete", Some(&cookie), json!({ "path": "/albums/" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &t.app,
        json_request("DELETE", "/api/delete", Some(&cookie), json!({ "path": "/" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(t.root.exists());

    let response = send(
        &t.app,
        json_request("DELETE", "/api/delete", Some(&cookie), json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mkdir() {
    let t = setup();
    let cookie = login(&t.app, "admin", "admin123").await;

    let response = send(
        &t.app,
        json_request(
            "POST",
            "/api/mkdir",
            Some(&cookie),
            json!({ "path": "/albums/", "name": "summer" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(t.root.join("albums/summer").is_dir());

    for body in [json!({ "path": "/" }), json!({ "name": "../escape" })] {
        let response = send(
            &t.app,
            json_request("POST", "/api/mkdir", Some(&cookie), body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_rename() {
    let t = setup();
    let cookie = login(&t.app, "admin", "admin123").await;

    let response = send(
        &t.app,
        json_request(
            "POST",
            "/api/rename",
            Some(&cookie),
            json!({ "path": "/albums/photo.jpg", "newName": "cover.jpg" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(t.root.join("albums/cover.jpg").exists());
    assert!(!t.root.join("albums/photo.jpg").exists());

    fs::write(t.root.join("taken.mp4"), b"x").unwrap();
    let response = send(
        &t.app,
        json_request(
            "POST",
            "/api/rename",
            Some(&cookie),
            json!({ "path": "/clip.mp4", "newName": "taken.mp4" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(
        &t.app,
        json_request(
            "POST",
            "/api/rename",
            Some(&cookie),
            json!({ "path": "/clip.mp4", "newName": "../clip.mp4" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(t.root.join("clip.mp4").exists());
}

#[tokio::test]
async fn test_rename_disabled() {
    let t = setup_with(|config| config.startup.enable_rename = false);
    let cookie = login(&t.app, "admin", "admin123").await;

    let response = send(
        &t.app,
        json_request(
            "POST",
            "/api/rename",
            Some(&cookie),
            json!({ "path": "/clip.mp4", "newName": "other.mp4" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(t.root.join("clip.mp4").exists());
}
