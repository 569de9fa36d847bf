use crate::integration::support::Mirror;
use coursemirror::catalog::{CatalogClient, FileRef, MoodleClient};
use coursemirror::config::RemoteConfig;
use coursemirror::error::ApiError;
use coursemirror::progress::NoopReporter;
use coursemirror::sync::{DownloadLayout, SyncEngine};
use serde_json::json;
use std::fs;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REST: &str = "/webservice/rest/server.php";

fn password_config(server: &MockServer) -> RemoteConfig {
    RemoteConfig {
        base_url: server.uri(),
        username: Some("student".to_string()),
        password: Some("hunter2".to_string()),
        ..RemoteConfig::default()
    }
}

fn token_config(server: &MockServer) -> RemoteConfig {
    RemoteConfig {
        base_url: server.uri(),
        token: Some("t0k".to_string()),
        ..RemoteConfig::default()
    }
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/login/token.php"))
        .and(query_param("username", "student"))
        .and(query_param("password", "hunter2"))
        .and(query_param("service", "moodle_mobile_app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "t0k" })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_function(server: &MockServer, function: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(REST))
        .and(query_param("wstoken", "t0k"))
        .and(query_param("wsfunction", function))
        .and(query_param("moodlewsrestformat", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_site_info(server: &MockServer) {
    mount_function(
        server,
        "core_webservice_get_site_info",
        json!({ "userid": 7, "sitename": "Test Campus" }),
    )
    .await;
}

async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(REST))
        .and(query_param("wsfunction", "core_enrol_get_users_courses"))
        .and(query_param("userid", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 10, "fullname": "Algorithms101", "shortname": "ALG" }
        ])))
        .mount(server)
        .await;

    let file_url = |name: &str| {
        format!(
            "{}/webservice/pluginfile.php/55/mod_resource/content/1/{}",
            server.uri(),
            name
        )
    };
    Mock::given(method("GET"))
        .and(path(REST))
        .and(query_param("wsfunction", "core_course_get_contents"))
        .and(query_param("courseid", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 1,
                "name": "Week 1",
                "section": 1,
                "modules": [
                    {
                        "id": 100,
                        "name": "Week1",
                        "modname": "resource",
                        "contents": [
                            { "type": "file", "filename": "slides.pdf", "fileurl": file_url("slides.pdf") },
                            { "type": "file", "filename": "notes.pdf", "fileurl": file_url("notes.pdf") },
                            { "type": "url", "filename": "link", "fileurl": "https://elsewhere.example" }
                        ]
                    },
                    { "id": 101, "name": "Announcements", "modname": "forum" }
                ]
            }
        ])))
        .mount(server)
        .await;

    for name in ["slides.pdf", "notes.pdf"] {
        Mock::given(method("GET"))
            .and(path(format!(
                "/webservice/pluginfile.php/55/mod_resource/content/1/{}",
                name
            )))
            .and(query_param("token", "t0k"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(format!("pdf bytes of {}", name)),
            )
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_connect_exchanges_credentials_for_token() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_site_info(&server).await;
    mount_catalog(&server).await;

    let client = MoodleClient::connect(&password_config(&server))
        .await
        .unwrap();

    // Course listing is scoped to the user id resolved from site info.
    assert_eq!(client.list_courses().await.unwrap().len(), 1);
    assert!(!format!("{:?}", client).contains("t0k"));
}

#[tokio::test]
async fn test_connect_rejects_invalid_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login/token.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "Invalid login, please try again",
            "errorcode": "invalidlogin"
        })))
        .mount(&server)
        .await;

    let err = MoodleClient::connect(&password_config(&server))
        .await
        .unwrap_err();

    match err {
        ApiError::Unauthorized(message) => assert!(message.contains("invalidlogin")),
        other => panic!("expected Unauthorized, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connect_rejects_revoked_token() {
    let server = MockServer::start().await;
    mount_function(
        &server,
        "core_webservice_get_site_info",
        json!({
            "exception": "moodle_exception",
            "errorcode": "invalidtoken",
            "message": "Invalid token - token not found"
        }),
    )
    .await;

    let err = MoodleClient::connect(&token_config(&server))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized(_)));
}

#[tokio::test]
async fn test_connect_validates_config_before_any_request() {
    let server = MockServer::start().await;
    let config = RemoteConfig {
        base_url: server.uri(),
        ..RemoteConfig::default()
    };

    let err = MoodleClient::connect(&config).await.unwrap_err();

    assert!(matches!(err, ApiError::ConfigError(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_lists_courses_and_file_contents() {
    let server = MockServer::start().await;
    mount_site_info(&server).await;
    mount_catalog(&server).await;

    let client = MoodleClient::connect(&token_config(&server)).await.unwrap();
    let courses = client.list_courses().await.unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].id, 10);
    assert_eq!(courses[0].name, "Algorithms101");
    assert_eq!(courses[0].short_name.as_deref(), Some("ALG"));

    let sections = client.list_contents(10).await.unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].name, "Week 1");
    let modules = &sections[0].modules;
    assert_eq!(modules.len(), 2);
    let names: Vec<_> = modules[0].files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["slides.pdf", "notes.pdf"]);
    assert_eq!(modules[0].files[0].parent_module_id, 100);
    assert_eq!(modules[1].kind, "forum");
    assert!(modules[1].files.is_empty());
}

#[tokio::test]
async fn test_remote_exception_is_a_catalog_error() {
    let server = MockServer::start().await;
    mount_site_info(&server).await;
    mount_function(
        &server,
        "core_course_get_contents",
        json!({
            "exception": "require_login_exception",
            "errorcode": "requireloginerror",
            "message": "Course or activity not accessible."
        }),
    )
    .await;

    let client = MoodleClient::connect(&token_config(&server)).await.unwrap();
    let err = client.list_contents(10).await.unwrap_err();

    match err {
        ApiError::CatalogError(message) => assert!(message.contains("requireloginerror")),
        other => panic!("expected CatalogError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_reports_http_failures() {
    let server = MockServer::start().await;
    mount_site_info(&server).await;
    Mock::given(method("GET"))
        .and(path("/webservice/pluginfile.php/1/gone.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = MoodleClient::connect(&token_config(&server)).await.unwrap();
    let file = FileRef {
        name: "gone.pdf".to_string(),
        url: format!("{}/webservice/pluginfile.php/1/gone.pdf", server.uri()),
        parent_module_id: 1,
    };
    let err = client.fetch_bytes(&file).await.unwrap_err();

    match err {
        ApiError::FetchFailed(message) => {
            assert!(message.contains("gone.pdf"));
            assert!(message.contains("404"));
            assert!(!message.contains("t0k"));
        }
        other => panic!("expected FetchFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_rejects_json_error_body() {
    let server = MockServer::start().await;
    mount_site_info(&server).await;
    Mock::given(method("GET"))
        .and(path("/webservice/pluginfile.php/1/locked.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "exception": "moodle_exception",
            "errorcode": "nopermissions",
            "message": "Sorry, but you do not currently have permissions to do that."
        })))
        .mount(&server)
        .await;

    let client = MoodleClient::connect(&token_config(&server)).await.unwrap();
    let file = FileRef {
        name: "locked.pdf".to_string(),
        url: format!("{}/webservice/pluginfile.php/1/locked.pdf", server.uri()),
        parent_module_id: 1,
    };

    assert!(matches!(
        client.fetch_bytes(&file).await,
        Err(ApiError::FetchFailed(_))
    ));
}

#[tokio::test]
async fn test_sync_against_moodle_writes_files() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_site_info(&server).await;
    mount_catalog(&server).await;

    let mirror = Mirror::new();
    let client = MoodleClient::connect(&password_config(&server))
        .await
        .unwrap();
    let report = SyncEngine::new(&client, &mirror.store, DownloadLayout::new(mirror.root()))
        .run(&mut NoopReporter)
        .await
        .unwrap();

    assert!(report.first_run);
    assert_eq!(report.downloaded.len(), 2);
    let names: Vec<_> = report.new_items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Week1", "Announcements"]);
    assert_eq!(
        fs::read_to_string(mirror.path("Algorithms101", "Week 1", "slides.pdf")).unwrap(),
        "pdf bytes of slides.pdf"
    );
    assert_eq!(mirror.saved_state().len(), 4);
}
