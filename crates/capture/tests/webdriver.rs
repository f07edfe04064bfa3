//! WebDriver wire protocol against a mock driver

use chatprobe_capture::surface::{ElementHandle, Segment, SurfaceError};
use chatprobe_capture::webdriver::{BrowserOptions, WebDriverSession, ELEMENT_KEY};
use chatprobe_capture::Locator;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn driver_with_session() -> (MockServer, WebDriverSession) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": { "sessionId": "s-1", "capabilities": { "browserName": "chrome" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = WebDriverSession::start(&server.uri(), &BrowserOptions::default())
        .await
        .unwrap();
    (server, session)
}

fn w3c_error(status: u16, error: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "value": { "error": error, "message": format!("{error} (mock)"), "stacktrace": "" }
    }))
}

#[tokio::test]
async fn start_reads_session_id() {
    let (_server, session) = driver_with_session().await;
    assert_eq!(session.session_id(), "s-1");
}

#[tokio::test]
async fn find_elements_returns_handles_in_document_order() {
    let (server, session) = driver_with_session().await;
    Mock::given(method("POST"))
        .and(path("/session/s-1/elements"))
        .and(body_partial_json(json!({ "using": "css selector", "value": "div.prose" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [ { ELEMENT_KEY: "e-1" }, { ELEMENT_KEY: "e-2" } ]
        })))
        .mount(&server)
        .await;

    let handles = session
        .find_elements(&Locator::Css("div.prose".into()))
        .await
        .unwrap();
    let ids: Vec<&str> = handles.iter().map(ElementHandle::id).collect();
    assert_eq!(ids, vec!["e-1", "e-2"]);
}

#[tokio::test]
async fn stale_element_maps_to_stale_handle() {
    let (server, session) = driver_with_session().await;
    Mock::given(method("POST"))
        .and(path("/session/s-1/execute/sync"))
        .respond_with(w3c_error(404, "stale element reference"))
        .mount(&server)
        .await;

    let err = session
        .read_segments(&ElementHandle::new("e-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, SurfaceError::StaleHandle));
}

#[tokio::test]
async fn missing_element_maps_to_not_found() {
    let (server, session) = driver_with_session().await;
    Mock::given(method("POST"))
        .and(path("/session/s-1/element"))
        .respond_with(w3c_error(404, "no such element"))
        .mount(&server)
        .await;

    let err = session
        .find_element(&Locator::Xpath("//textarea".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, SurfaceError::NotFound(_)));
}

#[tokio::test]
async fn other_driver_errors_keep_their_code() {
    let (server, session) = driver_with_session().await;
    Mock::given(method("POST"))
        .and(path("/session/s-1/element/e-1/click"))
        .respond_with(w3c_error(400, "element click intercepted"))
        .mount(&server)
        .await;

    let err = session.click(&ElementHandle::new("e-1")).await.unwrap_err();
    match err {
        SurfaceError::Driver { code, .. } => assert_eq!(code, "element click intercepted"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn read_segments_passes_element_reference_to_script() {
    let (server, session) = driver_with_session().await;
    Mock::given(method("POST"))
        .and(path("/session/s-1/execute/sync"))
        .and(body_partial_json(json!({ "args": [ { ELEMENT_KEY: "e-7" } ] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [["p", "Line one"], ["br", ""], ["p", "Line two"]]
        })))
        .mount(&server)
        .await;

    let segments = session
        .read_segments(&ElementHandle::new("e-7"))
        .await
        .unwrap();
    assert_eq!(
        segments,
        vec![
            Segment::paragraph("Line one"),
            Segment::line_break(),
            Segment::paragraph("Line two"),
        ]
    );
}

#[tokio::test]
async fn quit_deletes_the_session() {
    let (server, session) = driver_with_session().await;
    Mock::given(method("DELETE"))
        .and(path("/session/s-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .expect(1)
        .mount(&server)
        .await;

    session.quit().await.unwrap();
}
