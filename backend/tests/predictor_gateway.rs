use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tryon_backend::config::PredictorConfig;
use tryon_backend::predictor::{GradioPredictor, PredictionError, PredictionRequest, Predictor};
use tryon_backend::storage::{ImageReference, UploadedImage};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMPLETE_STREAM: &str = "event: generating\ndata: null\n\n\
event: complete\ndata: [{\"path\": \"/tmp/gradio/out.png\", \"url\": \"https://example/out.png\"}, {\"url\": \"https://example/mask.png\"}]\n\n";

fn config_for(base_url: Option<String>) -> PredictorConfig {
    PredictorConfig {
        base_url,
        ..PredictorConfig::default()
    }
}

fn inline(name: &str, bytes: &[u8]) -> ImageReference {
    ImageReference::Inline(UploadedImage::new(bytes.to_vec(), Some("image/png"), name))
}

async fn mount_app(server: &MockServer, prefix: &str, stream: &str) {
    Mock::given(method("GET"))
        .and(path("/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "api_prefix": prefix })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/call/tryon", prefix)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "event_id": "evt-1" })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/call/tryon/evt-1", prefix)))
        .respond_with(ResponseTemplate::new(200).set_body_raw(stream.to_string(), "text/event-stream"))
        .expect(1)
        .mount(server)
        .await;
}

async fn call_body(server: &MockServer, call_path: &str) -> Value {
    let requests = server.received_requests().await.unwrap();
    let call = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == call_path)
        .expect("call request was sent");
    call.body_json().unwrap()
}

#[actix_web::test]
async fn resolves_space_uploads_inline_images_and_returns_first_url() {
    let hub = MockServer::start().await;
    let app = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/spaces/yisol/IDM-VTON/host"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "subdomain": "yisol-idm-vton",
            "host": app.uri(),
        })))
        .expect(1)
        .mount(&hub)
        .await;
    Mock::given(method("POST"))
        .and(path("/gradio_api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["/tmp/gradio/upload.png"])))
        .expect(2)
        .mount(&app)
        .await;
    mount_app(&app, "/gradio_api", COMPLETE_STREAM).await;

    let predictor = GradioPredictor::new(config_for(None)).unwrap().with_hub_url(hub.uri());
    let person = inline("me.png", b"person");
    let garment = inline("shirt.png", b"garment");

    let result = predictor
        .predict(PredictionRequest::new(&person, &garment))
        .await
        .unwrap();

    assert_eq!(result.result_image_url, "https://example/out.png");

    let body = call_body(&app, "/gradio_api/call/tryon").await;
    let file = json!({
        "path": "/tmp/gradio/upload.png",
        "mime_type": "image/png",
        "meta": { "_type": "gradio.FileData" },
    });
    let mut person_file = file.clone();
    person_file["orig_name"] = json!("me.png");
    let mut garment_file = file;
    garment_file["orig_name"] = json!("shirt.png");

    assert_eq!(
        body["data"],
        json!([
            { "background": person_file, "layers": [], "composite": null },
            garment_file,
            "Processing image",
            true,
            true,
            30,
            42
        ])
    );
    assert_eq!(body["session_hash"].as_str().unwrap().len(), 11);
}

#[actix_web::test]
async fn temp_files_are_read_back_and_token_is_sent() {
    let app = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();
    let person_path = scratch.path().join("person.png");
    let garment_path = scratch.path().join("garment.png");
    std::fs::write(&person_path, b"person").unwrap();
    std::fs::write(&garment_path, b"garment").unwrap();

    Mock::given(method("GET"))
        .and(path("/config"))
        .and(header("authorization", "Bearer hf_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&app)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["/tmp/gradio/file.png"])))
        .expect(2)
        .mount(&app)
        .await;
    mount_app(&app, "", COMPLETE_STREAM).await;

    let predictor = GradioPredictor::new(PredictorConfig {
        hf_token: Some("hf_test".into()),
        ..config_for(Some(app.uri()))
    })
    .unwrap();
    let person = ImageReference::TempFile {
        path: person_path,
        file_name: "me.png".into(),
        content_type: "image/png".into(),
    };
    let garment = ImageReference::TempFile {
        path: garment_path,
        file_name: "shirt.png".into(),
        content_type: "image/png".into(),
    };

    let result = predictor
        .predict(PredictionRequest::new(&person, &garment))
        .await
        .unwrap();
    assert_eq!(result.result_image_url, "https://example/out.png");

    let uploads: Vec<_> = app
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/upload")
        .collect();
    assert!(String::from_utf8_lossy(&uploads[0].body).contains("person"));
    assert!(String::from_utf8_lossy(&uploads[1].body).contains("garment"));
}

#[actix_web::test]
async fn signed_urls_are_passed_by_reference() {
    let app = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&app)
        .await;
    mount_app(&app, "", COMPLETE_STREAM).await;

    let signed = |url: &str, name: &str| ImageReference::SignedUrl {
        url: url.to_string(),
        key: format!("uploads/req/{}", name),
        file_name: name.to_string(),
        expires_at: Utc::now(),
    };
    let person = signed("https://storage.example/ai-try-on/me.png?sig=1", "me.png");
    let garment = signed("https://storage.example/ai-try-on/shirt.png?sig=2", "shirt.png");

    let predictor = GradioPredictor::new(config_for(Some(app.uri()))).unwrap();
    predictor
        .predict(PredictionRequest::new(&person, &garment))
        .await
        .unwrap();

    let body = call_body(&app, "/call/tryon").await;
    assert_eq!(
        body["data"][0]["background"]["url"],
        "https://storage.example/ai-try-on/me.png?sig=1"
    );
    assert_eq!(body["data"][1]["path"], "https://storage.example/ai-try-on/shirt.png?sig=2");
}

#[actix_web::test]
async fn error_event_is_a_remote_failure() {
    let app = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["/tmp/gradio/file.png"])))
        .mount(&app)
        .await;
    mount_app(&app, "", "event: error\ndata: \"You have exceeded your GPU quota\"\n\n").await;

    let predictor = GradioPredictor::new(config_for(Some(app.uri()))).unwrap();
    let person = inline("me.png", b"person");
    let garment = inline("shirt.png", b"garment");

    let err = predictor
        .predict(PredictionRequest::new(&person, &garment))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "You have exceeded your GPU quota");
}

#[actix_web::test]
async fn http_errors_and_unreachable_hosts_are_reported() {
    let app = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&app)
        .await;

    let predictor = GradioPredictor::new(config_for(Some(app.uri()))).unwrap();
    let person = inline("me.png", b"person");
    let garment = inline("shirt.png", b"garment");

    let err = predictor
        .predict(PredictionRequest::new(&person, &garment))
        .await
        .unwrap_err();
    assert!(matches!(err, PredictionError::Remote(ref m) if m.starts_with("HTTP 503")));

    let offline = GradioPredictor::new(config_for(Some("http://127.0.0.1:1".into()))).unwrap();
    let err = offline
        .predict(PredictionRequest::new(&person, &garment))
        .await
        .unwrap_err();
    assert!(matches!(err, PredictionError::Connection(_)));
}
