//! End-to-end tests for email-pdf.
//!
//! The in-memory suite runs everywhere: email store, object store and a stub
//! renderer all live in-process. Two suites need real infrastructure and are
//! gated by environment variables:
//!
//! * `E2E_ENABLED=1` renders through the real `wkhtmltopdf` engine.
//! * `E2E_DATABASE_URL=postgres://...` exercises the PostgreSQL store.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use async_trait::async_trait;
use email_pdf::pdf_ops::testing::sample_pdf;
use email_pdf::pdf_ops::{checksum, count_pages};
use email_pdf::store::StoreError;
use email_pdf::{
    ApiRequest, EmailPdfError, EmailPdfService, EmailRecord, EmailStore, ErrorBody,
    HtmlRenderer, MemoryEmailStore, PdfUploader, ProcessRenderer, RenderOptions, UploadResult,
};
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::ObjectStoreExt;
use std::sync::{Arc, Mutex};

const BASE_URL: &str = "https://cdn.example.com";

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Records every HTML document it is asked to render.
#[derive(Default)]
struct RecordingRenderer {
    seen: Mutex<Vec<String>>,
}

impl RecordingRenderer {
    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl HtmlRenderer for RecordingRenderer {
    async fn render(&self, html: &str, _: &RenderOptions) -> Result<Vec<u8>, EmailPdfError> {
        self.seen.lock().unwrap().push(html.to_string());
        Ok(sample_pdf(1))
    }
}

/// Finds every id but reports a fixed number of updated records.
struct FixedCountStore(u64);

#[async_trait]
impl EmailStore for FixedCountStore {
    async fn find_email(&self, id: &str) -> Result<Option<EmailRecord>, StoreError> {
        Ok(Some(EmailRecord::new(id, "Hello [[BODY]]", "World")))
    }

    async fn update_pdf(&self, _: &str, _: &UploadResult) -> Result<u64, StoreError> {
        Ok(self.0)
    }
}

fn uploader() -> PdfUploader {
    PdfUploader::new(Arc::new(InMemory::new()), "public", BASE_URL)
}

fn seeded_service(renderer: Arc<dyn HtmlRenderer>) -> EmailPdfService {
    let store = MemoryEmailStore::with_records([EmailRecord::new(
        "abc123",
        "Hello [[BODY]]",
        "World",
    )]);
    EmailPdfService::new(
        Arc::new(store),
        renderer,
        uploader(),
        RenderOptions::default(),
    )
}

/// Storage path a public URL points at: strip the base URL and query.
fn path_of_url(url: &str) -> String {
    let rest = url
        .strip_prefix(BASE_URL)
        .and_then(|r| r.strip_prefix('/'))
        .expect("URL under base");
    rest.split_once('?').map(|(p, _)| p).unwrap_or(rest).to_string()
}

// ── In-memory pipeline ───────────────────────────────────────────────────────

#[tokio::test]
async fn email_is_rendered_uploaded_and_recorded() {
    let renderer = Arc::new(RecordingRenderer::default());
    let service = seeded_service(renderer.clone());

    let response = service.handle(&ApiRequest::with_id("abc123")).await;

    assert_eq!(response.status_code, 200, "body: {}", response.body);
    assert_eq!(response.headers["Content-Type"], "application/json");
    assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
    assert_eq!(renderer.seen(), vec!["Hello World".to_string()]);

    let email: EmailRecord = serde_json::from_str(&response.body).unwrap();
    assert_eq!(email.id, "abc123");
    let pdf = email.pdf.expect("pdf field populated");
    assert_eq!(pdf.model, "email");
    assert_eq!(pdf.id, "abc123");
    assert_eq!(pdf.filename, "email-abc123.pdf");
    assert_eq!(pdf.page_count, 1);
    assert_eq!(pdf.path, "public/compilations/abc123/email-abc123.pdf");
    assert!(pdf.url.ends_with(&format!("?{}", pdf.uploaded_at)));

    // The URL resolves to the stored object.
    let stored = service
        .uploader()
        .store()
        .get(&Path::from(path_of_url(&pdf.url).as_str()))
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(checksum(&stored), pdf.checksum);
    assert_eq!(stored.len() as u64, pdf.size);
    assert_eq!(count_pages(&stored).await.unwrap(), 1);
}

#[tokio::test]
async fn rendering_twice_replaces_the_recorded_pdf() {
    let service = seeded_service(Arc::new(RecordingRenderer::default()));

    let first = tokio_test::assert_ok!(service.render_email_pdf("abc123").await);
    let second = tokio_test::assert_ok!(service.render_email_pdf("abc123").await);

    let (first, second) = (first.pdf.unwrap(), second.pdf.unwrap());
    assert_eq!(first.path, second.path);
    assert!(second.uploaded_at >= first.uploaded_at);
}

#[tokio::test]
async fn missing_email_is_404_without_rendering() {
    let renderer = Arc::new(RecordingRenderer::default());
    let service = seeded_service(renderer.clone());

    let response = service.handle(&ApiRequest::with_id("missing")).await;

    assert_eq!(response.status_code, 404);
    let body: ErrorBody = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body.code, "email_not_found");
    assert!(renderer.seen().is_empty());
}

#[tokio::test]
async fn update_count_mismatch_is_409() {
    for count in [0, 2] {
        let service = EmailPdfService::new(
            Arc::new(FixedCountStore(count)),
            Arc::new(RecordingRenderer::default()),
            uploader(),
            RenderOptions::default(),
        );

        let response = service.handle(&ApiRequest::with_id("abc123")).await;

        assert_eq!(response.status_code, 409, "count {count}");
        let body: ErrorBody = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body.code, "update_count_mismatch");
    }
}

#[tokio::test]
async fn event_without_id_is_400() {
    let service = seeded_service(Arc::new(RecordingRenderer::default()));
    let request: ApiRequest = serde_json::from_str(r#"{"pathParameters":null}"#).unwrap();

    let response = service.handle(&request).await;
    assert_eq!(response.status_code, 400);
}

// ── HTTP trigger ─────────────────────────────────────────────────────────────

#[cfg(feature = "server")]
mod http {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn call(service: Arc<EmailPdfService>, method: &str, uri: &str) -> (StatusCode, String) {
        let response = email_pdf::server::router(service)
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn route_renders_email() {
        let service = Arc::new(seeded_service(Arc::new(RecordingRenderer::default())));

        for method in ["GET", "POST"] {
            let (status, body) = call(service.clone(), method, "/emails/abc123/pdf").await;
            assert_eq!(status, StatusCode::OK, "{method}: {body}");
            let email: EmailRecord = serde_json::from_str(&body).unwrap();
            assert!(email.pdf.is_some());
        }
    }

    #[tokio::test]
    async fn route_maps_not_found() {
        let service = Arc::new(seeded_service(Arc::new(RecordingRenderer::default())));
        let (status, body) = call(service, "GET", "/emails/missing/pdf").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("email_not_found"));
    }

    #[tokio::test]
    async fn health_is_ok() {
        let service = Arc::new(seeded_service(Arc::new(RecordingRenderer::default())));
        let (status, body) = call(service, "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("ok"));
    }
}

// ── Real engine (E2E_ENABLED) ────────────────────────────────────────────────

#[tokio::test]
async fn real_engine_renders_email() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
        return;
    }

    let service = seeded_service(Arc::new(ProcessRenderer::new()));
    let email = service.render_email_pdf("abc123").await.unwrap();
    let pdf = email.pdf.unwrap();

    assert!(pdf.page_count >= 1);
    assert!(pdf.size > 0);
    println!("Rendered {} pages → {}", pdf.page_count, pdf.url);
}

// ── PostgreSQL store (E2E_DATABASE_URL) ──────────────────────────────────────

#[cfg(feature = "postgres")]
#[tokio::test]
async fn postgres_store_round_trip() {
    use email_pdf::store::{PgConnect, PgEmailStore};

    let Ok(url) = std::env::var("E2E_DATABASE_URL") else {
        println!("SKIP — set E2E_DATABASE_URL to run PostgreSQL tests");
        return;
    };

    let config = email_pdf::ServiceConfig::builder()
        .database_url(&url)
        .run_migrations(true)
        .build()
        .unwrap();
    let store = PgEmailStore::new(PgConnect::from_config(&config).unwrap());
    let pool = store.connector().handle().await.unwrap();

    let id = format!("e2e-{}", std::process::id());
    sqlx::query("INSERT INTO emails (id, template, body) VALUES ($1, $2, $3)")
        .bind(&id)
        .bind("Hello [[BODY]]")
        .bind("World")
        .execute(&pool)
        .await
        .unwrap();

    let service = EmailPdfService::new(
        Arc::new(store),
        Arc::new(RecordingRenderer::default()),
        uploader(),
        RenderOptions::default(),
    );
    let email = service.render_email_pdf(&id).await;

    sqlx::query("DELETE FROM emails WHERE id = $1")
        .bind(&id)
        .execute(&pool)
        .await
        .unwrap();

    let pdf = email.unwrap().pdf.unwrap();
    assert_eq!(pdf.id, id);
    assert_eq!(pdf.page_count, 1);
}
