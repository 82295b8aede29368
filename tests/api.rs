//! End-to-end tests for the HTTP surface.
//!
//! Each test spawns the real router on a free port, backed by the
//! in-memory store and a stub chat model, and drives it with reqwest.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use docvault::auth::TokenKeys;
use docvault::chat::ChatModel;
use docvault::ingest::Ingestor;
use docvault::models::Document;
use docvault::server::{router, AppState};
use docvault::store::memory::InMemoryStore;
use docvault::store::DocumentStore;
use docvault::{VaultError, VaultResult};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::{Arc, Mutex};

const SECRET: &[u8] = b"integration-test-signing-secret";
const TTL_SECS: u64 = 3600;

// ─── Stub chat model ────────────────────────────────────────────────

#[derive(Default)]
struct StubChat {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ChatModel for StubChat {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, prompt: &str) -> VaultResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.contains("explode") {
            return Err(VaultError::Upstream("model unavailable".to_string()));
        }
        Ok("stub reply".to_string())
    }
}

// ─── Fixtures ───────────────────────────────────────────────────────

/// A one-page PDF showing `text` in Helvetica, with a correct xref table.
fn minimal_pdf(text: &str) -> Vec<u8> {
    let stream = format!("BT /F1 24 Tf 72 700 Td ({}) Tj ET", text);
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_at = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for off in offsets {
        xref.push_str(&format!("{:010} 00000 n \n", off));
    }
    pdf.extend_from_slice(xref.as_bytes());
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    pdf
}

fn minimal_docx(text: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        let xml = format!(
            "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
            text
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

struct TestServer {
    base: String,
    client: reqwest::Client,
    store: Arc<InMemoryStore>,
    chat: Arc<StubChat>,
    keys: Arc<TokenKeys>,
}

impl TestServer {
    async fn spawn(protect_content_update: bool) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let chat = Arc::new(StubChat::default());
        let keys = Arc::new(TokenKeys::new(SECRET, TTL_SECS));
        let state = AppState {
            users: store.clone(),
            documents: store.clone(),
            keys: keys.clone(),
            chat: chat.clone(),
            ingestor: Arc::new(Ingestor::new(true, None)),
            max_upload_bytes: 1024 * 1024,
            protect_content_update,
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
            store,
            chat,
            keys,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn register(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/register"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap()
    }

    async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap()
    }

    /// Registers and logs in, returning `(token, user_id)`.
    async fn account(&self, username: &str) -> (String, String) {
        assert_eq!(
            self.register(username, "pw-123456").await.status(),
            StatusCode::CREATED
        );
        let body: Value = self.login(username, "pw-123456").await.json().await.unwrap();
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn upload(&self, token: &str, filename: &str, mime: &str, bytes: Vec<u8>) -> reqwest::Response {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime)
            .unwrap();
        self.client
            .post(self.url("/upload"))
            .bearer_auth(token)
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .unwrap()
    }

    async fn search(&self, token: &str, params: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .get(self.url("/search"))
            .bearer_auth(token)
            .query(params)
            .send()
            .await
            .unwrap()
    }

    async fn search_ids(&self, token: &str, params: &[(&str, &str)]) -> Vec<String> {
        let resp = self.search(token, params).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let docs: Vec<Value> = resp.json().await.unwrap();
        docs.iter()
            .map(|d| d["id"].as_str().unwrap().to_string())
            .collect()
    }

    async fn seed(&self, owner_id: &str, filename: &str, content: &str, age_secs: i64) -> Document {
        let mut doc = Document::new(owner_id, filename, content);
        doc.uploaded_at = doc.uploaded_at - Duration::seconds(age_secs);
        self.store.create_document(&doc).await.unwrap();
        doc
    }
}

async fn error_code(resp: reqwest::Response) -> String {
    let body: Value = resp.json().await.unwrap();
    body["error"]["code"].as_str().unwrap_or_default().to_string()
}

// ─── Accounts ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_register_then_login_token_carries_user_id() {
    let server = TestServer::spawn(false).await;

    let resp = server.register("alice", "secret-pw").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "User registered successfully");

    let resp = server.login("alice", "secret-pw").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Authentication successful");
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["user"].get("passwordHash").is_none());

    let token = body["token"].as_str().unwrap();
    let claims = server.keys.verify(token, Utc::now()).unwrap();
    assert_eq!(claims.id, body["user"]["id"].as_str().unwrap());
}

#[tokio::test]
async fn test_bad_credentials_are_unauthorized_without_token() {
    let server = TestServer::spawn(false).await;
    server.register("bob", "right-pw").await;

    for (user, pw) in [("bob", "wrong-pw"), ("nobody", "right-pw")] {
        let resp = server.login(user, pw).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = resp.json().await.unwrap();
        assert!(body.get("token").is_none());
        assert_eq!(body["error"]["code"], "unauthorized");
    }
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let server = TestServer::spawn(false).await;
    assert_eq!(
        server.register("", "pw").await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        server.register("carol", "").await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        server.register("carol", "pw").await.status(),
        StatusCode::CREATED
    );
    let dup = server.register("carol", "other").await;
    assert_eq!(dup.status(), StatusCode::CONFLICT);
    assert_eq!(error_code(dup).await, "conflict");
}

// ─── Token gate ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_protected_routes_reject_bad_tokens() {
    let server = TestServer::spawn(true).await;
    let (token, user_id) = server.account("dave").await;
    let doc = server.seed(&user_id, "keep.pdf", "body", 0).await;

    let expired = server
        .keys
        .issue(&user_id, Utc::now() - Duration::seconds(TTL_SECS as i64 + 10))
        .unwrap();
    // Original signature over forged claims.
    let parts: Vec<&str> = token.split('.').collect();
    let forged = URL_SAFE_NO_PAD.encode(format!(
        r#"{{"id":"someone-else","iat":0,"exp":{}}}"#,
        i64::MAX
    ));
    let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);
    let foreign = TokenKeys::new(b"another-secret-of-enough-length".to_vec(), TTL_SECS)
        .issue(&user_id, Utc::now())
        .unwrap();
    let unknown_user = server.keys.issue("deleted-account", Utc::now()).unwrap();

    let cases: Vec<(Option<&str>, StatusCode, &str)> = vec![
        (None, StatusCode::UNAUTHORIZED, "unauthorized"),
        (Some(expired.as_str()), StatusCode::FORBIDDEN, "token_expired"),
        (Some(tampered.as_str()), StatusCode::FORBIDDEN, "invalid_token"),
        (Some(foreign.as_str()), StatusCode::FORBIDDEN, "invalid_token"),
        (Some(unknown_user.as_str()), StatusCode::FORBIDDEN, "invalid_token"),
    ];

    for (bearer, status, code) in cases {
        let requests = vec![
            server.client.get(server.url("/search")),
            server
                .client
                .post(server.url("/chat-with-pdf"))
                .json(&json!({ "question": "hi" })),
            server.client.delete(server.url(&format!("/delete/{}", doc.id))),
            server
                .client
                .put(server.url(&format!("/rename/{}", doc.id)))
                .json(&json!({ "newFilename": "x.pdf" })),
            server
                .client
                .put(server.url(&format!("/update/{}", doc.id)))
                .json(&json!({ "content": "overwritten" })),
            server
                .client
                .post(server.url("/upload"))
                .multipart(Form::new().part("file", Part::bytes(minimal_pdf("x")).file_name("n.pdf"))),
        ];
        for req in requests {
            let req = match bearer {
                Some(t) => req.bearer_auth(t),
                None => req,
            };
            let resp = req.send().await.unwrap();
            assert_eq!(resp.status(), status);
            assert_eq!(error_code(resp).await, code);
        }
    }

    let stored = server.store.find_document(&doc.id).await.unwrap().unwrap();
    assert_eq!(stored.filename, "keep.pdf");
    assert_eq!(stored.content, "body");
    assert_eq!(server.store.document_count(), 1);
    assert!(server.chat.prompts.lock().unwrap().is_empty());
}

// ─── Malformed requests ─────────────────────────────────────────────

#[tokio::test]
async fn test_malformed_bodies_use_json_error_contract() {
    let server = TestServer::spawn(false).await;
    let (token, user_id) = server.account("eve").await;
    let doc = server.seed(&user_id, "e.pdf", "body", 0).await;

    let wrong_type = server
        .client
        .post(server.url("/api/register"))
        .json(&json!({ "username": 5, "password": "pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_type.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(wrong_type).await, "bad_request");

    let no_content_type = server
        .client
        .post(server.url("/api/login"))
        .body(r#"{"username":"eve","password":"pw-123456"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(no_content_type.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(error_code(no_content_type).await, "unsupported_media_type");

    let bad_content = server
        .client
        .put(server.url(&format!("/update/{}", doc.id)))
        .json(&json!({ "content": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_content.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(bad_content).await, "bad_request");

    let not_json = server
        .client
        .post(server.url("/chat-with-pdf"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(not_json).await, "bad_request");

    let not_multipart = server
        .client
        .post(server.url("/upload"))
        .bearer_auth(&token)
        .json(&json!({ "file": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(not_multipart.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(not_multipart).await, "bad_request");

    let stored = server.store.find_document(&doc.id).await.unwrap().unwrap();
    assert_eq!(stored.content, "body");
}

#[tokio::test]
async fn test_content_update_body_limit_follows_upload_limit() {
    // The test server caps bodies at 1 MiB, below axum's 2 MB default.
    let server = TestServer::spawn(false).await;
    let (_, user_id) = server.account("fay").await;
    let doc = server.seed(&user_id, "big.pdf", "small", 0).await;
    let url = server.url(&format!("/update/{}", doc.id));

    let too_big = server
        .client
        .put(&url)
        .json(&json!({ "content": "x".repeat(1536 * 1024) }))
        .send()
        .await
        .unwrap();
    assert_eq!(too_big.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(error_code(too_big).await, "payload_too_large");

    let fits = server
        .client
        .put(&url)
        .json(&json!({ "content": "y".repeat(512 * 1024) }))
        .send()
        .await
        .unwrap();
    assert_eq!(fits.status(), StatusCode::OK);
    let stored = server.store.find_document(&doc.id).await.unwrap().unwrap();
    assert_eq!(stored.content.len(), 512 * 1024);
}

// ─── Upload ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_upload_pdf_creates_owned_document() {
    let server = TestServer::spawn(false).await;
    let (token, user_id) = server.account("erin").await;

    let resp = server
        .upload(&token, "report.pdf", "application/pdf", minimal_pdf("Quarterly"))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "PDF uploaded and indexed!");

    let id = body["id"].as_str().unwrap();
    let doc = server.store.find_document(id).await.unwrap().unwrap();
    assert_eq!(doc.owner_id, user_id);
    assert_eq!(doc.filename, "report.pdf");
    assert!(doc.content.contains("Quarterly"), "content: {:?}", doc.content);
}

#[tokio::test]
async fn test_duplicate_upload_is_conflict() {
    let server = TestServer::spawn(false).await;
    let (token, _) = server.account("frank").await;

    let first = server
        .upload(&token, "same.pdf", "application/pdf", minimal_pdf("one"))
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = server
        .upload(&token, "same.pdf", "application/pdf", minimal_pdf("two"))
        .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(server.store.document_count(), 1);

    // Same filename under another owner is fine.
    let (other, _) = server.account("grace").await;
    let third = server
        .upload(&other, "same.pdf", "application/pdf", minimal_pdf("three"))
        .await;
    assert_eq!(third.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upload_docx_and_rejects_other_types() {
    let server = TestServer::spawn(false).await;
    let (token, _) = server.account("heidi").await;

    let resp = server
        .upload(
            &token,
            "memo.docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            minimal_docx("docx body text"),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let ids = server.search_ids(&token, &[("query", "docx body")]).await;
    assert_eq!(ids.len(), 1);

    let png = server.upload(&token, "pic.png", "image/png", vec![0x89, 0x50]).await;
    assert_eq!(png.status(), StatusCode::BAD_REQUEST);

    let no_file = server
        .client
        .post(server.url("/upload"))
        .bearer_auth(&token)
        .multipart(Form::new().text("note", "no file here"))
        .send()
        .await
        .unwrap();
    assert_eq!(no_file.status(), StatusCode::BAD_REQUEST);
    let body: Value = no_file.json().await.unwrap();
    assert_eq!(body["error"]["message"], "No file uploaded.");

    let broken = server
        .upload(&token, "broken.pdf", "application/pdf", b"not a pdf".to_vec())
        .await;
    assert_eq!(broken.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(server.store.document_count(), 1);
}

// ─── Search ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_search_is_scoped_filtered_and_ordered() {
    let server = TestServer::spawn(false).await;
    let (token, user_id) = server.account("ivan").await;
    let (_, other_id) = server.account("judy").await;

    let old = server.seed(&user_id, "Budget.pdf", "numbers", 300).await;
    let mid = server.seed(&user_id, "notes.pdf", "The BUDGET review", 200).await;
    let new = server.seed(&user_id, "zeta.pdf", "unrelated", 100).await;
    server.seed(&other_id, "budget.pdf", "budget", 50).await;

    let all = server.search_ids(&token, &[]).await;
    assert_eq!(all, vec![new.id.clone(), mid.id.clone(), old.id.clone()]);

    let hits = server.search_ids(&token, &[("query", "budget")]).await;
    assert_eq!(hits, vec![mid.id.clone(), old.id.clone()]);

    let empty_query = server.search_ids(&token, &[("query", "")]).await;
    assert_eq!(empty_query.len(), 3);

    let by_name = server.search_ids(&token, &[("sort", "filename")]).await;
    assert_eq!(by_name, vec![old.id, mid.id, new.id]);

    let bad = server.search(&token, &[("sort", "sideways")]).await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

// ─── Rename / delete ────────────────────────────────────────────────

#[tokio::test]
async fn test_rename_and_delete_enforce_ownership() {
    let server = TestServer::spawn(false).await;
    let (_, owner_id) = server.account("ken").await;
    let (intruder, _) = server.account("leo").await;
    let doc = server.seed(&owner_id, "private.pdf", "x", 0).await;

    let rename = server
        .client
        .put(server.url(&format!("/rename/{}", doc.id)))
        .bearer_auth(&intruder)
        .json(&json!({ "newFilename": "stolen.pdf" }))
        .send()
        .await
        .unwrap();
    assert_eq!(rename.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(rename).await, "forbidden");

    let delete = server
        .client
        .delete(server.url(&format!("/delete/{}", doc.id)))
        .bearer_auth(&intruder)
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status(), StatusCode::FORBIDDEN);

    let stored = server.store.find_document(&doc.id).await.unwrap().unwrap();
    assert_eq!(stored, doc);

    let missing = server
        .client
        .delete(server.url("/delete/does-not-exist"))
        .bearer_auth(&intruder)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rename_search_delete_round_trip() {
    let server = TestServer::spawn(false).await;
    let (token, user_id) = server.account("mallory").await;
    let doc = server.seed(&user_id, "report.pdf", "text", 0).await;

    let empty = server
        .client
        .put(server.url(&format!("/rename/{}", doc.id)))
        .bearer_auth(&token)
        .json(&json!({ "newFilename": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let renamed = server
        .client
        .put(server.url(&format!("/rename/{}", doc.id)))
        .bearer_auth(&token)
        .json(&json!({ "newFilename": "a.pdf" }))
        .send()
        .await
        .unwrap();
    assert_eq!(renamed.status(), StatusCode::OK);
    let body: Value = renamed.json().await.unwrap();
    assert_eq!(body["message"], "PDF renamed successfully!");
    assert_eq!(body["document"]["filename"], "a.pdf");

    let hits = server.search_ids(&token, &[("query", "a")]).await;
    assert!(hits.contains(&doc.id));

    let delete = || {
        server
            .client
            .delete(server.url(&format!("/delete/{}", doc.id)))
            .bearer_auth(&token)
            .send()
    };
    let first = delete().await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let body: Value = first.json().await.unwrap();
    assert_eq!(body["message"], "PDF deleted successfully!");

    assert!(!server.search_ids(&token, &[]).await.contains(&doc.id));
    assert_eq!(delete().await.unwrap().status(), StatusCode::NOT_FOUND);
}

// ─── Content update ─────────────────────────────────────────────────

#[tokio::test]
async fn test_content_update_is_public_by_default() {
    let server = TestServer::spawn(false).await;
    let (_, user_id) = server.account("nina").await;
    let doc = server.seed(&user_id, "edit.pdf", "before", 0).await;

    let resp = server
        .client
        .put(server.url(&format!("/update/{}", doc.id)))
        .json(&json!({ "content": "after" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["content"], "after");
    assert_eq!(body["ownerId"], user_id);

    let missing = server
        .client
        .put(server.url("/update/unknown"))
        .json(&json!({ "content": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_content_update_can_be_protected() {
    let server = TestServer::spawn(true).await;
    let (owner, owner_id) = server.account("olga").await;
    let (intruder, _) = server.account("pete").await;
    let doc = server.seed(&owner_id, "edit.pdf", "before", 0).await;
    let url = server.url(&format!("/update/{}", doc.id));

    let anonymous = server
        .client
        .put(&url)
        .json(&json!({ "content": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let foreign = server
        .client
        .put(&url)
        .bearer_auth(&intruder)
        .json(&json!({ "content": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status(), StatusCode::FORBIDDEN);

    let own = server
        .client
        .put(&url)
        .bearer_auth(&owner)
        .json(&json!({ "content": "mine" }))
        .send()
        .await
        .unwrap();
    assert_eq!(own.status(), StatusCode::OK);
    let stored = server.store.find_document(&doc.id).await.unwrap().unwrap();
    assert_eq!(stored.content, "mine");
}

// ─── Chat ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_chat_over_callers_documents() {
    let server = TestServer::spawn(false).await;
    let (token, user_id) = server.account("quinn").await;

    let ask = |question: &str| {
        server
            .client
            .post(server.url("/chat-with-pdf"))
            .bearer_auth(&token)
            .json(&json!({ "question": question }))
            .send()
    };

    let none = ask("anything?").await.unwrap();
    assert_eq!(none.status(), StatusCode::NOT_FOUND);
    let body: Value = none.json().await.unwrap();
    assert_eq!(body["error"]["message"], "No PDFs found for the user.");

    server.seed(&user_id, "plan.pdf", "launch in May", 0).await;
    let ok = ask("when is launch?").await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let body: Value = ok.json().await.unwrap();
    assert_eq!(body["reply"], "stub reply");

    {
        let prompts = server.chat.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Title: plan.pdf, Content: launch in May"));
        assert!(prompts[0].contains("when is launch?"));
    }

    let failed = ask("explode").await.unwrap();
    assert_eq!(failed.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(error_code(failed).await, "upstream_error");
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::spawn(false).await;
    let body: Value = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
