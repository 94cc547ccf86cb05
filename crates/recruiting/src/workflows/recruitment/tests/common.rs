use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::procedures::{ProcParam, ProcedureError, ProcedureGateway, Record};
use crate::workflows::recruitment::{
    portal_router, CvStore, PortalState, RecruitmentService, ServiceSettings, SessionKeys,
    SESSION_COOKIE_NAME,
};

pub(super) const DEFAULT_ACTOR: &str = "admin_rrhh";

pub(super) fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct RecordedCall {
    pub(super) target: String,
    pub(super) params: Vec<ProcParam>,
}

enum Script {
    Rows(Vec<Record>),
    Fail(String),
}

/// Gateway double: answers by procedure name, or by a fragment of the SQL text.
#[derive(Default)]
pub(super) struct ScriptedGateway {
    scripts: Mutex<Vec<(String, Script)>>,
    calls: Mutex<Vec<RecordedCall>>,
    next_insert_id: Mutex<u64>,
}

impl ScriptedGateway {
    pub(super) fn with_rows(self, key: &str, rows: Vec<Record>) -> Self {
        self.scripts
            .lock()
            .expect("script mutex poisoned")
            .push((key.to_string(), Script::Rows(rows)));
        self
    }

    pub(super) fn failing(self, key: &str, message: &str) -> Self {
        self.scripts
            .lock()
            .expect("script mutex poisoned")
            .push((key.to_string(), Script::Fail(message.to_string())));
        self
    }

    pub(super) fn with_insert_id(self, id: u64) -> Self {
        *self.next_insert_id.lock().expect("insert mutex poisoned") = id;
        self
    }

    pub(super) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("call mutex poisoned").clone()
    }

    /// Calls whose procedure name or SQL text contains `key`.
    pub(super) fn calls_to(&self, key: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.target.contains(key))
            .collect()
    }

    fn answer(&self, target: &str, params: &[ProcParam]) -> Result<Vec<Record>, ProcedureError> {
        self.calls
            .lock()
            .expect("call mutex poisoned")
            .push(RecordedCall {
                target: target.to_string(),
                params: params.to_vec(),
            });

        let scripts = self.scripts.lock().expect("script mutex poisoned");
        match scripts.iter().find(|(key, _)| target.contains(key.as_str())) {
            Some((_, Script::Rows(rows))) => Ok(rows.clone()),
            Some((_, Script::Fail(message))) => Err(ProcedureError::Unavailable(message.clone())),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl ProcedureGateway for ScriptedGateway {
    async fn call(
        &self,
        procedure: &str,
        params: &[ProcParam],
    ) -> Result<Vec<Record>, ProcedureError> {
        self.answer(procedure, params)
    }

    async fn query(&self, sql: &str, params: &[ProcParam]) -> Result<Vec<Record>, ProcedureError> {
        self.answer(sql, params)
    }

    async fn insert(&self, sql: &str, params: &[ProcParam]) -> Result<u64, ProcedureError> {
        self.answer(sql, params)?;
        Ok(*self.next_insert_id.lock().expect("insert mutex poisoned"))
    }
}

pub(super) fn build_service(
    gateway: ScriptedGateway,
) -> (RecruitmentService<ScriptedGateway>, Arc<ScriptedGateway>) {
    let gateway = Arc::new(gateway);
    let service = RecruitmentService::new(gateway.clone(), ServiceSettings::new(DEFAULT_ACTOR));
    (service, gateway)
}

pub(super) struct Portal {
    pub(super) router: Router,
    pub(super) gateway: Arc<ScriptedGateway>,
    pub(super) uploads: TempDir,
}

pub(super) fn portal(gateway: ScriptedGateway) -> Portal {
    let (service, gateway) = build_service(gateway);
    let uploads = tempfile::tempdir().expect("temp dir");
    let state = PortalState {
        service: Arc::new(service),
        uploads: Arc::new(CvStore::new(uploads.path().join("cvs"))),
        sessions: SessionKeys::new("portal-test-secret", false),
        public_url: Some("http://portal.test".to_string()),
        body_limit: 1024 * 1024,
    };
    Portal {
        router: portal_router(state),
        gateway,
        uploads,
    }
}

pub(super) async fn send(router: &Router, request: Request<Body>) -> Response {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("route executes")
}

pub(super) fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request builds")
}

pub(super) fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request builds")
}

pub(super) fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub(super) const MULTIPART_BOUNDARY: &str = "recruiting-test-boundary";

pub(super) fn post_multipart(
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, contents)) = file {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"cv\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(contents);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf8 body")
}

pub(super) fn location(response: &Response) -> String {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect location")
        .to_str()
        .expect("ascii location")
        .to_string()
}

/// `name=value` pair of the session cookie issued by the response, if any.
pub(super) fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| {
            pair.starts_with(&format!("{SESSION_COOKIE_NAME}="))
                && pair.len() > SESSION_COOKIE_NAME.len() + 1
        })
        .map(str::to_string)
}

/// Follows a redirect with the session it set and returns the rendered page.
pub(super) async fn follow(router: &Router, response: Response) -> String {
    let target = location(&response);
    let cookie = session_cookie(&response);
    let page = send(router, get(&target, cookie.as_deref())).await;
    assert_eq!(page.status(), StatusCode::OK, "following {target}");
    read_text_body(page).await
}

pub(super) async fn sign_in(router: &Router) -> String {
    let response = send(router, post_form("/login", "username=lucia&password=secreta")).await;
    assert_eq!(location(&response), "/");
    session_cookie(&response).expect("session cookie issued")
}

pub(super) fn recruiter_row() -> Record {
    record(serde_json::json!({
        "id": 9,
        "username": "lucia",
        "rol_app": "reclutador",
    }))
}
