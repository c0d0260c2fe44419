//! Shared helpers for router integration tests.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use folio_api::config::ApiConfig;
use folio_api::{AppState, router};
use serde_json::{Value, json};
use tower::ServiceExt;

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: Value,
}

impl Response {
    /// Value of the `refreshToken` cookie set by this response, if any.
    pub fn refresh_cookie(&self) -> Option<String> {
        self.set_cookie()
            .and_then(|c| c.split(';').next().map(str::to_string))
            .and_then(|pair| pair.strip_prefix("refreshToken=").map(str::to_string))
    }

    /// Raw `Set-Cookie` header for the refresh token.
    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("refreshToken="))
            .map(str::to_string)
    }

    pub fn access_token(&self) -> String {
        self.json["data"]["accessToken"]
            .as_str()
            .expect("accessToken in body")
            .to_string()
    }
}

pub fn app() -> Router {
    let mut config = ApiConfig::with_secret("integration-test-secret");
    // Minimum bcrypt cost keeps the suite fast.
    config.bcrypt_cost = 4;
    router(AppState::in_memory(config).expect("build state"))
}

pub struct Call {
    method: Method,
    uri: String,
    bearer: Option<String>,
    cookie: Option<String>,
    body: Option<Value>,
}

pub fn call(method: Method, uri: &str) -> Call {
    Call {
        method,
        uri: uri.to_string(),
        bearer: None,
        cookie: None,
        body: None,
    }
}

impl Call {
    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    pub fn refresh_cookie(mut self, token: &str) -> Self {
        self.cookie = Some(format!("refreshToken={token}"));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub async fn send(self, app: &Router) -> Response {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if let Some(token) = self.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(cookie) = self.cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let req = match self.body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = app.clone().oneshot(req).await.expect("request");
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Response {
            status,
            headers,
            json,
        }
    }
}

pub async fn signup(app: &Router, id: &str, password: &str) {
    let resp = call(Method::POST, "/api/auth/signup")
        .json(json!({"id": id, "password": password, "name": id}))
        .send(app)
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "signup {id}: {}", resp.json);
}

pub async fn login(app: &Router, id: &str, password: &str) -> Response {
    let resp = call(Method::POST, "/api/auth/login")
        .json(json!({"id": id, "password": password}))
        .send(app)
        .await;
    assert_eq!(resp.status, StatusCode::OK, "login {id}: {}", resp.json);
    resp
}
