#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header::AUTHORIZATION, header::CONTENT_TYPE},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use secrecy::SecretBox;
use serde_json::Value;
use tower::ServiceExt;

use quotegate::{
    config::Config, repositories::MemoryStore, router::create_router, state::AppState,
};

pub const APP_NAME: &str = "QuotegateTest";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: MemoryStore,
}

impl TestApp {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let config = Config {
            database_url: None,
            host: "127.0.0.1".to_string(),
            port: 0,
            jwt_secret: SecretBox::new(Box::new("integration-test-secret".to_string())),
            jwt_expiration_time: 3600,
            two_factor_authentication_app_name: APP_NAME.to_string(),
            two_factor_encryption_key: SecretBox::new(Box::new(STANDARD.encode([7u8; 32]))),
            cors_allowed_origin: None,
        };

        let state = AppState::new(Arc::new(store.clone()), Arc::new(store.clone()), config)
            .expect("test state");

        Self {
            router: create_router(state.clone()),
            state,
            store,
        }
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.router.clone().oneshot(request).await.expect("response")
    }

    /// 登録してログインし、アクセストークンを返す
    pub async fn register_and_log_in(&self, email: &str, password: &str) -> String {
        let response = self
            .send(
                "POST",
                "/authentication/register",
                None,
                Some(serde_json::json!({
                    "email": email,
                    "name": "Test User",
                    "password": password,
                })),
            )
            .await;
        assert_eq!(response.status(), 201);

        let response = self
            .send(
                "POST",
                "/authentication/log-in",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(response.status(), 200);

        let json = body_json(response).await;
        json["accessToken"]
            .as_str()
            .expect("accessToken")
            .to_string()
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body")
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}
