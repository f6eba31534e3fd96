//! Common test utilities.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use http_body_util::BodyExt;
use portico_core::config::AppConfig;
use portico_repo::MemoryRepository;
use portico_server::access::{AccessChecker, IdentityResolver};
use portico_server::{AppState, create_router};
use std::sync::Arc;
use tower::ServiceExt;

/// A router over an in-memory repository, exercised with `oneshot`.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestApp {
    router: Router,
    pub repo: Arc<MemoryRepository>,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new(resolver: Option<Arc<dyn IdentityResolver>>) -> Self {
        Self::with_config(AppConfig::for_testing(), resolver)
    }

    pub fn with_config(config: AppConfig, resolver: Option<Arc<dyn IdentityResolver>>) -> Self {
        let config = Arc::new(config);
        let repo = Arc::new(MemoryRepository::new());
        let checker = Arc::new(AccessChecker::new(repo.clone(), resolver, &config.auth));
        let state = AppState::new(config, repo.clone(), checker);
        Self {
            router: create_router(state),
            repo,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::empty()).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.request(Method::GET, uri, &[]).await
    }
}

/// A rights document readable by the named groups.
#[allow(dead_code)]
pub fn rights_with_groups(groups: &[&str]) -> String {
    let list: String = groups
        .iter()
        .map(|g| format!("<group>{g}</group>"))
        .collect();
    format!(
        r#"<rightsMetadata version="0.1">
             <access type="read"><machine>{list}</machine></access>
           </rightsMetadata>"#
    )
}

#[allow(dead_code)]
pub fn public_rights() -> String {
    rights_with_groups(&["public"])
}

#[allow(dead_code)]
pub async fn body_of(resp: Response<Body>) -> Vec<u8> {
    resp.into_body().collect().await.unwrap().to_bytes().to_vec()
}
