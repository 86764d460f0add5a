use axum::extract::Query;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AppError;

pub const TRIGGER_TOKEN_HEADER: &str = "X-Trigger-Token";

/// Requires the shared trigger token, sent either as a header or as the `token`
/// query parameter. Push subscriptions can only carry the latter.
#[derive(Clone)]
pub struct TriggerTokenLayer {
    pub token: Arc<String>,
}

impl TriggerTokenLayer {
    pub fn new(token: String) -> Self {
        Self {
            token: Arc::new(token),
        }
    }
}

impl<S> tower::Layer<S> for TriggerTokenLayer {
    type Service = TriggerTokenService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TriggerTokenService {
            inner,
            token: self.token.clone(),
        }
    }
}

#[derive(Clone)]
pub struct TriggerTokenService<S> {
    inner: S,
    token: Arc<String>,
}

/// The header is compared as sent. The query value is form-decoded first, so tokens
/// containing `+`, `/` or `=` must be percent-encoded in the push endpoint URL.
fn provided_token<B>(req: &axum::http::Request<B>) -> Option<String> {
    if let Some(header) = req
        .headers()
        .get(TRIGGER_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(header.to_string());
    }

    let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(req.uri()).ok()?;
    params.remove("token")
}

impl<S, B> tower::Service<axum::http::Request<B>> for TriggerTokenService<S>
where
    S: tower::Service<axum::http::Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: axum::http::Request<B>) -> Self::Future {
        let token = self.token.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if provided_token(&req).as_deref() != Some(token.as_str()) {
                return Ok(AppError::Unauthorized.into_response());
            }

            inner.call(req).await
        })
    }
}
