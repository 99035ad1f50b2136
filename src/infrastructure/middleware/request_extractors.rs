// Request Extractors - axum's Json/Query/Path with rejections reported as AppError
// so malformed input gets the same JSON error body as every other failure

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use std::future::Future;
use tracing::debug;

use crate::error::AppError;

fn bad_request(kind: &str, body_text: String) -> AppError {
    debug!(kind, reason = %body_text, "request input rejected");
    AppError::BadRequest(body_text)
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request("json", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        bad_request("query", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            // Handler mounted on a route without the segments it asks for
            PathRejection::MissingPathParams(missing) => AppError::Internal(missing.body_text()),
            other => bad_request("path", other.body_text()),
        }
    }
}

/// JSON request body.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    fn from_request(
        req: Request,
        state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let extracted = Json::<T>::from_request(req, state);
        async move {
            let Json(value) = extracted.await?;
            Ok(Self(value))
        }
    }
}

/// Query string parameters.
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let parsed = Query::<T>::try_from_uri(&parts.uri)
            .map(|Query(value)| Self(value))
            .map_err(AppError::from);
        async move { parsed }
    }
}

/// Path segments, e.g. the `{id}` in `/comments/{id}`.
#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let extracted = Path::<T>::from_request_parts(parts, state);
        async move {
            let Path(value) = extracted.await?;
            Ok(Self(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CommentId;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Input {
        content: String,
    }

    #[derive(Debug, Deserialize)]
    struct Params {
        limit: Option<u32>,
    }

    fn json_request(body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_json_body_accepted_and_rejected() {
        let ApiJson(input) = ApiJson::<Input>::from_request(json_request(r#"{"content":"hi"}"#), &())
            .await
            .unwrap();
        assert_eq!(input.content, "hi");

        let rejected = ApiJson::<Input>::from_request(json_request("{not json"), &()).await;
        assert!(matches!(rejected, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_bad_query_is_bad_request() {
        let (mut parts, _) = axum::http::Request::builder()
            .uri("/comments?limit=abc")
            .body(())
            .unwrap()
            .into_parts();
        let rejected = ApiQuery::<Params>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(rejected, Err(AppError::BadRequest(_))));

        let (mut parts, _) = axum::http::Request::builder()
            .uri("/comments?limit=4")
            .body(())
            .unwrap()
            .into_parts();
        let ApiQuery(params) = ApiQuery::<Params>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(params.limit, Some(4));
    }

    #[tokio::test]
    async fn test_path_outside_router_is_internal() {
        // No route matched, so there are no captured segments
        let (mut parts, _) = axum::http::Request::new(()).into_parts();
        let rejected = ApiPath::<CommentId>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(rejected, Err(AppError::Internal(_))));
    }
}
