use axum::{
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use blogcms_backend::error::AppResult;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MentionRequest {
    pub source: String,
    pub target: String,
}

/// Accept `application/json`, otherwise treat the body as a form / 解析表单或JSON
async fn parse_mention(request: Request) -> Option<MentionRequest> {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false);

    if is_json {
        Json::<MentionRequest>::from_request(request, &()).await.ok().map(|Json(m)| m)
    } else {
        Form::<MentionRequest>::from_request(request, &()).await.ok().map(|Form(m)| m)
    }
}

/// POST /webmention - 接收Webmention
pub async fn receive(State(state): State<Arc<AppState>>, request: Request) -> AppResult<Response> {
    let Some(mention) = parse_mention(request).await else {
        return Ok((StatusCode::BAD_REQUEST, Json(json!({ "verified": false }))).into_response());
    };

    let outcome = state
        .verifier
        .process(&state.db, &mention.source, &mention.target)
        .await?;

    let status = if outcome.is_verified() {
        StatusCode::ACCEPTED
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(json!({ "verified": outcome.is_verified() }))).into_response())
}

#[cfg(test)]
mod tests {
    use crate::api::posts::tests::seeded;
    use crate::api::router;
    use crate::api::testing::{get, post_json, send};
    use crate::state::testing::state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get as get_route;
    use axum::Router;
    use serde_json::json;

    const TARGET: &str = "http://notes.example.com/post/1";

    async fn spawn_source() -> String {
        let app = Router::new()
            .route("/cites", get_route(|| async { format!("<a href=\"{}\">read this</a>", TARGET) }))
            .route("/silent", get_route(|| async { "no links here" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn post_form(source: &str, target: &str) -> Request<Body> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("source", source)
            .append_pair("target", target)
            .finish();
        Request::builder()
            .method("POST")
            .uri("/webmention")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_form_and_json_mentions() {
        let (state, _) = state().await;
        let app = router(state);
        let blog = seeded(&app).await;
        let base = spawn_source().await;

        let (status, body) = send(&app, post_form(&format!("{}/cites", base), TARGET)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body, json!({"verified": true}));

        let (status, body) = send(
            &app,
            post_json(
                "/webmention",
                None,
                json!({"source": format!("{}/cites", base), "target": TARGET}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["verified"], true);

        let (_, body) = send(&app, get(&format!("/api/blogs/{}/webmentions", blog))).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_mentions() {
        let (state, _) = state().await;
        let app = router(state);
        seeded(&app).await;
        let base = spawn_source().await;

        let (status, body) = send(&app, post_form(&format!("{}/silent", base), TARGET)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"verified": false}));

        let (status, _) = send(
            &app,
            post_form(&format!("{}/cites", base), "http://unknown.example.com/post/1"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, post_json("/webmention", None, json!({"source": "only"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["verified"], false);
    }
}
