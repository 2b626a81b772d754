//! SCIM 2.0 Protocol Routes
//!
//! Endpoints implemented per RFC 7644 (Protocol) for the User resource.
//! All SCIM endpoints are under `/scim/v2/`:
//!
//! - `GET/POST /scim/v2/Users` - List/create users
//! - `GET/PUT/DELETE /scim/v2/Users/{id}` - User operations

pub mod middleware;
pub mod users;

use axum::{Router, routing::get};

use crate::AppState;

/// Build the SCIM routes.
///
/// Returns a router configured for `/scim/v2/` endpoints with bearer token
/// authentication middleware applied.
pub fn scim_routes(state: AppState) -> Router<AppState> {
    Router::new().nest("/v2", scim_v2_routes(state))
}

fn scim_v2_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/Users", get(users::list_users).post(users::create_user))
        .route(
            "/Users/{id}",
            get(users::get_user)
                .put(users::replace_user)
                .delete(users::delete_user),
        )
        // Apply SCIM bearer token authentication to all routes
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::scim_auth_middleware,
        ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use rstest::rstest;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::{
        AppState, build_app,
        config::ScimGateConfig,
        db::MemoryUserStore,
        scim::SCIM_CONTENT_TYPE,
    };

    const TOKEN: &str = "test-token";

    fn app_with(config: ScimGateConfig) -> Router {
        build_app(AppState::new(config, Arc::new(MemoryUserStore::new())))
    }

    fn app() -> Router {
        let mut config = ScimGateConfig::default();
        config.scim.bearer_token = Some(TOKEN.to_string());
        config.scim.base_url = Some("https://sso.example.com/scim/v2".to_string());
        app_with(config)
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, SCIM_CONTENT_TYPE)
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn create(app: &Router, user_name: &str, display_name: &str) -> String {
        let (status, body) = send(
            app,
            request(
                Method::POST,
                "/scim/v2/Users",
                Some(json!({
                    "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
                    "userName": user_name,
                    "displayName": display_name,
                    "emails": [{"value": format!("{user_name}@example.com"), "primary": true}],
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[rstest]
    #[case::missing_header(None)]
    #[case::wrong_token(Some("Bearer nope"))]
    #[case::wrong_scheme(Some("Basic dGVzdC10b2tlbg=="))]
    #[tokio::test]
    async fn test_rejects_bad_credentials(#[case] authorization: Option<&str>) {
        let mut builder = Request::builder().uri("/scim/v2/Users");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (status, body) = send(&app(), builder.body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "401");
    }

    #[tokio::test]
    async fn test_rejects_everything_without_configured_token() {
        let app = app_with(ScimGateConfig::default());
        let (status, _) = send(&app, request(Method::GET, "/scim/v2/Users", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let app = app();
        let id = create(&app, "alice", "Alice Liddell").await;

        let response = app
            .clone()
            .oneshot(request(Method::GET, &format!("/scim/v2/Users/{id}"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            SCIM_CONTENT_TYPE
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["userName"], "alice");
        assert_eq!(body["name"]["givenName"], "Alice");
        assert_eq!(body["name"]["familyName"], "Liddell");
        assert_eq!(body["emails"][0]["value"], "alice@example.com");
        assert_eq!(body["active"], true);
        assert_eq!(
            body["meta"]["location"],
            format!("https://sso.example.com/scim/v2/Users/{id}")
        );
    }

    #[tokio::test]
    async fn test_create_invalid_json() {
        let app = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/scim/v2/Users")
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["scimType"], "invalidSyntax");
    }

    #[tokio::test]
    async fn test_create_duplicate_user_name() {
        let app = app();
        create(&app, "alice", "Alice").await;

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/scim/v2/Users",
                Some(json!({"userName": "alice"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["scimType"], "uniqueness");
    }

    #[tokio::test]
    async fn test_list_with_filter_and_paging() {
        let app = app();
        for name in ["user1", "user2", "user3"] {
            create(&app, name, "First Last").await;
        }

        let (status, body) = send(
            &app,
            request(
                Method::GET,
                "/scim/v2/Users?filter=userName%20ne%20%22user2%22&startIndex=2&count=5",
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalResults"], 2);
        assert_eq!(body["startIndex"], 2);
        assert_eq!(body["itemsPerPage"], 1);
        assert_eq!(body["Resources"][0]["userName"], "user3");
    }

    #[tokio::test]
    async fn test_list_invalid_filter() {
        let (status, body) = send(
            &app(),
            request(Method::GET, "/scim/v2/Users?filter=userName%20eq", None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["scimType"], "invalidFilter");
    }

    #[tokio::test]
    async fn test_list_invalid_count() {
        let (status, body) = send(
            &app(),
            request(Method::GET, "/scim/v2/Users?count=many", None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["scimType"], "invalidValue");
    }

    #[tokio::test]
    async fn test_replace_and_delete() {
        let app = app();
        let id = create(&app, "alice", "Alice").await;
        let uri = format!("/scim/v2/Users/{id}");

        let (status, body) = send(
            &app,
            request(
                Method::PUT,
                &uri,
                Some(json!({"userName": "alice2", "displayName": "Alice Two"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userName"], "alice2");
        assert_eq!(body["emails"][0]["value"], "alice@example.com");

        let (status, body) = send(&app, request(Method::DELETE, &uri, None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, body) = send(&app, request(Method::GET, &uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "404");
    }

    #[tokio::test]
    async fn test_get_non_numeric_id_not_found() {
        let (status, _) = send(
            &app(),
            request(Method::GET, "/scim/v2/Users/not-a-number", None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
