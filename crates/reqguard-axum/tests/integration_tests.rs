//! # Integration Tests for reqguard-axum
//!
//! Drives full routers through `oneshot`: pass-through, the validation
//! envelope, error handler dispatch, parsing write-back, schema paths,
//! body limits, and extraction of every request part.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use reqguard_axum::{
    validate_request, validator, RequestData, RouteConfig, SharedErrorHandler, Validated,
    ValidationFailure, Validator, ValidatorConfig,
};

/// Helper: handler that echoes the validated bundle, live request data and
/// the raw body the handler received.
async fn echo(validated: Validated, data: RequestData, body: String) -> Json<Value> {
    Json(json!({
        "validated": validated.into_inner().to_value(),
        "data": data,
        "raw_body": body,
    }))
}

/// Helper: handler that does not depend on validation.
async fn plain() -> &'static str {
    "ok"
}

/// Helper: a single guarded route at `path` for every method used here.
fn guarded(path: &str, guard: Validator, route: RouteConfig) -> Router {
    Router::new()
        .route(path, post(echo).get(echo))
        .route_layer(middleware::from_fn_with_state(guard, validate_request))
        .route_layer(Extension(route))
}

fn default_guard() -> Validator {
    validator(None, None, None).unwrap()
}

fn user_route() -> RouteConfig {
    RouteConfig::new(json!({
        "body": {
            "name": {"type": "string", "required": true},
            "age": {"type": "integer", "minimum": 0}
        }
    }))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn teapot_handler() -> SharedErrorHandler {
    std::sync::Arc::new(|failure: ValidationFailure, _req: Request<Body>, _next: Next| async move {
        (StatusCode::IM_A_TEAPOT, Json(json!({"count": failure.len()}))).into_response()
    })
}

// -- Pass-through -------------------------------------------------------------

#[tokio::test]
async fn test_route_without_configuration_passes_through() {
    let app = Router::new().route(
        "/open",
        get(plain).layer(middleware::from_fn_with_state(default_guard(), validate_request)),
    );
    let response = app
        .oneshot(Request::builder().uri("/open").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_route_without_schema_passes_through() {
    let app = Router::new()
        .route("/open", post(plain))
        .route_layer(middleware::from_fn_with_state(default_guard(), validate_request))
        .route_layer(Extension(RouteConfig::new(json!({"summary": "no schema here"}))));
    let response = app
        .oneshot(json_request("POST", "/open", json!({"anything": true})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Validation envelope ------------------------------------------------------

#[tokio::test]
async fn test_valid_body_reaches_handler_with_declared_parts_only() {
    let app = guarded("/users", default_guard(), user_route());
    let response = app
        .oneshot(json_request("POST", "/users?page=1", json!({"name": "ada", "age": 36})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["validated"], json!({"body": {"name": "ada", "age": 36}}));
    // Undeclared parts are never read.
    assert_eq!(body["data"]["query"], json!({}));
}

#[tokio::test]
async fn test_invalid_body_is_400_with_errors() {
    let app = guarded("/users", default_guard(), user_route());
    let response = app
        .oneshot(json_request("POST", "/users", json!({"age": -1})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e["part"] == "body"));
    assert!(errors.iter().any(|e| e["path"] == "/body/age"));
    assert!(errors
        .iter()
        .any(|e| e["path"] == "/body" && e["message"].as_str().unwrap().contains("name")));
}

#[tokio::test]
async fn test_missing_body_fails_object_schema() {
    let app = guarded("/users", default_guard(), user_route());
    let response = app
        .oneshot(Request::builder().method("POST").uri("/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_composite_schema() {
    let route = RouteConfig::new(json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "object",
                "properties": {"q": {"type": "string", "minLength": 3}},
                "required": ["q"]
            }
        }
    }));

    let ok = guarded("/search", default_guard(), route.clone())
        .oneshot(Request::builder().uri("/search?q=rust").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let bad = guarded("/search", default_guard(), route)
        .oneshot(Request::builder().uri("/search?q=rs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    let body = body_json(bad).await;
    assert_eq!(body["errors"][0]["path"], "/query/q");
    assert_eq!(body["errors"][0]["part"], "query");
}

#[tokio::test]
async fn test_uncompilable_schema_is_500() {
    let route = RouteConfig::new(json!({"body": {"type": "object", "$ref": "missing.schema.json"}}));
    let response = guarded("/users", default_guard(), route)
        .oneshot(json_request("POST", "/users", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
}

// -- Error handler dispatch ---------------------------------------------------

#[tokio::test]
async fn test_route_error_handler_wins() {
    let guard = validator(
        None,
        Some(std::sync::Arc::new(
            |_f: ValidationFailure, _r: Request<Body>, _n: Next| async {
                StatusCode::CONFLICT.into_response()
            },
        )),
        None,
    )
    .unwrap();
    let route = user_route().with_shared_error_handler(teapot_handler());

    let response = guarded("/users", guard, route)
        .oneshot(json_request("POST", "/users", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(body_json(response).await, json!({"count": 1}));
}

#[tokio::test]
async fn test_non_function_route_handler_falls_back_to_default() {
    let guard = validator(None, Some(teapot_handler()), None).unwrap();
    let route = RouteConfig::new(json!({
        "body": {"name": {"type": "string", "required": true}},
        "error_handler": "handleUserErrors"
    }));

    let response = guarded("/users", guard, route)
        .oneshot(json_request("POST", "/users", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
}

#[tokio::test]
async fn test_error_handler_may_continue_the_chain() {
    let lenient: SharedErrorHandler =
        std::sync::Arc::new(|_f: ValidationFailure, req: Request<Body>, next: Next| next.run(req));
    let guard = Validator::builder().shared_error_handler(lenient).build().unwrap();

    let app = Router::new()
        .route("/users", post(|data: RequestData| async move { Json(data.body) }))
        .route_layer(middleware::from_fn_with_state(guard, validate_request))
        .route_layer(Extension(user_route()));
    let response = app
        .oneshot(json_request("POST", "/users", json!({"age": 3})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"age": 3}));
}

// -- Parsing ------------------------------------------------------------------

#[tokio::test]
async fn test_parsing_coerces_query_and_body() {
    let guard = validator(Some(ValidatorConfig::parsing()), None, None).unwrap();
    let route = RouteConfig::new(json!({
        "query": {"page": {"type": "integer"}},
        "body": {"age": {"type": "integer", "required": true}}
    }));

    let response = guarded("/users", guard, route)
        .oneshot(json_request("POST", "/users?page=42", json!({"age": "36"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["validated"]["query"], json!({"page": 42}));
    assert_eq!(body["validated"]["body"], json!({"age": 36}));
    // The live query stays as received; the body is overwritten.
    assert_eq!(body["data"]["query"], json!({"page": "42"}));
    assert_eq!(body["data"]["body"], json!({"age": 36}));
    let raw: Value = serde_json::from_str(body["raw_body"].as_str().unwrap()).unwrap();
    assert_eq!(raw, json!({"age": 36}));
}

#[tokio::test]
async fn test_parsing_writes_params_back() {
    let guard = validator(Some(ValidatorConfig::parsing()), None, None).unwrap();
    let route = RouteConfig::new(json!({
        "params": {"id": {"type": "integer", "required": true}}
    }));

    let response = guarded("/users/{id}", guard, route)
        .oneshot(Request::builder().uri("/users/42").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["validated"]["params"], json!({"id": 42}));
    assert_eq!(body["data"]["params"], json!({"id": 42}));
}

#[tokio::test]
async fn test_undecodable_json_body_is_not_rewritten() {
    let guard = validator(Some(ValidatorConfig::parsing()), None, None).unwrap();
    let route = RouteConfig::new(json!({"body": {"type": "null"}}));

    for raw in ["{nope", ""] {
        let request = Request::builder()
            .method("POST")
            .uri("/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(raw))
            .unwrap();
        let response = guarded("/users", guard.clone(), route.clone())
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "body {raw:?}");

        let body = body_json(response).await;
        assert_eq!(body["validated"]["body"], Value::Null);
        assert_eq!(body["raw_body"], raw, "body {raw:?}");
    }
}

#[tokio::test]
async fn test_without_parsing_numeric_strings_fail() {
    let route = RouteConfig::new(json!({"query": {"page": {"type": "integer"}}}));
    let response = guarded("/users", default_guard(), route)
        .oneshot(Request::builder().uri("/users?page=42").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_route_parse_override_enables_parsing() {
    let route = RouteConfig::new(json!({
        "parse": true,
        "query": {"page": {"type": "integer"}}
    }));
    let response = guarded("/users", default_guard(), route)
        .oneshot(Request::builder().uri("/users?page=42").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["validated"]["query"]["page"], 42);
}

#[tokio::test]
async fn test_form_body_is_parsed() {
    let guard = validator(Some(ValidatorConfig::parsing()), None, None).unwrap();
    let route = RouteConfig::new(json!({
        "body": {"age": {"type": "integer"}, "admin": {"type": "boolean"}}
    }));
    let request = Request::builder()
        .method("POST")
        .uri("/users")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("age=7&admin=true"))
        .unwrap();

    let response = guarded("/users", guard, route).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["validated"]["body"], json!({"age": 7, "admin": true}));
    // Non-JSON bodies keep their original bytes.
    assert_eq!(body["raw_body"], "age=7&admin=true");
}

// -- Schema path --------------------------------------------------------------

#[tokio::test]
async fn test_bracket_and_dot_schema_paths_are_equivalent() {
    let document = json!({
        "options": {
            "schema": {"body": {"name": {"type": "string", "required": true}}}
        }
    });

    for path in ["options[schema]", "options.schema", "options['schema']"] {
        let guard = validator(None, None, Some(path)).unwrap();
        let route = RouteConfig::new(document.clone());

        let bad = guarded("/users", guard.clone(), route.clone())
            .oneshot(json_request("POST", "/users", json!({})))
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST, "path {path}");

        let good = guarded("/users", guard, route)
            .oneshot(json_request("POST", "/users", json!({"name": "ada"})))
            .await
            .unwrap();
        assert_eq!(good.status(), StatusCode::OK, "path {path}");
    }
}

#[tokio::test]
async fn test_schema_path_through_non_object_skips_validation() {
    let guard = validator(None, None, Some("options.schema")).unwrap();
    let app = Router::new()
        .route("/users", post(plain))
        .route_layer(middleware::from_fn_with_state(guard, validate_request))
        .route_layer(Extension(RouteConfig::new(json!({"options": "none"}))));
    let response = app
        .oneshot(json_request("POST", "/users", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Body limit ---------------------------------------------------------------

#[tokio::test]
async fn test_oversized_body_is_413() {
    let guard = Validator::builder().body_limit(16).build().unwrap();
    let response = guarded("/users", guard, user_route())
        .oneshot(json_request(
            "POST",
            "/users",
            json!({"name": "a name that is far too long for the limit"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_body_limit_ignored_when_body_not_declared() {
    let guard = Validator::builder().body_limit(4).build().unwrap();
    let route = RouteConfig::new(json!({"query": {"q": {"type": "string"}}}));
    let response = guarded("/users", guard, route)
        .oneshot(json_request("POST", "/users?q=x", json!({"large": "payload"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// -- Request parts ------------------------------------------------------------

#[tokio::test]
async fn test_params_are_validated() {
    let route = RouteConfig::new(json!({
        "params": {"id": {"type": "string", "pattern": "^[0-9]+$", "required": true}}
    }));

    let ok = guarded("/users/{id}", default_guard(), route.clone())
        .oneshot(Request::builder().uri("/users/42").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(body_json(ok).await["validated"]["params"], json!({"id": "42"}));

    let bad = guarded("/users/{id}", default_guard(), route)
        .oneshot(Request::builder().uri("/users/abc").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(bad).await["errors"][0]["path"], "/params/id");
}

#[tokio::test]
async fn test_headers_and_cookies_are_validated() {
    let route = RouteConfig::new(json!({
        "headers": {"x-api-key": {"type": "string", "minLength": 8, "required": true}},
        "cookies": {"sid": {"type": "string", "required": true}}
    }));

    let request = Request::builder()
        .uri("/me")
        .header("X-Api-Key", "0123456789")
        .header(header::COOKIE, "sid=abc; theme=dark")
        .body(Body::empty())
        .unwrap();
    let ok = guarded("/me", default_guard(), route.clone())
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let body = body_json(ok).await;
    assert_eq!(body["validated"]["headers"]["x-api-key"], "0123456789");
    assert_eq!(body["validated"]["cookies"], json!({"sid": "abc", "theme": "dark"}));

    let missing = guarded("/me", default_guard(), route)
        .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    let body = body_json(missing).await;
    let parts: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["part"].as_str().unwrap())
        .collect();
    assert!(parts.contains(&"headers"));
    assert!(parts.contains(&"cookies"));
}

#[tokio::test]
async fn test_multipart_fields_and_files() {
    let route = RouteConfig::new(json!({
        "body": {"title": {"type": "string", "required": true}},
        "files": {
            "avatar": {
                "type": "object",
                "properties": {"size": {"type": "integer", "maximum": 1024}},
                "required": true
            }
        }
    }));
    let boundary = "reqguard-boundary";
    let payload = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nHello\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n\
         Content-Type: image/png\r\n\r\nPNGDATA\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(payload.clone()))
        .unwrap();

    let response = guarded("/upload", default_guard(), route)
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["validated"]["body"], json!({"title": "Hello"}));
    assert_eq!(
        body["validated"]["files"]["avatar"],
        json!({"filename": "me.png", "content_type": "image/png", "size": 7})
    );
    // The handler still receives the untouched multipart body.
    assert_eq!(body["raw_body"], payload);
}

// -- Shared schemas -----------------------------------------------------------

#[tokio::test]
async fn test_ref_to_shared_schema_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("user.schema.json"),
        json!({
            "$id": "https://schemas.example.com/user.schema.json",
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"]
        })
        .to_string(),
    )
    .unwrap();

    let guard = Validator::builder().schema_dir(dir.path()).build().unwrap();
    let route = RouteConfig::new(json!({
        "body": {"$ref": "https://schemas.example.com/user.schema.json"}
    }));

    let ok = guarded("/users", guard.clone(), route.clone())
        .oneshot(json_request("POST", "/users", json!({"name": "ada"})))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let bad = guarded("/users", guard, route)
        .oneshot(json_request("POST", "/users", json!({})))
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}
