//! End-to-end routing behavior through the public API.

use std::sync::Arc;

use http::header::CONTENT_LENGTH;
use http::{HeaderValue, Method, StatusCode};

use weft::routing::{get, post, Router, StatusService};
use weft::{
    layer_fn, service_fn, Body, Error, ErrorHandler, HttpError, OriginalUri, PathParams, Request,
    Response, Service,
};

fn text(payload: &'static str) -> impl Service + 'static {
    service_fn(move |_req| async move { Ok(Response::new(Body::from(payload))) })
}

fn request(method: Method, uri: &str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect_bytes().await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn dispatches_by_path_and_method() {
    let app = Router::new()
        .route("/hello", get(text("get hello")).post(text("post hello")))
        .unwrap();

    let response = app.call(request(Method::GET, "/hello")).await.unwrap();
    assert_eq!(body_string(response).await, "get hello");

    let response = app.call(request(Method::POST, "/hello")).await.unwrap();
    assert_eq!(body_string(response).await, "post hello");

    let response = app.call(request(Method::GET, "/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn captures_and_decodes_path_params() {
    let app = Router::new()
        .route(
            "/users/:id",
            get(service_fn(|req: Request| async move {
                let params = req.extensions().get::<PathParams>().expect("params");
                Ok(Response::new(Body::from(params.get("id").unwrap().to_owned())))
            })),
        )
        .unwrap();

    let response = app.call(request(Method::GET, "/users/42")).await.unwrap();
    assert_eq!(body_string(response).await, "42");

    let response = app
        .call(request(Method::GET, "/users/j%C3%BCrgen"))
        .await
        .unwrap();
    assert_eq!(body_string(response).await, "jürgen");
}

#[tokio::test]
async fn trailing_wildcard_captures_the_rest() {
    let app = Router::new()
        .route(
            "/assets/*",
            get(service_fn(|req: Request| async move {
                let params = req.extensions().get::<PathParams>().expect("params");
                Ok(Response::new(Body::from(
                    params.wildcard().unwrap_or_default().to_owned(),
                )))
            })),
        )
        .unwrap();

    let response = app
        .call(request(Method::GET, "/assets/css/site.css"))
        .await
        .unwrap();
    assert_eq!(body_string(response).await, "css/site.css");
}

#[tokio::test]
async fn duplicate_patterns_are_rejected_at_registration() {
    let result = Router::new()
        .route("/dup", get(text("first")))
        .unwrap()
        .route("/dup", post(text("second")));
    assert!(matches!(result, Err(Error::RouteConflict { .. })));
}

#[tokio::test]
async fn nested_router_paths_keep_segment_boundaries() {
    let inner = Router::new().route("/x", get(text("nested"))).unwrap();
    let app = Router::new().nest("/sub", inner).unwrap();

    let response = app.call(request(Method::GET, "/sub/x")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "nested");

    // `/subx` shares the prefix characters but not the segment.
    let response = app.call(request(Method::GET, "/subx")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn nest_service_strips_the_prefix_and_keeps_the_original_uri() {
    let app = Router::new()
        .nest_service(
            "/mounted",
            service_fn(|req: Request| async move {
                let original = req
                    .extensions()
                    .get::<OriginalUri>()
                    .map(|uri| uri.0.path().to_owned())
                    .unwrap_or_default();
                Ok(Response::new(Body::from(format!(
                    "{} {}",
                    req.uri().path(),
                    original
                ))))
            }),
        )
        .unwrap();

    let response = app
        .call(request(Method::GET, "/mounted/inner/leaf?q=1"))
        .await
        .unwrap();
    assert_eq!(body_string(response).await, "/inner/leaf /mounted/inner/leaf");
}

#[tokio::test]
async fn method_miss_resolves_through_the_registered_fallbacks() {
    let app = Router::new()
        .route(
            "/strict",
            get(text("ok")).method_not_allowed(StatusService(StatusCode::METHOD_NOT_ALLOWED)),
        )
        .unwrap()
        .route("/lenient", get(text("ok")))
        .unwrap();

    let response = app.call(request(Method::DELETE, "/strict")).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    // Without a per-path fallback the global one answers.
    let response = app.call(request(Method::DELETE, "/lenient")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn custom_fallback_answers_unmatched_paths() {
    let app = Router::new()
        .route("/known", get(text("ok")))
        .unwrap()
        .fallback(StatusService(StatusCode::IM_A_TEAPOT));

    let response = app.call(request(Method::GET, "/unknown")).await.unwrap();
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
}

#[tokio::test]
async fn head_reuses_get_and_drops_the_body() {
    let app = Router::new().route("/page", get(text("page body"))).unwrap();

    let response = app.call(request(Method::HEAD, "/page")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect_bytes().await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn content_length_is_inserted_for_exact_bodies() {
    let app = Router::new().route("/page", get(text("12345"))).unwrap();

    let response = app.call(request(Method::GET, "/page")).await.unwrap();
    assert_eq!(
        response.headers().get(CONTENT_LENGTH),
        Some(&HeaderValue::from_static("5"))
    );
}

#[tokio::test]
async fn handler_errors_become_responses() {
    let app = Router::new()
        .route(
            "/teapot",
            get(service_fn(|_req| async {
                Err::<Response, _>(
                    HttpError::new(StatusCode::IM_A_TEAPOT)
                        .with_message("short and stout")
                        .into(),
                )
            })),
        )
        .unwrap()
        .route(
            "/opaque",
            get(service_fn(|_req| async {
                Err::<Response, _>("database exploded".into())
            })),
        )
        .unwrap();

    let response = app.call(request(Method::GET, "/teapot")).await.unwrap();
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(body_string(response).await, "short and stout");

    let response = app.call(request(Method::GET, "/opaque")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(response).await, "");
}

#[tokio::test]
async fn custom_error_handler_reaches_nested_routes() {
    struct Teapotify;
    impl ErrorHandler for Teapotify {
        fn handle_error(&self, _error: weft::BoxError) -> Response {
            let mut response = Response::new(Body::from("handled"));
            *response.status_mut() = StatusCode::IM_A_TEAPOT;
            response
        }
    }

    let inner = Router::new()
        .route(
            "/boom",
            get(service_fn(|_req| async {
                Err::<Response, _>("boom".into())
            })),
        )
        .unwrap();
    let app = Router::new()
        .nest("/api", inner)
        .unwrap()
        .with_error_handler(Teapotify);

    let response = app.call(request(Method::GET, "/api/boom")).await.unwrap();
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(body_string(response).await, "handled");
}

#[tokio::test]
async fn layers_wrap_first_declared_outermost() {
    fn tagging(tag: &'static str) -> impl weft::Layer + 'static {
        layer_fn(move |inner: weft::ArcService| {
            Arc::new(service_fn(move |req: Request| {
                let inner = Arc::clone(&inner);
                async move {
                    let mut response = inner.call(req).await?;
                    response
                        .headers_mut()
                        .append("x-order", HeaderValue::from_static(tag));
                    Ok(response)
                }
            })) as weft::ArcService
        })
    }

    let app = Router::new()
        .route("/", get(text("ok")))
        .unwrap()
        .layer(tagging("inner"))
        .layer(tagging("outer"));

    let response = app.call(request(Method::GET, "/")).await.unwrap();
    let order: Vec<_> = response
        .headers()
        .get_all("x-order")
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    // Response-side effects run inside-out.
    assert_eq!(order, vec!["inner", "outer"]);
}

#[tokio::test]
async fn layered_route_errors_are_still_isolated() {
    let exploding = layer_fn(|_inner: weft::ArcService| {
        Arc::new(service_fn(|_req: Request| async {
            Err::<Response, _>("layer exploded".into())
        })) as weft::ArcService
    });

    let app = Router::new()
        .route("/", get(text("ok")))
        .unwrap()
        .layer(exploding);

    let response = app.call(request(Method::GET, "/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
