use axum::error_handling::HandleErrorLayer;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use axum::http::{Method, Uri};
use axum::middleware::map_request;
use axum::routing::{delete, get};
use axum::{BoxError, Router};
use std::fmt;
use std::future::{ready, Future, Ready};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{error, info, info_span, Level, Span};

use super::error::{ApiError, ControllerError};
use super::tasks;
use crate::config::Listen;
use crate::datastore::SharedStorage;
use crate::model::request_id::InvalidRequestId;
use crate::model::RequestId;

/// Largest request body the API buffers.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(86400);

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub timeout: Option<Duration>,
}

impl From<&Listen> for ServerConfig {
    fn from(listen: &Listen) -> Self {
        Self {
            host: listen.host().to_string(),
            port: listen.port,
            timeout: listen.timeout,
        }
    }
}

/// Routes of the API on top of the injected store handle. Every response,
/// errors included, carries `Access-Control-Allow-Origin: *` and an
/// `x-request-id`.
pub fn router(storage: SharedStorage, timeout: Option<Duration>) -> Router {
    let mut app = Router::new()
        .route(
            "/tasks",
            get(tasks::list)
                .post(tasks::create)
                .fallback(reject_method("GET, POST, OPTIONS")),
        )
        .route(
            "/tasks/{id}",
            delete(tasks::delete).fallback(reject_method("DELETE, OPTIONS")),
        )
        .route(
            "/health",
            get(tasks::health).fallback(reject_method("GET, OPTIONS")),
        )
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(storage);

    if let Some(timeout) = timeout {
        app = app.layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(request_failed))
                .timeout(timeout),
        );
    }

    let request_id = HeaderName::from_static(RequestId::HEADER_NAME);
    app.layer(
        ServiceBuilder::new()
            .layer(map_request(drop_invalid_request_id))
            .layer(SetRequestIdLayer::new(request_id.clone(), NewRequestId))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(request_span)
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(cors(request_id)),
    )
}

fn cors(request_id: HeaderName) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE, request_id])
        .max_age(PREFLIGHT_MAX_AGE)
}

fn reject_method(
    allow: &'static str,
) -> impl Fn(Method, Uri) -> Ready<ApiError> + Clone + Send + Sync + 'static {
    move |method: Method, uri: Uri| {
        ready(ApiError::MethodNotAllowed {
            method: method.to_string(),
            path: uri.path().to_string(),
            allow,
        })
    }
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

async fn request_failed(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::StoreUnavailable("request timed out".to_string())
    } else {
        ApiError::Internal(err.to_string())
    }
}

// a caller id that is not a uuid is replaced by a fresh one
async fn drop_invalid_request_id(mut request: Request) -> Request {
    if let Err(InvalidRequestId::InvalidString(_)) = RequestId::from_header_map(request.headers())
    {
        request.headers_mut().remove(RequestId::HEADER_NAME);
    }
    request
}

#[derive(Clone, Copy, Default)]
struct NewRequestId;

impl MakeRequestId for NewRequestId {
    fn make_request_id<B>(
        &mut self,
        _request: &axum::http::Request<B>,
    ) -> Option<tower_http::request_id::RequestId> {
        HeaderValue::from_str(&RequestId::new().to_string())
            .ok()
            .map(tower_http::request_id::RequestId::new)
    }
}

fn request_span(request: &Request) -> Span {
    let request_id = request
        .headers()
        .get(RequestId::HEADER_NAME)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path()
    )
}

pub struct Server {
    config: ServerConfig,
    app: Router,
}

impl Server {
    pub fn new(config: ServerConfig, storage: SharedStorage) -> Server {
        let app = router(storage, config.timeout);
        Server { config, app }
    }

    fn resolve(&self) -> Result<SocketAddr, ControllerError> {
        let target = format!("{}:{}", self.config.host, self.config.port);
        (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|err| ControllerError::Address(format!("{}: {}", target, err)))?
            .next()
            .ok_or(ControllerError::Address(target))
    }

    /// Binds the listener and serves on the current runtime until `shutdown`
    /// resolves. Returns the bound address, which differs from the configured
    /// one when port 0 is requested.
    pub async fn spawn<F>(
        self,
        shutdown: F,
    ) -> Result<(SocketAddr, JoinHandle<()>), ControllerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.resolve()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(ControllerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ControllerError::Bind)?;
        info!(addr = %local_addr, "Starting api...");

        let app = self.app;
        let handle = tokio::spawn(async move {
            match axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                Ok(()) => info!("Api stopped."),
                Err(err) => error!(reason = %err, "Api stopped with error."),
            }
        });
        Ok((local_addr, handle))
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "todolist_http_server")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::header::{
        ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        ACCESS_CONTROL_REQUEST_METHOD, ALLOW, ORIGIN,
    };
    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::datastore::{MemoryTaskStorage, StorageError, TaskStorage};
    use crate::model::{NewTask, Task, TaskId};

    struct FailingStorage(StorageError);

    #[async_trait::async_trait]
    impl TaskStorage for FailingStorage {
        async fn migrate(&self) -> Result<(), StorageError> {
            Err(self.0.clone())
        }
        async fn ping(&self) -> Result<(), StorageError> {
            Err(self.0.clone())
        }
        async fn list_all(&self) -> Result<Vec<Task>, StorageError> {
            Err(self.0.clone())
        }
        async fn insert(&self, _item: NewTask) -> Result<Task, StorageError> {
            Err(self.0.clone())
        }
        async fn delete_by_id(&self, _id: TaskId) -> Result<(), StorageError> {
            Err(self.0.clone())
        }
    }

    struct SlowStorage;

    #[async_trait::async_trait]
    impl TaskStorage for SlowStorage {
        async fn migrate(&self) -> Result<(), StorageError> {
            Ok(())
        }
        async fn ping(&self) -> Result<(), StorageError> {
            Ok(())
        }
        async fn list_all(&self) -> Result<Vec<Task>, StorageError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![])
        }
        async fn insert(&self, _item: NewTask) -> Result<Task, StorageError> {
            unreachable!()
        }
        async fn delete_by_id(&self, _id: TaskId) -> Result<(), StorageError> {
            unreachable!()
        }
    }

    fn memory_router() -> Router {
        router(Arc::new(MemoryTaskStorage::new()), None)
    }

    fn request(method: &str, uri: &str, body: &str) -> Request {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn call(app: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request(method, uri, body)).await.unwrap();
        let status = response.status();
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        assert!(response.headers().contains_key(RequestId::HEADER_NAME));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_buy_milk_scenario() {
        // GIVEN
        let app = memory_router();

        // WHEN / THEN
        let (status, body) = call(&app, "POST", "/tasks", r#"{"content":"Buy milk"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": 1, "content": "Buy milk"}));

        let (_, body) = call(&app, "GET", "/tasks", "").await;
        assert_eq!(body, json!([{"id": 1, "content": "Buy milk"}]));

        let (_, body) = call(&app, "POST", "/tasks", r#"{"content":"Wash dishes"}"#).await;
        assert_eq!(body, json!({"id": 2, "content": "Wash dishes"}));

        let (_, body) = call(&app, "GET", "/tasks", "").await;
        assert_eq!(
            body,
            json!([{"id": 2, "content": "Wash dishes"}, {"id": 1, "content": "Buy milk"}])
        );

        let (status, body) = call(&app, "DELETE", "/tasks/1", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));

        let (_, body) = call(&app, "GET", "/tasks", "").await;
        assert_eq!(body, json!([{"id": 2, "content": "Wash dishes"}]));
    }

    #[tokio::test]
    async fn test_delete_unknown_id_on_empty_store() {
        let app = memory_router();

        let (status, body) = call(&app, "DELETE", "/tasks/999", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));

        let (_, body) = call(&app, "GET", "/tasks", "").await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_delete_decodes_percent_encoded_id() {
        // GIVEN
        let app = memory_router();
        call(&app, "POST", "/tasks", r#"{"content":"Buy milk"}"#).await;

        // WHEN
        let (status, body) = call(&app, "DELETE", "/tasks/%31", "").await;

        // THEN
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));
        let (_, body) = call(&app, "GET", "/tasks", "").await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let app = memory_router();

        for body in [
            r#"{}"#,
            r#"{"content": null}"#,
            r#"{"content": ""}"#,
            r#"{"content": "   "}"#,
            r#"{"content": 42}"#,
            r#"not json"#,
            "",
        ] {
            let (status, value) = call(&app, "POST", "/tasks", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", body);
            assert_eq!(value["error"]["kind"], "validation");
        }

        // a body without a JSON content type is rejected the same way
        let response = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/tasks")
                    .body(Body::from(r#"{"content":"Buy milk"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // nothing reached the store
        let (_, body) = call(&app, "GET", "/tasks", "").await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_create_rejects_oversized_body() {
        let app = memory_router();
        let body = json!({ "content": "x".repeat(MAX_BODY_BYTES) }).to_string();

        let (status, value) = call(&app, "POST", "/tasks", &body).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(value["error"]["kind"], "payload_too_large");
        let (_, body) = call(&app, "GET", "/tasks", "").await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_delete_rejects_non_numeric_id() {
        let app = memory_router();

        let (status, value) = call(&app, "DELETE", "/tasks/abc", "").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            value,
            json!({
                "error": {
                    "kind": "validation",
                    "message": "task id must be an integer, got \"abc\""
                }
            })
        );
    }

    #[tokio::test]
    async fn test_routing_errors() {
        let app = memory_router();

        let (status, value) = call(&app, "GET", "/nope", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["error"]["kind"], "not_found");

        let response = app
            .clone()
            .oneshot(request("PUT", "/tasks/1", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let allow = response.headers().get(ALLOW).unwrap().to_str().unwrap();
        assert!(allow.contains("DELETE"), "allow {:?}", allow);

        let (status, value) = call(&app, "DELETE", "/tasks", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(value["error"]["kind"], "method_not_allowed");
    }

    #[tokio::test]
    async fn test_preflight() {
        let app = memory_router();
        let preflight = axum::http::Request::builder()
            .method("OPTIONS")
            .uri("/tasks/1")
            .header(ORIGIN, "http://localhost:3000")
            .header(ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(preflight).await.unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let methods = response
            .headers()
            .get(ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("DELETE"), "methods {:?}", methods);
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let app = memory_router();
        let mut req = request("GET", "/tasks", "");
        req.headers_mut().insert(
            RequestId::HEADER_NAME,
            HeaderValue::from_static("02497eac-edab-4d96-9f6c-a2c8c1766dee"),
        );

        let response = app.oneshot(req).await.unwrap();

        assert_eq!(
            response.headers().get(RequestId::HEADER_NAME).unwrap(),
            "02497eac-edab-4d96-9f6c-a2c8c1766dee"
        );
    }

    #[tokio::test]
    async fn test_invalid_request_id_is_replaced() {
        let app = memory_router();
        let mut req = request("GET", "/tasks", "");
        req.headers_mut()
            .insert(RequestId::HEADER_NAME, HeaderValue::from_static("not-a-uuid"));

        let response = app.oneshot(req).await.unwrap();

        let echoed = response
            .headers()
            .get(RequestId::HEADER_NAME)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(RequestId::try_from(echoed).is_ok(), "echoed {:?}", echoed);
    }

    #[tokio::test]
    async fn test_store_failures_use_generic_envelope() {
        let unavailable = router(
            Arc::new(FailingStorage(StorageError::Unavailable(
                "Connection refused (os error 111)".to_string(),
            ))),
            None,
        );
        let (status, value) = call(&unavailable, "GET", "/tasks", "").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            value,
            json!({
                "error": {"kind": "store_unavailable", "message": "task storage is unavailable"}
            })
        );

        let (status, _) = call(&unavailable, "GET", "/health", "").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let broken = router(
            Arc::new(FailingStorage(StorageError::Query(
                "Table 'todo.tasks' doesn't exist".to_string(),
            ))),
            None,
        );
        let (status, value) = call(&broken, "POST", "/tasks", r#"{"content":"x"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            value,
            json!({"error": {"kind": "internal", "message": "internal server error"}})
        );

        let (status, _) = call(&broken, "DELETE", "/tasks/1", "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health() {
        let app = memory_router();

        let (status, body) = call(&app, "GET", "/health", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "serving"}));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let app = router(Arc::new(SlowStorage), Some(Duration::from_millis(20)));

        let (status, value) = call(&app, "GET", "/tasks", "").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(value["error"]["kind"], "store_unavailable");
    }

    #[tokio::test]
    async fn test_server_binds_ephemeral_port() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            timeout: None,
        };
        let server = Server::new(config, Arc::new(MemoryTaskStorage::new()));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let (addr, handle) = server
            .spawn(async move {
                rx.await.ok();
            })
            .await
            .unwrap();
        assert_ne!(addr.port(), 0);

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
