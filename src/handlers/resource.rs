use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query, State},
    http::{Method, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::Value;

use crate::crud::{Crud, CrudError, Reply};
use crate::error::ApiError;
use crate::middleware::{optional_auth_middleware, RequestPrincipal};
use crate::types::{CrudRequest, Document, Operation};

/// Routes for one resource under `/api/{collection}`:
///
/// - `POST /` create, `GET /` find
/// - `GET /:id` read, `PUT|PATCH /:id` update, `DELETE /:id` delete
///
/// GET requests take their payload from the query string; every other
/// method reads a JSON object body.
pub fn resource_routes(crud: Crud) -> Router {
    let base = format!("/api/{}", crud.collection());
    let item = format!("{}/:id", base);

    Router::new()
        .route(&base, get(find).post(create))
        .route(&item, get(read).put(update).patch(update).delete(delete))
        .layer(middleware::from_fn(optional_auth_middleware))
        .with_state(Arc::new(crud))
}

/// Axum side of the reply capability: bare JSON bodies, `ApiError` envelopes for failures
pub struct JsonReply;

impl Reply for JsonReply {
    type Output = Response;

    fn ok(self, value: Value) -> Response {
        (StatusCode::OK, Json(value)).into_response()
    }

    fn error(self, err: CrudError) -> Response {
        ApiError::from(err).into_response()
    }
}

/// Payload from the query string on GET, from the JSON body otherwise
fn payload_from(method: &Method, query: HashMap<String, String>, body: &Bytes) -> Result<Document, ApiError> {
    if method == Method::GET {
        return Ok(query
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect());
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Document::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::invalid_json("Expected JSON object")),
        Err(e) => Err(ApiError::invalid_json(format!("Malformed JSON body: {}", e))),
    }
}

async fn dispatch(
    crud: &Crud,
    op: Operation,
    principal: RequestPrincipal,
    id: Option<String>,
    method: Method,
    query: HashMap<String, String>,
    body: Bytes,
) -> Response {
    let payload = match payload_from(&method, query, &body) {
        Ok(payload) => payload,
        Err(e) => return e.into_response(),
    };

    let request = CrudRequest {
        principal: principal.0,
        payload,
        id,
    };
    crud.respond(op, request, JsonReply).await
}

/// POST /api/:collection
async fn create(
    State(crud): State<Arc<Crud>>,
    Extension(principal): Extension<RequestPrincipal>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    dispatch(&crud, Operation::Create, principal, None, method, query, body).await
}

/// GET /api/:collection
async fn find(
    State(crud): State<Arc<Crud>>,
    Extension(principal): Extension<RequestPrincipal>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    dispatch(&crud, Operation::Find, principal, None, method, query, body).await
}

/// GET /api/:collection/:id
async fn read(
    State(crud): State<Arc<Crud>>,
    Extension(principal): Extension<RequestPrincipal>,
    Path(id): Path<String>,
) -> Response {
    let request = CrudRequest {
        principal: principal.0,
        payload: Document::new(),
        id: Some(id),
    };
    crud.respond(Operation::Read, request, JsonReply).await
}

/// PUT|PATCH /api/:collection/:id
async fn update(
    State(crud): State<Arc<Crud>>,
    Extension(principal): Extension<RequestPrincipal>,
    Path(id): Path<String>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    dispatch(&crud, Operation::Update, principal, Some(id), method, query, body).await
}

/// DELETE /api/:collection/:id
async fn delete(
    State(crud): State<Arc<Crud>>,
    Extension(principal): Extension<RequestPrincipal>,
    Path(id): Path<String>,
) -> Response {
    let request = CrudRequest {
        principal: principal.0,
        payload: Document::new(),
        id: Some(id),
    };
    crud.respond(Operation::Delete, request, JsonReply).await
}
