use std::convert::Infallible;

use axum::{
	Json, Router,
	body::Body,
	extract::{Query, State},
	http::{StatusCode, header},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use faro_pipeline::{ChatOutcome, ChatRequest};
use faro_retrieval::RefreshReport;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/chat", post(chat))
		.route("/v1/chat/stream", post(chat_stream))
		.route("/v1/documents", get(list_documents).delete(delete_document))
		.route("/v1/admin/refresh", post(refresh))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn chat(
	State(state): State<AppState>,
	Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatOutcome>, ApiError> {
	if payload.question.trim().is_empty() {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"question must be non-empty.",
		));
	}

	Ok(Json(state.pipeline.run(payload).await))
}

/// Token frames, then the metadata delimiter, then one JSON payload; a client
/// that disconnects mid-stream drops the body and stops generation.
async fn chat_stream(
	State(state): State<AppState>,
	Json(payload): Json<ChatRequest>,
) -> Result<Response, ApiError> {
	if payload.question.trim().is_empty() {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"question must be non-empty.",
		));
	}

	let stream = state
		.pipeline
		.clone()
		.run_streaming(payload)
		.map(|event| Ok::<_, Infallible>(event.into_wire()));
	let response = (
		[(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
		Body::from_stream(stream),
	)
		.into_response();

	Ok(response)
}

#[derive(Debug, Serialize)]
struct DocumentsResponse {
	documents: Vec<String>,
}

async fn list_documents(
	State(state): State<AppState>,
) -> Result<Json<DocumentsResponse>, ApiError> {
	let documents = state.engine.list_sources().await?;

	Ok(Json(DocumentsResponse { documents }))
}

#[derive(Debug, Deserialize)]
struct DeleteDocumentParams {
	source: String,
}

async fn delete_document(
	State(state): State<AppState>,
	Query(params): Query<DeleteDocumentParams>,
) -> Result<Json<RefreshReport>, ApiError> {
	if params.source.trim().is_empty() {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"source must be non-empty.",
		));
	}

	let report = state.engine.delete_source(&params.source).await?;

	Ok(Json(report))
}

/// The zero-argument refresh signal: rebuilds the lexical index after corpus
/// mutation. The vector index keeps itself current.
async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshReport>, ApiError> {
	let report = state.engine.refresh().await?;

	Ok(Json(report))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError { status, error_code: code.to_string(), message: message.into() }
}

impl From<faro_retrieval::Error> for ApiError {
	fn from(err: faro_retrieval::Error) -> Self {
		json_error(StatusCode::INTERNAL_SERVER_ERROR, "index_error", err.to_string())
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
