use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use ragward_index::{DocumentSummary, IndexError, SearchResult};

use super::error::ApiError;
use super::server::AppState;

const QUERY_REQUIRED: &str = "Query is required";

#[derive(serde::Deserialize)]
pub(crate) struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
    /// Identity to search as. Non-string values count as no identity.
    #[serde(default)]
    pub user: Option<serde_json::Value>,
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
}

pub(crate) async fn search_handler(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(ApiError::PayloadTooLarge);
        }
        Err(rejection) => {
            tracing::debug!("rejected search body: {rejection}");
            return Err(ApiError::BadRequest(QUERY_REQUIRED.into()));
        }
    };

    let query = request.query.unwrap_or_default();
    let identity = request.user.as_ref().and_then(serde_json::Value::as_str);

    match state.retriever.search(&query, identity).await {
        Ok(results) => Ok(Json(results)),
        Err(e) if e.is_input_error() => Err(ApiError::BadRequest(QUERY_REQUIRED.into())),
        Err(e) => {
            tracing::error!("search failed: {e}");
            Err(search_failed(&e))
        }
    }
}

pub(crate) async fn documents_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentSummary>>, ApiError> {
    state.retriever.list_documents().await.map(Json).map_err(|e| {
        tracing::error!("listing documents failed: {e}");
        ApiError::Internal(format!(
            "An error occurred while fetching document metadata: {e}"
        ))
    })
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

fn search_failed(e: &IndexError) -> ApiError {
    ApiError::Internal(format!("An error occurred during document search: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "ok",
            uptime_secs: 42,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
    }

    #[test]
    fn search_request_fields_optional() {
        let req: SearchRequest = serde_json::from_str("{}").unwrap();
        assert!(req.query.is_none());
        assert!(req.user.is_none());

        let req: SearchRequest =
            serde_json::from_str(r#"{"query":"policy","user":"Suske"}"#).unwrap();
        assert_eq!(req.query.as_deref(), Some("policy"));
        assert_eq!(req.user.as_ref().and_then(|u| u.as_str()), Some("Suske"));
    }

    #[test]
    fn search_failure_message() {
        let err = search_failed(&IndexError::Config("bad".into()));
        assert!(err.to_string().starts_with("An error occurred during document search"));
    }
}
