use crate::error::{AppError, Result};
use crate::model::{ApiResponse, GatewayRequest, RequestKind};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use tracing::debug;

/// Routes a `{type, value}` request to the shortening pipeline or the lookup.
///
/// The body is parsed by hand rather than through `Json` so that requests
/// without a JSON content type, as some gateways forward them, are accepted.
pub async fn dispatch_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse>> {
    let request: GatewayRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "unparseable request body");
        AppError::UnreadableBody
    })?;

    let response = match request.kind {
        RequestKind::Post => {
            let code = state.shortener().shorten(&request.value).await?;
            ApiResponse::id(code.as_str())
        }
        RequestKind::Get => {
            let url = state.shortener().resolve(&request.value).await?;
            ApiResponse::id(url)
        }
        RequestKind::Unknown => ApiResponse::invalid_method(),
    };

    Ok(Json(response))
}
