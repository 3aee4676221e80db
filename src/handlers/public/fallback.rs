// handlers/public/fallback.rs - catch-all 404

use axum::http::Uri;

use crate::error::ApiError;

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Can't find {} on this server", uri.path()))
}
