// handlers/public/session.rs - GET /api/session (optional_auth)

use serde_json::{json, Value};

use crate::auth::RequestContext;
use crate::middleware::ApiResponse;

/// Lets the front end render differently for signed-in and anonymous visitors.
pub async fn session(ctx: RequestContext) -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "authenticated": ctx.principal().is_some(),
        "user": ctx.principal(),
    }))
}
