// handlers/protected/whoami.rs - GET /api/auth/me

use crate::auth::Principal;
use crate::middleware::{ApiResponse, CurrentUser};

pub async fn whoami(CurrentUser(principal): CurrentUser) -> ApiResponse<Principal> {
    ApiResponse::success(principal)
}
