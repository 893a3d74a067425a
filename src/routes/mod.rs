mod auth;
mod health_check;
mod users;

pub use auth::{
    login, logout, logout_all, profile, refresh_token, register, RefreshCookie, REFRESH_COOKIE,
};
pub use health_check::health_check;
pub use users::{
    change_password, count_users, deactivate_user, delete_user, get_user, list_users,
    update_profile,
};

use actix_web::{HttpRequest, HttpResponse};

use crate::response::ApiResponse;

/// Fallback for unmatched routes
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::failure(format!(
        "Route {} not found",
        req.path()
    )))
}
