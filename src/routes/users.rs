use actix_web::{web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{PublicUser, Role};
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::session::{authorize, AuthenticatedUser};
use crate::users::{ListQuery, PasswordChange, ProfileUpdate, UserService};

#[derive(Serialize)]
pub struct UserResponse {
    pub user: PublicUser,
}

#[derive(Serialize)]
pub struct CountResponse {
    pub total: u64,
}

fn require_admin(principal: &AuthenticatedUser) -> Result<(), AppError> {
    Ok(authorize(principal, &[Role::Admin])?)
}

/// PUT /api/v1/users/profile
pub async fn update_profile(
    principal: web::ReqData<AuthenticatedUser>,
    body: web::Json<ProfileUpdate>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    let user = users
        .update_profile(principal.user_id, body.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Profile updated successfully",
        UserResponse { user },
    )))
}

/// PUT /api/v1/users/change-password
pub async fn change_password(
    principal: web::ReqData<AuthenticatedUser>,
    body: web::Json<PasswordChange>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    users
        .change_password(principal.user_id, body.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::message("Password updated successfully")))
}

/// GET /api/v1/users?page=&limit=&search=&role=   (admin)
pub async fn list_users(
    principal: web::ReqData<AuthenticatedUser>,
    query: web::Query<ListQuery>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    require_admin(&principal)?;
    let page = users.list_users(&query).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Users retrieved successfully", page)))
}

/// GET /api/v1/users/count?search=&role=   (admin)
pub async fn count_users(
    principal: web::ReqData<AuthenticatedUser>,
    query: web::Query<ListQuery>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    require_admin(&principal)?;
    let total = users.count_users(&query).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "User count retrieved successfully",
        CountResponse { total },
    )))
}

/// GET /api/v1/users/{id}   (admin)
pub async fn get_user(
    principal: web::ReqData<AuthenticatedUser>,
    path: web::Path<Uuid>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    require_admin(&principal)?;
    let user = users.get_user(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("User found", UserResponse { user })))
}

/// PATCH /api/v1/users/{id}/deactivate   (admin)
pub async fn deactivate_user(
    principal: web::ReqData<AuthenticatedUser>,
    path: web::Path<Uuid>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    require_admin(&principal)?;
    users.deactivate(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::message("User deactivated successfully")))
}

/// DELETE /api/v1/users/{id}   (admin)
pub async fn delete_user(
    principal: web::ReqData<AuthenticatedUser>,
    path: web::Path<Uuid>,
    users: web::Data<UserService>,
) -> Result<HttpResponse, AppError> {
    require_admin(&principal)?;
    users.delete(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::message("User deleted successfully")))
}
