/// Authentication Routes
///
/// Registration, login, token refresh, logout and the caller's profile.
/// The refresh token travels only in the `refreshToken` cookie; access tokens
/// go in the response body.

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::domain::PublicUser;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::session::{AuthenticatedUser, Credentials, Registration, Session, SessionManager};

pub const REFRESH_COOKIE: &str = "refreshToken";
const REFRESH_COOKIE_PATH: &str = "/api/v1/auth";

/// Attributes of the refresh-token cookie
#[derive(Debug, Clone)]
pub struct RefreshCookie {
    secure: bool,
    max_age_seconds: i64,
}

impl RefreshCookie {
    pub fn new(secure: bool, max_age_seconds: i64) -> Self {
        Self {
            secure,
            max_age_seconds,
        }
    }

    pub fn issue(&self, token: String) -> Cookie<'static> {
        Cookie::build(REFRESH_COOKIE, token)
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .path(REFRESH_COOKIE_PATH)
            .max_age(Duration::seconds(self.max_age_seconds))
            .finish()
    }

    pub fn clear(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(REFRESH_COOKIE, "")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .path(REFRESH_COOKIE_PATH)
            .finish();
        cookie.make_removal();
        cookie
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: PublicUser,
    pub access_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub user: PublicUser,
}

fn presented_refresh_token(req: &HttpRequest) -> Option<String> {
    req.cookie(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

fn split_session(session: Session) -> (SessionResponse, String) {
    (
        SessionResponse {
            user: session.user,
            access_token: session.tokens.access_token,
        },
        session.tokens.refresh_token,
    )
}

/// POST /api/v1/auth/register
///
/// # Errors
/// - 400: Validation errors
/// - 409: Employee ID, email or phone number already registered
pub async fn register(
    body: web::Json<Registration>,
    sessions: web::Data<SessionManager>,
    cookie: web::Data<RefreshCookie>,
) -> Result<HttpResponse, AppError> {
    let session = sessions.register(body.into_inner()).await?;
    let (payload, refresh_token) = split_session(session);

    Ok(HttpResponse::Created()
        .cookie(cookie.issue(refresh_token))
        .json(ApiResponse::success("User registered successfully", payload)))
}

/// POST /api/v1/auth/login
///
/// # Errors
/// - 401: Unknown employee ID or wrong password (same message), or the
///   account is deactivated
pub async fn login(
    body: web::Json<Credentials>,
    sessions: web::Data<SessionManager>,
    cookie: web::Data<RefreshCookie>,
) -> Result<HttpResponse, AppError> {
    let session = sessions.login(body.into_inner()).await?;
    let (payload, refresh_token) = split_session(session);

    Ok(HttpResponse::Ok()
        .cookie(cookie.issue(refresh_token))
        .json(ApiResponse::success("Login successful", payload)))
}

/// POST /api/v1/auth/refresh-token
///
/// Consumes the cookie's refresh token and sets a new one.
pub async fn refresh_token(
    req: HttpRequest,
    sessions: web::Data<SessionManager>,
    cookie: web::Data<RefreshCookie>,
) -> Result<HttpResponse, AppError> {
    let presented = presented_refresh_token(&req);
    let tokens = sessions.refresh(presented.as_deref()).await?;

    Ok(HttpResponse::Ok()
        .cookie(cookie.issue(tokens.refresh_token))
        .json(ApiResponse::success(
            "Token refreshed successfully",
            AccessTokenResponse {
                access_token: tokens.access_token,
            },
        )))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    req: HttpRequest,
    principal: web::ReqData<AuthenticatedUser>,
    sessions: web::Data<SessionManager>,
    cookie: web::Data<RefreshCookie>,
) -> Result<HttpResponse, AppError> {
    let presented = presented_refresh_token(&req);
    sessions
        .logout(principal.user_id, presented.as_deref())
        .await?;

    Ok(HttpResponse::Ok()
        .cookie(cookie.clear())
        .json(ApiResponse::message("Logout successful")))
}

/// POST /api/v1/auth/logout-all
pub async fn logout_all(
    principal: web::ReqData<AuthenticatedUser>,
    sessions: web::Data<SessionManager>,
    cookie: web::Data<RefreshCookie>,
) -> Result<HttpResponse, AppError> {
    sessions.logout_all(principal.user_id).await?;

    Ok(HttpResponse::Ok()
        .cookie(cookie.clear())
        .json(ApiResponse::message(
            "Logged out from all devices successfully",
        )))
}

/// GET /api/v1/auth/profile
pub async fn profile(
    principal: web::ReqData<AuthenticatedUser>,
    sessions: web::Data<SessionManager>,
) -> Result<HttpResponse, AppError> {
    let user = sessions.profile(principal.user_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Profile retrieved successfully",
        ProfileResponse { user },
    )))
}
