use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{BcryptHasher, PasswordHasher, TokenCodec};
use crate::cache::{CacheStore, UserCache};
use crate::configuration::Settings;
use crate::error::{AppError, ConfigError};
use crate::middleware::{JwtMiddleware, RequestLogger};
use crate::routes::{
    change_password, count_users, deactivate_user, delete_user, get_user, health_check,
    list_users, login, logout, logout_all, not_found, profile, refresh_token, register,
    update_profile, RefreshCookie,
};
use crate::session::SessionManager;
use crate::store::UserStore;
use crate::users::{AdminBootstrap, UserService};

/// Everything the HTTP layer needs, wired from injected store and cache
/// clients.
#[derive(Clone)]
pub struct AppServices {
    pub sessions: Arc<SessionManager>,
    pub users: Arc<UserService>,
    pub refresh_cookie: RefreshCookie,
}

impl AppServices {
    /// # Errors
    /// `ConfigError` if the settings fail startup validation
    pub fn build(
        settings: &Settings,
        store: Arc<dyn UserStore>,
        cache: Arc<dyn CacheStore>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        let codec = Arc::new(TokenCodec::new(&settings.jwt)?);
        let hasher: Arc<dyn PasswordHasher> =
            Arc::new(BcryptHasher::new(settings.password.bcrypt_cost));
        let user_cache = UserCache::new(cache, &settings.cache);

        let sessions = SessionManager::new(
            Arc::clone(&store),
            codec,
            Arc::clone(&hasher),
            user_cache.clone(),
        );
        let users = UserService::new(store, hasher, user_cache);

        Ok(Self {
            refresh_cookie: RefreshCookie::new(
                settings.application.secure_cookies,
                sessions.refresh_token_lifetime(),
            ),
            sessions: Arc::new(sessions),
            users: Arc::new(users),
        })
    }

    /// Create the configured administrator, if one is configured and missing
    pub async fn bootstrap_admin(&self, settings: &Settings) -> Result<(), AppError> {
        let Some(admin) = &settings.admin else {
            tracing::info!("No administrator configured");
            return Ok(());
        };

        match self.users.ensure_admin(admin).await? {
            AdminBootstrap::Created => {
                tracing::info!(employee_id = %admin.employee_id, "Bootstrap administrator created")
            }
            AdminBootstrap::AlreadyPresent => {
                tracing::info!(employee_id = %admin.employee_id, "Bootstrap administrator already present")
            }
        }
        Ok(())
    }
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid request body: {}", err)).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid query parameters: {}", err)).into()
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|_err, _req| AppError::NotFound("User not found".to_string()).into())
}

pub fn run(listener: TcpListener, services: AppServices) -> Result<Server, std::io::Error> {
    let sessions = web::Data::from(Arc::clone(&services.sessions));
    let users = web::Data::from(Arc::clone(&services.users));
    let refresh_cookie = web::Data::new(services.refresh_cookie.clone());
    let guard_sessions = services.sessions;

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(RequestLogger)

            // Shared state
            .app_data(sessions.clone())
            .app_data(users.clone())
            .app_data(refresh_cookie.clone())
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())

            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(health_check))
                    .service(
                        web::scope("/auth")
                            // Public
                            .route("/register", web::post().to(register))
                            .route("/login", web::post().to(login))
                            .route("/refresh-token", web::post().to(refresh_token))
                            // Bearer token required
                            .service(
                                web::resource("/logout")
                                    .wrap(JwtMiddleware::new(Arc::clone(&guard_sessions)))
                                    .route(web::post().to(logout)),
                            )
                            .service(
                                web::resource("/logout-all")
                                    .wrap(JwtMiddleware::new(Arc::clone(&guard_sessions)))
                                    .route(web::post().to(logout_all)),
                            )
                            .service(
                                web::resource("/profile")
                                    .wrap(JwtMiddleware::new(Arc::clone(&guard_sessions)))
                                    .route(web::get().to(profile)),
                            ),
                    )
                    .service(
                        // Bearer token required; listing and per-user admin
                        // routes additionally require ADMIN
                        web::scope("/users")
                            .wrap(JwtMiddleware::new(Arc::clone(&guard_sessions)))
                            .route("/profile", web::put().to(update_profile))
                            .route("/change-password", web::put().to(change_password))
                            .route("", web::get().to(list_users))
                            .route("/count", web::get().to(count_users))
                            .service(
                                web::resource("/{id}")
                                    .route(web::get().to(get_user))
                                    .route(web::delete().to(delete_user)),
                            )
                            .route("/{id}/deactivate", web::patch().to(deactivate_user)),
                    ),
            )
            .default_service(web::route().to(not_found))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
