//! Shared harness: the full HTTP app on a random port, backed by the
//! in-process user store and cache.

#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use reqwest::Response;
use serde_json::{json, Value};
use staff_auth::cache::InMemoryCache;
use staff_auth::configuration::{
    AdminSettings, ApplicationSettings, CacheBackendKind, CacheSettings, DatabaseSettings,
    JwtSettings, PasswordSettings, Settings,
};
use staff_auth::startup::{run, AppServices};
use staff_auth::store::InMemoryUserStore;

pub const PASSWORD: &str = "Secret123";
pub const ADMIN_EMPLOYEE_ID: &str = "ADM001";

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryUserStore>,
    pub client: reqwest::Client,
}

pub fn test_settings() -> Settings {
    Settings {
        database: DatabaseSettings {
            username: "postgres".to_string(),
            password: "password".to_string(),
            port: 5432,
            host: "localhost".to_string(),
            database_name: "staff_auth".to_string(),
        },
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            secure_cookies: false,
        },
        jwt: JwtSettings {
            access_secret: "integration-access-secret-0123456789".to_string(),
            refresh_secret: "integration-refresh-secret-0123456789".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            issuer: "staff_auth".to_string(),
        },
        cache: CacheSettings {
            backend: CacheBackendKind::Memory,
            ..CacheSettings::default()
        },
        password: PasswordSettings { bcrypt_cost: 4 },
        admin: Some(AdminSettings {
            employee_id: ADMIN_EMPLOYEE_ID.to_string(),
            email: "grace@corp.io".to_string(),
            phone_number: "+15550009999".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            password: PASSWORD.to_string(),
        }),
    }
}

pub async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let settings = test_settings();
    let store = Arc::new(InMemoryUserStore::new());
    let services = AppServices::build(&settings, store.clone(), Arc::new(InMemoryCache::new()))
        .expect("Failed to build services");
    services
        .bootstrap_admin(&settings)
        .await
        .expect("Failed to bootstrap administrator");

    let server = run(listener, services).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        client: reqwest::Client::new(),
    }
}

pub fn registration_body(employee_id: &str, email: &str, phone_number: &str) -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": email,
        "employeeId": employee_id,
        "phoneNumber": phone_number,
        "password": PASSWORD
    })
}

/// Value of the `refreshToken` cookie set by the response, if any
pub fn refresh_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| {
            value
                .strip_prefix("refreshToken=")
                .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
        })
}

/// Raw `Set-Cookie` header for `refreshToken`
pub fn refresh_cookie_header(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("refreshToken="))
        .map(str::to_string)
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.address, path)
    }

    pub async fn register(&self, body: &Value) -> Response {
        self.client
            .post(self.url("/auth/register"))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn login(&self, employee_id: &str, password: &str) -> Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&json!({ "employeeId": employee_id, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn refresh(&self, refresh_token: Option<&str>) -> Response {
        let mut request = self.client.post(self.url("/auth/refresh-token"));
        if let Some(token) = refresh_token {
            request = request.header(reqwest::header::COOKIE, format!("refreshToken={}", token));
        }
        request.send().await.expect("Failed to execute request.")
    }

    /// Register and return `(access_token, refresh_token)`
    pub async fn signed_up(&self, employee_id: &str, email: &str, phone_number: &str) -> (String, String) {
        let response = self
            .register(&registration_body(employee_id, email, phone_number))
            .await;
        assert_eq!(201, response.status().as_u16());
        let refresh_token = refresh_cookie(&response).expect("refresh cookie missing");
        let body: Value = response.json().await.unwrap();
        let access_token = body["data"]["accessToken"].as_str().unwrap().to_string();
        (access_token, refresh_token)
    }

    /// Log in as the bootstrap administrator and return their access token
    pub async fn admin_access_token(&self) -> String {
        let response = self.login(ADMIN_EMPLOYEE_ID, PASSWORD).await;
        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.unwrap();
        body["data"]["accessToken"].as_str().unwrap().to_string()
    }
}
