//! Route handlers. Every body carries a `success` flag; failures add an
//! `error` message meant for the user.

use std::fmt::Display;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use super::session::{end_session, session_cookie, session_token};
use super::AppState;
use crate::rates::{AllRatesResponse, RateResponse};
use crate::users::{LoginError, LoginRequest, RegistrationError, RegistrationRequest};

const SERVER_ERROR: &str = "Ошибка сервера";

fn failure(status: StatusCode, message: impl Display) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": message.to_string() })),
    )
        .into_response()
}

fn server_error(context: &str, err: &anyhow::Error) -> Response {
    error!(error = %format!("{err:#}"), "{context}");
    failure(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR)
}

/// Read a JSON form. An unreadable body is treated as an empty form so the
/// usual validation messages apply.
fn parse_form<T: DeserializeOwned + Default>(body: &Bytes) -> T {
    serde_json::from_slice(body).unwrap_or_else(|err| {
        debug!(error = %err, "unreadable form body");
        T::default()
    })
}

pub async fn register(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: RegistrationRequest = parse_form(&body);

    match state.users.register(&request).await {
        Ok(user) => Json(json!({
            "success": true,
            "message": format!("Подстрахуй, кореш {}", user.username),
            "user": user,
        }))
        .into_response(),
        Err(RegistrationError::Storage(err)) => server_error("registration failed", &err),
        Err(err) => failure(StatusCode::BAD_REQUEST, err),
    }
}

pub async fn login(State(state): State<Arc<AppState>>, jar: CookieJar, body: Bytes) -> Response {
    let request: LoginRequest = parse_form(&body);

    let user = match state.users.login(&request).await {
        Ok(user) => user,
        Err(LoginError::Storage(err)) => return server_error("login failed", &err),
        Err(err) => {
            let status = match err {
                LoginError::MissingCredentials => StatusCode::BAD_REQUEST,
                LoginError::UnknownUser => StatusCode::NOT_FOUND,
                _ => StatusCode::UNAUTHORIZED,
            };
            return failure(status, err);
        }
    };

    let token = state.sessions.create(user.id).await;
    (
        jar.add(session_cookie(token)),
        Json(json!({
            "success": true,
            "message": "Здарова, кореш",
            "user": user,
        })),
    )
        .into_response()
}

pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(token) = session_token(&jar) {
        state.sessions.remove(&token).await;
    }
    (
        end_session(jar),
        Json(json!({ "success": true, "message": "Давай пока" })),
    )
        .into_response()
}

pub async fn check_auth(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let user_id = match session_token(&jar) {
        Some(token) => state.sessions.user_id(&token).await,
        None => None,
    };

    if let Some(id) = user_id {
        match state.users.get_user(id).await {
            Ok(Some(user)) => {
                return Json(json!({ "success": true, "authenticated": true, "user": user }))
                    .into_response();
            }
            Ok(None) => {}
            Err(err) => return server_error("session lookup failed", &err),
        }
    }

    Json(json!({ "success": true, "authenticated": false })).into_response()
}

pub async fn list_users(State(state): State<Arc<AppState>>) -> Response {
    match state.users.list_users().await {
        Ok(users) => Json(json!({
            "success": true,
            "total": users.len(),
            "users": users,
        }))
        .into_response(),
        Err(err) => server_error("listing users failed", &err),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RateParams {
    pub date: Option<String>,
}

impl RateParams {
    /// An empty `date=` means no date.
    fn date(&self) -> Option<&str> {
        self.date.as_deref().filter(|date| !date.is_empty())
    }
}

pub async fn currency_rates(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RateParams>,
) -> Json<RateResponse> {
    let result = match params.date() {
        Some(date) => state.rates.resolve_by_date(date).await,
        None => state.rates.resolve_latest().await,
    };
    Json(RateResponse::from(&result))
}

pub async fn all_currency_rates(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RateParams>,
) -> Json<AllRatesResponse> {
    let result = state.rates.resolve_all_by_date(params.date()).await;
    Json(AllRatesResponse::from(&result))
}
