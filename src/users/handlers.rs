use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    routing::{get, put},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::Principal,
    error::ApiError,
    state::AppState,
    users::{
        dto::{
            CreateUserRequest, CredentialUpdateRequest, LoginQuery, PasscodeRedeemQuery,
            PasscodeRequestQuery, ProfileUpdateRequest, UserView,
        },
        services,
    },
};

/// Response header carrying a freshly issued bearer token.
pub const JWT_HEADER: HeaderName = HeaderName::from_static("jwt");

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", axum::routing::post(create_user))
        .route("/users/login", get(login))
        .route(
            "/users/tempPasscode",
            get(redeem_passcode).put(request_passcode),
        )
        .route(
            "/users/:id",
            get(get_user).put(update_profile).delete(delete_user),
        )
        .route("/users/credentials/:id", put(update_credentials))
}

/// Attaches the token (when one was issued) and lets browsers read it.
fn token_headers(token: Option<String>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let Some(token) = token else {
        return headers;
    };
    match HeaderValue::from_str(&token) {
        Ok(value) => {
            headers.insert(JWT_HEADER, value);
            headers.insert(
                header::ACCESS_CONTROL_EXPOSE_HEADERS,
                HeaderValue::from_static("JWT"),
            );
        }
        Err(e) => warn!(error = %e, "token not representable as a header value"),
    }
    headers
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<(HeaderMap, Json<UserView>), ApiError> {
    let session = services::login(&state, &query.username, &query.password).await?;
    Ok((token_headers(session.token), Json(session.body)))
}

#[instrument(skip(state, principal))]
pub async fn get_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<(HeaderMap, Json<UserView>), ApiError> {
    let session = services::get_user(&state, &principal, id).await?;
    Ok((token_headers(session.token), Json(session.body)))
}

#[instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    body: Option<Json<CreateUserRequest>>,
) -> Result<(StatusCode, HeaderMap, Json<UserView>), ApiError> {
    let session = services::create_user(&state, body.map(|Json(b)| b)).await?;
    let mut headers = token_headers(session.token);
    let location = format!("/api/users/{}", session.body.id);
    if let Ok(value) = HeaderValue::from_str(&location) {
        headers.insert(header::LOCATION, value);
    }
    Ok((StatusCode::CREATED, headers, Json(session.body)))
}

#[instrument(skip(state, principal, body))]
pub async fn update_profile(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    body: Option<Json<ProfileUpdateRequest>>,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    let session =
        services::update_profile(&state, &principal, id, body.map(|Json(b)| b)).await?;
    Ok((StatusCode::NO_CONTENT, token_headers(session.token)))
}

#[instrument(skip(state, principal, body))]
pub async fn update_credentials(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    body: Option<Json<CredentialUpdateRequest>>,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    let session =
        services::update_credentials(&state, &principal, id, body.map(|Json(b)| b)).await?;
    Ok((StatusCode::NO_CONTENT, token_headers(session.token)))
}

#[instrument(skip(state, principal))]
pub async fn delete_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    services::delete_user(&state, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all)]
pub async fn request_passcode(
    State(state): State<AppState>,
    Query(query): Query<PasscodeRequestQuery>,
) -> Result<StatusCode, ApiError> {
    services::request_passcode(&state, &query.username, &query.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all)]
pub async fn redeem_passcode(
    State(state): State<AppState>,
    Query(query): Query<PasscodeRedeemQuery>,
) -> Result<(HeaderMap, Json<UserView>), ApiError> {
    let session = services::redeem_passcode(&state, &query.passcode).await?;
    Ok((token_headers(session.token), Json(session.body)))
}
