//! Authentication request handlers.

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use folio_core::models::auth::TokenPair;
use tracing::warn;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthenticatedUser, bearer_token};
use crate::models::{
    ApiKeyResponse, ApiResponse, DeleteAccountRequest, LoginRequest, ProfileResponse,
    SignupRequest, SubjectResponse, TokenResponse, UpdateProfileRequest,
};
use crate::services::cookies;

/// Response parts shared by login and refresh: rotated cookie, bearer header, body.
type IssuedTokens = (
    CookieJar,
    [(HeaderName, String); 1],
    Json<ApiResponse<TokenResponse>>,
);

/// `POST /api/auth/signup`: register a new user. No session is created.
pub async fn signup_handler(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProfileResponse>>)> {
    let profile = state
        .sessions
        .signup(&body.id, &body.password, &body.name)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Signed up", profile.into())),
    ))
}

/// `POST /api/auth/login`: authenticate with id + password.
///
/// The access token is returned in the `Authorization` header and the body;
/// the refresh token is set as an httpOnly cookie.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<IssuedTokens> {
    let pair = state.sessions.login(&body.id, &body.password).await?;
    Ok(issued(&state, jar, pair, "Logged in"))
}

/// `POST /api/auth/logout`: revoke the refresh cookie and clear it.
///
/// The access token stays valid until it expires.
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<ApiResponse<()>>)> {
    let token = bearer_token(&headers)?;
    let refresh = cookies::refresh_token(&jar);
    state.sessions.logout(token, refresh.as_deref()).await?;

    let jar = jar.add(cookies::clear_refresh_cookie(state.config.cookie_secure));
    Ok((jar, Json(ApiResponse::message("Logged out"))))
}

/// `POST /api/auth/token/refresh`: rotate the refresh cookie and issue a new access token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<IssuedTokens> {
    let presented = cookies::refresh_token(&jar)
        .ok_or_else(|| AppError::InvalidToken("Missing refresh token cookie".into()))?;
    let pair = state.sessions.refresh(&presented).await?;
    Ok(issued(&state, jar, pair, "Token refreshed"))
}

/// `POST /api/auth/token/validate`: resolve the bearer token to its subject.
pub async fn validate_handler(
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<ApiResponse<SubjectResponse>>> {
    Ok(Json(ApiResponse::success(
        "Token is valid",
        SubjectResponse {
            user_id: user.subject,
        },
    )))
}

/// `PATCH /api/auth/update`: change the caller's own profile.
pub async fn update_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let profile = state
        .sessions
        .change_profile(&user.token, body.into())
        .await?;
    Ok(Json(ApiResponse::success("Profile updated", profile.into())))
}

/// `POST /api/auth/delete`: delete the caller's account and every book it owns.
pub async fn delete_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    jar: CookieJar,
    Json(body): Json<DeleteAccountRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<()>>)> {
    let subject = state
        .sessions
        .delete_account(&user.token, &body.password)
        .await?;

    // The account is already deleted here.
    if let Err(e) = state.books.purge_owner(&subject).await {
        warn!(user_id = %subject, error = %e, "failed to purge books of deleted account");
    }

    let jar = jar.add(cookies::clear_refresh_cookie(state.config.cookie_secure));
    Ok((jar, Json(ApiResponse::message("Account deleted"))))
}

/// `GET /api/auth/me`: the caller's profile.
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let profile = state.sessions.profile(&user.token).await?;
    Ok(Json(ApiResponse::success("Profile", profile.into())))
}

/// `GET /api/auth/api-key`: the caller's stored third-party API key.
pub async fn api_key_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<ApiResponse<ApiKeyResponse>>> {
    let api_key = state.sessions.api_key(&user.token).await?;
    Ok(Json(ApiResponse::success("API key", ApiKeyResponse { api_key })))
}

fn issued(state: &AppState, jar: CookieJar, pair: TokenPair, message: &str) -> IssuedTokens {
    let jar = jar.add(cookies::refresh_cookie(
        &pair.refresh_token,
        pair.refresh_expires_in,
        state.config.cookie_secure,
    ));
    let header = [(AUTHORIZATION, format!("Bearer {}", pair.access_token))];
    let body = TokenResponse {
        access_token: pair.access_token,
        token_type: "Bearer",
        expires_in: pair.access_expires_in,
    };
    (jar, header, Json(ApiResponse::success(message, body)))
}
