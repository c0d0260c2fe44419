//! Refresh-token cookie: set, read and clear.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// The cookie is only sent to the auth endpoints.
pub const REFRESH_COOKIE_PATH: &str = "/api/auth";

/// Build the httpOnly refresh-token cookie.
pub fn refresh_cookie(token: &str, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE.to_string(), token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(REFRESH_COOKIE_PATH.to_string())
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

/// Build an expired cookie that clears the refresh token.
pub fn clear_refresh_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE.to_string(), String::new()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(REFRESH_COOKIE_PATH.to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// The refresh token carried by the request, if any.
pub fn refresh_token(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
