use crate::{
    error::{AppError, Result},
    types::CredentialBundle,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::warn;

pub const ACCESS_TOKEN_COOKIE: &str = "oauth_token";
pub const SCOPES_COOKIE: &str = "scopes";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const EXPIRY_COOKIE: &str = "expiry";

/// Seconds shaved off `expires_in` so the browser drops the cookies before
/// the upstream token actually lapses.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

const EXPIRY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

// Not HttpOnly: the browser script reads the access token itself.
fn session_cookie(name: &'static str, value: String, max_age: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .secure(true)
        .http_only(false)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

pub fn format_expiry(at: DateTime<Utc>) -> String {
    at.format(EXPIRY_FORMAT).to_string()
}

/// Adds the four session cookies for `bundle` to `jar`.
///
/// All cookies share `Max-Age = expires_in - 60`. If that is not positive, or
/// the resulting expiry is not a representable timestamp, the jar is left
/// untouched and [`AppError::InvalidExpiry`] is returned.
pub fn write_bundle(
    jar: CookieJar,
    bundle: &CredentialBundle,
    now: DateTime<Utc>,
) -> Result<CookieJar> {
    let offset_expiry = bundle
        .expires_in
        .checked_sub(EXPIRY_MARGIN_SECS)
        .filter(|offset| *offset > 0);
    let expires_at = offset_expiry
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| now.checked_add_signed(delta));

    let (Some(offset_expiry), Some(expires_at)) = (offset_expiry, expires_at) else {
        warn!(
            "attempted to set cookie with unusable expiry (expires_in={})",
            bundle.expires_in
        );
        return Err(AppError::InvalidExpiry(bundle.expires_in));
    };

    let expiry = format_expiry(expires_at);

    Ok(jar
        .add(session_cookie(
            ACCESS_TOKEN_COOKIE,
            bundle.access_token.clone(),
            offset_expiry,
        ))
        .add(session_cookie(
            SCOPES_COOKIE,
            bundle.scope.clone(),
            offset_expiry,
        ))
        .add(session_cookie(
            REFRESH_TOKEN_COOKIE,
            bundle.refresh_token.clone(),
            offset_expiry,
        ))
        .add(session_cookie(EXPIRY_COOKIE, expiry, offset_expiry)))
}

/// A request counts as authenticated when it carries an `oauth_token` cookie.
/// The token itself is validated by the upstream API on use, not here.
pub fn has_session(jar: &CookieJar) -> bool {
    jar.get(ACCESS_TOKEN_COOKIE).is_some()
}

pub fn access_token(jar: &CookieJar) -> Option<&str> {
    jar.get(ACCESS_TOKEN_COOKIE).map(|cookie| cookie.value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bundle(expires_in: i64) -> CredentialBundle {
        CredentialBundle {
            access_token: "abc".into(),
            token_type: "Bearer".into(),
            scope: "read:me offline_access".into(),
            refresh_token: "xyz".into(),
            expires_in,
        }
    }

    #[test]
    fn cookies_share_offset_lifetime_and_attributes() {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        let jar = write_bundle(CookieJar::new(), &bundle(3600), now).unwrap();

        for name in [
            ACCESS_TOKEN_COOKIE,
            SCOPES_COOKIE,
            REFRESH_TOKEN_COOKIE,
            EXPIRY_COOKIE,
        ] {
            let cookie = jar.get(name).unwrap();
            assert_eq!(cookie.max_age(), Some(time::Duration::seconds(3540)));
            assert_eq!(cookie.path(), Some("/"));
            assert_eq!(cookie.secure(), Some(true));
            assert_eq!(cookie.http_only(), Some(false));
            assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        }

        assert_eq!(jar.get(ACCESS_TOKEN_COOKIE).unwrap().value(), "abc");
        assert_eq!(
            jar.get(SCOPES_COOKIE).unwrap().value(),
            "read:me offline_access"
        );
        assert_eq!(jar.get(REFRESH_TOKEN_COOKIE).unwrap().value(), "xyz");
        assert_eq!(
            jar.get(EXPIRY_COOKIE).unwrap().value(),
            "2025-05-01T12:59:00.000Z"
        );
    }

    #[test]
    fn smallest_valid_lifetime_is_one_second() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        let jar = write_bundle(CookieJar::new(), &bundle(61), now).unwrap();
        assert_eq!(
            jar.get(EXPIRY_COOKIE).unwrap().value(),
            "2026-01-01T00:00:00.000Z"
        );
        assert_eq!(
            jar.get(ACCESS_TOKEN_COOKIE).unwrap().max_age(),
            Some(time::Duration::seconds(1))
        );
    }

    #[test]
    fn short_lived_tokens_write_nothing() {
        for expires_in in [-5, 0, 59, 60] {
            let err = write_bundle(CookieJar::new(), &bundle(expires_in), Utc::now()).unwrap_err();
            assert!(matches!(err, AppError::InvalidExpiry(_)));
        }
    }

    #[test]
    fn out_of_range_lifetimes_are_rejected_without_panicking() {
        for expires_in in [i64::MAX, i64::MIN, 10_000_000_000_000] {
            let err = write_bundle(CookieJar::new(), &bundle(expires_in), Utc::now()).unwrap_err();
            assert!(
                matches!(err, AppError::InvalidExpiry(value) if value == expires_in),
                "{expires_in}"
            );
        }
    }

    #[test]
    fn expiry_keeps_milliseconds() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(format_expiry(at), "2023-11-14T22:13:20.123Z");
    }

    #[test]
    fn session_presence_is_cookie_name_only() {
        let jar = CookieJar::new();
        assert!(!has_session(&jar));
        assert!(access_token(&jar).is_none());

        let jar = jar.add(Cookie::new(SCOPES_COOKIE, "read:me"));
        assert!(!has_session(&jar));

        let jar = jar.add(Cookie::new(ACCESS_TOKEN_COOKIE, "anything"));
        assert!(has_session(&jar));
        assert_eq!(access_token(&jar), Some("anything"));
    }
}
