// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session cookie helpers.
//!
//! Token values are never logged.

use http::header::COOKIE;
use http::HeaderMap;

/// Default name for the session cookie.
pub const SESSION_COOKIE_NAME: &str = "meta_session";

/// Extract the session token from the Cookie header using the default name.
pub fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
	extract_session_cookie_with_name(headers, SESSION_COOKIE_NAME)
}

/// Extract the session token from the Cookie header with a custom cookie name.
///
/// Returns `None` if the header is missing, not valid ASCII, or lacks the
/// cookie. An empty value is treated as missing.
pub fn extract_session_cookie_with_name(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
	headers
		.get_all(COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(|header| header.split(';'))
		.find_map(|cookie| {
			let cookie = cookie.trim();
			let (name, value) = cookie.split_once('=')?;

			if name == cookie_name && !value.is_empty() {
				Some(value.to_string())
			} else {
				None
			}
		})
}

/// `Set-Cookie` value that installs a session token.
pub fn session_cookie(cookie_name: &str, token: &str, max_age_secs: i64, secure: bool) -> String {
	let secure = if secure { "; Secure" } else { "" };
	format!("{cookie_name}={token}; Path=/; Max-Age={max_age_secs}; HttpOnly{secure}; SameSite=Lax")
}

/// `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie(cookie_name: &str, secure: bool) -> String {
	let secure = if secure { "; Secure" } else { "" };
	format!("{cookie_name}=; Path=/; Max-Age=0; HttpOnly{secure}; SameSite=Lax")
}

#[cfg(test)]
mod tests {
	use super::*;
	use http::header::HeaderValue;
	use proptest::prelude::*;

	fn headers(cookie: &str) -> HeaderMap {
		let mut headers = HeaderMap::new();
		headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
		headers
	}

	#[test]
	fn extracts_default_cookie() {
		let h = headers("meta_session=abc123");
		assert_eq!(extract_session_cookie(&h), Some("abc123".to_string()));
	}

	#[test]
	fn extracts_among_other_cookies() {
		let h = headers("theme=dark; meta_session=tok; lang=en");
		assert_eq!(extract_session_cookie(&h), Some("tok".to_string()));
	}

	#[test]
	fn honours_custom_name() {
		let h = headers("sid=xyz; meta_session=tok");
		assert_eq!(
			extract_session_cookie_with_name(&h, "sid"),
			Some("xyz".to_string())
		);
	}

	#[test]
	fn missing_or_empty_cookie_is_none() {
		assert_eq!(extract_session_cookie(&HeaderMap::new()), None);
		assert_eq!(extract_session_cookie(&headers("other=1")), None);
		assert_eq!(extract_session_cookie(&headers("meta_session=")), None);
	}

	#[test]
	fn prefix_named_cookie_does_not_match() {
		let h = headers("meta_session_old=stale");
		assert_eq!(extract_session_cookie(&h), None);
	}

	#[test]
	fn set_cookie_values() {
		assert_eq!(
			session_cookie("meta_session", "tok", 86400, true),
			"meta_session=tok; Path=/; Max-Age=86400; HttpOnly; Secure; SameSite=Lax"
		);
		assert_eq!(
			clear_session_cookie("meta_session", false),
			"meta_session=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax"
		);
	}

	proptest! {
		#[test]
		fn token_survives_surrounding_cookies(token in "[a-f0-9]{1,64}", other in "[a-z]{1,8}") {
			let h = headers(&format!("{other}=1; meta_session={token}; z=2"));
			prop_assert_eq!(extract_session_cookie(&h), Some(token));
		}
	}
}
