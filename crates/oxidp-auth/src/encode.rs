//! Response encoding.
//!
//! Turns a terminal [`AuthorizeOutcome`] into an HTTP response. Three
//! delivery strategies exist for redirect-bound parameters, selected by
//! `response_mode`:
//!
//! - **query**: appended to the redirect URI's query string
//! - **fragment**: appended after `#`, keeping values out of server logs
//! - **form_post**: a minimal auto-submitting HTML form POSTing the
//!   parameters to the redirect URI, avoiding any URL exposure, including
//!   via the `Referer` header
//!
//! Every encoded response carries `Cache-Control: no-store` and
//! `Pragma: no-cache`. The redirect target is always the already-validated
//! redirect URI; it is never re-derived from request input at this stage.

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};

use crate::outcome::{
    AuthorizeErrorPage, AuthorizeOutcome, InteractionKind, InteractionRequired,
};
use crate::params::{Parameters, names};
use crate::types::flow::ResponseMode;

/// Where the hosting layer serves its interactive pages.
#[derive(Debug, Clone)]
pub struct InteractionUrls {
    /// Path of the login page.
    pub login: String,

    /// Path of the consent page.
    pub consent: String,

    /// Query parameter carrying the serialized resume state.
    pub return_param: String,
}

impl Default for InteractionUrls {
    fn default() -> Self {
        Self {
            login: "/account/login".to_string(),
            consent: "/account/consent".to_string(),
            return_param: "return_url".to_string(),
        }
    }
}

/// Encodes a terminal outcome into an HTTP response.
#[must_use]
pub fn encode_outcome(outcome: &AuthorizeOutcome, interaction: &InteractionUrls) -> Response {
    match outcome {
        AuthorizeOutcome::Success(success) => {
            let mut params: Vec<(&str, &str)> = vec![(names::CODE, &success.code)];
            if let Some(state) = success.state.as_deref() {
                params.push((names::STATE, state));
            }
            params.push((names::SCOPE, &success.scope));
            if let Some(session_state) = success.session_state.as_deref() {
                params.push((names::SESSION_STATE, session_state));
            }
            deliver(&success.redirect_uri, success.response_mode, &params)
        }
        AuthorizeOutcome::ErrorRedirect(error) => {
            let mut params: Vec<(&str, &str)> = vec![(names::ERROR, error.error.as_str())];
            if let Some(description) = error.error_description.as_deref() {
                params.push((names::ERROR_DESCRIPTION, description));
            }
            if let Some(state) = error.state.as_deref() {
                params.push((names::STATE, state));
            }
            deliver(&error.redirect_uri, error.response_mode, &params)
        }
        AuthorizeOutcome::ErrorPage(page) => error_page(page),
        AuthorizeOutcome::Interaction(required) => interaction_redirect(required, interaction),
    }
}

/// Headers every encoded response carries.
fn no_store_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// Delivers parameters to an already-validated redirect URI.
fn deliver(redirect_uri: &str, mode: ResponseMode, params: &[(&str, &str)]) -> Response {
    match mode {
        ResponseMode::Query => match append_query(redirect_uri, params) {
            Ok(location) => redirect(&location),
            Err(response) => response,
        },
        ResponseMode::Fragment => match set_fragment(redirect_uri, params) {
            Ok(location) => redirect(&location),
            Err(response) => response,
        },
        ResponseMode::FormPost => form_post(redirect_uri, params),
    }
}

/// 302 with `Location` plus the no-store headers.
fn redirect(location: &str) -> Response {
    let mut headers = no_store_headers();
    match HeaderValue::from_str(location) {
        Ok(value) => {
            headers.insert(header::LOCATION, value);
            (StatusCode::FOUND, headers).into_response()
        }
        Err(_) => internal_error(),
    }
}

fn append_query(redirect_uri: &str, params: &[(&str, &str)]) -> Result<String, Response> {
    let mut url = url::Url::parse(redirect_uri).map_err(|_| internal_error())?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url.to_string())
}

fn set_fragment(redirect_uri: &str, params: &[(&str, &str)]) -> Result<String, Response> {
    let mut url = url::Url::parse(redirect_uri).map_err(|_| internal_error())?;
    let fragment = encode_pairs(params);
    url.set_fragment(Some(&fragment));
    Ok(url.to_string())
}

fn encode_pairs(params: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// 200 with a minimal auto-submitting form. Values are HTML-escaped.
fn form_post(redirect_uri: &str, params: &[(&str, &str)]) -> Response {
    let mut inputs = String::new();
    for (key, value) in params {
        inputs.push_str(&format!(
            "<input type=\"hidden\" name=\"{}\" value=\"{}\" />\n",
            html_escape(key),
            html_escape(value)
        ));
    }

    let body = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Submitting…</title></head>\n\
         <body onload=\"document.forms[0].submit()\">\n\
         <form method=\"post\" action=\"{}\">\n{}\
         <noscript><button type=\"submit\">Continue</button></noscript>\n\
         </form>\n</body>\n</html>\n",
        html_escape(redirect_uri),
        inputs
    );

    (StatusCode::OK, no_store_headers(), Html(body)).into_response()
}

/// Non-redirect error page: 400, no `Location`.
fn error_page(page: &AuthorizeErrorPage) -> Response {
    let body = format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Authorization error</title></head>\n\
         <body>\n<h1>Authorization error</h1>\n<p>{}</p>\n<p>{}</p>\n</body>\n</html>\n",
        html_escape(page.error.as_str()),
        html_escape(page.error_description.as_deref().unwrap_or_default())
    );

    (StatusCode::BAD_REQUEST, no_store_headers(), Html(body)).into_response()
}

/// Redirects to the login or consent page with the resume state attached.
fn interaction_redirect(required: &InteractionRequired, urls: &InteractionUrls) -> Response {
    let base = match required.kind {
        InteractionKind::Login => &urls.login,
        InteractionKind::Consent => &urls.consent,
    };

    let resume = encode_resume(&required.resume);
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer.append_pair(&urls.return_param, &resume);
    let location = format!("{}?{}", base, serializer.finish());

    redirect(&location)
}

/// Serializes the resume parameters back into a query string.
fn encode_resume(resume: &Parameters) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in resume.iter() {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, no_store_headers()).into_response()
}

fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{
        AuthorizeErrorCode, AuthorizeErrorRedirect, AuthorizeSuccess,
    };

    fn success(mode: ResponseMode) -> AuthorizeOutcome {
        AuthorizeOutcome::Success(AuthorizeSuccess {
            redirect_uri: "https://app.example.com/cb".to_string(),
            response_mode: mode,
            code: "c0d3".to_string(),
            state: Some("xyz".to_string()),
            scope: "openid api1.read".to_string(),
            session_state: Some("hash.salt".to_string()),
        })
    }

    fn location_of(response: &Response) -> String {
        response
            .headers()
            .get(header::LOCATION)
            .expect("Location header")
            .to_str()
            .unwrap()
            .to_string()
    }

    async fn body_of(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn assert_no_store(response: &Response) {
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
        assert_eq!(response.headers().get(header::PRAGMA).unwrap(), "no-cache");
    }

    #[test]
    fn test_query_encoding() {
        let response = encode_outcome(&success(ResponseMode::Query), &InteractionUrls::default());

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_no_store(&response);

        let location = location_of(&response);
        assert!(location.starts_with("https://app.example.com/cb?"));
        assert!(location.contains("code=c0d3"));
        assert!(location.contains("state=xyz"));
        assert!(location.contains("scope=openid+api1.read"));
        assert!(location.contains("session_state=hash.salt"));
        assert!(!location.contains('#'));
    }

    #[test]
    fn test_fragment_encoding() {
        let response =
            encode_outcome(&success(ResponseMode::Fragment), &InteractionUrls::default());

        let location = location_of(&response);
        let (base, fragment) = location.split_once('#').expect("fragment present");
        assert_eq!(base, "https://app.example.com/cb");
        assert!(fragment.contains("code=c0d3"));
        assert!(fragment.contains("state=xyz"));
        // Parameters live in the fragment only.
        assert!(!base.contains("code="));
    }

    #[tokio::test]
    async fn test_form_post_encoding() {
        let response =
            encode_outcome(&success(ResponseMode::FormPost), &InteractionUrls::default());

        assert_eq!(response.status(), StatusCode::OK);
        assert_no_store(&response);
        assert!(response.headers().get(header::LOCATION).is_none());

        let body = body_of(response).await;
        assert!(body.contains("action=\"https://app.example.com/cb\""));
        assert!(body.contains("name=\"code\" value=\"c0d3\""));
        assert!(body.contains("name=\"state\" value=\"xyz\""));
        assert!(body.contains("document.forms[0].submit()"));
    }

    #[tokio::test]
    async fn test_form_post_escapes_values() {
        let outcome = AuthorizeOutcome::Success(AuthorizeSuccess {
            redirect_uri: "https://app.example.com/cb".to_string(),
            response_mode: ResponseMode::FormPost,
            code: "c0d3".to_string(),
            state: Some("\"/><script>alert(1)</script>".to_string()),
            scope: "openid".to_string(),
            session_state: None,
        });

        let body = body_of(encode_outcome(&outcome, &InteractionUrls::default())).await;
        assert!(!body.contains("<script>alert(1)</script>"));
        assert!(body.contains("&quot;/&gt;&lt;script&gt;"));
    }

    #[test]
    fn test_error_redirect_encoding() {
        let outcome = AuthorizeOutcome::ErrorRedirect(AuthorizeErrorRedirect {
            redirect_uri: "https://app.example.com/cb".to_string(),
            response_mode: ResponseMode::Query,
            error: AuthorizeErrorCode::InvalidScope,
            error_description: Some("invalid scopes requested: telepathy".to_string()),
            state: Some("xyz".to_string()),
        });

        let location = location_of(&encode_outcome(&outcome, &InteractionUrls::default()));
        assert!(location.contains("error=invalid_scope"));
        assert!(location.contains("error_description=invalid+scopes"));
        assert!(location.contains("state=xyz"));
    }

    #[tokio::test]
    async fn test_error_page_has_no_location() {
        let outcome = AuthorizeOutcome::ErrorPage(AuthorizeErrorPage {
            error: AuthorizeErrorCode::InvalidClient,
            error_description: Some("unknown or disabled client".to_string()),
        });

        let response = encode_outcome(&outcome, &InteractionUrls::default());
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::LOCATION).is_none());
        assert_no_store(&response);

        let body = body_of(response).await;
        assert!(body.contains("invalid_client"));
    }

    #[test]
    fn test_interaction_redirect_to_login_with_resume() {
        let outcome = AuthorizeOutcome::Interaction(InteractionRequired {
            kind: InteractionKind::Login,
            resume: Parameters::from_pairs([
                ("client_id", "web-app"),
                ("scope", "openid api1.read"),
            ]),
        });

        let response = encode_outcome(&outcome, &InteractionUrls::default());
        assert_eq!(response.status(), StatusCode::FOUND);

        let location = location_of(&response);
        assert!(location.starts_with("/account/login?return_url="));
        // The resume query is nested-urlencoded inside return_url.
        assert!(location.contains("client_id%3Dweb-app"));
    }

    #[test]
    fn test_interaction_redirect_to_consent() {
        let outcome = AuthorizeOutcome::Interaction(InteractionRequired {
            kind: InteractionKind::Consent,
            resume: Parameters::new(),
        });

        let location = location_of(&encode_outcome(&outcome, &InteractionUrls::default()));
        assert!(location.starts_with("/account/consent?"));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a&b<c>\"d'"), "a&amp;b&lt;c&gt;&quot;d&#x27;");
        assert_eq!(html_escape("plain"), "plain");
    }
}
