//! Redirect URI validation stage.
//!
//! Establishes trust in `redirect_uri` by matching it against the client's
//! registered URIs (exact case-insensitive, or a single-`*` wildcard
//! pattern). Until this stage accepts the URI, nothing may be delivered by
//! redirect: every failure here is a non-redirect page error, even on a
//! plausible partial match.
//!
//! Requires `HasClient`; written against capability views so other endpoint
//! flows can reuse it.

use std::sync::Arc;

use async_trait::async_trait;
use oxidp_pipeline::{PipelineContext, StageResult, Validator};
use tokio_util::sync::CancellationToken;

use crate::config::AuthorizeConfig;
use crate::context::{HasClient, HasOutcome, HasRawParameters, HasRedirectUri};
use crate::outcome::AuthorizeErrorCode;
use crate::params::names;

/// Stage name used in logs and errors.
const STAGE: &str = "RedirectUriValidator";

/// Validates `redirect_uri` against the client registration.
pub struct RedirectUriValidator {
    config: Arc<AuthorizeConfig>,
}

impl RedirectUriValidator {
    /// Creates the stage.
    #[must_use]
    pub fn new(config: Arc<AuthorizeConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl<C> Validator<C> for RedirectUriValidator
where
    C: PipelineContext + HasRawParameters + HasClient + HasRedirectUri + HasOutcome,
{
    fn name(&self) -> &'static str {
        STAGE
    }

    async fn validate(&self, ctx: &mut C, _cancel: &CancellationToken) -> StageResult {
        let client = ctx.assert_client()?;
        let client_id = client.client_id.clone();

        if ctx.raw().is_repeated(names::REDIRECT_URI) {
            return ctx.reject_page(
                STAGE,
                AuthorizeErrorCode::InvalidRequest,
                "redirect_uri must not be repeated",
            );
        }

        let Some(uri) = ctx.raw().get(names::REDIRECT_URI).map(ToOwned::to_owned) else {
            return ctx.reject_page(
                STAGE,
                AuthorizeErrorCode::InvalidRequest,
                "redirect_uri is missing",
            );
        };

        if uri.is_empty() || uri.len() > self.config.input_lengths.redirect_uri {
            return ctx.reject_page(
                STAGE,
                AuthorizeErrorCode::InvalidRequest,
                "redirect_uri is empty or too long",
            );
        }

        let allowed = ctx
            .client()
            .is_some_and(|client| client.is_redirect_uri_allowed(&uri));
        if !allowed {
            // Deliberately not echoed into the response and not redirected
            // to: the URI is attacker-controlled until proven registered.
            tracing::info!(client_id = %client_id, "redirect_uri not registered for client");
            return ctx.reject_page(
                STAGE,
                AuthorizeErrorCode::InvalidRequest,
                "redirect_uri is not registered for this client",
            );
        }

        ctx.set_redirect_uri(uri);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AuthorizeContext;
    use crate::outcome::AuthorizeOutcome;
    use crate::params::Parameters;
    use crate::stages::tests_support::make_client;
    use crate::subject::Subject;

    async fn run(params: Parameters, redirect_uris: Vec<String>) -> AuthorizeContext {
        let mut client = make_client();
        client.redirect_uris = redirect_uris;

        let mut ctx = AuthorizeContext::new(Subject::anonymous(), params);
        ctx.set_client(client);

        let stage = RedirectUriValidator::new(Arc::new(AuthorizeConfig::default()));
        stage
            .validate(&mut ctx, &CancellationToken::new())
            .await
            .unwrap();
        ctx
    }

    #[tokio::test]
    async fn test_exact_match_is_accepted() {
        let ctx = run(
            Parameters::from_pairs([("redirect_uri", "https://app.example.com/cb")]),
            vec!["https://app.example.com/cb".to_string()],
        )
        .await;

        assert!(ctx.outcome().is_none());
        assert_eq!(ctx.redirect_uri(), Some("https://app.example.com/cb"));
    }

    #[tokio::test]
    async fn test_wildcard_match_is_accepted() {
        let ctx = run(
            Parameters::from_pairs([("redirect_uri", "https://a.b.example.com/cb")]),
            vec!["https://*.example.com/cb".to_string()],
        )
        .await;

        assert!(ctx.outcome().is_none());
        assert_eq!(ctx.redirect_uri(), Some("https://a.b.example.com/cb"));
    }

    #[tokio::test]
    async fn test_unregistered_uri_is_page_error_without_location() {
        let ctx = run(
            Parameters::from_pairs([("redirect_uri", "https://evil.example.net/cb")]),
            vec!["https://app.example.com/cb".to_string()],
        )
        .await;

        // No redirect: the error is a page, and the trusted field stays
        // unpopulated.
        match ctx.outcome().unwrap() {
            AuthorizeOutcome::ErrorPage(page) => {
                assert_eq!(page.error, AuthorizeErrorCode::InvalidRequest);
                // The attacker-supplied URI is not echoed back.
                assert!(
                    !page
                        .error_description
                        .as_deref()
                        .unwrap_or_default()
                        .contains("evil.example.net")
                );
            }
            other => panic!("expected page error, got {other:?}"),
        }
        assert_eq!(ctx.redirect_uri(), None);
    }

    #[tokio::test]
    async fn test_lookalike_domain_never_matches_wildcard() {
        let ctx = run(
            Parameters::from_pairs([("redirect_uri", "https://evilexample.com/cb")]),
            vec!["https://*.example.com/cb".to_string()],
        )
        .await;

        assert!(ctx.outcome().unwrap().is_error());
        assert_eq!(ctx.redirect_uri(), None);
    }

    #[tokio::test]
    async fn test_missing_uri_is_page_error() {
        let ctx = run(
            Parameters::new(),
            vec!["https://app.example.com/cb".to_string()],
        )
        .await;
        assert_eq!(
            ctx.outcome().unwrap().error_code(),
            Some(AuthorizeErrorCode::InvalidRequest)
        );
    }

    #[tokio::test]
    async fn test_repeated_uri_is_page_error() {
        let ctx = run(
            Parameters::from_pairs([
                ("redirect_uri", "https://app.example.com/cb"),
                ("redirect_uri", "https://app.example.com/cb2"),
            ]),
            vec!["https://app.example.com/cb".to_string()],
        )
        .await;
        assert!(ctx.outcome().unwrap().is_error());
    }

    #[tokio::test]
    async fn test_requires_client_capability() {
        let mut ctx = AuthorizeContext::new(
            Subject::anonymous(),
            Parameters::from_pairs([("redirect_uri", "https://app.example.com/cb")]),
        );

        let stage = RedirectUriValidator::new(Arc::new(AuthorizeConfig::default()));
        let result = stage.validate(&mut ctx, &CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(oxidp_pipeline::PipelineError::CapabilityUnmet { .. })
        ));
    }
}
