//! The authorization chain: bounded-time execution of
//! extract → decode → evaluate, and its axum middleware surface.
//!
//! One request flows `Start → TokenExtracted → ClaimsDecoded →
//! {Allowed | Forbidden}`, with any failure before claims land mapping
//! to `Unauthenticated` and the deadline cutting the whole sequence
//! over to `Overtime` from any state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::access::{AccessPredicate, AuthContext};
use crate::config::KeycloakConfig;
use crate::decoder::ClaimDecoder;
use crate::resolver::KeyResolver;

/// Terminal outcome of one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed.
    Allowed,
    /// No verifiable identity; the caller maps this to 401.
    Unauthenticated(String),
    /// Verified identity without a matching rule; maps to 403.
    Forbidden,
    /// The attempt outran its deadline; maps to 504. Distinct from
    /// `Forbidden` so a misbehaving identity provider can be told
    /// apart from a deliberately refused caller.
    Overtime,
}

impl Decision {
    /// Machine-usable reason for a non-allowed decision.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Allowed => None,
            Self::Unauthenticated(reason) => Some(reason),
            Self::Forbidden => Some("Access to the Resource is forbidden"),
            Self::Overtime => Some("Authorization check overtime"),
        }
    }

    /// HTTP status this decision maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Allowed => StatusCode::OK,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Overtime => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// JSON body returned on every denial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short reason for the denial.
    pub message: String,
}

/// The assembled authorization chain.
///
/// Holds the only process-wide state (the key cache, through the
/// decoder's resolver); everything else is request-scoped.
pub struct KeycloakAuth {
    decoder: ClaimDecoder,
    predicates: Vec<AccessPredicate>,
    deadline: Duration,
    bypass: bool,
}

impl KeycloakAuth {
    /// Assemble a chain evaluating `predicates` in order with
    /// short-circuit OR semantics.
    #[must_use]
    pub fn new(config: &KeycloakConfig, predicates: Vec<AccessPredicate>) -> Self {
        Self {
            decoder: ClaimDecoder::new(Arc::new(KeyResolver::new(config))),
            predicates,
            deadline: config.deadline,
            bypass: false,
        }
    }

    /// A chain that allows every request without looking at it.
    pub(crate) fn bypass(config: &KeycloakConfig) -> Self {
        Self {
            bypass: true,
            ..Self::new(config, Vec::new())
        }
    }

    /// Whether this chain was built with the security check disabled.
    #[must_use]
    pub fn is_bypass(&self) -> bool {
        self.bypass
    }

    /// Run one authorization attempt under the configured deadline.
    ///
    /// The attempt executes on its own task; hitting the deadline
    /// abandons the wait, not the task, which finishes on its own with
    /// at most a late cache write.
    pub async fn decide(&self, header: Option<String>, ctx: Arc<AuthContext>) -> Decision {
        if self.bypass {
            return Decision::Allowed;
        }

        let decoder = self.decoder.clone();
        let predicates = self.predicates.clone();
        let worker = tokio::spawn(async move {
            authorize(&decoder, &predicates, header.as_deref(), &ctx).await
        });

        match timeout(self.deadline, worker).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(err)) => {
                warn!(error = %err, "authorization worker failed");
                Decision::Unauthenticated("authorization worker failed".to_string())
            }
            Err(_) => Decision::Overtime,
        }
    }
}

/// The undeadlined attempt: extract → decode → evaluate.
async fn authorize(
    decoder: &ClaimDecoder,
    predicates: &[AccessPredicate],
    header: Option<&str>,
    ctx: &AuthContext,
) -> Decision {
    let Some(header) = header else {
        return Decision::Unauthenticated("no authorization header".to_string());
    };

    let claims = match decoder.decode(header).await {
        Ok(claims) => claims,
        Err(err) => {
            debug!(error = %err, "token rejected");
            return Decision::Unauthenticated(err.to_string());
        }
    };

    // The decoder already enforces expiry; keep the chain honest
    // against a decoder that does not.
    if claims.is_expired() {
        return Decision::Unauthenticated("token expired".to_string());
    }

    if predicates.iter().any(|p| p.evaluate(&claims, ctx)) {
        Decision::Allowed
    } else {
        Decision::Forbidden
    }
}

/// Authorization middleware for axum.
///
/// Install with `axum::middleware::from_fn_with_state` over an
/// `Arc<KeycloakAuth>`. The request-scoped [`AuthContext`] is inserted
/// into the request extensions before evaluation and mirrored onto the
/// response extensions afterwards, so both inner handlers and outer
/// middleware can read the recorded identity.
pub async fn authorize_middleware(
    State(chain): State<Arc<KeycloakAuth>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let path = request.uri().path().to_owned();

    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let ctx = Arc::new(AuthContext::default());
    request.extensions_mut().insert(Arc::clone(&ctx));

    match chain.decide(bearer, Arc::clone(&ctx)).await {
        Decision::Allowed => {
            debug!(elapsed = ?started.elapsed(), %path, "access allowed");
            let mut response = next.run(request).await;
            response.extensions_mut().insert(ctx);
            response
        }
        decision => {
            debug!(elapsed = ?started.elapsed(), %path, reason = decision.reason(), "access denied");
            let mut response = deny(&decision);
            response.extensions_mut().insert(ctx);
            response
        }
    }
}

/// Build the denial response for a non-allowed decision.
fn deny(decision: &Decision) -> Response {
    let body = Json(ErrorResponse {
        message: decision.reason().unwrap_or_default().to_string(),
    });

    if matches!(decision, Decision::Unauthenticated(_)) {
        (
            decision.status(),
            [(header::WWW_AUTHENTICATE, "Bearer")],
            body,
        )
            .into_response()
    } else {
        (decision.status(), body).into_response()
    }
}

/// Companion middleware logging completed non-GET requests with the
/// authenticated uid, when one was recorded.
pub async fn request_logger(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;

    if method != Method::GET && response.status().is_success() {
        let uid = response
            .extensions()
            .get::<Arc<AuthContext>>()
            .and_then(|ctx| ctx.uid());
        if let Some(uid) = uid {
            info!(%method, %path, %uid, "request completed");
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decisions_map_to_the_contract_status_codes() {
        assert_eq!(Decision::Allowed.status(), StatusCode::OK);
        assert_eq!(
            Decision::Unauthenticated("x".to_string()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(Decision::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(Decision::Overtime.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn fixed_decisions_carry_the_fixed_reasons() {
        assert_eq!(Decision::Allowed.reason(), None);
        assert_eq!(
            Decision::Forbidden.reason(),
            Some("Access to the Resource is forbidden")
        );
        assert_eq!(
            Decision::Overtime.reason(),
            Some("Authorization check overtime")
        );
        assert_eq!(
            Decision::Unauthenticated("token expired".to_string()).reason(),
            Some("token expired")
        );
    }

    #[test]
    fn unauthenticated_denials_challenge_with_bearer() {
        let response = deny(&Decision::Unauthenticated("nope".to_string()));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok()),
            Some("Bearer")
        );
    }

    #[test]
    fn forbidden_denials_do_not_challenge() {
        let response = deny(&Decision::Forbidden);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[tokio::test]
    async fn a_bypass_chain_allows_without_a_header() {
        let chain = Arc::new(KeycloakAuth::bypass(&KeycloakConfig::default()));
        let ctx = Arc::new(AuthContext::default());

        assert_eq!(chain.decide(None, ctx).await, Decision::Allowed);
    }

    #[tokio::test]
    async fn a_missing_header_is_unauthenticated() {
        let chain = Arc::new(KeycloakAuth::new(
            &KeycloakConfig::default(),
            vec![AccessPredicate::Authenticated],
        ));
        let ctx = Arc::new(AuthContext::default());

        match chain.decide(None, ctx).await {
            Decision::Unauthenticated(reason) => {
                assert_eq!(reason, "no authorization header");
            }
            other => panic!("expected Unauthenticated, got {other:?}"),
        }
    }
}
