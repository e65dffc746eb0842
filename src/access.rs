//! Access predicates over decoded claims, and the request-scoped
//! context they record the authenticated identity into.

use parking_lot::Mutex;

use crate::claims::KeycloakClaims;

/// One access rule. `service` scopes `role` to a resource-access
/// entry; `uid` stands alone. At most one of `role`/`uid` is
/// meaningful per rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessTuple {
    /// Service (resource) name the role check is scoped to.
    pub service: String,
    /// Required role within the service.
    pub role: String,
    /// Required preferred username.
    pub uid: String,
}

/// Request-scoped identity recorder.
///
/// Every predicate invocation records the decoded claims and preferred
/// username here, whatever its boolean outcome, so application code can
/// read who the caller was even on a denial path.
#[derive(Debug, Default)]
pub struct AuthContext {
    recorded: Mutex<Option<Recorded>>,
}

#[derive(Debug, Clone)]
struct Recorded {
    token: KeycloakClaims,
    uid: String,
}

impl AuthContext {
    /// Record the decoded identity.
    pub fn record(&self, claims: &KeycloakClaims) {
        *self.recorded.lock() = Some(Recorded {
            token: claims.clone(),
            uid: claims.preferred_username.clone(),
        });
    }

    /// Decoded claim set, once a predicate has run.
    #[must_use]
    pub fn token(&self) -> Option<KeycloakClaims> {
        self.recorded.lock().as_ref().map(|r| r.token.clone())
    }

    /// Preferred username, once a predicate has run.
    #[must_use]
    pub fn uid(&self) -> Option<String> {
        self.recorded.lock().as_ref().map(|r| r.uid.clone())
    }
}

/// A composable access rule over decoded claims.
///
/// Predicates are pure over the claims apart from recording the
/// identity into the [`AuthContext`]. Empty rule lists never match.
#[derive(Debug, Clone)]
pub enum AccessPredicate {
    /// Matches when any tuple's role is granted for its service.
    Roles(Vec<AccessTuple>),
    /// Matches when any tuple's uid equals the preferred username.
    Uids(Vec<AccessTuple>),
    /// Matches when any named role is granted realm-wide.
    Realm(Vec<String>),
    /// Matches every authenticated caller.
    Authenticated,
    /// Matches when any child predicate matches, left to right.
    Any(Vec<AccessPredicate>),
}

impl AccessPredicate {
    /// Evaluate against decoded claims, recording the identity into
    /// `ctx` regardless of the outcome.
    pub fn evaluate(&self, claims: &KeycloakClaims, ctx: &AuthContext) -> bool {
        ctx.record(claims);
        match self {
            Self::Roles(tuples) => tuples
                .iter()
                .any(|t| claims.has_service_role(&t.service, &t.role)),
            Self::Uids(tuples) => tuples.iter().any(|t| t.uid == claims.preferred_username),
            Self::Realm(roles) => roles.iter().any(|r| claims.has_realm_role(r)),
            Self::Authenticated => true,
            Self::Any(children) => children.iter().any(|p| p.evaluate(claims, ctx)),
        }
    }
}
