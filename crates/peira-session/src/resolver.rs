//! The session resolver.
//!
//! [`SessionResolver::resolve`] is a pure function of the supplied
//! credential plus the injected [`CredentialValidator`]; it holds no
//! state of its own and performs no I/O directly.

use peira_core::{Caller, PeiraError, PeiraResult, Session};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future returned by collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Validates a raw credential and produces session claims.
///
/// Implementations may suspend (token introspection, key lookup); the
/// resolver awaits the result before continuing.
///
/// # Contract
///
/// - `Ok(Some(session))` - the credential is valid and maps to a session
/// - `Ok(None)` - the credential is well-formed but not recognized
/// - `Err(_)` - the credential is structurally invalid (malformed,
///   expired); implementations fail with
///   [`PeiraError::Authentication`]
pub trait CredentialValidator: Send + Sync + 'static {
    /// Validates the raw credential.
    fn validate<'a>(&'a self, raw: &'a str) -> BoxFuture<'a, PeiraResult<Option<Session>>>;
}

/// Resolves an inbound credential into a [`Caller`].
///
/// # Example
///
/// ```
/// use peira_core::{Caller, Role, Session};
/// use peira_session::{SessionResolver, StaticCredentialValidator};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let validator = StaticCredentialValidator::new()
///     .with_session("tok-alice", Session::new("u-alice", Role::Admin));
/// let resolver = SessionResolver::new(Arc::new(validator));
///
/// assert!(resolver.resolve(None).await.unwrap().is_anonymous());
/// let caller = resolver.resolve(Some("tok-alice")).await.unwrap();
/// assert_eq!(caller.log_id(), "user:u-alice");
/// # });
/// ```
#[derive(Clone)]
pub struct SessionResolver {
    validator: Arc<dyn CredentialValidator>,
}

impl std::fmt::Debug for SessionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionResolver").finish_non_exhaustive()
    }
}

impl SessionResolver {
    /// Creates a resolver over the given validator collaborator.
    #[must_use]
    pub fn new(validator: Arc<dyn CredentialValidator>) -> Self {
        Self { validator }
    }

    /// Resolves the request's credential into a caller.
    ///
    /// An absent or blank credential yields [`Caller::Anonymous`] and
    /// never an error. A present credential that the validator rejects
    /// or does not recognize fails with [`PeiraError::Authentication`];
    /// no partial session is ever produced.
    pub async fn resolve(&self, credential: Option<&str>) -> PeiraResult<Caller> {
        let raw = match credential.map(str::trim) {
            None | Some("") => return Ok(Caller::Anonymous),
            Some(raw) => raw,
        };

        let session = self
            .validator
            .validate(raw)
            .await?
            .ok_or_else(|| PeiraError::authentication("credential not recognized"))?;

        if session.subject_id.is_empty() {
            return Err(PeiraError::authentication("credential carries no subject"));
        }

        tracing::debug!(subject = %session.subject_id, role = %session.role, "session resolved");
        Ok(Caller::Session(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticCredentialValidator;
    use peira_core::{ErrorKind, Role};

    struct FailingValidator;

    impl CredentialValidator for FailingValidator {
        fn validate<'a>(&'a self, _raw: &'a str) -> BoxFuture<'a, PeiraResult<Option<Session>>> {
            Box::pin(async { Err(PeiraError::authentication("malformed token")) })
        }
    }

    struct EmptySubjectValidator;

    impl CredentialValidator for EmptySubjectValidator {
        fn validate<'a>(&'a self, _raw: &'a str) -> BoxFuture<'a, PeiraResult<Option<Session>>> {
            Box::pin(async { Ok(Some(Session::new("", Role::Viewer))) })
        }
    }

    fn resolver_with(validator: impl CredentialValidator) -> SessionResolver {
        SessionResolver::new(Arc::new(validator))
    }

    #[tokio::test]
    async fn test_absent_credential_is_anonymous() {
        let resolver = resolver_with(StaticCredentialValidator::new());
        let caller = resolver.resolve(None).await.unwrap();
        assert!(caller.is_anonymous());
    }

    #[tokio::test]
    async fn test_blank_credential_is_anonymous() {
        let resolver = resolver_with(StaticCredentialValidator::new());
        let caller = resolver.resolve(Some("   ")).await.unwrap();
        assert!(caller.is_anonymous());
    }

    #[tokio::test]
    async fn test_valid_credential_yields_session() {
        let validator = StaticCredentialValidator::new()
            .with_session("tok-1", Session::new("u-1", Role::Editor));
        let resolver = resolver_with(validator);

        let caller = resolver.resolve(Some("tok-1")).await.unwrap();
        let session = caller.session().expect("session expected");
        assert_eq!(session.subject_id, "u-1");
        assert_eq!(session.role, Role::Editor);
    }

    #[tokio::test]
    async fn test_unrecognized_credential_is_authentication_error() {
        let resolver = resolver_with(StaticCredentialValidator::new());
        let err = resolver.resolve(Some("tok-unknown")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn test_invalid_credential_propagates_authentication_error() {
        let resolver = resolver_with(FailingValidator);
        let err = resolver.resolve(Some("garbage")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn test_empty_subject_never_becomes_a_session() {
        let resolver = resolver_with(EmptySubjectValidator);
        let err = resolver.resolve(Some("tok")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }
}
