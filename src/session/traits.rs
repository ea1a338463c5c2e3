use std::future::Future;

use crate::types::FederatedIdentity;

/// App-provided federated identity provider (Google sign-in).
///
/// # Example
///
/// ```rust,ignore
/// impl FederatedIdentityProvider for GoogleSignIn {
///     async fn sign_in(
///         &self,
///     ) -> Result<FederatedIdentity, Box<dyn std::error::Error + Send + Sync>> {
///         let credential = self.sdk.sign_in_with_popup().await?;
///         Ok(FederatedIdentity::new(credential.id_token)
///             .with_email(credential.email))
///     }
/// }
/// ```
pub trait FederatedIdentityProvider: Send + Sync {
    /// Runs the provider's sign-in flow and returns the identity token.
    fn sign_in(
        &self,
    ) -> impl Future<Output = Result<FederatedIdentity, Box<dyn std::error::Error + Send + Sync>>>
           + Send;
}
