//! Settings for talking to the external identity provider.

use reqwest::Url;

/// Where the identity provider lives and how this app is registered with it.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// The provider's base URL, e.g. "https://example.kinde.com".
    pub domain: Url,
    /// The OAuth client ID issued by the provider.
    pub client_id: String,
    /// The OAuth client secret issued by the provider.
    pub client_secret: String,
    /// Where the provider sends the user after they log in, i.e. this app's callback route.
    pub redirect_url: Url,
    /// Where the provider sends the user after they log out.
    pub logout_redirect_url: Url,
}
