//! The external identity provider that users log in with.
//!
//! The app never sees passwords. It redirects the browser to the provider,
//! which sends it back to the callback route with a one-time code that is
//! exchanged for the user's profile.

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{
    Error,
    auth::{Identity, UserId},
    config::AuthConfig,
};

/// The scopes requested from the identity provider.
const SCOPES: &str = "openid profile email offline";

/// How long to wait for the identity provider before giving up.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can authenticate users on behalf of the app.
#[async_trait]
pub trait IdentityProvider: Debug + Send + Sync {
    /// The URL to send the browser to for logging in.
    ///
    /// `state` is echoed back to the callback and must be checked there.
    fn login_url(&self, state: &str) -> Result<Url, Error>;

    /// The URL to send the browser to for creating an account.
    fn register_url(&self, state: &str) -> Result<Url, Error>;

    /// The URL to send the browser to for ending the provider's own session.
    fn logout_url(&self) -> Result<Url, Error>;

    /// Exchange the one-time `code` from the callback for the user's identity.
    async fn exchange_code(&self, code: &str) -> Result<Identity, Error>;
}

/// An [IdentityProvider] using the OAuth 2.0 authorization code flow.
#[derive(Debug, Clone)]
pub struct OAuthIdentityProvider {
    client: Client,
    config: AuthConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserProfile {
    id: String,
    given_name: Option<String>,
    family_name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
}

impl From<UserProfile> for Identity {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: UserId::new(&profile.id),
            given_name: profile.given_name.unwrap_or_default(),
            family_name: profile.family_name.unwrap_or_default(),
            email: profile.email.unwrap_or_default(),
            picture: profile.picture,
        }
    }
}

fn provider_error(error: impl ToString) -> Error {
    Error::IdentityProvider(error.to_string())
}

impl OAuthIdentityProvider {
    /// Create a provider client with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns an [Error::IdentityProvider] if the HTTP client cannot be built.
    pub fn new(config: AuthConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(provider_error)?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.config.domain.join(path).map_err(provider_error)
    }

    fn authorization_url(&self, state: &str, prompt: Option<&str>) -> Result<Url, Error> {
        let mut url = self.endpoint("oauth2/auth")?;

        let mut params = vec![
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("scope", SCOPES),
            ("state", state),
        ];

        if let Some(prompt) = prompt {
            params.push(("prompt", prompt));
        }

        let query = serde_urlencoded::to_string(&params).map_err(provider_error)?;
        url.set_query(Some(&query));

        Ok(url)
    }
}

#[async_trait]
impl IdentityProvider for OAuthIdentityProvider {
    fn login_url(&self, state: &str) -> Result<Url, Error> {
        self.authorization_url(state, None)
    }

    fn register_url(&self, state: &str) -> Result<Url, Error> {
        self.authorization_url(state, Some("create"))
    }

    fn logout_url(&self) -> Result<Url, Error> {
        let mut url = self.endpoint("logout")?;
        let query = serde_urlencoded::to_string([(
            "redirect",
            self.config.logout_redirect_url.as_str(),
        )])
        .map_err(provider_error)?;
        url.set_query(Some(&query));

        Ok(url)
    }

    async fn exchange_code(&self, code: &str) -> Result<Identity, Error> {
        let token: TokenResponse = self
            .client
            .post(self.endpoint("oauth2/token")?)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_url.as_str()),
            ])
            .send()
            .await
            .map_err(provider_error)?
            .error_for_status()
            .map_err(provider_error)?
            .json()
            .await
            .map_err(provider_error)?;

        let profile: UserProfile = self
            .client
            .get(self.endpoint("oauth2/v2/user_profile")?)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(provider_error)?
            .error_for_status()
            .map_err(provider_error)?
            .json()
            .await
            .map_err(provider_error)?;

        tracing::debug!("exchanged authorization code for user {}", profile.id);

        Ok(profile.into())
    }
}
