//! Authentication: the global toggle, credential check, token binding and
//! the guard in front of the protected API group.

use std::convert::Infallible;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use subtle::ConstantTimeEq;

use crate::config::AuthConfig;
use crate::http::origin;
use crate::http::response::{Guard, Rejection};
use crate::security::rate_limit::LoginThrottle;
use crate::security::tokens::TokenStore;

struct Inner {
    enabled: bool,
    username: String,
    password: String,
    cookie_name: String,
    secure_cookie: bool,
    trust_forwarded_for: bool,
    store: Arc<TokenStore>,
    throttle: LoginThrottle,
}

/// Shared authentication state. Cheap to clone.
#[derive(Clone)]
pub struct Authenticator {
    inner: Arc<Inner>,
}

impl Authenticator {
    /// Build from configuration. `secure_cookie` marks the session cookie
    /// `Secure`; set it when the listener terminates TLS.
    pub fn from_config(config: &AuthConfig, secure_cookie: bool) -> Self {
        let store = Arc::new(TokenStore::new(Duration::from_secs(config.token_ttl_secs)));
        Self::with_store(config, secure_cookie, store)
    }

    /// Build around an existing token store.
    pub fn with_store(config: &AuthConfig, secure_cookie: bool, store: Arc<TokenStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                enabled: config.enabled,
                username: config.username.clone(),
                password: config.password.clone(),
                cookie_name: config.cookie_name.clone(),
                secure_cookie,
                trust_forwarded_for: config.trust_forwarded_for,
                store,
                throttle: LoginThrottle::per_minute(config.login_attempts_per_minute),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.inner.store
    }

    pub fn cookie_name(&self) -> &str {
        &self.inner.cookie_name
    }

    /// Address a token is bound to for this request.
    pub fn client_addr<B>(&self, req: &Request<B>) -> Option<IpAddr> {
        origin::client_addr(req, self.inner.trust_forwarded_for)
    }

    /// Token from the session cookie, if any.
    pub fn token_from(&self, headers: &HeaderMap) -> Option<String> {
        CookieJar::from_headers(headers)
            .get(&self.inner.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Whether the request carries a valid token bound to its client address.
    /// Always true when authentication is disabled.
    pub fn is_authenticated<B>(&self, req: &Request<B>) -> bool {
        self.verify(req.headers(), self.client_addr(req))
    }

    /// [`Self::is_authenticated`] over already-extracted headers and address.
    pub fn verify(&self, headers: &HeaderMap, client: Option<IpAddr>) -> bool {
        if !self.inner.enabled {
            return true;
        }
        let Some(token) = self.token_from(headers) else {
            return false;
        };
        let Some(client) = client else {
            tracing::warn!("No client address available for token check");
            return false;
        };
        self.inner.store.validate(&token, client)
    }

    /// Enforce authentication on behalf of `guard`.
    pub fn authorize<B>(&self, req: &Request<B>, guard: Guard) -> Result<(), Rejection> {
        if self.is_authenticated(req) {
            Ok(())
        } else {
            Err(Rejection::Unauthenticated { guard })
        }
    }

    /// Constant-time credential comparison.
    pub fn check_credentials(&self, username: &str, password: &str) -> bool {
        let user_ok = constant_time_eq(username.as_bytes(), self.inner.username.as_bytes());
        let pass_ok = constant_time_eq(password.as_bytes(), self.inner.password.as_bytes());
        user_ok & pass_ok
    }

    /// Consume one login attempt for `client`.
    pub fn allow_login_attempt(&self, client: IpAddr) -> bool {
        self.inner.throttle.check(client)
    }

    /// Session cookie carrying `token`.
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.inner.cookie_name.clone(), token);
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Strict);
        cookie.set_secure(self.inner.secure_cookie);
        cookie.set_path("/");
        cookie
    }

    /// Cookie that clears the session cookie in the browser.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = self.session_cookie(String::new());
        cookie.make_removal();
        cookie
    }

    /// Periodically drop expired tokens.
    pub fn spawn_purge_task(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(&self.inner.store);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.purge_expired();
                if removed > 0 {
                    tracing::info!(removed, remaining = store.len(), "Expired tokens purged");
                }
            }
        })
    }
}

/// Extractor for the client address tokens are bound to.
#[derive(Clone, Copy, Debug)]
pub struct ClientAddr(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for ClientAddr
where
    Authenticator: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Authenticator::from_ref(state);
        Ok(ClientAddr(origin::client_addr_from_parts(
            &parts.headers,
            &parts.extensions,
            auth.inner.trust_forwarded_for,
        )))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Guard for the protected API group.
pub async fn auth_middleware(
    State(auth): State<Authenticator>,
    req: Request,
    next: Next,
) -> Response {
    match auth.authorize(&req, Guard::Auth) {
        Ok(()) => next.run(req).await,
        Err(rejection) => {
            tracing::debug!(path = %req.uri().path(), "Unauthenticated request rejected");
            rejection.into_response()
        }
    }
}
