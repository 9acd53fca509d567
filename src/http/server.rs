//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: public, protected and `/ws` route groups
//! - Wire up the edge chain (body limit, security headers, CORS, CSRF)
//! - Wire up request ids, tracing and timeouts around it
//! - Own the token store and event hub for the process lifetime
//! - Serve over plain TCP or TLS with graceful shutdown

use axum::{
    extract::FromRef,
    middleware,
    routing::get,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api;
use crate::config::AppConfig;
use crate::http::cors::cors_guard;
use crate::http::csrf::csrf_guard;
use crate::http::request::make_request_span;
use crate::http::websocket::{ws_guard, ws_handler};
use crate::hub::EventHub;
use crate::security::auth::{auth_middleware, Authenticator};
use crate::security::headers::security_headers;
use crate::security::limits::body_limit;

/// Grace period for in-flight TLS connections at shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Authenticator,
    pub hub: EventHub,
}

impl FromRef<AppState> for Authenticator {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for EventHub {
    fn from_ref(state: &AppState) -> Self {
        state.hub.clone()
    }
}

/// HTTP server for the management UI and API.
pub struct HttpServer {
    config: Arc<AppConfig>,
    state: AppState,
    api_routes: Router<AppState>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        let config = Arc::new(config);
        let auth = Authenticator::from_config(&config.auth, config.listener.tls.is_some());
        let hub = EventHub::new(&config.hub);

        let state = AppState {
            config: Arc::clone(&config),
            auth,
            hub,
        };

        Self {
            config,
            state,
            api_routes: Router::new(),
        }
    }

    /// Mount business routes behind the auth guard. May be called repeatedly;
    /// paths must not collide with the built-in routes.
    pub fn with_api(mut self, routes: Router<AppState>) -> Self {
        self.api_routes = self.api_routes.merge(routes);
        self
    }

    /// Handle business services use to push events to connected clients.
    pub fn hub(&self) -> EventHub {
        self.state.hub.clone()
    }

    pub fn authenticator(&self) -> Authenticator {
        self.state.auth.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build the complete router with the edge chain applied.
    pub fn router(&self) -> Router {
        Self::build_router(&self.config, self.state.clone(), self.api_routes.clone())
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Outermost first: request id → trace → body limit → security headers
    /// → CORS → CSRF → timeout → routes. The auth guard and the WebSocket
    /// guard are route layers on their own groups.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState, api_routes: Router<AppState>) -> Router {
        let protected = api::protected_routes()
            .merge(api_routes)
            .route_layer(middleware::from_fn_with_state(
                state.auth.clone(),
                auth_middleware,
            ));

        let ws = Router::new()
            .route("/ws", get(ws_handler))
            .route_layer(middleware::from_fn_with_state(state.auth.clone(), ws_guard));

        let mut routes = api::public_routes().merge(ws).merge(protected);
        if let Some(dir) = &config.assets.dir {
            let index = Path::new(dir).join("index.html");
            routes = routes.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
        }

        let mut router = routes
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn(csrf_guard))
            .layer(middleware::from_fn(cors_guard));

        if config.security.enable_headers {
            router = router.layer(security_headers());
        }

        router
            .layer(body_limit(config.security.max_body_size))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            tls = self.config.listener.tls.is_some(),
            auth_enabled = self.state.auth.is_enabled(),
            "HTTP server starting"
        );

        let purge = self
            .state
            .auth
            .spawn_purge_task(Duration::from_secs(self.config.auth.purge_interval_secs));

        let hub = self.state.hub.clone();
        let stop = async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            let closed = hub.close_all();
            tracing::info!(closed, "WebSocket clients disconnected");
        };

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        let served = match &self.config.listener.tls {
            None => axum::serve(listener, app).with_graceful_shutdown(stop).await,
            Some(tls) => {
                let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;
                let handle = axum_server::Handle::new();
                let trigger = handle.clone();
                tokio::spawn(async move {
                    stop.await;
                    trigger.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
                });
                axum_server::from_tcp_rustls(listener.into_std()?, rustls)
                    .handle(handle)
                    .serve(app)
                    .await
            }
        };

        purge.abort();
        self.state.auth.tokens().clear();
        served?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
