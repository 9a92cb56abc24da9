use std::{net::SocketAddr, sync::Arc};

use axum::{http::StatusCode, middleware, routing::get, Router};
use sqlx::{migrate::MigrateError, sqlite::SqlitePoolOptions, SqlitePool};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::{
    auth::{auth_middleware, DatabaseSessionGuard, JwtSessionGuard, SessionGuard},
    button::CustomButton,
    catalog::list_endpoints,
    configuration::{DatabaseSettings, SessionBackend, Settings},
    document::Document,
    endpoint,
    store::OwnedResource,
};

pub struct Application {
    listener: TcpListener,
    router: Router,
    port: u16,
}

pub struct ApplicationState {
    pub pool: SqlitePool,
}

impl Application {
    pub async fn build(settings: Settings) -> Result<Self, std::io::Error> {
        let connection_pool = get_connection_pool(&settings.database);
        run_migrations(&connection_pool)
            .await
            .map_err(std::io::Error::other)?;

        let session_cookie = settings.application.session_cookie.clone();
        let guard: Arc<dyn SessionGuard> = match settings.application.session_backend {
            SessionBackend::Jwt => Arc::new(JwtSessionGuard::new(
                settings.application.signing_key.clone(),
                session_cookie,
            )),
            SessionBackend::Database => Arc::new(DatabaseSessionGuard::new(
                connection_pool.clone(),
                session_cookie,
            )),
        };

        Self::build_with_guard(settings, connection_pool, guard).await
    }

    /// Builds the application around an already constructed session guard.
    pub async fn build_with_guard(
        settings: Settings,
        pool: SqlitePool,
        guard: Arc<dyn SessionGuard>,
    ) -> Result<Self, std::io::Error> {
        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );

        let listener = TcpListener::bind(address).await?;
        let port = listener.local_addr()?.port();

        let application_state = Arc::new(ApplicationState { pool });
        let router = router(application_state, guard);

        Ok(Self {
            listener,
            router,
            port,
        })
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        tracing::info!("listening on {}", self.listener.local_addr()?);
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

pub fn router(state: Arc<ApplicationState>, guard: Arc<dyn SessionGuard>) -> Router {
    Router::new()
        .route("/api/session", get(endpoint::session))
        .merge(collection::<CustomButton>("/api/custom-buttons"))
        .merge(collection::<Document>("/api/documents"))
        .route_layer(middleware::from_fn_with_state(guard, auth_middleware))
        .route("/api", get(list_endpoints))
        .route("/health_check", get(|| async { StatusCode::OK }))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}

fn collection<R: OwnedResource>(path: &str) -> Router<Arc<ApplicationState>> {
    Router::new()
        .route(
            path,
            get(endpoint::list::<R>).post(endpoint::create::<R>),
        )
        .route(
            &format!("{path}/:id"),
            get(endpoint::read::<R>)
                .put(endpoint::update::<R>)
                .delete(endpoint::delete::<R>),
        )
}

pub fn get_connection_pool(settings: &DatabaseSettings) -> SqlitePool {
    SqlitePoolOptions::new().connect_lazy_with(settings.connect_options())
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
