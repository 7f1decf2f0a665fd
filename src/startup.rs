//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower::ServiceBuilder;

use crate::application::services::{RoomService, RoomServiceImpl};
use crate::config::{Settings, StorageBackend};
use crate::infrastructure::database;
use crate::infrastructure::memory::MemoryRoomStore;
use crate::infrastructure::repositories::PgRoomStore;
use crate::presentation::http::{handlers, routes};
use crate::presentation::middleware::{cors, logging};
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<dyn RoomService>,
    /// Present only for the postgres backend
    pub db: Option<PgPool>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// State backed by a process-local store; `seed` rooms are created up front.
    pub fn in_memory(settings: Settings, store: Arc<MemoryRoomStore>) -> Self {
        for name in &settings.rooms.seed {
            store.create_room(name);
        }
        let rooms = RoomServiceImpl::new(
            store,
            snowflake_generator(&settings),
            settings.rooms.lock_timeout(),
        );

        Self {
            rooms: Arc::new(rooms),
            db: None,
            settings: Arc::new(settings),
        }
    }

    /// State backed by PostgreSQL.
    pub fn postgres(settings: Settings, pool: PgPool) -> Self {
        let store = Arc::new(PgRoomStore::new(pool.clone()));
        let rooms = RoomServiceImpl::new(
            store,
            snowflake_generator(&settings),
            settings.rooms.lock_timeout(),
        );

        Self {
            rooms: Arc::new(rooms),
            db: Some(pool),
            settings: Arc::new(settings),
        }
    }
}

fn snowflake_generator(settings: &Settings) -> Arc<SnowflakeGenerator> {
    Arc::new(SnowflakeGenerator::new(
        settings.snowflake.machine_id as u64,
        settings.snowflake.epoch,
    ))
}

/// Build the full router with middleware for the given state
pub fn build_router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(logging::create_trace_layer())
        .layer(cors::create_cors_layer(&state.settings.cors));

    routes::create_router(state).layer(middleware)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        handlers::health::init_server_start();

        let state = match settings.rooms.storage {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory room storage; state is lost on restart");
                AppState::in_memory(settings.clone(), Arc::new(MemoryRoomStore::new()))
            }
            StorageBackend::Postgres => {
                let pool = database::create_pool(&settings.database).await?;
                tracing::info!("Database connection pool created");

                if settings.database.run_migrations {
                    database::run_migrations(&pool).await?;
                    tracing::info!("Database migrations applied");
                }

                AppState::postgres(settings.clone(), pool)
            }
        };

        let router = build_router(state);

        // Bind to address
        let addr: SocketAddr = settings.server_addr().parse()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
