pub mod allocation;
pub mod auth;
pub mod cache;
pub mod config;
pub mod controllers;
pub mod coordinator;
pub mod database;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod store;
pub mod venue;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::auth::AuthService;
use crate::coordinator::ReservationCoordinator;
use crate::store::{InMemorySeatStore, InMemoryUserStore, PgSeatStore, PgUserStore, SeatStore, UserStore};
use crate::venue::SeatMap;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub coordinator: ReservationCoordinator,
    pub users: Arc<dyn UserStore>,
    pub auth: AuthService,
    pub cache: cache::CacheService,
    pub seat_map: SeatMap,
    pub config: config::Config,
}

impl AppState {
    /// Поднимает Postgres (если задан DATABASE_URL) и Redis (если задан REDIS_URL).
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let seat_map = config.reservation.seat_map()?;

        let (seats, users): (Arc<dyn SeatStore>, Arc<dyn UserStore>) = match &config.database.url {
            Some(url) => {
                let db = database::Database::prepare(url, &config.database, &seat_map).await?;
                let pg_seats = PgSeatStore::new(db.clone());
                let seats: Arc<dyn SeatStore> = Arc::new(pg_seats);
                let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(db));
                (seats, users)
            }
            None => {
                warn!("DATABASE_URL is not set, using in-memory stores");
                let seats: Arc<dyn SeatStore> = Arc::new(InMemorySeatStore::new(&seat_map));
                let users: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
                (seats, users)
            }
        };

        let cache = match &config.redis.url {
            Some(url) => {
                let redis = redis_client::RedisClient::new(url).await?;
                cache::CacheService::new(redis, config.redis.seats_ttl_seconds)
            }
            None => cache::CacheService::disabled(),
        };

        Ok(Arc::new(Self::from_parts(config, seat_map, seats, users, cache)))
    }

    /// Состояние целиком в памяти, без внешних сервисов.
    pub fn in_memory(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let seat_map = config.reservation.seat_map()?;
        let seats = Arc::new(InMemorySeatStore::new(&seat_map));
        let users = Arc::new(InMemoryUserStore::new());
        Ok(Arc::new(Self::from_parts(
            config,
            seat_map,
            seats,
            users,
            cache::CacheService::disabled(),
        )))
    }

    pub fn from_parts(
        config: config::Config,
        seat_map: SeatMap,
        seats: Arc<dyn SeatStore>,
        users: Arc<dyn UserStore>,
        cache: cache::CacheService,
    ) -> Self {
        Self {
            coordinator: ReservationCoordinator::new(seats, config.reservation.max_attempts),
            users,
            auth: AuthService::new(&config.auth),
            cache,
            seat_map,
            config,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Seat Reservation API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
