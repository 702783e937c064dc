use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use calendar_sync_cell::{
    GoogleCalendarClient, HybridSynchronizer, RetryWorker, SupabaseSyncStore, SyncConfig,
};
use scheduling_cell::handlers::SchedulingState;
use scheduling_cell::{
    AvailabilityCache, AvailabilityChecker, BookingService, ClinicSchedule, SlotGenerator,
    SupabaseSchedulingStore, TurnAllocator,
};
use shared_config::AppConfig;
use shared_database::SupabaseClient;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic scheduler API server");

    // Load configuration
    let config = AppConfig::from_env();
    if !config.is_calendar_configured() {
        warn!("Calendar credentials missing; projections will queue for retry");
    }

    // Storage
    let supabase = Arc::new(SupabaseClient::new(&config));
    let scheduling_store = Arc::new(SupabaseSchedulingStore::new(supabase.clone()));
    let sync_store = Arc::new(SupabaseSyncStore::new(supabase.clone()));

    // Calendar projection
    let provider = Arc::new(GoogleCalendarClient::new(&config));
    let synchronizer = Arc::new(HybridSynchronizer::new(
        provider,
        sync_store.clone(),
        SyncConfig::from_app(&config),
    ));
    let retry_worker = Arc::new(RetryWorker::new(
        synchronizer.clone(),
        sync_store,
        scheduling_store.clone(),
    ));

    // Scheduling services
    let cache = Arc::new(AvailabilityCache::default());
    let allocator = Arc::new(TurnAllocator::new(scheduling_store.clone()));
    let checker = Arc::new(AvailabilityChecker::new(
        scheduling_store.clone(),
        ClinicSchedule::default(),
        cache.clone(),
    ));
    let slots = Arc::new(SlotGenerator::new(allocator.clone(), checker.clone()));
    let bookings = Arc::new(BookingService::new(
        scheduling_store,
        allocator.clone(),
        checker,
        cache,
        synchronizer.clone(),
    ));

    let scheduling_state = Arc::new(SchedulingState {
        slots,
        bookings,
        allocator,
    });
    let sync_state = Arc::new(calendar_sync_cell::handlers::SyncState {
        synchronizer,
        retry_worker: retry_worker.clone(),
    });

    // Background reconciliation loop
    let worker = retry_worker.clone();
    tokio::spawn(async move {
        if let Err(e) = worker.start().await {
            tracing::error!("Retry worker stopped: {}", e);
        }
    });

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(scheduling_state, sync_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
