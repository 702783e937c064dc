// libs/calendar-sync-cell/src/lib.rs
pub mod handlers;
pub mod models;
pub mod provider;
pub mod router;
pub mod services;
pub mod store;

pub use models::*;
pub use provider::{CalendarProvider, GoogleCalendarClient};
pub use services::retry::RetryWorker;
pub use services::synchronizer::HybridSynchronizer;
pub use store::{BookingContextSource, MemorySyncStore, SupabaseSyncStore, SyncRecordStore};
