// libs/scheduling-cell/src/lib.rs
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::*;
pub use services::availability::{AvailabilityCache, AvailabilityChecker};
pub use services::booking::BookingService;
pub use services::slots::SlotGenerator;
pub use services::turns::TurnAllocator;
pub use store::{MemorySchedulingStore, SchedulingStore, SupabaseSchedulingStore};
