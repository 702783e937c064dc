// libs/calendar-sync-cell/src/services/mod.rs
pub mod retry;
pub mod synchronizer;
