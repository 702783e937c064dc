// libs/scheduling-cell/src/services/mod.rs
pub mod availability;
pub mod booking;
pub mod slots;
pub mod turns;
