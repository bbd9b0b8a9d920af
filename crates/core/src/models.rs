pub mod appointment;
pub mod identity;
pub mod profile;
pub mod schedule;
pub mod slot;
