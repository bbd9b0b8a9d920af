pub mod appointment;
pub mod profile;
pub mod schedule;
pub mod slot;
