pub mod postgres;
pub mod schedule;
