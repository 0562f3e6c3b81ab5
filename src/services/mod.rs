pub mod job;
pub mod logger;
pub mod probe;
pub mod settings;
