pub mod concurrency;
pub mod identifier;
pub mod logging;
pub mod time;
