pub mod boards;
pub mod export_service;
pub mod fetcher;
pub mod file_store;
pub mod listing_service;
pub mod listing_store;
pub mod normalizer;
pub mod orchestrator;
pub mod sink;
