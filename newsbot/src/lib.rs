// Library interface for newsbot modules
// This allows tests and other binaries to import modules

pub mod aggregator;
pub mod chat;
pub mod conversation;
pub mod ingestion;
pub mod intent;
pub mod llm;
pub mod scraping;
pub mod server;
pub mod sessions;
