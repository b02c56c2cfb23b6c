pub mod action;
pub mod audit;
pub mod error;
pub mod executor;
pub mod interpret;
pub mod llm;
pub mod media;
pub mod orchestrator;
pub mod paths;
pub mod session;
pub mod settings;
pub mod util;

#[cfg(feature = "server")]
pub mod api;
