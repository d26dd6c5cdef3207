pub mod artifacts;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod publisher;
pub mod source;
pub mod workspace;
