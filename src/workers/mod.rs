pub mod stats;
pub mod transcoder;
