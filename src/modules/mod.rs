pub mod post;
pub mod transcode;
