pub mod client;
pub mod discovery;
pub mod error;
pub mod jobs;
pub mod models;
pub mod normalize;
pub mod status;
pub mod submit;
