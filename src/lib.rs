// Library exports for picturebot
// This allows integration tests and external code to use picturebot modules

pub mod config;
pub mod db;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod generation;
pub mod http;
pub mod line;
pub mod pipeline;
pub mod quota;
pub mod routes;
pub mod sampler;
pub mod state;
pub mod text;
pub mod translation;
