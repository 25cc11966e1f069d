pub mod config;
pub mod error;
pub mod predictor;
pub mod relay;
pub mod routes;
pub mod storage;
