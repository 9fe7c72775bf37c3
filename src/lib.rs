pub mod airports;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod recommender;
pub mod reshape;
pub mod state;
pub mod summary;
pub mod types;
pub mod validation;
pub mod view;
