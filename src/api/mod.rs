pub mod health;
pub mod page;
pub mod routes;

pub use routes::{router, ApiState};
