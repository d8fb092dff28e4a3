pub mod catalog;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod orders;
pub mod push;
pub mod queue;
pub mod routes;
pub mod tasks;
pub mod webhook;
pub mod worker;

pub use routes::create_router;
