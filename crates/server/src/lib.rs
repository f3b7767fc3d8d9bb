pub mod auth;
pub mod errors;
pub mod openapi;
pub mod routes;
pub mod startup;
pub mod state;
pub mod timing;

pub use routes::build_router;
pub use startup::run;
pub use state::ServerState;
