//! Module implementing the storagebench HTTP host.
//!
//! The application is implemented in the [`App`] struct, which sets up routing and middleware. To
//! listen to incoming connections, use the [`server()`] function, which opens a TCP listener and
//! serves the application until termination is requested.

mod app;
mod middleware;
mod server;

pub use app::App;
pub use server::server;
