//! HTTP API served to the dashboard frontend and `bess-cli`.

mod server;
mod v0;

pub use server::{SharedState, build_router, serve};
