//! Gateway: HTTP surface for the VK Callback API.
//!
//! Single port serves `POST /callback` (event delivery) and `GET /` (health).

mod server;

pub use server::{router, run_gateway, run_gateway_on, GatewayState};
