//! Route configuration for the Carebridge API.

pub mod api_routes;

pub use api_routes::create_routes;
