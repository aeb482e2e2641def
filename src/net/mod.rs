//! Networking modules for the component server's HTTP API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `types` defines the request/response bodies of the three endpoints and
//! `api` turns them into host requests. Transport itself belongs to the host.

pub mod api;
pub mod types;
