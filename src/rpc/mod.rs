//! Raw JSON-RPC layer: envelopes, batch bodies and permissive reply parsing
//!
//! Requests go out exactly as built, including deliberately wrong method
//! names and malformed parameters, so this layer bypasses the typed provider.

pub mod client;
pub mod envelope;

pub use client::RpcClient;
pub use envelope::{compact, parse_reply, JsonRpcRequest, RpcPayload};
