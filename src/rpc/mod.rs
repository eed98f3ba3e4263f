// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! RPC endpoint discovery and selection.
//!
//! This module provides:
//! - Candidate discovery from a public chain registry
//! - JSON-RPC liveness probing
//! - Fastest-endpoint selection with a guaranteed fallback

pub mod probe;
pub mod registry;
pub mod selector;

pub use probe::{EndpointProber, JsonRpcProber, ProbeError};
pub use registry::{ChainRegistry, ChainlistRegistry};
pub use selector::{EndpointSelector, ProbeResult, PROBE_TIMEOUT};
