// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The in-worker driver contract (spec §3, §4.G): loads a test binary,
//! resolves its test framework via a name-indexed adapter registry, and
//! dispatches the five driver operations to it. [`wire`] carries operation
//! arguments over the [`crate::transport`] frame payloads; [`worker_loop`]
//! runs the dispatch loop inside the worker process; [`proxy`] is the
//! controller-side typed handle a caller actually calls these operations
//! through.

pub mod adapter;
mod context;
mod nunit;
pub mod proxy;
pub mod wire;
pub mod worker_loop;

pub use adapter::{FrameworkAdapter, FrameworkAdapterFactory, LoadFailure, ProgressSink};
pub use context::{DriverContext, DriverState};
pub use proxy::DriverProxy;
