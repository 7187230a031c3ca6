// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A thin controller binary that loads a test package description, builds
//! the engine, and drives a run to completion.
//!
//! For the runtime identification, agent lifecycle, extension registry, and
//! driver contract this binary wires together, see `engine-core`.

mod dispatch;
mod errors;

pub use dispatch::{run, Args};
pub use errors::CliError;
