// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core runner logic for the test execution engine.
//!
//! This crate implements the four tightly-coupled subsystems that carry the
//! real engineering of the engine: runtime identification and matching
//! ([`runtime_id`]), agent lifecycle and dispatch ([`agent`]), the extension
//! registry ([`extension`]), and the in-worker driver contract
//! ([`driver`]). [`package`] and [`transport`] are the data model and the
//! framed channel that connect them.

pub mod agent;
pub mod binary_inspector;
pub mod driver;
pub mod errors;
pub mod extension;
mod helpers;
pub mod host;
pub mod package;
pub mod runtime_id;
pub mod transport;
