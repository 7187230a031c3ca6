// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Filter construction and XML serialization for selecting tests within a
//! package (spec §4.G, §8 boundary scenarios 3–4).
//!
//! A [`Filter`] is a boolean combination of exact test-name selections. It
//! is built with [`FilterBuilder`] and serialized to the small XML grammar a
//! driver passes through to its framework adapter unexamined.

mod builder;
pub mod errors;
mod expression;

pub use builder::FilterBuilder;
pub use expression::Filter;
