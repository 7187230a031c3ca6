// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The framed transport connecting the controller to each agent process
//! (spec §6).

pub mod channel;
pub mod codec;
pub mod frame;

pub use channel::{AgentChannel, AgentInbound};
pub use codec::{Command, CommandResult};
pub use frame::{Frame, FrameKind};
