// SPDX-License-Identifier: MIT OR Apache-2.0
//! CLI command implementations.

pub mod common;
pub mod dump;
pub mod generate;
pub mod import;
pub mod init;
pub mod layers;
pub mod nodes;
