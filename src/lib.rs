// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod builtin;    // ready-made sources and sinks
pub mod config;     // runtime configuration
pub mod errors;     // contract violations and config errors
pub mod observability;
pub mod pipeline;   // rewirable stream networks
pub mod stream;     // lifecycle-enforcing stream wrappers
pub mod transform;  // buffering transform + schedulers
