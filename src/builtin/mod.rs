// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Ready-made sources and sinks.

mod sinks;
mod sources;

pub use sinks::{null_sink, sync_sink};
pub use sources::{error_source, source_from_chunks, source_from_string};
