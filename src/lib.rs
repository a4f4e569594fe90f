// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video QA grounding annotation engine.
//!
//! Annotators pick a time window of a video, sample it at a fixed frame
//! interval, draw tracked bounding boxes on the sampled frames and attach
//! question/answer pairs grounded in those tracks and frames.
//!
//! The engine is UI-agnostic: [`models::document::Document`] holds all
//! annotation state, [`interaction::InteractionController`] turns pointer
//! gestures into store operations, and [`io::serialization`] reads and
//! writes documents. The desktop shell lives in the binary.

pub mod config;
pub mod error;
pub mod history;
pub mod interaction;
pub mod io;
pub mod models;
pub mod util;

pub use error::{Error, ErrorKind, Result, Violation};
