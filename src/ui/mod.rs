// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI components for the annotator.

pub mod assignment;
pub mod canvas;
pub mod grounding_panel;
pub mod qa_panel;
pub mod timeline;
