// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data model.

pub mod annotation;
pub mod document;
pub mod grounding;
pub mod qa;
pub mod time_segment;
pub mod track;
