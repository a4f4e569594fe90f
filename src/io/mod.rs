// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations for frame media and annotation documents.

pub mod media;
pub mod serialization;
