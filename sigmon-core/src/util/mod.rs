// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `util` module provides shared utility functions.

pub mod bits;
