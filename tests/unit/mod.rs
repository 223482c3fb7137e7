// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod config_test;
pub mod dedup_ledger_test;
pub mod identity_rotator_test;
