// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod block_detector;
pub mod dynamic_engine;
pub mod engine_factory;
pub mod fetch_executor;
pub mod static_engine;
pub mod traits;
