// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod forms;
pub mod funnel;
pub mod gallery;
pub mod ids;
pub mod inventory;
pub mod model;
pub mod state;
pub mod storage;

pub use forms::*;
pub use funnel::*;
pub use gallery::*;
pub use ids::*;
pub use inventory::*;
pub use model::*;
pub use state::*;
pub use storage::{DurableStorage, MemoryStorage};
