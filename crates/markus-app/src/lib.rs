// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod controller;
pub mod editor;
pub mod error;
pub mod ids;
pub mod model;
pub mod sort;
pub mod store;

pub use controller::*;
pub use editor::*;
pub use error::*;
pub use ids::*;
pub use model::*;
pub use sort::*;
pub use store::*;
