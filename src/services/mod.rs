// src/services/mod.rs

pub mod batch;
pub mod blueprint;
pub mod paper_store;
pub mod reconcile;
pub mod section_store;
pub mod wizard_store;
