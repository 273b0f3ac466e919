// src/models/mod.rs

pub mod lookup;
pub mod paper;
pub mod question;
pub mod section;
pub mod user;
pub mod wizard;
