// src/handlers/mod.rs

pub mod auth;
pub mod documents;
pub mod health;
pub mod lookup;
pub mod manage;
pub mod papers;
pub mod uploads;
pub mod users;
pub mod wizard;
