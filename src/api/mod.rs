//! API handlers for Rotonde REST endpoints

pub mod circulation;
pub mod connectors;
pub mod copies;
pub mod health;
pub mod limits;
pub mod lots;
pub mod openapi;
pub mod prolongations;
