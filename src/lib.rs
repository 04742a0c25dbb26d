//! Lane Diversity - geographic diversity pairing engine for freight lanes
//!
//! Given an origin and destination city, finds alternative pickup and
//! delivery cities nearby, each from a distinct freight market, and pairs
//! them into ranked alternative lanes.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    distance::{calculate_bounding_box, haversine_miles},
    EngineError, EngineSettings, PairingEngine, PairingOutcome, ScoringTables,
};
pub use crate::models::{City, EquipmentClass, LaneRequest, Pair, PairLanesRequest, PairLanesResponse, ShortfallPolicy};
