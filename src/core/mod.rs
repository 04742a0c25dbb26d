// Core algorithm exports
pub mod candidates;
pub mod distance;
pub mod engine;
pub mod market;
pub mod pairing;
pub mod scoring;
pub mod selector;
pub mod tables;

pub use candidates::{CandidateSource, SourceSettings};
pub use distance::{calculate_bounding_box, haversine_miles, is_within_bounding_box};
pub use engine::{EngineError, EngineSettings, PairingEngine, PairingOutcome};
pub use market::{synthesize_market_code, MarketResolver};
pub use pairing::{assemble_pairs, Assembly};
pub use scoring::calculate_freight_score;
pub use selector::{build_tier_plan, DiversitySelector, SideSelection, DEFAULT_BANDS, DEFAULT_CEILINGS};
pub use tables::{ScoringTables, TablesError};
