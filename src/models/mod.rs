// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Band, BoundingBox, Candidate, City, CityKey, EquipmentClass, LaneRequest, MarketCodeSource,
    MarketUsageSet, Pair, ScoringWeights, ShortfallPolicy, ShortfallReason, Side, SideDiagnostics, Tier,
};
pub use requests::{IssueReferenceRequest, LocationInput, PairLanesRequest};
pub use responses::{
    ErrorResponse, HealthResponse, LocationView, PairLanesResponse, PairView, PairingDiagnosticsView,
    ReferenceNumbersResponse,
};
