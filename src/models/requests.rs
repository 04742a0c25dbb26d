use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::ShortfallPolicy;

/// City + region pair as supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LocationInput {
    #[validate(length(min = 1, max = 128))]
    pub city: String,
    #[validate(length(min = 1, max = 8))]
    #[serde(alias = "state")]
    pub region: String,
}

/// Request to pair alternative lanes
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PairLanesRequest {
    #[validate(nested)]
    pub origin: LocationInput,
    #[validate(nested)]
    pub destination: LocationInput,
    #[validate(length(min = 1))]
    #[serde(alias = "equipment_class", rename = "equipmentClass")]
    pub equipment_class: String,
    #[validate(range(min = 1, max = 50))]
    #[serde(alias = "required_pairs", rename = "requiredPairs", default)]
    pub required_pairs: Option<u16>,
    #[validate(range(exclusive_min = 0.0, max = 500.0))]
    #[serde(alias = "max_radius", rename = "maxRadius", default)]
    pub max_radius: Option<f64>,
    #[serde(alias = "shortfall_policy", rename = "shortfallPolicy", default)]
    pub shortfall_policy: Option<ShortfallPolicy>,
}

/// Request to issue reference numbers
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IssueReferenceRequest {
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_count")]
    pub count: u16,
}

fn default_count() -> u16 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_camel_case() {
        let json = r#"{
            "origin": {"city": "Columbus", "region": "OH"},
            "destination": {"city": "Nashville", "state": "TN"},
            "equipmentClass": "V",
            "requiredPairs": 4,
            "shortfallPolicy": "never_pad"
        }"#;
        let req: PairLanesRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.destination.region, "TN");
        assert_eq!(req.required_pairs, Some(4));
        assert_eq!(req.shortfall_policy, Some(ShortfallPolicy::NeverPad));
        assert!(req.max_radius.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_request_validation_rejects_empty_city() {
        let json = r#"{
            "origin": {"city": "", "region": "OH"},
            "destination": {"city": "Nashville", "region": "TN"},
            "equipmentClass": "V"
        }"#;
        let req: PairLanesRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_request_validation_rejects_zero_pairs() {
        let json = r#"{
            "origin": {"city": "Columbus", "region": "OH"},
            "destination": {"city": "Nashville", "region": "TN"},
            "equipmentClass": "V",
            "requiredPairs": 0
        }"#;
        let req: PairLanesRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_err());
    }
}
