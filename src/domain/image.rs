use serde::{Deserialize, Serialize};

/// Placeholder for instance and provider names missing upstream
pub const UNKNOWN: &str = "unknown";

/// A street-level picture ready for display on a map
///
/// Field names serialize in camelCase (`thumbUrl`, `panoramaxUrl`, ...) so map
/// front-ends can consume the JSON directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub thumb_url: String,
    /// Link opening the picture in the Panoramax web viewer
    #[serde(rename = "panoramaxUrl")]
    pub viewer_url: String,
    /// Federated instance the picture was collected through
    pub instance_name: String,
    pub provider_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case() {
        let record = ImageRecord {
            id: "abc".to_string(),
            lat: 48.85,
            lng: 2.35,
            thumb_url: "t".to_string(),
            viewer_url: "v".to_string(),
            instance_name: UNKNOWN.to_string(),
            provider_name: "IGN".to_string(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["thumbUrl"], "t");
        assert_eq!(json["panoramaxUrl"], "v");
        assert_eq!(json["instanceName"], "unknown");
        assert_eq!(json["providerName"], "IGN");
    }
}
