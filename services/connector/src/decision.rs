//! Outbound decision record sent to the cockpit endpoint.
//!
//! The downstream schema is alias-based JSON with strict omit-if-unset
//! semantics: a field that has no value must be absent from the serialized
//! output, never null.

use crate::sae::VideoFrame;
use serde::Serialize;

/// File name of the annotated artifact under the message prefix.
pub const ANNOTATED_FILE_NAME: &str = "annotated.jpg";

/// Module block of a decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Module {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Decision-type block of a decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Decision payload POSTed to the decision sink
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_visualization_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<Module>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_type: Option<DecisionType>,
}

/// Build the decision payload for one processed message.
///
/// `media_url` is always `{bucket}/{message_id}/annotated.jpg`; the camera
/// geolocation fields are set iff the frame carries one.
pub fn build_decision(
    frame: &VideoFrame,
    message_id: &str,
    bucket: &str,
    module_name: &str,
) -> DecisionPayload {
    DecisionPayload {
        acquisition_time: Some(frame.timestamp_utc_ms),
        media_url: Some(format!("{bucket}/{message_id}/{ANNOTATED_FILE_NAME}")),
        action_visualization_url: None,
        camera_latitude: frame.camera_location.map(|loc| loc.latitude),
        camera_longitude: frame.camera_location.map(|loc| loc.longitude),
        description: None,
        module: Some(Module {
            id: None,
            name: Some(module_name.to_string()),
        }),
        decision_type: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sae::GeoCoordinate;

    fn frame(camera_location: Option<GeoCoordinate>) -> VideoFrame {
        VideoFrame {
            source_id: "camera-7".to_string(),
            timestamp_utc_ms: 1_700_000_123_456,
            shape: None,
            frame_data_jpeg: vec![],
            camera_location,
        }
    }

    #[test]
    fn test_media_url_shape() {
        let payload = build_decision(&frame(None), "20240115_103045_a1b2c3", "decisions", "mod");
        assert_eq!(
            payload.media_url.as_deref(),
            Some("decisions/20240115_103045_a1b2c3/annotated.jpg")
        );
    }

    #[test]
    fn test_acquisition_time_is_passed_through_unchanged() {
        let payload = build_decision(&frame(None), "id", "b", "m");
        assert_eq!(payload.acquisition_time, Some(1_700_000_123_456));
    }

    #[test]
    fn test_geolocation_omitted_when_absent() {
        let payload = build_decision(&frame(None), "id", "b", "m");
        let json = serde_json::to_value(&payload).unwrap();

        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("cameraLatitude"));
        assert!(!obj.contains_key("cameraLongitude"));
        // Unset decision-type and free-text fields are absent too, not null.
        assert!(!obj.contains_key("decisionType"));
        assert!(!obj.contains_key("description"));
        assert!(!obj.contains_key("actionVisualizationUrl"));
    }

    #[test]
    fn test_geolocation_forwarded_when_present() {
        let payload = build_decision(
            &frame(Some(GeoCoordinate {
                latitude: 42.0,
                longitude: -71.0,
            })),
            "id",
            "b",
            "m",
        );
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["cameraLatitude"], 42.0);
        assert_eq!(json["cameraLongitude"], -71.0);
    }

    #[test]
    fn test_aliases_are_camel_case() {
        let payload = build_decision(&frame(None), "id", "b", "anomaly-detection");
        let json = serde_json::to_value(&payload).unwrap();
        let obj = json.as_object().unwrap();

        assert!(obj.contains_key("acquisitionTime"));
        assert!(obj.contains_key("mediaUrl"));
        assert_eq!(json["module"]["name"], "anomaly-detection");
        assert!(!json["module"].as_object().unwrap().contains_key("id"));
    }

    #[test]
    fn test_building_twice_is_byte_identical() {
        let f = frame(Some(GeoCoordinate {
            latitude: 1.5,
            longitude: 2.5,
        }));
        let a = serde_json::to_vec(&build_decision(&f, "id", "b", "m")).unwrap();
        let b = serde_json::to_vec(&build_decision(&f, "id", "b", "m")).unwrap();
        assert_eq!(a, b);
    }
}
