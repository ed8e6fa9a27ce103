use serde::{Deserialize, Serialize};

use crate::net::session::SessionId;
use crate::util::grid::{Direction, Step};

/// Body of calls that only name a session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub session_id: SessionId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// Steering request. `dir` is kept raw so a bad vector is a no-op, not a 4xx.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionRequest {
    pub session_id: SessionId,
    pub dir: Step,
}

impl DirectionRequest {
    /// The requested heading, if `dir` is a cardinal unit step
    pub fn direction(&self) -> Option<Direction> {
        Direction::try_from(self.dir).ok()
    }
}

/// Optional tick interval carried by restart and wipe
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickMsRequest {
    #[serde(default)]
    pub tick_ms: Option<f64>,
}

/// Body of the out-of-band leave beacon. Validated by hand.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconLeave {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperResponse {
    pub eliminated: Option<SessionId>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickResponse {
    pub advanced: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_request_optional_fields() {
        let req: JoinRequest = serde_json::from_str(r#"{"sessionId":"abc"}"#).unwrap();
        assert_eq!(req.session_id.as_str(), "abc");
        assert_eq!(req.name, "");
        assert!(req.color.is_none());

        let req: JoinRequest =
            serde_json::from_str(r##"{"sessionId":"abc","name":"Zed","color":"#00ff00"}"##)
                .unwrap();
        assert_eq!(req.name, "Zed");
        assert_eq!(req.color.as_deref(), Some("#00ff00"));
    }

    #[test]
    fn test_direction_request_keeps_bad_vectors() {
        let req: DirectionRequest =
            serde_json::from_str(r#"{"sessionId":"a","dir":{"x":1,"y":1}}"#).unwrap();
        assert!(req.direction().is_none());

        let req: DirectionRequest =
            serde_json::from_str(r#"{"sessionId":"a","dir":{"x":0,"y":-1}}"#).unwrap();
        assert_eq!(req.direction(), Some(Direction::Up));
    }

    #[test]
    fn test_beacon_leave_tolerates_missing_id() {
        let body: BeaconLeave = serde_json::from_str("{}").unwrap();
        assert!(body.session_id.is_none());
    }

    #[test]
    fn test_response_shapes() {
        let json = serde_json::to_value(SuperResponse { eliminated: None }).unwrap();
        assert!(json["eliminated"].is_null());

        let json = serde_json::to_value(SessionResponse {
            session_id: SessionId::new("s"),
        })
        .unwrap();
        assert_eq!(json["sessionId"], "s");

        let json = serde_json::to_value(TickResponse { advanced: true }).unwrap();
        assert_eq!(json["advanced"], true);
    }
}
