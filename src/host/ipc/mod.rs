//! Channel between the host and the front-end. Messages are json objects, one per line.
//!
//! ```text
//! front-end -> host   {"id": 1, "channel": "add-client", "payload": {"name": "Acme"}}
//! host -> front-end   {"id": 1, "result": {"id": "1700000000000", "name": "Acme"}}
//!                     {"id": 2, "error": "unknown channel 'add-matter'"}
//!                     {"event": "start-timer"}
//! ```

pub mod router;
pub mod server;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Request {
    pub id: u64,
    pub channel: String,
    #[serde(default)]
    pub payload: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "result")]
    Ok(Value),
    #[serde(rename = "error")]
    Err(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// [None] when the request itself couldn't be read.
    pub id: Option<u64>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Messages the host sends without being asked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum HostEvent {
    /// First message of every session: what the window should show.
    #[serde(rename_all = "camelCase")]
    Load {
        url: String,
        title: String,
        width: u32,
        height: u32,
        dev_tools: bool,
    },
    ShowWindow,
    StartTimer,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    Response(Response),
    Event(HostEvent),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{HostEvent, Outcome, OutboundMessage, Request, Response};

    #[test]
    fn test_message_shapes() {
        let request: Request =
            serde_json::from_value(json!({ "id": 3, "channel": "get-clients" })).unwrap();
        assert_eq!(request.payload, None);

        let response = OutboundMessage::Response(Response {
            id: Some(3),
            outcome: Outcome::Ok(json!([])),
        });
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "id": 3, "result": [] })
        );

        let failure = OutboundMessage::Response(Response {
            id: None,
            outcome: Outcome::Err("bad".into()),
        });
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            json!({ "id": null, "error": "bad" })
        );

        assert_eq!(
            serde_json::to_value(OutboundMessage::Event(HostEvent::StartTimer)).unwrap(),
            json!({ "event": "start-timer" })
        );
        assert_eq!(
            serde_json::to_value(HostEvent::Load {
                url: "http://localhost:3000".into(),
                title: "Legal Time Tracker".into(),
                width: 1200,
                height: 800,
                dev_tools: true,
            })
            .unwrap(),
            json!({
                "event": "load",
                "url": "http://localhost:3000",
                "title": "Legal Time Tracker",
                "width": 1200,
                "height": 800,
                "devTools": true
            })
        );
    }
}
