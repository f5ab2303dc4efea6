//! Wire-level data model: nodes, edges and the pushed snapshot.
//!
//! Field names follow the viewer's JSON schema; boolean flags travel as
//! `0`/`1` integers.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Identifier of a graph node. Valid ids start at 1.
pub type NodeId = u64;

/// Display name given to nodes built from the social edge list.
pub const DEFAULT_NODE_NAME: &str = "HiggsSocialNode";

/// A member of the social graph and its opinion state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub subtitle: String,

    /// Current opinion in [0, 1]
    pub value: f64,

    /// One-way false → true
    #[serde(with = "flag")]
    pub active: bool,

    /// Set once the opinion loop has run at least one tick
    #[serde(with = "flag")]
    pub evolved: bool,

    /// Set once the node elected to propagate the cascade
    #[serde(rename = "spread", with = "flag")]
    pub spreading: bool,

    /// Bounded-confidence tolerance in [0, 1]
    pub threshold: f64,

    #[serde(with = "flag")]
    pub is_leader: bool,

    /// Probability of propagating after activation, in [0, 1]
    #[serde(rename = "spread_willing")]
    pub spread_willingness: f64,
}

impl Node {
    /// Creates an inactive node with the given fixed parameters.
    pub fn new(id: NodeId, threshold: f64, spread_willingness: f64) -> Self {
        Self {
            id,
            name: DEFAULT_NODE_NAME.to_string(),
            subtitle: String::new(),
            value: 0.0,
            active: false,
            evolved: false,
            spreading: false,
            threshold: threshold.clamp(0.0, 1.0),
            is_leader: false,
            spread_willingness: spread_willingness.clamp(0.0, 1.0),
        }
    }
}

/// A directed adjacency entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(rename = "sid")]
    pub src: NodeId,

    #[serde(rename = "tid")]
    pub dst: NodeId,

    #[serde(default)]
    pub weight: u32,
}

impl Edge {
    pub fn new(src: NodeId, dst: NodeId) -> Self {
        Self { src, dst, weight: 0 }
    }
}

/// Full point-in-time state of the graph, resent on every publish cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,

    /// Free-text annotation, typically the capture timestamp
    pub appendix: String,
}

impl PushMessage {
    /// Serializes to the JSON bytes handed to a sink.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CoreError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses a message previously produced by [`to_json_bytes`].
    ///
    /// [`to_json_bytes`]: PushMessage::to_json_bytes
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// `bool` <-> `0`/`1` integer encoding.
mod flag {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(D::Error::custom(format!("expected 0 or 1, got {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn sample_message() -> PushMessage {
        let mut leader = Node::new(1, 0.25, 0.9);
        leader.active = true;
        leader.is_leader = true;
        leader.spreading = true;
        leader.value = 1.0;

        let mut follower = Node::new(2, 0.4, 0.1);
        follower.active = true;
        follower.evolved = true;
        follower.value = 0.73;

        PushMessage {
            nodes: vec![leader, follower, Node::new(3, 0.5, 0.5)],
            edges: vec![Edge::new(1, 2), Edge::new(2, 3)],
            appendix: "Data in 2024-01-01 00:00:00.000".to_string(),
        }
    }

    #[test]
    fn test_wire_field_names_and_flags() {
        let bytes = sample_message().to_json_bytes().unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();

        let node = &json["nodes"][0];
        assert_eq!(node["id"], 1);
        assert_eq!(node["name"], DEFAULT_NODE_NAME);
        assert_eq!(node["active"], 1);
        assert_eq!(node["evolved"], 0);
        assert_eq!(node["spread"], 1);
        assert_eq!(node["is_leader"], 1);
        assert_eq!(node["spread_willing"], 0.9);

        let edge = &json["edges"][1];
        assert_eq!(edge["sid"], 2);
        assert_eq!(edge["tid"], 3);
        assert_eq!(edge["weight"], 0);

        assert_eq!(json["appendix"], "Data in 2024-01-01 00:00:00.000");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let message = sample_message();
        let decoded = PushMessage::from_json_slice(&message.to_json_bytes().unwrap()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_flag_rejects_non_binary() {
        let raw = r#"{"nodes":[{"id":1,"name":"n","subtitle":"","value":0.5,"active":2,
            "evolved":0,"spread":0,"threshold":0.1,"is_leader":0,"spread_willing":0.2}],
            "edges":[],"appendix":""}"#;
        assert!(matches!(
            PushMessage::from_json_slice(raw.as_bytes()),
            Err(CoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_node_new_clamps_parameters() {
        let node = Node::new(7, 1.5, -0.2);
        assert_eq!(node.threshold, 1.0);
        assert_eq!(node.spread_willingness, 0.0);
        assert!(!node.active);
    }
}
