use serde::{Deserialize, Serialize};

use crate::model::PresentationState;

/// Wire unit on the fan-out channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelEnvelope {
    StateUpdate { payload: PresentationState },
    RequestState,
}

impl ChannelEnvelope {
    pub fn state_update(state: PresentationState) -> Self {
        Self::StateUpdate { payload: state }
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// `None` for anything that is not a well-formed envelope, including
    /// unknown tags.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SlideContent, StyleSettings};

    #[test]
    fn test_request_wire_form() {
        let bytes = ChannelEnvelope::RequestState.encode().unwrap();
        assert_eq!(bytes, br#"{"type":"REQUEST_STATE"}"#);
    }

    #[test]
    fn test_state_update_decodes() {
        let state = PresentationState::new(
            Some(SlideContent::manual("Welcome", "Sacrament meeting begins at 10")),
            StyleSettings::default(),
        );
        let bytes = ChannelEnvelope::state_update(state).encode().unwrap();
        match ChannelEnvelope::decode(&bytes) {
            Some(ChannelEnvelope::StateUpdate { payload }) => {
                assert_eq!(payload.slide.unwrap().reference, "Welcome");
            }
            other => panic!("unexpected envelope: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_and_malformed_discarded() {
        assert!(ChannelEnvelope::decode(br#"{"type":"SHUTDOWN"}"#).is_none());
        assert!(ChannelEnvelope::decode(br#"{"payload":{}}"#).is_none());
        assert!(ChannelEnvelope::decode(b"\xff\x00garbage").is_none());
        assert!(ChannelEnvelope::decode(br#"{"type":"STATE_UPDATE","payload":"oops"}"#).is_none());
    }
}
