// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON state-update messages sent alongside binary particle frames.
//!
//! Never used for particle data — see §9's open question, resolved here by
//! simply never introducing a binary payload variant.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateUpdate {
    /// The core has entered fallback rendering; external consumers should
    /// render a degraded-mode badge.
    Degraded { reason: String, since_epoch_ms: u64 },
    /// The core has left fallback and resumed model-driven inference.
    Recovered { epoch_ms: u64 },
    /// A conversation collaborator pushed a reply onto
    /// `world_state.conversation.response`; forwarded verbatim so a UI can
    /// render it without re-reading WorldState out of band.
    ConversationResponse { text: String, epoch_ms: u64 },
}

/// Parse and validate an inbound state-update message. Invalid JSON or an
/// unrecognized `type` is rejected rather than silently forwarded or used
/// to mutate `WorldState`.
pub fn parse_state_update(text: &str) -> Result<StateUpdate, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_message_round_trips() {
        let msg = StateUpdate::Degraded { reason: "accelerator absent".to_string(), since_epoch_ms: 1_700_000_000_000 };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"degraded\""));
        let back = parse_state_update(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn unknown_type_is_rejected_not_forwarded() {
        let result = parse_state_update(r#"{"type":"particle_frame","data":"nope"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(parse_state_update("not json").is_err());
    }
}
