//! Uniform response envelope and fetch progress events.
//!
//! Every boundary operation answers with an `Envelope`; payloads that are
//! structured (branch lists, commits, trees) travel JSON-encoded in `data`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    pub data: String,
}

impl Envelope {
    pub fn success(message: impl Into<String>) -> Self {
        Self::with_data(message, String::new())
    }

    pub fn with_data(message: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: data.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: String::new(),
        }
    }

    /// Success envelope whose `data` is the JSON encoding of `payload`.
    pub fn json<T: Serialize>(message: impl Into<String>, payload: &T) -> Self {
        match serde_json::to_string(payload) {
            Ok(data) => Self::with_data(message, data),
            Err(e) => Self::failure(format!("Failed to encode response: {e}")),
        }
    }
}

/// Transfer statistics reported while a fetch is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchProgress {
    pub received_objects: usize,
    pub total_objects: usize,
    pub indexed_objects: usize,
    pub received_bytes: usize,
}

/// One event of a streamed fetch: `start`, zero or more `progress`, then `end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum FetchEvent {
    Start,
    Progress(FetchProgress),
    End(Envelope),
}

impl FetchEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FetchEvent::Start => "start",
            FetchEvent::Progress(_) => "progress",
            FetchEvent::End(_) => "end",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_envelope_encodes_payload() {
        let env = Envelope::json("ok", &vec!["main", "dev"]);
        assert!(env.success);
        assert_eq!(env.data, r#"["main","dev"]"#);
    }

    #[test]
    fn failure_has_empty_data() {
        let env = Envelope::failure("boom");
        assert!(!env.success);
        assert!(env.data.is_empty());
    }

    #[test]
    fn fetch_events_are_tagged() {
        let json = serde_json::to_value(FetchEvent::Progress(FetchProgress {
            received_objects: 3,
            total_objects: 10,
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(json["event"], "progress");
        assert_eq!(json["receivedObjects"], 3);
    }
}
