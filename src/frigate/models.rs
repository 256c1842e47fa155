use crate::store::DeliveryState;
use serde::{Deserialize, Deserializer, Serialize};

/// One detection as reported by the event API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Stable across re-fetches of the same detection
    pub id: String,
    pub camera: String,
    /// Object class, e.g. "person"
    pub label: String,
    /// Null, a name, or a `[name, score]` pair depending on the server version
    #[serde(default)]
    pub sub_label: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub zones: Vec<String>,
    pub start_time: f64,
    /// Unset or zero while the detection is still running
    #[serde(default)]
    pub end_time: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_clip: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_snapshot: bool,
    #[serde(default)]
    pub top_score: Option<f64>,
    /// Base64-encoded JPEG thumbnail
    #[serde(default)]
    pub thumbnail: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Event {
    /// End timestamp, if the detection has ended
    pub fn ended_at(&self) -> Option<f64> {
        self.end_time.filter(|t| *t > 0.0)
    }

    pub fn is_finished(&self) -> bool {
        self.ended_at().is_some()
    }

    pub fn top_score(&self) -> f64 {
        self.top_score.unwrap_or(0.0)
    }

    /// Marker written once a notification for this snapshot of the event went out
    pub fn delivery_state(&self) -> DeliveryState {
        if self.is_finished() {
            DeliveryState::Finished
        } else {
            DeliveryState::InProgress
        }
    }

    pub fn sub_labels(&self) -> Vec<String> {
        use serde_json::Value;

        match &self.sub_label {
            Some(Value::String(name)) if !name.is_empty() => vec![name.clone()],
            // [name, score] pairs carry a single name; plain arrays list names
            Some(Value::Array(items)) => match items.as_slice() {
                [Value::String(name), Value::Number(_)] => vec![name.clone()],
                _ => items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            },
            _ => Vec::new(),
        }
    }

    /// Inline thumbnail, if the server sent a non-empty one
    pub fn inline_thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref().filter(|t| !t.trim().is_empty())
    }
}
