use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Text returned by an oracle call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text exactly as the backend returned it
    pub text: String,
    /// Wall-clock duration of the call
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl Completion {
    pub fn new(text: impl Into<String>, duration: Duration) -> Self {
        Self {
            text: text.into(),
            duration,
        }
    }

    /// Nothing but whitespace came back
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_keeps_text_verbatim() {
        let completion = Completion::new("  85\n", Duration::from_millis(10));
        assert_eq!(completion.text, "  85\n");
        assert_eq!(completion.char_count(), 5);
        assert!(!completion.is_empty());
        assert!(Completion::new(" \n\t", Duration::ZERO).is_empty());
    }

    #[test]
    fn test_duration_serializes_as_seconds() {
        let completion = Completion::new("ok", Duration::from_millis(1500));
        let json = serde_json::to_value(&completion).unwrap();
        assert_eq!(json["duration"], 1.5);
    }
}
