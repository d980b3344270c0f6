use draftloops_oracle::{Oracle, OracleConfig, OracleError};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{ReviewPrompts, Role};

/// Substituted for any rating that cannot be used
pub const NEUTRAL_SCORE: f64 = 50.0;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreParseError {
    #[error("Rating is not a number: {0:?}")]
    NotANumber(String),

    #[error("Rating {0} is outside 0-100")]
    OutOfRange(f64),
}

/// Parse an oracle rating response into a value in `[0, 100]`.
///
/// Accepts a bare number, optionally followed by `%` or `/100`.
pub fn parse_rating(text: &str) -> Result<f64, ScoreParseError> {
    let trimmed = text.trim();
    let number = trimmed
        .strip_suffix("/100")
        .or_else(|| trimmed.strip_suffix('%'))
        .unwrap_or(trimmed)
        .trim();

    let value: f64 = number
        .parse()
        .map_err(|_| ScoreParseError::NotANumber(trimmed.to_string()))?;

    if !value.is_finite() {
        return Err(ScoreParseError::NotANumber(trimmed.to_string()));
    }
    if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
        return Err(ScoreParseError::OutOfRange(value));
    }
    Ok(value)
}

/// Score for one quality dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: String,
    pub value: f64,
    /// Why the neutral default was used, when it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaulted: Option<String>,
}

impl DimensionScore {
    pub fn rated(dimension: impl Into<String>, value: f64) -> Self {
        Self {
            dimension: dimension.into(),
            value,
            defaulted: None,
        }
    }

    pub fn neutral(dimension: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            value: NEUTRAL_SCORE,
            defaulted: Some(reason.into()),
        }
    }

    pub fn is_defaulted(&self) -> bool {
        self.defaulted.is_some()
    }
}

/// Per-dimension scores and their unweighted mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub dimensions: Vec<DimensionScore>,
    pub overall: f64,
}

impl ScoreCard {
    pub fn from_scores(dimensions: Vec<DimensionScore>) -> Self {
        let overall = if dimensions.is_empty() {
            0.0
        } else {
            dimensions.iter().map(|d| d.value).sum::<f64>() / dimensions.len() as f64
        };
        Self {
            dimensions,
            overall,
        }
    }

    pub fn get(&self, dimension: &str) -> Option<f64> {
        self.dimensions
            .iter()
            .find(|d| d.dimension == dimension)
            .map(|d| d.value)
    }

    pub fn defaulted(&self) -> impl Iterator<Item = &DimensionScore> {
        self.dimensions.iter().filter(|d| d.is_defaulted())
    }
}

/// Rates content along named dimensions through the oracle
pub struct Scorer<'a> {
    oracle: &'a dyn Oracle,
}

impl<'a> Scorer<'a> {
    pub fn new(oracle: &'a dyn Oracle) -> Self {
        Self { oracle }
    }

    /// Rate `content` on every dimension concurrently.
    ///
    /// Unparseable or rejected ratings fall back to [`NEUTRAL_SCORE`]; only
    /// non-rejection oracle failures are returned as errors.
    pub async fn score(
        &self,
        content: &str,
        dimensions: &[String],
        config: &OracleConfig,
    ) -> Result<ScoreCard, OracleError> {
        let payload = ReviewPrompts::rating(content);
        let raters: Vec<Role> = dimensions.iter().map(|d| Role::rater(d)).collect();

        let calls = raters
            .iter()
            .map(|rater| self.oracle.complete(&rater.instruction, &payload, config));
        let responses = join_all(calls).await;

        let mut scores = Vec::with_capacity(dimensions.len());
        for (dimension, response) in dimensions.iter().zip(responses) {
            let score = match response {
                Ok(completion) => match parse_rating(&completion.text) {
                    Ok(value) => DimensionScore::rated(dimension, value),
                    Err(e) => {
                        warn!(dimension = %dimension, error = %e, "Unusable rating, using neutral score");
                        DimensionScore::neutral(dimension, e.to_string())
                    }
                },
                Err(e) if e.is_rejected() => {
                    warn!(dimension = %dimension, error = %e, "Rating rejected, using neutral score");
                    DimensionScore::neutral(dimension, e.to_string())
                }
                Err(e) => return Err(e),
            };
            scores.push(score);
        }

        let card = ScoreCard::from_scores(scores);
        debug!(overall = card.overall, dimensions = dimensions.len(), "Scoring complete");
        Ok(card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftloops_oracle::FnOracle;

    fn dims(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Rates each dimension from a table keyed by rater instruction
    fn rating_oracle(table: &[(&str, &str)]) -> FnOracle {
        let table: Vec<(String, String)> = table
            .iter()
            .map(|(d, r)| (Role::rater(d).instruction, r.to_string()))
            .collect();
        FnOracle::new(move |instruction, _| {
            table
                .iter()
                .find(|(i, _)| i == instruction)
                .map(|(_, r)| r.clone())
                .ok_or_else(|| OracleError::Rejected("unknown rater".into()))
        })
    }

    #[test]
    fn test_parse_rating_accepts_bare_numbers() {
        assert_eq!(parse_rating("85"), Ok(85.0));
        assert_eq!(parse_rating(" 92.5\n"), Ok(92.5));
        assert_eq!(parse_rating("70%"), Ok(70.0));
        assert_eq!(parse_rating("88/100"), Ok(88.0));
        assert_eq!(parse_rating("0"), Ok(0.0));
        assert_eq!(parse_rating("100"), Ok(100.0));
    }

    #[test]
    fn test_parse_rating_rejects_garbage() {
        assert!(matches!(parse_rating("N/A"), Err(ScoreParseError::NotANumber(_))));
        assert!(matches!(parse_rating("NaN"), Err(ScoreParseError::NotANumber(_))));
        assert!(matches!(parse_rating("inf"), Err(ScoreParseError::NotANumber(_))));
        assert!(matches!(parse_rating("Score: 80"), Err(ScoreParseError::NotANumber(_))));
        assert_eq!(parse_rating("101"), Err(ScoreParseError::OutOfRange(101.0)));
        assert_eq!(parse_rating("-3"), Err(ScoreParseError::OutOfRange(-3.0)));
    }

    #[tokio::test]
    async fn test_overall_is_mean_of_all_dimensions() {
        let oracle = rating_oracle(&[("relevance", "60"), ("clarity", "70"), ("ethics", "80")]);
        let card = Scorer::new(&oracle)
            .score("draft", &dims(&["relevance", "clarity", "ethics"]), &OracleConfig::new())
            .await
            .unwrap();

        assert_eq!(card.dimensions.len(), 3);
        assert_eq!(card.get("clarity"), Some(70.0));
        assert!((card.overall - 70.0).abs() < 1e-9);
        assert_eq!(card.defaulted().count(), 0);
    }

    #[tokio::test]
    async fn test_non_numeric_rating_defaults_to_neutral() {
        let oracle = rating_oracle(&[("relevance", "90"), ("clarity", "N/A"), ("ethics", "100")]);
        let card = Scorer::new(&oracle)
            .score("draft", &dims(&["relevance", "clarity", "ethics"]), &OracleConfig::new())
            .await
            .unwrap();

        assert_eq!(card.get("clarity"), Some(NEUTRAL_SCORE));
        assert!((card.overall - 80.0).abs() < 1e-9);
        let defaulted: Vec<_> = card.defaulted().map(|d| d.dimension.as_str()).collect();
        assert_eq!(defaulted, vec!["clarity"]);
    }

    #[tokio::test]
    async fn test_rejected_rating_defaults_to_neutral() {
        let oracle = rating_oracle(&[("relevance", "40")]);
        let card = Scorer::new(&oracle)
            .score("draft", &dims(&["relevance", "clarity"]), &OracleConfig::new())
            .await
            .unwrap();

        assert_eq!(card.get("clarity"), Some(NEUTRAL_SCORE));
        assert!((card.overall - 45.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unavailable_rating_fails_scoring() {
        let oracle = FnOracle::new(|_, _| Err(OracleError::Unavailable("down".into())));
        let result = Scorer::new(&oracle)
            .score("draft", &dims(&["relevance"]), &OracleConfig::new())
            .await;
        assert!(result.unwrap_err().is_transient());
    }

    #[test]
    fn test_scores_keep_dimension_order() {
        let card = ScoreCard::from_scores(vec![
            DimensionScore::rated("b", 10.0),
            DimensionScore::rated("a", 20.0),
        ]);
        let names: Vec<_> = card.dimensions.iter().map(|d| d.dimension.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
