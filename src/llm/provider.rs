//! Classifier capability and the values it trades in.

use std::fmt;

use async_trait::async_trait;

use crate::llm::criteria::Criteria;

/// Classifier confidence that a post is interesting, always within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Score(f64);

impl Score {
    /// Accepts only finite values in `[0, 1]`.
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Parse a bare decimal number as returned by a generative model.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<f64>().ok().and_then(Self::new)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn meets(self, threshold: f64) -> bool {
        self.0 >= threshold
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Scores a post against interest criteria.
///
/// Implementations swallow their own failures: network errors, malformed
/// responses and out-of-range scores are logged and reported as `None`.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    async fn classify(&self, text: &str, criteria: &Criteria) -> Option<Score>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_accepts_bounds() {
        assert_eq!(Score::new(0.0).map(Score::value), Some(0.0));
        assert_eq!(Score::new(1.0).map(Score::value), Some(1.0));
    }

    #[test]
    fn score_rejects_out_of_range_and_non_finite() {
        assert!(Score::new(-0.01).is_none());
        assert!(Score::new(1.01).is_none());
        assert!(Score::new(f64::NAN).is_none());
        assert!(Score::new(f64::INFINITY).is_none());
    }

    #[test]
    fn score_parse_trims_whitespace() {
        assert_eq!(Score::parse(" 0.8\n").map(Score::value), Some(0.8));
        assert!(Score::parse("very interesting").is_none());
        assert!(Score::parse("").is_none());
        assert!(Score::parse("7").is_none());
    }

    #[test]
    fn score_meets_threshold_inclusive() {
        let s = Score::new(0.5).unwrap();
        assert!(s.meets(0.5));
        assert!(!s.meets(0.51));
    }
}
