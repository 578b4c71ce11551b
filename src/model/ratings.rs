use serde::{Deserialize, Serialize};

use crate::scoring::ScoringError;

/// One rating submitted for a user, each sub-score on `1..=rating_max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingInput {
    pub appearance: u8,
    pub personality: u8,
    pub communication: u8,
    pub reliability: u8,
}

/// Running averages of the four received sub-ratings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub appearance: f64,
    pub personality: f64,
    pub communication: f64,
    pub reliability: f64,
    pub count: u32,
}

impl RatingSummary {
    pub fn new(sub_ratings: [f64; 4], count: u32) -> Self {
        let [appearance, personality, communication, reliability] = sub_ratings;
        Self {
            appearance,
            personality,
            communication,
            reliability,
            count,
        }
    }

    pub fn sub_ratings(&self) -> [f64; 4] {
        [
            self.appearance,
            self.personality,
            self.communication,
            self.reliability,
        ]
    }

    /// Validates `input` against `1..=rating_max` and folds it into the averages.
    ///
    /// The summary is left untouched when any sub-rating is out of range.
    pub fn record(&mut self, input: &RatingInput, rating_max: u8) -> Result<(), ScoringError> {
        let values = [
            input.appearance,
            input.personality,
            input.communication,
            input.reliability,
        ];
        if let Some(&value) = values.iter().find(|&&v| v < 1 || v > rating_max) {
            return Err(ScoringError::InvalidRating {
                value,
                max: rating_max,
            });
        }
        let count = self
            .count
            .checked_add(1)
            .ok_or(ScoringError::RatingCountOverflow)?;

        let n = f64::from(self.count);
        let fold = |avg: f64, v: u8| (avg * n + f64::from(v)) / (n + 1.0);
        self.appearance = fold(self.appearance, input.appearance);
        self.personality = fold(self.personality, input.personality);
        self.communication = fold(self.communication, input.communication);
        self.reliability = fold(self.reliability, input.reliability);
        self.count = count;
        Ok(())
    }
}
