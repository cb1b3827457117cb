use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::scanner::MediaSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteOutcome {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NoMetadata,
    LowConfidence,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NoMetadata => "no_metadata",
            RejectReason::LowConfidence => "low_confidence",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteResult {
    pub mode_date: Option<NaiveDate>,
    pub match_count: usize,
    pub total_samples: usize,
    pub confidence: f64,
    pub outcome: VoteOutcome,
    pub reject_reason: Option<RejectReason>,
}

impl VoteResult {
    pub fn accepted_date(&self) -> Option<NaiveDate> {
        match self.outcome {
            VoteOutcome::Accept => self.mode_date,
            VoteOutcome::Reject => None,
        }
    }
}

/// Majority vote over calendar days.
#[derive(Debug, Clone, Copy)]
pub struct DateVoter {
    threshold: f64,
}

impl DateVoter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn vote_samples(&self, samples: &[MediaSample]) -> VoteResult {
        let dates: Vec<NaiveDate> = samples
            .iter()
            .filter(|s| s.valid)
            .filter_map(|s| s.extracted_date)
            .collect();
        self.vote(&dates)
    }

    /// Ties between equally common days go to the earliest day.
    pub fn vote(&self, dates: &[NaiveDate]) -> VoteResult {
        let mut groups: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for date in dates {
            *groups.entry(*date).or_default() += 1;
        }

        let mut mode: Option<(NaiveDate, usize)> = None;
        for (date, count) in &groups {
            if mode.map_or(true, |(_, best)| *count > best) {
                mode = Some((*date, *count));
            }
        }

        let total_samples = dates.len();
        let (mode_date, match_count) = match mode {
            Some((date, count)) => (Some(date), count),
            None => (None, 0),
        };
        let confidence = if total_samples == 0 {
            0.0
        } else {
            match_count as f64 / total_samples as f64
        };

        let reject_reason = if total_samples == 0 {
            Some(RejectReason::NoMetadata)
        } else if confidence < self.threshold {
            Some(RejectReason::LowConfidence)
        } else {
            None
        };

        VoteResult {
            mode_date,
            match_count,
            total_samples,
            confidence,
            outcome: if reject_reason.is_none() {
                VoteOutcome::Accept
            } else {
                VoteOutcome::Reject
            },
            reject_reason,
        }
    }
}
