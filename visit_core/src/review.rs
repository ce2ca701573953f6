//! Reviewer decisions on detected medication problems.
//!
//! For every medication activity and problem the reviewer can add a comment
//! and choose whether the finding goes into the patient's visit history.
//! [`ReviewLog`] is a persistent map of maps: each update returns a new log
//! that shares every untouched activity with the previous one.

use crate::problems::ProblemId;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// A reviewer's annotation of one problem
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemReview {
    #[serde(default)]
    pub include_in_history: bool,
    #[serde(default)]
    pub comment: String,
}

type ActivityReviews = BTreeMap<ProblemId, ProblemReview>;

/// Reviews keyed by activity id, then problem id
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ReviewLog {
    by_activity: BTreeMap<String, Arc<ActivityReviews>>,
}

/// A review flagged for the visit history
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry<'a> {
    pub activity_id: &'a str,
    pub problem_id: ProblemId,
    pub review: &'a ProblemReview,
}

impl ReviewLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, activity_id: &str, problem_id: ProblemId) -> Option<&ProblemReview> {
        self.by_activity
            .get(activity_id)
            .and_then(|reviews| reviews.get(&problem_id))
    }

    /// New log with one review changed by `f`
    ///
    /// Other fields of the same review, other problems of the same activity
    /// and every other activity are carried over untouched.
    pub fn update(
        &self,
        activity_id: &str,
        problem_id: ProblemId,
        f: impl FnOnce(&mut ProblemReview),
    ) -> Self {
        let mut reviews: ActivityReviews = self
            .by_activity
            .get(activity_id)
            .map(|r| r.as_ref().clone())
            .unwrap_or_default();
        f(reviews.entry(problem_id).or_default());

        let mut by_activity = self.by_activity.clone();
        by_activity.insert(activity_id.to_string(), Arc::new(reviews));
        Self { by_activity }
    }

    pub fn with_include_in_history(
        &self,
        activity_id: &str,
        problem_id: ProblemId,
        include: bool,
    ) -> Self {
        self.update(activity_id, problem_id, |review| {
            review.include_in_history = include
        })
    }

    pub fn with_comment(
        &self,
        activity_id: &str,
        problem_id: ProblemId,
        comment: impl Into<String>,
    ) -> Self {
        let comment = comment.into();
        self.update(activity_id, problem_id, |review| review.comment = comment)
    }

    /// Whether both logs hold the same allocation for an activity's reviews
    pub fn shares_activity(&self, other: &ReviewLog, activity_id: &str) -> bool {
        match (
            self.by_activity.get(activity_id),
            other.by_activity.get(activity_id),
        ) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Reviews marked for the visit history, by activity then rule order
    pub fn history_entries(&self) -> Vec<HistoryEntry<'_>> {
        self.by_activity
            .iter()
            .flat_map(|(activity_id, reviews)| {
                reviews
                    .iter()
                    .filter(|(_, review)| review.include_in_history)
                    .map(move |(problem_id, review)| HistoryEntry {
                        activity_id,
                        problem_id: *problem_id,
                        review,
                    })
            })
            .collect()
    }

    /// Load a review log from a JSON file; a missing file is an empty log
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No review file at {:?}", path);
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
