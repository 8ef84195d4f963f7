// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Cohort selection around scoring.
//!
//! Filters run before [`ScoringEngine::score`](crate::scoring::ScoringEngine::score)
//! because they change the cohort every score is relative to. Ordering helpers
//! run after it.

use std::cmp::Ordering;

use crate::models::RaceRecord;
use crate::scoring::ScoredRecord;

/// Drop records whose activity id is listed
pub fn exclude_ids<T: AsRef<RaceRecord>>(records: Vec<T>, ids: &[String]) -> Vec<T> {
    records
        .into_iter()
        .filter(|r| !ids.iter().any(|id| *id == r.as_ref().activity_id))
        .collect()
}

/// Keep records whose name is one of `names`
pub fn pool_by_name<T: AsRef<RaceRecord>>(records: Vec<T>, names: &[String]) -> Vec<T> {
    records
        .into_iter()
        .filter(|r| names.iter().any(|name| *name == r.as_ref().name))
        .collect()
}

/// Keep records whose name contains `needle`
pub fn name_contains<T: AsRef<RaceRecord>>(records: Vec<T>, needle: &str) -> Vec<T> {
    records
        .into_iter()
        .filter(|r| r.as_ref().name.contains(needle))
        .collect()
}

/// Keep records without an incident annotation
pub fn without_incidents<T: AsRef<RaceRecord>>(records: Vec<T>) -> Vec<T> {
    records
        .into_iter()
        .filter(|r| r.as_ref().incident.is_none())
        .collect()
}

/// Records scoring below zero, lowest first
pub fn negative_outliers<T>(scored: &[ScoredRecord<T>]) -> Vec<&ScoredRecord<T>> {
    let mut outliers: Vec<&ScoredRecord<T>> = scored
        .iter()
        .filter(|s| s.performance_score.is_some_and(|score| score < 0.0))
        .collect();
    outliers.sort_by(|a, b| compare_scores(a.performance_score, b.performance_score));
    outliers
}

/// Best score first; records without a score go last
pub fn rank<T>(mut scored: Vec<ScoredRecord<T>>) -> Vec<ScoredRecord<T>> {
    scored.sort_by(|a, b| match (a.performance_score, b.performance_score) {
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (a, b) => compare_scores(b, a),
    });
    scored
}

fn compare_scores(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}
