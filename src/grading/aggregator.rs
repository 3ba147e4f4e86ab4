//! Weighted grade aggregation.
//!
//! Turns a set of exam results and their exam definitions into a single
//! percentage and letter grade. Everything here is pure and total: results
//! that cannot be graded are skipped and out-of-range scores are clamped.

use crate::models::{Exam, ExamResult, Grade, LetterGrade};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// Decimal places kept in the final percentage.
pub const PERCENT_SCALE: u32 = 2;

/// Midpoint rule applied when rounding the final percentage (banker's rounding).
pub const PERCENT_ROUNDING: RoundingStrategy = RoundingStrategy::MidpointNearestEven;

/// Minimum percentages for each passing letter grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeThresholds {
    pub a: Decimal,
    pub b: Decimal,
    pub c: Decimal,
    pub d: Decimal,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            a: Decimal::from(90),
            b: Decimal::from(80),
            c: Decimal::from(70),
            d: Decimal::from(60),
        }
    }
}

impl GradeThresholds {
    /// Whether the thresholds decrease from A to D.
    pub fn is_monotonic(&self) -> bool {
        self.a >= self.b && self.b >= self.c && self.c >= self.d
    }

    /// Maps a percentage to a letter. Thresholds are tested A to D; first match wins.
    pub fn letter_for(&self, percent: Decimal) -> LetterGrade {
        if percent >= self.a {
            LetterGrade::A
        } else if percent >= self.b {
            LetterGrade::B
        } else if percent >= self.c {
            LetterGrade::C
        } else if percent >= self.d {
            LetterGrade::D
        } else {
            LetterGrade::F
        }
    }

    /// The threshold for a letter, `None` for F.
    pub fn threshold_for(&self, letter: LetterGrade) -> Option<Decimal> {
        match letter {
            LetterGrade::A => Some(self.a),
            LetterGrade::B => Some(self.b),
            LetterGrade::C => Some(self.c),
            LetterGrade::D => Some(self.d),
            LetterGrade::F => None,
        }
    }
}

/// Running totals of an aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeightedTotals {
    /// Sum of `(clamped / max_score) * weight`.
    pub contribution: Decimal,
    /// Sum of the weights of counted results.
    ///
    /// Both sums share a scale, which is not always 1 (see [`weighted_totals`]).
    pub weight_sum: Decimal,
    /// Number of results that counted.
    pub counted: usize,
}

impl WeightedTotals {
    /// Final percentage, exactly zero when nothing carried weight.
    pub fn percent(&self) -> Decimal {
        if self.weight_sum <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        match self
            .contribution
            .checked_div(self.weight_sum)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        {
            Some(percent) => percent.round_dp_with_strategy(PERCENT_SCALE, PERCENT_ROUNDING),
            None => {
                warn!(
                    "Percentage of {} over {} is out of range, using zero",
                    self.contribution, self.weight_sum
                );
                Decimal::ZERO
            }
        }
    }
}

/// Clamp a raw score into `[0, max_score]`.
pub fn clamp_score(score: Decimal, max_score: Decimal) -> Decimal {
    score.max(Decimal::ZERO).min(max_score)
}

/// Fraction of the exam earned and the exam's weight, `None` when the result does not count.
fn gradable_share(
    result: &ExamResult,
    by_id: &HashMap<Uuid, &Exam>,
) -> Option<(Decimal, Decimal)> {
    let Some(exam) = by_id.get(&result.exam_id) else {
        debug!("Skipping result {}: exam {} not found", result.id, result.exam_id);
        return None;
    };

    if exam.max_score <= Decimal::ZERO {
        debug!(
            "Skipping result {}: exam {} has max score {}",
            result.id, exam.id, exam.max_score
        );
        return None;
    }

    if exam.weight < Decimal::ZERO {
        debug!(
            "Skipping result {}: exam {} has negative weight {}",
            result.id, exam.id, exam.weight
        );
        return None;
    }

    let fraction = clamp_score(result.score, exam.max_score).checked_div(exam.max_score)?;
    Some((fraction, exam.weight))
}

/// Sum `fraction * weight / scale`, `None` on overflow.
fn sum_weighted(gradable: &[(Decimal, Decimal)], scale: Decimal) -> Option<WeightedTotals> {
    let mut totals = WeightedTotals::default();

    for &(fraction, weight) in gradable {
        let weight = weight.checked_div(scale)?;
        totals.contribution = totals
            .contribution
            .checked_add(fraction.checked_mul(weight)?)?;
        totals.weight_sum = totals.weight_sum.checked_add(weight)?;
        totals.counted += 1;
    }

    Some(totals)
}

/// Accumulate the weighted contribution of every gradable result.
///
/// Results against unknown exams, exams with a non-positive max score and
/// exams with a negative weight are skipped. When the raw weights overflow
/// the decimal range, every weight is divided by the largest one first; the
/// percentage is unchanged by that rescaling.
pub fn weighted_totals(results: &[ExamResult], exams: &[Exam]) -> WeightedTotals {
    // Later definitions overwrite earlier ones with the same id.
    let by_id: HashMap<Uuid, &Exam> = exams.iter().map(|e| (e.id, e)).collect();

    let gradable: Vec<(Decimal, Decimal)> = results
        .iter()
        .filter_map(|result| gradable_share(result, &by_id))
        .collect();

    if let Some(totals) = sum_weighted(&gradable, Decimal::ONE) {
        return totals;
    }

    let largest = gradable
        .iter()
        .map(|&(_, weight)| weight)
        .max()
        .unwrap_or(Decimal::ONE);
    warn!("Exam weights overflow, rescaling by the largest weight {}", largest);

    sum_weighted(&gradable, largest).unwrap_or_default()
}

/// Aggregate exam results into a grade under the given thresholds.
pub fn aggregate(results: &[ExamResult], exams: &[Exam], thresholds: &GradeThresholds) -> Grade {
    let percent = weighted_totals(results, exams).percent();

    Grade {
        final_percent: percent,
        letter: thresholds.letter_for(percent),
    }
}
