/*!
Derived statistics for a single student's marks.
*/
use serde::Serialize;

use crate::store::marks::MarkRecord;

/// Marks strictly below this make a subject "weak".
pub const WEAK_THRESHOLD: f64 = 50.0;
/// An average at or above this is excellent.
pub const EXCELLENT_THRESHOLD: f64 = 80.0;

const TREND_TOLERANCE: f64 = 1e-9;

pub static NO_MARKS: &str = "No marks available yet.";

static MATH_ADVICE: &[&str] = &[
    "Practice daily problem solving",
    "Focus on understanding formulas",
    "Solve past exam questions",
];
static ENGLISH_ADVICE: &[&str] = &[
    "Improve vocabulary daily",
    "Practice reading comprehension",
    "Write essays weekly",
];
static SCIENCE_ADVICE: &[&str] = &[
    "Understand concepts",
    "Watch experiment videos",
    "Create summary notes",
];
static DEFAULT_ADVICE: &[&str] = &[
    "Study regularly",
    "Revise weak topics",
    "Ask your teacher questions",
];

/// Study advice for `subject`; case doesn't matter.
pub fn advice_for(subject: &str) -> &'static [&'static str] {
    match subject.to_lowercase().as_str() {
        "math" => MATH_ADVICE,
        "english" => ENGLISH_ADVICE,
        "science" => SCIENCE_ADVICE,
        _ => DEFAULT_ADVICE,
    }
}

/// Round to two decimal places for display.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/**
Ordinary least-squares line through `(i, ys[i])`.

Returns `(slope, intercept)`, or `None` with fewer than two points.
*/
pub fn fit_line(ys: &[f64]) -> Option<(f64, f64)> {
    let n = ys.len();
    if n < 2 {
        return None;
    }

    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = ys.iter().sum::<f64>() / nf;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, y) in ys.iter().enumerate() {
        let dx = (i as f64) - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    Some((slope, intercept))
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl Trend {
    /// Compare a `predicted` next score against the current `average`.
    pub fn judge(predicted: f64, average: f64) -> Trend {
        let delta = predicted - average;
        if delta > TREND_TOLERANCE {
            Trend::Improving
        } else if delta < -TREND_TOLERANCE {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Trend::Improving => "Your performance trend is improving!",
            Trend::Declining => "Your performance trend is declining. Focus more!",
            Trend::Stable => "Your performance is stable.",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    Excellent,
    Good,
    NeedsImprovement,
}

impl Standing {
    pub fn from_average(average: f64) -> Standing {
        if average >= EXCELLENT_THRESHOLD {
            Standing::Excellent
        } else if average >= WEAK_THRESHOLD {
            Standing::Good
        } else {
            Standing::NeedsImprovement
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Standing::Excellent => "Excellent performance! Keep pushing!",
            Standing::Good => "Good progress. Focus on weak subjects to improve.",
            Standing::NeedsImprovement => "Significant improvement needed. Make a study plan and stay consistent.",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Prediction {
    pub predicted: f64,
    pub trend: Trend,
    pub message: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub struct Advice {
    pub subject: String,
    pub marks: f64,
    pub tips: &'static [&'static str],
}

#[derive(Clone, Debug, Serialize)]
pub struct Summary {
    pub average: f64,
    pub weak: Vec<MarkRecord>,
    pub prediction: Option<Prediction>,
    pub advice: Vec<Advice>,
    pub standing: Standing,
    pub standing_message: &'static str,
}

/**
Everything the student view shows.

`summary` is `None` exactly when the student has no marks, in which case
`notice` holds the message to show instead.
*/
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub student: String,
    pub records: Vec<MarkRecord>,
    pub summary: Option<Summary>,
    pub notice: Option<&'static str>,
}

impl Report {
    /// Build the report for `student` from that student's `records`, which
    /// should be in chronological order.
    pub fn for_student(student: &str, records: Vec<MarkRecord>) -> Report {
        log::trace!(
            "Report::for_student( {:?}, [ {} records ] ) called.",
            student, records.len()
        );

        if records.is_empty() {
            return Report {
                student: student.to_owned(),
                records,
                summary: None,
                notice: Some(NO_MARKS),
            };
        }

        let scores: Vec<f64> = records.iter().map(|r| r.marks).collect();
        let average = scores.iter().sum::<f64>() / (scores.len() as f64);

        let weak: Vec<MarkRecord> = records.iter()
            .filter(|r| r.marks < WEAK_THRESHOLD)
            .cloned()
            .collect();

        let prediction = fit_line(&scores).map(|(slope, intercept)| {
            let predicted = slope * (scores.len() as f64) + intercept;
            let trend = Trend::judge(predicted, average);
            Prediction { predicted, trend, message: trend.message() }
        });

        let advice: Vec<Advice> = weak.iter()
            .map(|r| Advice {
                subject: r.subject.clone(),
                marks: r.marks,
                tips: advice_for(&r.subject),
            }).collect();

        let standing = Standing::from_average(average);

        let summary = Summary {
            average,
            weak,
            prediction,
            advice,
            standing,
            standing_message: standing.message(),
        };

        Report {
            student: student.to_owned(),
            records,
            summary: Some(summary),
            notice: None,
        }
    }
}
