use std::fmt;

use serde::Serialize;

use super::Fingerprint;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Match,
    NoMatch,
}

/// Mean of `|a[i] - b[i]|²` over the common prefix of both fingerprints.
pub fn mean_squared_error(a: &Fingerprint, b: &Fingerprint) -> f64 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let sum: f64 = a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(&x, &y)| (x - y).norm_sqr())
        .sum();
    sum / len as f64
}

/// Exact spectral equality: any non-zero error is a mismatch.
pub fn verdict_for(mse: f64) -> Verdict {
    if mse == 0.0 {
        Verdict::Match
    } else {
        Verdict::NoMatch
    }
}

/// Verdict for two fingerprints, with the error it was decided on.
pub fn compare(a: &Fingerprint, b: &Fingerprint) -> (Verdict, f64) {
    let mse = mean_squared_error(a, b);
    (verdict_for(mse), mse)
}

/// Outcome of comparing two files, identified by their short names.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub verdict: Verdict,
    pub first: String,
    pub second: String,
    pub mse: f64,
}

impl ComparisonResult {
    pub fn is_match(&self) -> bool {
        self.verdict == Verdict::Match
    }
}

impl fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.verdict {
            Verdict::Match => write!(f, "MATCH {} {}", self.first, self.second),
            Verdict::NoMatch => f.write_str("NO MATCH"),
        }
    }
}
