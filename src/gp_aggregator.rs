//! Thread-safe aggregation of trial outcomes and the final report built from it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::gp_epoch::TrialOutcome;
use crate::gp_experiment::ExperimentConfig;
use crate::gp_interface::{Algorithm, HISTOGRAM_BUCKETS};

/// Collects outcomes from every worker of a batch.
///
/// Each counter has its own lock. The aggregator is consumed by
/// `into_report`, so nothing can be recorded once the report exists.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    /// epochs to fill -> number of trials
    histogram: Mutex<BTreeMap<usize, usize>>,
    reused: Mutex<usize>,
    non_convergent: Mutex<usize>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_epochs(&self, epochs: usize) {
        let mut histogram = self.histogram.lock().unwrap_or_else(PoisonError::into_inner);
        *histogram.entry(epochs).or_insert(0) += 1;
    }

    pub fn add_reused(&self, reused: usize) {
        *self.reused.lock().unwrap_or_else(PoisonError::into_inner) += reused;
    }

    pub fn record_non_convergent(&self) {
        *self.non_convergent.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    /// Fold one trial outcome into the counters
    pub fn record(&self, outcome: TrialOutcome) {
        match outcome {
            TrialOutcome::Filled { epochs, reused } => {
                self.record_epochs(epochs);
                self.add_reused(reused);
            }
            TrialOutcome::NonConvergent => self.record_non_convergent(),
        }
    }

    pub fn into_report(self, config: &ExperimentConfig) -> ExperimentReport {
        ExperimentReport {
            size: config.size,
            fanout: config.fanout,
            algorithm: config.algorithm,
            trials: config.trials,
            histogram: self
                .histogram
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner),
            total_reused: self.reused.into_inner().unwrap_or_else(PoisonError::into_inner),
            non_convergent: self
                .non_convergent
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner),
            elapsed: Duration::ZERO,
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// Aggregated statistics of a finished batch
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentReport {
    pub size: usize,
    pub fanout: usize,
    pub algorithm: Algorithm,
    pub trials: usize,
    /// epochs to fill -> number of trials
    pub histogram: BTreeMap<usize, usize>,
    /// Redundant sends summed over the filled trials
    pub total_reused: usize,
    pub non_convergent: usize,
    /// Wall time of the whole batch
    pub elapsed: Duration,
}

impl ExperimentReport {
    pub fn histogram(&self) -> &BTreeMap<usize, usize> {
        &self.histogram
    }

    pub fn filled(&self) -> usize {
        self.histogram.values().sum()
    }

    /// Integer mean of redundant sends over all trials
    pub fn mean_reused(&self) -> usize {
        if self.trials == 0 {
            0
        } else {
            self.total_reused / self.trials
        }
    }

    /// Percentage of trials stopped by the epoch guard
    pub fn non_convergence_rate(&self) -> f64 {
        self.percent_of_trials(self.non_convergent)
    }

    /// `(epochs, trials, percentage)` for every observed epoch count, ascending
    pub fn coverage_percentages(&self) -> Vec<(usize, usize, f64)> {
        self.histogram
            .iter()
            .map(|(&epochs, &count)| (epochs, count, self.percent_of_trials(count)))
            .collect()
    }

    /// Dense `size;fanout;c0;...;c19;` line, `ck` counting trials filled
    /// during epoch index `k`
    pub fn histogram_line(&self) -> String {
        let mut line = format!("{};{};", self.size, self.fanout);
        for index in 0..HISTOGRAM_BUCKETS {
            let count = self.histogram.get(&(index + 1)).copied().unwrap_or(0);
            line.push_str(&format!("{};", count));
        }
        line
    }

    pub fn print_summary(&self) {
        println!("{}", self);
    }

    fn percent_of_trials(&self, count: usize) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            count as f64 / self.trials as f64 * 100.0
        }
    }
}

impl fmt::Display for ExperimentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Size: {} Fan-out: {}", self.size, self.fanout)?;
        for (epochs, count, percent) in self.coverage_percentages() {
            write!(f, "{}:{} ({:.2}%)  ", epochs, count, percent)?;
        }
        writeln!(
            f,
            "inf:{} ({:.2}%)",
            self.non_convergent,
            self.non_convergence_rate()
        )?;
        write!(f, "Reused avg: {}", self.mean_reused())
    }
}
