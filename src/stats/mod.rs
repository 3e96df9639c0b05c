//! Aggregate statistics over a result log

use crate::bench::{BenchmarkRecord, RunStatus};
use crate::smt::QueryResult;
use std::fmt;

/// Counters and samples gathered from a set of records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub ntasks: usize,
    pub ncollapse: usize,
    pub ntimeout: usize,
    /// Timed out, but a sound network was found within the limit
    pub ntimeout_but_found: usize,
    pub conv_times: Vec<f64>,
    pub query_gen_times: Vec<f64>,
    pub nqueries: Vec<f64>,
    /// Percent of the convergence time spent before the first constraint
    pub first_learned_rates: Vec<f64>,
    pub npos_queries: Vec<f64>,
    pub nneg_queries: Vec<f64>,
    pub clause_sizes: Vec<f64>,
    pub not_equiv: usize,
    pub equiv_unknown: usize,
    pub not_implies: usize,
    pub implies_unknown: usize,
    pub is_false: usize,
    pub false_unknown: usize,
    pub answer_timeouted: usize,
}

impl Summary {
    /// Aggregate `records`
    ///
    /// With `timeout` set, a run whose convergence time exceeds it counts as
    /// a time-out even if the engine finished.
    pub fn from_records<'a, I>(records: I, timeout: Option<f64>) -> Self
    where
        I: IntoIterator<Item = &'a BenchmarkRecord>,
    {
        let mut summary = Summary::default();
        for record in records {
            summary.add(record, timeout);
        }
        summary
    }

    fn add(&mut self, record: &BenchmarkRecord, timeout: Option<f64>) {
        self.ntasks += 1;

        match record.status {
            RunStatus::Error => return,
            RunStatus::Collapsed if !record.is_timed_out() => {
                self.ncollapse += 1;
                return;
            }
            _ => {}
        }

        let engine = record.engine.as_ref();
        if engine.is_some_and(|e| e.answer_timeouted) {
            self.answer_timeouted += 1;
        }

        let conv_time = engine.and_then(|e| e.conv_time);
        let over_limit = matches!((timeout, conv_time), (Some(t), Some(c)) if c > t);
        if record.is_timed_out() || over_limit {
            self.ntimeout += 1;
            let sound_in_time = engine.is_some_and(|e| {
                e.has_network()
                    && e.last_sound_network_time
                        .is_some_and(|t| timeout.map_or(true, |limit| t < limit))
            });
            if !sound_in_time {
                return;
            }
            self.ntimeout_but_found += 1;
        }

        let (Some(engine), Some(equiv), Some(implies), Some(is_false)) =
            (engine, record.equiv, record.implies, record.isfalse)
        else {
            return;
        };

        let conv_time = conv_time.unwrap_or(0.0);
        self.conv_times.push(conv_time);
        self.query_gen_times.push(engine.query_gen_mean.unwrap_or(0.0));
        self.nqueries.push(engine.nb_queries.unwrap_or(0.0));
        if let Some(first) = engine.time_first_constr_learned {
            if conv_time > 0.0 {
                self.first_learned_rates.push(first * 100.0 / conv_time);
            }
        }
        self.npos_queries.push(engine.nb_pos_queries.unwrap_or(0.0));
        self.nneg_queries.push(engine.nb_neg_queries.unwrap_or(0.0));
        self.clause_sizes.push(record.clause_size.unwrap_or(0) as f64);

        match equiv {
            QueryResult::NotEquivalent => self.not_equiv += 1,
            QueryResult::Unknown => self.equiv_unknown += 1,
            QueryResult::Equivalent => {}
        }
        match implies {
            QueryResult::NotEquivalent => self.not_implies += 1,
            QueryResult::Unknown => self.implies_unknown += 1,
            QueryResult::Equivalent => {}
        }
        // "Equivalent to false" means the learned network admits no input
        match is_false {
            QueryResult::Equivalent => self.is_false += 1,
            QueryResult::Unknown => self.false_unknown += 1,
            QueryResult::NotEquivalent => {}
        }
    }

    /// Runs whose network went through the oracle
    pub fn processed(&self) -> usize {
        self.conv_times.len()
    }
}

pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Population standard deviation
pub fn std_dev(samples: &[f64]) -> Option<f64> {
    let m = mean(samples)?;
    let var = samples.iter().map(|x| (x - m).powi(2)).sum::<f64>() / samples.len() as f64;
    Some(var.sqrt())
}

fn min(samples: &[f64]) -> Option<f64> {
    samples.iter().copied().reduce(f64::min)
}

fn max(samples: &[f64]) -> Option<f64> {
    samples.iter().copied().reduce(f64::max)
}

fn total(samples: &[f64]) -> Option<f64> {
    (!samples.is_empty()).then(|| samples.iter().sum())
}

/// Two decimals, or `-` when there is nothing to show
struct Num(Option<f64>);

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(x) => write!(f, "{:.2}", x),
            None => write!(f, "-"),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.conv_times;
        writeln!(
            f,
            "Mean convergence time: {} s \u{00B1} {}",
            Num(mean(t)),
            Num(std_dev(t))
        )?;
        writeln!(f, "Min convergence time: {} s", Num(min(t)))?;
        writeln!(f, "Max convergence time: {} s", Num(max(t)))?;
        writeln!(f, "Total convergence time: {} s\n", Num(total(t)))?;

        writeln!(f, "Mean number of query {}", Num(mean(&self.nqueries)))?;
        writeln!(f, "Mean query generation time {} s", Num(mean(&self.query_gen_times)))?;
        writeln!(
            f,
            "Mean time rate to learn first constraint {}%",
            Num(mean(&self.first_learned_rates))
        )?;
        writeln!(f, "Mean number of positive queries {}", Num(mean(&self.npos_queries)))?;
        writeln!(f, "Mean number of negative queries {}\n", Num(mean(&self.nneg_queries)))?;

        writeln!(f, "Mean clause size: {}", Num(mean(&self.clause_sizes)))?;
        writeln!(f, "Min clause size: {}", Num(min(&self.clause_sizes)))?;
        writeln!(f, "Max clause size: {}\n", Num(max(&self.clause_sizes)))?;

        let n = self.processed();
        writeln!(f, "#Collapse: {} / {}", self.ncollapse, self.ntasks)?;
        writeln!(f, "#Timeout: {} / {}", self.ntimeout, self.ntasks)?;
        writeln!(
            f,
            "#Timeout but found a sound approx: {} / {}",
            self.ntimeout_but_found, self.ntasks
        )?;
        writeln!(
            f,
            "#Not equiv: {} - {} / {}",
            self.not_equiv,
            self.not_equiv + self.equiv_unknown,
            n
        )?;
        writeln!(
            f,
            "#Not implies: {} - {} / {}",
            self.not_implies,
            self.not_implies + self.implies_unknown,
            n
        )?;
        writeln!(
            f,
            "#False: {} - {} / {}\n",
            self.is_false,
            self.is_false + self.false_unknown,
            n
        )?;
        write!(f, "#Ask timeouted: {}", self.answer_timeouted)
    }
}
