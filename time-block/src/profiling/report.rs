//! Tabular summary of a stats snapshot, one line per call path

use std::collections::BTreeMap;

use super::stats_store::{CallPath, StatsSnapshot};
use crate::util::{
    humanize::mem2str,
    statistics::{mean, stddev},
};

/// Aggregates for one call path.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub path: CallPath,
    pub n_calls: usize,
    /// Mean duration of the path, seconds
    pub time_mean: f64,
    pub time_std: f64,
    /// Memory delta mean and spread, scaled to `mem_unit`
    pub mem_mean: f64,
    pub mem_std: f64,
    pub mem_unit: &'static str,
    /// Share of the root call's mean (root call: the first two labels)
    pub percent_total: f64,
    /// Share of the parent path's mean
    pub percent_parent: f64,
}

impl ReportRow {
    /// Mean per call within one sample.
    pub fn per_call_mean(&self) -> f64 {
        self.time_mean / self.n_calls as f64
    }

    /// Spread shown next to the per-call mean (`time_std * n_calls`).
    pub fn per_call_std(&self) -> f64 {
        self.time_std * self.n_calls as f64
    }

    fn render(&self, path_width: usize) -> String {
        let path = self.path.to_string();
        [
            format!("{path:<path_width$}"),
            format!("{}% of total", signed_space(self.percent_total)),
            format!("{}% of parent", signed_space(self.percent_parent)),
            format!("({:3.1} +/- {:3.1}) sec", self.time_mean, self.time_std),
            format!(
                "{:>3}*({:3.1} +/- {:3.1}) sec using ({:.1} +/- {:.1}) {}",
                self.n_calls,
                self.per_call_mean(),
                self.per_call_std(),
                self.mem_mean,
                self.mem_std,
                self.mem_unit
            ),
        ]
        .join(" = ")
    }
}

/// Width 4, no decimals, a space where a minus sign would go.
fn signed_space(value: f64) -> String {
    let body = if value.is_sign_negative() {
        format!("{value:.0}")
    } else {
        format!(" {value:.0}")
    };
    format!("{body:>4}")
}

fn percent_of(value: f64, denominator: Option<f64>) -> f64 {
    match denominator {
        Some(d) if d != 0.0 => value / d * 100.0,
        _ => 100.0,
    }
}

/// Rows for every path with at least one sample, in path order.
pub fn report_rows(snapshot: &StatsSnapshot) -> Vec<ReportRow> {
    let durations: BTreeMap<&CallPath, Vec<f64>> = snapshot
        .iter()
        .filter(|(_, samples)| !samples.is_empty())
        .map(|(path, samples)| (path, samples.iter().map(|s| s.duration).collect()))
        .collect();
    let means: BTreeMap<&CallPath, f64> = durations
        .iter()
        .map(|(path, values)| (*path, mean(values)))
        .collect();

    snapshot
        .iter()
        .filter(|(_, samples)| !samples.is_empty())
        .map(|(path, samples)| {
            let values = &durations[path];
            let time_mean = means[path];
            let mem: Vec<f64> = samples.iter().map(|s| s.mem_delta as f64).collect();
            let (mem_mean, mem_unit, unit_size) = mem2str(mean(&mem), true, false);

            ReportRow {
                path: path.clone(),
                n_calls: samples.len(),
                time_mean,
                time_std: stddev(values),
                mem_mean,
                mem_std: stddev(&mem) / unit_size,
                mem_unit,
                percent_total: percent_of(time_mean, means.get(&path.root_call()).copied()),
                percent_parent: percent_of(time_mean, means.get(&path.parent()).copied()),
            }
        })
        .collect()
}

/// The full report; empty when nothing was recorded.
pub fn format_stats(snapshot: &StatsSnapshot) -> String {
    let rows = report_rows(snapshot);
    let width = rows
        .iter()
        .map(|row| row.path.to_string().chars().count())
        .max()
        .unwrap_or(0);

    rows.iter()
        .map(|row| row.render(width))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiling::stats_store::Sample;

    fn path(labels: &[&str]) -> CallPath {
        CallPath::new(labels.iter().copied())
    }

    /// One zero-memory sample per `(joined path, duration)` entry.
    fn snapshot(entries: &[(&str, f64)]) -> StatsSnapshot {
        let mut snapshot = StatsSnapshot::default();
        for (joined, duration) in entries {
            let labels: Vec<&str> = joined.split(" > ").collect();
            snapshot.push(path(&labels), Sample::new(*duration, 0));
        }
        snapshot
    }

    #[test]
    fn test_two_level_report_lines() {
        let stats = snapshot(&[("foo", 0.4), ("foo > bar", 0.1)]);
        let report = format_stats(&stats);
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(
            lines,
            vec![
                "foo       =  100% of total =  100% of parent = (0.4 +/- 0.0) sec =   1*(0.4 +/- 0.0) sec using (0.0 +/- 0.0) B",
                "foo > bar =  100% of total =   25% of parent = (0.1 +/- 0.0) sec =   1*(0.1 +/- 0.0) sec using (0.0 +/- 0.0) B",
            ]
        );
    }

    #[test]
    fn test_root_call_is_first_two_labels() {
        let stats = snapshot(&[("a", 1.0), ("a > b", 0.8), ("a > b > c", 0.2)]);
        let rows = report_rows(&stats);

        assert_eq!(rows.len(), 3);
        let c = &rows[2];
        assert_eq!(c.path, path(&["a", "b", "c"]));
        assert!((c.percent_total - 25.0).abs() < 1e-9);
        assert!((c.percent_parent - 25.0).abs() < 1e-9);
        assert!((rows[1].percent_parent - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_or_zero_denominators_give_hundred() {
        let stats = snapshot(&[("orphan > child", 0.5), ("zero", 0.0), ("zero > x", 0.1)]);
        let rows = report_rows(&stats);

        let orphan = &rows[0];
        assert_eq!(orphan.percent_parent, 100.0);
        assert_eq!(orphan.percent_total, 100.0);
        let x = rows.iter().find(|r| r.path == path(&["zero", "x"])).unwrap();
        assert_eq!(x.percent_parent, 100.0);
    }

    #[test]
    fn test_repeated_samples_and_memory_units() {
        let mut stats = StatsSnapshot::default();
        stats.push(path(&["io"]), Sample::new(0.1, 2048));
        stats.push(path(&["io"]), Sample::new(0.3, 4096));
        let rows = report_rows(&stats);

        let io = &rows[0];
        assert_eq!(io.n_calls, 2);
        assert!((io.time_mean - 0.2).abs() < 1e-9);
        assert!((io.per_call_mean() - 0.1).abs() < 1e-9);
        assert!((io.per_call_std() - 2.0 * io.time_std).abs() < 1e-12);
        assert_eq!(io.mem_unit, "KiB");
        assert!((io.mem_mean - 3.0).abs() < 1e-9);

        let line = format_stats(&stats);
        assert!(line.contains("=   2*(0.1 +/- 0.3) sec"));
        assert!(line.ends_with("using (3.0 +/- 1.4) KiB"));
    }

    #[test]
    fn test_signed_space() {
        assert_eq!(signed_space(100.0), " 100");
        assert_eq!(signed_space(25.0), "  25");
        assert_eq!(signed_space(-5.0), "  -5");
    }

    #[test]
    fn test_empty_snapshot_formats_empty() {
        assert_eq!(format_stats(&StatsSnapshot::default()), "");
    }
}
