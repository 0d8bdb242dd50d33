use std::io::{self, Write};
use std::num::NonZero;

use crate::{BenchConfig, LatencySketch};

/// The merged results of a benchmark run, ready for printing.
///
/// Carries the aggregate [`LatencySketch`] together with the output choices
/// of the run's configuration. The printed forms are byte-stable so CSV
/// output can be consumed by scripts.
#[derive(Clone, Debug)]
pub struct RunReport {
    sketch: LatencySketch,
    thread_num: NonZero<usize>,
    measure_throughput: bool,
    output_as_csv: bool,
    target_percentiles: Vec<f64>,
}

impl RunReport {
    pub(crate) fn new(sketch: LatencySketch, config: &BenchConfig) -> Self {
        Self {
            sketch,
            thread_num: config.thread_num(),
            measure_throughput: config.measure_throughput(),
            output_as_csv: config.output_as_csv(),
            target_percentiles: config.target_percentiles().to_vec(),
        }
    }

    /// The merged sketch across all workers.
    #[must_use]
    pub fn sketch(&self) -> &LatencySketch {
        &self.sketch
    }

    /// Operations per second, computed from the logical operation total and
    /// the per-thread average of the measured nanoseconds.
    ///
    /// An empty run (no operations, or no measurable elapsed time) reports 0
    /// rather than dividing by zero.
    #[must_use]
    pub fn throughput(&self) -> f64 {
        let exec_count = self.sketch.total_exec_count();
        let avg_nano_time = self.sketch.total_exec_time_nano() / self.thread_num.get() as u64;
        if exec_count == 0 || avg_nano_time == 0 {
            return 0.0;
        }

        #[expect(
            clippy::cast_precision_loss,
            reason = "nanosecond totals and operation counts are far below 2^52 in any real run"
        )]
        let ops_per_sec = exec_count as f64 / (avg_nano_time as f64 / 1e9);
        ops_per_sec
    }

    /// Writes the run's results in the configured form.
    ///
    /// Throughput mode emits a single line; latency mode emits one block per
    /// operation kind that has samples, with one line per configured
    /// quantile.
    ///
    /// # Errors
    ///
    /// Returns any error of the underlying writer.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if self.measure_throughput {
            self.write_throughput(out)
        } else {
            self.write_latency(out)
        }
    }

    /// Writes the run's results to standard output.
    ///
    /// # Errors
    ///
    /// Returns any error of writing to standard output.
    #[cfg_attr(test, mutants::skip)] // Writes to the real stdout; covered via write_to.
    pub fn print(&self) -> io::Result<()> {
        self.write_to(&mut io::stdout().lock())
    }

    fn write_throughput<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if self.output_as_csv {
            writeln!(out, "{}", self.throughput())
        } else {
            writeln!(out, "Throughput [OPS/s]: {}", self.throughput())
        }
    }

    fn write_latency<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if !self.output_as_csv {
            writeln!(out, "Percentile Latency [ns]:")?;
        }

        for kind in 0..self.sketch.kind_count() {
            if !self.sketch.has_samples(kind) {
                continue;
            }

            if !self.output_as_csv {
                writeln!(out, " OPS ID {kind}:")?;
            }

            for &q in &self.target_percentiles {
                let latency = self.sketch.quantile(kind, q);
                if self.output_as_csv {
                    writeln!(out, "{kind},{q},{latency}")?;
                } else {
                    writeln!(out, "  {:6.2}: {latency:12}", 100.0 * q)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use new_zealand::nz;

    use super::*;

    fn render(report: &RunReport) -> String {
        let mut out = Vec::new();
        report.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn throughput_config(threads: usize, csv: bool) -> BenchConfig {
        BenchConfig::new()
            .with_thread_num(NonZero::new(threads).unwrap())
            .with_measure_throughput(true)
            .with_output_as_csv(csv)
    }

    #[test]
    fn text_throughput_is_one_labeled_line() {
        // 1000 operations over an average of 50 us per thread.
        let mut sketch = LatencySketch::new(1);
        for _ in 0..1000 {
            sketch.add(0, 1, 100);
        }
        let report = RunReport::new(sketch, &throughput_config(2, false));

        assert_eq!(render(&report), "Throughput [OPS/s]: 20000000\n");
    }

    #[test]
    fn csv_throughput_is_the_bare_number() {
        let mut sketch = LatencySketch::new(1);
        for _ in 0..1000 {
            sketch.add(0, 1, 100);
        }
        let report = RunReport::new(sketch, &throughput_config(2, true));

        assert_eq!(render(&report), "20000000\n");
    }

    #[test]
    fn throughput_scales_with_threads_for_equal_per_thread_work() {
        // One thread recording 500 operations of 100 ns...
        let mut single = LatencySketch::new(1);
        for _ in 0..500 {
            single.add(0, 1, 100);
        }
        let single_report = RunReport::new(single, &throughput_config(1, false));

        // ...and two threads recording 500 such operations each.
        let mut double = LatencySketch::new(1);
        for _ in 0..1000 {
            double.add(0, 1, 100);
        }
        let double_report = RunReport::new(double, &throughput_config(2, false));

        assert!((single_report.throughput() - 1e7).abs() < 1e-3);
        assert!((double_report.throughput() - 2e7).abs() < 1e-3);
    }

    #[test]
    fn empty_run_reports_zero_throughput() {
        let report = RunReport::new(LatencySketch::new(1), &throughput_config(4, false));

        assert_eq!(report.throughput(), 0.0);
        assert_eq!(render(&report), "Throughput [OPS/s]: 0\n");
    }

    #[test]
    fn text_latency_table_is_padded_per_kind() {
        let mut sketch = LatencySketch::new(2);
        for _ in 0..10 {
            sketch.add(0, 1, 100);
        }
        let config = BenchConfig::new().with_target_percentiles(vec![0.0, 0.5, 1.0]);
        let report = RunReport::new(sketch, &config);

        assert_eq!(
            render(&report),
            "Percentile Latency [ns]:\n\
             \x20OPS ID 0:\n\
             \x20   0.00:          100\n\
             \x20  50.00:          100\n\
             \x20 100.00:          100\n"
        );
    }

    #[test]
    fn csv_latency_has_one_line_per_sampled_kind_and_quantile() {
        let mut sketch = LatencySketch::new(3);
        for _ in 0..300 {
            sketch.add(0, 1, 50);
        }
        for _ in 0..700 {
            sketch.add(1, 1, 200);
        }
        let config = BenchConfig::new()
            .with_output_as_csv(true)
            .with_target_percentiles(vec![0.5, 0.99]);
        let report = RunReport::new(sketch, &config);

        assert_eq!(render(&report), "0,0.5,50\n0,0.99,50\n1,0.5,200\n1,0.99,200\n");
    }

    #[test]
    fn kinds_without_samples_are_omitted() {
        let mut sketch = LatencySketch::new(2);
        sketch.add(1, 1, 80);
        let config = BenchConfig::new().with_target_percentiles(vec![0.5]);
        let report = RunReport::new(sketch, &config);

        let rendered = render(&report);
        assert!(!rendered.contains("OPS ID 0"));
        assert!(rendered.contains("OPS ID 1"));
    }

    #[test]
    fn empty_latency_run_prints_only_the_header() {
        let report = RunReport::new(
            LatencySketch::new(2),
            &BenchConfig::new().with_thread_num(nz!(2)),
        );

        assert_eq!(render(&report), "Percentile Latency [ns]:\n");
    }
}
