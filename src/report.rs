use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::config::ReportFormat;
use crate::store::{SampleStore, Statistics};

/// One report, as written in JSON mode.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReportLine {
    pub received: u64,
    pub entries: usize,
    pub mean: f64,
    pub stddev: f64,
    pub rho: f64,
    pub dropped: u64,
}

impl ReportLine {
    pub fn new(received: u64, stats: &Statistics, dropped: u64) -> Self {
        ReportLine {
            received,
            entries: stats.n,
            mean: stats.mean,
            stddev: stats.stddev,
            rho: stats.rho,
            dropped,
        }
    }

    /// `<received> packets, <n> entries: mu <mean> sigma <stddev> rho <rho>`
    pub fn to_text(&self) -> String {
        format!(
            "{} packets, {} entries: mu {:6.4} sigma {:6.4} rho {:6.4}",
            self.received, self.entries, self.mean, self.stddev, self.rho
        )
    }
}

/// Writes one line per report and flushes it straight away.
pub struct Reporter<W: Write> {
    out: W,
    format: ReportFormat,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: ReportFormat) -> Self {
        Reporter { out, format }
    }

    /// Print statistics for everything in `store`. Nothing is written for an
    /// empty store; returns whether a line went out.
    pub fn report(&mut self, received: u64, store: &SampleStore) -> Result<bool> {
        let stats = match store.statistics() {
            Some(s) => s,
            None => return Ok(false),
        };
        let line = ReportLine::new(received, &stats, store.dropped());

        match self.format {
            ReportFormat::Text => writeln!(self.out, "{}", line.to_text())?,
            ReportFormat::Json => {
                serde_json::to_writer(&mut self.out, &line)?;
                writeln!(self.out)?;
            }
        }
        self.out.flush()?;
        Ok(true)
    }

    pub fn writer(&self) -> &W {
        &self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(samples: &[i64]) -> SampleStore {
        let mut store = SampleStore::default();
        for &s in samples {
            store.record(s);
        }
        store
    }

    fn output(reporter: &Reporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.writer().clone()).unwrap()
    }

    #[test]
    fn test_text_line_format() {
        let mut reporter = Reporter::new(Vec::new(), ReportFormat::Text);
        assert!(reporter.report(2, &store_with(&[0, 100])).unwrap());
        assert_eq!(
            output(&reporter),
            "2 packets, 2 entries: mu 50.0000 sigma 70.7107 rho -1.0000\n"
        );
    }

    #[test]
    fn test_text_line_single_sample() {
        let mut reporter = Reporter::new(Vec::new(), ReportFormat::Text);
        reporter.report(7, &store_with(&[1])).unwrap();
        assert_eq!(
            output(&reporter),
            "7 packets, 1 entries: mu 1.0000 sigma 0.0000 rho 0.0000\n"
        );
    }

    #[test]
    fn test_received_count_can_exceed_entries() {
        let mut store = SampleStore::new(1, 1);
        store.record(5);
        store.record(6);
        let mut reporter = Reporter::new(Vec::new(), ReportFormat::Text);
        reporter.report(2, &store).unwrap();
        assert!(output(&reporter).starts_with("2 packets, 1 entries:"));
    }

    #[test]
    fn test_empty_store_prints_nothing() {
        let mut reporter = Reporter::new(Vec::new(), ReportFormat::Text);
        assert!(!reporter.report(3, &SampleStore::default()).unwrap());
        assert!(output(&reporter).is_empty());
    }

    #[test]
    fn test_json_line() {
        let mut store = SampleStore::new(2, 1);
        for s in [10, 20, 30] {
            store.record(s);
        }
        let mut reporter = Reporter::new(Vec::new(), ReportFormat::Json);
        reporter.report(3, &store).unwrap();

        let text = output(&reporter);
        assert!(text.ends_with('\n'));
        let line: ReportLine = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(line.received, 3);
        assert_eq!(line.entries, 2);
        assert_eq!(line.mean, 15.0);
        assert_eq!(line.dropped, 1);
    }
}
