//! Text and JSON rendering of sampling passes

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::time::Duration;

use crate::policy::{CpuId, FrequencyKHz};
use crate::sampling_loop::{CpuReading, CpuReport};

/// Output format for sampling results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Fixed-width table (default)
    #[default]
    Text,
    /// One JSON object per CPU per pass
    Json,
}

pub const TABLE_HEADER: &str =
    "CPU\tAverage freq(KHz)\tTime in C0\tTime in Cx\tC0 percentage";

/// `SS sec MMM ms`
pub fn format_duration(duration: Duration) -> String {
    format!(
        "{:02} sec {:03} ms",
        duration.as_secs(),
        duration.subsec_millis()
    )
}

/// One table row, without line terminator
pub fn format_row(report: &CpuReport) -> String {
    match report.reading {
        CpuReading::Offline => format!("{:03}\t[offline]", report.cpu),
        CpuReading::Sample(sample) => format!(
            "{:03}\t{:07}\t\t\t{}\t{}\t{:02}",
            report.cpu,
            sample.average_freq,
            format_duration(sample.active_time),
            format_duration(sample.sleep_time),
            sample.active_percent
        ),
    }
}

/// Destination for sampling passes
pub trait ReportSink {
    fn begin(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn write_pass(&mut self, reports: &[CpuReport]) -> io::Result<()>;

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Fixed-width table writer
///
/// With a single CPU in continuous mode the row is redrawn in place;
/// otherwise passes are separated by a blank line.
pub struct TextTable<W: Write> {
    out: W,
    single_cpu: bool,
    once: bool,
    redrawing: bool,
}

impl<W: Write> TextTable<W> {
    pub fn new(out: W, single_cpu: bool, once: bool) -> Self {
        Self {
            out,
            single_cpu,
            once,
            redrawing: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for TextTable<W> {
    fn begin(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", TABLE_HEADER)
    }

    fn write_pass(&mut self, reports: &[CpuReport]) -> io::Result<()> {
        let in_place = self.single_cpu && !self.once;

        for report in reports {
            let row = format_row(report);
            if in_place && matches!(report.reading, CpuReading::Sample(_)) {
                write!(self.out, "{}\r", row)?;
                self.redrawing = true;
            } else {
                writeln!(self.out, "{}", row)?;
                self.redrawing = false;
            }
        }

        if !self.single_cpu && !self.once {
            writeln!(self.out)?;
        }
        self.out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.redrawing {
            writeln!(self.out)?;
            self.redrawing = false;
        }
        self.out.flush()
    }
}

/// Serialized form of one CPU row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRecord {
    pub pass: u64,
    pub cpu: CpuId,
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_freq_khz: Option<FrequencyKHz>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_percent: Option<u32>,
    #[serde(default)]
    pub counter_stall: bool,
}

impl JsonRecord {
    pub fn from_report(pass: u64, report: &CpuReport) -> Self {
        match report.reading {
            CpuReading::Offline => Self {
                pass,
                cpu: report.cpu,
                online: false,
                average_freq_khz: None,
                active_ms: None,
                sleep_ms: None,
                active_percent: None,
                counter_stall: false,
            },
            CpuReading::Sample(sample) => Self {
                pass,
                cpu: report.cpu,
                online: true,
                average_freq_khz: Some(sample.average_freq),
                active_ms: Some(sample.active_time.as_millis() as u64),
                sleep_ms: Some(sample.sleep_time.as_millis() as u64),
                active_percent: Some(sample.active_percent),
                counter_stall: sample.counter_stall,
            },
        }
    }
}

/// JSON Lines writer
pub struct JsonLines<W: Write> {
    out: W,
    pass: u64,
}

impl<W: Write> JsonLines<W> {
    pub fn new(out: W) -> Self {
        Self { out, pass: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for JsonLines<W> {
    fn write_pass(&mut self, reports: &[CpuReport]) -> io::Result<()> {
        self.pass += 1;
        for report in reports {
            let record = JsonRecord::from_report(self.pass, report);
            serde_json::to_writer(&mut self.out, &record)?;
            writeln!(self.out)?;
        }
        self.out.flush()
    }
}
