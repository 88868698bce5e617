//! Result emitters.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::geometry::LaunchGeometry;
use crate::metrics::SweepRow;
use crate::types::AddressingMode;

const RULE: &str =
    "----------------------------------------------------------------------------------------------";
const EXCEL_RULE: &str =
    "----------------------------------------- EXCEL data -----------------------------------------";

/// Context printed before the first row.
#[derive(Debug, Clone, Serialize)]
pub struct ReportHeader {
    /// Device name.
    pub device: String,
    /// Addressing mode of every variant.
    pub addressing: AddressingMode,
    /// Sweep geometry.
    pub geometry: LaunchGeometry,
}

/// Consumer of sweep rows.
pub trait ResultEmitter {
    /// Called once before the first row.
    fn begin(&mut self, header: &ReportHeader) -> Result<()>;

    /// Called once per ratio point, in sweep order.
    fn row(&mut self, row: &SweepRow) -> Result<()>;

    /// Called once after the last row.
    fn finish(&mut self) -> Result<()>;
}

/// Collects rows in memory.
impl ResultEmitter for Vec<SweepRow> {
    fn begin(&mut self, _header: &ReportHeader) -> Result<()> {
        self.clear();
        Ok(())
    }

    fn row(&mut self, row: &SweepRow) -> Result<()> {
        self.push(row.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// The comma-separated text table consumed by spreadsheet tooling.
pub struct TableEmitter<W: Write> {
    out: W,
}

impl<W: Write> TableEmitter<W> {
    /// Create an emitter writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Format one row exactly as the table prints it.
pub fn format_row(row: &SweepRow) -> String {
    let mut line = format!(
        "      {:>2}/{:>2},     ",
        row.ratio.compute_slots(),
        row.ratio.memory_slots()
    );
    let cells: Vec<String> = row
        .measurements
        .iter()
        .map(|m| {
            format!(
                "{:>8.2},{:>8.2},{:>7.2}",
                m.timing.elapsed_ms(),
                m.timing.giga_ops(),
                m.timing.giga_bytes()
            )
        })
        .collect();
    line.push_str(&cells.join(","));
    line
}

impl<W: Write> ResultEmitter for TableEmitter<W> {
    fn begin(&mut self, header: &ReportHeader) -> Result<()> {
        writeln!(self.out, "Trade-off type:{}", header.addressing.description())?;
        writeln!(self.out, "{}", EXCEL_RULE)?;
        writeln!(
            self.out,
            "Operations ratio,  Single Precision ops,,,   Double precision ops,,,     Integer operations,, "
        )?;
        writeln!(
            self.out,
            "  compute/memory,    Time,  GFLOPS, GB/sec,    Time,  GFLOPS, GB/sec,    Time,   GIOPS, GB/sec"
        )?;
        Ok(())
    }

    fn row(&mut self, row: &SweepRow) -> Result<()> {
        writeln!(self.out, "{}", format_row(row))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        writeln!(self.out, "{}", RULE)?;
        self.out.flush()?;
        Ok(())
    }
}

/// One JSON object per row.
pub struct JsonLinesEmitter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesEmitter<W> {
    /// Create an emitter writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[derive(Serialize)]
struct JsonRow<'a> {
    compute_slots: u32,
    memory_slots: u32,
    measurements: &'a [crate::metrics::Measurement; 3],
}

impl<W: Write> ResultEmitter for JsonLinesEmitter<W> {
    fn begin(&mut self, header: &ReportHeader) -> Result<()> {
        serde_json::to_writer(&mut self.out, header).map_err(std::io::Error::from)?;
        writeln!(self.out)?;
        Ok(())
    }

    fn row(&mut self, row: &SweepRow) -> Result<()> {
        let json = JsonRow {
            compute_slots: row.ratio.compute_slots(),
            memory_slots: row.ratio.memory_slots(),
            measurements: &row.measurements,
        };
        serde_json::to_writer(&mut self.out, &json).map_err(std::io::Error::from)?;
        writeln!(self.out)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
