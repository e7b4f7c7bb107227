use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use crate::solver::DensityReport;

// ---------------------------------------------------------------------------
// Attribution table – one row per measured step
// ---------------------------------------------------------------------------

/// Column-major step table shared by the CSV and Parquet writers.
///
/// Columns: `input`, `lstar`, `delta`, then `<ch>_share` and `<ch>_density`
/// for every active channel in channel order.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributionTable {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl AttributionTable {
    pub fn from_report(report: &DensityReport) -> Self {
        let mut columns = vec!["input".to_string(), "lstar".to_string(), "delta".to_string()];
        let mut values = vec![
            report.inputs.clone(),
            report.l_values.clone(),
            report.delta_l.clone(),
        ];

        let matrix = &report.channel_shares;
        for name in &report.active_channels {
            let share_row = matrix
                .names()
                .iter()
                .position(|n| n == name)
                .map(|ch| matrix.row(ch).to_vec())
                .unwrap_or_else(|| vec![0.0; report.len()]);
            let density_row = (0..report.len())
                .map(|step| report.step_contribution(step, name))
                .collect();

            columns.push(format!("{name}_share"));
            values.push(share_row);
            columns.push(format!("{name}_density"));
            values.push(density_row);
        }

        Self { columns, values }
    }

    pub fn rows(&self) -> usize {
        self.values.first().map_or(0, Vec::len)
    }

    /// The table as one Arrow batch of non-null `Float64` columns.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let schema = Arc::new(Schema::new(
            self.columns
                .iter()
                .map(|name| Field::new(name, DataType::Float64, false))
                .collect::<Vec<_>>(),
        ));
        let arrays: Vec<ArrayRef> = self
            .values
            .iter()
            .map(|col| Arc::new(Float64Array::from(col.clone())) as ArrayRef)
            .collect();
        RecordBatch::try_new(schema, arrays).context("building record batch")
    }
}

/// Per-channel summary as an Arrow batch, for printing.
pub fn summary_batch(report: &DensityReport) -> Result<RecordBatch> {
    let channels = &report.channels;
    let schema = Arc::new(Schema::new(vec![
        Field::new("channel", DataType::Utf8, false),
        Field::new("evidence", DataType::Utf8, false),
        Field::new("constant_pct", DataType::Float64, false),
        Field::new("cumulative", DataType::Float64, false),
        Field::new("contribution_pct", DataType::Float64, false),
    ]));
    let evidence: Vec<String> = channels.iter().map(|c| format!("{:?}", c.evidence)).collect();

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from_iter_values(channels.iter().map(|c| c.name.as_str()))),
            Arc::new(StringArray::from_iter_values(evidence.iter())),
            Arc::new(Float64Array::from_iter_values(channels.iter().map(|c| c.density_constant * 100.0))),
            Arc::new(Float64Array::from_iter_values(channels.iter().map(|c| c.cumulative))),
            Arc::new(Float64Array::from_iter_values(channels.iter().map(|c| c.contribution_pct))),
        ],
    )
    .context("building summary batch")
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Write the report in the format named by the file extension
/// (`.json`, `.csv`, `.parquet` / `.pq`).
pub fn export_file(report: &DensityReport, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" => export_json(report, path),
        "csv" => export_csv(report, path),
        "parquet" | "pq" => export_parquet(report, path),
        other => bail!("Unsupported export extension: .{other}"),
    }
    .with_context(|| format!("exporting report to {}", path.display()))?;

    log::info!("Exported density report to {}", path.display());
    Ok(())
}

/// Full report as pretty-printed JSON.
pub fn export_json(report: &DensityReport, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).context("creating json file")?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report).context("serialising report")?;
    writer.flush().context("flushing json file")?;
    Ok(())
}

pub fn export_csv(report: &DensityReport, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).context("creating csv file")?;
    write_csv(&AttributionTable::from_report(report), file)
}

/// Write an [`AttributionTable`] as comma-separated rows with a header.
pub fn write_csv<W: Write>(table: &AttributionTable, sink: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(&table.columns).context("writing csv header")?;
    for row in 0..table.rows() {
        writer
            .write_record(table.values.iter().map(|col| col[row].to_string()))
            .with_context(|| format!("writing csv row {row}"))?;
    }
    writer.flush().context("flushing csv file")?;
    Ok(())
}

pub fn export_parquet(report: &DensityReport, path: &Path) -> Result<()> {
    let batch = AttributionTable::from_report(report).to_record_batch()?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}
