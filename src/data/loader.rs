use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value as JsonValue;

use super::error::LoadError;
use super::model::{ChannelCurve, Measurements, QuadProfile, Sample};

/// Header aliases accepted for the input-level column.
const INPUT_ALIASES: &[&str] = &["GRAY", "INPUT", "GRAY_PERCENT"];
/// Header aliases accepted for the lightness column.
const LSTAR_ALIASES: &[&str] = &["LAB_L", "L", "LSTAR"];

/// Number of entries per channel in a QuadToneRIP curve block.
pub const QUAD_CURVE_POINTS: usize = 256;
/// Largest draw value QuadToneRIP accepts.
pub const QUAD_MAX_DRAW: f64 = 65535.0;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a measured L* ramp.  Dispatch by extension.
///
/// Supported formats:
/// * `.txt` / `.tsv` – tab-delimited, header `GRAY  LAB_L  LAB_A  LAB_B`
/// * `.csv`          – same columns, comma-delimited
/// * `.json`         – `[{ "GRAY": 0.0, "LAB_L": 95.2 }, ...]`
pub fn load_measurements(path: &Path) -> Result<Measurements> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let file = std::fs::File::open(path)
        .with_context(|| format!("opening measurement file {}", path.display()))?;

    let measurements = match ext.as_str() {
        "txt" | "tsv" => read_delimited(file, b'\t'),
        "csv" => read_delimited(file, b','),
        "json" => read_json(file),
        other => bail!("Unsupported measurement file extension: .{other}"),
    }
    .with_context(|| format!("parsing {}", path.display()))?;

    log::info!(
        "Loaded {} measurement rows from {}",
        measurements.len(),
        path.display()
    );
    Ok(measurements.with_source(file_label(path)))
}

/// Load the channel draw curves of a QuadToneRIP `.quad` file.
pub fn load_quad(path: &Path) -> Result<QuadProfile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading .quad file {}", path.display()))?;
    let quad = parse_quad(&text).with_context(|| format!("parsing {}", path.display()))?;

    log::info!(
        "Loaded {} channels {:?} from {}",
        quad.len(),
        quad.names(),
        path.display()
    );
    Ok(quad.with_source(file_label(path)))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// Delimited measurement tables
// ---------------------------------------------------------------------------

/// Read a header + rows measurement table.  Extra columns (LAB_A, LAB_B, ...)
/// are ignored; header lookup is case-insensitive.
pub fn read_delimited<R: Read>(source: R, delimiter: u8) -> Result<Measurements> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers: Vec<String> = reader
        .headers()
        .context("reading header row")?
        .iter()
        .map(|h| h.to_ascii_uppercase())
        .collect();

    let input_idx = find_column(&headers, "input", INPUT_ALIASES)?;
    let lstar_idx = find_column(&headers, "L*", LSTAR_ALIASES)?;

    let mut samples = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let row = row_no + 1;
        let record = result.with_context(|| format!("reading row {row}"))?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        let input = parse_field(record.get(input_idx).unwrap_or(""), row, "input")?;
        let lstar = parse_field(record.get(lstar_idx).unwrap_or(""), row, "L*")?;
        samples.push(validated_sample(input, lstar, row)?);
    }

    finish_measurements(samples)
}

fn find_column(headers: &[String], column: &'static str, aliases: &[&str]) -> Result<usize> {
    headers
        .iter()
        .position(|h| aliases.contains(&h.as_str()))
        .ok_or_else(|| {
            LoadError::MissingColumn {
                column,
                aliases: aliases.join("/"),
            }
            .into()
        })
}

fn parse_field(raw: &str, row: usize, field: &'static str) -> Result<f64, LoadError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(LoadError::NotANumber {
            row,
            field,
            raw: raw.to_string(),
        }),
    }
}

fn validated_sample(input: f64, lstar: f64, row: usize) -> Result<Sample, LoadError> {
    check_range(input, row, "input", 0.0, 100.0)?;
    check_range(lstar, row, "L*", 0.0, 100.0)?;
    Ok(Sample::new(input, lstar))
}

fn check_range(value: f64, row: usize, field: &'static str, min: f64, max: f64) -> Result<(), LoadError> {
    if value < min || value > max {
        return Err(LoadError::OutOfRange {
            row,
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn finish_measurements(samples: Vec<Sample>) -> Result<Measurements> {
    if samples.is_empty() {
        return Err(LoadError::NoSamples.into());
    }
    Ok(Measurements::from_samples(samples))
}

// ---------------------------------------------------------------------------
// JSON measurements
// ---------------------------------------------------------------------------

/// Records-oriented JSON, one object per patch:
///
/// ```json
/// [
///   { "GRAY": 0.0, "LAB_L": 95.1, "LAB_A": 0.2, "LAB_B": -1.1 },
///   { "GRAY": 5.0, "LAB_L": 91.7 },
///   ...
/// ]
/// ```
pub fn read_json<R: Read>(source: R) -> Result<Measurements> {
    let root: JsonValue = serde_json::from_reader(source).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut samples = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let row = i + 1;
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {row} is not a JSON object"))?;

        let input = json_number(obj, row, "input", INPUT_ALIASES)?;
        let lstar = json_number(obj, row, "L*", LSTAR_ALIASES)?;
        samples.push(validated_sample(input, lstar, row)?);
    }

    finish_measurements(samples)
}

fn json_number(
    obj: &serde_json::Map<String, JsonValue>,
    row: usize,
    field: &'static str,
    aliases: &[&str],
) -> Result<f64> {
    let value = obj
        .iter()
        .find(|(k, _)| aliases.contains(&k.to_ascii_uppercase().as_str()))
        .map(|(_, v)| v)
        .ok_or_else(|| LoadError::MissingColumn {
            column: field,
            aliases: aliases.join("/"),
        })?;

    match value {
        JsonValue::Number(n) => n.as_f64().ok_or_else(|| {
            LoadError::NotANumber {
                row,
                field,
                raw: n.to_string(),
            }
            .into()
        }),
        JsonValue::String(s) => Ok(parse_field(s.trim(), row, field)?),
        other => Err(LoadError::NotANumber {
            row,
            field,
            raw: other.to_string(),
        }
        .into()),
    }
}

// ---------------------------------------------------------------------------
// QuadToneRIP .quad parser
// ---------------------------------------------------------------------------

/// Parse `.quad` text into ordered channel curves.
///
/// Layout:
/// ```text
/// ## QuadToneRIP K,C,M,Y,LC,LM,LK,LLK
/// # K curve
/// 0
/// 129
/// ...            (256 values)
/// # C curve
/// ...
/// ```
/// `# <NAME> curve` markers start a block.  Files without markers are split
/// into consecutive 256-value blocks in header order.
pub fn parse_quad(text: &str) -> Result<QuadProfile> {
    let mut header: Vec<String> = Vec::new();
    let mut blocks: Vec<(String, Vec<f64>)> = Vec::new();
    let mut unmarked: Vec<f64> = Vec::new();
    let mut skipped = 0usize;

    for (line_no, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            let token = comment.trim_start_matches('#').trim();
            if let Some(list) = token.strip_prefix("QuadToneRIP ") {
                header = list
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect();
            } else if let Some(name) = curve_marker(token) {
                if !blocks.iter().any(|(n, _)| n == &name) {
                    blocks.push((name, Vec::new()));
                }
            }
            continue;
        }

        let Ok(value) = line.parse::<f64>() else {
            skipped += 1;
            continue;
        };
        let row = line_no + 1;
        if !value.is_finite() {
            return Err(LoadError::NotANumber {
                row,
                field: "draw",
                raw: line.to_string(),
            }
            .into());
        }
        check_range(value, row, "draw", 0.0, QUAD_MAX_DRAW)?;

        match blocks.last_mut() {
            Some((_, values)) => values.push(value),
            None => unmarked.push(value),
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} non-numeric lines in .quad data");
    }

    let channels = if blocks.is_empty() {
        split_by_header(&header, &unmarked)
    } else {
        blocks
            .into_iter()
            .map(|(name, values)| ChannelCurve::new(name, values))
            .collect()
    };

    if channels.is_empty() {
        return Err(LoadError::NoChannels.into());
    }
    if let Some(empty) = channels.iter().find(|c| c.draws.is_empty()) {
        return Err(LoadError::EmptyChannel(empty.name.clone()).into());
    }

    Ok(QuadProfile::new(channels))
}

/// `"K curve"` → `Some("K")`.
fn curve_marker(token: &str) -> Option<String> {
    let lower = token.to_ascii_lowercase();
    if !lower.ends_with("curve") {
        return None;
    }
    let name = token[..token.len() - "curve".len()].trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn split_by_header(header: &[String], values: &[f64]) -> Vec<ChannelCurve> {
    header
        .iter()
        .zip(values.chunks(QUAD_CURVE_POINTS))
        .map(|(name, chunk)| ChannelCurve::new(name.clone(), chunk.to_vec()))
        .collect()
}
