//! Flat training-instance files.
//!
//! One block per instance: a line holding the candidate count `K`, then `K`
//! candidate lines. Each candidate line starts with `1` (correct) or `0`,
//! followed by `name value` pairs, or by bare names when every feature is
//! binary.
//!
//! ```text
//! 2
//! 1 near 1 population 2.5
//! 0 population 0.5
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use bitflags::bitflags;
use bstr::ByteSlice;

use crate::attribute::Attribute;
use crate::dataset::TrainingData;
use crate::error::{Error, Result};
use crate::feature::{AggregateFeatureVector, FeatureVector, FeatureVectorFactory};

bitflags! {
    /// Instance file options
    #[derive(Default)]
    pub struct ExportFlags: u32 {
        /// Write bare feature names; every exported value must be 1
        const BINARY = 0x01;
        /// Also write features marked as removed
        const INCLUDE_REMOVED = 0x02;
    }
}

/// Write `data` as an instance file.
pub fn write_instances<W, F>(out: W, data: &TrainingData<F>, flags: ExportFlags) -> Result<()>
where
    W: Write,
    F: FeatureVector,
{
    let mut out = BufWriter::new(out);
    let removed = data.removed_features();
    let mapper = match data.mapper() {
        Some(mapper) => mapper,
        None => return Ok(()),
    };

    for (fv, correct) in data.iter() {
        writeln!(out, "{}", fv.depth())?;
        for label in 0..fv.depth() {
            out.write_all(if label == *correct { b"1" } else { b"0" })?;
            for (index, value) in fv.nonzeros(label) {
                if !flags.contains(ExportFlags::INCLUDE_REMOVED) && removed.contains(&index) {
                    continue;
                }
                let name = mapper
                    .name_of(index)
                    .ok_or_else(|| Error::invalid(format!("feature {} has no name", index)))?;
                if name.is_empty() || name.contains(char::is_whitespace) {
                    return Err(Error::invalid(format!(
                        "feature name {:?} cannot be written",
                        name
                    )));
                }
                if !value.is_finite() {
                    return Err(Error::NonFiniteFeature { name, value });
                }
                if flags.contains(ExportFlags::BINARY) {
                    if value != 1.0 {
                        return Err(Error::NonBinaryFeature { name, value });
                    }
                    write!(out, " {}", name)?;
                } else {
                    write!(out, " {} {}", name, value)?;
                }
            }
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Write `data` as an instance file at `path`.
pub fn export_instances<P, F>(path: P, data: &TrainingData<F>, flags: ExportFlags) -> Result<()>
where
    P: AsRef<Path>,
    F: FeatureVector,
{
    let file = File::create(path)?;
    write_instances(file, data, flags)
}

fn parse_count(line: &[u8], line_no: usize) -> Result<usize> {
    let count: usize = line
        .trim()
        .to_str()
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::parse(line_no, "expected a candidate count"))?;
    if count == 0 {
        return Err(Error::parse(line_no, "candidate count must be positive"));
    }
    Ok(count)
}

/// Parse one candidate line into its correctness mark and attributes
fn parse_candidate(line: &[u8], line_no: usize, binary: bool) -> Result<(bool, Vec<Attribute>)> {
    let mut fields = line.fields();
    let correct = match fields.next() {
        Some(b"1") => true,
        Some(b"0") => false,
        _ => return Err(Error::parse(line_no, "candidate line must start with 0 or 1")),
    };

    let mut attrs = Vec::new();
    while let Some(name) = fields.next() {
        let name = name
            .to_str()
            .map_err(|_| Error::parse(line_no, "feature name is not valid UTF-8"))?;
        let value = if binary {
            1.0
        } else {
            let value = fields
                .next()
                .ok_or_else(|| Error::parse(line_no, format!("missing value for {}", name)))?;
            let value = value
                .to_str()
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .ok_or_else(|| {
                    Error::parse(
                        line_no,
                        format!("invalid value {:?} for {}", value.as_bstr(), name),
                    )
                })?;
            if !value.is_finite() {
                return Err(Error::parse(
                    line_no,
                    format!("non-finite value {} for {}", value, name),
                ));
            }
            value
        };
        attrs.push(Attribute::new(name, value));
    }
    Ok((correct, attrs))
}

/// Read an instance file, building aggregate vectors with `factory`.
///
/// Each block must mark exactly one candidate as correct.
pub fn read_instances<R: Read>(
    mut input: R,
    factory: &FeatureVectorFactory,
    flags: ExportFlags,
) -> Result<TrainingData<AggregateFeatureVector>> {
    let mut buf = Vec::new();
    input.read_to_end(&mut buf)?;
    let binary = flags.contains(ExportFlags::BINARY);

    let mut lines = buf
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty());
    let mut instances = Vec::new();

    while let Some((line_no, line)) = lines.next() {
        let count = parse_count(line, line_no)?;
        let mut candidates = Vec::with_capacity(count);
        let mut correct = None;
        for label in 0..count {
            let (line_no, line) = lines.next().ok_or_else(|| {
                Error::parse(line_no, format!("expected {} candidates, found {}", count, label))
            })?;
            let (is_correct, attrs) = parse_candidate(line, line_no, binary)?;
            if is_correct {
                if correct.is_some() {
                    return Err(Error::parse(line_no, "more than one correct candidate"));
                }
                correct = Some(label);
            }
            candidates.push(attrs);
        }
        let correct =
            correct.ok_or_else(|| Error::parse(line_no, "block has no correct candidate"))?;
        instances.push((factory.make_aggregate(&candidates)?, correct));
    }

    TrainingData::new(instances)
}

/// Read an instance file from `path`.
pub fn import_instances<P: AsRef<Path>>(
    path: P,
    factory: &FeatureVectorFactory,
    flags: ExportFlags,
) -> Result<TrainingData<AggregateFeatureVector>> {
    let buf = fs::read(path)?;
    read_instances(&buf[..], factory, flags)
}
