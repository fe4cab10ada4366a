use std::fs::File;
use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::path::Path;

use cqdb::CQDBWriter;

use crate::classifier::{ClassifierKind, LinearClassifier};
use crate::error::{Error, Result};
use crate::feature::FeatureMapper;
use crate::model::{
    HEADER_SIZE, KIND_BINARY, KIND_MULTI_LABEL, LAYOUT_PER_LABEL, LAYOUT_SHARED, MAGIC, VERSION,
};
use crate::weights::WeightAggregate;

/// Write a trained classifier and its feature names
pub struct ModelWriter;

fn to_u32<T: TryInto<u32>>(value: T, what: &str) -> Result<u32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidModel(format!("{} exceeds u32::MAX", what)))
}

impl ModelWriter {
    /// Write model to file
    pub fn write(
        filename: &Path,
        classifier: &LinearClassifier,
        mapper: &FeatureMapper,
    ) -> Result<()> {
        let mut file = File::create(filename)?;
        Self::write_to(&mut file, classifier, mapper)?;
        file.flush()?;
        Ok(())
    }

    /// Serialize a model into memory
    pub fn to_bytes(classifier: &LinearClassifier, mapper: &FeatureMapper) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        Self::write_to(&mut cursor, classifier, mapper)?;
        Ok(cursor.into_inner())
    }

    /// Write model to any seekable sink
    pub fn write_to<W: Write + Seek>(
        out: &mut W,
        classifier: &LinearClassifier,
        mapper: &FeatureMapper,
    ) -> Result<()> {
        let weights = classifier.weights();
        let kind = match classifier.kind() {
            ClassifierKind::Binary => KIND_BINARY,
            ClassifierKind::MultiLabel => KIND_MULTI_LABEL,
        };
        let layout = match weights {
            WeightAggregate::Single(_) => LAYOUT_SHARED,
            WeightAggregate::Multi(_) => LAYOUT_PER_LABEL,
        };
        let num_vectors = to_u32(weights.num_vectors(), "number of weight vectors")?;
        let length = to_u32(weights.length(), "weight vector length")?;
        let num_features = to_u32(mapper.len(), "number of features")?;

        // Header is rewritten once the offsets are known
        let start = out.stream_position()?;
        out.write_all(&[0u8; HEADER_SIZE])?;

        let off_weights = to_u32(out.stream_position()? - start, "weights offset")?;
        Self::write_weights(out, weights)?;

        let off_names = to_u32(out.stream_position()? - start, "names offset")?;
        Self::write_cqdb(out, mapper)?;

        let end = out.stream_position()?;
        let size = to_u32(end - start, "file size")?;
        out.seek(SeekFrom::Start(start))?;
        out.write_all(MAGIC)?;
        out.write_all(&size.to_le_bytes())?;
        out.write_all(kind)?;
        out.write_all(&VERSION.to_le_bytes())?;
        out.write_all(&layout.to_le_bytes())?;
        out.write_all(&num_vectors.to_le_bytes())?;
        out.write_all(&length.to_le_bytes())?;
        out.write_all(&num_features.to_le_bytes())?;
        out.write_all(&off_weights.to_le_bytes())?;
        out.write_all(&off_names.to_le_bytes())?;
        out.seek(SeekFrom::Start(end))?;
        Ok(())
    }

    /// Write the weight chunk: tag, chunk size, value count, then every
    /// vector in label order
    fn write_weights<W: Write>(out: &mut W, weights: &WeightAggregate) -> Result<()> {
        let num_values = weights.num_vectors() as u64 * weights.length() as u64;
        let chunk_size = to_u32(12 + num_values * 8, "weight chunk size")?;
        out.write_all(b"WGHT")?;
        out.write_all(&chunk_size.to_le_bytes())?;
        out.write_all(&to_u32(num_values, "number of weights")?.to_le_bytes())?;
        for vector in weights.vectors() {
            for value in vector.iter() {
                out.write_all(&value.to_le_bytes())?;
            }
        }
        Ok(())
    }

    /// Write feature name dictionary (CQDB)
    fn write_cqdb<W: Write + Seek>(out: &mut W, mapper: &FeatureMapper) -> io::Result<()> {
        let mut writer = CQDBWriter::new(out)?;
        for (index, name) in mapper.names().iter().enumerate() {
            let id = u32::try_from(index).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, "feature index exceeds u32::MAX")
            })?;
            writer.put(name, id)?;
        }
        // the database is written when the writer drops
        Ok(())
    }
}
