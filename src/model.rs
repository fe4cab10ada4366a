use std::{fmt, io::Write, sync::Arc};

use bstr::ByteSlice;
use cqdb::CQDB;

use crate::classifier::{ClassifierKind, LinearClassifier};
use crate::error::{Error, Result};
use crate::feature::FeatureMapper;
use crate::vector::Vector;
use crate::weights::WeightAggregate;

pub(crate) const MAGIC: &[u8; 4] = b"lLIN";
pub(crate) const KIND_BINARY: &[u8; 4] = b"BNRY";
pub(crate) const KIND_MULTI_LABEL: &[u8; 4] = b"MLBL";
pub(crate) const VERSION: u32 = 100;
pub(crate) const LAYOUT_SHARED: u32 = 0;
pub(crate) const LAYOUT_PER_LABEL: u32 = 1;
pub(crate) const HEADER_SIZE: usize = 40;
const CHUNK_SIZE: usize = 12;

#[inline]
fn unpack_u32(buf: &[u8], at: usize) -> Result<u32> {
    buf.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| Error::InvalidModel("not enough data for unpacking u32".to_string()))
}

#[inline]
fn unpack_f64(buf: &[u8], at: usize) -> Result<f64> {
    buf.get(at..at + 8)
        .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
        .ok_or_else(|| Error::InvalidModel("not enough data for unpacking f64".to_string()))
}

#[derive(Debug, Clone)]
struct Header {
    size: u32,
    kind: ClassifierKind,
    version: u32,
    layout: u32,
    num_vectors: u32,
    length: u32,
    num_features: u32,
    off_weights: u32,
    off_names: u32,
}

/// A serialized classifier read back from memory
#[derive(Clone)]
pub struct Model<'a> {
    buffer: &'a [u8],
    header: Header,
    names: CQDB<'a>,
}

impl<'a> fmt::Debug for Model<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("header", &self.header)
            .field("names", &self.names)
            .finish()
    }
}

impl<'a> Model<'a> {
    /// Create an instance of a model object from a model in memory
    pub fn new(buf: &'a [u8]) -> Result<Self> {
        if buf.len() <= HEADER_SIZE {
            return Err(Error::InvalidModel("invalid model format".to_string()));
        }
        if &buf[0..4] != MAGIC {
            return Err(Error::InvalidModel(
                "invalid file format, magic mismatch".to_string(),
            ));
        }
        let size = unpack_u32(buf, 4)?;
        let kind = match &buf[8..12] {
            k if k == KIND_BINARY => ClassifierKind::Binary,
            k if k == KIND_MULTI_LABEL => ClassifierKind::MultiLabel,
            k => {
                return Err(Error::InvalidModel(format!(
                    "unknown classifier type {:?}",
                    k.as_bstr()
                )))
            }
        };
        let header = Header {
            size,
            kind,
            version: unpack_u32(buf, 12)?,
            layout: unpack_u32(buf, 16)?,
            num_vectors: unpack_u32(buf, 20)?,
            length: unpack_u32(buf, 24)?,
            num_features: unpack_u32(buf, 28)?,
            off_weights: unpack_u32(buf, 32)?,
            off_names: unpack_u32(buf, 36)?,
        };
        if header.size as usize > buf.len() {
            return Err(Error::InvalidModel("truncated model".to_string()));
        }
        if header.layout != LAYOUT_SHARED && header.layout != LAYOUT_PER_LABEL {
            return Err(Error::InvalidModel(format!(
                "unknown weight layout {}",
                header.layout
            )));
        }
        let off_weights = header.off_weights as usize;
        if buf.get(off_weights..off_weights + 4) != Some(&b"WGHT"[..]) {
            return Err(Error::InvalidModel("missing weight chunk".to_string()));
        }
        let names_start = header.off_names as usize;
        if names_start > header.size as usize {
            return Err(Error::InvalidModel("names offset out of range".to_string()));
        }
        let names = CQDB::new(&buf[names_start..header.size as usize])?;
        Ok(Self {
            buffer: buf,
            header,
            names,
        })
    }

    pub fn kind(&self) -> ClassifierKind {
        self.header.kind
    }

    /// Number of stored weight vectors
    pub fn num_vectors(&self) -> u32 {
        self.header.num_vectors
    }

    /// Length of each weight vector
    pub fn length(&self) -> u32 {
        self.header.length
    }

    /// Number of feature names
    pub fn num_features(&self) -> u32 {
        self.header.num_features
    }

    /// Convert a feature index to feature name
    pub fn to_feature(&self, index: u32) -> Option<&str> {
        self.names.to_str(index).and_then(|s| s.to_str().ok())
    }

    /// Convert a feature name to feature index
    pub fn to_feature_id(&self, name: &str) -> Option<u32> {
        self.names.to_id(name)
    }

    fn weight(&self, vector: u32, index: u32) -> Result<f64> {
        let offset = self.header.off_weights as usize
            + CHUNK_SIZE
            + 8 * (vector as usize * self.header.length as usize + index as usize);
        unpack_f64(self.buffer, offset)
    }

    fn vector(&self, vector: u32) -> Result<Vector> {
        let values = (0..self.header.length)
            .map(|i| self.weight(vector, i))
            .collect::<Result<Vec<f64>>>()?;
        Ok(Vector::from_vec(values))
    }

    /// Rebuild the stored weight aggregate
    pub fn weights(&self) -> Result<WeightAggregate> {
        if self.header.layout == LAYOUT_SHARED {
            Ok(WeightAggregate::Single(self.vector(0)?))
        } else {
            let vectors = (0..self.header.num_vectors)
                .map(|v| self.vector(v))
                .collect::<Result<Vec<_>>>()?;
            Ok(WeightAggregate::Multi(vectors))
        }
    }

    /// Rebuild the stored classifier
    pub fn classifier(&self) -> Result<LinearClassifier> {
        Ok(LinearClassifier::from_parts(self.weights()?, self.header.kind))
    }

    /// A fresh mapper holding the stored feature names in index order; build
    /// vectors against it to query the classifier.
    pub fn mapper(&self) -> Result<Arc<FeatureMapper>> {
        let names = (0..self.num_features())
            .map(|i| {
                self.to_feature(i)
                    .ok_or_else(|| Error::InvalidModel(format!("missing feature name {}", i)))
            })
            .collect::<Result<Vec<&str>>>()?;
        Ok(Arc::new(FeatureMapper::from_names(names)))
    }

    /// Print the model in human-readable format
    pub fn dump<W: Write>(&self, w: &mut W) -> Result<()> {
        let header = &self.header;
        writeln!(w, "FILEHEADER = {{")?;
        writeln!(w, "  magic: {}", MAGIC[..].as_bstr())?;
        writeln!(w, "  size: {}", header.size)?;
        writeln!(
            w,
            "  type: {}",
            match header.kind {
                ClassifierKind::Binary => KIND_BINARY[..].as_bstr(),
                ClassifierKind::MultiLabel => KIND_MULTI_LABEL[..].as_bstr(),
            }
        )?;
        writeln!(w, "  version: {}", header.version)?;
        writeln!(
            w,
            "  layout: {}",
            if header.layout == LAYOUT_SHARED {
                "shared"
            } else {
                "per-label"
            }
        )?;
        writeln!(w, "  num_vectors: {}", header.num_vectors)?;
        writeln!(w, "  length: {}", header.length)?;
        writeln!(w, "  num_features: {}", header.num_features)?;
        writeln!(w, "  off_weights: {:#X}", header.off_weights)?;
        writeln!(w, "  off_names: {:#X}", header.off_names)?;
        writeln!(w, "}}\n")?;

        writeln!(w, "FEATURES = {{")?;
        for i in 0..self.num_features() {
            writeln!(w, "  {:>5}: {}", i, self.to_feature(i).unwrap_or("?"))?;
        }
        writeln!(w, "}}\n")?;

        writeln!(w, "WEIGHTS = {{")?;
        for v in 0..header.num_vectors {
            for i in 0..header.length {
                let weight = self.weight(v, i)?;
                if weight == 0.0 {
                    continue;
                }
                let name = self.to_feature(i).unwrap_or("?");
                if header.layout == LAYOUT_SHARED {
                    writeln!(w, "  {}: {:.6}", name, weight)?;
                } else {
                    writeln!(w, "  ({}) {}: {:.6}", v, name, weight)?;
                }
            }
        }
        writeln!(w, "}}\n")?;
        Ok(())
    }
}
