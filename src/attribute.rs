use std::fmt;

/// A named feature with its value, as supplied by feature extractors.
///
/// Attributes are interned into feature indices by a
/// [`FeatureVectorFactory`](crate::feature::FeatureVectorFactory).
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Feature name
    pub name: String,
    /// Feature value
    pub value: f64,
}

impl Attribute {
    /// Create a new attribute with a name and value
    pub fn new<T: Into<String>>(name: T, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Create a binary attribute (value 1)
    pub fn binary<T: Into<String>>(name: T) -> Self {
        Self::new(name, 1.0)
    }
}

impl From<&str> for Attribute {
    fn from(name: &str) -> Self {
        Self::binary(name)
    }
}

impl From<String> for Attribute {
    fn from(name: String) -> Self {
        Self::binary(name)
    }
}

impl<S: Into<String>> From<(S, f64)> for Attribute {
    fn from((name, value): (S, f64)) -> Self {
        Self::new(name, value)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.value)
    }
}
