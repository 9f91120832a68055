//! Base implementation of records.
use crate::error::CollectError;
use std::collections::HashMap;

/// Represents possible types of values that can be stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value.
    Scalar(f32),

    /// A text value.
    String(String),
}

/// A container for storing key-value pairs of various data types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Gets a scalar value from the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not exist or the value is not a scalar.
    pub fn get_scalar(&self, k: &str) -> Result<f32, CollectError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(CollectError::RecordValueTypeError("Scalar".to_string())),
            None => Err(CollectError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a scalar value, falling back to `default` when the key is absent.
    ///
    /// Policies use this for optional forward options such as `eps`.
    pub fn get_scalar_or(&self, k: &str, default: f32) -> Result<f32, CollectError> {
        match self.get_scalar(k) {
            Err(CollectError::RecordKeyError(_)) => Ok(default),
            v => v,
        }
    }

    /// Checks if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_scalar() {
        let record = Record::from_slice(&[
            ("eps", RecordValue::Scalar(0.05)),
            ("mode", RecordValue::String("collect".to_string())),
        ]);
        assert_eq!(record.get_scalar("eps"), Ok(0.05));
        assert_eq!(
            record.get_scalar("mode"),
            Err(CollectError::RecordValueTypeError("Scalar".to_string()))
        );
        assert_eq!(
            record.get_scalar("temperature"),
            Err(CollectError::RecordKeyError("temperature".to_string()))
        );
        assert_eq!(record.get_scalar_or("temperature", 1.0), Ok(1.0));
        assert!(record.get_scalar_or("mode", 1.0).is_err());
    }

    #[test]
    fn test_insert() {
        let mut record = Record::from_scalar("a", 1.0);
        record.insert("a", RecordValue::Scalar(2.0));
        record.insert("b", RecordValue::String("x".to_string()));
        assert_eq!(record.len(), 2);
        assert_eq!(record.get_scalar("a"), Ok(2.0));
        assert_eq!(record.get("b"), Some(&RecordValue::String("x".to_string())));
        assert!(Record::empty().is_empty());
    }
}
