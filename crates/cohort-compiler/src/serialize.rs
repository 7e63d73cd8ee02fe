//! Query document serialization

use std::io::{Read, Write};

use crate::model::QueryDocument;

/// Errors that can occur during serialization
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for query document serializers
pub trait DocumentSerializer {
    /// Serialize a document to a string
    fn serialize(&self, document: &QueryDocument) -> Result<String, SerializeError>;

    /// Serialize a document to a writer
    fn serialize_to_writer<W: Write>(
        &self,
        document: &QueryDocument,
        mut writer: W,
    ) -> Result<(), SerializeError> {
        let text = self.serialize(document)?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Deserialize a document from a string
    fn deserialize(&self, input: &str) -> Result<QueryDocument, SerializeError>;

    /// Deserialize a document from a reader
    fn deserialize_from_reader<R: Read>(&self, mut reader: R) -> Result<QueryDocument, SerializeError> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        self.deserialize(&content)
    }
}

/// JSON serializer for query documents
///
/// The compact form is canonical: struct fields are written in declaration
/// order and payload objects with sorted keys, so equal documents always
/// produce identical bytes.
#[derive(Debug, Default, Clone)]
pub struct JsonSerializer {
    /// Whether to produce pretty-printed output
    pub pretty: bool,
}

impl JsonSerializer {
    /// Create a compact JSON serializer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON serializer with pretty-printing enabled
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl DocumentSerializer for JsonSerializer {
    fn serialize(&self, document: &QueryDocument) -> Result<String, SerializeError> {
        let text = if self.pretty {
            serde_json::to_string_pretty(document)?
        } else {
            serde_json::to_string(document)?
        };
        Ok(text)
    }

    fn deserialize(&self, input: &str) -> Result<QueryDocument, SerializeError> {
        Ok(serde_json::from_str(input)?)
    }
}
