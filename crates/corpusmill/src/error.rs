//! Error types for the corpusmill library.

use std::path::PathBuf;
use thiserror::Error;

use crate::schema::{AttributeType, Dimension};
use crate::validation::FormatViolation;

/// Main error type for corpusmill operations.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// Error reading or writing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The layer graph breaks a structural rule. Aborts the build.
    #[error("Schema violation: {0}")]
    Schema(#[from] SchemaViolation),

    /// A compiled directory does not match its configuration.
    #[error("Format violation: {0}")]
    Format(#[from] FormatViolation),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CorpusError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CorpusError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Fatal violations raised while building or finalizing the layer graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaViolation {
    /// A layer id that does not belong to this corpus.
    #[error("Unknown layer #{0}")]
    UnknownLayer(usize),

    /// A layer received children of more than one type.
    #[error("All children of a '{parent}' layer must share one type: expected '{expected}', got '{found}'")]
    MixedChildTypes {
        parent: String,
        expected: String,
        found: String,
    },

    /// Adding the child would make finalization loop.
    #[error("Cannot add '{child}' under '{parent}': containment must be acyclic")]
    ContainmentCycle { parent: String, child: String },

    /// A token whose form is missing or empty.
    #[error("Token cannot have an empty form")]
    EmptyTokenForm,

    /// A token whose form is not a text value.
    #[error("Token form must be text, got {found}")]
    TokenFormNotText { found: AttributeType },

    /// Stream ranges of tokens are always allocated by the corpus.
    #[error("Cannot manually set the char_range of tokens")]
    TokenStreamOverride,

    /// A token with no segment among its ancestors.
    #[error("Token has no '{segment}' ancestor")]
    MissingSegment { segment: String },

    /// The layer was already finalized and is now immutable.
    #[error("Layer '{layer_type}' is finalized and can no longer be modified")]
    Finalized { layer_type: String },

    /// A type, attribute or global attribute name that would break file naming.
    #[error("Invalid {kind} name '{name}'")]
    InvalidName { kind: &'static str, name: String },

    /// Two layer type names that map onto the same file name.
    #[error("Layer type '{name}' collides with existing type '{existing}'")]
    NameCollision { name: String, existing: String },

    /// An attribute name reserved for generated columns.
    #[error("Attribute name '{name}' is reserved on layer '{layer_type}'")]
    ReservedAttribute { layer_type: String, name: String },

    /// An attribute whose value does not encode under its established type.
    #[error("Attribute '{attribute}' of layer '{layer_type}' is {expected}, got {found}")]
    TypeMismatch {
        layer_type: String,
        attribute: String,
        expected: AttributeType,
        found: AttributeType,
    },

    /// A reference attribute pointing at two different global attributes.
    #[error("Attribute '{attribute}' of layer '{layer_type}' references '{expected}', got '{found}'")]
    ReferenceMismatch {
        layer_type: String,
        attribute: String,
        expected: String,
        found: String,
    },

    /// A handle to a global attribute record this corpus never created.
    #[error("Unknown global attribute record '{name}' #{id}")]
    UnknownReference { name: String, id: u32 },

    /// Global attribute records must be JSON objects.
    #[error("Global attribute '{name}' expects an object record")]
    NotAnObject { name: String },

    /// An anchoring range whose upper bound does not exceed its lower bound.
    #[error("Invalid {dimension} range: upper bound must exceed lower bound")]
    InvalidRange { dimension: Dimension },

    /// Media can only be attached to the document layer type.
    #[error("Media can only be attached to '{document}' layers, not '{layer_type}'")]
    MediaNotAllowed { document: String, layer_type: String },

    /// A name is only written for documents that carry media.
    #[error("Cannot name a '{layer_type}' layer before attaching a media file")]
    NameWithoutMedia { layer_type: String },
}

/// Result type alias for corpusmill operations.
pub type Result<T> = std::result::Result<T, CorpusError>;
