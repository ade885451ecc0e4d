//! Schema types: per-type accumulators and the `config.json` model.

mod config;
mod global;
mod layer;
mod row;
mod types;

pub use config::{
    Anchoring, AttributeConfig, CONFIG_FILE, CorpusSchema, FirstClass, GlobalAttributeConfig,
    KeySchema, LayerConfig, MediaSlot, Meta, id_column,
};
pub use global::{GLOBAL_FILE_PREFIX, GlobalAttributeTable};
pub use layer::{AttributeSpec, LayerSchema, MediaUsage};
pub use row::{Cell, Row, label_bits, pad_bits};
pub use types::{AttributeType, Dimension, LayerType, MediaType};
