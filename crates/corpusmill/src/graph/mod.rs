//! The layer graph: arena, builder API and finalization.

mod anchor;
mod corpus;
mod finalize;
mod layer;

pub use anchor::{Anchors, Interval, XyBox};
pub use corpus::{Corpus, CorpusConfig, FORM};
pub use layer::{LayerId, LayerKey};
