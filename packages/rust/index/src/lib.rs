//! Vector index, retriever, and per-document artifact store for Tenderlens.
//!
//! The index is a flat inner-product structure over L2-normalized vectors,
//! positionally aligned to the chunk list it was built from. The two are
//! persisted and loaded strictly as a pair, keyed by document identifier.

pub mod flat;
pub mod retriever;
pub mod store;

pub use flat::{FlatIndex, l2_normalize};
pub use retriever::{DEGRADED_SCORE, build_index, degraded_rank, retrieve};
pub use store::{
    document_dir, list_documents, load_index, load_meta, load_summary, safe_id, save_index,
    save_summary,
};
