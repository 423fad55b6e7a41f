//! RAG (Retrieval-Augmented Generation) for question answering with sources.
//!
//! A query flows through the [`Retriever`], which searches the vector store
//! and packs the ranked hits into a token-bounded context block, and then
//! through the [`RagEngine`], which asks the language model and pulls the
//! cited sources out of its reply.

mod citations;
pub mod context;
mod response;
mod retriever;

pub use citations::{extract_citations, Citation};
pub use context::{
    assemble, estimate_tokens, format_sources_for_display, ContextBlock, TRUNCATION_MARKER,
};
pub use response::{RagAnswer, RagEngine};
pub use retriever::{RetrieveOptions, Retrieval, Retriever};
