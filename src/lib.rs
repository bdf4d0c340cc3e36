//! docctx - Document and web context retrieval
//!
//! Ingests an uploaded PDF or text file, chunks and embeds it into a
//! per-document vector index, and for each question selects a small, diverse
//! set of relevant passages (similarity search, optional cross-encoder
//! reranking, MMR) to inject into a chat model's system prompt alongside
//! optional web search results.

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod outcome;
pub mod retrieval;
pub mod service;
pub mod vector_math;
pub mod websearch;

pub use error::{DocctxError, Result};
