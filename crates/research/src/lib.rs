//! arXiv research tools for the chat session.
//!
//! [`register_all`] binds `search_papers` and `extract_info` into a
//! [`runtime::ToolRegistry`]. Found papers live in a [`PaperIndex`] for the
//! lifetime of the process.

pub mod arxiv;
mod error;
mod index;
mod tools;

pub use arxiv::{ArxivClient, DEFAULT_API_URL, Paper};
pub use error::{Error, Result};
pub use index::PaperIndex;
pub use tools::{
    DEFAULT_MAX_RESULTS, EXTRACT_INFO, ExtractInfo, ResearchConfig, SEARCH_PAPERS, SearchPapers,
    register_all,
};
