//! The execution driver (§4.H): resolves two-phase placeholders against an
//! `IndexReader`, then runs the collapsed query and applies script filters,
//! script-score/function-score scoring, sort, facets, and pagination.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod config;
mod executor;
pub mod reader;
pub mod request;
pub mod resolve;
pub mod scripts;

pub use cancel::{CancellationToken, ExecutionContext};
pub use config::{ExecutorConfig, ExecutorConfigBuilder};
pub use executor::Executor;
pub use reader::{IndexReader, InternalId, SearchHit};
pub use request::{FacetBucket, FacetSpec, Hit, SearchRequest, SearchResponse, SortClause, SortOrder};
