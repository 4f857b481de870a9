//! fhir-synth-core: corpus, retrieval and FHIR output types
//!
//! This crate holds everything that does not talk to the network: loading
//! and chunking the FHIR schema/example corpus, the vector index, and
//! classification of generated answers.

pub mod archive;
pub mod bundle;
pub mod chunker;
pub mod corpus;
pub mod error;
pub mod format;
pub mod index;
pub mod outcome;
pub mod passage;

pub use archive::extract_bundled_archives;
pub use bundle::{Bundle, BundleEntry, ResourceSummary};
pub use chunker::{ChunkConfig, split_text};
pub use corpus::{Corpus, clean_json, load_corpus};
pub use error::{CorpusError, IndexError};
pub use format::{ArtifactKind, FormattedOutput, format_answer, is_fhir_resource};
pub use index::VectorIndex;
pub use outcome::{IssueSeverity, OperationOutcome, OperationOutcomeIssue};
pub use passage::{Passage, PassageText, ScoredPassage};
