//! Sentiment resolution for FanPulse.
//!
//! Attributes fan text to a team by keyword, runs two independent sentiment
//! backends concurrently (a HuggingFace classifier and a Groq-hosted LLM),
//! and fuses their outputs into a single [`fanpulse_core::Verdict`]. Also
//! hosts the read-only Reddit collector used by live polling.

pub mod attributor;
pub mod backends;
pub mod error;
pub mod fusion;
pub mod labels;
pub mod preprocess;
pub mod sources;

mod retry;

pub use attributor::EntityAttributor;
pub use backends::{BackendVerdict, Classifier, GroqClassifier, HuggingFaceClassifier};
pub use error::SentimentError;
pub use fusion::{fuse, ResolverConfig, SentimentResolver};
pub use labels::normalize_label;
pub use sources::RedditClient;
