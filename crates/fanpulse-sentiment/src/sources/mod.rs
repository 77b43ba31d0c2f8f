//! Social collectors that turn platform posts into [`fanpulse_core::SourceItem`]s.

mod reddit;

pub use reddit::RedditClient;
