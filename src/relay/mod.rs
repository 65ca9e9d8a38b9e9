//! The relay pipeline: classify, generate or use canned text, clean, deliver.

pub mod canned;
pub mod cleanup;
pub mod handler;
pub mod keywords;

pub use cleanup::clean_response;
pub use handler::{RelayHandler, RelayOutcome, ReplySource};
pub use keywords::KeywordSet;
