//! subtrans - Batch Subtitle Translation
//!
//! Translates SRT subtitles through the Tencent Cloud machine translation API.
//! Entries are sent in batches, the translated text is split back onto the
//! original entries, and any entry that cannot be aligned keeps its text.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod subtitle;
pub mod translate;
