//! Release title parsing into structured episode metadata.

mod parser;
mod types;

pub use parser::parse_title;
pub use types::{ParsedEpisode, Quality, TitleParse, UnknownQuality};
