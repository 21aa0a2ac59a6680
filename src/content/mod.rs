//! Content module - post models, rich text, reading time and navigation

pub mod navigation;
mod post;
pub mod reading_time;
pub mod rich_text;

pub use navigation::{resolve_neighbors, Direction, Neighbors};
pub use post::{fetch_post, reduce_page, NavigablePost, PostDetail, PostPage, PostSummary, Section};
pub use reading_time::{ReadingTime, ReadingTimeEstimator};
pub use rich_text::RichTextBlock;
