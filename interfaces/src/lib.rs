pub mod baseline;
pub mod defs;
pub mod empty;

pub use baseline::KeywordThemeModel;
pub use defs::{CategoryGroup, Digest, Entry, FeedSource, ThemeModel, ThemeReport};
pub use empty::EmptyThemeModel;
