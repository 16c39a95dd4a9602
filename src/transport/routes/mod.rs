pub mod debug;
pub mod search;

pub use debug::debug_stats;
pub use search::search_tracks;
