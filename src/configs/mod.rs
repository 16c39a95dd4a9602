pub mod base;
pub mod logging;
pub mod player;
pub mod rotation;
pub mod search;
pub mod server;

pub use base::*;
pub use logging::*;
pub use player::*;
pub use rotation::*;
pub use search::*;
pub use server::*;
