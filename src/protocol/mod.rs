pub mod events;
pub mod models;
pub mod opcodes;
pub mod tracks;

pub use events::*;
pub use models::*;
pub use opcodes::*;
pub use tracks::*;
