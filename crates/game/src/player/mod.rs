mod registry;
mod state;

pub use registry::PlayerRegistry;
pub use state::PlayerState;
