mod state;

pub use state::StateError;
pub use state::MAX_PENDING_STATES;
pub use state::StateManager;
