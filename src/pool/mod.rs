pub mod backend;
pub mod handle;
pub mod manager;
pub mod state;

pub use backend::{PoolBackend, PoolFactory};
pub use handle::PoolHandle;
pub use manager::PoolManager;
pub use state::PoolState;
