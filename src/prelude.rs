//! Convenient imports for common functionality.

pub use crate::api::{ApiError, AppState};
pub use crate::config::{PoolSettings, Target, TargetConfig};
pub use crate::envelope::{Envelope, cors_envelope};
pub use crate::error::{DalError, ErrorKind};
pub use crate::executor::{QueryExecutor, execute};
pub use crate::pool::{PoolBackend, PoolFactory, PoolHandle, PoolManager, PoolState};
pub use crate::query::{PreparedStatement, QueryDescriptor};
pub use crate::results::{ResultSet, Row};
pub use crate::types::RowValues;
