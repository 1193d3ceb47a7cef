#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use dashboard_dal::prelude::*;
use dashboard_dal::test_utils::MemoryFactory;

pub fn target_config(target: Target) -> TargetConfig {
    TargetConfig::builder(target, "db.test.local", "dashboard", "app_user", "not-a-real-secret")
        .connect_timeout(Duration::from_millis(500))
        .build()
        .unwrap()
}

/// A manager with both targets configured over `factory`.
pub fn manager(factory: &MemoryFactory) -> PoolManager {
    PoolManager::new(Arc::new(factory.clone()))
        .with_target(target_config(Target::Primary))
        .with_target(target_config(Target::Hrms))
}

pub fn app_state(factory: &MemoryFactory) -> AppState {
    AppState::new(Arc::new(manager(factory)), QueryExecutor::new())
}
