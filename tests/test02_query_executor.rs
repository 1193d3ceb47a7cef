mod common;

use std::time::Duration;

use common::manager;
use dashboard_dal::prelude::*;
use dashboard_dal::test_utils::{MemoryFactory, rows};

#[tokio::test]
async fn test01_empty_result_is_not_an_error() -> Result<(), Box<dyn std::error::Error>> {
    let factory = MemoryFactory::new();
    factory.respond_with(|_| Ok(rows(&["id", "name"], vec![])));
    let pools = manager(&factory);
    let handle = pools.acquire(Target::Primary).await?;

    let empty = QueryDescriptor::new("SELECT id, name FROM branches WHERE 1 = 0");
    let rs = execute(&handle, &empty).await?;
    assert!(rs.is_empty());
    assert_eq!(rs.get_column_names(), ["id", "name"]);
    Ok(())
}

#[tokio::test]
async fn test02_injection_text_stays_a_bound_value() -> Result<(), Box<dyn std::error::Error>> {
    let factory = MemoryFactory::new();
    let pools = manager(&factory);
    let handle = pools.acquire(Target::Primary).await?;

    let hostile = "'; DROP TABLE x; --";
    let template = "SELECT id, name FROM branches WHERE name = @name";
    execute(&handle, &QueryDescriptor::new(template).bind("name", hostile)).await?;

    let executed = factory.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].sql, "SELECT id, name FROM branches WHERE name = @P1");
    assert!(!executed[0].sql.contains("DROP"));
    assert_eq!(executed[0].params, vec![RowValues::Text(hostile.to_string())]);
    Ok(())
}

#[tokio::test]
async fn test03_named_parameters_bind_in_declaration_order()
-> Result<(), Box<dyn std::error::Error>> {
    let factory = MemoryFactory::new();
    let pools = manager(&factory);
    let handle = pools.acquire(Target::Primary).await?;

    let descriptor = QueryDescriptor::dml("UPDATE branches SET name = @name WHERE id = @id")
        .bind("id", 7)
        .bind("name", "Harbour");
    execute(&handle, &descriptor).await?;

    let executed = factory.executed();
    assert_eq!(executed[0].sql, "UPDATE branches SET name = @P2 WHERE id = @P1");
    assert_eq!(
        executed[0].params,
        vec![RowValues::Int(7), RowValues::Text("Harbour".into())]
    );
    Ok(())
}

#[tokio::test]
async fn test04_errors_come_back_classified() -> Result<(), Box<dyn std::error::Error>> {
    let factory = MemoryFactory::new();
    let pools = manager(&factory);
    let handle = pools.acquire(Target::Primary).await?;

    factory.respond_with(|_| Err(DalError::QueryError("Invalid object name 'brnches'".into())));
    let err = execute(&handle, &QueryDescriptor::new("SELECT * FROM brnches"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);
    // a fatal statement error leaves the pool alone
    assert_eq!(pools.state(Target::Primary), Some(PoolState::Connected));

    factory.respond_with(|_| Err(DalError::ConnectionError("connection reset".into())));
    let err = execute(&handle, &QueryDescriptor::new("SELECT 1"))
        .await
        .unwrap_err();
    assert!(err.is_transient());

    // the executor never changes state; the manager notices on the next acquire
    assert_eq!(handle.state(), PoolState::Connected);
    let fresh = pools.acquire(Target::Primary).await?;
    assert_eq!(handle.state(), PoolState::Closed);
    assert_eq!(fresh.state(), PoolState::Connected);
    Ok(())
}

#[tokio::test]
async fn test05_invalid_parameters_never_reach_the_backend()
-> Result<(), Box<dyn std::error::Error>> {
    let factory = MemoryFactory::new();
    let pools = manager(&factory);
    let handle = pools.acquire(Target::Primary).await?;

    let descriptor = QueryDescriptor::new("SELECT @P1, @id").param(1).bind("id", 2);
    let err = execute(&handle, &descriptor).await.unwrap_err();
    assert!(matches!(err, DalError::ParameterError(_)));
    assert!(factory.executed().is_empty());
    Ok(())
}

#[tokio::test]
async fn test06_closed_handle_is_refused() -> Result<(), Box<dyn std::error::Error>> {
    let factory = MemoryFactory::new();
    let pools = manager(&factory);
    let handle = pools.acquire(Target::Primary).await?;
    pools.shutdown().await;

    let err = execute(&handle, &QueryDescriptor::new("SELECT 1")).await.unwrap_err();
    assert!(err.is_transient());
    assert!(factory.executed().is_empty());
    Ok(())
}

#[tokio::test]
async fn test07_timeout_releases_the_lease() -> Result<(), Box<dyn std::error::Error>> {
    let factory = MemoryFactory::new();
    factory.set_query_delay(Duration::from_secs(5));
    let pools = manager(&factory);
    let handle = pools.acquire(Target::Primary).await?;

    let executor = QueryExecutor::new().with_timeout(Duration::from_millis(25));
    let err = executor
        .execute(&handle, &QueryDescriptor::new("WAITFOR DELAY '00:00:05'"))
        .await
        .unwrap_err();
    assert!(matches!(err, DalError::ConnectionError(ref msg) if msg.contains("timed out")));
    assert_eq!(factory.active_leases(), 0);
    Ok(())
}

#[tokio::test]
async fn test08_leases_are_held_only_while_running() -> Result<(), Box<dyn std::error::Error>> {
    let factory = MemoryFactory::new();
    factory.set_query_delay(Duration::from_millis(50));
    let pools = manager(&factory);
    let handle = pools.acquire(Target::Primary).await?;

    let observer = factory.clone();
    let running = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        observer.active_leases()
    });
    execute(&handle, &QueryDescriptor::new("SELECT 1")).await?;
    assert_eq!(running.await?, 1);
    assert_eq!(factory.active_leases(), 0);
    Ok(())
}
