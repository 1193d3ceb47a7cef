#![cfg(feature = "mssql")]
//! Runs against a real SQL Server configured through `DB_*` variables.
//!
//! `cargo test --test test04_mssql_live -- --ignored`

use std::sync::Arc;

use dashboard_dal::mssql::MssqlFactory;
use dashboard_dal::prelude::*;

#[tokio::test]
#[ignore = "needs a SQL Server configured through DB_* variables"]
async fn test01_round_trip_against_sql_server() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let pools = PoolManager::from_env(Arc::new(MssqlFactory::new()))?;
    let handle = pools.acquire(Target::Primary).await?;

    let rs = execute(
        &handle,
        &QueryDescriptor::new("SELECT @n AS n, @s AS s, CAST(1 AS bit) AS flag")
            .bind("n", 41)
            .bind("s", "'; DROP TABLE x; --"),
    )
    .await?;
    let row = rs.first().ok_or("no row returned")?;
    assert_eq!(row.get("n"), Some(&RowValues::Int(41)));
    assert_eq!(row.get("s").and_then(RowValues::as_text), Some("'; DROP TABLE x; --"));
    assert_eq!(row.get("flag").and_then(RowValues::as_bool), Some(true));

    let again = pools.acquire(Target::Primary).await?;
    assert!(Arc::ptr_eq(&handle, &again));

    let err = execute(&handle, &QueryDescriptor::new("SELECT * FROM table_that_does_not_exist"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);

    pools.shutdown().await;
    assert_eq!(handle.state(), PoolState::Closed);
    Ok(())
}

#[tokio::test]
#[ignore = "needs network access to reach a closed port"]
async fn test02_refused_connection_is_transient() {
    let config = TargetConfig::builder(Target::Primary, "127.0.0.1", "master", "sa", "unused")
        .port(1)
        .encrypt(false)
        .build()
        .unwrap();
    let pools = PoolManager::new(Arc::new(MssqlFactory::new())).with_target(config);

    let err = pools.acquire(Target::Primary).await.unwrap_err();
    assert!(err.is_transient(), "{err:?}");
    assert_eq!(pools.state(Target::Primary), Some(PoolState::Uninitialized));
}
