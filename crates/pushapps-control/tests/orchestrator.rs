//! End-to-end runs against the in-memory platform

use async_trait::async_trait;
use pushapps_control::{Config, PushApps, PushAppsError};
use pushapps_deployment::{MigrationError, SchemaMigrator};
use pushapps_platform::{InMemoryPlatform, InjectedFailure, PlatformClient};
use pushapps_types::Migration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const PLATFORM: &str = r#"
pushApps:
  operationRetryCount: 1
  maxInFlight: 2
cf:
  apiHost: api.example.com
  username: admin
  password: secret
  organization: dev
  space: apps
"#;

fn config(body: &str) -> Config {
    Config::from_yaml(&format!("{PLATFORM}{body}")).unwrap()
}

fn full_config() -> Config {
    config(
        r#"
securityGroups:
  - name: internal
    destination: 10.0.0.0/16
    protocol: tcp
migrations:
  - user: root
    password: secret
    driver: postgres
    host: 127.0.0.1
    port: 5432
    schema: users
    migrationDir: db/users
services:
  - name: db
    plan: small
    broker: p-postgres
userProvidedServices:
  - name: config
    credentials:
      uri: https://config.example.com
apps:
  - name: foo
    path: build/foo.zip
    serviceNames: [db, config, missing]
    environment:
      MODE: production
    route:
      hostname: foo
    domain: apps.example.com
  - name: bar
    path: build/bar.zip
    blueGreenDeploy: true
    route:
      hostname: bar
    domain: apps.example.com
"#,
    )
}

#[derive(Default)]
struct RecordingMigrator {
    runs: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl SchemaMigrator for RecordingMigrator {
    async fn migrate(&self, migration: &Migration) -> Result<(), MigrationError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MigrationError::NoMigrations(migration.migration_dir.clone()));
        }
        Ok(())
    }
}

fn push_apps(config: Config, platform: &Arc<InMemoryPlatform>, migrator: &Arc<RecordingMigrator>) -> PushApps {
    PushApps::new(config, Arc::clone(platform) as Arc<dyn PlatformClient>)
        .with_migrator(Arc::clone(migrator) as Arc<dyn SchemaMigrator>)
}

#[tokio::test]
async fn test_full_run_deploys_every_phase() {
    let platform = Arc::new(InMemoryPlatform::new());
    let migrator = Arc::new(RecordingMigrator::default());

    let summary = push_apps(full_config(), &platform, &migrator)
        .run()
        .await
        .unwrap();

    assert!(summary.records().iter().all(|r| r.succeeded));
    assert_eq!(migrator.runs.load(Ordering::SeqCst), 1);

    let space_id = platform.space_id("dev", "apps").await.unwrap();
    assert!(space_id.is_some());
    assert_eq!(platform.security_group_space("internal"), space_id);
    assert!(platform.has_service("db"));
    assert!(platform.user_provided_service("config").is_some());

    let foo = platform.application("foo").unwrap();
    assert!(foo.started);
    assert_eq!(foo.services, vec!["db", "config"]);
    assert_eq!(foo.environment.get("MODE").map(String::as_str), Some("production"));
    assert_eq!(foo.routes.len(), 1);

    let bar = platform.application("bar").unwrap();
    assert!(bar.started);
    assert!(!platform.application("bar-blue").unwrap().started);
}

#[tokio::test]
async fn test_phases_run_in_order() {
    let platform = Arc::new(InMemoryPlatform::new());
    let migrator = Arc::new(RecordingMigrator::default());

    push_apps(full_config(), &platform, &migrator)
        .run()
        .await
        .unwrap();

    let calls = platform.calls().await;
    let first = |op: &str| calls.iter().position(|c| c.operation == op).unwrap();
    assert!(first("create_organization") < first("create_space"));
    assert!(first("create_space") < first("create_security_group"));
    assert!(first("create_security_group") < first("create_service"));
    assert!(first("create_service") < first("create_user_provided_service"));
    assert!(first("create_user_provided_service") < first("push"));
}

#[tokio::test]
async fn test_rerun_against_deployed_state_succeeds() {
    let platform = Arc::new(InMemoryPlatform::new());
    let migrator = Arc::new(RecordingMigrator::default());
    let orchestrator = push_apps(full_config(), &platform, &migrator);

    orchestrator.run().await.unwrap();
    let summary = orchestrator.run().await.unwrap();

    assert!(summary.records().iter().all(|r| r.succeeded));
    let calls = platform.calls().await;
    assert_eq!(calls.iter().filter(|c| c.operation == "create_organization").count(), 1);
    assert_eq!(calls.iter().filter(|c| c.operation == "create_service").count(), 1);
    assert_eq!(
        platform.calls_for("config").await,
        vec!["create_user_provided_service", "update_user_provided_service"]
    );
}

#[tokio::test]
async fn test_required_service_failure_aborts_before_apps() {
    let platform = Arc::new(InMemoryPlatform::new());
    platform.fail_always("create_service", "db", InjectedFailure::Rejected);
    let migrator = Arc::new(RecordingMigrator::default());

    let err = push_apps(full_config(), &platform, &migrator)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, PushAppsError::OperationFailed { ref name, .. } if name == "Creating service db"));
    assert!(platform.calls_for("foo").await.is_empty());
    assert!(platform.application("bar").is_none());
    assert_eq!(platform.calls_for("db").await, vec!["create_service"; 2]);
}

#[tokio::test]
async fn test_required_migration_failure_aborts_before_services() {
    let platform = Arc::new(InMemoryPlatform::new());
    let migrator = Arc::new(RecordingMigrator {
        fail: true,
        ..Default::default()
    });

    let err = push_apps(full_config(), &platform, &migrator)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, PushAppsError::OperationFailed { .. }));
    assert_eq!(migrator.runs.load(Ordering::SeqCst), 2);
    assert!(!platform.has_service("db"));
}

#[tokio::test]
async fn test_optional_app_failure_does_not_abort() {
    let platform = Arc::new(InMemoryPlatform::new());
    platform.fail_always("start", "foo", InjectedFailure::Rejected);
    let migrator = Arc::new(RecordingMigrator::default());
    let config = config(
        r#"
apps:
  - name: foo
    path: build/foo.zip
    optional: true
  - name: bar
    path: build/bar.zip
"#,
    );

    let summary = push_apps(config, &platform, &migrator).run().await.unwrap();

    let failures: Vec<_> = summary.optional_failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].description, "Start application foo");
    assert!(platform.application("bar").unwrap().started);
}

#[tokio::test]
async fn test_failed_optional_service_is_not_bound() {
    let platform = Arc::new(InMemoryPlatform::new().with_service("db"));
    platform.fail_always("create_service", "cache", InjectedFailure::ProvisionFailed);
    let migrator = Arc::new(RecordingMigrator::default());
    let config = config(
        r#"
services:
  - name: cache
    plan: small
    broker: p-redis
    optional: true
apps:
  - name: foo
    path: build/foo.zip
    serviceNames: [db, cache]
"#,
    );

    let summary = push_apps(config, &platform, &migrator).run().await.unwrap();

    let failures: Vec<_> = summary.optional_failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].identifier, "cache");
    assert!(platform.has_service("cache"));

    let foo = platform.application("foo").unwrap();
    assert!(foo.started);
    assert_eq!(foo.services, vec!["db"]);
}

#[tokio::test]
async fn test_space_creation_failure_aborts_run() {
    let platform = Arc::new(InMemoryPlatform::new());
    platform.fail_always("create_space", "apps", InjectedFailure::Unavailable);
    let migrator = Arc::new(RecordingMigrator::default());

    let err = push_apps(full_config(), &platform, &migrator)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, PushAppsError::Targeting { ref space, .. } if space == "apps"));
    assert!(platform.calls_for("internal").await.is_empty());
}
