#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use kindling_config::ResourceConfig;
use kindling_lifecycle::{ClusterState, LifecycleConfig, LifecycleController, LifecycleError, DEFAULT_NODE_IMAGE};
use kindling_provision::{CreateOptions, ProvisionError, Provisioner};

fn kubeconfig_for(name: &str) -> String {
    format!(
        "apiVersion: v1\nkind: Config\ncurrent-context: kind-{name}\n\
clusters:\n- name: kind-{name}\n  cluster:\n    server: https://127.0.0.1:6443\n    certificate-authority-data: {ca}\n\
users:\n- name: kind-{name}\n  user:\n    client-certificate-data: {cert}\n    client-key-data: {key}\n\
contexts:\n- name: kind-{name}\n  context:\n    cluster: kind-{name}\n    user: kind-{name}\n",
        ca = STANDARD.encode("CA"),
        cert = STANDARD.encode("CERT"),
        key = STANDARD.encode("KEY"),
    )
}

fn failure(what: &str) -> ProvisionError {
    ProvisionError::CommandFailed { command: format!("kind {what}"), message: "boom".into() }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) { self.0.store(true, Ordering::SeqCst); }
}

#[derive(Default)]
struct FakeProvisioner {
    create_failures: AtomicUsize,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    delete_hangs: bool,
    delete_fails: bool,
    kubeconfig_fails: bool,
    export_fails: bool,
    kubeconfig_override: Option<String>,
    delete_dropped: Arc<AtomicBool>,
    last_create: Mutex<Option<CreateOptions>>,
    exported: Mutex<Vec<PathBuf>>,
}

#[async_trait::async_trait]
impl Provisioner for FakeProvisioner {
    async fn create(&self, opts: &CreateOptions) -> Result<(), ProvisionError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_create.lock().unwrap() = Some(opts.clone());
        let left = self.create_failures.load(Ordering::SeqCst);
        if left > 0 {
            self.create_failures.store(left - 1, Ordering::SeqCst);
            return Err(failure("create cluster"));
        }
        Ok(())
    }

    async fn delete(&self, _name: &str, _kubeconfig_path: Option<&Path>) -> Result<(), ProvisionError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.delete_hangs {
            let _guard = DropFlag(self.delete_dropped.clone());
            std::future::pending::<()>().await;
        }
        if self.delete_fails {
            return Err(failure("delete cluster"));
        }
        Ok(())
    }

    async fn kubeconfig(&self, name: &str, _internal: bool) -> Result<String, ProvisionError> {
        if self.kubeconfig_fails {
            return Err(failure("get kubeconfig"));
        }
        Ok(self.kubeconfig_override.clone().unwrap_or_else(|| kubeconfig_for(name)))
    }

    async fn export_kubeconfig(&self, _name: &str, path: &Path) -> Result<(), ProvisionError> {
        if self.export_fails {
            return Err(failure("export kubeconfig"));
        }
        self.exported.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, ProvisionError> { Ok(vec![]) }
}

fn test_config(export_dir: &Path) -> LifecycleConfig {
    LifecycleConfig { default_kubeconfig: None, export_dir: Some(export_dir.to_path_buf()), ..LifecycleConfig::default() }
}

fn resource(name: &str) -> ResourceConfig {
    ResourceConfig { name: name.into(), ..Default::default() }
}

#[tokio::test(start_paused = true)]
async fn create_succeeds_on_third_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeProvisioner { create_failures: AtomicUsize::new(2), ..Default::default() });
    let ctl = LifecycleController::new(fake.clone(), test_config(dir.path()));

    let started = tokio::time::Instant::now();
    let state = ctl.create(&resource("retry")).await.unwrap();

    assert_eq!(fake.create_calls.load(Ordering::SeqCst), 3);
    // one cleanup delete before each retry
    assert_eq!(fake.delete_calls.load(Ordering::SeqCst), 2);
    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(state.node_image, DEFAULT_NODE_IMAGE);
    assert_eq!(state.id, format!("retry-{}", DEFAULT_NODE_IMAGE));
    assert_eq!(fake.last_create.lock().unwrap().as_ref().unwrap().node_image, DEFAULT_NODE_IMAGE);
    assert!(state.completed);
    assert_eq!(state.endpoint, "https://127.0.0.1:6443");
    assert_eq!(state.client_key, "KEY");
    assert_eq!(state.kubeconfig_path, Some(dir.path().join("retry-config")));
    assert_eq!(*fake.exported.lock().unwrap(), vec![dir.path().join("retry-config")]);
}

#[tokio::test(start_paused = true)]
async fn failed_cleanup_between_attempts_does_not_stop_create() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeProvisioner { create_failures: AtomicUsize::new(2), delete_fails: true, ..Default::default() });
    let ctl = LifecycleController::new(fake.clone(), test_config(dir.path()));

    let state = ctl.create(&resource("flaky")).await.unwrap();
    assert_eq!(fake.create_calls.load(Ordering::SeqCst), 3);
    assert_eq!(fake.delete_calls.load(Ordering::SeqCst), 2);
    assert!(state.completed);
}

#[tokio::test(start_paused = true)]
async fn create_gives_up_after_max_retries() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeProvisioner { create_failures: AtomicUsize::new(10), ..Default::default() });
    let cfg = LifecycleConfig { max_retries: 1, ..test_config(dir.path()) };
    let ctl = LifecycleController::new(fake.clone(), cfg);

    let err = ctl.create(&resource("doomed")).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Create { attempts: 2, .. }), "err={}", err);
    assert_eq!(err.summary(), "Error creating Kind cluster");
    assert!(err.to_string().contains("doomed"));
    assert_eq!(fake.create_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn create_passes_user_settings_through() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeProvisioner::default());
    let ctl = LifecycleController::new(fake.clone(), test_config(dir.path()));
    let custom = dir.path().join("custom-config");
    let res = ResourceConfig {
        name: "custom".into(),
        node_image: Some("kindest/node:v1.30.0".into()),
        wait_for_ready: true,
        kubeconfig_path: Some(custom.to_string_lossy().into_owned()),
        kind_config: None,
    };

    let state = ctl.create(&res).await.unwrap();
    let opts = fake.last_create.lock().unwrap().clone().unwrap();
    assert_eq!(opts.node_image, "kindest/node:v1.30.0");
    assert_eq!(opts.wait, Some(Duration::from_secs(300)));
    assert_eq!(opts.kubeconfig_path.as_deref(), Some(custom.as_path()));
    assert_eq!(state.id, "custom-kindest/node:v1.30.0");
    assert!(state.wait_for_ready);
    // a recorded path is never re-exported
    assert!(fake.exported.lock().unwrap().is_empty());
    assert_eq!(state.kubeconfig_path, Some(custom));
}

#[tokio::test]
async fn read_reports_kubeconfig_fetch_failure() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeProvisioner { kubeconfig_fails: true, ..Default::default() });
    let ctl = LifecycleController::new(fake.clone(), test_config(dir.path()));
    let mut state = ClusterState { name: "dev".into(), ..Default::default() };

    let err = ctl.read(&mut state).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Kubeconfig { .. }), "err={}", err);
    assert_eq!(err.summary(), "Error reading Kind cluster");
    assert!(!state.completed);
    assert!(fake.exported.lock().unwrap().is_empty());
}

#[tokio::test]
async fn read_reports_export_failure() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeProvisioner { export_fails: true, ..Default::default() });
    let ctl = LifecycleController::new(fake, test_config(dir.path()));
    let mut state = ClusterState { name: "dev".into(), ..Default::default() };

    let err = ctl.read(&mut state).await.unwrap_err();
    match &err {
        LifecycleError::Export { path, .. } => assert_eq!(path, &dir.path().join("dev-config")),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(err.summary(), "Error exporting kubeconfig");
    assert!(!state.completed);
    assert!(state.kubeconfig_path.is_none());
}

#[tokio::test]
async fn read_reports_malformed_kubeconfig() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeProvisioner { kubeconfig_override: Some("clusters: 7".into()), ..Default::default() });
    let ctl = LifecycleController::new(fake, test_config(dir.path()));
    let mut state = ClusterState { name: "dev".into(), kubeconfig_path: Some(dir.path().join("dev-config")), ..Default::default() };

    let err = ctl.read(&mut state).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Connection { .. }), "err={}", err);
    assert_eq!(err.summary(), "Error reading Kind cluster");
    assert!(!state.completed);
    assert!(state.endpoint.is_empty());
}

#[tokio::test(start_paused = true)]
async fn hanging_delete_times_out_at_the_configured_duration() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeProvisioner { delete_hangs: true, ..Default::default() });
    let timeout = Duration::from_secs(300);
    let cfg = LifecycleConfig { delete_timeout: timeout, ..test_config(dir.path()) };
    let ctl = LifecycleController::new(fake.clone(), cfg);
    let state = ClusterState { name: "stuck".into(), ..Default::default() };

    let started = tokio::time::Instant::now();
    let err = ctl.delete(&state).await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout(), "err={}", err);
    assert_eq!(err.summary(), "Timeout deleting Kind cluster");
    assert!(elapsed >= timeout, "elapsed={:?}", elapsed);
    assert!(elapsed < timeout + Duration::from_millis(10), "elapsed={:?}", elapsed);

    // the losing task is cancelled, not left running
    for _ in 0..10 {
        if fake.delete_dropped.load(Ordering::SeqCst) { break; }
        tokio::task::yield_now().await;
    }
    assert!(fake.delete_dropped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn reported_delete_failure_is_not_a_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeProvisioner { delete_fails: true, ..Default::default() });
    let ctl = LifecycleController::new(fake, test_config(dir.path()));

    let err = ctl.delete(&ClusterState { name: "bad".into(), ..Default::default() }).await.unwrap_err();
    assert!(matches!(err, LifecycleError::Delete { .. }), "err={}", err);
    assert!(!err.is_timeout());
    assert_eq!(err.summary(), "Error deleting Kind cluster");
}

#[tokio::test]
async fn delete_succeeds_when_credential_stores_are_unreadable() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken-config");
    std::fs::write(&broken, "clusters: [this is not a kubeconfig").unwrap();
    let cfg = LifecycleConfig { default_kubeconfig: Some(broken), ..test_config(dir.path()) };
    let ctl = LifecycleController::new(Arc::new(FakeProvisioner::default()), cfg);
    // a directory where a file should be
    let state = ClusterState { name: "gone".into(), kubeconfig_path: Some(dir.path().to_path_buf()), ..Default::default() };

    let outcome = ctl.delete(&state).await.unwrap();
    assert_eq!(outcome.warnings.len(), 2, "warnings={:?}", outcome.warnings);
    assert!(outcome.warnings.iter().all(|w| w.contains("kind-gone")));
}

#[tokio::test]
async fn delete_cleans_the_recorded_kubeconfig() {
    let dir = tempfile::tempdir().unwrap();
    let custom = dir.path().join("tidy-config");
    std::fs::write(&custom, kubeconfig_for("tidy")).unwrap();
    let ctl = LifecycleController::new(Arc::new(FakeProvisioner::default()), test_config(dir.path()));
    let state = ClusterState { name: "tidy".into(), kubeconfig_path: Some(custom.clone()), ..Default::default() };

    let outcome = ctl.delete(&state).await.unwrap();
    assert!(outcome.warnings.is_empty(), "warnings={:?}", outcome.warnings);
    let after = std::fs::read_to_string(&custom).unwrap();
    assert!(!after.contains("kind-tidy"), "after={}", after);
}

#[tokio::test]
async fn update_is_always_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let ctl = LifecycleController::new(Arc::new(FakeProvisioner::default()), test_config(dir.path()));
    let err = ctl.update(&ClusterState::default(), &resource("x")).unwrap_err();
    assert!(matches!(err, LifecycleError::UpdateNotSupported));
}

#[test]
fn state_round_trips_through_json() {
    let state = ClusterState { id: "a-img".into(), name: "a".into(), node_image: "img".into(), completed: true, ..Default::default() };
    let json = serde_json::to_string(&state).unwrap();
    let back: ClusterState = serde_json::from_str(&json).unwrap();
    assert_eq!(state, back);
}
