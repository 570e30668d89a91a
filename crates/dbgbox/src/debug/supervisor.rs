//! Session lifecycle supervision.
//!
//! Each resolved session that owns a container gets one supervision:
//!
//! ```text
//! Armed --(stale removal, unless externally managed)--> Listening
//! Listening --(termination event for another container)--> Listening
//! Listening --(termination event for our container)--> Removing --> Disposed
//! ```
//!
//! Supervisions never coordinate with each other. Each one compares the
//! container name carried by a termination event against its own and ignores
//! everything else, so concurrent sessions cannot remove each other's
//! containers. Removal uses `rm -f`, which tolerates duplicate attempts.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use dbgbox_protocol::ResolvedSession;

use super::events::{TerminationEvents, TerminationReceiver};
use crate::container::{ContainerError, ContainerRuntimeApi};

/// Debug types whose own tooling creates the container while the session is
/// resolved, so a stale-container removal at arm time would race with it.
pub const DEFAULT_EXTERNALLY_MANAGED_TYPES: &[&str] = &["python"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SupervisorState {
    Armed,
    Listening,
    Removing,
    Disposed,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SupervisorState::Armed => "armed",
            SupervisorState::Listening => "listening",
            SupervisorState::Removing => "removing",
            SupervisorState::Disposed => "disposed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemovalPhase {
    Stale,
    SessionEnded,
}

impl fmt::Display for RemovalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalPhase::Stale => f.write_str("stale container"),
            RemovalPhase::SessionEnded => f.write_str("debug session ended"),
        }
    }
}

/// Force-remove a container, logging and swallowing any failure.
///
/// Returns whether the runtime reported success.
async fn remove_container_best_effort(
    runtime: &dyn ContainerRuntimeApi,
    container: &str,
    phase: RemovalPhase,
) -> bool {
    match runtime.remove_container(container, true).await {
        Ok(()) => {
            info!("removed container '{}' ({})", container, phase);
            true
        }
        Err(ContainerError::ContainerNotFound(_)) => {
            debug!("container '{}' already gone ({})", container, phase);
            false
        }
        Err(e) if e.is_runtime_unavailable() => {
            warn!(
                "could not remove container '{}' ({}): {}",
                container, phase, e
            );
            false
        }
        Err(e) => {
            debug!("container '{}' not removed ({}): {}", container, phase, e);
            false
        }
    }
}

/// Observer handle for one armed supervision.
#[derive(Debug, Clone)]
pub struct Supervision {
    container: String,
    eager_removal: bool,
    state: watch::Receiver<SupervisorState>,
}

impl Supervision {
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Whether a stale-container removal was attempted when arming.
    pub fn eager_removal_attempted(&self) -> bool {
        self.eager_removal
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == SupervisorState::Disposed
    }

    /// Wait until the supervision reaches `Disposed`.
    pub async fn disposed(&self) {
        let mut state = self.state.clone();
        let _ = state
            .wait_for(|s| *s == SupervisorState::Disposed)
            .await;
    }
}

/// A live listener on the termination stream.
///
/// Dropping it unregisters the listener and marks the supervision disposed,
/// whether the listening task finished normally or was aborted.
struct Registration {
    events: Option<TerminationReceiver>,
    state: watch::Sender<SupervisorState>,
}

impl Registration {
    async fn listen(mut self, runtime: Arc<dyn ContainerRuntimeApi>, container: String) {
        let Some(events) = self.events.as_mut() else {
            return;
        };

        loop {
            let Some(event) = events.recv().await else {
                debug!("termination stream closed, releasing '{}'", container);
                return;
            };
            if event.container_name_to_kill() == Some(container.as_str()) {
                debug!(
                    "session {} ended, removing container '{}'",
                    event.session_id, container
                );
                break;
            }
        }

        self.state.send_replace(SupervisorState::Removing);
        remove_container_best_effort(runtime.as_ref(), &container, RemovalPhase::SessionEnded)
            .await;
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.events.take();
        self.state.send_replace(SupervisorState::Disposed);
    }
}

struct ActiveSupervision {
    supervision: Supervision,
    abort: AbortHandle,
}

/// Arms container removal for resolved sessions.
pub struct LifecycleSupervisor {
    runtime: Arc<dyn ContainerRuntimeApi>,
    events: TerminationEvents,
    externally_managed: HashSet<String>,
    active: Mutex<Vec<ActiveSupervision>>,
}

impl fmt::Debug for LifecycleSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleSupervisor")
            .field("externally_managed", &self.externally_managed)
            .field("active", &self.lock_active().len())
            .finish()
    }
}

impl LifecycleSupervisor {
    pub fn new(runtime: Arc<dyn ContainerRuntimeApi>, events: TerminationEvents) -> Self {
        Self {
            runtime,
            events,
            externally_managed: DEFAULT_EXTERNALLY_MANAGED_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            active: Mutex::new(Vec::new()),
        }
    }

    /// Replace the set of debug types that skip stale-container removal.
    pub fn with_externally_managed_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.externally_managed = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn events(&self) -> &TerminationEvents {
        &self.events
    }

    pub fn is_externally_managed(&self, debug_type: Option<&str>) -> bool {
        debug_type.is_some_and(|t| self.externally_managed.contains(t))
    }

    fn lock_active(&self) -> MutexGuard<'_, Vec<ActiveSupervision>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Arm removal of the session's container when the session ends.
    ///
    /// Returns `None` when the session owns no container or opted out with
    /// `removeContainerAfterDebug: false`.
    pub async fn arm(&self, session: &ResolvedSession) -> Option<Supervision> {
        let container = session.removal_target()?.to_string();
        let (state_tx, state_rx) = watch::channel(SupervisorState::Armed);

        let eager_removal = !self.is_externally_managed(session.debug_type.as_deref());
        if eager_removal {
            remove_container_best_effort(self.runtime.as_ref(), &container, RemovalPhase::Stale)
                .await;
        } else {
            debug!(
                "not removing stale '{}': debug type {:?} manages its own container",
                container, session.debug_type
            );
        }

        let registration = Registration {
            events: Some(self.events.subscribe()),
            state: state_tx,
        };
        registration.state.send_replace(SupervisorState::Listening);

        let task = tokio::spawn(registration.listen(Arc::clone(&self.runtime), container.clone()));

        let supervision = Supervision {
            container,
            eager_removal,
            state: state_rx,
        };

        let mut active = self.lock_active();
        active.retain(|a| !a.supervision.is_disposed());
        active.push(ActiveSupervision {
            supervision: supervision.clone(),
            abort: task.abort_handle(),
        });
        drop(active);

        info!(
            "container '{}' will be removed when its debug session ends",
            supervision.container
        );
        Some(supervision)
    }

    /// Supervisions that have not been disposed yet.
    pub fn active(&self) -> Vec<Supervision> {
        let mut active = self.lock_active();
        active.retain(|a| !a.supervision.is_disposed());
        active.iter().map(|a| a.supervision.clone()).collect()
    }

    /// Wait until every supervision for `container` is disposed.
    pub async fn wait_disposed(&self, container: &str) {
        let pending: Vec<Supervision> = self
            .active()
            .into_iter()
            .filter(|s| s.container == container)
            .collect();
        futures::future::join_all(pending.iter().map(Supervision::disposed)).await;
    }

    /// Dispose every listening supervision without removing its container.
    ///
    /// A supervision already removing its container is left to finish that
    /// removal and dispose itself.
    pub fn shutdown(&self) {
        let drained: Vec<ActiveSupervision> = self.lock_active().drain(..).collect();
        for active in drained {
            match active.supervision.state() {
                SupervisorState::Removing => {
                    debug!(
                        "letting removal of '{}' finish",
                        active.supervision.container
                    );
                }
                SupervisorState::Disposed => {}
                _ => {
                    debug!("releasing supervision for '{}'", active.supervision.container);
                    active.abort.abort();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerError, ContainerResult};
    use dbgbox_protocol::{DockerOptions, RequestKind, TerminationEvent};
    use tokio::sync::Notify;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeRuntime {
        removals: std::sync::Mutex<Vec<(String, bool)>>,
        fail_removal: bool,
    }

    impl FakeRuntime {
        fn failing() -> Self {
            Self {
                fail_removal: true,
                ..Default::default()
            }
        }

        fn removals(&self) -> Vec<String> {
            self.removals
                .lock()
                .unwrap()
                .iter()
                .map(|(name, _)| name.clone())
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl ContainerRuntimeApi for FakeRuntime {
        async fn start_container(&self, _container: &str) -> ContainerResult<()> {
            Ok(())
        }

        async fn remove_container(&self, container: &str, force: bool) -> ContainerResult<()> {
            self.removals
                .lock()
                .unwrap()
                .push((container.to_string(), force));
            if self.fail_removal {
                Err(ContainerError::ContainerNotFound(container.to_string()))
            } else {
                Ok(())
            }
        }

        async fn container_state_status(
            &self,
            _container: &str,
        ) -> ContainerResult<Option<String>> {
            Ok(None)
        }
    }

    fn session(debug_type: &str, container: &str) -> ResolvedSession {
        ResolvedSession::new(debug_type, RequestKind::Launch)
            .with_docker_options(DockerOptions::for_container(container))
    }

    fn ended(container: &str) -> TerminationEvent {
        TerminationEvent::new(format!("session-{container}"), Some(session("node", container)))
    }

    async fn wait(supervision: &Supervision) {
        tokio::time::timeout(Duration::from_secs(5), supervision.disposed())
            .await
            .expect("supervision was not disposed");
    }

    fn supervisor(runtime: &Arc<FakeRuntime>) -> LifecycleSupervisor {
        LifecycleSupervisor::new(runtime.clone(), TerminationEvents::default())
    }

    #[tokio::test]
    async fn test_arm_removes_stale_container_and_listens() {
        let runtime = Arc::new(FakeRuntime::default());
        let supervisor = supervisor(&runtime);

        let supervision = supervisor.arm(&session("node", "c1")).await.unwrap();

        assert!(supervision.eager_removal_attempted());
        assert_eq!(supervision.state(), SupervisorState::Listening);
        assert_eq!(runtime.removals(), vec!["c1"]);
        assert!(runtime.removals.lock().unwrap()[0].1, "removal must be forced");
        assert_eq!(supervisor.events().listener_count(), 1);
    }

    #[tokio::test]
    async fn test_externally_managed_type_skips_stale_removal() {
        let runtime = Arc::new(FakeRuntime::default());
        let supervisor = supervisor(&runtime);

        let supervision = supervisor.arm(&session("python", "py1")).await.unwrap();

        assert!(!supervision.eager_removal_attempted());
        assert_eq!(supervision.state(), SupervisorState::Listening);
        assert!(runtime.removals().is_empty());

        supervisor.events().emit(ended("py1"));
        wait(&supervision).await;
        assert_eq!(runtime.removals(), vec!["py1"]);
    }

    #[tokio::test]
    async fn test_opted_out_session_is_not_armed() {
        let runtime = Arc::new(FakeRuntime::default());
        let supervisor = supervisor(&runtime);
        let mut opted_out = session("node", "c1");
        if let Some(options) = opted_out.docker_options.as_mut() {
            options.remove_container_after_debug = Some(false);
        }

        assert!(supervisor.arm(&opted_out).await.is_none());
        assert!(
            supervisor
                .arm(&ResolvedSession::new("node", RequestKind::Launch))
                .await
                .is_none()
        );
        assert!(runtime.removals().is_empty());
        assert_eq!(supervisor.events().listener_count(), 0);
    }

    #[tokio::test]
    async fn test_termination_only_disposes_matching_supervisor() {
        let runtime = Arc::new(FakeRuntime::default());
        let supervisor = supervisor(&runtime);

        let a = supervisor.arm(&session("node", "A")).await.unwrap();
        let b = supervisor.arm(&session("node", "B")).await.unwrap();

        supervisor.events().emit(ended("A"));
        wait(&a).await;

        assert_eq!(b.state(), SupervisorState::Listening);
        assert_eq!(runtime.removals(), vec!["A", "B", "A"]);
        assert_eq!(supervisor.events().listener_count(), 1);

        let active: Vec<String> = supervisor
            .active()
            .iter()
            .map(|s| s.container().to_string())
            .collect();
        assert_eq!(active, vec!["B"]);
    }

    #[tokio::test]
    async fn test_removal_fires_once_per_registration() {
        let runtime = Arc::new(FakeRuntime::default());
        let supervisor = supervisor(&runtime).with_externally_managed_types(["node"]);

        let a = supervisor.arm(&session("node", "A")).await.unwrap();
        supervisor.events().emit(ended("A"));
        wait(&a).await;

        assert_eq!(supervisor.events().emit(ended("A")), 0);
        assert_eq!(runtime.removals(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_failed_removal_still_disposes() {
        let runtime = Arc::new(FakeRuntime::failing());
        let supervisor = supervisor(&runtime);

        let supervision = supervisor.arm(&session("node", "gone")).await.unwrap();
        assert_eq!(supervision.state(), SupervisorState::Listening);

        supervisor.events().emit(ended("gone"));
        wait(&supervision).await;

        assert_eq!(runtime.removals(), vec!["gone", "gone"]);
        assert_eq!(supervisor.events().listener_count(), 0);
    }

    #[tokio::test]
    async fn test_events_without_configuration_are_ignored() {
        let runtime = Arc::new(FakeRuntime::default());
        let supervisor = supervisor(&runtime);
        let supervision = supervisor.arm(&session("node", "c1")).await.unwrap();

        supervisor
            .events()
            .emit(TerminationEvent::new("other-debugger", None));
        tokio::task::yield_now().await;

        assert_eq!(supervision.state(), SupervisorState::Listening);
        assert_eq!(runtime.removals(), vec!["c1"]);
    }

    #[tokio::test]
    async fn test_shutdown_releases_without_removing() {
        let runtime = Arc::new(FakeRuntime::default());
        let supervisor = supervisor(&runtime);
        let supervision = supervisor.arm(&session("python", "c1")).await.unwrap();

        supervisor.shutdown();
        wait(&supervision).await;

        assert!(runtime.removals().is_empty());
        assert!(supervisor.active().is_empty());
    }

    #[tokio::test]
    async fn test_own_event_survives_a_burst_of_other_terminations() {
        let runtime = Arc::new(FakeRuntime::default());
        let supervisor = supervisor(&runtime);
        let supervision = supervisor.arm(&session("node", "A")).await.unwrap();

        // Nothing is polled until `wait`, so every event queues up first.
        supervisor.events().emit(ended("A"));
        for i in 0..200 {
            supervisor.events().emit(ended(&format!("other-{i}")));
        }
        wait(&supervision).await;

        assert_eq!(runtime.removals(), vec!["A", "A"]);
    }

    /// Removal blocks until the test releases it.
    #[derive(Default)]
    struct GatedRuntime {
        started: Notify,
        release: Notify,
        completed: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ContainerRuntimeApi for GatedRuntime {
        async fn start_container(&self, _container: &str) -> ContainerResult<()> {
            Ok(())
        }

        async fn remove_container(&self, container: &str, _force: bool) -> ContainerResult<()> {
            self.started.notify_one();
            self.release.notified().await;
            self.completed.lock().unwrap().push(container.to_string());
            Ok(())
        }

        async fn container_state_status(
            &self,
            _container: &str,
        ) -> ContainerResult<Option<String>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_shutdown_lets_inflight_removal_finish() {
        let runtime = Arc::new(GatedRuntime::default());
        let supervisor = LifecycleSupervisor::new(runtime.clone(), TerminationEvents::default())
            .with_externally_managed_types(["node"]);
        let supervision = supervisor.arm(&session("node", "A")).await.unwrap();

        supervisor.events().emit(ended("A"));
        runtime.started.notified().await;
        assert_eq!(supervision.state(), SupervisorState::Removing);

        supervisor.shutdown();
        runtime.release.notify_one();
        wait(&supervision).await;

        assert_eq!(*runtime.completed.lock().unwrap(), vec!["A".to_string()]);
    }
}
