//! Polling helpers that follow a container's state.

use std::time::Duration;

use log::debug;
use tokio_util::sync::CancellationToken;

use super::{ContainerResult, ContainerRuntimeApi};

/// How a watched container stopped being debuggable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Container exited or died.
    Exited,
    /// Container no longer exists.
    Removed,
    /// Watching was cancelled.
    Cancelled,
}

/// Whether a container in `state` may still serve a debug session.
pub fn is_active_state(state: &str) -> bool {
    matches!(state, "running" | "restarting" | "paused" | "created")
}

async fn pause(interval: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(interval) => true,
    }
}

/// Poll until `container` exists. Returns its state, or `None` if cancelled.
pub async fn wait_for_container(
    runtime: &dyn ContainerRuntimeApi,
    container: &str,
    interval: Duration,
    cancel: &CancellationToken,
) -> ContainerResult<Option<String>> {
    loop {
        if let Some(state) = runtime.container_state_status(container).await? {
            return Ok(Some(state));
        }
        debug!("waiting for container '{}' to appear", container);
        if !pause(interval, cancel).await {
            return Ok(None);
        }
    }
}

/// Poll until `container` stops, disappears, or `cancel` fires.
pub async fn watch_until_stopped(
    runtime: &dyn ContainerRuntimeApi,
    container: &str,
    interval: Duration,
    cancel: &CancellationToken,
) -> ContainerResult<WatchOutcome> {
    loop {
        match runtime.container_state_status(container).await? {
            None => return Ok(WatchOutcome::Removed),
            Some(state) if !is_active_state(&state) => {
                debug!("container '{}' is {}", container, state);
                return Ok(WatchOutcome::Exited);
            }
            Some(_) => {}
        }
        if !pause(interval, cancel).await {
            return Ok(WatchOutcome::Cancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed sequence of states, then reports the container missing.
    struct ScriptedRuntime {
        states: Mutex<VecDeque<Option<&'static str>>>,
    }

    impl ScriptedRuntime {
        fn new(states: &[Option<&'static str>]) -> Self {
            Self {
                states: Mutex::new(states.iter().copied().collect()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ContainerRuntimeApi for ScriptedRuntime {
        async fn start_container(&self, _container: &str) -> ContainerResult<()> {
            Ok(())
        }

        async fn remove_container(&self, container: &str, _force: bool) -> ContainerResult<()> {
            Err(ContainerError::ContainerNotFound(container.to_string()))
        }

        async fn container_state_status(
            &self,
            _container: &str,
        ) -> ContainerResult<Option<String>> {
            Ok(self
                .states
                .lock()
                .unwrap()
                .pop_front()
                .flatten()
                .map(str::to_string))
        }
    }

    const TICK: Duration = Duration::from_millis(1);

    #[tokio::test]
    async fn test_wait_for_container_polls_until_present() {
        let runtime = ScriptedRuntime::new(&[None, None, Some("created")]);
        let state = wait_for_container(&runtime, "c1", TICK, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(state.as_deref(), Some("created"));
    }

    #[tokio::test]
    async fn test_watch_reports_exit() {
        let runtime = ScriptedRuntime::new(&[Some("running"), Some("running"), Some("exited")]);
        let outcome = watch_until_stopped(&runtime, "c1", TICK, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, WatchOutcome::Exited);
    }

    #[tokio::test]
    async fn test_watch_reports_removal() {
        let runtime = ScriptedRuntime::new(&[Some("running")]);
        let outcome = watch_until_stopped(&runtime, "c1", TICK, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, WatchOutcome::Removed);
    }

    #[tokio::test]
    async fn test_watch_stops_when_cancelled() {
        let runtime = ScriptedRuntime::new(&[Some("running"); 1000]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = watch_until_stopped(&runtime, "c1", Duration::from_secs(60), &cancel)
            .await
            .unwrap();
        assert_eq!(outcome, WatchOutcome::Cancelled);
    }
}
