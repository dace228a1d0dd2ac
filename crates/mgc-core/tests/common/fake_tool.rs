//! Scripted clone tool for scheduler tests.
//!
//! Successful clones create `<dest>/.git`. Failing clones first leave a
//! partial tree behind so cleanup can be observed. Outcomes are keyed by the
//! destination directory name.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mgc_core::error::ToolError;
use mgc_core::git::CloneTool;
use tokio::sync::Semaphore;

#[derive(Default)]
struct State {
    /// Remaining failing attempts per name; `u32::MAX` fails forever.
    failures: Mutex<HashMap<String, u32>>,
    failing_pulls: Mutex<HashSet<String>>,
    clone_attempts: Mutex<Vec<String>>,
    pulls: Mutex<Vec<PathBuf>>,
    in_clone: AtomicUsize,
    gate: Option<Semaphore>,
    delay: Duration,
}

#[derive(Clone, Default)]
pub struct FakeTool {
    state: Arc<State>,
}

impl FakeTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every clone sleeps for `delay` before finishing.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            state: Arc::new(State {
                delay,
                ..State::default()
            }),
        }
    }

    /// Every clone blocks until `release` hands out a permit.
    pub fn gated() -> Self {
        Self {
            state: Arc::new(State {
                gate: Some(Semaphore::new(0)),
                ..State::default()
            }),
        }
    }

    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.state.gate {
            gate.add_permits(n);
        }
    }

    pub fn fail_always(&self, name: &str) {
        self.fail_times(name, u32::MAX);
    }

    pub fn fail_times(&self, name: &str, times: u32) {
        self.state
            .failures
            .lock()
            .unwrap()
            .insert(name.to_string(), times);
    }

    pub fn fail_pull(&self, name: &str) {
        self.state
            .failing_pulls
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    /// Names passed to `clone_repo`, in call order.
    pub fn clone_attempts(&self) -> Vec<String> {
        self.state.clone_attempts.lock().unwrap().clone()
    }

    pub fn attempts_for(&self, name: &str) -> usize {
        self.clone_attempts().iter().filter(|n| *n == name).count()
    }

    pub fn pulls(&self) -> Vec<PathBuf> {
        self.state.pulls.lock().unwrap().clone()
    }

    /// Clones that have entered the tool (including finished ones).
    pub fn started(&self) -> usize {
        self.state.in_clone.load(Ordering::SeqCst)
    }

    fn should_fail(&self, name: &str) -> bool {
        let mut failures = self.state.failures.lock().unwrap();
        match failures.get_mut(name) {
            Some(0) | None => false,
            Some(n) => {
                if *n != u32::MAX {
                    *n -= 1;
                }
                true
            }
        }
    }
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl CloneTool for FakeTool {
    async fn check_available(&self) -> Result<String, ToolError> {
        Ok("fake-git 1.0".to_string())
    }

    async fn clone_repo(&self, _url: &str, dest: &Path) -> Result<(), ToolError> {
        let name = name_of(dest);
        self.state.clone_attempts.lock().unwrap().push(name.clone());
        self.state.in_clone.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.state.gate {
            gate.acquire().await.unwrap().forget();
        }
        if !self.state.delay.is_zero() {
            tokio::time::sleep(self.state.delay).await;
        }

        std::fs::create_dir_all(dest.join("objects")).unwrap();
        if self.should_fail(&name) {
            return Err(ToolError::new(format!(
                "git clone failed (exit status: 128): fatal: repository '{name}' not found"
            )));
        }
        std::fs::create_dir_all(dest.join(".git")).unwrap();
        std::fs::write(dest.join("README.md"), name.as_bytes()).unwrap();
        Ok(())
    }

    async fn pull_ff_only(&self, repo_path: &Path) -> Result<(), ToolError> {
        self.state.pulls.lock().unwrap().push(repo_path.to_path_buf());
        if self.state.failing_pulls.lock().unwrap().contains(&name_of(repo_path)) {
            return Err(ToolError::new(
                "git pull failed (exit status: 128): fatal: Not possible to fast-forward, aborting.",
            ));
        }
        Ok(())
    }
}
