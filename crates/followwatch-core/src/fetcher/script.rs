use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{parse_count, FetchError, FollowerFetcher};
use crate::models::Handle;

/// Runs `program args... <handle>` and reads the count from stdout.
///
/// The handle is passed as a separate argument, never through a shell. The
/// child is killed if the fetch future is dropped (e.g. on timeout).
#[derive(Debug, Clone)]
pub struct ScriptFetcher {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl ScriptFetcher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            envs: Vec::new(),
        }
    }

    /// Set an extra environment variable for the child.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl FollowerFetcher for ScriptFetcher {
    async fn fetch_followers(&self, handle: &Handle) -> Result<u64, FetchError> {
        debug!(program = %self.program, handle = %handle, "Running fetcher script");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(handle.as_str())
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| FetchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!(
                handle = %handle,
                stderr = %FetchError::truncate_body(&stderr),
                "Fetcher script wrote to stderr"
            );
        }

        if !output.status.success() {
            return Err(FetchError::ExitStatus {
                status: output.status.to_string(),
                stderr: FetchError::truncate_body(&stderr),
            });
        }

        parse_count(&String::from_utf8_lossy(&output.stdout))
    }

    fn name(&self) -> &'static str {
        "script"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> ScriptFetcher {
        // `sh -c script name arg` exposes the handle as $1
        ScriptFetcher::new("sh", vec!["-c".to_string(), script.to_string(), "fetcher".to_string()])
    }

    fn handle() -> Handle {
        Handle::parse("some.user").unwrap()
    }

    #[tokio::test]
    async fn test_reads_count_from_stdout() {
        let fetcher = sh("echo 1234");
        assert_eq!(fetcher.fetch_followers(&handle()).await.unwrap(), 1234);
    }

    #[tokio::test]
    async fn test_handle_is_last_argument() {
        let fetcher = sh(r#"[ "$1" = "some.user" ] && echo 7 || exit 3"#);
        assert_eq!(fetcher.fetch_followers(&handle()).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_env_is_passed() {
        let fetcher = sh(r#"echo "$FOLLOWER_SEED""#).with_env("FOLLOWER_SEED", "42");
        assert_eq!(fetcher.fetch_followers(&handle()).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_non_zero_exit_fails() {
        let fetcher = sh("echo 'Error: APIFY_TOKEN not set' >&2; exit 1");
        match fetcher.fetch_followers(&handle()).await {
            Err(FetchError::ExitStatus { stderr, .. }) => {
                assert!(stderr.contains("APIFY_TOKEN"));
            }
            other => panic!("expected exit status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_garbage_output_fails() {
        let fetcher = sh("echo not-a-number");
        assert!(matches!(
            fetcher.fetch_followers(&handle()).await,
            Err(FetchError::InvalidOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_program_fails() {
        let fetcher = ScriptFetcher::new("/nonexistent/followwatch-fetcher", vec![]);
        assert!(matches!(
            fetcher.fetch_followers(&handle()).await,
            Err(FetchError::Spawn { .. })
        ));
    }
}
