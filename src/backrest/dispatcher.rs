//! Runs composed pgBackRest commands inside the database container.

use crate::backrest::command::BackrestRequest;
use crate::domain::ports::{ExecOutput, PodExecutorRef};
use crate::error::Result;
use tracing::{error, info};

/// Container the commands run in
pub const DATABASE_CONTAINER: &str = "database";

/// Feeds composed commands to `bash` in the target pod
#[derive(Clone)]
pub struct BackrestDispatcher {
    executor: PodExecutorRef,
}

impl BackrestDispatcher {
    pub fn new(executor: PodExecutorRef) -> Self {
        Self { executor }
    }

    /// Run the request and return the captured output
    pub async fn dispatch(&self, request: &BackrestRequest) -> Result<ExecOutput> {
        info!("backrest {} command requested", request.command);
        if request.local_s3_storage {
            info!("backrest command will be executed for both local and s3 storage");
        } else if request.repo_type == "s3" {
            info!("s3 flag enabled for backrest command");
        }

        let command = request.compose();
        info!("command to execute is [{}]", command);

        let result = self
            .executor
            .exec(
                &request.namespace,
                &request.pod,
                DATABASE_CONTAINER,
                &["bash".to_string()],
                &command,
            )
            .await;

        match result {
            Ok(output) => {
                info!("output=[{}]", output.stdout);
                info!("stderr=[{}]", output.stderr);
                Ok(output)
            }
            Err(e) => {
                error!("backrest command failed: {}", e);
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for BackrestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackrestDispatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backrest::command::BackrestCommand;
    use crate::domain::ports::PodExecutor;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingExecutor {
        calls: Mutex<Vec<(String, String, String, Vec<String>, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl PodExecutor for RecordingExecutor {
        async fn exec(
            &self,
            namespace: &str,
            pod: &str,
            container: &str,
            command: &[String],
            stdin: &str,
        ) -> Result<ExecOutput> {
            self.calls.lock().await.push((
                namespace.to_string(),
                pod.to_string(),
                container.to_string(),
                command.to_vec(),
                stdin.to_string(),
            ));
            if self.fail {
                return Err(Error::Exec("container not running".into()));
            }
            Ok(ExecOutput {
                stdout: "stanza: db".into(),
                stderr: String::new(),
            })
        }
    }

    fn request() -> BackrestRequest {
        BackrestRequest {
            namespace: "pgo".into(),
            pod: "hippo-backrest-shared-repo".into(),
            command: BackrestCommand::Info,
            command_opts: "--stanza=db".into(),
            repo_type: "s3".into(),
            local_s3_storage: false,
        }
    }

    #[tokio::test]
    async fn test_dispatch_runs_bash_in_database_container() {
        let executor = Arc::new(RecordingExecutor::default());
        let dispatcher = BackrestDispatcher::new(executor.clone());

        let output = dispatcher.dispatch(&request()).await.unwrap();
        assert_eq!(output.stdout, "stanza: db");

        let calls = executor.calls.lock().await;
        assert_eq!(calls.len(), 1);
        let (namespace, pod, container, command, stdin) = &calls[0];
        assert_eq!(namespace, "pgo");
        assert_eq!(pod, "hippo-backrest-shared-repo");
        assert_eq!(container, DATABASE_CONTAINER);
        assert_eq!(command, &vec!["bash".to_string()]);
        assert_eq!(stdin, "pgbackrest info --stanza=db --repo-type=s3");
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_returned() {
        let executor = Arc::new(RecordingExecutor {
            fail: true,
            ..Default::default()
        });
        let dispatcher = BackrestDispatcher::new(executor);

        assert_matches!(dispatcher.dispatch(&request()).await, Err(Error::Exec(_)));
    }
}
