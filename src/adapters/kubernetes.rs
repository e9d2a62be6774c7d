//! Kubernetes API adapters
//!
//! Volume claim operations through `Api<PersistentVolumeClaim>` and command
//! execution through the pod exec subresource.

use crate::domain::ports::{ExecOutput, PodExecutor, VolumeClaimClient};
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use kube::api::{Api, AttachParams, DeleteParams, PostParams};
use kube::Client;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

const CLAIM_KIND: &str = "PersistentVolumeClaim";

/// Exec parameters with stdin attached and room for long command output
fn exec_params(container: &str) -> AttachParams {
    AttachParams {
        container: Some(container.to_string()),
        tty: false,
        stdin: true,
        stdout: true,
        stderr: true,
        max_stdin_buf_size: Some(64 * 1024),
        max_stdout_buf_size: Some(1024 * 1024),
        max_stderr_buf_size: Some(1024 * 1024),
    }
}

/// Split the API's "already exists" answer from every other failure
fn classify_create_error(err: kube::Error, name: &str) -> Error {
    match err {
        kube::Error::Api(ref response) if response.reason == "AlreadyExists" => {
            Error::AlreadyExists {
                kind: CLAIM_KIND.to_string(),
                name: name.to_string(),
            }
        }
        other => Error::Orchestration(other),
    }
}

// =============================================================================
// Volume Claim Client
// =============================================================================

/// [`VolumeClaimClient`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeClaimClient {
    client: Client,
}

impl KubeClaimClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn claims(&self, namespace: &str) -> Api<PersistentVolumeClaim> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl VolumeClaimClient for KubeClaimClient {
    async fn create_volume_claim(
        &self,
        namespace: &str,
        claim: &PersistentVolumeClaim,
    ) -> Result<()> {
        let name = claim.metadata.name.clone().unwrap_or_default();

        self.claims(namespace)
            .create(&PostParams::default(), claim)
            .await
            .map_err(|e| classify_create_error(e, &name))?;

        Ok(())
    }

    async fn get_volume_claim_if_exists(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<PersistentVolumeClaim>> {
        self.claims(namespace)
            .get_opt(name)
            .await
            .map_err(|source| Error::Lookup {
                name: name.to_string(),
                source,
            })
    }

    async fn delete_volume_claim(&self, name: &str, namespace: &str) -> Result<()> {
        self.claims(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }
}

// =============================================================================
// Pod Executor
// =============================================================================

/// [`PodExecutor`] backed by the pod exec subresource
#[derive(Clone)]
pub struct KubePodExecutor {
    client: Client,
}

impl KubePodExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PodExecutor for KubePodExecutor {
    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        command: &[String],
        stdin: &str,
    ) -> Result<ExecOutput> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);

        let params = exec_params(container);

        info!(%pod, %container, "Exec in pod: {}", command.join(" "));
        let mut attached = pods.exec(pod, command.to_vec(), &params).await?;

        if let Some(mut writer) = attached.stdin() {
            writer.write_all(stdin.as_bytes()).await?;
            writer.shutdown().await?;
        }

        let stdout_reader = attached.stdout();
        let stderr_reader = attached.stderr();
        let (stdout, stderr) = tokio::join!(read_all(stdout_reader), read_all(stderr_reader));
        let output = ExecOutput {
            stdout: stdout?,
            stderr: stderr?,
        };

        let status = match attached.take_status() {
            Some(status) => status.await,
            None => None,
        };
        attached
            .join()
            .await
            .map_err(|e| Error::Exec(format!("exec stream failed: {}", e)))?;

        debug!("exec status: {:?}", status);
        match status {
            Some(status) if status.status.as_deref() != Some("Success") => Err(Error::Exec(
                format!(
                    "{} (stdout=[{}] stderr=[{}])",
                    status.message.unwrap_or_else(|| "command failed".to_string()),
                    output.stdout.trim_end(),
                    output.stderr.trim_end()
                ),
            )),
            _ => Ok(output),
        }
    }
}

async fn read_all<R>(reader: Option<R>) -> Result<String>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
