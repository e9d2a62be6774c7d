//! pgBackRest command composition.

use crate::error::{Error, Result};
use std::str::FromStr;

const BACKREST_COMMAND: &str = "pgbackrest";
const REPO_TYPE_FLAG_S3: &str = "--repo-type=s3";

/// Task name requesting `pgbackrest stanza-create`
pub const TASK_BACKREST_STANZA_CREATE: &str = "backrest-stanza-create";
/// Task name requesting `pgbackrest info`
pub const TASK_BACKREST_INFO: &str = "backrest-info";
/// Task name requesting `pgbackrest backup`
pub const TASK_BACKREST_BACKUP: &str = "backrest-backup";

/// Supported pgBackRest subcommands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackrestCommand {
    StanzaCreate,
    Info,
    Backup,
}

impl BackrestCommand {
    /// pgBackRest subcommand name
    pub fn subcommand(&self) -> &'static str {
        match self {
            BackrestCommand::StanzaCreate => "stanza-create",
            BackrestCommand::Info => "info",
            BackrestCommand::Backup => "backup",
        }
    }
}

impl FromStr for BackrestCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            TASK_BACKREST_STANZA_CREATE => Ok(BackrestCommand::StanzaCreate),
            TASK_BACKREST_INFO => Ok(BackrestCommand::Info),
            TASK_BACKREST_BACKUP => Ok(BackrestCommand::Backup),
            other => Err(Error::UnsupportedBackupCommand(other.to_string())),
        }
    }
}

impl std::fmt::Display for BackrestCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.subcommand())
    }
}

/// Everything needed to run one pgBackRest command in a database pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackrestRequest {
    pub namespace: String,
    pub pod: String,
    pub command: BackrestCommand,
    /// Extra options passed through verbatim
    pub command_opts: String,
    /// Repository type, `s3` adds the S3 flag
    pub repo_type: String,
    /// Run against both the local and the S3 repository
    pub local_s3_storage: bool,
}

impl BackrestRequest {
    /// Shell command line to run
    pub fn compose(&self) -> String {
        let mut base = vec![BACKREST_COMMAND, self.command.subcommand()];
        if !self.command_opts.is_empty() {
            base.push(&self.command_opts);
        }
        let base = base.join(" ");

        if self.local_s3_storage {
            format!("{} && {} {}", base, base, REPO_TYPE_FLAG_S3)
        } else if self.repo_type == "s3" {
            format!("{} {}", base, REPO_TYPE_FLAG_S3)
        } else {
            base
        }
    }
}
