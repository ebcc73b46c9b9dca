use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use bucketward_core::domain::{
    common::{DEFAULT_REGION, StaticCredentials, StorageConfig},
    policy::entities::{OperationKind, SecurityPolicy},
    storage::value_objects::ObjectAcl,
};
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "bucketward", version, about = "Policy-gated object storage client")]
pub struct Args {
    #[command(flatten)]
    pub storage: StorageArgs,

    #[command(flatten)]
    pub log: LogArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, clap::Args)]
pub struct StorageArgs {
    #[arg(long, env = "BUCKETWARD_REGION", default_value = DEFAULT_REGION)]
    pub region: String,

    /// Default bucket for every command
    #[arg(long = "default-bucket", env = "BUCKETWARD_BUCKET")]
    pub default_bucket: Option<String>,

    /// Custom endpoint, e.g. a MinIO server
    #[arg(long, env = "BUCKETWARD_ENDPOINT")]
    pub endpoint: Option<String>,

    #[arg(long, env = "BUCKETWARD_ACCESS_KEY")]
    pub access_key: Option<String>,

    #[arg(long, env = "BUCKETWARD_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    #[arg(long, env = "BUCKETWARD_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,

    #[arg(long, env = "BUCKETWARD_FORCE_PATH_STYLE")]
    pub force_path_style: bool,

    /// JSON security policy document
    #[arg(long, env = "BUCKETWARD_POLICY")]
    pub policy: Option<PathBuf>,
}

impl StorageArgs {
    pub fn load_policy(&self) -> anyhow::Result<Option<SecurityPolicy>> {
        self.policy
            .as_ref()
            .map(|path| {
                SecurityPolicy::from_json_file(path)
                    .with_context(|| format!("loading security policy from {}", path.display()))
            })
            .transpose()
    }
}

impl TryFrom<StorageArgs> for StorageConfig {
    type Error = anyhow::Error;

    fn try_from(args: StorageArgs) -> Result<Self, Self::Error> {
        let security = args.load_policy()?;
        let default_bucket = args
            .default_bucket
            .filter(|bucket| !bucket.is_empty())
            .context("a default bucket is required (--default-bucket or BUCKETWARD_BUCKET)")?;

        let credentials = match (args.access_key, args.secret_key) {
            (Some(access_key), Some(secret_key)) => Some(StaticCredentials {
                access_key,
                secret_key,
                session_token: args.session_token,
            }),
            (None, None) => None,
            _ => anyhow::bail!("--access-key and --secret-key must be given together"),
        };

        Ok(StorageConfig {
            region: args.region,
            credentials,
            default_bucket,
            endpoint: args.endpoint,
            force_path_style: args.force_path_style,
            security,
        })
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct LogArgs {
    /// Emit logs as JSON lines
    #[arg(long, env = "BUCKETWARD_LOG_JSON")]
    pub log_json: bool,
}

/// Caller role and bucket override shared by object commands.
#[derive(Debug, Clone, clap::Args)]
pub struct TargetArgs {
    #[arg(long)]
    pub role: Option<String>,

    #[arg(long)]
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Evaluate the policy for a request without contacting the store
    Check {
        operation: OperationKind,
        key: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long)]
        content_length: Option<u64>,
    },
    #[command(flatten)]
    Storage(StorageCommand),
}

/// Commands that talk to the object store.
#[derive(Debug, Clone, Subcommand)]
pub enum StorageCommand {
    /// Upload a local file
    Upload {
        key: String,
        file: PathBuf,
        #[arg(long)]
        content_type: Option<String>,
        /// Metadata entry, repeatable
        #[arg(long = "meta", value_parser = parse_key_val)]
        metadata: Vec<(String, String)>,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Download an object to a file, or stdout
    Download {
        key: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[command(flatten)]
        target: TargetArgs,
    },
    Delete {
        key: String,
        #[command(flatten)]
        target: TargetArgs,
    },
    List {
        prefix: Option<String>,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Issue a presigned URL
    #[command(subcommand)]
    Presign(PresignCommand),
    #[command(subcommand)]
    Acl(AclCommand),
    #[command(subcommand)]
    Bucket(BucketCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum PresignCommand {
    Upload {
        key: String,
        #[command(flatten)]
        expiry: ExpiryArgs,
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long)]
        max_size: Option<u64>,
        #[arg(long = "meta", value_parser = parse_key_val)]
        metadata: Vec<(String, String)>,
        #[command(flatten)]
        target: TargetArgs,
    },
    Download {
        key: String,
        #[command(flatten)]
        expiry: ExpiryArgs,
        #[arg(long)]
        response_content_type: Option<String>,
        #[arg(long)]
        response_content_disposition: Option<String>,
        #[command(flatten)]
        target: TargetArgs,
    },
    Delete {
        key: String,
        #[command(flatten)]
        expiry: ExpiryArgs,
        #[command(flatten)]
        target: TargetArgs,
    },
    List {
        prefix: Option<String>,
        #[command(flatten)]
        expiry: ExpiryArgs,
        #[arg(long)]
        max_keys: Option<i32>,
        #[arg(long)]
        delimiter: Option<String>,
        #[command(flatten)]
        target: TargetArgs,
    },
    Acl {
        key: String,
        acl: ObjectAcl,
        #[command(flatten)]
        expiry: ExpiryArgs,
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Debug, Clone, clap::Args)]
pub struct ExpiryArgs {
    /// URL lifetime in seconds
    #[arg(long = "expires-in", default_value_t = 3600)]
    pub seconds: u64,
}

#[derive(Debug, Clone, Subcommand)]
pub enum AclCommand {
    Get {
        key: String,
        #[command(flatten)]
        target: TargetArgs,
    },
    Set {
        key: String,
        acl: ObjectAcl,
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum BucketCommand {
    Check { bucket: Option<String> },
    Create { bucket: Option<String> },
    Delete { bucket: Option<String> },
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty metadata key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

pub fn metadata_map(entries: Vec<(String, String)>) -> Option<BTreeMap<String, String>> {
    (!entries.is_empty()).then(|| entries.into_iter().collect())
}
