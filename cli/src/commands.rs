use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use bucketward_core::{
    application::create_service,
    domain::{
        common::{StorageConfig, policies::evaluate},
        policy::{
            entities::SecurityPolicy,
            value_objects::{Decision, OperationRequest},
        },
        storage::{
            services::StorageService,
            value_objects::{
                AccessOptions, PresignedDownloadOptions, PresignedListOptions,
                PresignedUploadOptions, UploadOptions,
            },
        },
    },
};
use bytes::Bytes;
use serde::Serialize;

use crate::args::{
    AclCommand, Args, BucketCommand, Command, PresignCommand, StorageCommand, TargetArgs,
    metadata_map,
};

pub async fn run(args: Args) -> anyhow::Result<()> {
    let Args {
        storage, command, ..
    } = args;

    match command {
        Command::Check {
            operation,
            key,
            role,
            content_type,
            content_length,
        } => {
            let policy = storage.load_policy()?;
            let request = OperationRequest::new(operation, key)
                .with_role(role)
                .with_content_type(content_type)
                .with_content_length(content_length);
            check(policy.as_ref(), request)
        }
        Command::Storage(command) => {
            let config = StorageConfig::try_from(storage)?;
            let service = create_service(config)
                .await
                .context("initializing storage service")?;
            tracing::debug!(command = ?command, "Running command");

            execute(&service, command).await
        }
    }
}

#[derive(Serialize)]
struct CheckReport {
    request: OperationRequest,
    #[serde(flatten)]
    decision: Decision,
}

fn check(policy: Option<&SecurityPolicy>, request: OperationRequest) -> anyhow::Result<()> {
    let (request, decision) = evaluate(policy, request);
    let report = CheckReport { request, decision };
    print_json(&report)?;

    match report.decision {
        Decision::Allow => Ok(()),
        Decision::Deny { reason, .. } => anyhow::bail!("denied: {reason}"),
    }
}

async fn execute<S: StorageService>(service: &S, command: StorageCommand) -> anyhow::Result<()> {
    match command {
        StorageCommand::Upload {
            key,
            file,
            content_type,
            metadata,
            target,
        } => {
            let body = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let uploaded = service
                .upload_file(
                    &key,
                    Bytes::from(body),
                    content_type.as_deref(),
                    UploadOptions {
                        role: target.role,
                        metadata: metadata_map(metadata),
                        bucket: target.bucket,
                    },
                )
                .await?;
            print_json(&uploaded)
        }
        StorageCommand::Download {
            key,
            output,
            target,
        } => {
            let body = service.download_file(&key, access(target)).await?;
            match output {
                Some(path) => tokio::fs::write(&path, &body)
                    .await
                    .with_context(|| format!("writing {}", path.display())),
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&body)?;
                    stdout.flush()?;
                    Ok(())
                }
            }
        }
        StorageCommand::Delete { key, target } => {
            service.delete_file(&key, access(target)).await?;
            Ok(())
        }
        StorageCommand::List { prefix, target } => {
            let entries = service.list_files(prefix.as_deref(), access(target)).await?;
            print_json(&entries)
        }
        StorageCommand::Presign(presign) => {
            let url = match presign {
                PresignCommand::Upload {
                    key,
                    expiry,
                    content_type,
                    max_size,
                    metadata,
                    target,
                } => {
                    service
                        .presigned_upload_url(
                            &key,
                            Duration::from_secs(expiry.seconds),
                            PresignedUploadOptions {
                                content_type,
                                role: target.role,
                                max_size,
                                metadata: metadata_map(metadata),
                                bucket: target.bucket,
                            },
                        )
                        .await?
                }
                PresignCommand::Download {
                    key,
                    expiry,
                    response_content_type,
                    response_content_disposition,
                    target,
                } => {
                    service
                        .presigned_download_url(
                            &key,
                            Duration::from_secs(expiry.seconds),
                            PresignedDownloadOptions {
                                role: target.role,
                                response_content_type,
                                response_content_disposition,
                                bucket: target.bucket,
                            },
                        )
                        .await?
                }
                PresignCommand::Delete {
                    key,
                    expiry,
                    target,
                } => {
                    service
                        .presigned_delete_url(
                            &key,
                            Duration::from_secs(expiry.seconds),
                            access(target),
                        )
                        .await?
                }
                PresignCommand::List {
                    prefix,
                    expiry,
                    max_keys,
                    delimiter,
                    target,
                } => {
                    service
                        .presigned_list_url(
                            prefix.as_deref(),
                            Duration::from_secs(expiry.seconds),
                            PresignedListOptions {
                                role: target.role,
                                max_keys,
                                delimiter,
                                bucket: target.bucket,
                            },
                        )
                        .await?
                }
                PresignCommand::Acl {
                    key,
                    acl,
                    expiry,
                    target,
                } => {
                    service
                        .presigned_acl_url(
                            &key,
                            acl,
                            Duration::from_secs(expiry.seconds),
                            access(target),
                        )
                        .await?
                }
            };
            print_json(&url)
        }
        StorageCommand::Acl(AclCommand::Get { key, target }) => {
            let grants = service.file_permissions(&key, access(target)).await?;
            print_json(&grants)
        }
        StorageCommand::Acl(AclCommand::Set { key, acl, target }) => {
            service
                .update_file_permissions(&key, acl, access(target))
                .await?;
            Ok(())
        }
        StorageCommand::Bucket(BucketCommand::Check { bucket }) => {
            let exists = service.check_bucket(bucket.as_deref()).await?;
            print_json(&serde_json::json!({ "exists": exists }))
        }
        StorageCommand::Bucket(BucketCommand::Create { bucket }) => {
            service.create_bucket(bucket.as_deref()).await?;
            Ok(())
        }
        StorageCommand::Bucket(BucketCommand::Delete { bucket }) => {
            service.delete_bucket(bucket.as_deref()).await?;
            Ok(())
        }
    }
}

fn access(target: TargetArgs) -> AccessOptions {
    AccessOptions {
        role: target.role,
        bucket: target.bucket,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
