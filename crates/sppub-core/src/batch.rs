//! Batch publishing
//!
//! Every descriptor is published with the same [`CoreOptions`]. Any single
//! failure fails the batch. In parallel mode all in-flight publishes are
//! drained before the first failure (by completion order) is returned.

use crate::error::{PublishError, Result};
use crate::publisher::Publisher;
use crate::types::{BatchSummary, CoreOptions, DispatchMode, FileDescriptor, FileResult};
use futures::stream::{FuturesUnordered, StreamExt};
use std::time::Instant;
use tracing::{error, info};

pub async fn publish_all(
    publisher: &Publisher,
    files: Vec<FileDescriptor>,
    options: &CoreOptions,
    mode: DispatchMode,
) -> Result<BatchSummary> {
    if files.is_empty() {
        error!("{}", PublishError::NoFilesMatched);
        return Err(PublishError::NoFilesMatched);
    }

    let start = Instant::now();
    info!("Publishing {} file(s) ({:?})", files.len(), mode);

    let results = match mode {
        DispatchMode::Sequential => publish_sequential(publisher, &files, options).await?,
        DispatchMode::Parallel => publish_parallel(publisher, &files, options).await?,
    };

    let summary = BatchSummary {
        results,
        duration_ms: start.elapsed().as_millis() as u64,
        mode,
    };
    info!(
        "Batch finished: {} published, {} skipped in {}ms",
        summary.published(),
        summary.skipped(),
        summary.duration_ms
    );
    Ok(summary)
}

async fn publish_sequential(
    publisher: &Publisher,
    files: &[FileDescriptor],
    options: &CoreOptions,
) -> Result<Vec<FileResult>> {
    let mut results = Vec::with_capacity(files.len());
    for file in files {
        let outcome = publisher.publish(file, options).await?;
        results.push(FileResult {
            name: file.name.clone(),
            folder: file.folder.clone(),
            outcome,
        });
    }
    Ok(results)
}

async fn publish_parallel(
    publisher: &Publisher,
    files: &[FileDescriptor],
    options: &CoreOptions,
) -> Result<Vec<FileResult>> {
    let mut pending: FuturesUnordered<_> = files
        .iter()
        .enumerate()
        .map(|(index, file)| async move { (index, file, publisher.publish(file, options).await) })
        .collect();

    let mut settled: Vec<Option<FileResult>> = vec![None; files.len()];
    let mut first_failure: Option<PublishError> = None;

    while let Some((index, file, result)) = pending.next().await {
        match result {
            Ok(outcome) => {
                settled[index] = Some(FileResult {
                    name: file.name.clone(),
                    folder: file.folder.clone(),
                    outcome,
                });
            }
            Err(e) => {
                error!("Publishing '{}' failed: {}", file.display_path(), e);
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
        }
    }

    if let Some(e) = first_failure {
        return Err(e);
    }
    Ok(settled.into_iter().flatten().collect())
}
