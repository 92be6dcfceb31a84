//! Bounded-parallel scene fan-out with ordered recombination.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

use sclip_models::Scene;

use crate::error::{ExportError, ExportResult};

/// One unit of scene work with its pre-assigned, collision-free scratch
/// slots.
#[derive(Debug, Clone)]
pub struct SceneTask {
    /// Original index in the filtered scene list
    pub index: usize,
    pub scene: Scene,
    /// Slot for the trimmed, audio-stripped source segment
    pub segment: PathBuf,
    /// Slot for the rendered scene
    pub output: PathBuf,
}

/// Render every task concurrently, bounded by `parallelism`, and return
/// the rendered slot paths in original index order.
///
/// Completion order is unconstrained; ordering comes from the slots being
/// assigned before dispatch. The first failure aborts the remaining tasks
/// and surfaces immediately — in-flight sibling results are discarded
/// (already-spawned external processes are not guaranteed to be killed
/// early).
pub async fn run_scene_tasks<F, Fut>(
    tasks: Vec<SceneTask>,
    parallelism: usize,
    render: F,
) -> ExportResult<Vec<PathBuf>>
where
    F: Fn(SceneTask) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ExportResult<()>> + Send + 'static,
{
    if tasks.is_empty() {
        return Err(ExportError::NoScenes);
    }

    let width = parallelism.max(1).min(tasks.len());
    debug!(scenes = tasks.len(), width = width, "Dispatching scene tasks");

    let outputs: Vec<PathBuf> = tasks.iter().map(|t| t.output.clone()).collect();

    let semaphore = Arc::new(Semaphore::new(width));
    let render = Arc::new(render);
    let mut set = JoinSet::new();

    for task in tasks {
        let semaphore = Arc::clone(&semaphore);
        let render = Arc::clone(&render);
        let index = task.index;
        set.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| ExportError::TaskAborted("scheduler shut down".to_string()))?;
            render(task).await.map(|_| index)
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(index)) => {
                debug!(scene = index, "Scene rendered");
            }
            Ok(Err(e)) => {
                error!(error = %e, "Scene task failed, aborting export");
                set.abort_all();
                return Err(e);
            }
            Err(join_err) if join_err.is_cancelled() => {}
            Err(join_err) => {
                set.abort_all();
                return Err(ExportError::TaskAborted(join_err.to_string()));
            }
        }
    }

    Ok(outputs)
}
