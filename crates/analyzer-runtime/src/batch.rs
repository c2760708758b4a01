//! Parallel batch analysis.
//!
//! Runs the synchronous extraction pipeline for several documents at once on
//! tokio's blocking pool, streaming one [`DocumentOutcome`] per document
//! through an `mpsc` channel as each finishes.

use std::path::PathBuf;
use std::sync::Arc;

use analyzer_core::error::{AnalyzerError, Result};
use analyzer_data::analysis::{analyze_file, AnalysisOptions, AnalysisResult};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

/// Documents analysed at once when no limit is given.
pub const DEFAULT_CONCURRENCY: usize = 4;

// ── Public types ──────────────────────────────────────────────────────────────

/// Result of analysing one document of the batch.
#[derive(Debug)]
pub struct DocumentOutcome {
    /// Position of the document in the submitted list.
    pub index: usize,
    pub path: PathBuf,
    pub result: Result<AnalysisResult>,
}

// ── BatchOrchestrator ─────────────────────────────────────────────────────────

/// Background batch coordinator.
///
/// Call [`BatchOrchestrator::start`] to spawn the work and receive a channel
/// endpoint for [`DocumentOutcome`]s. Outcomes arrive in completion order;
/// use [`collect_ordered`] to get them back in submission order.
pub struct BatchOrchestrator {
    documents: Vec<PathBuf>,
    options: Arc<AnalysisOptions>,
    concurrency: usize,
}

impl BatchOrchestrator {
    /// `concurrency` is clamped to at least one.
    pub fn new(documents: Vec<PathBuf>, options: AnalysisOptions, concurrency: usize) -> Self {
        Self {
            documents,
            options: Arc::new(options),
            concurrency: concurrency.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Start the batch. The channel closes once every document is done.
    pub fn start(self) -> (mpsc::Receiver<DocumentOutcome>, BatchHandle) {
        let (tx, rx) = mpsc::channel(self.concurrency * 2);

        let handle = tokio::spawn(async move {
            self.run(tx).await;
        });

        (rx, BatchHandle { handle })
    }

    // ── Private implementation ────────────────────────────────────────────

    async fn run(self, tx: mpsc::Sender<DocumentOutcome>) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut workers = JoinSet::new();

        for (index, path) in self.documents.into_iter().enumerate() {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            if tx.is_closed() {
                tracing::debug!("batch channel closed; stopping");
                break;
            }
            let options = Arc::clone(&self.options);
            let tx = tx.clone();
            workers.spawn(async move {
                let job_path = path.clone();
                let result = tokio::task::spawn_blocking(move || analyze_file(&job_path, &options))
                    .await
                    .unwrap_or_else(|e| Err(AnalyzerError::Other(e.into())));
                drop(permit);

                match &result {
                    Ok(r) => tracing::info!(
                        path = %path.display(),
                        records = r.records.len(),
                        "document analysed"
                    ),
                    Err(e) => tracing::warn!(path = %path.display(), error = %e, "document failed"),
                }
                if tx.send(DocumentOutcome { index, path, result }).await.is_err() {
                    tracing::debug!("batch receiver dropped");
                }
            });
        }

        while workers.join_next().await.is_some() {}
    }
}

// ── BatchHandle ───────────────────────────────────────────────────────────────

/// A handle to the background batch task.
pub struct BatchHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl BatchHandle {
    /// Stop scheduling new documents. Documents already running on the
    /// blocking pool finish, but their outcomes are dropped.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Drain `rx` and return the outcomes sorted by submission index.
pub async fn collect_ordered(mut rx: mpsc::Receiver<DocumentOutcome>) -> Vec<DocumentOutcome> {
    let mut outcomes = Vec::new();
    while let Some(outcome) = rx.recv().await {
        outcomes.push(outcome);
    }
    outcomes.sort_by_key(|o| o.index);
    outcomes
}

// ── Tests ─────────────────────────────────────────────────────────────────────
