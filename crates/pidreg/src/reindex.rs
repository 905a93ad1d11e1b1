//! Module: reindex
//! Responsibility: rebuilding the search index from the repository in
//! fixed windows, falling back to per-record indexing on bulk failures.

use crate::{projection::Projector, repository::IdentifierRepository};
use pidreg_core::{REINDEX_BATCH_SIZE, error::RegistryError, model::IdentifierDocument, search::SearchBackend};

///
/// ReindexReport
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReindexReport {
    pub batches: usize,
    pub indexed: usize,
    /// Uids that could not be indexed even one at a time.
    pub failed: Vec<String>,
}

///
/// Reindexer
///

pub struct Reindexer<'a> {
    repository: &'a dyn IdentifierRepository,
    backend: &'a dyn SearchBackend,
    projector: &'a Projector,
    batch_size: usize,
}

impl<'a> Reindexer<'a> {
    #[must_use]
    pub fn new(repository: &'a dyn IdentifierRepository, backend: &'a dyn SearchBackend, projector: &'a Projector) -> Self {
        Self {
            repository,
            backend,
            projector,
            batch_size: REINDEX_BATCH_SIZE,
        }
    }

    #[must_use]
    pub const fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = if batch_size == 0 { 1 } else { batch_size };
        self
    }

    /// Walk the repository in uid order. Repository failures abort the run;
    /// index failures are counted and the walk continues.
    pub async fn run(&self) -> Result<ReindexReport, RegistryError> {
        let mut report = ReindexReport::default();
        let mut after: Option<String> = None;

        loop {
            let window = self.repository.scan(after.as_deref(), self.batch_size).await?;
            let Some(last) = window.last() else {
                break;
            };
            after = Some(last.uid());

            let documents: Vec<IdentifierDocument> =
                window.iter().map(|identifier| self.projector.project(identifier)).collect();
            self.index_batch(&documents, &mut report).await;
            report.batches += 1;

            if window.len() < self.batch_size {
                break;
            }
        }

        tracing::info!(
            target: "pidreg::reindex",
            batches = report.batches,
            indexed = report.indexed,
            failed = report.failed.len(),
            "reindex finished"
        );

        Ok(report)
    }

    async fn index_batch(&self, documents: &[IdentifierDocument], report: &mut ReindexReport) {
        let retry: Vec<&IdentifierDocument> = match self.backend.bulk_index(documents).await {
            Ok(outcome) if outcome.is_complete() => {
                report.indexed += outcome.indexed;
                return;
            }
            Ok(outcome) => {
                report.indexed += outcome.indexed;
                documents
                    .iter()
                    .filter(|document| outcome.failed.contains(&document.uid))
                    .collect()
            }
            Err(err) => {
                tracing::warn!(
                    target: "pidreg::reindex",
                    size = documents.len(),
                    error = %err.display_with_class(),
                    "bulk index failed, indexing one at a time"
                );
                documents.iter().collect()
            }
        };

        for document in retry {
            match self.backend.index(document).await {
                Ok(()) => report.indexed += 1,
                Err(err) => {
                    tracing::warn!(
                        target: "pidreg::reindex",
                        uid = %document.uid,
                        error = %err.display_with_class(),
                        "document not indexed"
                    );
                    report.failed.push(document.uid.clone());
                }
            }
        }
    }
}
