//! Breadth-first dependency resolution.
//!
//! Given a transaction (or a set of dependency hashes), walk the input
//! references backwards, downloading every missing ancestor from one peer,
//! then backfill attachments, sort the downloads into dependency order and
//! hand them to the verifier. Only transactions whose entire ancestry
//! verifies are recorded.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use trellis_model::{Hash, LedgerTransaction, SignedTransaction};
use trellis_store::AttachmentStore;

use crate::error::ResolveError;
use crate::fetch::FetchSession;
use crate::topsort::topological_sort;
use crate::verifier::TransactionVerifier;
use crate::ServiceHub;

/// Default cap on the number of transactions downloaded per resolution.
pub const DEFAULT_TRANSACTION_COUNT_LIMIT: usize = 5_000;

/// Drives one resolution against one vending peer.
///
/// Consumes itself on [`resolve_transaction`](Self::resolve_transaction) or
/// [`resolve_hashes`](Self::resolve_hashes): a resolver is built per
/// session, and the session is closed when resolution finishes or fails.
pub struct DependencyResolver<'a, W, R> {
    session: FetchSession<W, R>,
    services: ServiceHub<'a>,
    transaction_count_limit: NonZeroUsize,
    check_signatures: bool,
    verify_target: bool,
}

impl<'a, W: AsyncWrite + Unpin, R: AsyncRead + Unpin> DependencyResolver<'a, W, R> {
    pub fn new(session: FetchSession<W, R>, services: ServiceHub<'a>) -> Self {
        Self {
            session,
            services,
            transaction_count_limit: NonZeroUsize::new(DEFAULT_TRANSACTION_COUNT_LIMIT)
                .expect("default limit is non-zero"),
            check_signatures: true,
            verify_target: true,
        }
    }

    /// Cap the number of transactions downloaded in one resolution.
    pub fn with_transaction_count_limit(mut self, limit: NonZeroUsize) -> Self {
        self.transaction_count_limit = limit;
        self
    }

    /// Skip signature checks. Only for trusted local data, never for
    /// transactions downloaded from a peer.
    pub fn with_check_signatures(mut self, check: bool) -> Self {
        self.check_signatures = check;
        self
    }

    /// Whether to verify the target transaction itself after its
    /// dependencies. The target is never recorded either way; recording it
    /// is the caller's decision once its own protocol completes.
    pub fn with_verify_target(mut self, verify: bool) -> Self {
        self.verify_target = verify;
        self
    }

    /// Resolve and verify the ancestry of `target`, then verify `target`
    /// itself (unless disabled). Ancestors are recorded; the target is not.
    ///
    /// Returns the resolved form of every verified transaction in
    /// dependency order, target last.
    pub async fn resolve_transaction(
        self,
        target: &SignedTransaction,
    ) -> Result<Vec<LedgerTransaction>, ResolveError> {
        if self.check_signatures {
            target.verify_required_signatures()?;
        }
        self.run(target.dependencies(), Some(target)).await
    }

    /// Resolve and verify the transactions named by `hashes` and their
    /// ancestry. All verified transactions are recorded.
    pub async fn resolve_hashes(
        self,
        hashes: Vec<Hash>,
    ) -> Result<Vec<LedgerTransaction>, ResolveError> {
        self.run(hashes, None).await
    }

    async fn run(
        mut self,
        hashes: Vec<Hash>,
        target: Option<&SignedTransaction>,
    ) -> Result<Vec<LedgerTransaction>, ResolveError> {
        let downloaded = self.download_dependencies(hashes).await?;
        debug!(count = downloaded.len(), "dependency download complete");

        self.backfill_attachments(&downloaded, target).await?;
        self.session.end().await?;

        let sorted = topological_sort(downloaded)?;
        let verifier = TransactionVerifier::new(self.services)
            .with_check_signatures(self.check_signatures);
        let mut verified = verifier.verify_and_record(sorted)?;

        if let Some(target) = target {
            if self.verify_target {
                // Ancestors are recorded by now, so the target resolves
                // against the store alone.
                verified.push(verifier.verify_one(target, &HashMap::new())?);
            }
        }
        Ok(verified)
    }

    /// Walk input references breadth-first, downloading unknown
    /// transactions level by level until the frontier is exhausted.
    ///
    /// Requests go to the peer even for hashes that turn out to be on disk,
    /// one level at a time, so the peer learns which ancestors we were
    /// missing. Request-level padding to hide that is a known gap.
    ///
    /// Returns only the transactions actually downloaded, in download
    /// order; ancestors already on disk are already recorded and need no
    /// re-verification.
    async fn download_dependencies(
        &mut self,
        hashes: Vec<Hash>,
    ) -> Result<Vec<SignedTransaction>, ResolveError> {
        let limit = self.transaction_count_limit.get();
        let mut remaining = limit as i64;

        let mut frontier = dedup_ordered(hashes);
        let mut downloaded: Vec<SignedTransaction> = Vec::new();
        let mut resolved: HashSet<Hash> = HashSet::new();

        while !frontier.is_empty() {
            let unresolved: Vec<Hash> = frontier
                .iter()
                .filter(|hash| !resolved.contains(*hash))
                .copied()
                .collect();
            if unresolved.is_empty() {
                break;
            }

            remaining -= unresolved.len() as i64;
            if remaining < 0 {
                return Err(ResolveError::ExcessivelyLargeTransactionGraph { limit });
            }

            debug!(frontier = unresolved.len(), "fetching dependency level");
            let fetched = self
                .session
                .fetch_transactions(&unresolved, self.services.transactions)
                .await?;

            // The next frontier grows only from freshly downloaded
            // transactions: anything on disk was recorded with its whole
            // ancestry, so there is nothing older to find behind it.
            let mut next = Vec::new();
            for stx in fetched.downloaded {
                let id = stx.id();
                if !resolved.insert(id) {
                    return Err(ResolveError::Internal(format!(
                        "transaction {id} downloaded twice"
                    )));
                }
                next.extend(stx.dependencies());
                downloaded.push(stx);
            }
            for stx in fetched.from_disk {
                resolved.insert(stx.id());
            }
            frontier = dedup_ordered(next);
        }
        Ok(downloaded)
    }

    /// Fetch attachments referenced by the downloads (and the target) that
    /// are not yet in the local store. Fetched blobs are imported by the
    /// session as they arrive.
    async fn backfill_attachments(
        &mut self,
        downloaded: &[SignedTransaction],
        target: Option<&SignedTransaction>,
    ) -> Result<(), ResolveError> {
        let mut wanted = Vec::new();
        for stx in downloaded.iter().chain(target) {
            wanted.extend(stx.transaction.attachments.iter().copied());
        }
        let mut missing = Vec::new();
        for hash in dedup_ordered(wanted) {
            if !self.services.attachments.contains(&hash)? {
                missing.push(hash);
            }
        }
        if missing.is_empty() {
            return Ok(());
        }
        debug!(count = missing.len(), "backfilling attachments");
        self.session
            .fetch_attachments(&missing, self.services.attachments)
            .await?;
        Ok(())
    }
}

/// Keep the first occurrence of each hash, preserving order.
fn dedup_ordered(hashes: Vec<Hash>) -> Vec<Hash> {
    let mut seen = HashSet::new();
    hashes.into_iter().filter(|hash| seen.insert(*hash)).collect()
}
