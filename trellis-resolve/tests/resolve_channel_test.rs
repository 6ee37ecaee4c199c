//! End-to-end resolution over the in-memory transport: one vending peer
//! with populated stores, one resolving peer starting from scratch.

mod common;

use std::num::NonZeroUsize;

use trellis_model::{Hash, StateRef};
use trellis_net_sim::ChannelNetwork;
use trellis_resolve::{DependencyResolver, ResolveError};
use trellis_store::{AttachmentStore, TransactionStore};

use common::{issue, signing_key, spend, ResolverNode, VendorNode};

#[tokio::test]
async fn resolves_linear_chain_in_dependency_order() {
    let network = ChannelNetwork::new();
    let vendor = VendorNode::new(1, &network).await;
    let node = ResolverNode::new(2, &network).await;

    let signer = signing_key(10);
    let a = issue(&signer, vec![1]);
    let b = spend(&signer, vec![StateRef::new(a.id(), 0)], vec![2]);
    let c = spend(&signer, vec![StateRef::new(b.id(), 0)], vec![3]);
    let target = spend(&signer, vec![StateRef::new(c.id(), 0)], vec![4]);
    vendor.hold(&[&a, &b, &c]);

    let serving = vendor.spawn_serve();
    let session = node.session(vendor.pubkey).await;
    let verified = DependencyResolver::new(session, node.services())
        .resolve_transaction(&target)
        .await
        .unwrap();

    assert_eq!(
        common::ids(&verified),
        vec![a.id(), b.id(), c.id(), target.id()]
    );
    // Ancestry is recorded, the target is not.
    assert!(node.transactions.contains(&a.id()).unwrap());
    assert!(node.transactions.contains(&b.id()).unwrap());
    assert!(node.transactions.contains(&c.id()).unwrap());
    assert!(!node.transactions.contains(&target.id()).unwrap());

    // The walk went level by level, newest first.
    let stats = serving.await.unwrap().unwrap();
    assert_eq!(stats.transactions_sent, vec![c.id(), b.id(), a.id()]);
    assert_eq!(stats.requests_served, 3);
}

#[tokio::test]
async fn diamond_ancestry_is_fetched_once_per_transaction() {
    let network = ChannelNetwork::new();
    let vendor = VendorNode::new(1, &network).await;
    let node = ResolverNode::new(2, &network).await;

    let signer = signing_key(10);
    let root = issue(&signer, vec![1]);
    // Both branches draw on the same root, so the target's ancestry is a
    // diamond and root is reachable along two paths.
    let left = spend(&signer, vec![StateRef::new(root.id(), 0)], vec![2]);
    let right = spend(&signer, vec![StateRef::new(root.id(), 0)], vec![3]);
    let target = spend(
        &signer,
        vec![StateRef::new(left.id(), 0), StateRef::new(right.id(), 0)],
        vec![4],
    );
    vendor.hold(&[&root, &left, &right]);

    let serving = vendor.spawn_serve();
    let session = node.session(vendor.pubkey).await;
    let verified = DependencyResolver::new(session, node.services())
        .resolve_transaction(&target)
        .await
        .unwrap();

    assert_eq!(verified.len(), 4);
    assert_eq!(verified[0].id, root.id());
    assert_eq!(verified[3].id, target.id());

    // The shared root is downloaded exactly once.
    let stats = serving.await.unwrap().unwrap();
    let mut sent = stats.transactions_sent.clone();
    sent.sort();
    sent.dedup();
    assert_eq!(sent.len(), stats.transactions_sent.len());
    assert_eq!(stats.transactions_sent.len(), 3);
}

#[tokio::test]
async fn locally_known_ancestors_are_not_requested() {
    let network = ChannelNetwork::new();
    let vendor = VendorNode::new(1, &network).await;
    let node = ResolverNode::new(2, &network).await;

    let signer = signing_key(10);
    let a = issue(&signer, vec![1]);
    let b = spend(&signer, vec![StateRef::new(a.id(), 0)], vec![2]);
    let target = spend(&signer, vec![StateRef::new(b.id(), 0)], vec![3]);
    vendor.hold(&[&a, &b]);
    // The resolving node already verified and recorded `a` earlier.
    node.transactions.put(&a).unwrap();

    let serving = vendor.spawn_serve();
    let session = node.session(vendor.pubkey).await;
    let verified = DependencyResolver::new(session, node.services())
        .resolve_transaction(&target)
        .await
        .unwrap();

    // Only the unknown ancestor is re-verified; `a` stays recorded.
    assert_eq!(common::ids(&verified), vec![b.id(), target.id()]);
    assert!(node.transactions.contains(&a.id()).unwrap());

    let stats = serving.await.unwrap().unwrap();
    assert_eq!(stats.transactions_sent, vec![b.id()]);
}

#[tokio::test]
async fn mixed_batch_downloads_only_missing_ancestors() {
    let network = ChannelNetwork::new();
    let vendor = VendorNode::new(1, &network).await;
    let node = ResolverNode::new(2, &network).await;

    let signer = signing_key(10);
    let a = issue(&signer, vec![1]);
    let b = issue(&signer, vec![2]);
    let c = issue(&signer, vec![3]);
    let target = spend(
        &signer,
        vec![
            StateRef::new(a.id(), 0),
            StateRef::new(b.id(), 0),
            StateRef::new(c.id(), 0),
        ],
        vec![4],
    );
    vendor.hold(&[&b, &c]);
    // One of the three dependencies is already recorded locally.
    node.transactions.put(&a).unwrap();

    let serving = vendor.spawn_serve();
    let session = node.session(vendor.pubkey).await;
    let verified = DependencyResolver::new(session, node.services())
        .resolve_transaction(&target)
        .await
        .unwrap();

    assert_eq!(common::ids(&verified), vec![b.id(), c.id(), target.id()]);
    assert!(node.transactions.contains(&a.id()).unwrap());
    assert!(node.transactions.contains(&b.id()).unwrap());
    assert!(node.transactions.contains(&c.id()).unwrap());

    // The two missing hashes went out as a single batch, served in request
    // order; the locally known one was never requested.
    let stats = serving.await.unwrap().unwrap();
    assert_eq!(stats.requests_served, 1);
    assert_eq!(stats.transactions_sent, vec![b.id(), c.id()]);
}

#[tokio::test]
async fn transaction_count_limit_aborts_resolution() {
    let network = ChannelNetwork::new();
    let vendor = VendorNode::new(1, &network).await;
    let node = ResolverNode::new(2, &network).await;

    let signer = signing_key(10);
    let a = issue(&signer, vec![1]);
    let b = spend(&signer, vec![StateRef::new(a.id(), 0)], vec![2]);
    let c = spend(&signer, vec![StateRef::new(b.id(), 0)], vec![3]);
    let target = spend(&signer, vec![StateRef::new(c.id(), 0)], vec![4]);
    vendor.hold(&[&a, &b, &c]);

    let serving = vendor.spawn_serve();
    let session = node.session(vendor.pubkey).await;
    let err = DependencyResolver::new(session, node.services())
        .with_transaction_count_limit(NonZeroUsize::new(2).unwrap())
        .resolve_transaction(&target)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ResolveError::ExcessivelyLargeTransactionGraph { limit: 2 }
    ));
    // Nothing is recorded from an aborted resolution.
    assert!(node.transactions.is_empty());

    // The requester dropped the session; the vendor loop still ends.
    let stats = serving.await.unwrap().unwrap();
    assert_eq!(stats.transactions_sent.len(), 2);
}

#[tokio::test]
async fn unknown_hash_fails_both_sides() {
    let network = ChannelNetwork::new();
    let vendor = VendorNode::new(1, &network).await;
    let node = ResolverNode::new(2, &network).await;

    let signer = signing_key(10);
    let ghost = Hash([0xEE; 32]);
    let target = spend(&signer, vec![StateRef::new(ghost, 0)], vec![1]);

    let serving = vendor.spawn_serve();
    let session = node.session(vendor.pubkey).await;
    let err = DependencyResolver::new(session, node.services())
        .resolve_transaction(&target)
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::HashNotFound(hash) if hash == ghost));
    let vendor_err = serving.await.unwrap().unwrap_err();
    assert!(matches!(vendor_err, ResolveError::HashNotFound(hash) if hash == ghost));
    assert!(node.transactions.is_empty());
}

#[tokio::test]
async fn unsigned_ancestor_aborts_without_recording() {
    let network = ChannelNetwork::new();
    let vendor = VendorNode::new(1, &network).await;
    let node = ResolverNode::new(2, &network).await;

    let signer = signing_key(10);
    let a = issue(&signer, vec![1]);
    // Same body, same id, signatures stripped: the download authenticates
    // (the hash matches) but verification must fail.
    let stripped = trellis_model::SignedTransaction::new(a.transaction.clone(), vec![]);
    let target = spend(&signer, vec![StateRef::new(a.id(), 0)], vec![2]);
    vendor.hold(&[&stripped]);

    let serving = vendor.spawn_serve();
    let session = node.session(vendor.pubkey).await;
    let err = DependencyResolver::new(session, node.services())
        .resolve_transaction(&target)
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::Signatures(_)));
    assert!(node.transactions.is_empty());
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn contract_rejection_keeps_verified_prefix() {
    let network = ChannelNetwork::new();
    let vendor = VendorNode::new(1, &network).await;
    let mut node = ResolverNode::new(2, &network).await;
    node.contracts.register(
        trellis_model::ContractId::new("reject"),
        std::sync::Arc::new(common::RejectAll),
    );

    let signer = signing_key(10);
    let a = issue(&signer, vec![1]);
    let b = common::spend_with_contract(&signer, vec![StateRef::new(a.id(), 0)], vec![2], "reject");
    let target = spend(&signer, vec![StateRef::new(b.id(), 0)], vec![3]);
    vendor.hold(&[&a, &b]);

    let serving = vendor.spawn_serve();
    let session = node.session(vendor.pubkey).await;
    let err = DependencyResolver::new(session, node.services())
        .resolve_transaction(&target)
        .await
        .unwrap_err();

    match err {
        ResolveError::ContractRejected { id, reason, .. } => {
            assert_eq!(id, b.id());
            assert_eq!(reason, "rejected by test contract");
        }
        other => panic!("unexpected error: {other}"),
    }
    // Ancestors verified before the failure stay recorded.
    assert!(node.transactions.contains(&a.id()).unwrap());
    assert!(!node.transactions.contains(&b.id()).unwrap());
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn referenced_attachments_are_backfilled() {
    let network = ChannelNetwork::new();
    let vendor = VendorNode::new(1, &network).await;
    let node = ResolverNode::new(2, &network).await;

    let blob = b"contract code v1".to_vec();
    let attachment = vendor.hold_attachment(&blob);

    let signer = signing_key(10);
    let a = issue(&signer, vec![1]);
    let b = common::spend_with_attachments(
        &signer,
        vec![StateRef::new(a.id(), 0)],
        vec![2],
        vec![attachment],
    );
    let target = spend(&signer, vec![StateRef::new(b.id(), 0)], vec![3]);
    vendor.hold(&[&a, &b]);

    let serving = vendor.spawn_serve();
    let session = node.session(vendor.pubkey).await;
    let verified = DependencyResolver::new(session, node.services())
        .resolve_transaction(&target)
        .await
        .unwrap();

    let resolved_b = verified
        .iter()
        .find(|ltx| ltx.id == b.id())
        .expect("b verified");
    assert_eq!(resolved_b.attachments[0].id, attachment);
    assert_eq!(resolved_b.attachments[0].bytes, blob);
    // The blob is now held locally for future resolutions.
    assert_eq!(node.attachments.open(&attachment).unwrap(), Some(blob));

    let stats = serving.await.unwrap().unwrap();
    assert_eq!(stats.attachments_sent, vec![attachment]);
}

#[tokio::test]
async fn resolve_hashes_records_everything_named() {
    let network = ChannelNetwork::new();
    let vendor = VendorNode::new(1, &network).await;
    let node = ResolverNode::new(2, &network).await;

    let signer = signing_key(10);
    let a = issue(&signer, vec![1]);
    let b = spend(&signer, vec![StateRef::new(a.id(), 0)], vec![2]);
    let c = spend(&signer, vec![StateRef::new(b.id(), 0)], vec![3]);
    vendor.hold(&[&a, &b, &c]);

    let serving = vendor.spawn_serve();
    let session = node.session(vendor.pubkey).await;
    let verified = DependencyResolver::new(session, node.services())
        .resolve_hashes(vec![c.id()])
        .await
        .unwrap();

    assert_eq!(common::ids(&verified), vec![a.id(), b.id(), c.id()]);
    assert!(node.transactions.contains(&c.id()).unwrap());
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn invalid_target_fails_before_any_download() {
    let network = ChannelNetwork::new();
    let vendor = VendorNode::new(1, &network).await;
    let node = ResolverNode::new(2, &network).await;

    let signer = signing_key(10);
    let a = issue(&signer, vec![1]);
    let signed = spend(&signer, vec![StateRef::new(a.id(), 0)], vec![2]);
    let unsigned = trellis_model::SignedTransaction::new(signed.transaction.clone(), vec![]);
    vendor.hold(&[&a]);

    let serving = vendor.spawn_serve();
    let session = node.session(vendor.pubkey).await;
    let err = DependencyResolver::new(session, node.services())
        .resolve_transaction(&unsigned)
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::Signatures(_)));
    let stats = serving.await.unwrap().unwrap();
    assert_eq!(stats.requests_served, 0);
}
