//! Integration tests for the identity resolver cache
//!
//! Run against the in-memory management plane in `common`, with tokio's
//! paused clock so slow lookups cost no wall time.

mod common;

use common::{listed, not_found, vault_id, FakeVaults};
use keyvault_lifecycle::cache::IdentityResolver;
use keyvault_lifecycle::provider::ApiError;
use keyvault_lifecycle::{Error, Phase};
use std::sync::Arc;
use std::time::Duration;

fn resolver(fake: &Arc<FakeVaults>) -> Arc<IdentityResolver> {
    Arc::new(IdentityResolver::new(Arc::<FakeVaults>::clone(fake)))
}

#[tokio::test]
async fn test_second_resolution_is_served_from_cache() {
    let fake = Arc::new(FakeVaults::new());
    let id = vault_id("kv1");
    fake.add_vault(&id, Some("https://kv1.vault.example.net"));
    let resolver = resolver(&fake);

    let first = resolver.base_uri_for_vault(&id).await.unwrap();
    let second = resolver.base_uri_for_vault(&id).await.unwrap();

    assert_eq!(first, "https://kv1.vault.example.net/");
    assert_eq!(second, first);
    assert_eq!(fake.get_calls(), 1);
}

#[tokio::test]
async fn test_cache_key_ignores_name_case() {
    let fake = Arc::new(FakeVaults::new());
    fake.add_vault(&vault_id("kv1"), Some("https://kv1.vault.example.net/"));
    let resolver = resolver(&fake);

    resolver.base_uri_for_vault(&vault_id("kv1")).await.unwrap();
    let upper = resolver.base_uri_for_vault(&vault_id("KV1")).await.unwrap();

    assert_eq!(upper, "https://kv1.vault.example.net/");
    assert_eq!(fake.get_calls(), 1);
    assert_eq!(
        resolver.cached_base_uri("Kv1").as_deref(),
        Some("https://kv1.vault.example.net/")
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_resolutions_share_one_lookup() {
    let fake = Arc::new(FakeVaults::new());
    let id = vault_id("kv1");
    fake.add_vault(&id, Some("https://kv1.vault.azure.net/"));
    fake.set_get_delay(Duration::from_secs(2));
    let resolver = resolver(&fake);

    let tasks = (0..10).map(|_| {
        let resolver = Arc::clone(&resolver);
        let id = id.clone();
        tokio::spawn(async move { resolver.base_uri_for_vault(&id).await })
    });
    let results = futures::future::join_all(tasks).await;

    for result in results {
        assert_eq!(result.unwrap().unwrap(), "https://kv1.vault.azure.net/");
    }
    assert_eq!(fake.get_calls(), 1);
    assert_eq!(resolver.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_lookup_does_not_block_other_names() {
    let fake = Arc::new(FakeVaults::new());
    let slow = vault_id("slow");
    let fast = vault_id("fast");
    fake.add_vault(&slow, Some("https://slow.vault.azure.net/"));
    fake.add_vault(&fast, Some("https://fast.vault.azure.net/"));
    let gate = fake.gate("slow");
    let resolver = resolver(&fake);

    let pending = {
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move { resolver.base_uri_for_vault(&slow).await })
    };
    while fake.get_calls() == 0 {
        tokio::task::yield_now().await;
    }

    let fast_uri = tokio::time::timeout(
        Duration::from_secs(1),
        resolver.base_uri_for_vault(&fast),
    )
    .await
    .expect("resolving another name must not wait on the slow lookup")
    .unwrap();
    assert_eq!(fast_uri, "https://fast.vault.azure.net/");
    assert!(!pending.is_finished());

    gate.notify_one();
    assert_eq!(
        pending.await.unwrap().unwrap(),
        "https://slow.vault.azure.net/"
    );
}

#[tokio::test(start_paused = true)]
async fn test_name_lock_holds_back_resolution_of_that_name() {
    let fake = Arc::new(FakeVaults::new());
    let kv1 = vault_id("kv1");
    let kv2 = vault_id("kv2");
    fake.add_vault(&kv1, Some("https://kv1.vault.azure.net/"));
    fake.add_vault(&kv2, Some("https://kv2.vault.azure.net/"));
    let resolver = resolver(&fake);
    let held = resolver.lock_name("KV1").await;

    let pending = {
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move { resolver.base_uri_for_vault(&kv1).await })
    };
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!pending.is_finished());

    let other = tokio::time::timeout(Duration::from_secs(1), resolver.base_uri_for_vault(&kv2))
        .await
        .expect("another name's lock is independent")
        .unwrap();
    assert_eq!(other, "https://kv2.vault.azure.net/");
    assert_eq!(fake.get_calls(), 1);

    drop(held);
    assert_eq!(
        pending.await.unwrap().unwrap(),
        "https://kv1.vault.azure.net/"
    );
}

#[tokio::test]
async fn test_invalidate_forces_fresh_lookup() {
    let fake = Arc::new(FakeVaults::new());
    let id = vault_id("kv1");
    fake.add_vault(&id, Some("https://kv1.vault.azure.net/"));
    let resolver = resolver(&fake);

    resolver.base_uri_for_vault(&id).await.unwrap();
    resolver.invalidate("KV1");
    assert!(resolver.cached_base_uri("kv1").is_none());

    fake.add_vault(&id, Some("https://kv1-new.vault.azure.net/"));
    let uri = resolver.base_uri_for_vault(&id).await.unwrap();

    assert_eq!(uri, "https://kv1-new.vault.azure.net/");
    assert_eq!(fake.get_calls(), 2);
}

#[tokio::test]
async fn test_not_found_is_not_cached() {
    let fake = Arc::new(FakeVaults::new());
    let id = vault_id("missing");
    let resolver = resolver(&fake);

    for _ in 0..2 {
        let err = resolver.base_uri_for_vault(&id).await.unwrap_err();
        assert!(
            matches!(err, Error::NotFound { phase: Phase::Resolve, .. }),
            "unexpected error: {err:?}"
        );
    }
    assert_eq!(fake.get_calls(), 2);
    assert!(resolver.is_empty());

    fake.add_vault(&id, Some("https://missing.vault.azure.net/"));
    assert_eq!(
        resolver.base_uri_for_vault(&id).await.unwrap(),
        "https://missing.vault.azure.net/"
    );
}

#[tokio::test]
async fn test_vault_without_uri_is_malformed_and_not_cached() {
    let fake = Arc::new(FakeVaults::new());
    let id = vault_id("kv1");
    fake.add_vault(&id, None);
    let resolver = resolver(&fake);

    let err = resolver.base_uri_for_vault(&id).await.unwrap_err();

    assert!(matches!(
        err,
        Error::MalformedResponse {
            field: "properties.vaultUri",
            ..
        }
    ));
    assert!(resolver.is_empty());
}

#[tokio::test]
async fn test_remote_failure_names_resolve_phase() {
    let fake = Arc::new(FakeVaults::new());
    let id = vault_id("kv1");
    fake.fail_get(
        "kv1",
        ApiError::new(Some(500), Some("InternalError".to_string()), "boom"),
    );
    let resolver = resolver(&fake);

    let err = resolver.base_uri_for_vault(&id).await.unwrap_err();

    match err {
        Error::Remote {
            phase, source, ..
        } => {
            assert_eq!(phase, Phase::Resolve);
            assert_eq!(source.status, Some(500));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(resolver.is_empty());
}

#[tokio::test]
async fn test_reverse_lookup_follows_next_link() {
    let fake = Arc::new(FakeVaults::new());
    let id = vault_id("kv1");
    fake.add_vault(&id, Some("https://kv1.vault.azure.net/"));
    fake.set_pages(vec![vec![], vec![], vec![listed(&id)]]);
    let resolver = resolver(&fake);

    let found = resolver
        .vault_id_from_base_url("sub", "https://KV1.vault.azure.net/")
        .await
        .unwrap();

    assert_eq!(found, Some(id.clone()));
    assert_eq!(fake.list_calls(), 3);
    assert_eq!(
        resolver.cached_base_uri("kv1").as_deref(),
        Some("https://kv1.vault.azure.net/")
    );

    // Both directions are now answered from the cache
    let again = resolver
        .vault_id_from_base_url("sub", "https://kv1.vault.azure.net")
        .await
        .unwrap();
    assert_eq!(again, Some(id.clone()));
    resolver.base_uri_for_vault(&id).await.unwrap();
    assert_eq!(fake.list_calls(), 3);
    assert_eq!(fake.get_calls(), 1);
}

#[tokio::test]
async fn test_reverse_lookup_exhausted_is_none() {
    let fake = Arc::new(FakeVaults::new());
    let other = vault_id("other");
    fake.set_pages(vec![vec![listed(&other)], vec![]]);
    let resolver = resolver(&fake);

    let found = resolver
        .vault_id_from_base_url("sub", "https://kv1.vault.azure.net/")
        .await
        .unwrap();

    assert_eq!(found, None);
    assert_eq!(fake.list_calls(), 2);
    assert!(resolver.is_empty());
}

#[tokio::test]
async fn test_reverse_lookup_rejects_url_without_host() {
    let resolver = resolver(&Arc::new(FakeVaults::new()));

    let err = resolver
        .vault_id_from_base_url("sub", "not a url")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidId { .. }));
}

#[tokio::test]
async fn test_register_warms_cache() {
    let fake = Arc::new(FakeVaults::new());
    let id = vault_id("kv1");
    let resolver = resolver(&fake);

    resolver.register(&id, "https://kv1.vault.azure.net");
    let uri = resolver.base_uri_for_vault(&id).await.unwrap();

    assert_eq!(uri, "https://kv1.vault.azure.net/");
    assert_eq!(fake.get_calls(), 0);
    assert_eq!(resolver.cached_entry("kv1").unwrap().vault_id, id);
}

#[tokio::test]
async fn test_exists() {
    let fake = Arc::new(FakeVaults::new());
    let present = vault_id("present");
    let no_uri = vault_id("nouri");
    fake.add_vault(&present, Some("https://present.vault.azure.net/"));
    fake.add_vault(&no_uri, None);
    let resolver = resolver(&fake);

    assert!(resolver.exists(&present).await.unwrap());
    assert!(resolver.exists(&present).await.unwrap());
    assert_eq!(fake.get_calls(), 1);

    assert!(resolver.exists(&no_uri).await.unwrap());
    assert!(!resolver.exists(&vault_id("absent")).await.unwrap());

    fake.fail_get("broken", not_found("gone"));
    assert!(!resolver.exists(&vault_id("broken")).await.unwrap());
}
