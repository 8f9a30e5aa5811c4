//! Reclamation of expired and implicitly expired leases

mod common;

use chrono::Duration;
use leasehold_core::LockSettings;

use common::{User, at, managers};

#[tokio::test]
async fn test_clean_keeps_only_live_locks() {
    for (backend, manager, clock) in managers(at(2015, 1, 1, 10, 0)).await {
        let user = User { id: 1 };
        // max_age 0 is a lease that is over at creation, not an unbounded one
        let lock_1 = manager.acquire_lock(&user, Some(0)).await.unwrap();
        manager.acquire_lock(&lock_1, Some(1)).await.unwrap();
        let survivor = manager.acquire_lock("nightly", None).await.unwrap();

        clock.set(at(2015, 1, 1, 11, 0));
        let deleted = manager
            .clean_expired_locks(&LockSettings::default())
            .await
            .unwrap();
        assert_eq!(deleted, 2, "{backend}");

        let remaining = manager.store().find_all().await.unwrap();
        assert_eq!(remaining, vec![survivor.record().clone()], "{backend}");
        assert!(manager.get_expired_locks().await.unwrap().is_empty(), "{backend}");
    }
}

#[tokio::test]
async fn test_clean_is_idempotent() {
    for (backend, manager, clock) in managers(at(2015, 1, 1, 10, 0)).await {
        manager.acquire_lock("report", Some(1)).await.unwrap();
        clock.advance(Duration::seconds(1));

        let settings = LockSettings::default();
        let (first, second) = tokio::join!(
            manager.clean_expired_locks(&settings),
            manager.clean_expired_locks(&settings)
        );
        assert_eq!(first.unwrap() + second.unwrap(), 1, "{backend}");
        assert_eq!(manager.clean_expired_locks(&settings).await.unwrap(), 0, "{backend}");
    }
}

#[tokio::test]
async fn test_implicit_cleaning_disabled() {
    for (backend, manager, clock) in managers(at(2017, 1, 1, 0, 0)).await {
        let user = User { id: 1 };
        let lock_to_remain = manager.acquire_lock(&user, None).await.unwrap();

        clock.advance(Duration::days(9600));
        manager
            .clean_expired_locks(&LockSettings::default())
            .await
            .unwrap();

        let remaining = manager.store().find_all().await.unwrap();
        assert_eq!(remaining, vec![lock_to_remain.record().clone()], "{backend}");
    }
}

#[tokio::test]
async fn test_implicit_cleaning_set_to_zero() {
    for (backend, manager, clock) in managers(at(2017, 1, 1, 0, 0)).await {
        let user = User { id: 1 };
        let lock_to_remain = manager.acquire_lock(&user, None).await.unwrap();

        clock.advance(Duration::days(9600));
        manager
            .clean_expired_locks(&LockSettings::with_max_age(0))
            .await
            .unwrap();

        let remaining = manager.store().find_all().await.unwrap();
        assert_eq!(remaining, vec![lock_to_remain.record().clone()], "{backend}");
    }
}

#[tokio::test]
async fn test_implicit_cleaning_set_to_nonzero() {
    for (backend, manager, clock) in managers(at(2017, 1, 1, 0, 0)).await {
        let user = User { id: 1 };
        manager.acquire_lock(&user, None).await.unwrap();

        clock.advance(Duration::seconds(1));
        let deleted = manager
            .clean_expired_locks(&LockSettings::with_max_age(1))
            .await
            .unwrap();

        assert_eq!(deleted, 1, "{backend}");
        assert!(manager.store().find_all().await.unwrap().is_empty(), "{backend}");
    }
}

#[tokio::test]
async fn test_implicit_cleaning_spares_recently_renewed_locks() {
    for (backend, manager, clock) in managers(at(2017, 1, 1, 0, 0)).await {
        let mut renewed = manager.acquire_lock("renewed", None).await.unwrap();
        manager.acquire_lock("idle", None).await.unwrap();
        let bounded = manager.acquire_lock("bounded", Some(86400)).await.unwrap();

        clock.advance(Duration::minutes(50));
        renewed.renew().await.unwrap();
        clock.advance(Duration::minutes(20));

        let deleted = manager
            .clean_expired_locks(&LockSettings::with_max_age(3600))
            .await
            .unwrap();
        assert_eq!(deleted, 1, "{backend}");

        // Locks with their own max_age follow only their own expiry
        assert!(manager.is_locked("renewed").await.unwrap(), "{backend}");
        assert!(manager.is_locked("bounded").await.unwrap(), "{backend}");
        assert!(!manager.is_locked("idle").await.unwrap(), "{backend}");
        assert!(!bounded.is_expired(), "{backend}");
    }
}
