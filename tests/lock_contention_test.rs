mod common;

use common::{lock_settings, random_resource};
use payment_commons::application::lock::{AsyncExclusiveLock, ExclusiveLock, LockState};
use payment_commons::domain::ports::{SharedAsyncBackend, SharedBackend};
use payment_commons::error::LockError;
use payment_commons::infrastructure::in_memory::InMemoryBackend;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const CONTENDERS: usize = 16;
const LEASE: Duration = Duration::from_secs(5);

#[test]
fn test_threads_race_exactly_one_winner() {
    let backend: SharedBackend = Arc::new(InMemoryBackend::new());
    let resource = random_resource("txn");
    let barrier = Arc::new(Barrier::new(CONTENDERS));

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|i| {
            let lock = ExclusiveLock::new(Arc::clone(&backend), lock_settings());
            let barrier = Arc::clone(&barrier);
            let resource = resource.clone();
            thread::spawn(move || {
                let holder = format!("proc{i}");
                barrier.wait();
                lock.acquire(&resource, &holder, LEASE)
                    .unwrap()
                    .then_some(holder)
            })
        })
        .collect();

    let winners: Vec<String> = handles
        .into_iter()
        .filter_map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(winners.len(), 1);
    let lock = ExclusiveLock::new(backend, lock_settings());
    assert_eq!(lock.holder(&resource).unwrap(), Some(winners[0].clone()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tasks_race_exactly_one_winner() {
    let backend: SharedAsyncBackend = Arc::new(InMemoryBackend::new());
    let lock = AsyncExclusiveLock::new(backend, lock_settings());
    let resource = random_resource("txn");

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|i| {
            let lock = lock.clone();
            let resource = resource.clone();
            tokio::spawn(async move { lock.acquire(&resource, &format!("task{i}"), LEASE).await })
        })
        .collect();

    let mut acquired = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            acquired += 1;
        }
    }
    assert_eq!(acquired, 1);
}

#[test]
fn test_same_instant_acquire_keeps_first_record() {
    let backend: SharedBackend = Arc::new(InMemoryBackend::new());
    let proc_a = ExclusiveLock::new(Arc::clone(&backend), lock_settings());
    let proc_b = ExclusiveLock::new(backend, lock_settings());

    assert!(proc_a.acquire("txn-42", "procA", LEASE).unwrap());
    let before = proc_a.state("txn-42").unwrap();

    assert!(!proc_b.acquire("txn-42", "procB", LEASE).unwrap());
    assert_eq!(proc_b.state("txn-42").unwrap(), before);
    assert_eq!(before.holder(), Some("procA"));
}

#[test]
fn test_expired_holder_cannot_release_new_owner() {
    let backend: SharedBackend = Arc::new(InMemoryBackend::new());
    let proc_a = ExclusiveLock::new(Arc::clone(&backend), lock_settings());
    let proc_b = ExclusiveLock::new(backend, lock_settings());

    assert!(proc_a.acquire("txn-42", "procA", Duration::from_secs(1)).unwrap());
    thread::sleep(Duration::from_millis(1100));
    assert!(proc_b.acquire("txn-42", "procB", LEASE).unwrap());

    let err = proc_a.release("txn-42", "procA").unwrap_err();
    assert!(matches!(
        err,
        LockError::NotOwner { ref current_holder, .. } if current_holder.as_deref() == Some("procB")
    ));
    assert!(matches!(
        proc_b.state("txn-42").unwrap(),
        LockState::Locked { ref holder, .. } if holder == "procB"
    ));
}

#[test]
fn test_crashed_holder_heals_after_lease() {
    let backend: SharedBackend = Arc::new(InMemoryBackend::new());
    let lock = ExclusiveLock::new(backend, lock_settings());
    let resource = random_resource("order");

    assert!(lock.acquire(&resource, "crashed", Duration::from_secs(1)).unwrap());
    assert!(!lock.acquire(&resource, "survivor", LEASE).unwrap());

    thread::sleep(Duration::from_millis(1100));

    assert_eq!(lock.state(&resource).unwrap(), LockState::Unlocked);
    assert!(lock.acquire(&resource, "survivor", LEASE).unwrap());
}
