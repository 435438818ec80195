//! End-to-end tests over the full wiring: pool, context, provider,
//! manager, repository, and service against the in-memory engine.

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use teller_core::{
    ConnectionProvider, DataAccessError, ErrorKind, ExceptionTranslator, Member, MemberRepository,
    TransactionContext, TransactionDefinition, TransactionManager, TransferService,
};
use teller_driver::{ConnectionPool, MemoryDriver, PoolConfig};

struct Fixture {
    driver: Arc<MemoryDriver>,
    pool: Arc<ConnectionPool>,
    provider: ConnectionProvider,
    manager: TransactionManager,
    service: TransferService,
}

fn fixture() -> Fixture {
    fixture_sized(4, 200)
}

fn fixture_sized(max_size: usize, timeout_ms: u64) -> Fixture {
    let driver = Arc::new(MemoryDriver::new());
    let pool = Arc::new(ConnectionPool::new(
        Box::new(Arc::clone(&driver)),
        PoolConfig::new()
            .max_size(max_size)
            .acquire_timeout(Duration::from_millis(timeout_ms)),
    ));
    let context = Arc::new(TransactionContext::new());
    let provider = ConnectionProvider::new(Arc::clone(&pool), Arc::clone(&context));
    let repository = MemberRepository::new(provider.clone(), ExceptionTranslator::default());
    let manager = TransactionManager::new(Arc::clone(&pool), Arc::clone(&context));
    let service = TransferService::new(
        TransactionManager::new(Arc::clone(&pool), Arc::clone(&context)),
        repository,
    );
    Fixture {
        driver,
        pool,
        provider,
        manager,
        service,
    }
}

fn repository(f: &Fixture) -> MemberRepository {
    MemberRepository::new(f.provider.clone(), ExceptionTranslator::default())
}

#[test]
fn successful_transfer_updates_both_balances() {
    let f = fixture();
    let repository = repository(&f);
    repository.save(&Member::new("memberA", 10_000)).unwrap();
    repository.save(&Member::new("memberB", 10_000)).unwrap();

    f.service.transfer("memberA", "memberB", 2_000).unwrap();

    assert_eq!(repository.find_by_id("memberA").unwrap().money(), 8_000);
    assert_eq!(repository.find_by_id("memberB").unwrap().money(), 12_000);
    // no connection leaked out of the operation
    assert_eq!(f.pool.checked_out(), 0);
}

#[test]
fn failed_transfer_reverts_the_first_update() {
    let f = fixture();
    let repository = repository(&f);
    repository.save(&Member::new("memberA", 10_000)).unwrap();
    repository.save(&Member::new("ex", 10_000)).unwrap();

    let err = f.service.transfer("memberA", "ex", 2_000).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessOperationFailed);

    assert_eq!(repository.find_by_id("memberA").unwrap().money(), 10_000);
    assert_eq!(repository.find_by_id("ex").unwrap().money(), 10_000);
    assert_eq!(f.pool.checked_out(), 0);
}

#[test]
fn leases_inside_a_transaction_share_the_bound_connection() {
    let f = fixture();
    let mut status = f.manager.begin(&TransactionDefinition::new()).unwrap();

    let first = f.provider.get_connection().unwrap();
    assert!(first.is_transactional());
    assert_eq!(first.id(), status.connection_id());
    drop(first);

    let second = f.provider.get_connection().unwrap();
    assert_eq!(second.id(), status.connection_id());
    drop(second);

    f.manager.rollback(&mut status).unwrap();
}

#[test]
fn overlapping_leases_outside_a_transaction_are_distinct() {
    let f = fixture();
    let a = f.provider.get_connection().unwrap();
    let b = f.provider.get_connection().unwrap();
    assert!(!a.is_transactional());
    assert_ne!(a.id(), b.id());
}

#[test]
fn repository_calls_join_a_manually_managed_transaction() {
    let f = fixture();
    let repository = repository(&f);

    let mut status = f.manager.begin(&TransactionDefinition::new()).unwrap();
    repository.save(&Member::new("memberA", 500)).unwrap();
    // visible through the transaction's own connection
    assert_eq!(repository.find_by_id("memberA").unwrap().money(), 500);
    // but not committed yet
    assert_eq!(f.driver.row_count(), 0);

    f.manager.rollback(&mut status).unwrap();
    assert_eq!(f.driver.row_count(), 0);
    assert_eq!(
        repository.find_by_id("memberA").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn concurrent_transfers_run_on_separate_connections() {
    let f = fixture();
    let repository = repository(&f);
    for id in ["a1", "a2", "b1", "b2"] {
        repository.save(&Member::new(id, 10_000)).unwrap();
    }

    let service = Arc::new(f.service);
    let handles: Vec<_> = [("a1", "a2"), ("b1", "b2")]
        .into_iter()
        .map(|(from, to)| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..10 {
                    service.transfer(from, to, 100).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(repository.find_by_id("a1").unwrap().money(), 9_000);
    assert_eq!(repository.find_by_id("a2").unwrap().money(), 11_000);
    assert_eq!(repository.find_by_id("b1").unwrap().money(), 9_000);
    assert_eq!(repository.find_by_id("b2").unwrap().money(), 11_000);
    assert_eq!(f.pool.checked_out(), 0);
}

#[test]
fn transaction_holds_its_connection_until_terminal() {
    let f = fixture_sized(1, 30);
    let repository = repository(&f);

    let mut status = f.manager.begin(&TransactionDefinition::new()).unwrap();
    // the transaction owns the pool's only connection, yet repository
    // calls on this thread still proceed on the bound one
    repository.save(&Member::new("memberA", 1)).unwrap();

    // another thread cannot get a connection while the transaction runs
    let pool = Arc::clone(&f.pool);
    let acquired_elsewhere = thread::spawn(move || pool.acquire().is_ok())
        .join()
        .unwrap();
    assert!(!acquired_elsewhere);

    f.manager.commit(&mut status).unwrap();
    assert_eq!(f.pool.idle_count(), 1);
}

#[test]
fn business_failure_carries_the_original_cause() {
    let f = fixture();
    let err = f.service.transfer("ghost", "nobody", 1).unwrap_err();
    match &err {
        DataAccessError::BusinessOperationFailed { source, .. } => {
            assert_eq!(
                source.as_deref().map(DataAccessError::kind),
                Some(ErrorKind::NotFound)
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}
