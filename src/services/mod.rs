//! Business logic services

pub mod catalog;
pub mod ledger;
pub mod policy;
pub mod reports;
pub mod roster;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{clock::Clock, repository::Repository};

pub use policy::LendingPolicy;

/// Serializes validate-then-mutate sequences against the ledger. Writers hold
/// it exclusively; read models hold it shared so they see a committed state.
pub type LedgerLock = Arc<RwLock<()>>;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub roster: roster::RosterService,
    pub ledger: ledger::LedgerService,
    pub reports: reports::ReportsService,
    pub policy: LendingPolicy,
    pub repository: Repository,
}

impl Services {
    /// Create all services over one backend, clock and policy
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, policy: LendingPolicy) -> Self {
        let lock: LedgerLock = Arc::new(RwLock::new(()));

        Self {
            catalog: catalog::CatalogService::new(repository.clone(), clock.clone(), lock.clone()),
            roster: roster::RosterService::new(
                repository.clone(),
                clock.clone(),
                policy.clone(),
                lock.clone(),
            ),
            ledger: ledger::LedgerService::new(
                repository.clone(),
                clock.clone(),
                policy.clone(),
                lock.clone(),
            ),
            reports: reports::ReportsService::new(repository.clone(), clock, policy.clone(), lock),
            policy,
            repository,
        }
    }
}
