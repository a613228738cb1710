//! Member roster service

use std::sync::Arc;

use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{report::MemberFines, Member, MemberData, MemberStatus, NewMember},
    repository::Repository,
};

use super::{policy::outstanding_fines, LedgerLock, LendingPolicy};

#[derive(Clone)]
pub struct RosterService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    policy: LendingPolicy,
    lock: LedgerLock,
}

impl RosterService {
    pub fn new(
        repository: Repository,
        clock: Arc<dyn Clock>,
        policy: LendingPolicy,
        lock: LedgerLock,
    ) -> Self {
        Self {
            repository,
            clock,
            policy,
            lock,
        }
    }

    pub async fn list_members(&self) -> AppResult<Vec<Member>> {
        let _read = self.lock.read().await;
        self.repository.list_members().await
    }

    /// Active members ordered by name
    pub async fn list_active(&self) -> AppResult<Vec<Member>> {
        let _read = self.lock.read().await;
        let mut members: Vec<Member> = self
            .repository
            .list_members()
            .await?
            .into_iter()
            .filter(|m| m.status == MemberStatus::Active)
            .collect();
        members.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(members)
    }

    pub async fn get_member(&self, id: i32) -> AppResult<Member> {
        let _read = self.lock.read().await;
        self.fetch(id).await
    }

    /// Register a new member; they join today as ACTIVE
    pub async fn add_member(&self, member: MemberData) -> AppResult<Member> {
        let member = member.normalized();
        member.validate()?;

        let _write = self.lock.write().await;
        if self.repository.find_member_by_email(&member.email).await?.is_some() {
            return Err(AppError::DuplicateMemberEmail(member.email));
        }

        let created = self
            .repository
            .insert_member(&NewMember {
                data: member,
                join_date: self.clock.today(),
                status: MemberStatus::Active,
            })
            .await?;
        tracing::info!(member_id = created.id, "Member registered");
        Ok(created)
    }

    pub async fn update_member(&self, id: i32, member: MemberData) -> AppResult<Member> {
        let member = member.normalized();
        member.validate()?;

        let _write = self.lock.write().await;
        if let Some(existing) = self.repository.find_member_by_email(&member.email).await? {
            if existing.id != id {
                return Err(AppError::DuplicateMemberEmail(member.email));
            }
        }

        let updated = self
            .repository
            .update_member(id, &member)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))?;
        tracing::info!(member_id = id, status = %updated.status, "Member updated");
        Ok(updated)
    }

    /// Remove a member with no open loans and no fines on record
    pub async fn delete_member(&self, id: i32) -> AppResult<()> {
        let _write = self.lock.write().await;
        self.fetch(id).await?;

        let loans = self.repository.loans_for_member(id).await?;
        if loans.iter().any(|l| l.is_open()) {
            tracing::debug!(member_id = id, "Refusing to delete a member with open loans");
            return Err(AppError::MemberHasOpenLoans(id));
        }
        let total = outstanding_fines(&loans);
        if total > Decimal::ZERO {
            tracing::debug!(member_id = id, %total, "Refusing to delete a member with fines");
            return Err(AppError::MemberHasUnpaidFines {
                member_id: id,
                total,
            });
        }

        self.repository.delete_member(id).await?;
        tracing::info!(member_id = id, "Member deleted");
        Ok(())
    }

    /// Sum of fines frozen on the member's returned loans
    pub async fn outstanding_fines(&self, id: i32) -> AppResult<Decimal> {
        let _read = self.lock.read().await;
        self.fetch(id).await?;
        let loans = self.repository.loans_for_member(id).await?;
        Ok(outstanding_fines(&loans))
    }

    /// Frozen fines plus what open overdue loans would add if returned today
    pub async fn fines(&self, id: i32) -> AppResult<MemberFines> {
        let _read = self.lock.read().await;
        self.fetch(id).await?;

        let today = self.clock.today();
        let loans = self.repository.loans_for_member(id).await?;
        let accruing = loans
            .iter()
            .map(|l| self.policy.compute_fine(l, today))
            .sum();

        Ok(MemberFines {
            member_id: id,
            outstanding: outstanding_fines(&loans),
            accruing,
            open_loans: loans.iter().filter(|l| l.is_open()).count(),
        })
    }

    async fn fetch(&self, id: i32) -> AppResult<Member> {
        self.repository
            .get_member(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }
}
