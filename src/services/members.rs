//! Member registry service

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    lending::Clock,
    models::member::{CreateMember, Member, MemberQuery, MemberSummary, UpdateMember},
    repository::{LoanLedger, Repository},
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl MembersService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Search members, with standing as of today
    pub async fn search_members(&self, query: &MemberQuery) -> AppResult<(Vec<MemberSummary>, i64)> {
        self.repository.members.search(query, self.clock.today()).await
    }

    /// Get member by ID with current standing
    pub async fn get_member(&self, id: i32) -> AppResult<MemberSummary> {
        let member = self.repository.members.get_by_id(id).await?;
        let standing = self.repository.loans.member_standing(id, self.clock.today()).await?;
        Ok(MemberSummary::new(member, standing))
    }

    /// Register a new member
    pub async fn create_member(&self, member: CreateMember) -> AppResult<Member> {
        member.validate()?;

        if self.repository.members.email_exists(&member.email, None).await? {
            return Err(AppError::Conflict(format!(
                "A member with email {} already exists",
                member.email
            )));
        }

        let created = self.repository.members.create(&member, self.clock.today()).await?;
        tracing::info!("Member {} registered: {}", created.id, created);
        Ok(created)
    }

    /// Update an existing member
    pub async fn update_member(&self, id: i32, member: UpdateMember) -> AppResult<Member> {
        member.validate()?;

        if let Some(ref email) = member.email {
            if self.repository.members.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict(format!("A member with email {} already exists", email)));
            }
        }

        let updated = self.repository.members.update(id, &member).await?;
        tracing::info!("Member {} updated", id);
        Ok(updated)
    }

    /// Delete a member
    pub async fn delete_member(&self, id: i32) -> AppResult<()> {
        self.repository.members.delete(id).await?;
        tracing::info!("Member {} deleted", id);
        Ok(())
    }
}
