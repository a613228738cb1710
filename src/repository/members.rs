//! Members table access

use async_trait::async_trait;

use crate::{
    error::{AppError, AppResult},
    models::{Member, MemberData, NewMember},
};

use super::{is_unique_violation, MemberStore, PgStore};

const MEMBER_COLUMNS: &str = "id, name, email, phone, address, member_type, join_date, status";

#[async_trait]
impl MemberStore for PgStore {
    async fn list_members(&self) -> AppResult<Vec<Member>> {
        let members = sqlx::query_as::<_, Member>(&format!(
            "SELECT {} FROM members ORDER BY id",
            MEMBER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn get_member(&self, id: i32) -> AppResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {} FROM members WHERE id = $1",
            MEMBER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    async fn find_member_by_email(&self, email: &str) -> AppResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {} FROM members WHERE email = $1",
            MEMBER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    async fn insert_member(&self, member: &NewMember) -> AppResult<Member> {
        let data = &member.data;
        sqlx::query_as::<_, Member>(&format!(
            r#"
            INSERT INTO members (name, email, phone, address, member_type, join_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            MEMBER_COLUMNS
        ))
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.address)
        .bind(data.member_type)
        .bind(member.join_date)
        .bind(member.status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateMemberEmail(data.email.clone())
            } else {
                AppError::Storage(e)
            }
        })
    }

    async fn update_member(&self, id: i32, member: &MemberData) -> AppResult<Option<Member>> {
        sqlx::query_as::<_, Member>(&format!(
            r#"
            UPDATE members
            SET name = $2, email = $3, phone = $4, address = $5, member_type = $6,
                status = COALESCE($7, status)
            WHERE id = $1
            RETURNING {}
            "#,
            MEMBER_COLUMNS
        ))
        .bind(id)
        .bind(&member.name)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(&member.address)
        .bind(member.member_type)
        .bind(member.status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateMemberEmail(member.email.clone())
            } else {
                AppError::Storage(e)
            }
        })
    }

    async fn delete_member(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
