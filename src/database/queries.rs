use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use super::models::*;
use super::{Database, RemovalOutcome, SignatureStore};
use crate::error::StoreError;

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

async fn find_tracked_pull_request_id(
    tx: &mut Transaction<'_, Sqlite>,
    repo_name: &str,
    pr_number: u64,
) -> Result<Option<String>, StoreError> {
    let id = sqlx::query_scalar::<_, String>(
        r#"
        SELECT id FROM unsigned_pull_requests
        WHERE repo_name = ? AND pr_number = ?
        "#,
    )
    .bind(repo_name)
    .bind(pr_number as i64)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(id)
}

async fn upsert_tracked_pull_request(
    tx: &mut Transaction<'_, Sqlite>,
    info: &EvaluationInfo,
) -> Result<String, StoreError> {
    let candidate_id = Uuid::new_v4().to_string();

    let inserted = sqlx::query(
        r#"
        INSERT INTO unsigned_pull_requests
            (id, repo_owner, repo_name, sha, pr_number, app_id, install_id)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&candidate_id)
    .bind(&info.repo_owner)
    .bind(&info.repo_name)
    .bind(&info.sha)
    .bind(info.pr_number as i64)
    .bind(info.app_id as i64)
    .bind(info.install_id as i64)
    .execute(&mut **tx)
    .await;

    match inserted {
        Ok(_) => Ok(candidate_id),
        Err(err) if is_unique_violation(&err) => {
            debug!(
                "PR #{} in {} is already tracked, reusing existing record",
                info.pr_number, info.repo_name
            );

            let existing = find_tracked_pull_request_id(tx, &info.repo_name, info.pr_number)
                .await?
                .filter(|id| !id.is_empty())
                .ok_or_else(|| StoreError::MissingParent {
                    repo_name: info.repo_name.clone(),
                    pr_number: info.pr_number,
                })?;

            // Re-evaluations report status against the stored head, keep it current.
            sqlx::query("UPDATE unsigned_pull_requests SET sha = ? WHERE id = ?")
                .bind(&info.sha)
                .bind(&existing)
                .execute(&mut **tx)
                .await?;

            Ok(existing)
        }
        Err(err) => Err(err.into()),
    }
}

#[async_trait]
impl SignatureStore for Database {
    async fn insert_signature(&self, signature: &Signature) -> Result<(), StoreError> {
        let duplicate = || StoreError::DuplicateSignature {
            login: signature.login.clone(),
            cla_version: signature.cla_version.clone(),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO signatures (login, email, given_name, cla_version, signed_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&signature.login)
        .bind(&signature.email)
        .bind(&signature.given_name)
        .bind(&signature.cla_version)
        .bind(signature.signed_at)
        .execute(self.pool())
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(duplicate()),
            Ok(_) => {
                info!("Recorded CLA {} signature for {}", signature.cla_version, signature.login);
                Ok(())
            }
            Err(err) if is_unique_violation(&err) => Err(duplicate()),
            Err(err) => Err(err.into()),
        }
    }

    async fn has_signed(&self, login: &str, cla_version: &str) -> Result<Option<Signature>, StoreError> {
        let signature = sqlx::query_as::<_, Signature>(
            r#"
            SELECT login, email, given_name, cla_version, signed_at
            FROM signatures
            WHERE login = ? AND cla_version = ?
            "#,
        )
        .bind(login)
        .bind(cla_version)
        .fetch_optional(self.pool())
        .await?;

        Ok(signature)
    }

    async fn store_unsigned_authors(
        &self,
        info: &EvaluationInfo,
        checked_at: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        let mut tx = self.pool().begin().await?;

        let parent_id = upsert_tracked_pull_request(&mut tx, info).await?;

        let mut inserted = 0;
        for author in &info.user_signatures {
            let done = sqlx::query(
                r#"
                INSERT INTO unsigned_authors
                    (id, unsigned_pr_id, login, email, given_name, cla_version, checked_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (unsigned_pr_id, login, cla_version) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&parent_id)
            .bind(&author.login)
            .bind(&author.email)
            .bind(&author.given_name)
            .bind(&author.cla_version)
            .bind(checked_at)
            .execute(&mut *tx)
            .await?;
            inserted += done.rows_affected();
        }

        tx.commit().await?;

        debug!(
            "Tracking PR #{} in {}/{}: {} new of {} unsigned authors",
            info.pr_number,
            info.repo_owner,
            info.repo_name,
            inserted,
            info.user_signatures.len()
        );

        Ok(parent_id)
    }

    async fn get_tracked_pull_requests(&self, user: &UserSignature) -> Result<Vec<EvaluationInfo>, StoreError> {
        let rows = sqlx::query_as::<_, TrackedAuthorRow>(
            r#"
            SELECT p.id AS unsigned_pr_id, p.repo_owner, p.repo_name, p.sha,
                   p.pr_number, p.app_id, p.install_id,
                   a.login, a.email, a.given_name, a.cla_version
            FROM unsigned_pull_requests p
            JOIN unsigned_authors a ON a.unsigned_pr_id = p.id
            WHERE a.login = ? AND a.cla_version = ?
            ORDER BY p.repo_owner, p.repo_name, p.pr_number
            "#,
        )
        .bind(&user.login)
        .bind(&user.cla_version)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(EvaluationInfo::from).collect())
    }

    async fn remove_resolved_authors(
        &self,
        signed_users: &[UserSignature],
        info: &EvaluationInfo,
    ) -> Result<RemovalOutcome, StoreError> {
        let mut outcome = RemovalOutcome::default();
        if signed_users.is_empty() {
            return Ok(outcome);
        }

        // Open with a write so the transaction holds the write lock before it
        // reads anything. A read-first transaction cannot upgrade once a
        // concurrent evaluation of the same pull request has committed.
        let mut tx = self.pool().begin().await?;

        for user in signed_users {
            let done = sqlx::query(
                r#"
                DELETE FROM unsigned_authors
                WHERE unsigned_pr_id = (
                    SELECT id FROM unsigned_pull_requests
                    WHERE repo_name = ? AND pr_number = ?
                )
                AND login = ? AND cla_version = ?
                "#,
            )
            .bind(&info.repo_name)
            .bind(info.pr_number as i64)
            .bind(&user.login)
            .bind(&user.cla_version)
            .execute(&mut *tx)
            .await?;
            outcome.authors_removed += done.rows_affected();
        }

        if outcome.authors_removed > 0 {
            let done = sqlx::query(
                r#"
                DELETE FROM unsigned_pull_requests
                WHERE repo_name = ? AND pr_number = ?
                AND NOT EXISTS (
                    SELECT 1 FROM unsigned_authors
                    WHERE unsigned_authors.unsigned_pr_id = unsigned_pull_requests.id
                )
                "#,
            )
            .bind(&info.repo_name)
            .bind(info.pr_number as i64)
            .execute(&mut *tx)
            .await?;
            outcome.pull_request_removed = done.rows_affected() > 0;
        }

        tx.commit().await?;

        if outcome.authors_removed > 0 {
            info!(
                "Resolved {} tracked authors on PR #{} in {}/{} (tracking record removed: {})",
                outcome.authors_removed,
                info.pr_number,
                info.repo_owner,
                info.repo_name,
                outcome.pull_request_removed
            );
        }

        Ok(outcome)
    }

    async fn migrate_schema(&self) -> Result<(), StoreError> {
        self.run_migrations().await
    }
}
