use super::*;

impl PostgresCredentialStore {
    pub(super) async fn apply_grant_mutation_impl(&self, mutation: GrantMutation) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| store_unavailable("begin grant mutation", error))?;

        if let Some(deactivated) = &mutation.deactivated {
            deactivate_grant(&mut transaction, deactivated).await?;
        }

        if let Some(inserted) = &mutation.inserted {
            insert_grant(&mut transaction, inserted).await?;
        }

        append_change_log(&mut transaction, &mutation.entry).await?;

        transaction
            .commit()
            .await
            .map_err(|error| store_unavailable("commit grant mutation", error))
    }
}

async fn deactivate_grant(
    transaction: &mut Transaction<'_, Postgres>,
    state: &GrantState,
) -> AppResult<()> {
    let (sql, id, revocation) = match state {
        GrantState::RoleGrant(grant) => (
            r#"
            UPDATE rbac_user_roles
            SET is_active = FALSE,
                revoked_by = $2,
                revoked_at = $3
            WHERE id = $1
              AND is_active
            "#,
            grant.id,
            grant.revocation.as_ref(),
        ),
        GrantState::PermissionGrant(grant) => (
            r#"
            UPDATE rbac_user_permissions
            SET is_active = FALSE,
                revoked_by = $2,
                revoked_at = $3
            WHERE id = $1
              AND is_active
            "#,
            grant.id,
            grant.revocation.as_ref(),
        ),
    };

    let revocation = revocation.ok_or_else(|| {
        AppError::Internal("deactivated grant image is missing its revocation stamp".to_owned())
    })?;

    let result = sqlx::query(sql)
        .bind(id.as_uuid())
        .bind(revocation.revoked_by.as_str())
        .bind(revocation.revoked_at)
        .execute(&mut **transaction)
        .await
        .map_err(|error| store_unavailable("deactivate grant", error))?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(format!(
            "grant '{}' is no longer active",
            id.as_uuid()
        )));
    }

    Ok(())
}

async fn insert_grant(
    transaction: &mut Transaction<'_, Postgres>,
    state: &GrantState,
) -> AppResult<()> {
    let result = match state {
        GrantState::RoleGrant(grant) => {
            sqlx::query(
                r#"
                INSERT INTO rbac_user_roles (
                    id,
                    user_id,
                    role_id,
                    granted_by,
                    granted_at,
                    expires_at,
                    is_active,
                    reason
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(grant.id.as_uuid())
            .bind(grant.user_id.as_str())
            .bind(grant.role_id.as_uuid())
            .bind(grant.granted_by.as_str())
            .bind(grant.granted_at)
            .bind(grant.expires_at)
            .bind(grant.is_active)
            .bind(grant.reason.as_deref())
            .execute(&mut **transaction)
            .await
        }
        GrantState::PermissionGrant(grant) => {
            sqlx::query(
                r#"
                INSERT INTO rbac_user_permissions (
                    id,
                    user_id,
                    permission_id,
                    granted_by,
                    granted_at,
                    expires_at,
                    is_active,
                    is_denied,
                    source,
                    reason
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(grant.id.as_uuid())
            .bind(grant.user_id.as_str())
            .bind(grant.permission_id.as_uuid())
            .bind(grant.granted_by.as_str())
            .bind(grant.granted_at)
            .bind(grant.expires_at)
            .bind(grant.is_active)
            .bind(grant.is_denied)
            .bind(grant.source.as_str())
            .bind(grant.reason.as_deref())
            .execute(&mut **transaction)
            .await
        }
    };

    match result {
        Ok(_) => Ok(()),
        Err(error) if is_unique_violation(&error) => Err(AppError::Conflict(
            "an active grant already exists for this user".to_owned(),
        )),
        Err(error) => Err(store_unavailable("insert grant", error)),
    }
}

async fn append_change_log(
    transaction: &mut Transaction<'_, Postgres>,
    entry: &PermissionChangeLogEntry,
) -> AppResult<()> {
    let before = encode_json(entry.before.as_ref())?;
    let after = encode_json(entry.after.as_ref())?;
    let extensions = serde_json::to_value(&entry.extensions).map_err(|error| {
        AppError::Internal(format!("failed to encode change log extensions: {error}"))
    })?;

    sqlx::query(
        r#"
        INSERT INTO rbac_permission_change_log (
            id,
            action,
            user_id,
            role_id,
            permission_id,
            before_state,
            after_state,
            actor,
            created_at,
            reason,
            extensions
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(entry.id.as_uuid())
    .bind(entry.action.as_str())
    .bind(entry.user_id.as_str())
    .bind(entry.role_id.map(|role_id| role_id.as_uuid()))
    .bind(entry.permission_id.map(|permission_id| permission_id.as_uuid()))
    .bind(before)
    .bind(after)
    .bind(entry.actor.as_str())
    .bind(entry.created_at)
    .bind(entry.reason.as_deref())
    .bind(extensions)
    .execute(&mut **transaction)
    .await
    .map_err(|error| store_unavailable("append change log entry", error))?;

    Ok(())
}

fn encode_json(state: Option<&GrantState>) -> AppResult<Option<serde_json::Value>> {
    state
        .map(|state| {
            serde_json::to_value(state).map_err(|error| {
                AppError::Internal(format!("failed to encode grant state: {error}"))
            })
        })
        .transpose()
}
