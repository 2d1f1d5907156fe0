use super::*;

impl PostgresCredentialStore {
    pub(super) async fn list_change_log_impl(
        &self,
        query: ChangeLogQuery,
    ) -> AppResult<Vec<PermissionChangeLogEntry>> {
        let rows = sqlx::query_as::<_, ChangeLogRow>(
            r#"
            SELECT
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
            FROM rbac_permission_change_log
            WHERE ($1::TEXT IS NULL OR user_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            OFFSET $3
            "#,
        )
        .bind(query.user_id.as_ref().map(UserId::as_str))
        .bind(i64::from(query.limit))
        .bind(i64::from(query.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_unavailable("list change log", error))?;

        rows.into_iter()
            .map(PermissionChangeLogEntry::try_from)
            .collect()
    }
}
