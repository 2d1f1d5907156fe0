use keystone_domain::AdminProfile;

use super::*;

impl PermissionResolver {
    /// Computes a snapshot straight from the credential store.
    pub async fn load_snapshot(&self, user_id: &UserId) -> AppResult<PermissionSnapshot> {
        let now = self.clock.now();
        let role_grants = self.store.list_active_role_grants(user_id).await?;

        let mut role_ids = role_grants
            .iter()
            .filter(|active| active.role.is_active && active.grant.is_effective_at(now))
            .map(|active| active.role.id)
            .collect::<Vec<_>>();
        role_ids.sort();
        role_ids.dedup();

        let role_permissions = if role_ids.is_empty() {
            Vec::new()
        } else {
            self.store.list_permissions_for_roles(&role_ids).await?
        };
        let direct_grants = self.store.list_active_permission_grants(user_id).await?;

        Ok(PermissionSnapshot::compute(
            user_id.clone(),
            &role_grants,
            &role_permissions,
            &direct_grants,
            now,
        ))
    }

    /// Returns the user's snapshot, from cache when still fresh.
    pub async fn snapshot(&self, user_id: &UserId) -> AppResult<PermissionSnapshot> {
        let now = self.clock.now();
        if let Some(cached) = self.cache.get_snapshot(user_id).await?
            && &cached.user_id == user_id
            && cached.is_fresh_at(now)
        {
            return Ok(cached);
        }

        // Read before the store so a mutation committing mid-load moves it.
        let generation = self.cache.snapshot_generation(user_id).await?;
        let snapshot = self.load_snapshot(user_id).await?;
        if let Some(ttl_seconds) = self.cache_ttl(&snapshot, now) {
            self.cache
                .set_snapshot(&snapshot, ttl_seconds, generation)
                .await?;
        }

        Ok(snapshot)
    }

    fn cache_ttl(&self, snapshot: &PermissionSnapshot, now: DateTime<Utc>) -> Option<u64> {
        let ttl_seconds = self.settings.snapshot_ttl_seconds;
        let ttl_seconds = match snapshot.valid_until {
            Some(valid_until) => {
                let remaining = u64::try_from((valid_until - now).num_seconds()).unwrap_or(0);
                ttl_seconds.min(remaining)
            }
            None => ttl_seconds,
        };

        (ttl_seconds > 0).then_some(ttl_seconds)
    }

    /// Evaluates each requested name against the user's snapshot.
    pub async fn check(
        &self,
        user_id: &UserId,
        permissions: &[PermissionName],
        mode: CheckMode,
    ) -> AppResult<PermissionCheck> {
        let snapshot = self.snapshot(user_id).await?;
        let decisions = permissions
            .iter()
            .map(|permission| snapshot.evaluate(permission))
            .collect();

        Ok(PermissionCheck::from_decisions(mode, decisions))
    }

    /// Ensures the user passes a permission check.
    ///
    /// Fails with `InsufficientPermission` naming only the requested names
    /// that caused the denial.
    pub async fn authorize(
        &self,
        user_id: &UserId,
        permissions: &[PermissionName],
        mode: CheckMode,
    ) -> AppResult<PermissionCheck> {
        let check = self.check(user_id, permissions, mode).await?;
        if !check.allowed {
            return Err(AppError::InsufficientPermission {
                missing: check.missing(),
            });
        }

        Ok(check)
    }

    /// Builds admin token claims from the user's current snapshot.
    pub async fn admin_profile(
        &self,
        user_id: &UserId,
        department: Option<String>,
    ) -> AppResult<AdminProfile> {
        let snapshot = self.snapshot(user_id).await?;
        Ok(AdminProfile {
            role_ids: snapshot.role_ids(),
            permissions: snapshot.permission_names(),
            department,
        })
    }
}
