use keystone_domain::{GrantId, Revocation, Role, UserRoleGrant};

use super::*;
use crate::auth_ports::GrantMutation;

impl PermissionResolver {
    /// Grants a role to a user and evicts the user's cached snapshot.
    ///
    /// An active grant of the same role that has already expired is
    /// deactivated in the same mutation.
    pub async fn grant_role(&self, input: GrantRoleInput) -> AppResult<PermissionChangeLogEntry> {
        let now = self.clock.now();
        ensure_future_expiry(input.expires_at, now)?;

        let role = self.require_role(&input.role_name).await?;
        if !role.is_active {
            return Err(AppError::Validation(format!(
                "role '{}' is inactive and cannot be granted",
                role.name
            )));
        }

        let existing = self
            .store
            .find_active_role_grant(&input.user_id, role.id)
            .await?;
        let (before, deactivated) = match existing {
            Some(existing) if existing.is_effective_at(now) => {
                return Err(AppError::Conflict(format!(
                    "user '{}' already holds role '{}'",
                    input.user_id, role.name
                )));
            }
            Some(expired) => {
                let updated = deactivate_role_grant(expired.clone(), &input.context.actor, now);
                (
                    Some(GrantState::RoleGrant(expired)),
                    Some(GrantState::RoleGrant(updated)),
                )
            }
            None => (None, None),
        };

        let grant = UserRoleGrant {
            id: GrantId::from_uuid(self.ids.next_id()),
            user_id: input.user_id.clone(),
            role_id: role.id,
            granted_by: input.context.actor.clone(),
            granted_at: now,
            expires_at: input.expires_at,
            is_active: true,
            revocation: None,
            reason: input.context.reason.clone(),
        };

        let entry = self.change_entry(
            ChangeAction::RoleGranted,
            &input.user_id,
            Some(role.id),
            None,
            before,
            Some(GrantState::RoleGrant(grant.clone())),
            input.context,
            now,
        );

        self.store
            .apply_grant_mutation(GrantMutation {
                deactivated,
                inserted: Some(GrantState::RoleGrant(grant)),
                entry: entry.clone(),
            })
            .await?;
        self.evict(&input.user_id).await?;

        Ok(entry)
    }

    /// Deactivates a user's role grant and evicts the cached snapshot.
    pub async fn revoke_role(&self, input: RevokeRoleInput) -> AppResult<PermissionChangeLogEntry> {
        let now = self.clock.now();
        let role = self.require_role(&input.role_name).await?;

        let existing = self
            .store
            .find_active_role_grant(&input.user_id, role.id)
            .await?
            .filter(|grant| grant.is_effective_at(now))
            .ok_or_else(|| {
                AppError::MissingRole(format!(
                    "user '{}' does not hold role '{}'",
                    input.user_id, role.name
                ))
            })?;

        let updated = deactivate_role_grant(existing.clone(), &input.context.actor, now);
        let entry = self.change_entry(
            ChangeAction::RoleRevoked,
            &input.user_id,
            Some(role.id),
            None,
            Some(GrantState::RoleGrant(existing)),
            Some(GrantState::RoleGrant(updated.clone())),
            input.context,
            now,
        );

        self.store
            .apply_grant_mutation(GrantMutation {
                deactivated: Some(GrantState::RoleGrant(updated)),
                inserted: None,
                entry: entry.clone(),
            })
            .await?;
        self.evict(&input.user_id).await?;

        Ok(entry)
    }

    async fn require_role(&self, role_name: &str) -> AppResult<Role> {
        self.store
            .find_role_by_name(role_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_name}' does not exist")))
    }
}

fn deactivate_role_grant(
    mut grant: UserRoleGrant,
    actor: &UserId,
    now: DateTime<Utc>,
) -> UserRoleGrant {
    grant.is_active = false;
    grant.revocation = Some(Revocation {
        revoked_by: actor.clone(),
        revoked_at: now,
    });
    grant
}
