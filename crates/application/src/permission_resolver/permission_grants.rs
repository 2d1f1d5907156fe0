use keystone_domain::{
    GrantId, GrantSource, PermissionDefinition, Revocation, UserPermissionGrant,
};

use super::*;
use crate::auth_ports::GrantMutation;

impl PermissionResolver {
    /// Grants or denies one permission directly and evicts the user's cached
    /// snapshot.
    ///
    /// An active row of the opposite polarity, or an active row that has
    /// already expired, is superseded in the same mutation so at most one
    /// row per `(user, permission)` is active.
    pub async fn grant_permission(
        &self,
        input: GrantPermissionInput,
    ) -> AppResult<PermissionChangeLogEntry> {
        let now = self.clock.now();
        ensure_future_expiry(input.expires_at, now)?;

        let definition = self.require_permission(&input.permission).await?;
        let existing = self
            .store
            .find_active_permission_grant(&input.user_id, definition.id)
            .await?;

        let (before, deactivated) = match existing {
            Some(existing)
                if existing.is_effective_at(now) && existing.is_denied == input.is_denied =>
            {
                let state = if input.is_denied { "denied" } else { "granted" };
                return Err(AppError::Conflict(format!(
                    "user '{}' is already {state} permission '{}'",
                    input.user_id, definition.name
                )));
            }
            Some(superseded) => {
                let updated =
                    deactivate_permission_grant(superseded.clone(), &input.context.actor, now);
                (
                    Some(GrantState::PermissionGrant(superseded)),
                    Some(GrantState::PermissionGrant(updated)),
                )
            }
            None => (None, None),
        };

        let grant = UserPermissionGrant {
            id: GrantId::from_uuid(self.ids.next_id()),
            user_id: input.user_id.clone(),
            permission_id: definition.id,
            granted_by: input.context.actor.clone(),
            granted_at: now,
            expires_at: input.expires_at,
            is_active: true,
            is_denied: input.is_denied,
            source: if input.expires_at.is_some() {
                GrantSource::Temporary
            } else {
                GrantSource::Direct
            },
            revocation: None,
            reason: input.context.reason.clone(),
        };

        let action = if input.is_denied {
            ChangeAction::PermissionDenied
        } else {
            ChangeAction::PermissionGranted
        };
        let entry = self.change_entry(
            action,
            &input.user_id,
            None,
            Some(definition.id),
            before,
            Some(GrantState::PermissionGrant(grant.clone())),
            input.context,
            now,
        );

        self.store
            .apply_grant_mutation(GrantMutation {
                deactivated,
                inserted: Some(GrantState::PermissionGrant(grant)),
                entry: entry.clone(),
            })
            .await?;
        self.evict(&input.user_id).await?;

        Ok(entry)
    }

    /// Lifts a direct grant or denial and evicts the user's cached snapshot.
    pub async fn revoke_permission(
        &self,
        input: RevokePermissionInput,
    ) -> AppResult<PermissionChangeLogEntry> {
        let now = self.clock.now();
        let definition = self.require_permission(&input.permission).await?;

        let existing = self
            .store
            .find_active_permission_grant(&input.user_id, definition.id)
            .await?
            .filter(|grant| grant.is_effective_at(now))
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "user '{}' has no active grant or denial for permission '{}'",
                    input.user_id, definition.name
                ))
            })?;

        let updated = deactivate_permission_grant(existing.clone(), &input.context.actor, now);
        let entry = self.change_entry(
            ChangeAction::PermissionRevoked,
            &input.user_id,
            None,
            Some(definition.id),
            Some(GrantState::PermissionGrant(existing)),
            Some(GrantState::PermissionGrant(updated.clone())),
            input.context,
            now,
        );

        self.store
            .apply_grant_mutation(GrantMutation {
                deactivated: Some(GrantState::PermissionGrant(updated)),
                inserted: None,
                entry: entry.clone(),
            })
            .await?;
        self.evict(&input.user_id).await?;

        Ok(entry)
    }

    async fn require_permission(&self, name: &PermissionName) -> AppResult<PermissionDefinition> {
        self.store
            .find_permission_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("permission '{name}' does not exist")))
    }
}

fn deactivate_permission_grant(
    mut grant: UserPermissionGrant,
    actor: &UserId,
    now: DateTime<Utc>,
) -> UserPermissionGrant {
    grant.is_active = false;
    grant.revocation = Some(Revocation {
        revoked_by: actor.clone(),
        revoked_at: now,
    });
    grant
}
