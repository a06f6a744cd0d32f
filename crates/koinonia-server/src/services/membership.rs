//! Group and organization membership flows
//!
//! The stores happily remove or demote anyone; the floor rules (a group
//! keeps at least one leader, an organization at least one admin) are
//! enforced here. Joining fans out a member-joined notification.

use std::sync::Arc;

use koinonia_core::{Error, Result, Storage};
use koinonia_types::{
    GroupMember, GroupRole, NewGroupMember, NewOrganizationMember, NotificationKind, OrgRole,
    OrganizationMember,
};

use super::outbox::{Audience, NotificationBatch, NotificationOutbox};

#[derive(Clone)]
pub struct MembershipService {
    store: Arc<dyn Storage>,
    outbox: NotificationOutbox,
}

impl MembershipService {
    pub fn new(store: Arc<dyn Storage>, outbox: NotificationOutbox) -> Self {
        Self { store, outbox }
    }

    pub async fn join_group(&self, new: NewGroupMember) -> Result<GroupMember> {
        let group = match self.store.get_group(new.group_id).await? {
            Some(group) => group,
            None => return Err(Error::NotFound("group")),
        };

        let name = self.display_name(new.user_id).await?;
        let member = self.store.add_group_member(new).await?;

        self.outbox.enqueue(NotificationBatch {
            audience: Audience::Group(member.group_id),
            actor_id: Some(member.user_id),
            kind: NotificationKind::MemberJoined,
            message: format!("{} joined {}", name, group.name),
            reference_id: Some(group.id),
        });
        Ok(member)
    }

    /// Removes a member. Refused for the last leader so the group is
    /// never left without one.
    pub async fn leave_group(&self, group_id: i64, user_id: i64) -> Result<bool> {
        let member = match self.store.get_group_member(group_id, user_id).await? {
            Some(member) => member,
            None => return Ok(false),
        };
        if member.role == GroupRole::Leader && self.store.count_group_leaders(group_id).await? <= 1
        {
            return Err(Error::LastLeader { group_id });
        }
        self.store.remove_group_member(group_id, user_id).await
    }

    /// Changes a member's role. Demoting the last leader is refused.
    pub async fn change_group_role(
        &self,
        group_id: i64,
        user_id: i64,
        role: GroupRole,
    ) -> Result<Option<GroupMember>> {
        let member = match self.store.get_group_member(group_id, user_id).await? {
            Some(member) => member,
            None => return Ok(None),
        };
        if member.role == GroupRole::Leader
            && role != GroupRole::Leader
            && self.store.count_group_leaders(group_id).await? <= 1
        {
            return Err(Error::LastLeader { group_id });
        }
        self.store
            .update_group_member_role(group_id, user_id, role)
            .await
    }

    pub async fn join_organization(
        &self,
        new: NewOrganizationMember,
    ) -> Result<OrganizationMember> {
        let organization = match self.store.get_organization(new.organization_id).await? {
            Some(organization) => organization,
            None => return Err(Error::NotFound("organization")),
        };

        let name = self.display_name(new.user_id).await?;
        let member = self.store.add_organization_member(new).await?;

        self.outbox.enqueue(NotificationBatch {
            audience: Audience::Organization(member.organization_id),
            actor_id: Some(member.user_id),
            kind: NotificationKind::OrgMemberJoined,
            message: format!("{} joined {}", name, organization.name),
            reference_id: Some(organization.id),
        });
        Ok(member)
    }

    pub async fn leave_organization(&self, organization_id: i64, user_id: i64) -> Result<bool> {
        let member = match self
            .store
            .get_organization_member(organization_id, user_id)
            .await?
        {
            Some(member) => member,
            None => return Ok(false),
        };
        if member.role == OrgRole::Admin
            && self.store.count_organization_admins(organization_id).await? <= 1
        {
            return Err(Error::LastAdmin { organization_id });
        }
        self.store
            .remove_organization_member(organization_id, user_id)
            .await
    }

    pub async fn change_organization_role(
        &self,
        organization_id: i64,
        user_id: i64,
        role: OrgRole,
    ) -> Result<Option<OrganizationMember>> {
        let member = match self
            .store
            .get_organization_member(organization_id, user_id)
            .await?
        {
            Some(member) => member,
            None => return Ok(None),
        };
        if member.role == OrgRole::Admin
            && role != OrgRole::Admin
            && self.store.count_organization_admins(organization_id).await? <= 1
        {
            return Err(Error::LastAdmin { organization_id });
        }
        self.store
            .update_organization_member_role(organization_id, user_id, role)
            .await
    }

    async fn display_name(&self, user_id: i64) -> Result<String> {
        Ok(self
            .store
            .get_user(user_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| "Someone".to_string()))
    }
}
