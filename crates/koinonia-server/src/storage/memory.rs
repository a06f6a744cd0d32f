//! In-memory storage backend using DashMap
//!
//! Behaves exactly like the SQLite backend from the caller's side: same
//! ordering, same `AlreadyExists` conditions, same cascade coverage. Ids come
//! from a single atomic counter owned by the store instance, so no two rows
//! of any table ever share an id.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use koinonia_core::ports::{
    GroupStore, MeetingStore, NotificationStore, OrganizationStore, PasswordResetStore,
    PrayerRequestStore, PreferenceStore, TagStore, UserStore,
};
use koinonia_core::{Error, Result};
use koinonia_types::{
    Comment, Group, GroupMember, GroupNotificationPreference, GroupNotificationPreferenceUpdate,
    GroupRole, GroupTag, GroupUpdate, Meeting, MeetingNote, MeetingNoteUpdate, MeetingUpdate,
    NewComment, NewGroup, NewGroupMember, NewMeeting, NewMeetingNote, NewNotification,
    NewOrganization, NewOrganizationMember, NewPasswordResetToken, NewPrayerRequest, NewTag,
    NewUser, Notification, NotificationPreference, NotificationPreferenceUpdate, OrgRole,
    Organization, OrganizationMember, OrganizationTag, OrganizationUpdate, PasswordResetToken,
    PrayerRequest, PrayerRequestUpdate, PrayingFor, ReferenceScope, RequestStatus, Tag, User,
    UserUpdate,
};

pub struct MemoryStore {
    next_id: AtomicI64,
    users: DashMap<i64, User>,
    organizations: DashMap<i64, Organization>,
    organization_members: DashMap<i64, OrganizationMember>,
    groups: DashMap<i64, Group>,
    group_members: DashMap<i64, GroupMember>,
    prayer_requests: DashMap<i64, PrayerRequest>,
    comments: DashMap<i64, Comment>,
    praying_for: DashMap<i64, PrayingFor>,
    notifications: DashMap<i64, Notification>,
    meetings: DashMap<i64, Meeting>,
    meeting_notes: DashMap<i64, MeetingNote>,
    password_reset_tokens: DashMap<i64, PasswordResetToken>,
    notification_preferences: DashMap<i64, NotificationPreference>,
    group_notification_preferences: DashMap<(i64, i64), GroupNotificationPreference>,
    tags: DashMap<i64, Tag>,
    group_tags: DashMap<i64, GroupTag>,
    organization_tags: DashMap<i64, OrganizationTag>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            users: DashMap::new(),
            organizations: DashMap::new(),
            organization_members: DashMap::new(),
            groups: DashMap::new(),
            group_members: DashMap::new(),
            prayer_requests: DashMap::new(),
            comments: DashMap::new(),
            praying_for: DashMap::new(),
            notifications: DashMap::new(),
            meetings: DashMap::new(),
            meeting_notes: DashMap::new(),
            password_reset_tokens: DashMap::new(),
            notification_preferences: DashMap::new(),
            group_notification_preferences: DashMap::new(),
            tags: DashMap::new(),
            group_tags: DashMap::new(),
            organization_tags: DashMap::new(),
        }
    }

    fn alloc_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Removes a request with its comments, praying-for rows and
    /// request-scoped notifications. Collect keys first, then remove, so no
    /// map reference is held across a removal.
    fn purge_request(&self, request_id: i64) {
        let comment_ids: Vec<i64> = self
            .comments
            .iter()
            .filter(|c| c.prayer_request_id == request_id)
            .map(|c| c.id)
            .collect();
        for id in comment_ids {
            self.comments.remove(&id);
        }

        let praying_ids: Vec<i64> = self
            .praying_for
            .iter()
            .filter(|p| p.prayer_request_id == request_id)
            .map(|p| p.id)
            .collect();
        for id in praying_ids {
            self.praying_for.remove(&id);
        }

        self.purge_notifications(ReferenceScope::Request, request_id);
        self.prayer_requests.remove(&request_id);
    }

    /// Removes a meeting with its notes and meeting-scoped notifications.
    fn purge_meeting(&self, meeting_id: i64) {
        let note_ids: Vec<i64> = self
            .meeting_notes
            .iter()
            .filter(|n| n.meeting_id == meeting_id)
            .map(|n| n.id)
            .collect();
        for id in note_ids {
            self.meeting_notes.remove(&id);
        }

        self.purge_notifications(ReferenceScope::Meeting, meeting_id);
        self.meetings.remove(&meeting_id);
    }

    /// Removes a group and everything under it.
    fn purge_group(&self, group_id: i64) {
        let request_ids: Vec<i64> = self
            .prayer_requests
            .iter()
            .filter(|r| r.group_id == group_id)
            .map(|r| r.id)
            .collect();
        for id in request_ids {
            self.purge_request(id);
        }

        let meeting_ids: Vec<i64> = self
            .meetings
            .iter()
            .filter(|m| m.group_id == group_id)
            .map(|m| m.id)
            .collect();
        for id in meeting_ids {
            self.purge_meeting(id);
        }

        let member_ids: Vec<i64> = self
            .group_members
            .iter()
            .filter(|m| m.group_id == group_id)
            .map(|m| m.id)
            .collect();
        for id in member_ids {
            self.group_members.remove(&id);
        }

        let tag_link_ids: Vec<i64> = self
            .group_tags
            .iter()
            .filter(|t| t.group_id == group_id)
            .map(|t| t.id)
            .collect();
        for id in tag_link_ids {
            self.group_tags.remove(&id);
        }

        let pref_keys: Vec<(i64, i64)> = self
            .group_notification_preferences
            .iter()
            .filter(|p| p.group_id == group_id)
            .map(|p| (p.user_id, p.group_id))
            .collect();
        for key in pref_keys {
            self.group_notification_preferences.remove(&key);
        }

        self.purge_notifications(ReferenceScope::Group, group_id);
        self.groups.remove(&group_id);
    }

    /// Removes notifications whose kind points into `scope` at `reference_id`.
    fn purge_notifications(&self, scope: ReferenceScope, reference_id: i64) {
        let ids: Vec<i64> = self
            .notifications
            .iter()
            .filter(|n| n.kind.scope() == scope && n.reference_id == Some(reference_id))
            .map(|n| n.id)
            .collect();
        for id in ids {
            self.notifications.remove(&id);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User> {
        let taken = self
            .users
            .iter()
            .any(|u| u.username == new.username || u.email == new.email);
        if taken {
            return Err(Error::AlreadyExists("user"));
        }

        let user = User {
            id: self.alloc_id(),
            username: new.username,
            email: new.email,
            password: new.password,
            name: new.name,
            role: new.role,
            created_at: Utc::now(),
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.clone()))
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<Option<User>> {
        if let Some(username) = &update.username {
            if self.users.iter().any(|u| u.id != id && u.username == *username) {
                return Err(Error::AlreadyExists("user"));
            }
        }
        if let Some(email) = &update.email {
            if self.users.iter().any(|u| u.id != id && u.email == *email) {
                return Err(Error::AlreadyExists("user"));
            }
        }

        let mut user = match self.users.get_mut(&id) {
            Some(user) => user,
            None => return Ok(None),
        };
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(password) = update.password {
            user.password = password;
        }
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        Ok(Some(user.clone()))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.clone()).collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }
}

#[async_trait]
impl OrganizationStore for MemoryStore {
    async fn create_organization(&self, new: NewOrganization) -> Result<Organization> {
        let organization = Organization {
            id: self.alloc_id(),
            name: new.name,
            description: new.description,
            created_by: new.created_by,
            created_at: Utc::now(),
        };
        self.organizations
            .insert(organization.id, organization.clone());

        let member = OrganizationMember {
            id: self.alloc_id(),
            organization_id: organization.id,
            user_id: organization.created_by,
            role: OrgRole::Admin,
            joined_at: organization.created_at,
        };
        self.organization_members.insert(member.id, member);

        Ok(organization)
    }

    async fn get_organization(&self, id: i64) -> Result<Option<Organization>> {
        Ok(self.organizations.get(&id).map(|o| o.clone()))
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let mut organizations: Vec<Organization> =
            self.organizations.iter().map(|o| o.clone()).collect();
        organizations.sort_by_key(|o| o.id);
        Ok(organizations)
    }

    async fn list_organizations_for_user(&self, user_id: i64) -> Result<Vec<Organization>> {
        let organization_ids: Vec<i64> = self
            .organization_members
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.organization_id)
            .collect();

        let mut organizations: Vec<Organization> = organization_ids
            .into_iter()
            .filter_map(|id| self.organizations.get(&id).map(|o| o.clone()))
            .collect();
        organizations.sort_by_key(|o| o.id);
        Ok(organizations)
    }

    async fn update_organization(
        &self,
        id: i64,
        update: OrganizationUpdate,
    ) -> Result<Option<Organization>> {
        let mut organization = match self.organizations.get_mut(&id) {
            Some(organization) => organization,
            None => return Ok(None),
        };
        if let Some(name) = update.name {
            organization.name = name;
        }
        if let Some(description) = update.description {
            organization.description = description;
        }
        Ok(Some(organization.clone()))
    }

    async fn delete_organization(&self, id: i64) -> Result<bool> {
        if self.organizations.get(&id).is_none() {
            return Ok(false);
        }

        let group_ids: Vec<i64> = self
            .groups
            .iter()
            .filter(|g| g.organization_id == id)
            .map(|g| g.id)
            .collect();
        for group_id in group_ids {
            self.purge_group(group_id);
        }

        let member_ids: Vec<i64> = self
            .organization_members
            .iter()
            .filter(|m| m.organization_id == id)
            .map(|m| m.id)
            .collect();
        for member_id in member_ids {
            self.organization_members.remove(&member_id);
        }

        let tag_link_ids: Vec<i64> = self
            .organization_tags
            .iter()
            .filter(|t| t.organization_id == id)
            .map(|t| t.id)
            .collect();
        for link_id in tag_link_ids {
            self.organization_tags.remove(&link_id);
        }

        self.purge_notifications(ReferenceScope::Organization, id);
        self.organizations.remove(&id);
        Ok(true)
    }

    async fn add_organization_member(
        &self,
        new: NewOrganizationMember,
    ) -> Result<OrganizationMember> {
        let taken = self
            .organization_members
            .iter()
            .any(|m| m.organization_id == new.organization_id && m.user_id == new.user_id);
        if taken {
            return Err(Error::AlreadyExists("organization member"));
        }

        let member = OrganizationMember {
            id: self.alloc_id(),
            organization_id: new.organization_id,
            user_id: new.user_id,
            role: new.role,
            joined_at: Utc::now(),
        };
        self.organization_members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn get_organization_member(
        &self,
        organization_id: i64,
        user_id: i64,
    ) -> Result<Option<OrganizationMember>> {
        Ok(self
            .organization_members
            .iter()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
            .map(|m| m.clone()))
    }

    async fn list_organization_members(
        &self,
        organization_id: i64,
    ) -> Result<Vec<OrganizationMember>> {
        let mut members: Vec<OrganizationMember> = self
            .organization_members
            .iter()
            .filter(|m| m.organization_id == organization_id)
            .map(|m| m.clone())
            .collect();
        members.sort_by_key(|m| m.id);
        Ok(members)
    }

    async fn update_organization_member_role(
        &self,
        organization_id: i64,
        user_id: i64,
        role: OrgRole,
    ) -> Result<Option<OrganizationMember>> {
        match self
            .organization_members
            .iter_mut()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
        {
            Some(mut member) => {
                member.role = role;
                Ok(Some(member.clone()))
            }
            None => Ok(None),
        }
    }

    async fn remove_organization_member(
        &self,
        organization_id: i64,
        user_id: i64,
    ) -> Result<bool> {
        let member_id = self
            .organization_members
            .iter()
            .find(|m| m.organization_id == organization_id && m.user_id == user_id)
            .map(|m| m.id);
        match member_id {
            Some(id) => {
                self.organization_members.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_organization_admins(&self, organization_id: i64) -> Result<i64> {
        Ok(self
            .organization_members
            .iter()
            .filter(|m| m.organization_id == organization_id && m.role == OrgRole::Admin)
            .count() as i64)
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn create_group(&self, new: NewGroup) -> Result<Group> {
        let group = Group {
            id: self.alloc_id(),
            name: new.name,
            description: new.description,
            category: new.category,
            privacy: new.privacy,
            organization_id: new.organization_id,
            created_by: new.created_by,
            created_at: Utc::now(),
        };
        self.groups.insert(group.id, group.clone());

        let member = GroupMember {
            id: self.alloc_id(),
            group_id: group.id,
            user_id: group.created_by,
            role: GroupRole::Leader,
            joined_at: group.created_at,
        };
        self.group_members.insert(member.id, member);

        Ok(group)
    }

    async fn get_group(&self, id: i64) -> Result<Option<Group>> {
        Ok(self.groups.get(&id).map(|g| g.clone()))
    }

    async fn list_groups_for_organization(&self, organization_id: i64) -> Result<Vec<Group>> {
        let mut groups: Vec<Group> = self
            .groups
            .iter()
            .filter(|g| g.organization_id == organization_id)
            .map(|g| g.clone())
            .collect();
        groups.sort_by_key(|g| g.id);
        Ok(groups)
    }

    async fn list_groups_for_user(&self, user_id: i64) -> Result<Vec<Group>> {
        let group_ids: Vec<i64> = self
            .group_members
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.group_id)
            .collect();

        let mut groups: Vec<Group> = group_ids
            .into_iter()
            .filter_map(|id| self.groups.get(&id).map(|g| g.clone()))
            .collect();
        groups.sort_by_key(|g| g.id);
        Ok(groups)
    }

    async fn update_group(&self, id: i64, update: GroupUpdate) -> Result<Option<Group>> {
        let mut group = match self.groups.get_mut(&id) {
            Some(group) => group,
            None => return Ok(None),
        };
        if let Some(name) = update.name {
            group.name = name;
        }
        if let Some(description) = update.description {
            group.description = description;
        }
        if let Some(category) = update.category {
            group.category = category;
        }
        if let Some(privacy) = update.privacy {
            group.privacy = privacy;
        }
        Ok(Some(group.clone()))
    }

    async fn delete_group(&self, id: i64) -> Result<bool> {
        if self.groups.get(&id).is_none() {
            return Ok(false);
        }
        self.purge_group(id);
        Ok(true)
    }

    async fn add_group_member(&self, new: NewGroupMember) -> Result<GroupMember> {
        let taken = self
            .group_members
            .iter()
            .any(|m| m.group_id == new.group_id && m.user_id == new.user_id);
        if taken {
            return Err(Error::AlreadyExists("group member"));
        }

        let member = GroupMember {
            id: self.alloc_id(),
            group_id: new.group_id,
            user_id: new.user_id,
            role: new.role,
            joined_at: Utc::now(),
        };
        self.group_members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn get_group_member(&self, group_id: i64, user_id: i64) -> Result<Option<GroupMember>> {
        Ok(self
            .group_members
            .iter()
            .find(|m| m.group_id == group_id && m.user_id == user_id)
            .map(|m| m.clone()))
    }

    async fn list_group_members(&self, group_id: i64) -> Result<Vec<GroupMember>> {
        let mut members: Vec<GroupMember> = self
            .group_members
            .iter()
            .filter(|m| m.group_id == group_id)
            .map(|m| m.clone())
            .collect();
        members.sort_by_key(|m| m.id);
        Ok(members)
    }

    async fn update_group_member_role(
        &self,
        group_id: i64,
        user_id: i64,
        role: GroupRole,
    ) -> Result<Option<GroupMember>> {
        match self
            .group_members
            .iter_mut()
            .find(|m| m.group_id == group_id && m.user_id == user_id)
        {
            Some(mut member) => {
                member.role = role;
                Ok(Some(member.clone()))
            }
            None => Ok(None),
        }
    }

    async fn remove_group_member(&self, group_id: i64, user_id: i64) -> Result<bool> {
        let member_id = self
            .group_members
            .iter()
            .find(|m| m.group_id == group_id && m.user_id == user_id)
            .map(|m| m.id);
        match member_id {
            Some(id) => {
                self.group_members.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_group_leaders(&self, group_id: i64) -> Result<i64> {
        Ok(self
            .group_members
            .iter()
            .filter(|m| m.group_id == group_id && m.role == GroupRole::Leader)
            .count() as i64)
    }
}

#[async_trait]
impl PrayerRequestStore for MemoryStore {
    async fn create_prayer_request(&self, new: NewPrayerRequest) -> Result<PrayerRequest> {
        let now = Utc::now();
        let request = PrayerRequest {
            id: self.alloc_id(),
            group_id: new.group_id,
            user_id: new.user_id,
            title: new.title,
            description: new.description,
            status: new.status,
            urgency: new.urgency,
            is_anonymous: new.is_anonymous,
            follow_up_date: new.follow_up_date,
            is_stale: false,
            created_at: now,
            updated_at: now,
        };
        self.prayer_requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get_prayer_request(&self, id: i64) -> Result<Option<PrayerRequest>> {
        Ok(self.prayer_requests.get(&id).map(|r| r.clone()))
    }

    async fn list_group_requests(&self, group_id: i64) -> Result<Vec<PrayerRequest>> {
        let mut requests: Vec<PrayerRequest> = self
            .prayer_requests
            .iter()
            .filter(|r| r.group_id == group_id)
            .map(|r| r.clone())
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    async fn list_user_requests(&self, user_id: i64) -> Result<Vec<PrayerRequest>> {
        let mut requests: Vec<PrayerRequest> = self
            .prayer_requests
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.clone())
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    async fn update_prayer_request(
        &self,
        id: i64,
        update: PrayerRequestUpdate,
    ) -> Result<Option<PrayerRequest>> {
        let mut request = match self.prayer_requests.get_mut(&id) {
            Some(request) => request,
            None => return Ok(None),
        };
        if let Some(title) = update.title {
            request.title = title;
        }
        if let Some(description) = update.description {
            request.description = description;
        }
        if let Some(status) = update.status {
            request.status = status;
            if status != RequestStatus::Waiting {
                request.is_stale = false;
            }
        }
        if let Some(urgency) = update.urgency {
            request.urgency = urgency;
        }
        if let Some(is_anonymous) = update.is_anonymous {
            request.is_anonymous = is_anonymous;
        }
        if let Some(follow_up_date) = update.follow_up_date {
            request.follow_up_date = follow_up_date;
        }
        request.updated_at = Utc::now();
        Ok(Some(request.clone()))
    }

    async fn delete_prayer_request(&self, id: i64) -> Result<bool> {
        if self.prayer_requests.get(&id).is_none() {
            return Ok(false);
        }
        self.purge_request(id);
        Ok(true)
    }

    async fn mark_stale_requests(&self, now: DateTime<Utc>) -> Result<Vec<PrayerRequest>> {
        let mut marked = Vec::new();
        for mut request in self.prayer_requests.iter_mut() {
            let overdue = request.status == RequestStatus::Waiting
                && !request.is_stale
                && request.follow_up_date.map_or(false, |due| due < now);
            if overdue {
                request.is_stale = true;
                marked.push(request.clone());
            }
        }
        marked.sort_by_key(|r| r.id);
        Ok(marked)
    }

    async fn create_comment(&self, new: NewComment) -> Result<Comment> {
        let comment = Comment {
            id: self.alloc_id(),
            prayer_request_id: new.prayer_request_id,
            user_id: new.user_id,
            body: new.body,
            is_private: new.is_private,
            created_at: Utc::now(),
        };
        self.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        Ok(self.comments.get(&id).map(|c| c.clone()))
    }

    async fn list_comments(&self, prayer_request_id: i64) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .comments
            .iter()
            .filter(|c| c.prayer_request_id == prayer_request_id)
            .map(|c| c.clone())
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn delete_comment(&self, id: i64) -> Result<bool> {
        Ok(self.comments.remove(&id).is_some())
    }

    async fn add_praying_for(&self, prayer_request_id: i64, user_id: i64) -> Result<PrayingFor> {
        let praying = PrayingFor {
            id: self.alloc_id(),
            prayer_request_id,
            user_id,
            timestamp: Utc::now(),
        };
        self.praying_for.insert(praying.id, praying.clone());
        Ok(praying)
    }

    async fn get_praying_for(
        &self,
        prayer_request_id: i64,
        user_id: i64,
    ) -> Result<Option<PrayingFor>> {
        Ok(self
            .praying_for
            .iter()
            .find(|p| p.prayer_request_id == prayer_request_id && p.user_id == user_id)
            .map(|p| p.clone()))
    }

    async fn list_praying_for(&self, prayer_request_id: i64) -> Result<Vec<PrayingFor>> {
        let mut rows: Vec<PrayingFor> = self
            .praying_for
            .iter()
            .filter(|p| p.prayer_request_id == prayer_request_id)
            .map(|p| p.clone())
            .collect();
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn count_praying_for(&self, prayer_request_id: i64) -> Result<i64> {
        Ok(self
            .praying_for
            .iter()
            .filter(|p| p.prayer_request_id == prayer_request_id)
            .count() as i64)
    }

    async fn remove_praying_for(&self, prayer_request_id: i64, user_id: i64) -> Result<bool> {
        let ids: Vec<i64> = self
            .praying_for
            .iter()
            .filter(|p| p.prayer_request_id == prayer_request_id && p.user_id == user_id)
            .map(|p| p.id)
            .collect();
        for id in &ids {
            self.praying_for.remove(id);
        }
        Ok(!ids.is_empty())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create_notification(&self, new: NewNotification) -> Result<Notification> {
        let notification = Notification {
            id: self.alloc_id(),
            user_id: new.user_id,
            kind: new.kind,
            message: new.message,
            reference_id: new.reference_id,
            read: false,
            created_at: Utc::now(),
        };
        self.notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn list_notifications(&self, user_id: i64) -> Result<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .map(|n| n.clone())
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(notifications)
    }

    async fn count_unread_notifications(&self, user_id: i64) -> Result<i64> {
        Ok(self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .count() as i64)
    }

    async fn mark_notification_read(&self, id: i64) -> Result<bool> {
        match self.notifications.get_mut(&id) {
            Some(mut notification) => {
                notification.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: i64) -> Result<u64> {
        let mut flipped = 0;
        for mut notification in self.notifications.iter_mut() {
            if notification.user_id == user_id && !notification.read {
                notification.read = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn delete_notification(&self, id: i64) -> Result<bool> {
        Ok(self.notifications.remove(&id).is_some())
    }
}

#[async_trait]
impl MeetingStore for MemoryStore {
    async fn create_meeting(&self, new: NewMeeting) -> Result<Meeting> {
        let meeting = Meeting {
            id: self.alloc_id(),
            group_id: new.group_id,
            title: new.title,
            description: new.description,
            meeting_type: new.meeting_type,
            meeting_link: new.meeting_link,
            start_time: new.start_time,
            end_time: new.end_time,
            is_recurring: new.is_recurring,
            recurrence: new.recurrence,
            recurrence_until: new.recurrence_until,
            created_by: new.created_by,
            created_at: Utc::now(),
        };
        self.meetings.insert(meeting.id, meeting.clone());
        Ok(meeting)
    }

    async fn get_meeting(&self, id: i64) -> Result<Option<Meeting>> {
        Ok(self.meetings.get(&id).map(|m| m.clone()))
    }

    async fn list_group_meetings(&self, group_id: i64) -> Result<Vec<Meeting>> {
        let mut meetings: Vec<Meeting> = self
            .meetings
            .iter()
            .filter(|m| m.group_id == group_id)
            .map(|m| m.clone())
            .collect();
        meetings.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(meetings)
    }

    async fn update_meeting(&self, id: i64, update: MeetingUpdate) -> Result<Option<Meeting>> {
        let mut meeting = match self.meetings.get_mut(&id) {
            Some(meeting) => meeting,
            None => return Ok(None),
        };
        if let Some(title) = update.title {
            meeting.title = title;
        }
        if let Some(description) = update.description {
            meeting.description = description;
        }
        if let Some(meeting_type) = update.meeting_type {
            meeting.meeting_type = meeting_type;
        }
        if let Some(meeting_link) = update.meeting_link {
            meeting.meeting_link = meeting_link;
        }
        if let Some(start_time) = update.start_time {
            meeting.start_time = start_time;
        }
        if let Some(end_time) = update.end_time {
            meeting.end_time = end_time;
        }
        if let Some(is_recurring) = update.is_recurring {
            meeting.is_recurring = is_recurring;
        }
        if let Some(recurrence) = update.recurrence {
            meeting.recurrence = recurrence;
        }
        if let Some(recurrence_until) = update.recurrence_until {
            meeting.recurrence_until = recurrence_until;
        }
        Ok(Some(meeting.clone()))
    }

    async fn delete_meeting(&self, id: i64) -> Result<bool> {
        if self.meetings.get(&id).is_none() {
            return Ok(false);
        }
        self.purge_meeting(id);
        Ok(true)
    }

    async fn create_meeting_note(&self, new: NewMeetingNote) -> Result<MeetingNote> {
        let note = MeetingNote {
            id: self.alloc_id(),
            meeting_id: new.meeting_id,
            content: new.content,
            summary: new.summary,
            is_ai_generated: new.is_ai_generated,
            created_at: Utc::now(),
        };
        self.meeting_notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn get_meeting_note(&self, id: i64) -> Result<Option<MeetingNote>> {
        Ok(self.meeting_notes.get(&id).map(|n| n.clone()))
    }

    async fn list_meeting_notes(&self, meeting_id: i64) -> Result<Vec<MeetingNote>> {
        let mut notes: Vec<MeetingNote> = self
            .meeting_notes
            .iter()
            .filter(|n| n.meeting_id == meeting_id)
            .map(|n| n.clone())
            .collect();
        notes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(notes)
    }

    async fn update_meeting_note(
        &self,
        id: i64,
        update: MeetingNoteUpdate,
    ) -> Result<Option<MeetingNote>> {
        let mut note = match self.meeting_notes.get_mut(&id) {
            Some(note) => note,
            None => return Ok(None),
        };
        if let Some(content) = update.content {
            note.content = content;
        }
        if let Some(summary) = update.summary {
            note.summary = summary;
        }
        Ok(Some(note.clone()))
    }

    async fn delete_meeting_note(&self, id: i64) -> Result<bool> {
        Ok(self.meeting_notes.remove(&id).is_some())
    }
}

#[async_trait]
impl PasswordResetStore for MemoryStore {
    async fn create_password_reset_token(
        &self,
        new: NewPasswordResetToken,
    ) -> Result<PasswordResetToken> {
        let taken = self
            .password_reset_tokens
            .iter()
            .any(|t| t.token == new.token);
        if taken {
            return Err(Error::AlreadyExists("password reset token"));
        }

        let token = PasswordResetToken {
            id: self.alloc_id(),
            user_id: new.user_id,
            token: new.token,
            expires_at: new.expires_at,
            is_used: false,
            created_at: Utc::now(),
        };
        self.password_reset_tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn get_password_reset_token(&self, token: &str) -> Result<Option<PasswordResetToken>> {
        Ok(self
            .password_reset_tokens
            .iter()
            .find(|t| t.token == token)
            .map(|t| t.clone()))
    }

    async fn mark_password_reset_token_used(&self, id: i64) -> Result<bool> {
        match self.password_reset_tokens.get_mut(&id) {
            Some(mut token) => {
                if token.is_used {
                    Ok(false)
                } else {
                    token.is_used = true;
                    Ok(true)
                }
            }
            None => Ok(false),
        }
    }

    async fn delete_expired_password_reset_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let expired: Vec<i64> = self
            .password_reset_tokens
            .iter()
            .filter(|t| t.expires_at < now)
            .map(|t| t.id)
            .collect();
        for id in &expired {
            self.password_reset_tokens.remove(id);
        }
        Ok(expired.len() as u64)
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn get_notification_preference(&self, user_id: i64) -> Result<NotificationPreference> {
        let preference = self
            .notification_preferences
            .entry(user_id)
            .or_insert_with(|| {
                let mut preference = NotificationPreference::default_for(user_id, Utc::now());
                preference.id = self.alloc_id();
                preference
            })
            .clone();
        Ok(preference)
    }

    async fn update_notification_preference(
        &self,
        user_id: i64,
        update: NotificationPreferenceUpdate,
    ) -> Result<NotificationPreference> {
        let mut preference = self
            .notification_preferences
            .entry(user_id)
            .or_insert_with(|| {
                let mut preference = NotificationPreference::default_for(user_id, Utc::now());
                preference.id = self.alloc_id();
                preference
            });
        if let Some(new_requests) = update.new_requests {
            preference.new_requests = new_requests;
        }
        if let Some(status_changes) = update.status_changes {
            preference.status_changes = status_changes;
        }
        if let Some(comments) = update.comments {
            preference.comments = comments;
        }
        if let Some(meetings) = update.meetings {
            preference.meetings = meetings;
        }
        if let Some(hours) = update.reminder_interval_hours {
            preference.reminder_interval_hours = hours;
        }
        preference.updated_at = Utc::now();
        Ok(preference.clone())
    }

    async fn get_group_notification_preference(
        &self,
        user_id: i64,
        group_id: i64,
    ) -> Result<GroupNotificationPreference> {
        let preference = self
            .group_notification_preferences
            .entry((user_id, group_id))
            .or_insert_with(|| {
                let mut preference =
                    GroupNotificationPreference::default_for(user_id, group_id, Utc::now());
                preference.id = self.alloc_id();
                preference
            })
            .clone();
        Ok(preference)
    }

    async fn update_group_notification_preference(
        &self,
        user_id: i64,
        group_id: i64,
        update: GroupNotificationPreferenceUpdate,
    ) -> Result<GroupNotificationPreference> {
        let mut preference = self
            .group_notification_preferences
            .entry((user_id, group_id))
            .or_insert_with(|| {
                let mut preference =
                    GroupNotificationPreference::default_for(user_id, group_id, Utc::now());
                preference.id = self.alloc_id();
                preference
            });
        if let Some(muted) = update.muted {
            preference.muted = muted;
        }
        if let Some(new_requests) = update.new_requests {
            preference.new_requests = new_requests;
        }
        if let Some(status_changes) = update.status_changes {
            preference.status_changes = status_changes;
        }
        if let Some(comments) = update.comments {
            preference.comments = comments;
        }
        if let Some(meetings) = update.meetings {
            preference.meetings = meetings;
        }
        preference.updated_at = Utc::now();
        Ok(preference.clone())
    }
}

#[async_trait]
impl TagStore for MemoryStore {
    async fn create_tag(&self, new: NewTag) -> Result<Tag> {
        if self.tags.iter().any(|t| t.name == new.name) {
            return Err(Error::AlreadyExists("tag"));
        }
        let tag = Tag {
            id: self.alloc_id(),
            name: new.name,
        };
        self.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn get_tag(&self, id: i64) -> Result<Option<Tag>> {
        Ok(self.tags.get(&id).map(|t| t.clone()))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = self.tags.iter().map(|t| t.clone()).collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(tags)
    }

    async fn add_group_tag(&self, group_id: i64, tag_id: i64) -> Result<GroupTag> {
        let taken = self
            .group_tags
            .iter()
            .any(|t| t.group_id == group_id && t.tag_id == tag_id);
        if taken {
            return Err(Error::AlreadyExists("group tag"));
        }
        let link = GroupTag {
            id: self.alloc_id(),
            group_id,
            tag_id,
        };
        self.group_tags.insert(link.id, link.clone());
        Ok(link)
    }

    async fn remove_group_tag(&self, group_id: i64, tag_id: i64) -> Result<bool> {
        let link_id = self
            .group_tags
            .iter()
            .find(|t| t.group_id == group_id && t.tag_id == tag_id)
            .map(|t| t.id);
        match link_id {
            Some(id) => {
                self.group_tags.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_group_tags(&self, group_id: i64) -> Result<Vec<Tag>> {
        let tag_ids: Vec<i64> = self
            .group_tags
            .iter()
            .filter(|t| t.group_id == group_id)
            .map(|t| t.tag_id)
            .collect();
        let mut tags: Vec<Tag> = tag_ids
            .into_iter()
            .filter_map(|id| self.tags.get(&id).map(|t| t.clone()))
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(tags)
    }

    async fn add_organization_tag(
        &self,
        organization_id: i64,
        tag_id: i64,
    ) -> Result<OrganizationTag> {
        let taken = self
            .organization_tags
            .iter()
            .any(|t| t.organization_id == organization_id && t.tag_id == tag_id);
        if taken {
            return Err(Error::AlreadyExists("organization tag"));
        }
        let link = OrganizationTag {
            id: self.alloc_id(),
            organization_id,
            tag_id,
        };
        self.organization_tags.insert(link.id, link.clone());
        Ok(link)
    }

    async fn remove_organization_tag(&self, organization_id: i64, tag_id: i64) -> Result<bool> {
        let link_id = self
            .organization_tags
            .iter()
            .find(|t| t.organization_id == organization_id && t.tag_id == tag_id)
            .map(|t| t.id);
        match link_id {
            Some(id) => {
                self.organization_tags.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_organization_tags(&self, organization_id: i64) -> Result<Vec<Tag>> {
        let tag_ids: Vec<i64> = self
            .organization_tags
            .iter()
            .filter(|t| t.organization_id == organization_id)
            .map(|t| t.tag_id)
            .collect();
        let mut tags: Vec<Tag> = tag_ids
            .into_iter()
            .filter_map(|id| self.tags.get(&id).map(|t| t.clone()))
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use koinonia_types::NotificationKind;

    fn new_user(n: u32) -> NewUser {
        NewUser {
            username: format!("user{}", n),
            email: format!("user{}@example.com", n),
            password: "hash".to_string(),
            name: format!("User {}", n),
            role: Default::default(),
        }
    }

    fn new_request(group_id: i64, user_id: i64) -> NewPrayerRequest {
        NewPrayerRequest {
            group_id,
            user_id,
            title: "Healing".to_string(),
            description: "For a friend".to_string(),
            status: Default::default(),
            urgency: Default::default(),
            is_anonymous: false,
            follow_up_date: None,
        }
    }

    #[tokio::test]
    async fn ids_are_unique_across_tables() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user(1)).await.unwrap();
        let org = store
            .create_organization(NewOrganization {
                name: "Org".to_string(),
                description: None,
                created_by: user.id,
            })
            .await
            .unwrap();
        let tag = store
            .create_tag(NewTag {
                name: "weekly".to_string(),
            })
            .await
            .unwrap();

        // One counter feeds every table, so ids never collide even across
        // entity families (the org cascade also consumed one for the member).
        let mut ids = vec![user.id, org.id, tag.id];
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert!(tag.id > org.id);
    }

    #[tokio::test]
    async fn create_request_applies_defaults() {
        let store = MemoryStore::new();
        let request = store.create_prayer_request(new_request(1, 1)).await.unwrap();

        assert_eq!(request.status, RequestStatus::Waiting);
        assert_eq!(request.urgency, koinonia_types::Urgency::Medium);
        assert!(!request.is_stale);
        assert_eq!(request.created_at, request.updated_at);

        let fetched = store.get_prayer_request(request.id).await.unwrap().unwrap();
        assert_eq!(fetched, request);
    }

    #[tokio::test]
    async fn duplicate_username_rejected() {
        let store = MemoryStore::new();
        store.create_user(new_user(1)).await.unwrap();

        let mut dup = new_user(2);
        dup.username = "user1".to_string();
        let err = store.create_user(dup).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists("user")));
    }

    #[tokio::test]
    async fn organization_creator_becomes_admin_member() {
        let store = MemoryStore::new();
        let org = store
            .create_organization(NewOrganization {
                name: "Org".to_string(),
                description: None,
                created_by: 42,
            })
            .await
            .unwrap();

        let member = store
            .get_organization_member(org.id, 42)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(member.role, OrgRole::Admin);
        assert_eq!(store.count_organization_admins(org.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn group_creator_becomes_leader() {
        let store = MemoryStore::new();
        let group = store
            .create_group(NewGroup {
                name: "Young adults".to_string(),
                description: None,
                category: "general".to_string(),
                privacy: Default::default(),
                organization_id: 1,
                created_by: 7,
            })
            .await
            .unwrap();

        let member = store.get_group_member(group.id, 7).await.unwrap().unwrap();
        assert_eq!(member.role, GroupRole::Leader);
        assert_eq!(store.count_group_leaders(group.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_group_member_rejected() {
        let store = MemoryStore::new();
        let member = NewGroupMember {
            group_id: 1,
            user_id: 2,
            role: Default::default(),
        };
        store.add_group_member(member.clone()).await.unwrap();
        let err = store.add_group_member(member).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists("group member")));
    }

    #[tokio::test]
    async fn store_accepts_duplicate_praying_for() {
        // Duplicate prevention is the service's job; the bare store inserts.
        let store = MemoryStore::new();
        store.add_praying_for(1, 2).await.unwrap();
        store.add_praying_for(1, 2).await.unwrap();
        assert_eq!(store.count_praying_for(1).await.unwrap(), 2);

        assert!(store.remove_praying_for(1, 2).await.unwrap());
        assert_eq!(store.count_praying_for(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn status_change_away_from_waiting_clears_stale() {
        let store = MemoryStore::new();
        let mut new = new_request(1, 1);
        new.follow_up_date = Some(Utc::now() - Duration::hours(2));
        let request = store.create_prayer_request(new).await.unwrap();

        let marked = store.mark_stale_requests(Utc::now()).await.unwrap();
        assert_eq!(marked.len(), 1);
        assert!(marked[0].is_stale);

        // Second sweep is a no-op.
        assert!(store.mark_stale_requests(Utc::now()).await.unwrap().is_empty());

        let updated = store
            .update_prayer_request(
                request.id,
                PrayerRequestUpdate {
                    status: Some(RequestStatus::Answered),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(!updated.is_stale);
        assert!(updated.updated_at >= request.updated_at);
    }

    #[tokio::test]
    async fn group_cascade_removes_dependents() {
        let store = MemoryStore::new();
        let group = store
            .create_group(NewGroup {
                name: "Cascade".to_string(),
                description: None,
                category: "general".to_string(),
                privacy: Default::default(),
                organization_id: 1,
                created_by: 1,
            })
            .await
            .unwrap();
        let request = store
            .create_prayer_request(new_request(group.id, 1))
            .await
            .unwrap();
        store
            .create_comment(NewComment {
                prayer_request_id: request.id,
                user_id: 2,
                body: "Praying".to_string(),
                is_private: false,
            })
            .await
            .unwrap();
        store.add_praying_for(request.id, 2).await.unwrap();
        let meeting = store
            .create_meeting(NewMeeting {
                group_id: group.id,
                title: "Tuesday".to_string(),
                description: None,
                meeting_type: Default::default(),
                meeting_link: "https://example.com/meet".to_string(),
                start_time: Utc::now(),
                end_time: None,
                is_recurring: false,
                recurrence: None,
                recurrence_until: None,
                created_by: 1,
            })
            .await
            .unwrap();
        store
            .create_meeting_note(NewMeetingNote {
                meeting_id: meeting.id,
                content: "Notes".to_string(),
                summary: None,
                is_ai_generated: false,
            })
            .await
            .unwrap();
        store
            .create_notification(NewNotification {
                user_id: 2,
                kind: NotificationKind::NewRequest,
                message: "A new request".to_string(),
                reference_id: Some(request.id),
            })
            .await
            .unwrap();
        store
            .create_notification(NewNotification {
                user_id: 2,
                kind: NotificationKind::MemberJoined,
                message: "Welcome".to_string(),
                reference_id: Some(group.id),
            })
            .await
            .unwrap();
        // Unrelated notification survives the cascade.
        store
            .create_notification(NewNotification {
                user_id: 2,
                kind: NotificationKind::General,
                message: "Unrelated".to_string(),
                reference_id: None,
            })
            .await
            .unwrap();
        store
            .get_group_notification_preference(2, group.id)
            .await
            .unwrap();

        assert!(store.delete_group(group.id).await.unwrap());

        assert!(store.get_group(group.id).await.unwrap().is_none());
        assert!(store
            .get_prayer_request(request.id)
            .await
            .unwrap()
            .is_none());
        assert!(store.list_comments(request.id).await.unwrap().is_empty());
        assert_eq!(store.count_praying_for(request.id).await.unwrap(), 0);
        assert!(store.get_meeting(meeting.id).await.unwrap().is_none());
        assert!(store.list_meeting_notes(meeting.id).await.unwrap().is_empty());
        assert!(store
            .list_group_members(group.id)
            .await
            .unwrap()
            .is_empty());

        let remaining = store.list_notifications(2).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].kind, NotificationKind::General);

        // Deleting again reports the group as gone.
        assert!(!store.delete_group(group.id).await.unwrap());
    }

    #[tokio::test]
    async fn organization_cascade_removes_owned_groups() {
        let store = MemoryStore::new();
        let org = store
            .create_organization(NewOrganization {
                name: "Org".to_string(),
                description: None,
                created_by: 1,
            })
            .await
            .unwrap();
        let group_a = store
            .create_group(NewGroup {
                name: "A".to_string(),
                description: None,
                category: "general".to_string(),
                privacy: Default::default(),
                organization_id: org.id,
                created_by: 1,
            })
            .await
            .unwrap();
        let group_b = store
            .create_group(NewGroup {
                name: "B".to_string(),
                description: None,
                category: "general".to_string(),
                privacy: Default::default(),
                organization_id: org.id,
                created_by: 1,
            })
            .await
            .unwrap();
        store
            .create_prayer_request(new_request(group_a.id, 1))
            .await
            .unwrap();

        assert!(store.delete_organization(org.id).await.unwrap());

        assert!(store.get_organization(org.id).await.unwrap().is_none());
        assert!(store.get_group(group_a.id).await.unwrap().is_none());
        assert!(store.get_group(group_b.id).await.unwrap().is_none());
        assert!(store.list_user_requests(1).await.unwrap().is_empty());
        assert!(store
            .list_organization_members(org.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn preference_rows_materialize_once() {
        let store = MemoryStore::new();
        let first = store.get_notification_preference(9).await.unwrap();
        assert!(first.new_requests && first.status_changes);
        assert_eq!(first.reminder_interval_hours, 24);

        let second = store.get_notification_preference(9).await.unwrap();
        assert_eq!(first, second);

        let updated = store
            .update_notification_preference(
                9,
                NotificationPreferenceUpdate {
                    comments: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.id, first.id);
        assert!(!updated.comments);
        assert!(!store.get_notification_preference(9).await.unwrap().comments);
    }

    #[tokio::test]
    async fn tag_links_round_trip() {
        let store = MemoryStore::new();
        let tag = store
            .create_tag(NewTag {
                name: "college".to_string(),
            })
            .await
            .unwrap();
        store.add_group_tag(3, tag.id).await.unwrap();

        let err = store.add_group_tag(3, tag.id).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists("group tag")));

        let tags = store.list_group_tags(3).await.unwrap();
        assert_eq!(tags, vec![tag.clone()]);

        assert!(store.remove_group_tag(3, tag.id).await.unwrap());
        assert!(store.list_group_tags(3).await.unwrap().is_empty());
        assert!(!store.remove_group_tag(3, tag.id).await.unwrap());
    }

    #[tokio::test]
    async fn request_deletion_keeps_other_requests() {
        let store = MemoryStore::new();
        let keep = store.create_prayer_request(new_request(1, 1)).await.unwrap();
        let drop = store.create_prayer_request(new_request(1, 2)).await.unwrap();
        store
            .create_comment(NewComment {
                prayer_request_id: drop.id,
                user_id: 1,
                body: "Standing with you".to_string(),
                is_private: false,
            })
            .await
            .unwrap();

        assert!(store.delete_prayer_request(drop.id).await.unwrap());
        assert!(store.get_prayer_request(keep.id).await.unwrap().is_some());
        assert!(store.list_comments(drop.id).await.unwrap().is_empty());
        assert!(!store.delete_prayer_request(drop.id).await.unwrap());
    }

    #[tokio::test]
    async fn notifications_unread_counts_and_bulk_read() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store
                .create_notification(NewNotification {
                    user_id: 5,
                    kind: NotificationKind::General,
                    message: format!("note {}", i),
                    reference_id: None,
                })
                .await
                .unwrap();
        }
        assert_eq!(store.count_unread_notifications(5).await.unwrap(), 3);

        let newest = store.list_notifications(5).await.unwrap();
        assert!(store.mark_notification_read(newest[0].id).await.unwrap());
        assert_eq!(store.count_unread_notifications(5).await.unwrap(), 2);

        assert_eq!(store.mark_all_notifications_read(5).await.unwrap(), 2);
        assert_eq!(store.count_unread_notifications(5).await.unwrap(), 0);
    }
}
