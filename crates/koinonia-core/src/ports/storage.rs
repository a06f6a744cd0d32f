//! Storage traits for persistence
//!
//! One trait per entity family, implemented by both the in-memory and the
//! SQLite backends with identical pre/postconditions: reads return `Ok(None)`
//! for missing ids, updates and deletes on missing ids return `Ok(None)` /
//! `Ok(false)`, and creates return the stored entity with its assigned id.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use koinonia_types::{
    Comment, Group, GroupMember, GroupNotificationPreference, GroupNotificationPreferenceUpdate,
    GroupRole, GroupTag, GroupUpdate, Meeting, MeetingNote, MeetingNoteUpdate, MeetingUpdate,
    NewComment, NewGroup, NewGroupMember, NewMeeting, NewMeetingNote, NewNotification,
    NewOrganization, NewOrganizationMember, NewPasswordResetToken, NewPrayerRequest, NewTag,
    NewUser, Notification, NotificationPreference, NotificationPreferenceUpdate, OrgRole,
    Organization, OrganizationMember, OrganizationTag, OrganizationUpdate, PasswordResetToken,
    PrayerRequest, PrayerRequestUpdate, PrayingFor, Tag, User, UserUpdate,
};

/// User store
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, new: NewUser) -> Result<User>;
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
}

/// Organization store, including organization memberships
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Creates the organization and adds the creator as an admin member.
    async fn create_organization(&self, new: NewOrganization) -> Result<Organization>;
    async fn get_organization(&self, id: i64) -> Result<Option<Organization>>;
    async fn list_organizations(&self) -> Result<Vec<Organization>>;
    async fn list_organizations_for_user(&self, user_id: i64) -> Result<Vec<Organization>>;
    async fn update_organization(
        &self,
        id: i64,
        update: OrganizationUpdate,
    ) -> Result<Option<Organization>>;
    /// Cascades into every owned group (see the group cascade) plus the
    /// organization's members, tag links, and org-scoped notifications.
    async fn delete_organization(&self, id: i64) -> Result<bool>;

    async fn add_organization_member(
        &self,
        new: NewOrganizationMember,
    ) -> Result<OrganizationMember>;
    async fn get_organization_member(
        &self,
        organization_id: i64,
        user_id: i64,
    ) -> Result<Option<OrganizationMember>>;
    async fn list_organization_members(
        &self,
        organization_id: i64,
    ) -> Result<Vec<OrganizationMember>>;
    async fn update_organization_member_role(
        &self,
        organization_id: i64,
        user_id: i64,
        role: OrgRole,
    ) -> Result<Option<OrganizationMember>>;
    async fn remove_organization_member(
        &self,
        organization_id: i64,
        user_id: i64,
    ) -> Result<bool>;
    async fn count_organization_admins(&self, organization_id: i64) -> Result<i64>;
}

/// Group store, including group memberships
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Creates the group and adds the creator as a leader member.
    async fn create_group(&self, new: NewGroup) -> Result<Group>;
    async fn get_group(&self, id: i64) -> Result<Option<Group>>;
    async fn list_groups_for_organization(&self, organization_id: i64) -> Result<Vec<Group>>;
    async fn list_groups_for_user(&self, user_id: i64) -> Result<Vec<Group>>;
    async fn update_group(&self, id: i64, update: GroupUpdate) -> Result<Option<Group>>;
    /// Removes the group and everything under it: members, prayer requests
    /// with their comments/praying-for rows, meetings with their notes, tag
    /// links, per-group preferences, and the notifications referencing any
    /// of the deleted rows.
    async fn delete_group(&self, id: i64) -> Result<bool>;

    async fn add_group_member(&self, new: NewGroupMember) -> Result<GroupMember>;
    async fn get_group_member(&self, group_id: i64, user_id: i64) -> Result<Option<GroupMember>>;
    async fn list_group_members(&self, group_id: i64) -> Result<Vec<GroupMember>>;
    async fn update_group_member_role(
        &self,
        group_id: i64,
        user_id: i64,
        role: GroupRole,
    ) -> Result<Option<GroupMember>>;
    async fn remove_group_member(&self, group_id: i64, user_id: i64) -> Result<bool>;
    async fn count_group_leaders(&self, group_id: i64) -> Result<i64>;
}

/// Prayer request store, including comments and praying-for records
#[async_trait]
pub trait PrayerRequestStore: Send + Sync {
    async fn create_prayer_request(&self, new: NewPrayerRequest) -> Result<PrayerRequest>;
    async fn get_prayer_request(&self, id: i64) -> Result<Option<PrayerRequest>>;
    async fn list_group_requests(&self, group_id: i64) -> Result<Vec<PrayerRequest>>;
    async fn list_user_requests(&self, user_id: i64) -> Result<Vec<PrayerRequest>>;
    /// Partial merge; bumps `updated_at`, and clears `is_stale` when the
    /// status moves away from `waiting`.
    async fn update_prayer_request(
        &self,
        id: i64,
        update: PrayerRequestUpdate,
    ) -> Result<Option<PrayerRequest>>;
    /// Removes the request with its comments, praying-for rows, and
    /// request-scoped notifications.
    async fn delete_prayer_request(&self, id: i64) -> Result<bool>;
    /// Flips `is_stale` on every request that is `waiting`, not yet stale,
    /// and whose follow-up date lies before `now`. Returns the flipped rows;
    /// repeated calls converge to an empty result.
    async fn mark_stale_requests(&self, now: DateTime<Utc>) -> Result<Vec<PrayerRequest>>;

    async fn create_comment(&self, new: NewComment) -> Result<Comment>;
    async fn get_comment(&self, id: i64) -> Result<Option<Comment>>;
    /// All comments for a request, privacy unfiltered; visibility is the
    /// caller's concern.
    async fn list_comments(&self, prayer_request_id: i64) -> Result<Vec<Comment>>;
    async fn delete_comment(&self, id: i64) -> Result<bool>;

    /// Inserts unconditionally; the (request, user) uniqueness check lives
    /// in the calling layer.
    async fn add_praying_for(&self, prayer_request_id: i64, user_id: i64) -> Result<PrayingFor>;
    async fn get_praying_for(
        &self,
        prayer_request_id: i64,
        user_id: i64,
    ) -> Result<Option<PrayingFor>>;
    async fn list_praying_for(&self, prayer_request_id: i64) -> Result<Vec<PrayingFor>>;
    async fn count_praying_for(&self, prayer_request_id: i64) -> Result<i64>;
    async fn remove_praying_for(&self, prayer_request_id: i64, user_id: i64) -> Result<bool>;
}

/// Notification store
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create_notification(&self, new: NewNotification) -> Result<Notification>;
    async fn list_notifications(&self, user_id: i64) -> Result<Vec<Notification>>;
    async fn count_unread_notifications(&self, user_id: i64) -> Result<i64>;
    async fn mark_notification_read(&self, id: i64) -> Result<bool>;
    async fn mark_all_notifications_read(&self, user_id: i64) -> Result<u64>;
    async fn delete_notification(&self, id: i64) -> Result<bool>;
}

/// Meeting store, including meeting notes
#[async_trait]
pub trait MeetingStore: Send + Sync {
    async fn create_meeting(&self, new: NewMeeting) -> Result<Meeting>;
    async fn get_meeting(&self, id: i64) -> Result<Option<Meeting>>;
    async fn list_group_meetings(&self, group_id: i64) -> Result<Vec<Meeting>>;
    async fn update_meeting(&self, id: i64, update: MeetingUpdate) -> Result<Option<Meeting>>;
    /// Removes the meeting, its notes, and meeting-scoped notifications.
    async fn delete_meeting(&self, id: i64) -> Result<bool>;

    async fn create_meeting_note(&self, new: NewMeetingNote) -> Result<MeetingNote>;
    async fn get_meeting_note(&self, id: i64) -> Result<Option<MeetingNote>>;
    async fn list_meeting_notes(&self, meeting_id: i64) -> Result<Vec<MeetingNote>>;
    async fn update_meeting_note(
        &self,
        id: i64,
        update: MeetingNoteUpdate,
    ) -> Result<Option<MeetingNote>>;
    async fn delete_meeting_note(&self, id: i64) -> Result<bool>;
}

/// Password reset token store
#[async_trait]
pub trait PasswordResetStore: Send + Sync {
    async fn create_password_reset_token(
        &self,
        new: NewPasswordResetToken,
    ) -> Result<PasswordResetToken>;
    async fn get_password_reset_token(&self, token: &str) -> Result<Option<PasswordResetToken>>;
    /// Returns `false` if the token is missing or already used.
    async fn mark_password_reset_token_used(&self, id: i64) -> Result<bool>;
    async fn delete_expired_password_reset_tokens(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Notification preference store
///
/// Reads materialize a default row on first access, so they never return
/// `None`.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_notification_preference(&self, user_id: i64) -> Result<NotificationPreference>;
    async fn update_notification_preference(
        &self,
        user_id: i64,
        update: NotificationPreferenceUpdate,
    ) -> Result<NotificationPreference>;
    async fn get_group_notification_preference(
        &self,
        user_id: i64,
        group_id: i64,
    ) -> Result<GroupNotificationPreference>;
    async fn update_group_notification_preference(
        &self,
        user_id: i64,
        group_id: i64,
        update: GroupNotificationPreferenceUpdate,
    ) -> Result<GroupNotificationPreference>;
}

/// Tag store, including the group/organization link rows
#[async_trait]
pub trait TagStore: Send + Sync {
    async fn create_tag(&self, new: NewTag) -> Result<Tag>;
    async fn get_tag(&self, id: i64) -> Result<Option<Tag>>;
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    async fn add_group_tag(&self, group_id: i64, tag_id: i64) -> Result<GroupTag>;
    async fn remove_group_tag(&self, group_id: i64, tag_id: i64) -> Result<bool>;
    async fn list_group_tags(&self, group_id: i64) -> Result<Vec<Tag>>;

    async fn add_organization_tag(&self, organization_id: i64, tag_id: i64)
        -> Result<OrganizationTag>;
    async fn remove_organization_tag(&self, organization_id: i64, tag_id: i64) -> Result<bool>;
    async fn list_organization_tags(&self, organization_id: i64) -> Result<Vec<Tag>>;
}

/// The full capability interface a backend must provide
///
/// Selected once at process start; callers hold `Arc<dyn Storage>` and stay
/// backend-agnostic.
pub trait Storage:
    UserStore
    + OrganizationStore
    + GroupStore
    + PrayerRequestStore
    + NotificationStore
    + MeetingStore
    + PasswordResetStore
    + PreferenceStore
    + TagStore
{
}

impl<T> Storage for T where
    T: UserStore
        + OrganizationStore
        + GroupStore
        + PrayerRequestStore
        + NotificationStore
        + MeetingStore
        + PasswordResetStore
        + PreferenceStore
        + TagStore
{
}
