//! SQLite storage backend (embedded, no external database)
//!
//! Schema lives in inline `CREATE TABLE IF NOT EXISTS` migrations. Enum
//! columns are stored as their wire strings and parsed permissively on the
//! way out: an unrecognized value logs a warning and falls back to the
//! enum's default instead of failing the read. The three cascade deletes
//! each run inside a single transaction.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use tracing::warn;

use async_trait::async_trait;
use koinonia_core::ports::{
    GroupStore, MeetingStore, NotificationStore, OrganizationStore, PasswordResetStore,
    PrayerRequestStore, PreferenceStore, TagStore, UserStore,
};
use koinonia_core::{Error, Result};
use koinonia_types::{
    Comment, Group, GroupMember, GroupNotificationPreference, GroupNotificationPreferenceUpdate,
    GroupPrivacy, GroupRole, GroupTag, GroupUpdate, Meeting, MeetingKind, MeetingNote,
    MeetingNoteUpdate, MeetingUpdate, NewComment, NewGroup, NewGroupMember, NewMeeting,
    NewMeetingNote, NewNotification, NewOrganization, NewOrganizationMember,
    NewPasswordResetToken, NewPrayerRequest, NewTag, NewUser, Notification, NotificationKind,
    NotificationPreference, NotificationPreferenceUpdate, OrgRole, Organization,
    OrganizationMember, OrganizationTag, OrganizationUpdate, PasswordResetToken, PrayerRequest,
    PrayerRequestUpdate, PrayingFor, Recurrence, RequestStatus, Tag, Urgency, User, UserRole,
    UserUpdate,
};

pub struct Database {
    pool: Arc<SqlitePool>,
}

impl Database {
    pub async fn new(database_path: &str) -> Result<Self> {
        tracing::info!("Opening SQLite database at: {}", database_path);

        if let Some(parent) = std::path::Path::new(database_path).parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        tracing::info!("SQLite connection established, running migrations...");
        Self::run_migrations(&pool).await?;
        tracing::info!("Database initialization complete");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password TEXT NOT NULL,
                name TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'regular',
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS organizations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                created_by INTEGER NOT NULL,
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS organization_members (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                organization_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                role TEXT NOT NULL DEFAULT 'member',
                joined_at DATETIME NOT NULL,
                UNIQUE(organization_id, user_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                category TEXT NOT NULL,
                privacy TEXT NOT NULL DEFAULT 'open',
                organization_id INTEGER NOT NULL,
                created_by INTEGER NOT NULL,
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS group_members (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                role TEXT NOT NULL DEFAULT 'member',
                joined_at DATETIME NOT NULL,
                UNIQUE(group_id, user_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prayer_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'waiting',
                urgency TEXT NOT NULL DEFAULT 'medium',
                is_anonymous INTEGER NOT NULL DEFAULT 0,
                follow_up_date DATETIME,
                is_stale INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prayer_request_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                body TEXT NOT NULL,
                is_private INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS praying_for (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prayer_request_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                timestamp DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                kind TEXT NOT NULL DEFAULT 'general',
                message TEXT NOT NULL,
                reference_id INTEGER,
                read INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS meetings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                meeting_type TEXT NOT NULL DEFAULT 'virtual',
                meeting_link TEXT NOT NULL,
                start_time DATETIME NOT NULL,
                end_time DATETIME,
                is_recurring INTEGER NOT NULL DEFAULT 0,
                recurrence TEXT,
                recurrence_until DATETIME,
                created_by INTEGER NOT NULL,
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS meeting_notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                meeting_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                summary TEXT,
                is_ai_generated INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS password_reset_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                token TEXT UNIQUE NOT NULL,
                expires_at DATETIME NOT NULL,
                is_used INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notification_preferences (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER UNIQUE NOT NULL,
                new_requests INTEGER NOT NULL DEFAULT 1,
                status_changes INTEGER NOT NULL DEFAULT 1,
                comments INTEGER NOT NULL DEFAULT 1,
                meetings INTEGER NOT NULL DEFAULT 1,
                reminder_interval_hours INTEGER NOT NULL DEFAULT 24,
                updated_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS group_notification_preferences (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                group_id INTEGER NOT NULL,
                muted INTEGER NOT NULL DEFAULT 0,
                new_requests INTEGER NOT NULL DEFAULT 1,
                status_changes INTEGER NOT NULL DEFAULT 1,
                comments INTEGER NOT NULL DEFAULT 1,
                meetings INTEGER NOT NULL DEFAULT 1,
                updated_at DATETIME NOT NULL,
                UNIQUE(user_id, group_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS group_tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                UNIQUE(group_id, tag_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS organization_tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                organization_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                UNIQUE(organization_id, tag_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Deletes a request with its comments, praying-for rows and
    /// request-scoped notifications. Runs inside the caller's transaction.
    async fn delete_request_tx(tx: &mut Transaction<'_, Sqlite>, id: i64) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM prayer_requests WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        if row.is_none() {
            return Ok(false);
        }

        sqlx::query("DELETE FROM comments WHERE prayer_request_id = ?1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        sqlx::query("DELETE FROM praying_for WHERE prayer_request_id = ?1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        sqlx::query(
            r#"
            DELETE FROM notifications
            WHERE reference_id = ?1
              AND kind IN ('new_request', 'status_change', 'new_comment', 'praying_for', 'follow_up_due')
            "#,
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;
        sqlx::query("DELETE FROM prayer_requests WHERE id = ?1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(true)
    }

    /// Deletes a meeting with its notes and meeting-scoped notifications.
    async fn delete_meeting_tx(tx: &mut Transaction<'_, Sqlite>, id: i64) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM meetings WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        if row.is_none() {
            return Ok(false);
        }

        sqlx::query("DELETE FROM meeting_notes WHERE meeting_id = ?1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        sqlx::query(
            r#"
            DELETE FROM notifications
            WHERE reference_id = ?1
              AND kind IN ('meeting_scheduled', 'meeting_updated', 'meeting_cancelled')
            "#,
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;
        sqlx::query("DELETE FROM meetings WHERE id = ?1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(true)
    }

    /// Deletes a group and everything under it.
    async fn delete_group_tx(tx: &mut Transaction<'_, Sqlite>, id: i64) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM groups WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        if row.is_none() {
            return Ok(false);
        }

        let request_ids: Vec<(i64,)> =
            sqlx::query_as("SELECT id FROM prayer_requests WHERE group_id = ?1")
                .bind(id)
                .fetch_all(&mut **tx)
                .await?;
        for (request_id,) in request_ids {
            Self::delete_request_tx(tx, request_id).await?;
        }

        let meeting_ids: Vec<(i64,)> =
            sqlx::query_as("SELECT id FROM meetings WHERE group_id = ?1")
                .bind(id)
                .fetch_all(&mut **tx)
                .await?;
        for (meeting_id,) in meeting_ids {
            Self::delete_meeting_tx(tx, meeting_id).await?;
        }

        sqlx::query("DELETE FROM group_members WHERE group_id = ?1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        sqlx::query("DELETE FROM group_tags WHERE group_id = ?1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        sqlx::query("DELETE FROM group_notification_preferences WHERE group_id = ?1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        sqlx::query("DELETE FROM notifications WHERE reference_id = ?1 AND kind = 'member_joined'")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        sqlx::query("DELETE FROM groups WHERE id = ?1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(true)
    }
}

#[async_trait]
impl UserStore for Database {
    async fn create_user(&self, new: NewUser) -> Result<User> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password, name, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password)
        .bind(&new.name)
        .bind(new.role.as_str())
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::from_write("user", e))?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: new.username,
            email: new.email,
            password: new.password,
            name: new.name,
            role: new.role,
            created_at: now,
        })
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, email, password, name, role, created_at
            FROM users WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.map(|r| r.into()))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, email, password, name, role, created_at
            FROM users WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.map(|r| r.into()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, email, password, name, role, created_at
            FROM users WHERE email = ?1
            "#,
        )
        .bind(email)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.map(|r| r.into()))
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<Option<User>> {
        let mut user = match self.get_user(id).await? {
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

        sqlx::query(
            r#"
            UPDATE users SET username = ?1, email = ?2, password = ?3, name = ?4, role = ?5
            WHERE id = ?6
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(id)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::from_write("user", e))?;

        Ok(Some(user))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, email, password, name, role, created_at
            FROM users ORDER BY id
            "#,
        )
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

#[async_trait]
impl OrganizationStore for Database {
    async fn create_organization(&self, new: NewOrganization) -> Result<Organization> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO organizations (name, description, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.created_by)
        .bind(now)
        .execute(&*self.pool)
        .await?;
        let organization_id = result.last_insert_rowid();

        sqlx::query(
            r#"
            INSERT INTO organization_members (organization_id, user_id, role, joined_at)
            VALUES (?1, ?2, 'admin', ?3)
            "#,
        )
        .bind(organization_id)
        .bind(new.created_by)
        .bind(now)
        .execute(&*self.pool)
        .await?;

        Ok(Organization {
            id: organization_id,
            name: new.name,
            description: new.description,
            created_by: new.created_by,
            created_at: now,
        })
    }

    async fn get_organization(&self, id: i64) -> Result<Option<Organization>> {
        let row: Option<OrganizationRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, created_by, created_at
            FROM organizations WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.map(|r| r.into()))
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        let rows: Vec<OrganizationRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, created_by, created_at
            FROM organizations ORDER BY id
            "#,
        )
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn list_organizations_for_user(&self, user_id: i64) -> Result<Vec<Organization>> {
        let rows: Vec<OrganizationRow> = sqlx::query_as(
            r#"
            SELECT o.id, o.name, o.description, o.created_by, o.created_at
            FROM organizations o
            JOIN organization_members m ON m.organization_id = o.id
            WHERE m.user_id = ?1
            ORDER BY o.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn update_organization(
        &self,
        id: i64,
        update: OrganizationUpdate,
    ) -> Result<Option<Organization>> {
        let mut organization = match self.get_organization(id).await? {
            Some(organization) => organization,
            None => return Ok(None),
        };
        if let Some(name) = update.name {
            organization.name = name;
        }
        if let Some(description) = update.description {
            organization.description = description;
        }

        sqlx::query("UPDATE organizations SET name = ?1, description = ?2 WHERE id = ?3")
            .bind(&organization.name)
            .bind(&organization.description)
            .bind(id)
            .execute(&*self.pool)
            .await?;
        Ok(Some(organization))
    }

    async fn delete_organization(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM organizations WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if row.is_none() {
            return Ok(false);
        }

        let group_ids: Vec<(i64,)> =
            sqlx::query_as("SELECT id FROM groups WHERE organization_id = ?1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        for (group_id,) in group_ids {
            Self::delete_group_tx(&mut tx, group_id).await?;
        }

        sqlx::query("DELETE FROM organization_members WHERE organization_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM organization_tags WHERE organization_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "DELETE FROM notifications WHERE reference_id = ?1 AND kind = 'org_member_joined'",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM organizations WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn add_organization_member(
        &self,
        new: NewOrganizationMember,
    ) -> Result<OrganizationMember> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO organization_members (organization_id, user_id, role, joined_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(new.organization_id)
        .bind(new.user_id)
        .bind(new.role.as_str())
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::from_write("organization member", e))?;

        Ok(OrganizationMember {
            id: result.last_insert_rowid(),
            organization_id: new.organization_id,
            user_id: new.user_id,
            role: new.role,
            joined_at: now,
        })
    }

    async fn get_organization_member(
        &self,
        organization_id: i64,
        user_id: i64,
    ) -> Result<Option<OrganizationMember>> {
        let row: Option<OrganizationMemberRow> = sqlx::query_as(
            r#"
            SELECT id, organization_id, user_id, role, joined_at
            FROM organization_members WHERE organization_id = ?1 AND user_id = ?2
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.map(|r| r.into()))
    }

    async fn list_organization_members(
        &self,
        organization_id: i64,
    ) -> Result<Vec<OrganizationMember>> {
        let rows: Vec<OrganizationMemberRow> = sqlx::query_as(
            r#"
            SELECT id, organization_id, user_id, role, joined_at
            FROM organization_members WHERE organization_id = ?1 ORDER BY id
            "#,
        )
        .bind(organization_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn update_organization_member_role(
        &self,
        organization_id: i64,
        user_id: i64,
        role: OrgRole,
    ) -> Result<Option<OrganizationMember>> {
        let result = sqlx::query(
            r#"
            UPDATE organization_members SET role = ?1
            WHERE organization_id = ?2 AND user_id = ?3
            "#,
        )
        .bind(role.as_str())
        .bind(organization_id)
        .bind(user_id)
        .execute(&*self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_organization_member(organization_id, user_id).await
    }

    async fn remove_organization_member(
        &self,
        organization_id: i64,
        user_id: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM organization_members WHERE organization_id = ?1 AND user_id = ?2",
        )
        .bind(organization_id)
        .bind(user_id)
        .execute(&*self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_organization_admins(&self, organization_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM organization_members
            WHERE organization_id = ?1 AND role = 'admin'
            "#,
        )
        .bind(organization_id)
        .fetch_one(&*self.pool)
        .await?;
        Ok(count)
    }
}

#[async_trait]
impl GroupStore for Database {
    async fn create_group(&self, new: NewGroup) -> Result<Group> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO groups (name, description, category, privacy, organization_id, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.category)
        .bind(new.privacy.as_str())
        .bind(new.organization_id)
        .bind(new.created_by)
        .bind(now)
        .execute(&*self.pool)
        .await?;
        let group_id = result.last_insert_rowid();

        sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id, role, joined_at)
            VALUES (?1, ?2, 'leader', ?3)
            "#,
        )
        .bind(group_id)
        .bind(new.created_by)
        .bind(now)
        .execute(&*self.pool)
        .await?;

        Ok(Group {
            id: group_id,
            name: new.name,
            description: new.description,
            category: new.category,
            privacy: new.privacy,
            organization_id: new.organization_id,
            created_by: new.created_by,
            created_at: now,
        })
    }

    async fn get_group(&self, id: i64) -> Result<Option<Group>> {
        let row: Option<GroupRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, category, privacy, organization_id, created_by, created_at
            FROM groups WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.map(|r| r.into()))
    }

    async fn list_groups_for_organization(&self, organization_id: i64) -> Result<Vec<Group>> {
        let rows: Vec<GroupRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, category, privacy, organization_id, created_by, created_at
            FROM groups WHERE organization_id = ?1 ORDER BY id
            "#,
        )
        .bind(organization_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn list_groups_for_user(&self, user_id: i64) -> Result<Vec<Group>> {
        let rows: Vec<GroupRow> = sqlx::query_as(
            r#"
            SELECT g.id, g.name, g.description, g.category, g.privacy, g.organization_id, g.created_by, g.created_at
            FROM groups g
            JOIN group_members m ON m.group_id = g.id
            WHERE m.user_id = ?1
            ORDER BY g.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn update_group(&self, id: i64, update: GroupUpdate) -> Result<Option<Group>> {
        let mut group = match self.get_group(id).await? {
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

        sqlx::query(
            r#"
            UPDATE groups SET name = ?1, description = ?2, category = ?3, privacy = ?4
            WHERE id = ?5
            "#,
        )
        .bind(&group.name)
        .bind(&group.description)
        .bind(&group.category)
        .bind(group.privacy.as_str())
        .bind(id)
        .execute(&*self.pool)
        .await?;
        Ok(Some(group))
    }

    async fn delete_group(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = Self::delete_group_tx(&mut tx, id).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn add_group_member(&self, new: NewGroupMember) -> Result<GroupMember> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id, role, joined_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(new.group_id)
        .bind(new.user_id)
        .bind(new.role.as_str())
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::from_write("group member", e))?;

        Ok(GroupMember {
            id: result.last_insert_rowid(),
            group_id: new.group_id,
            user_id: new.user_id,
            role: new.role,
            joined_at: now,
        })
    }

    async fn get_group_member(&self, group_id: i64, user_id: i64) -> Result<Option<GroupMember>> {
        let row: Option<GroupMemberRow> = sqlx::query_as(
            r#"
            SELECT id, group_id, user_id, role, joined_at
            FROM group_members WHERE group_id = ?1 AND user_id = ?2
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.map(|r| r.into()))
    }

    async fn list_group_members(&self, group_id: i64) -> Result<Vec<GroupMember>> {
        let rows: Vec<GroupMemberRow> = sqlx::query_as(
            r#"
            SELECT id, group_id, user_id, role, joined_at
            FROM group_members WHERE group_id = ?1 ORDER BY id
            "#,
        )
        .bind(group_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn update_group_member_role(
        &self,
        group_id: i64,
        user_id: i64,
        role: GroupRole,
    ) -> Result<Option<GroupMember>> {
        let result = sqlx::query(
            "UPDATE group_members SET role = ?1 WHERE group_id = ?2 AND user_id = ?3",
        )
        .bind(role.as_str())
        .bind(group_id)
        .bind(user_id)
        .execute(&*self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_group_member(group_id, user_id).await
    }

    async fn remove_group_member(&self, group_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2")
            .bind(group_id)
            .bind(user_id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_group_leaders(&self, group_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM group_members WHERE group_id = ?1 AND role = 'leader'",
        )
        .bind(group_id)
        .fetch_one(&*self.pool)
        .await?;
        Ok(count)
    }
}

#[async_trait]
impl PrayerRequestStore for Database {
    async fn create_prayer_request(&self, new: NewPrayerRequest) -> Result<PrayerRequest> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO prayer_requests
                (group_id, user_id, title, description, status, urgency, is_anonymous,
                 follow_up_date, is_stale, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10)
            "#,
        )
        .bind(new.group_id)
        .bind(new.user_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.status.as_str())
        .bind(new.urgency.as_str())
        .bind(new.is_anonymous)
        .bind(new.follow_up_date)
        .bind(now)
        .bind(now)
        .execute(&*self.pool)
        .await?;

        Ok(PrayerRequest {
            id: result.last_insert_rowid(),
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
        })
    }

    async fn get_prayer_request(&self, id: i64) -> Result<Option<PrayerRequest>> {
        let row: Option<PrayerRequestRow> = sqlx::query_as(
            r#"
            SELECT id, group_id, user_id, title, description, status, urgency,
                   is_anonymous, follow_up_date, is_stale, created_at, updated_at
            FROM prayer_requests WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.map(|r| r.into()))
    }

    async fn list_group_requests(&self, group_id: i64) -> Result<Vec<PrayerRequest>> {
        let rows: Vec<PrayerRequestRow> = sqlx::query_as(
            r#"
            SELECT id, group_id, user_id, title, description, status, urgency,
                   is_anonymous, follow_up_date, is_stale, created_at, updated_at
            FROM prayer_requests WHERE group_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(group_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn list_user_requests(&self, user_id: i64) -> Result<Vec<PrayerRequest>> {
        let rows: Vec<PrayerRequestRow> = sqlx::query_as(
            r#"
            SELECT id, group_id, user_id, title, description, status, urgency,
                   is_anonymous, follow_up_date, is_stale, created_at, updated_at
            FROM prayer_requests WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn update_prayer_request(
        &self,
        id: i64,
        update: PrayerRequestUpdate,
    ) -> Result<Option<PrayerRequest>> {
        let mut request = match self.get_prayer_request(id).await? {
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

        sqlx::query(
            r#"
            UPDATE prayer_requests
            SET title = ?1, description = ?2, status = ?3, urgency = ?4, is_anonymous = ?5,
                follow_up_date = ?6, is_stale = ?7, updated_at = ?8
            WHERE id = ?9
            "#,
        )
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.status.as_str())
        .bind(request.urgency.as_str())
        .bind(request.is_anonymous)
        .bind(request.follow_up_date)
        .bind(request.is_stale)
        .bind(request.updated_at)
        .bind(id)
        .execute(&*self.pool)
        .await?;
        Ok(Some(request))
    }

    async fn delete_prayer_request(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = Self::delete_request_tx(&mut tx, id).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn mark_stale_requests(&self, now: DateTime<Utc>) -> Result<Vec<PrayerRequest>> {
        let rows: Vec<PrayerRequestRow> = sqlx::query_as(
            r#"
            SELECT id, group_id, user_id, title, description, status, urgency,
                   is_anonymous, follow_up_date, is_stale, created_at, updated_at
            FROM prayer_requests
            WHERE status = 'waiting' AND is_stale = 0
              AND follow_up_date IS NOT NULL AND follow_up_date < ?1
            ORDER BY id
            "#,
        )
        .bind(now)
        .fetch_all(&*self.pool)
        .await?;

        let mut marked = Vec::with_capacity(rows.len());
        for row in rows {
            // Guarded flip: when sweeps overlap, each row is flipped and
            // returned by exactly one of them.
            let result =
                sqlx::query("UPDATE prayer_requests SET is_stale = 1 WHERE id = ?1 AND is_stale = 0")
                    .bind(row.id)
                    .execute(&*self.pool)
                    .await?;
            if result.rows_affected() == 0 {
                continue;
            }
            let mut request: PrayerRequest = row.into();
            request.is_stale = true;
            marked.push(request);
        }
        Ok(marked)
    }

    async fn create_comment(&self, new: NewComment) -> Result<Comment> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO comments (prayer_request_id, user_id, body, is_private, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(new.prayer_request_id)
        .bind(new.user_id)
        .bind(&new.body)
        .bind(new.is_private)
        .bind(now)
        .execute(&*self.pool)
        .await?;

        Ok(Comment {
            id: result.last_insert_rowid(),
            prayer_request_id: new.prayer_request_id,
            user_id: new.user_id,
            body: new.body,
            is_private: new.is_private,
            created_at: now,
        })
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        let row: Option<CommentRow> = sqlx::query_as(
            r#"
            SELECT id, prayer_request_id, user_id, body, is_private, created_at
            FROM comments WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.map(|r| r.into()))
    }

    async fn list_comments(&self, prayer_request_id: i64) -> Result<Vec<Comment>> {
        let rows: Vec<CommentRow> = sqlx::query_as(
            r#"
            SELECT id, prayer_request_id, user_id, body, is_private, created_at
            FROM comments WHERE prayer_request_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(prayer_request_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn delete_comment(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?1")
            .bind(id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_praying_for(&self, prayer_request_id: i64, user_id: i64) -> Result<PrayingFor> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO praying_for (prayer_request_id, user_id, timestamp)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(prayer_request_id)
        .bind(user_id)
        .bind(now)
        .execute(&*self.pool)
        .await?;

        Ok(PrayingFor {
            id: result.last_insert_rowid(),
            prayer_request_id,
            user_id,
            timestamp: now,
        })
    }

    async fn get_praying_for(
        &self,
        prayer_request_id: i64,
        user_id: i64,
    ) -> Result<Option<PrayingFor>> {
        let row: Option<PrayingForRow> = sqlx::query_as(
            r#"
            SELECT id, prayer_request_id, user_id, timestamp
            FROM praying_for WHERE prayer_request_id = ?1 AND user_id = ?2
            LIMIT 1
            "#,
        )
        .bind(prayer_request_id)
        .bind(user_id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.map(|r| r.into()))
    }

    async fn list_praying_for(&self, prayer_request_id: i64) -> Result<Vec<PrayingFor>> {
        let rows: Vec<PrayingForRow> = sqlx::query_as(
            r#"
            SELECT id, prayer_request_id, user_id, timestamp
            FROM praying_for WHERE prayer_request_id = ?1
            ORDER BY timestamp, id
            "#,
        )
        .bind(prayer_request_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn count_praying_for(&self, prayer_request_id: i64) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM praying_for WHERE prayer_request_id = ?1")
                .bind(prayer_request_id)
                .fetch_one(&*self.pool)
                .await?;
        Ok(count)
    }

    async fn remove_praying_for(&self, prayer_request_id: i64, user_id: i64) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM praying_for WHERE prayer_request_id = ?1 AND user_id = ?2")
                .bind(prayer_request_id)
                .bind(user_id)
                .execute(&*self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl NotificationStore for Database {
    async fn create_notification(&self, new: NewNotification) -> Result<Notification> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, message, reference_id, read, created_at)
            VALUES (?1, ?2, ?3, ?4, 0, ?5)
            "#,
        )
        .bind(new.user_id)
        .bind(new.kind.as_str())
        .bind(&new.message)
        .bind(new.reference_id)
        .bind(now)
        .execute(&*self.pool)
        .await?;

        Ok(Notification {
            id: result.last_insert_rowid(),
            user_id: new.user_id,
            kind: new.kind,
            message: new.message,
            reference_id: new.reference_id,
            read: false,
            created_at: now,
        })
    }

    async fn list_notifications(&self, user_id: i64) -> Result<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, kind, message, reference_id, read, created_at
            FROM notifications WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn count_unread_notifications(&self, user_id: i64) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read = 0")
                .bind(user_id)
                .fetch_one(&*self.pool)
                .await?;
        Ok(count)
    }

    async fn mark_notification_read(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ?1")
            .bind(id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_notifications_read(&self, user_id: i64) -> Result<u64> {
        let result =
            sqlx::query("UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0")
                .bind(user_id)
                .execute(&*self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn delete_notification(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?1")
            .bind(id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl MeetingStore for Database {
    async fn create_meeting(&self, new: NewMeeting) -> Result<Meeting> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO meetings
                (group_id, title, description, meeting_type, meeting_link, start_time,
                 end_time, is_recurring, recurrence, recurrence_until, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(new.group_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.meeting_type.as_str())
        .bind(&new.meeting_link)
        .bind(new.start_time)
        .bind(new.end_time)
        .bind(new.is_recurring)
        .bind(new.recurrence.map(|r| r.as_str()))
        .bind(new.recurrence_until)
        .bind(new.created_by)
        .bind(now)
        .execute(&*self.pool)
        .await?;

        Ok(Meeting {
            id: result.last_insert_rowid(),
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
            created_at: now,
        })
    }

    async fn get_meeting(&self, id: i64) -> Result<Option<Meeting>> {
        let row: Option<MeetingRow> = sqlx::query_as(
            r#"
            SELECT id, group_id, title, description, meeting_type, meeting_link, start_time,
                   end_time, is_recurring, recurrence, recurrence_until, created_by, created_at
            FROM meetings WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.map(|r| r.into()))
    }

    async fn list_group_meetings(&self, group_id: i64) -> Result<Vec<Meeting>> {
        let rows: Vec<MeetingRow> = sqlx::query_as(
            r#"
            SELECT id, group_id, title, description, meeting_type, meeting_link, start_time,
                   end_time, is_recurring, recurrence, recurrence_until, created_by, created_at
            FROM meetings WHERE group_id = ?1
            ORDER BY start_time, id
            "#,
        )
        .bind(group_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn update_meeting(&self, id: i64, update: MeetingUpdate) -> Result<Option<Meeting>> {
        let mut meeting = match self.get_meeting(id).await? {
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

        sqlx::query(
            r#"
            UPDATE meetings
            SET title = ?1, description = ?2, meeting_type = ?3, meeting_link = ?4,
                start_time = ?5, end_time = ?6, is_recurring = ?7, recurrence = ?8,
                recurrence_until = ?9
            WHERE id = ?10
            "#,
        )
        .bind(&meeting.title)
        .bind(&meeting.description)
        .bind(meeting.meeting_type.as_str())
        .bind(&meeting.meeting_link)
        .bind(meeting.start_time)
        .bind(meeting.end_time)
        .bind(meeting.is_recurring)
        .bind(meeting.recurrence.map(|r| r.as_str()))
        .bind(meeting.recurrence_until)
        .bind(id)
        .execute(&*self.pool)
        .await?;
        Ok(Some(meeting))
    }

    async fn delete_meeting(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = Self::delete_meeting_tx(&mut tx, id).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn create_meeting_note(&self, new: NewMeetingNote) -> Result<MeetingNote> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO meeting_notes (meeting_id, content, summary, is_ai_generated, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(new.meeting_id)
        .bind(&new.content)
        .bind(&new.summary)
        .bind(new.is_ai_generated)
        .bind(now)
        .execute(&*self.pool)
        .await?;

        Ok(MeetingNote {
            id: result.last_insert_rowid(),
            meeting_id: new.meeting_id,
            content: new.content,
            summary: new.summary,
            is_ai_generated: new.is_ai_generated,
            created_at: now,
        })
    }

    async fn get_meeting_note(&self, id: i64) -> Result<Option<MeetingNote>> {
        let row: Option<MeetingNoteRow> = sqlx::query_as(
            r#"
            SELECT id, meeting_id, content, summary, is_ai_generated, created_at
            FROM meeting_notes WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.map(|r| r.into()))
    }

    async fn list_meeting_notes(&self, meeting_id: i64) -> Result<Vec<MeetingNote>> {
        let rows: Vec<MeetingNoteRow> = sqlx::query_as(
            r#"
            SELECT id, meeting_id, content, summary, is_ai_generated, created_at
            FROM meeting_notes WHERE meeting_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(meeting_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn update_meeting_note(
        &self,
        id: i64,
        update: MeetingNoteUpdate,
    ) -> Result<Option<MeetingNote>> {
        let mut note = match self.get_meeting_note(id).await? {
            Some(note) => note,
            None => return Ok(None),
        };
        if let Some(content) = update.content {
            note.content = content;
        }
        if let Some(summary) = update.summary {
            note.summary = summary;
        }

        sqlx::query("UPDATE meeting_notes SET content = ?1, summary = ?2 WHERE id = ?3")
            .bind(&note.content)
            .bind(&note.summary)
            .bind(id)
            .execute(&*self.pool)
            .await?;
        Ok(Some(note))
    }

    async fn delete_meeting_note(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM meeting_notes WHERE id = ?1")
            .bind(id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PasswordResetStore for Database {
    async fn create_password_reset_token(
        &self,
        new: NewPasswordResetToken,
    ) -> Result<PasswordResetToken> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (user_id, token, expires_at, is_used, created_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            "#,
        )
        .bind(new.user_id)
        .bind(&new.token)
        .bind(new.expires_at)
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::from_write("password reset token", e))?;

        Ok(PasswordResetToken {
            id: result.last_insert_rowid(),
            user_id: new.user_id,
            token: new.token,
            expires_at: new.expires_at,
            is_used: false,
            created_at: now,
        })
    }

    async fn get_password_reset_token(&self, token: &str) -> Result<Option<PasswordResetToken>> {
        let row: Option<PasswordResetTokenRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, token, expires_at, is_used, created_at
            FROM password_reset_tokens WHERE token = ?1
            "#,
        )
        .bind(token)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.map(|r| r.into()))
    }

    async fn mark_password_reset_token_used(&self, id: i64) -> Result<bool> {
        let result =
            sqlx::query("UPDATE password_reset_tokens SET is_used = 1 WHERE id = ?1 AND is_used = 0")
                .bind(id)
                .execute(&*self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_password_reset_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < ?1")
            .bind(now)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PreferenceStore for Database {
    async fn get_notification_preference(&self, user_id: i64) -> Result<NotificationPreference> {
        // Lazy materialization; OR IGNORE makes concurrent first reads safe.
        sqlx::query(
            "INSERT OR IGNORE INTO notification_preferences (user_id, updated_at) VALUES (?1, ?2)",
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(&*self.pool)
        .await?;

        let row: NotificationPreferenceRow = sqlx::query_as(
            r#"
            SELECT id, user_id, new_requests, status_changes, comments, meetings,
                   reminder_interval_hours, updated_at
            FROM notification_preferences WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_one(&*self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_notification_preference(
        &self,
        user_id: i64,
        update: NotificationPreferenceUpdate,
    ) -> Result<NotificationPreference> {
        let mut preference = self.get_notification_preference(user_id).await?;
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

        sqlx::query(
            r#"
            UPDATE notification_preferences
            SET new_requests = ?1, status_changes = ?2, comments = ?3, meetings = ?4,
                reminder_interval_hours = ?5, updated_at = ?6
            WHERE user_id = ?7
            "#,
        )
        .bind(preference.new_requests)
        .bind(preference.status_changes)
        .bind(preference.comments)
        .bind(preference.meetings)
        .bind(preference.reminder_interval_hours)
        .bind(preference.updated_at)
        .bind(user_id)
        .execute(&*self.pool)
        .await?;
        Ok(preference)
    }

    async fn get_group_notification_preference(
        &self,
        user_id: i64,
        group_id: i64,
    ) -> Result<GroupNotificationPreference> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO group_notification_preferences (user_id, group_id, updated_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .bind(Utc::now())
        .execute(&*self.pool)
        .await?;

        let row: GroupNotificationPreferenceRow = sqlx::query_as(
            r#"
            SELECT id, user_id, group_id, muted, new_requests, status_changes, comments,
                   meetings, updated_at
            FROM group_notification_preferences WHERE user_id = ?1 AND group_id = ?2
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_one(&*self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_group_notification_preference(
        &self,
        user_id: i64,
        group_id: i64,
        update: GroupNotificationPreferenceUpdate,
    ) -> Result<GroupNotificationPreference> {
        let mut preference = self
            .get_group_notification_preference(user_id, group_id)
            .await?;
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

        sqlx::query(
            r#"
            UPDATE group_notification_preferences
            SET muted = ?1, new_requests = ?2, status_changes = ?3, comments = ?4,
                meetings = ?5, updated_at = ?6
            WHERE user_id = ?7 AND group_id = ?8
            "#,
        )
        .bind(preference.muted)
        .bind(preference.new_requests)
        .bind(preference.status_changes)
        .bind(preference.comments)
        .bind(preference.meetings)
        .bind(preference.updated_at)
        .bind(user_id)
        .bind(group_id)
        .execute(&*self.pool)
        .await?;
        Ok(preference)
    }
}

#[async_trait]
impl TagStore for Database {
    async fn create_tag(&self, new: NewTag) -> Result<Tag> {
        let result = sqlx::query("INSERT INTO tags (name) VALUES (?1)")
            .bind(&new.name)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::from_write("tag", e))?;

        Ok(Tag {
            id: result.last_insert_rowid(),
            name: new.name,
        })
    }

    async fn get_tag(&self, id: i64) -> Result<Option<Tag>> {
        let row: Option<TagRow> = sqlx::query_as("SELECT id, name FROM tags WHERE id = ?1")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(|r| r.into()))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let rows: Vec<TagRow> = sqlx::query_as("SELECT id, name FROM tags ORDER BY name, id")
            .fetch_all(&*self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn add_group_tag(&self, group_id: i64, tag_id: i64) -> Result<GroupTag> {
        let result = sqlx::query("INSERT INTO group_tags (group_id, tag_id) VALUES (?1, ?2)")
            .bind(group_id)
            .bind(tag_id)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::from_write("group tag", e))?;

        Ok(GroupTag {
            id: result.last_insert_rowid(),
            group_id,
            tag_id,
        })
    }

    async fn remove_group_tag(&self, group_id: i64, tag_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM group_tags WHERE group_id = ?1 AND tag_id = ?2")
            .bind(group_id)
            .bind(tag_id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_group_tags(&self, group_id: i64) -> Result<Vec<Tag>> {
        let rows: Vec<TagRow> = sqlx::query_as(
            r#"
            SELECT t.id, t.name FROM tags t
            JOIN group_tags gt ON gt.tag_id = t.id
            WHERE gt.group_id = ?1
            ORDER BY t.name, t.id
            "#,
        )
        .bind(group_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn add_organization_tag(
        &self,
        organization_id: i64,
        tag_id: i64,
    ) -> Result<OrganizationTag> {
        let result = sqlx::query(
            "INSERT INTO organization_tags (organization_id, tag_id) VALUES (?1, ?2)",
        )
        .bind(organization_id)
        .bind(tag_id)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::from_write("organization tag", e))?;

        Ok(OrganizationTag {
            id: result.last_insert_rowid(),
            organization_id,
            tag_id,
        })
    }

    async fn remove_organization_tag(&self, organization_id: i64, tag_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM organization_tags WHERE organization_id = ?1 AND tag_id = ?2",
        )
        .bind(organization_id)
        .bind(tag_id)
        .execute(&*self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_organization_tags(&self, organization_id: i64) -> Result<Vec<Tag>> {
        let rows: Vec<TagRow> = sqlx::query_as(
            r#"
            SELECT t.id, t.name FROM tags t
            JOIN organization_tags ot ON ot.tag_id = t.id
            WHERE ot.organization_id = ?1
            ORDER BY t.name, t.id
            "#,
        )
        .bind(organization_id)
        .fetch_all(&*self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

// Helper structs for sqlx query_as
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password: String,
    name: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            username: r.username,
            email: r.email,
            password: r.password,
            name: r.name,
            role: parse_user_role(&r.role),
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    id: i64,
    name: String,
    description: Option<String>,
    created_by: i64,
    created_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(r: OrganizationRow) -> Self {
        Organization {
            id: r.id,
            name: r.name,
            description: r.description,
            created_by: r.created_by,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrganizationMemberRow {
    id: i64,
    organization_id: i64,
    user_id: i64,
    role: String,
    joined_at: DateTime<Utc>,
}

impl From<OrganizationMemberRow> for OrganizationMember {
    fn from(r: OrganizationMemberRow) -> Self {
        OrganizationMember {
            id: r.id,
            organization_id: r.organization_id,
            user_id: r.user_id,
            role: parse_org_role(&r.role),
            joined_at: r.joined_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    id: i64,
    name: String,
    description: Option<String>,
    category: String,
    privacy: String,
    organization_id: i64,
    created_by: i64,
    created_at: DateTime<Utc>,
}

impl From<GroupRow> for Group {
    fn from(r: GroupRow) -> Self {
        Group {
            id: r.id,
            name: r.name,
            description: r.description,
            category: r.category,
            privacy: parse_group_privacy(&r.privacy),
            organization_id: r.organization_id,
            created_by: r.created_by,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GroupMemberRow {
    id: i64,
    group_id: i64,
    user_id: i64,
    role: String,
    joined_at: DateTime<Utc>,
}

impl From<GroupMemberRow> for GroupMember {
    fn from(r: GroupMemberRow) -> Self {
        GroupMember {
            id: r.id,
            group_id: r.group_id,
            user_id: r.user_id,
            role: parse_group_role(&r.role),
            joined_at: r.joined_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PrayerRequestRow {
    id: i64,
    group_id: i64,
    user_id: i64,
    title: String,
    description: String,
    status: String,
    urgency: String,
    is_anonymous: bool,
    follow_up_date: Option<DateTime<Utc>>,
    is_stale: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PrayerRequestRow> for PrayerRequest {
    fn from(r: PrayerRequestRow) -> Self {
        PrayerRequest {
            id: r.id,
            group_id: r.group_id,
            user_id: r.user_id,
            title: r.title,
            description: r.description,
            status: parse_request_status(&r.status),
            urgency: parse_urgency(&r.urgency),
            is_anonymous: r.is_anonymous,
            follow_up_date: r.follow_up_date,
            is_stale: r.is_stale,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    prayer_request_id: i64,
    user_id: i64,
    body: String,
    is_private: bool,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(r: CommentRow) -> Self {
        Comment {
            id: r.id,
            prayer_request_id: r.prayer_request_id,
            user_id: r.user_id,
            body: r.body,
            is_private: r.is_private,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PrayingForRow {
    id: i64,
    prayer_request_id: i64,
    user_id: i64,
    timestamp: DateTime<Utc>,
}

impl From<PrayingForRow> for PrayingFor {
    fn from(r: PrayingForRow) -> Self {
        PrayingFor {
            id: r.id,
            prayer_request_id: r.prayer_request_id,
            user_id: r.user_id,
            timestamp: r.timestamp,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    user_id: i64,
    kind: String,
    message: String,
    reference_id: Option<i64>,
    read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(r: NotificationRow) -> Self {
        Notification {
            id: r.id,
            user_id: r.user_id,
            kind: parse_notification_kind(&r.kind),
            message: r.message,
            reference_id: r.reference_id,
            read: r.read,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MeetingRow {
    id: i64,
    group_id: i64,
    title: String,
    description: Option<String>,
    meeting_type: String,
    meeting_link: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    is_recurring: bool,
    recurrence: Option<String>,
    recurrence_until: Option<DateTime<Utc>>,
    created_by: i64,
    created_at: DateTime<Utc>,
}

impl From<MeetingRow> for Meeting {
    fn from(r: MeetingRow) -> Self {
        Meeting {
            id: r.id,
            group_id: r.group_id,
            title: r.title,
            description: r.description,
            meeting_type: parse_meeting_kind(&r.meeting_type),
            meeting_link: r.meeting_link,
            start_time: r.start_time,
            end_time: r.end_time,
            is_recurring: r.is_recurring,
            recurrence: r.recurrence.as_deref().and_then(parse_recurrence),
            recurrence_until: r.recurrence_until,
            created_by: r.created_by,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MeetingNoteRow {
    id: i64,
    meeting_id: i64,
    content: String,
    summary: Option<String>,
    is_ai_generated: bool,
    created_at: DateTime<Utc>,
}

impl From<MeetingNoteRow> for MeetingNote {
    fn from(r: MeetingNoteRow) -> Self {
        MeetingNote {
            id: r.id,
            meeting_id: r.meeting_id,
            content: r.content,
            summary: r.summary,
            is_ai_generated: r.is_ai_generated,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PasswordResetTokenRow {
    id: i64,
    user_id: i64,
    token: String,
    expires_at: DateTime<Utc>,
    is_used: bool,
    created_at: DateTime<Utc>,
}

impl From<PasswordResetTokenRow> for PasswordResetToken {
    fn from(r: PasswordResetTokenRow) -> Self {
        PasswordResetToken {
            id: r.id,
            user_id: r.user_id,
            token: r.token,
            expires_at: r.expires_at,
            is_used: r.is_used,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationPreferenceRow {
    id: i64,
    user_id: i64,
    new_requests: bool,
    status_changes: bool,
    comments: bool,
    meetings: bool,
    reminder_interval_hours: i64,
    updated_at: DateTime<Utc>,
}

impl From<NotificationPreferenceRow> for NotificationPreference {
    fn from(r: NotificationPreferenceRow) -> Self {
        NotificationPreference {
            id: r.id,
            user_id: r.user_id,
            new_requests: r.new_requests,
            status_changes: r.status_changes,
            comments: r.comments,
            meetings: r.meetings,
            reminder_interval_hours: r.reminder_interval_hours,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GroupNotificationPreferenceRow {
    id: i64,
    user_id: i64,
    group_id: i64,
    muted: bool,
    new_requests: bool,
    status_changes: bool,
    comments: bool,
    meetings: bool,
    updated_at: DateTime<Utc>,
}

impl From<GroupNotificationPreferenceRow> for GroupNotificationPreference {
    fn from(r: GroupNotificationPreferenceRow) -> Self {
        GroupNotificationPreference {
            id: r.id,
            user_id: r.user_id,
            group_id: r.group_id,
            muted: r.muted,
            new_requests: r.new_requests,
            status_changes: r.status_changes,
            comments: r.comments,
            meetings: r.meetings,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TagRow {
    id: i64,
    name: String,
}

impl From<TagRow> for Tag {
    fn from(r: TagRow) -> Self {
        Tag {
            id: r.id,
            name: r.name,
        }
    }
}

fn parse_user_role(s: &str) -> UserRole {
    match s {
        "regular" => UserRole::Regular,
        "leader" => UserRole::Leader,
        "admin" => UserRole::Admin,
        other => {
            warn!("Unknown user role '{}' in database, using default", other);
            UserRole::default()
        }
    }
}

fn parse_org_role(s: &str) -> OrgRole {
    match s {
        "admin" => OrgRole::Admin,
        "member" => OrgRole::Member,
        other => {
            warn!(
                "Unknown organization role '{}' in database, using default",
                other
            );
            OrgRole::default()
        }
    }
}

fn parse_group_role(s: &str) -> GroupRole {
    match s {
        "leader" => GroupRole::Leader,
        "member" => GroupRole::Member,
        other => {
            warn!("Unknown group role '{}' in database, using default", other);
            GroupRole::default()
        }
    }
}

fn parse_group_privacy(s: &str) -> GroupPrivacy {
    match s {
        "open" => GroupPrivacy::Open,
        "request" => GroupPrivacy::Request,
        "invite" => GroupPrivacy::Invite,
        other => {
            warn!(
                "Unknown group privacy '{}' in database, using default",
                other
            );
            GroupPrivacy::default()
        }
    }
}

fn parse_request_status(s: &str) -> RequestStatus {
    match s {
        "waiting" => RequestStatus::Waiting,
        "answered" => RequestStatus::Answered,
        "declined" => RequestStatus::Declined,
        other => {
            warn!(
                "Unknown request status '{}' in database, using default",
                other
            );
            RequestStatus::default()
        }
    }
}

fn parse_urgency(s: &str) -> Urgency {
    match s {
        "low" => Urgency::Low,
        "medium" => Urgency::Medium,
        "high" => Urgency::High,
        other => {
            warn!("Unknown urgency '{}' in database, using default", other);
            Urgency::default()
        }
    }
}

fn parse_notification_kind(s: &str) -> NotificationKind {
    match s {
        "new_request" => NotificationKind::NewRequest,
        "status_change" => NotificationKind::StatusChange,
        "new_comment" => NotificationKind::NewComment,
        "praying_for" => NotificationKind::PrayingFor,
        "member_joined" => NotificationKind::MemberJoined,
        "org_member_joined" => NotificationKind::OrgMemberJoined,
        "meeting_scheduled" => NotificationKind::MeetingScheduled,
        "meeting_updated" => NotificationKind::MeetingUpdated,
        "meeting_cancelled" => NotificationKind::MeetingCancelled,
        "follow_up_due" => NotificationKind::FollowUpDue,
        "general" => NotificationKind::General,
        other => {
            warn!(
                "Unknown notification kind '{}' in database, using default",
                other
            );
            NotificationKind::default()
        }
    }
}

fn parse_meeting_kind(s: &str) -> MeetingKind {
    match s {
        "virtual" => MeetingKind::Virtual,
        "in_person" => MeetingKind::InPerson,
        "hybrid" => MeetingKind::Hybrid,
        other => {
            warn!("Unknown meeting type '{}' in database, using default", other);
            MeetingKind::default()
        }
    }
}

fn parse_recurrence(s: &str) -> Option<Recurrence> {
    match s {
        "daily" => Some(Recurrence::Daily),
        "weekly" => Some(Recurrence::Weekly),
        "biweekly" => Some(Recurrence::Biweekly),
        "monthly" => Some(Recurrence::Monthly),
        other => {
            warn!("Unknown recurrence '{}' in database, dropping it", other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashSet;
    use tempfile::TempDir;

    async fn test_db() -> (Database, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

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
    async fn user_round_trip_with_defaults() {
        let (db, _dir) = test_db().await;
        let user = db.create_user(new_user(1)).await.unwrap();
        assert_eq!(user.role, UserRole::Regular);

        let by_id = db.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(by_id, user);
        let by_username = db.get_user_by_username("user1").await.unwrap().unwrap();
        assert_eq!(by_username.id, user.id);
        let by_email = db
            .get_user_by_email("user1@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);

        assert!(db.get_user(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_maps_to_already_exists() {
        let (db, _dir) = test_db().await;
        db.create_user(new_user(1)).await.unwrap();

        let mut dup = new_user(2);
        dup.username = "user1".to_string();
        let err = db.create_user(dup).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists("user")));

        // Also on update into a taken username.
        let second = db.create_user(new_user(3)).await.unwrap();
        let err = db
            .update_user(
                second.id,
                UserUpdate {
                    username: Some("user1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists("user")));
    }

    #[tokio::test]
    async fn unknown_enum_strings_coerce_to_defaults() {
        let (db, _dir) = test_db().await;
        sqlx::query(
            r#"
            INSERT INTO users (username, email, password, name, role, created_at)
            VALUES ('odd', 'odd@example.com', 'hash', 'Odd', 'superstar', ?1)
            "#,
        )
        .bind(Utc::now())
        .execute(&*db.pool)
        .await
        .unwrap();
        sqlx::query(
            r#"
            INSERT INTO prayer_requests
                (group_id, user_id, title, description, status, urgency, is_anonymous,
                 is_stale, created_at, updated_at)
            VALUES (1, 1, 'T', 'D', 'bogus', 'extreme', 0, 0, ?1, ?2)
            "#,
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .execute(&*db.pool)
        .await
        .unwrap();

        let user = db.get_user_by_username("odd").await.unwrap().unwrap();
        assert_eq!(user.role, UserRole::Regular);

        let requests = db.list_group_requests(1).await.unwrap();
        assert_eq!(requests[0].status, RequestStatus::Waiting);
        assert_eq!(requests[0].urgency, Urgency::Medium);
    }

    #[tokio::test]
    async fn organization_creator_becomes_admin_member() {
        let (db, _dir) = test_db().await;
        let org = db
            .create_organization(NewOrganization {
                name: "Org".to_string(),
                description: None,
                created_by: 42,
            })
            .await
            .unwrap();

        let member = db
            .get_organization_member(org.id, 42)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(member.role, OrgRole::Admin);
        assert_eq!(db.count_organization_admins(org.id).await.unwrap(), 1);
        assert_eq!(db.list_organizations_for_user(42).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn group_cascade_removes_dependents_in_one_transaction() {
        let (db, _dir) = test_db().await;
        let group = db
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
        let request = db
            .create_prayer_request(new_request(group.id, 1))
            .await
            .unwrap();
        db.create_comment(NewComment {
            prayer_request_id: request.id,
            user_id: 2,
            body: "Praying".to_string(),
            is_private: false,
        })
        .await
        .unwrap();
        db.add_praying_for(request.id, 2).await.unwrap();
        let meeting = db
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
        db.create_meeting_note(NewMeetingNote {
            meeting_id: meeting.id,
            content: "Notes".to_string(),
            summary: None,
            is_ai_generated: false,
        })
        .await
        .unwrap();
        db.create_notification(NewNotification {
            user_id: 2,
            kind: NotificationKind::NewRequest,
            message: "A new request".to_string(),
            reference_id: Some(request.id),
        })
        .await
        .unwrap();
        db.create_notification(NewNotification {
            user_id: 2,
            kind: NotificationKind::General,
            message: "Unrelated".to_string(),
            reference_id: None,
        })
        .await
        .unwrap();
        db.get_group_notification_preference(2, group.id)
            .await
            .unwrap();

        assert!(db.delete_group(group.id).await.unwrap());

        assert!(db.get_group(group.id).await.unwrap().is_none());
        assert!(db.get_prayer_request(request.id).await.unwrap().is_none());
        assert!(db.list_comments(request.id).await.unwrap().is_empty());
        assert_eq!(db.count_praying_for(request.id).await.unwrap(), 0);
        assert!(db.get_meeting(meeting.id).await.unwrap().is_none());
        assert!(db.list_meeting_notes(meeting.id).await.unwrap().is_empty());
        assert!(db.list_group_members(group.id).await.unwrap().is_empty());

        let remaining = db.list_notifications(2).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].kind, NotificationKind::General);

        assert!(!db.delete_group(group.id).await.unwrap());
    }

    #[tokio::test]
    async fn organization_cascade_removes_owned_groups() {
        let (db, _dir) = test_db().await;
        let org = db
            .create_organization(NewOrganization {
                name: "Org".to_string(),
                description: None,
                created_by: 1,
            })
            .await
            .unwrap();
        let group = db
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
        db.create_prayer_request(new_request(group.id, 1))
            .await
            .unwrap();

        assert!(db.delete_organization(org.id).await.unwrap());
        assert!(db.get_organization(org.id).await.unwrap().is_none());
        assert!(db.get_group(group.id).await.unwrap().is_none());
        assert!(db.list_user_requests(1).await.unwrap().is_empty());
        assert!(db
            .list_organization_members(org.id)
            .await
            .unwrap()
            .is_empty());
        assert!(!db.delete_organization(org.id).await.unwrap());
    }

    #[tokio::test]
    async fn mark_stale_requests_flips_each_row_once() {
        let (db, _dir) = test_db().await;
        let mut overdue = new_request(1, 1);
        overdue.follow_up_date = Some(Utc::now() - Duration::hours(3));
        let overdue = db.create_prayer_request(overdue).await.unwrap();

        let mut future = new_request(1, 1);
        future.follow_up_date = Some(Utc::now() + Duration::hours(3));
        db.create_prayer_request(future).await.unwrap();

        let mut answered = new_request(1, 1);
        answered.status = RequestStatus::Answered;
        answered.follow_up_date = Some(Utc::now() - Duration::hours(3));
        db.create_prayer_request(answered).await.unwrap();

        let marked = db.mark_stale_requests(Utc::now()).await.unwrap();
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].id, overdue.id);
        assert!(marked[0].is_stale);

        assert!(db.mark_stale_requests(Utc::now()).await.unwrap().is_empty());

        // Leaving `waiting` clears the flag.
        let updated = db
            .update_prayer_request(
                overdue.id,
                PrayerRequestUpdate {
                    status: Some(RequestStatus::Answered),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(!updated.is_stale);
    }

    #[tokio::test]
    async fn overlapping_sweeps_flag_each_row_exactly_once() {
        let (db, _dir) = test_db().await;
        let mut overdue_ids = HashSet::new();
        for _ in 0..50 {
            let mut overdue = new_request(1, 1);
            overdue.follow_up_date = Some(Utc::now() - Duration::hours(3));
            overdue_ids.insert(db.create_prayer_request(overdue).await.unwrap().id);
        }

        let now = Utc::now();
        let (first, second) = tokio::join!(db.mark_stale_requests(now), db.mark_stale_requests(now));
        let first = first.unwrap();
        let second = second.unwrap();

        // Every overdue row shows up in one result and never in both.
        assert_eq!(first.len() + second.len(), overdue_ids.len());
        let mut seen = HashSet::new();
        for request in first.iter().chain(second.iter()) {
            assert!(seen.insert(request.id));
            assert!(request.is_stale);
        }
        assert_eq!(seen, overdue_ids);
    }

    #[tokio::test]
    async fn praying_for_allows_duplicates_at_store_level() {
        let (db, _dir) = test_db().await;
        db.add_praying_for(1, 2).await.unwrap();
        db.add_praying_for(1, 2).await.unwrap();
        assert_eq!(db.count_praying_for(1).await.unwrap(), 2);
        assert!(db.get_praying_for(1, 2).await.unwrap().is_some());

        assert!(db.remove_praying_for(1, 2).await.unwrap());
        assert_eq!(db.count_praying_for(1).await.unwrap(), 0);
        assert!(!db.remove_praying_for(1, 2).await.unwrap());
    }

    #[tokio::test]
    async fn preference_rows_materialize_lazily() {
        let (db, _dir) = test_db().await;
        let first = db.get_notification_preference(7).await.unwrap();
        assert!(first.new_requests);
        assert_eq!(first.reminder_interval_hours, 24);

        let second = db.get_notification_preference(7).await.unwrap();
        assert_eq!(first.id, second.id);

        let updated = db
            .update_notification_preference(
                7,
                NotificationPreferenceUpdate {
                    meetings: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.meetings);
        assert!(!db.get_notification_preference(7).await.unwrap().meetings);

        let group_pref = db.get_group_notification_preference(7, 3).await.unwrap();
        assert!(!group_pref.muted);
        let muted = db
            .update_group_notification_preference(
                7,
                3,
                GroupNotificationPreferenceUpdate {
                    muted: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(muted.muted);
    }

    #[tokio::test]
    async fn reset_tokens_expire_and_purge() {
        let (db, _dir) = test_db().await;
        let live = db
            .create_password_reset_token(NewPasswordResetToken {
                user_id: 1,
                token: "a".repeat(32),
                expires_at: Utc::now() + Duration::hours(1),
            })
            .await
            .unwrap();
        db.create_password_reset_token(NewPasswordResetToken {
            user_id: 1,
            token: "b".repeat(32),
            expires_at: Utc::now() - Duration::hours(1),
        })
        .await
        .unwrap();

        let fetched = db
            .get_password_reset_token(&live.token)
            .await
            .unwrap()
            .unwrap();
        assert!(fetched.is_valid(Utc::now()));

        assert!(db.mark_password_reset_token_used(live.id).await.unwrap());
        let used = db
            .get_password_reset_token(&live.token)
            .await
            .unwrap()
            .unwrap();
        assert!(!used.is_valid(Utc::now()));

        assert_eq!(
            db.delete_expired_password_reset_tokens(Utc::now())
                .await
                .unwrap(),
            1
        );
        assert!(db
            .get_password_reset_token(&"b".repeat(32))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn meetings_round_trip_with_recurrence() {
        let (db, _dir) = test_db().await;
        let start = Utc::now() + Duration::days(1);
        let meeting = db
            .create_meeting(NewMeeting {
                group_id: 4,
                title: "Prayer night".to_string(),
                description: Some("Monthly gathering".to_string()),
                meeting_type: MeetingKind::Hybrid,
                meeting_link: "https://example.com/meet".to_string(),
                start_time: start,
                end_time: None,
                is_recurring: true,
                recurrence: Some(Recurrence::Monthly),
                recurrence_until: Some(start + Duration::days(90)),
                created_by: 1,
            })
            .await
            .unwrap();

        let fetched = db.get_meeting(meeting.id).await.unwrap().unwrap();
        assert_eq!(fetched.meeting_type, MeetingKind::Hybrid);
        assert_eq!(fetched.recurrence, Some(Recurrence::Monthly));

        let updated = db
            .update_meeting(
                meeting.id,
                MeetingUpdate {
                    recurrence: Some(None),
                    is_recurring: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.recurrence, None);
        assert!(!updated.is_recurring);

        assert!(db.delete_meeting(meeting.id).await.unwrap());
        assert!(db.get_meeting(meeting.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tag_names_are_unique_and_links_join() {
        let (db, _dir) = test_db().await;
        let tag = db
            .create_tag(NewTag {
                name: "college".to_string(),
            })
            .await
            .unwrap();
        let err = db
            .create_tag(NewTag {
                name: "college".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists("tag")));

        db.add_group_tag(5, tag.id).await.unwrap();
        let err = db.add_group_tag(5, tag.id).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists("group tag")));

        assert_eq!(db.list_group_tags(5).await.unwrap(), vec![tag.clone()]);
        assert!(db.remove_group_tag(5, tag.id).await.unwrap());
        assert!(db.list_group_tags(5).await.unwrap().is_empty());

        db.add_organization_tag(9, tag.id).await.unwrap();
        assert_eq!(db.list_organization_tags(9).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn group_requests_listed_newest_first() {
        let (db, _dir) = test_db().await;
        let first = db.create_prayer_request(new_request(2, 1)).await.unwrap();
        let second = db.create_prayer_request(new_request(2, 1)).await.unwrap();

        let listed = db.list_group_requests(2).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }
}
