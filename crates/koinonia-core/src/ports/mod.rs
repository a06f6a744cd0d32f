//! Port traits (interfaces) implemented by the storage backends

pub mod storage;

pub use storage::{
    GroupStore, MeetingStore, NotificationStore, OrganizationStore, PasswordResetStore,
    PrayerRequestStore, PreferenceStore, Storage, TagStore, UserStore,
};
