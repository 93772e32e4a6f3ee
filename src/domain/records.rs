use super::money::Amount;
use super::ports::RouteParams;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of an authenticated user.
    UserId
);
id_type!(
    /// Identifier of a project receiving donations.
    ProjectId
);
id_type!(
    /// Store-assigned identifier of a persisted record.
    RecordId
);

/// The entity types a record store persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    PlatformCustomer,
    PlatformCard,
    Subscription,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [
        RecordKind::PlatformCustomer,
        RecordKind::PlatformCard,
        RecordKind::Subscription,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::PlatformCustomer => "stripe-platform-customer",
            RecordKind::PlatformCard => "stripe-platform-card",
            RecordKind::Subscription => "stripe-connect-subscription",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signed-in user as the session sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Set once the user's billing-side customer exists. A user has at most one.
    pub platform_customer: Option<RecordId>,
}

impl User {
    /// Creates a user with no platform customer yet.
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            platform_customer: None,
        }
    }

    /// Whether a platform customer is already linked.
    pub fn has_platform_customer(&self) -> bool {
        self.platform_customer.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub member_slug: String,
    pub slug: String,
}

impl Project {
    /// Path parameters that address this project's views.
    pub fn route_params(&self) -> RouteParams {
        RouteParams::from([
            ("memberSlug".to_string(), self.member_slug.clone()),
            ("projectSlug".to_string(), self.slug.clone()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlatformCustomer {
    pub email: String,
    pub user: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCustomer {
    pub id: RecordId,
    pub email: String,
    pub user: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlatformCard {
    pub stripe_token: String,
    pub user: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCard {
    pub id: RecordId,
    pub stripe_token: String,
    pub user: UserId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub quantity: Amount,
    pub user: UserId,
}

/// Adapter-level options for saving a subscription.
///
/// The target project travels here rather than on the subscription itself;
/// stores file the record under this project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    pub project_id: ProjectId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: RecordId,
    pub quantity: Amount,
    pub user: UserId,
}
