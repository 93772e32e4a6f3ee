use super::card::{CardToken, TokenParams};
use super::records::{
    NewPlatformCard, NewPlatformCustomer, NewSubscription, PlatformCard, PlatformCustomer,
    ProjectId, RecordKind, SaveOptions, Subscription, User, UserId,
};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Named path parameters, e.g. `memberSlug -> "acme"`.
pub type RouteParams = BTreeMap<String, String>;

/// Exchanges raw card details for a single-use token.
#[async_trait]
pub trait CardTokenizer: Send + Sync {
    async fn create_token(&self, params: &TokenParams) -> Result<CardToken>;
}

/// Persists the billing records a donation creates.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn save_customer(&self, customer: NewPlatformCustomer) -> Result<PlatformCustomer>;
    async fn save_card(&self, card: NewPlatformCard) -> Result<PlatformCard>;
    async fn save_subscription(
        &self,
        subscription: NewSubscription,
        options: &SaveOptions,
    ) -> Result<Subscription>;

    async fn customer_for_user(&self, user: UserId) -> Result<Option<PlatformCustomer>>;
    /// Cards in creation order.
    async fn cards_for_user(&self, user: UserId) -> Result<Vec<PlatformCard>>;
    async fn subscriptions_for_project(&self, project: ProjectId) -> Result<Vec<Subscription>>;
    async fn count(&self, kind: RecordKind) -> Result<usize>;
}

/// The authenticated session.
pub trait SessionContext: Send + Sync {
    fn current_user(&self) -> Result<User>;
    /// Records that the current user now owns `customer`.
    fn link_customer(&self, customer: &PlatformCustomer) -> Result<()>;
}

/// Moves the application to a named view.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Returns the URL that was navigated to.
    async fn transition_to(&self, route: &str, params: &RouteParams) -> Result<String>;
}

pub type CardTokenizerRef = Arc<dyn CardTokenizer>;
pub type RecordStoreRef = Arc<dyn RecordStore>;
pub type SessionContextRef = Arc<dyn SessionContext>;
pub type NavigatorRef = Arc<dyn Navigator>;
