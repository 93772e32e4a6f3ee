#![allow(dead_code)]

use async_trait::async_trait;
use donations::application::donation::{Collaborators, DonationWorkflow};
use donations::domain::card::{CardParams, CardToken, TokenParams};
use donations::domain::ports::{CardTokenizer, CardTokenizerRef, RecordStore};
use donations::domain::records::{
    NewPlatformCard, NewPlatformCustomer, NewSubscription, PlatformCard, PlatformCustomer,
    Project, ProjectId, RecordId, RecordKind, SaveOptions, Subscription, User, UserId,
};
use donations::error::{DonationError, Result};
use donations::infrastructure::in_memory::{
    HistoryNavigator, InMemoryRecordStore, InMemorySession, LocalTokenizer,
};
use donations::interfaces::router::RouteTable;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;

pub const CSV_HEADER: [&str; 10] = [
    "user",
    "email",
    "project",
    "member",
    "slug",
    "amount",
    "card_number",
    "cvc",
    "month",
    "year",
];

pub fn project() -> Project {
    Project {
        id: ProjectId(1),
        member_slug: "acme".to_string(),
        slug: "my-project".to_string(),
    }
}

pub fn valid_card() -> CardParams {
    CardParams {
        card_number: "4242424242424242".to_string(),
        cvc: "123".to_string(),
        month: "12".to_string(),
        year: "2030".to_string(),
    }
}

pub fn donor() -> User {
    User::new(UserId(1), "donor@example.com")
}

pub fn donor_with_customer() -> User {
    User {
        platform_customer: Some(RecordId(100)),
        ..donor()
    }
}

/// A workflow wired to in-memory collaborators, with handles to inspect them.
pub struct Harness {
    pub workflow: DonationWorkflow,
    pub store: Arc<FailingStore>,
    pub session: InMemorySession,
    pub navigator: Arc<HistoryNavigator>,
}

impl Harness {
    pub fn new(user: User) -> Self {
        Self::build(user, Arc::new(LocalTokenizer::new()), None)
    }

    pub fn with_tokenizer(user: User, tokenizer: CardTokenizerRef) -> Self {
        Self::build(user, tokenizer, None)
    }

    pub fn failing_on(user: User, kind: RecordKind) -> Self {
        Self::build(user, Arc::new(LocalTokenizer::new()), Some(kind))
    }

    fn build(user: User, tokenizer: CardTokenizerRef, fail_on: Option<RecordKind>) -> Self {
        let store = Arc::new(FailingStore {
            inner: InMemoryRecordStore::new(),
            fail_on,
        });
        let session = InMemorySession::new(user);
        let navigator = Arc::new(HistoryNavigator::new(RouteTable::standard()));
        let workflow = DonationWorkflow::new(
            project(),
            Collaborators {
                tokenizer,
                store: store.clone(),
                session: Arc::new(session.clone()),
                navigator: navigator.clone(),
            },
        );
        Self {
            workflow,
            store,
            session,
            navigator,
        }
    }

    pub async fn counts(&self) -> (usize, usize, usize) {
        (
            self.store.count(RecordKind::PlatformCustomer).await.unwrap(),
            self.store.count(RecordKind::PlatformCard).await.unwrap(),
            self.store.count(RecordKind::Subscription).await.unwrap(),
        )
    }
}

/// In-memory store that rejects saves of one record kind.
///
/// Every save yields to the scheduler first, so observers of a submission get
/// a chance to see its in-flight state.
pub struct FailingStore {
    pub inner: InMemoryRecordStore,
    pub fail_on: Option<RecordKind>,
}

impl FailingStore {
    async fn check(&self, kind: RecordKind) -> Result<()> {
        tokio::task::yield_now().await;
        if self.fail_on == Some(kind) {
            return Err(DonationError::InternalError(
                format!("{} save rejected", kind).into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn save_customer(&self, customer: NewPlatformCustomer) -> Result<PlatformCustomer> {
        self.check(RecordKind::PlatformCustomer).await?;
        self.inner.save_customer(customer).await
    }

    async fn save_card(&self, card: NewPlatformCard) -> Result<PlatformCard> {
        self.check(RecordKind::PlatformCard).await?;
        self.inner.save_card(card).await
    }

    async fn save_subscription(
        &self,
        subscription: NewSubscription,
        options: &SaveOptions,
    ) -> Result<Subscription> {
        self.check(RecordKind::Subscription).await?;
        self.inner.save_subscription(subscription, options).await
    }

    async fn customer_for_user(&self, user: UserId) -> Result<Option<PlatformCustomer>> {
        self.inner.customer_for_user(user).await
    }

    async fn cards_for_user(&self, user: UserId) -> Result<Vec<PlatformCard>> {
        self.inner.cards_for_user(user).await
    }

    async fn subscriptions_for_project(&self, project: ProjectId) -> Result<Vec<Subscription>> {
        self.inner.subscriptions_for_project(project).await
    }

    async fn count(&self, kind: RecordKind) -> Result<usize> {
        self.inner.count(kind).await
    }
}

/// Tokenizer standing in for a network outage.
pub struct UnreachableTokenizer;

#[async_trait]
impl CardTokenizer for UnreachableTokenizer {
    async fn create_token(&self, _params: &TokenParams) -> Result<CardToken> {
        Err(DonationError::IoError(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "tokenizer unreachable",
        )))
    }
}

/// Local tokenizer that yields to the scheduler before answering, so
/// observers of a submission get a chance to see its in-flight state.
#[derive(Default)]
pub struct YieldingTokenizer {
    inner: LocalTokenizer,
}

#[async_trait]
impl CardTokenizer for YieldingTokenizer {
    async fn create_token(&self, params: &TokenParams) -> Result<CardToken> {
        tokio::task::yield_now().await;
        self.inner.create_token(params).await
    }
}

/// Writes a donations CSV with `rows` new-card donations from distinct users.
pub fn generate_csv(path: &Path, rows: usize) -> std::result::Result<(), Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(CSV_HEADER)?;

    for i in 1..=rows {
        let user = i.to_string();
        let email = format!("donor{}@example.com", i);
        wtr.write_record([
            user.as_str(),
            email.as_str(),
            "1",
            "acme",
            "my-project",
            "10.0",
            "4242424242424242",
            "123",
            "12",
            "2030",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
