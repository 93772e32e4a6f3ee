use crate::domain::card::{CardToken, TokenParams};
use crate::domain::ports::{CardTokenizer, Navigator, RecordStore, RouteParams, SessionContext};
use crate::domain::records::{
    NewPlatformCard, NewPlatformCustomer, NewSubscription, PlatformCard, PlatformCustomer,
    ProjectId, RecordId, RecordKind, SaveOptions, Subscription, User, UserId,
};
use crate::error::{DonationError, Result};
use crate::interfaces::router::RouteTable;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock as SyncRwLock};
use tokio::sync::{Mutex, RwLock};

#[derive(Default)]
struct Records {
    last_id: u64,
    customers: Vec<PlatformCustomer>,
    cards: Vec<PlatformCard>,
    subscriptions: Vec<(ProjectId, Subscription)>,
}

impl Records {
    fn next_id(&mut self) -> RecordId {
        self.last_id += 1;
        RecordId(self.last_id)
    }
}

/// A thread-safe in-memory record store.
///
/// Uses `Arc<RwLock<..>>` so clones share the same records. Ideal for tests
/// and one-shot CLI runs where nothing needs to survive the process.
#[derive(Default, Clone)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<Records>>,
}

impl InMemoryRecordStore {
    /// Creates a new, empty record store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn save_customer(&self, customer: NewPlatformCustomer) -> Result<PlatformCustomer> {
        let mut records = self.records.write().await;
        if records.customers.iter().any(|c| c.user == customer.user) {
            return Err(DonationError::ValidationError(format!(
                "User {} already has a platform customer",
                customer.user
            )));
        }

        let saved = PlatformCustomer {
            id: records.next_id(),
            email: customer.email,
            user: customer.user,
        };
        records.customers.push(saved.clone());
        Ok(saved)
    }

    async fn save_card(&self, card: NewPlatformCard) -> Result<PlatformCard> {
        let mut records = self.records.write().await;
        let saved = PlatformCard {
            id: records.next_id(),
            stripe_token: card.stripe_token,
            user: card.user,
        };
        records.cards.push(saved.clone());
        Ok(saved)
    }

    async fn save_subscription(
        &self,
        subscription: NewSubscription,
        options: &SaveOptions,
    ) -> Result<Subscription> {
        let mut records = self.records.write().await;
        let saved = Subscription {
            id: records.next_id(),
            quantity: subscription.quantity,
            user: subscription.user,
        };
        records
            .subscriptions
            .push((options.project_id, saved.clone()));
        Ok(saved)
    }

    async fn customer_for_user(&self, user: UserId) -> Result<Option<PlatformCustomer>> {
        let records = self.records.read().await;
        Ok(records.customers.iter().find(|c| c.user == user).cloned())
    }

    async fn cards_for_user(&self, user: UserId) -> Result<Vec<PlatformCard>> {
        let records = self.records.read().await;
        Ok(records
            .cards
            .iter()
            .filter(|c| c.user == user)
            .cloned()
            .collect())
    }

    async fn subscriptions_for_project(&self, project: ProjectId) -> Result<Vec<Subscription>> {
        let records = self.records.read().await;
        Ok(records
            .subscriptions
            .iter()
            .filter(|(p, _)| *p == project)
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn count(&self, kind: RecordKind) -> Result<usize> {
        let records = self.records.read().await;
        Ok(match kind {
            RecordKind::PlatformCustomer => records.customers.len(),
            RecordKind::PlatformCard => records.cards.len(),
            RecordKind::Subscription => records.subscriptions.len(),
        })
    }
}

/// Session holding at most one signed-in user.
#[derive(Default, Clone)]
pub struct InMemorySession {
    user: Arc<SyncRwLock<Option<User>>>,
}

impl InMemorySession {
    /// Creates a session signed in as `user`.
    pub fn new(user: User) -> Self {
        Self {
            user: Arc::new(SyncRwLock::new(Some(user))),
        }
    }

    /// Creates a session with nobody signed in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The signed-in user, if any. Returns `None` if the lock is poisoned.
    pub fn user(&self) -> Option<User> {
        self.user.read().ok().and_then(|u| u.clone())
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> DonationError {
    DonationError::InternalError(format!("Session lock poisoned: {}", e).into())
}

impl SessionContext for InMemorySession {
    fn current_user(&self) -> Result<User> {
        self.user
            .read()
            .map_err(poisoned)?
            .clone()
            .ok_or(DonationError::NotAuthenticated)
    }

    fn link_customer(&self, customer: &PlatformCustomer) -> Result<()> {
        let mut guard = self.user.write().map_err(poisoned)?;
        let user = guard.as_mut().ok_or(DonationError::NotAuthenticated)?;
        if user.id != customer.user {
            return Err(DonationError::ValidationError(format!(
                "Customer {} belongs to user {}, not {}",
                customer.id, customer.user, user.id
            )));
        }
        user.platform_customer = Some(customer.id);
        Ok(())
    }
}

/// Tokenizer that validates card details locally and issues sequential tokens.
#[derive(Default)]
pub struct LocalTokenizer {
    issued: AtomicU64,
}

impl LocalTokenizer {
    /// Creates a tokenizer whose first token is `tok_1`.
    pub fn new() -> Self {
        Self::default()
    }

    fn validate(params: &TokenParams) -> Result<()> {
        let digits: String = params
            .number
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();
        if !(12..=19).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DonationError::ValidationError(
                "Card number is malformed".to_string(),
            ));
        }
        if !luhn_valid(&digits) {
            return Err(DonationError::ValidationError(
                "Card number failed checksum".to_string(),
            ));
        }

        let cvc = params.cvc.trim();
        if !(3..=4).contains(&cvc.len()) || !cvc.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DonationError::ValidationError("CVC is malformed".to_string()));
        }

        match params.exp_month.trim().parse::<u8>() {
            Ok(1..=12) => {}
            _ => {
                return Err(DonationError::ValidationError(
                    "Expiration month is invalid".to_string(),
                ));
            }
        }

        match params.exp_year.trim().parse::<u16>() {
            Ok(year) if year > 0 => Ok(()),
            _ => Err(DonationError::ValidationError(
                "Expiration year is invalid".to_string(),
            )),
        }
    }
}

fn luhn_valid(digits: &str) -> bool {
    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

#[async_trait]
impl CardTokenizer for LocalTokenizer {
    async fn create_token(&self, params: &TokenParams) -> Result<CardToken> {
        Self::validate(params)?;
        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(CardToken {
            id: format!("tok_{}", n),
        })
    }
}

/// Navigator that resolves route names through a `RouteTable` and keeps
/// nothing.
#[derive(Debug, Clone)]
pub struct RouteNavigator {
    routes: RouteTable,
}

impl RouteNavigator {
    /// Creates a navigator over `routes`.
    pub fn new(routes: RouteTable) -> Self {
        Self { routes }
    }
}

#[async_trait]
impl Navigator for RouteNavigator {
    async fn transition_to(&self, route: &str, params: &RouteParams) -> Result<String> {
        Ok(self.routes.url_for(route, params)?)
    }
}

/// Navigator that also records every URL it visits.
///
/// The history grows without bound; use it for tests and single sessions.
pub struct HistoryNavigator {
    inner: RouteNavigator,
    history: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    /// Creates a navigator over `routes` with an empty history.
    pub fn new(routes: RouteTable) -> Self {
        Self {
            inner: RouteNavigator::new(routes),
            history: Mutex::new(Vec::new()),
        }
    }

    /// URLs visited so far, oldest first.
    pub async fn history(&self) -> Vec<String> {
        self.history.lock().await.clone()
    }
}

#[async_trait]
impl Navigator for HistoryNavigator {
    async fn transition_to(&self, route: &str, params: &RouteParams) -> Result<String> {
        let url = self.inner.transition_to(route, params).await?;
        self.history.lock().await.push(url.clone());
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::router::PROJECT_THANK_YOU;
    use rust_decimal_macros::dec;

    fn token_params(number: &str) -> TokenParams {
        TokenParams {
            number: number.to_string(),
            cvc: "123".to_string(),
            exp_month: "12".to_string(),
            exp_year: "2030".to_string(),
        }
    }

    #[tokio::test]
    async fn test_in_memory_record_store() {
        let store = InMemoryRecordStore::new();
        let customer = store
            .save_customer(NewPlatformCustomer {
                email: "donor@example.com".to_string(),
                user: UserId(1),
            })
            .await
            .unwrap();
        let card = store
            .save_card(NewPlatformCard {
                stripe_token: "tok_1".to_string(),
                user: UserId(1),
            })
            .await
            .unwrap();
        store
            .save_subscription(
                NewSubscription {
                    quantity: dec!(10).try_into().unwrap(),
                    user: UserId(1),
                },
                &SaveOptions {
                    project_id: ProjectId(9),
                },
            )
            .await
            .unwrap();

        assert_ne!(customer.id, card.id);
        assert_eq!(
            store.customer_for_user(UserId(1)).await.unwrap(),
            Some(customer)
        );
        assert!(store.customer_for_user(UserId(2)).await.unwrap().is_none());
        assert_eq!(store.cards_for_user(UserId(1)).await.unwrap(), vec![card]);
        assert_eq!(
            store
                .subscriptions_for_project(ProjectId(9))
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(
            store
                .subscriptions_for_project(ProjectId(1))
                .await
                .unwrap()
                .is_empty()
        );
        for kind in RecordKind::ALL {
            assert_eq!(store.count(kind).await.unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn test_second_customer_for_user_rejected() {
        let store = InMemoryRecordStore::new();
        let new = NewPlatformCustomer {
            email: "donor@example.com".to_string(),
            user: UserId(1),
        };
        store.save_customer(new.clone()).await.unwrap();
        assert!(matches!(
            store.save_customer(new).await,
            Err(DonationError::ValidationError(_))
        ));
        assert_eq!(store.count(RecordKind::PlatformCustomer).await.unwrap(), 1);
    }

    #[test]
    fn test_session_link_customer() {
        let session = InMemorySession::new(User::new(UserId(1), "donor@example.com"));
        let customer = PlatformCustomer {
            id: RecordId(5),
            email: "donor@example.com".to_string(),
            user: UserId(1),
        };
        session.link_customer(&customer).unwrap();
        assert_eq!(
            session.current_user().unwrap().platform_customer,
            Some(RecordId(5))
        );

        let stranger = PlatformCustomer {
            user: UserId(2),
            ..customer
        };
        assert!(session.link_customer(&stranger).is_err());
    }

    #[test]
    fn test_anonymous_session() {
        let session = InMemorySession::anonymous();
        assert!(matches!(
            session.current_user(),
            Err(DonationError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_local_tokenizer() {
        let tokenizer = LocalTokenizer::new();
        let first = tokenizer
            .create_token(&token_params("4242 4242 4242 4242"))
            .await
            .unwrap();
        let second = tokenizer
            .create_token(&token_params("5555555555554444"))
            .await
            .unwrap();
        assert_eq!(first.id, "tok_1");
        assert_eq!(second.id, "tok_2");

        assert!(
            tokenizer
                .create_token(&token_params("4242424242424241"))
                .await
                .is_err()
        );
        assert!(tokenizer.create_token(&token_params("abc")).await.is_err());

        let mut bad_month = token_params("4242424242424242");
        bad_month.exp_month = "13".to_string();
        assert!(tokenizer.create_token(&bad_month).await.is_err());
    }

    #[tokio::test]
    async fn test_route_navigator_is_reusable() {
        let navigator = RouteNavigator::new(RouteTable::standard());
        for (member, slug) in [("acme", "roof"), ("globex", "well")] {
            let params = RouteParams::from([
                ("memberSlug".to_string(), member.to_string()),
                ("projectSlug".to_string(), slug.to_string()),
            ]);
            let url = navigator
                .transition_to(PROJECT_THANK_YOU, &params)
                .await
                .unwrap();
            assert_eq!(url, format!("/{}/{}/thank-you", member, slug));
        }

        assert!(matches!(
            navigator
                .transition_to(PROJECT_THANK_YOU, &RouteParams::new())
                .await,
            Err(DonationError::RouteError(_))
        ));
    }

    #[tokio::test]
    async fn test_history_navigator() {
        let navigator = HistoryNavigator::new(RouteTable::standard());
        let params = RouteParams::from([
            ("memberSlug".to_string(), "acme".to_string()),
            ("projectSlug".to_string(), "my-project".to_string()),
        ]);

        let url = navigator
            .transition_to(PROJECT_THANK_YOU, &params)
            .await
            .unwrap();
        assert_eq!(url, "/acme/my-project/thank-you");
        assert_eq!(navigator.history().await, vec![url]);

        assert!(matches!(
            navigator.transition_to("missing", &params).await,
            Err(DonationError::RouteError(_))
        ));
    }
}
