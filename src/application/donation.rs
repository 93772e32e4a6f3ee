use crate::domain::card::{CardParams, CardToken, TokenParams};
use crate::domain::money::Amount;
use crate::domain::ports::{CardTokenizerRef, NavigatorRef, RecordStoreRef, SessionContextRef};
use crate::domain::records::{
    NewPlatformCard, NewPlatformCustomer, NewSubscription, PlatformCard, PlatformCustomer,
    Project, SaveOptions, Subscription,
};
use crate::error::{DonationError, Result};
use crate::interfaces::router::PROJECT_THANK_YOU;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{Instrument, debug, info, info_span, warn};

/// The collaborators a workflow talks to. All of them are injected.
#[derive(Clone)]
pub struct Collaborators {
    pub tokenizer: CardTokenizerRef,
    pub store: RecordStoreRef,
    pub session: SessionContextRef,
    pub navigator: NavigatorRef,
}

/// How a donation is paid for.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentSource {
    /// Raw card details that still need tokenizing and saving.
    NewCard(CardParams),
    /// A card already saved for the user.
    ExistingCard(PlatformCard),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DonationRequest {
    pub amount: Amount,
    pub payment: PaymentSource,
}

/// One stage of the donation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Tokenize,
    EnsureCustomer,
    CreateCard,
    CreateSubscription,
    Navigate,
}

impl Step {
    pub const NEW_CARD: &'static [Step] = &[
        Step::Tokenize,
        Step::EnsureCustomer,
        Step::CreateCard,
        Step::CreateSubscription,
        Step::Navigate,
    ];

    pub const EXISTING_CARD: &'static [Step] = &[Step::CreateSubscription, Step::Navigate];

    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Tokenize => "tokenize",
            Step::EnsureCustomer => "ensure_customer",
            Step::CreateCard => "create_card",
            Step::CreateSubscription => "create_subscription",
            Step::Navigate => "navigate",
        }
    }

    /// Attributes a collaborator failure to this step, keeping the
    /// collaborator's message.
    fn fail(self, err: DonationError) -> DonationError {
        let message = err.to_string();
        match self {
            Step::Tokenize => DonationError::Tokenization(message),
            Step::EnsureCustomer => DonationError::CustomerCreation(message),
            Step::CreateCard => DonationError::CardCreation(message),
            Step::CreateSubscription => DonationError::Subscription(message),
            Step::Navigate => DonationError::Navigation(message),
        }
    }
}

/// Records persisted by a submission so far.
///
/// Nothing is rolled back when a later step fails, so after a failure this is
/// what was left behind in the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatedRecords {
    pub customer: Option<PlatformCustomer>,
    pub card: Option<PlatformCard>,
    pub subscription: Option<Subscription>,
}

/// State of a single submission as observed by the UI layer.
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    pub is_loading: bool,
    pub error: Option<Arc<DonationError>>,
    pub created: CreatedRecords,
    pub redirected_to: Option<String>,
}

impl WorkflowState {
    /// True once the pipeline finished and navigated away.
    pub fn succeeded(&self) -> bool {
        !self.is_loading && self.error.is_none() && self.redirected_to.is_some()
    }
}

/// Clears `is_loading` when dropped, whether the pipeline finished or the
/// submission future was abandoned mid-flight.
struct LoadingGuard<'a>(&'a watch::Sender<WorkflowState>);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|state| state.is_loading = false);
    }
}

/// Values threaded between steps.
struct Pending {
    amount: Amount,
    card: Option<CardParams>,
    token: Option<CardToken>,
}

/// Runs donations to a single project.
pub struct DonationWorkflow {
    project: Project,
    collaborators: Collaborators,
}

impl DonationWorkflow {
    /// Creates a new `DonationWorkflow`.
    ///
    /// # Arguments
    ///
    /// * `project` - The project every donation goes to.
    /// * `collaborators` - Tokenizer, store, session and navigator to use.
    pub fn new(project: Project, collaborators: Collaborators) -> Self {
        Self {
            project,
            collaborators,
        }
    }

    /// The project donations go to.
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Starts a fresh submission with its own observable state.
    pub fn submission(&self) -> Submission<'_> {
        let (state, _) = watch::channel(WorkflowState::default());
        Submission {
            workflow: self,
            state,
        }
    }

    /// Tokenizes a new card, saves it and donates with it.
    pub async fn save_and_donate(&self, amount: Amount, card: CardParams) -> WorkflowState {
        self.submission().save_and_donate(amount, card).await
    }

    /// Donates with a card the user already saved.
    pub async fn donate(&self, amount: Amount, card: PlatformCard) -> WorkflowState {
        self.submission().donate(amount, card).await
    }

    /// Runs `request` in a fresh submission.
    pub async fn submit(&self, request: DonationRequest) -> WorkflowState {
        self.submission().submit(request).await
    }
}

/// A single submit action.
///
/// Running the submission consumes it, so its state is never shared with or
/// reset by another submission.
pub struct Submission<'w> {
    workflow: &'w DonationWorkflow,
    state: watch::Sender<WorkflowState>,
}

impl Submission<'_> {
    /// Observes this submission's state. The receiver closes once the
    /// submission has run.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> WorkflowState {
        self.state.borrow().clone()
    }

    /// Dispatches on the payment source.
    ///
    /// Never fails: errors are captured in the returned state.
    pub async fn submit(self, request: DonationRequest) -> WorkflowState {
        match request.payment {
            PaymentSource::NewCard(card) => self.save_and_donate(request.amount, card).await,
            PaymentSource::ExistingCard(card) => self.donate(request.amount, card).await,
        }
    }

    /// Runs the new-card pipeline.
    pub async fn save_and_donate(self, amount: Amount, card: CardParams) -> WorkflowState {
        let pending = Pending {
            amount,
            card: Some(card),
            token: None,
        };
        let span = info_span!(
            "save_and_donate",
            project = %self.workflow.project.id,
            %amount
        );
        self.run(Step::NEW_CARD, pending).instrument(span).await
    }

    /// Runs the saved-card pipeline.
    pub async fn donate(self, amount: Amount, card: PlatformCard) -> WorkflowState {
        let pending = Pending {
            amount,
            card: None,
            token: None,
        };
        let span = info_span!(
            "donate",
            project = %self.workflow.project.id,
            %amount,
            card = %card.id
        );
        self.run(Step::EXISTING_CARD, pending).instrument(span).await
    }

    async fn run(self, steps: &[Step], mut pending: Pending) -> WorkflowState {
        self.state.send_modify(|state| {
            state.error = None;
            state.is_loading = true;
        });

        {
            let _loading = LoadingGuard(&self.state);
            match self.execute(steps, &mut pending).await {
                Ok(()) => info!("donation completed"),
                Err(e) => {
                    warn!(error = %e, "donation failed");
                    self.state
                        .send_modify(|state| state.error = Some(Arc::new(e)));
                }
            }
        }

        self.state()
    }

    async fn execute(&self, steps: &[Step], pending: &mut Pending) -> Result<()> {
        for &step in steps {
            debug!(step = step.name(), "running step");
            self.run_step(step, pending)
                .await
                .map_err(|e| step.fail(e))?;
        }
        Ok(())
    }

    async fn run_step(&self, step: Step, pending: &mut Pending) -> Result<()> {
        let Collaborators {
            tokenizer,
            store,
            session,
            navigator,
        } = &self.workflow.collaborators;

        match step {
            Step::Tokenize => {
                let card = pending.card.as_ref().ok_or_else(|| {
                    DonationError::ValidationError("No card details to tokenize".to_string())
                })?;
                let token = tokenizer.create_token(&TokenParams::from(card)).await?;
                pending.token = Some(token);
            }
            Step::EnsureCustomer => {
                let user = session.current_user()?;
                if user.has_platform_customer() {
                    debug!(user = %user.id, "platform customer already exists");
                    return Ok(());
                }
                let customer = store
                    .save_customer(NewPlatformCustomer {
                        email: user.email,
                        user: user.id,
                    })
                    .await?;
                self.state
                    .send_modify(|state| state.created.customer = Some(customer.clone()));
                session.link_customer(&customer)?;
            }
            Step::CreateCard => {
                let token = pending.token.take().ok_or_else(|| {
                    DonationError::ValidationError("No card token available".to_string())
                })?;
                let user = session.current_user()?;
                let card = store
                    .save_card(NewPlatformCard {
                        stripe_token: token.id,
                        user: user.id,
                    })
                    .await?;
                self.state.send_modify(|state| state.created.card = Some(card));
            }
            Step::CreateSubscription => {
                let user = session.current_user()?;
                let options = SaveOptions {
                    project_id: self.workflow.project.id,
                };
                let subscription = store
                    .save_subscription(
                        NewSubscription {
                            quantity: pending.amount,
                            user: user.id,
                        },
                        &options,
                    )
                    .await?;
                self.state
                    .send_modify(|state| state.created.subscription = Some(subscription));
            }
            Step::Navigate => {
                let url = navigator
                    .transition_to(PROJECT_THANK_YOU, &self.workflow.project.route_params())
                    .await?;
                self.state
                    .send_modify(|state| state.redirected_to = Some(url));
            }
        }
        Ok(())
    }
}
