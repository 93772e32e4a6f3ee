use crate::domain::card::CardParams;
use crate::domain::money::Amount;
use crate::domain::records::{Project, ProjectId, User, UserId};
use crate::error::{DonationError, Result};
use serde::Deserialize;
use std::io::Read;

/// One donation submission from a batch file.
///
/// Card columns are either all present (donate with a new card) or all blank
/// (donate with the user's most recently saved card).
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct DonationRow {
    pub user: UserId,
    pub email: String,
    pub project: ProjectId,
    pub member: String,
    pub slug: String,
    pub amount: Amount,
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub cvc: Option<String>,
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
}

impl DonationRow {
    /// The donor, without any platform customer attached.
    pub fn user(&self) -> User {
        User::new(self.user, self.email.clone())
    }

    /// The project being donated to.
    pub fn project(&self) -> Project {
        Project {
            id: self.project,
            member_slug: self.member.clone(),
            slug: self.slug.clone(),
        }
    }

    /// Card details, or `None` when the row should use a saved card.
    pub fn card_params(&self) -> Option<CardParams> {
        Some(CardParams {
            card_number: self.card_number.clone()?,
            cvc: self.cvc.clone()?,
            month: self.month.clone()?,
            year: self.year.clone()?,
        })
    }
}

/// Reads donation rows from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// so trailing card columns may be omitted entirely.
pub struct DonationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> DonationReader<R> {
    /// Creates a reader over CSV data with a header row.
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes rows; a malformed row yields an error and reading
    /// continues with the next one.
    pub fn donations(self) -> impl Iterator<Item = Result<DonationRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(DonationError::from))
    }
}
