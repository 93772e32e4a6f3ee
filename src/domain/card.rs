use serde::{Deserialize, Serialize};

/// Card details as the donation form submits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardParams {
    pub card_number: String,
    pub cvc: String,
    pub month: String,
    pub year: String,
}

/// Parameters in the shape the card tokenizer expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenParams {
    pub number: String,
    pub cvc: String,
    pub exp_month: String,
    pub exp_year: String,
}

impl From<&CardParams> for TokenParams {
    fn from(card: &CardParams) -> Self {
        Self {
            number: card.card_number.clone(),
            cvc: card.cvc.clone(),
            exp_month: card.month.clone(),
            exp_year: card.year.clone(),
        }
    }
}

/// Token returned by the tokenizer; stands in for the raw card from here on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardToken {
    pub id: String,
}
