use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::reference::ReferenceTables;

/// The record handed to the view layer for one submitted photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisReport {
    pub class_index: usize,
    pub disease_name: String,
    pub description: String,
    pub prevention_steps: String,
    pub disease_image_url: String,
    pub supplement_name: String,
    pub supplement_image_url: String,
    pub supplement_buy_link: String,
}

impl DiagnosisReport {
    pub const ERROR_TITLE: &'static str = "Error";
    pub const RETRY_HINT: &'static str = "Please try again with a valid image.";

    /// Copies row `index` of both tables verbatim. Out-of-range indices use row 0.
    pub fn from_tables(tables: &ReferenceTables, index: usize) -> Self {
        let index = tables.clamp_index(index);
        let disease = tables.disease(index);
        let supplement = tables.supplement(index);
        Self {
            class_index: index,
            disease_name: disease.disease_name.clone(),
            description: disease.description.clone(),
            prevention_steps: disease.possible_steps.clone(),
            disease_image_url: disease.image_url.clone(),
            supplement_name: supplement.supplement_name.clone(),
            supplement_image_url: supplement.supplement_image.clone(),
            supplement_buy_link: supplement.buy_link.clone(),
        }
    }

    /// The degraded record: class 0, labelled as an error, no links.
    pub fn error(cause: impl Display) -> Self {
        Self {
            class_index: 0,
            disease_name: Self::ERROR_TITLE.to_string(),
            description: format!("An error occurred: {}", cause),
            prevention_steps: Self::RETRY_HINT.to_string(),
            disease_image_url: String::new(),
            supplement_name: String::new(),
            supplement_image_url: String::new(),
            supplement_buy_link: String::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.disease_name == Self::ERROR_TITLE && self.disease_image_url.is_empty()
    }
}

/// One entry of the supplement market listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketItem {
    pub disease_name: String,
    pub supplement_name: String,
    pub supplement_image_url: String,
    pub supplement_buy_link: String,
}

impl MarketItem {
    pub fn listing(tables: &ReferenceTables) -> Vec<Self> {
        tables
            .rows()
            .map(|(disease, supplement)| Self {
                disease_name: disease.disease_name.clone(),
                supplement_name: supplement.supplement_name.clone(),
                supplement_image_url: supplement.supplement_image.clone(),
                supplement_buy_link: supplement.buy_link.clone(),
            })
            .collect()
    }
}
