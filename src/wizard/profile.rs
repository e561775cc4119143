use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validate::{check, validate_choice, validate_email, validate_range, validate_text};
use super::{FieldErrors, WizardForm};
use crate::models::ProfileMetadata;

pub const INDUSTRIES: [&str; 12] = [
    "Technology",
    "Healthcare",
    "Finance",
    "Education",
    "E-commerce",
    "Entertainment",
    "Manufacturing",
    "Real Estate",
    "Food & Beverage",
    "Travel & Tourism",
    "Automotive",
    "Fashion",
];

pub const SURVEY_FREQUENCIES: [&str; 3] = ["daily", "weekly", "monthly"];

pub const STEP_PERSONAL: u8 = 1;
pub const STEP_BACKGROUND: u8 = 2;
pub const STEP_PREFERENCES: u8 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileForm {
    pub full_name: String,
    pub email: String,
    pub age: Option<u64>,
    pub location: String,
    pub occupation: String,
    pub industries: Vec<String>,
    pub survey_frequency: String,
    pub email_notifications: bool,
    pub in_app_notifications: bool,
}

impl Default for ProfileForm {
    fn default() -> Self {
        ProfileForm {
            full_name: String::new(),
            email: String::new(),
            age: None,
            location: String::new(),
            occupation: String::new(),
            industries: Vec::new(),
            survey_frequency: String::new(),
            email_notifications: true,
            in_app_notifications: true,
        }
    }
}

impl ProfileForm {
    /// Share of the seven profile fields filled in, as a whole percentage.
    pub fn completion(&self) -> u8 {
        let filled = [
            !self.full_name.trim().is_empty(),
            !self.email.trim().is_empty(),
            self.age.is_some(),
            !self.location.trim().is_empty(),
            !self.occupation.trim().is_empty(),
            !self.survey_frequency.trim().is_empty(),
            !self.industries.is_empty(),
        ];
        let done = filled.iter().filter(|f| **f).count() as u32;
        ((done * 100 + 3) / 7) as u8
    }

    pub fn toggle_industry(&mut self, industry: &str, checked: bool) {
        self.industries.retain(|i| i != industry);
        if checked {
            self.industries.push(industry.to_string());
        }
    }

    pub fn to_metadata(&self, wallet: &str, created_at: DateTime<Utc>) -> ProfileMetadata {
        ProfileMetadata {
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
            age: self.age.unwrap_or_default().min(u64::from(u8::MAX)) as u8,
            location: self.location.trim().to_string(),
            occupation: self.occupation.trim().to_string(),
            industries: self.industries.clone(),
            survey_frequency: self.survey_frequency.trim().to_lowercase(),
            email_notifications: self.email_notifications,
            in_app_notifications: self.in_app_notifications,
            wallet: wallet.to_string(),
            created_at,
        }
    }
}

impl WizardForm for ProfileForm {
    const STEPS: u8 = STEP_PREFERENCES;

    fn validate_step(&self, step: u8) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            STEP_PERSONAL => {
                check(&mut errors, "fullName", validate_text(&self.full_name, "Full name", 1, 100));
                check(&mut errors, "email", validate_email(&self.email));
                check(&mut errors, "age", validate_range(self.age, "Age", 13, 120));
            }
            STEP_BACKGROUND => {
                check(&mut errors, "location", validate_text(&self.location, "Location", 1, 100));
                check(
                    &mut errors,
                    "occupation",
                    validate_text(&self.occupation, "Occupation", 1, 100),
                );
                if self.industries.is_empty() {
                    errors.insert("industries".into(), "Select at least one industry".into());
                } else if let Some(bad) = self.industries.iter().find(|i| !INDUSTRIES.contains(&i.as_str())) {
                    errors.insert("industries".into(), format!("Unknown industry: {bad}"));
                }
            }
            STEP_PREFERENCES => check(
                &mut errors,
                "surveyFrequency",
                validate_choice(&self.survey_frequency, "Select survey frequency", &SURVEY_FREQUENCIES),
            ),
            _ => {}
        }
        errors
    }
}
