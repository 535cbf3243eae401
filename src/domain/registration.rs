use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};

/// Reason stamped on requests cancelled because the organizer replaced the form.
pub const FORM_REPLACED_REASON: &str = "Registration form has been updated by the organizer. \
Please submit a new registration request with the updated form.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrationForm {
    pub id: Uuid,
    pub announcement_id: Uuid,
    pub fields: Vec<FormField>,
    pub created_at: DateTime<Utc>,
}

impl RegistrationForm {
    pub fn field(&self, id: Uuid) -> Option<&FormField> {
        self.fields.iter().find(|f| f.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormField {
    pub id: Uuid,
    pub form_id: Uuid,
    pub field_type: FormFieldType,
    pub label: String,
    pub required: bool,
    pub options: Option<Vec<String>>,
    pub position: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FormFieldType {
    Text,
    Textarea,
    Number,
    Select,
    Radio,
    Checkbox,
    Boolean,
    Date,
}

impl FormFieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormFieldType::Text => "text",
            FormFieldType::Textarea => "textarea",
            FormFieldType::Number => "number",
            FormFieldType::Select => "select",
            FormFieldType::Radio => "radio",
            FormFieldType::Checkbox => "checkbox",
            FormFieldType::Boolean => "boolean",
            FormFieldType::Date => "date",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(FormFieldType::Text),
            "textarea" => Some(FormFieldType::Textarea),
            "number" => Some(FormFieldType::Number),
            "select" => Some(FormFieldType::Select),
            "radio" => Some(FormFieldType::Radio),
            "checkbox" => Some(FormFieldType::Checkbox),
            "boolean" => Some(FormFieldType::Boolean),
            "date" => Some(FormFieldType::Date),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFormFieldRequest {
    pub field_type: FormFieldType,
    #[validate(length(min = 1, max = 200))]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrationRequest {
    pub id: Uuid,
    pub announcement_id: Uuid,
    pub user_id: Uuid,
    /// Organizer of the owning announcement.
    pub organizer_id: Uuid,
    pub status: RegistrationStatus,
    pub cancellation_reason: Option<String>,
    pub form_responses: Vec<FormFieldAnswer>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Expired,
}

impl RegistrationStatus {
    pub const ACTIVE: [RegistrationStatus; 2] =
        [RegistrationStatus::Pending, RegistrationStatus::Approved];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
            RegistrationStatus::Cancelled => "cancelled",
            RegistrationStatus::Expired => "expired",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(RegistrationStatus::Pending),
            "approved" => Some(RegistrationStatus::Approved),
            "rejected" => Some(RegistrationStatus::Rejected),
            "cancelled" => Some(RegistrationStatus::Cancelled),
            "expired" => Some(RegistrationStatus::Expired),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    /// Checks that a reviewer-driven transition to `target` is legal from this status.
    pub fn ensure_can_transition(&self, target: RegistrationStatus) -> Result<()> {
        let legal = match target {
            RegistrationStatus::Approved | RegistrationStatus::Rejected => {
                *self == RegistrationStatus::Pending
            }
            RegistrationStatus::Cancelled => self.is_active(),
            RegistrationStatus::Expired => *self == RegistrationStatus::Pending,
            RegistrationStatus::Pending => false,
        };
        if legal {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "Cannot change registration request from '{}' to '{}'",
                self.as_str(),
                target.as_str()
            )))
        }
    }
}

/// A stored answer, read back with the label of the field it answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormFieldAnswer {
    pub id: Uuid,
    pub form_field_id: Uuid,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormFieldResponseInput {
    pub form_field_id: Uuid,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreateRegistrationRequest {
    #[serde(default)]
    pub form_responses: Vec<FormFieldResponseInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RejectRegistrationRequest {
    pub reason: Option<String>,
}

/// Validated submission ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewRegistrationRequest {
    pub announcement_id: Uuid,
    pub user_id: Uuid,
    pub form_responses: Vec<FormFieldResponseInput>,
}

/// Checks a submission against the announcement's form, if it has one.
///
/// Without a form no answers are accepted. With a form, every answer must
/// reference a field of that form at most once and every required field must
/// be answered.
pub fn validate_form_responses(
    form: Option<&RegistrationForm>,
    responses: &[FormFieldResponseInput],
) -> Result<()> {
    let Some(form) = form else {
        if responses.is_empty() {
            return Ok(());
        }
        return Err(AppError::Validation(
            "This announcement does not have a registration form. No form responses are required."
                .to_string(),
        ));
    };

    let mut provided = HashSet::new();
    let mut duplicates = BTreeSet::new();
    for response in responses {
        if !provided.insert(response.form_field_id) {
            duplicates.insert(response.form_field_id);
        }
    }

    let invalid: BTreeSet<Uuid> = provided
        .iter()
        .filter(|id| form.field(**id).is_none())
        .copied()
        .collect();
    if !invalid.is_empty() {
        return Err(AppError::Validation(format!(
            "Invalid form field IDs: {}. These fields do not belong to this announcement's registration form.",
            join_ids(&invalid)
        )));
    }

    if !duplicates.is_empty() {
        return Err(AppError::Validation(format!(
            "Duplicate responses for form fields: {}",
            join_ids(&duplicates)
        )));
    }

    let missing: Vec<&str> = form
        .fields
        .iter()
        .filter(|f| f.required && !provided.contains(&f.id))
        .map(|f| f.label.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    Ok(())
}

fn join_ids(ids: &BTreeSet<Uuid>) -> String {
    ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_statuses() {
        assert!(RegistrationStatus::Pending.is_active());
        assert!(RegistrationStatus::Approved.is_active());
        assert!(!RegistrationStatus::Rejected.is_active());
        assert!(!RegistrationStatus::Cancelled.is_active());
        assert!(!RegistrationStatus::Expired.is_active());
    }

    #[test]
    fn test_transitions_only_leave_pending() {
        use RegistrationStatus::*;
        assert!(Pending.ensure_can_transition(Approved).is_ok());
        assert!(Pending.ensure_can_transition(Rejected).is_ok());
        assert!(Pending.ensure_can_transition(Cancelled).is_ok());
        assert!(Pending.ensure_can_transition(Expired).is_ok());
        assert!(Approved.ensure_can_transition(Cancelled).is_ok());

        assert!(Approved.ensure_can_transition(Rejected).is_err());
        assert!(Rejected.ensure_can_transition(Approved).is_err());
        assert!(Expired.ensure_can_transition(Pending).is_err());
        assert!(Cancelled.ensure_can_transition(Approved).is_err());
        assert!(Cancelled.ensure_can_transition(Cancelled).is_err());
    }

    #[test]
    fn test_field_type_codec() {
        assert_eq!(FormFieldType::from_str("textarea"), Some(FormFieldType::Textarea));
        assert_eq!(FormFieldType::from_str("DATE"), Some(FormFieldType::Date));
        assert_eq!(FormFieldType::Boolean.as_str(), "boolean");
        assert_eq!(FormFieldType::from_str("file"), None);
    }

    fn form(required: &[(&str, bool)]) -> RegistrationForm {
        let form_id = Uuid::new_v4();
        RegistrationForm {
            id: form_id,
            announcement_id: Uuid::new_v4(),
            fields: required
                .iter()
                .enumerate()
                .map(|(i, (label, required))| FormField {
                    id: Uuid::new_v4(),
                    form_id,
                    field_type: FormFieldType::Text,
                    label: label.to_string(),
                    required: *required,
                    options: None,
                    position: i as i32,
                })
                .collect(),
            created_at: Utc::now(),
        }
    }

    fn answer(field_id: Uuid) -> FormFieldResponseInput {
        FormFieldResponseInput {
            form_field_id: field_id,
            value: "x".to_string(),
        }
    }

    #[test]
    fn test_no_form_rejects_answers() {
        assert!(validate_form_responses(None, &[]).is_ok());
        let err = validate_form_responses(None, &[answer(Uuid::new_v4())]).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("does not have a registration form")));
    }

    #[test]
    fn test_missing_required_fields_are_listed_by_label() {
        let form = form(&[("Discord Username", true), ("Team", false), ("Rank", true)]);
        let err = validate_form_responses(Some(&form), &[]).unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ref m) if m == "Missing required fields: Discord Username, Rank"
        ));

        let answers = [answer(form.fields[0].id), answer(form.fields[2].id)];
        assert!(validate_form_responses(Some(&form), &answers).is_ok());
    }

    #[test]
    fn test_foreign_and_duplicate_field_ids() {
        let form = form(&[("Discord Username", true)]);
        let stranger = Uuid::new_v4();
        let err = validate_form_responses(Some(&form), &[answer(form.fields[0].id), answer(stranger)])
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains(&stranger.to_string())));

        let err = validate_form_responses(
            Some(&form),
            &[answer(form.fields[0].id), answer(form.fields[0].id)],
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.starts_with("Duplicate responses")));
    }
}
