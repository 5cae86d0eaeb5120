//! Model-level validation for opportunity forms.
//!
//! Runs before anything touches storage, so a rejected form never leaves
//! partial state (in particular, no orphaned account) behind.

use pipeline_core::{AccountField, AccountRef, OpportunityForm};

use crate::error::ValidationErrors;

/// Resolves the account side of a form: link by id when one is given,
/// otherwise create by name. `None` when the form names no account at all.
pub fn account_ref(account: &AccountField) -> Option<AccountRef> {
    if let Some(id) = account.id.as_deref() {
        if !id.trim().is_empty() {
            return Some(AccountRef::Existing(id.trim().to_string()));
        }
    }
    if let Some(name) = account.name.as_deref() {
        if !name.trim().is_empty() {
            return Some(AccountRef::New(name.trim().to_string()));
        }
    }
    None
}

/// Validates a form for create/update. Empty result means the form may be
/// persisted.
pub fn validate(form: &OpportunityForm) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    if form.name.trim().is_empty() {
        errors.add("name", "can't be blank");
    }
    if account_ref(&form.account).is_none() {
        errors.add("account", "can't be blank");
    }
    if let Some(probability) = form.probability {
        if probability > 100 {
            errors.add("probability", "must be between 0 and 100");
        }
    }
    if let Some(amount) = form.amount {
        if amount < 0.0 {
            errors.add("amount", "must be greater than or equal to 0");
        }
    }
    if let Some(discount) = form.discount {
        if discount < 0.0 {
            errors.add("discount", "must be greater than or equal to 0");
        } else if form.amount.is_some_and(|amount| discount > amount) {
            errors.add("discount", "cannot exceed amount");
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> OpportunityForm {
        OpportunityForm {
            name: "Deal".to_string(),
            account: AccountField { id: None, name: Some("Globex".to_string()) },
            ..OpportunityForm::default()
        }
    }

    #[test]
    fn valid_form_passes() {
        assert!(validate(&valid_form()).is_empty());
    }

    #[test]
    fn blank_name_and_account_are_rejected() {
        let form = OpportunityForm::default();
        let errors = validate(&form);
        assert_eq!(errors.on("name"), ["can't be blank"]);
        assert_eq!(errors.on("account"), ["can't be blank"]);
    }

    #[test]
    fn whitespace_account_name_counts_as_blank() {
        let mut form = valid_form();
        form.account = AccountField { id: Some("  ".to_string()), name: Some("".to_string()) };
        assert!(!validate(&form).is_empty());
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        let mut form = valid_form();
        form.probability = Some(150);
        form.amount = Some(100.0);
        form.discount = Some(250.0);
        let errors = validate(&form);
        assert!(!errors.on("probability").is_empty());
        assert!(!errors.on("discount").is_empty());
    }

    #[test]
    fn account_id_takes_precedence_over_name() {
        let field = AccountField {
            id: Some("abc".to_string()),
            name: Some("Globex".to_string()),
        };
        assert_eq!(account_ref(&field), Some(AccountRef::Existing("abc".to_string())));
    }
}
