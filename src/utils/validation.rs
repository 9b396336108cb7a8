use serde::Serialize;
use std::collections::BTreeMap;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// Key under which messages that belong to the whole form are stored.
pub const FORM_LEVEL: &str = "";

/// Field name to messages, the shape a redisplayed form carries back to the client.
#[derive(Serialize, Debug, Default, Clone, PartialEq)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut form = FormErrors::new();
        collect(&mut form, "", &errors);
        form
    }
}

fn collect(form: &mut FormErrors, prefix: &str, errors: &ValidationErrors) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    form.add(&path, message_for(&path, error));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect(form, &path, nested),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect(form, &format!("{}[{}]", path, index), nested);
                }
            }
        }
    }
}

fn message_for(field: &str, error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => format!("The field {} is invalid ({}).", field, error.code),
    }
}

pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), FormErrors> {
    payload.validate().map_err(FormErrors::from)
}
