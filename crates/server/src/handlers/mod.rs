pub mod chat;
pub mod health;
pub mod history;
pub mod index;
pub mod structured;

use axum::extract::rejection::FormRejection;
use axum::Form;
use serde::Deserialize;

/// Form body shared by the query endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct MessageForm {
    pub msg: Option<String>,
}

/// The non-blank `msg` field, if the body carried one.
pub(crate) fn message(form: Result<Form<MessageForm>, FormRejection>) -> Option<String> {
    match form {
        Ok(Form(MessageForm { msg: Some(msg) })) if !msg.trim().is_empty() => Some(msg),
        Ok(_) => None,
        Err(rejection) => {
            tracing::debug!("Rejected form body: {}", rejection);
            None
        }
    }
}
