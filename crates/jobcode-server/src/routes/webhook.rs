use std::collections::HashMap;

use axum::extract::State;
use axum::Form;
use jobcode_core::event::WebhookEvent;

use crate::error::AppError;
use crate::state::AppState;

pub const ACK: &str = "Thankyou!";

/// POST /: Teamwork webhook delivery.
///
/// A payload without `event` or `objectId` is logged and acknowledged so the
/// sender does not keep redelivering it. Recognised events are handled to
/// completion on the blocking pool before the acknowledgement is sent.
pub async fn receive(
    State(app): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<&'static str, AppError> {
    tracing::debug!(fields = ?form.keys().collect::<Vec<_>>(), "webhook received");

    let event = match WebhookEvent::from_form(&form) {
        Ok(event) => event,
        Err(missing) => {
            tracing::warn!(error = %missing, "ignoring malformed webhook");
            return Ok(ACK);
        }
    };

    let sink = app.sink.clone();
    let outcome = tokio::task::spawn_blocking(move || sink.handle(&event))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    tracing::debug!(?outcome, "webhook handled");
    Ok(ACK)
}
