use axum::{extract::State, Json};
use serde_json::Value;
use services::forms::ContactForm;

use super::done;
use crate::web::error::ApiResult;
use crate::web::extract::CurrentUser;
use crate::web::state::AppState;

pub async fn contact(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> ApiResult<Json<Value>> {
    let outcome = state.public.contact(&user, form.validate()?).await?;
    Ok(done(outcome.message))
}
