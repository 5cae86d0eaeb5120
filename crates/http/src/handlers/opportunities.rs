use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use pipeline_core::{CommentDraft, OpportunityForm, RelatedRef, Scope, SessionState, SortBy};
use pipeline_service::{
    OpportunityService, PreferenceUpdate, ServiceError, ValidationErrors,
};

use crate::api_error::ApiError;
use crate::blocking::blocking;
use crate::query_types::{EditQuery, FilterRequest, IndexQuery, NewQuery, RedrawRequest};
use crate::response_types::{
    DeletedRecord, DestroyResponse, EditResponse, ListPayload, NewResponse, OpportunityTemplate,
    OptionsResponse, SaveFailure, SaveSuccess, ShowResponse, SortChoice,
};
use crate::handlers::{is_list_context, referer_account_id, require_user, wants_html};
use crate::session::session_key;
use crate::AppState;

enum SaveOutcome {
    Saved(Box<SaveSuccess>),
    Invalid(Box<SaveFailure>),
}

/// Runs the list pipeline for the given session snapshot and packages the
/// fragment payload (records + pagination + sidebar).
async fn run_list(
    state: &Arc<AppState>,
    scope: Scope,
    session: SessionState,
) -> Result<ListPayload, ApiError> {
    let opportunities = Arc::clone(&state.opportunities);
    let preferences = Arc::clone(&state.preferences);
    blocking(move || {
        let prefs = preferences.resolve(&scope.user_id)?;
        let page = opportunities.list(&scope, &prefs, &session)?;
        let sidebar = opportunities.sidebar(&scope)?;
        Ok(ListPayload::new(page, sidebar, prefs.outline))
    })
    .await
}

// GET /opportunities
pub async fn index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<IndexQuery>,
) -> Result<Json<ListPayload>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let key = session_key(&headers, &user.id);
    let mut session = state.sessions.load(&key).await;
    if let Some(page) = query.page {
        session.current_page = page.max(1);
    }
    let payload = run_list(&state, user.scope(), session.clone()).await?;
    state.sessions.store(&key, session).await;
    Ok(Json(payload))
}

// GET /opportunities/{id}
pub async fn show(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ShowResponse>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let scope = user.scope();
    let opportunities = Arc::clone(&state.opportunities);
    let opportunity = blocking(move || opportunities.show(&scope, &id)).await?;
    let comment = CommentDraft { commentable_id: opportunity.id.clone(), body: String::new() };
    Ok(Json(ShowResponse { opportunity, comment }))
}

// GET /opportunities/new
pub async fn new(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<NewQuery>,
) -> Result<Json<NewResponse>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let scope = user.scope();
    let related_ref = query
        .related
        .as_deref()
        .map(str::parse::<RelatedRef>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let opportunities = Arc::clone(&state.opportunities);
    let (users, accounts, related) = blocking(move || {
        let (users, accounts) = opportunities.form_candidates(&scope)?;
        let related = related_ref
            .map(|r| opportunities.resolve_related(&scope, &r))
            .transpose()?;
        Ok((users, accounts, related))
    })
    .await?;

    Ok(Json(NewResponse {
        opportunity: OpportunityTemplate::prospecting(&user.id),
        users,
        accounts,
        related,
    }))
}

// GET /opportunities/{id}/edit
pub async fn edit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<EditQuery>,
) -> Result<Json<EditResponse>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let scope = user.scope();
    let opportunities = Arc::clone(&state.opportunities);
    let previous = query.previous;

    let response = blocking(move || {
        let data = opportunities.edit_data(&scope, &id, previous.as_deref())?;
        let (users, accounts) = opportunities.form_candidates(&scope)?;
        let permitted = opportunities.permitted_user_ids(&data.opportunity.id)?;
        Ok(EditResponse {
            opportunity: data.opportunity,
            account: data.account,
            users,
            accounts,
            previous: data.previous,
            permitted,
        })
    })
    .await?;
    Ok(Json(response))
}

// POST /opportunities
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(form): Json<OpportunityForm>,
) -> Result<Response, ApiError> {
    let user = require_user(&state, &headers).await?;
    let scope = user.scope();
    let key = session_key(&headers, &user.id);
    let session = state.sessions.load(&key).await;
    let list_ctx = is_list_context(&headers);
    let referer_account = referer_account_id(&headers);

    let opportunities = Arc::clone(&state.opportunities);
    let preferences = Arc::clone(&state.preferences);
    let outcome = blocking(move || {
        match opportunities.create(&scope, &form) {
            Ok(opportunity) => {
                let list = if list_ctx {
                    let prefs = preferences.resolve(&scope.user_id)?;
                    let page = opportunities.list(&scope, &prefs, &session)?;
                    let sidebar = opportunities.sidebar(&scope)?;
                    Some(ListPayload::new(page, sidebar, prefs.outline))
                } else {
                    None
                };
                // Outside the list view, the related campaign's refreshed
                // summary is what the caller re-renders.
                let campaign = if list.is_none() {
                    opportunity
                        .campaign_id
                        .as_deref()
                        .and_then(|cid| opportunities.reload_campaign(&scope, cid).ok())
                } else {
                    None
                };
                Ok(SaveOutcome::Saved(Box::new(SaveSuccess { opportunity, list, campaign })))
            },
            Err(ServiceError::Validation(errors)) => {
                let failure = repopulate_create_form(
                    &opportunities,
                    &scope,
                    &form,
                    referer_account.as_deref(),
                    errors,
                )?;
                Ok(SaveOutcome::Invalid(Box::new(failure)))
            },
            Err(e) => Err(e),
        }
    })
    .await?;

    match outcome {
        SaveOutcome::Saved(success) => {
            let location = format!("/opportunities/{}", success.opportunity.id);
            Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(success))
                .into_response())
        },
        SaveOutcome::Invalid(failure) => {
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(failure)).into_response())
        },
    }
}

// PUT /opportunities/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(form): Json<OpportunityForm>,
) -> Result<Response, ApiError> {
    let user = require_user(&state, &headers).await?;
    let scope = user.scope();
    let key = session_key(&headers, &user.id);
    let session = state.sessions.load(&key).await;
    let list_ctx = is_list_context(&headers);

    let opportunities = Arc::clone(&state.opportunities);
    let preferences = Arc::clone(&state.preferences);
    let outcome = blocking(move || {
        match opportunities.update(&scope, &id, &form) {
            Ok(opportunity) => {
                let list = if list_ctx {
                    let prefs = preferences.resolve(&scope.user_id)?;
                    let page = opportunities.list(&scope, &prefs, &session)?;
                    let sidebar = opportunities.sidebar(&scope)?;
                    Some(ListPayload::new(page, sidebar, prefs.outline))
                } else {
                    None
                };
                Ok(SaveOutcome::Saved(Box::new(SaveSuccess { opportunity, list, campaign: None })))
            },
            Err(ServiceError::Validation(errors)) => {
                let failure = repopulate_update_form(&opportunities, &scope, &id, errors)?;
                Ok(SaveOutcome::Invalid(Box::new(failure)))
            },
            Err(e) => Err(e),
        }
    })
    .await?;

    match outcome {
        SaveOutcome::Saved(success) => Ok((StatusCode::OK, Json(success)).into_response()),
        SaveOutcome::Invalid(failure) => {
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(failure)).into_response())
        },
    }
}

// DELETE /opportunities/{id}
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let user = require_user(&state, &headers).await?;
    let scope = user.scope();
    let key = session_key(&headers, &user.id);
    let mut session = state.sessions.load(&key).await;
    let list_ctx = is_list_context(&headers);
    let html = wants_html(&headers);

    let opportunities = Arc::clone(&state.opportunities);
    let preferences = Arc::clone(&state.preferences);
    let (deleted, list, campaign, session) = blocking(move || {
        let deleted = opportunities.destroy(&scope, &id)?;
        if html {
            session.current_page = 1;
            return Ok((deleted, None, None, session));
        }
        if list_ctx {
            let prefs = preferences.resolve(&scope.user_id)?;
            let page = opportunities.list_stepping_back(&scope, &prefs, &mut session)?;
            let sidebar = opportunities.sidebar(&scope)?;
            Ok((deleted, Some(ListPayload::new(page, sidebar, prefs.outline)), None, session))
        } else {
            // Deleted from a related page: reset paging and hand back the
            // related campaign's refreshed summary.
            session.current_page = 1;
            let campaign = deleted
                .campaign_id
                .as_deref()
                .and_then(|cid| opportunities.reload_campaign(&scope, cid).ok());
            Ok((deleted, None, campaign, session))
        }
    })
    .await?;
    state.sessions.store(&key, session).await;

    if html {
        let notice = format!("{} has been deleted.", deleted.name);
        let notice = HeaderValue::from_str(&notice)
            .unwrap_or_else(|_| HeaderValue::from_static("Opportunity has been deleted."));
        let response = Response::builder()
            .status(StatusCode::SEE_OTHER)
            .header(header::LOCATION, "/opportunities")
            .header("x-flash-notice", notice)
            .body(axum::body::Body::empty())
            .map_err(|e| ApiError::Internal(e.into()))?;
        return Ok(response);
    }

    Ok(Json(DestroyResponse {
        deleted: DeletedRecord { id: deleted.id, name: deleted.name },
        list,
        campaign,
    })
    .into_response())
}

// GET /opportunities/search/{query}
pub async fn search(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(query): Path<String>,
) -> Result<Json<ListPayload>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let key = session_key(&headers, &user.id);
    let mut session = state.sessions.load(&key).await;
    session.current_query =
        if query.trim().is_empty() { None } else { Some(query.trim().to_string()) };
    session.current_page = 1;
    let payload = run_list(&state, user.scope(), session.clone()).await?;
    state.sessions.store(&key, session).await;
    Ok(Json(payload))
}

// GET /opportunities/options
pub async fn options(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<OptionsResponse>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let preferences = Arc::clone(&state.preferences);
    let user_id = user.id;
    let prefs = blocking(move || preferences.resolve(&user_id)).await?;
    let sort_choices = SortBy::CHOICES
        .iter()
        .map(|&(label, sort)| SortChoice { key: sort.as_str(), label })
        .collect();
    Ok(Json(OptionsResponse { preferences: prefs, sort_choices }))
}

// POST /opportunities/redraw
pub async fn redraw(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RedrawRequest>,
) -> Result<Json<ListPayload>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let scope = user.scope();
    let key = session_key(&headers, &user.id);
    let mut session = state.sessions.load(&key).await;

    let sort_by = request
        .sort_by
        .as_deref()
        .map(str::parse::<SortBy>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let update = PreferenceUpdate {
        per_page: request.per_page,
        outline: request.outline,
        sort_by,
    };

    session.current_page = 1;
    let user_id = user.id.clone();
    let preferences = Arc::clone(&state.preferences);
    blocking(move || preferences.update(&user_id, &update).map(|_| ())).await?;
    let payload = run_list(&state, scope, session.clone()).await?;
    state.sessions.store(&key, session).await;
    Ok(Json(payload))
}

// POST /opportunities/filter
pub async fn filter(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<FilterRequest>,
) -> Result<Json<ListPayload>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let key = session_key(&headers, &user.id);
    let mut session = state.sessions.load(&key).await;
    session.set_stage_filter(&request.stage);
    session.current_page = 1;
    let payload = run_list(&state, user.scope(), session.clone()).await?;
    state.sessions.store(&key, session).await;
    Ok(Json(payload))
}

/// Rebuilds the create form after a validation failure, preserving what
/// the user picked: the selected account by id, or the account page the
/// request came from, or a blank new account.
fn repopulate_create_form(
    opportunities: &OpportunityService,
    scope: &Scope,
    form: &OpportunityForm,
    referer_account: Option<&str>,
    errors: ValidationErrors,
) -> Result<SaveFailure, ServiceError> {
    let (users, accounts) = opportunities.form_candidates(scope)?;
    let account = form
        .account
        .id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .or(referer_account)
        .and_then(|id| opportunities.find_account(scope, id));
    let contact =
        form.contact_id.as_deref().and_then(|id| opportunities.find_contact(scope, id));
    let campaign =
        form.campaign_id.as_deref().and_then(|id| opportunities.find_campaign(scope, id));
    Ok(SaveFailure { errors, users, accounts, account, contact, campaign })
}

/// Same for the update form; the account comes from the stored record
/// rather than the rejected input.
fn repopulate_update_form(
    opportunities: &OpportunityService,
    scope: &Scope,
    id: &str,
    errors: ValidationErrors,
) -> Result<SaveFailure, ServiceError> {
    let (users, accounts) = opportunities.form_candidates(scope)?;
    let account = opportunities
        .show(scope, id)
        .ok()
        .and_then(|opportunity| opportunities.find_account(scope, &opportunity.account_id));
    Ok(SaveFailure { errors, users, accounts, account, contact: None, campaign: None })
}
