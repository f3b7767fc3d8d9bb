//! `/accounts/` collection and item endpoints.
use axum::{
    body::Bytes,
    extract::{OriginalUri, Path, Query, State},
    http::{StatusCode, Uri},
    Json,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use common::pagination::Pagination;
use models::account::{AccountStatus, AccountType, CompanySize};
use models::account_query::{AccountOrdering, AccountQuery};
use service::account::validation::{validate_create, validate_update};
use service::account::Account;
use service::errors::{FieldErrors, ServiceError};
use service::permission::{authorize, authorize_object, require_authenticated, Action};

use crate::auth::Requester;
use crate::errors::ApiError;
use crate::state::ServerState;

const UNKNOWN_OWNER: &str = "Select a valid choice. That choice is not one of the available choices.";

/// Account as rendered on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountBody {
    pub id: Uuid,
    pub name: String,
    pub account_number: Option<String>,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    /// Fixed two-decimal string, e.g. `"50000.00"`.
    pub annual_revenue: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub billing_street: Option<String>,
    pub billing_city: Option<String>,
    pub billing_state: Option<String>,
    pub billing_country: Option<String>,
    pub billing_postal_code: Option<String>,
    pub shipping_street: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_country: Option<String>,
    pub shipping_postal_code: Option<String>,
    pub owner_user: Option<Uuid>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<FixedOffset>,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime<FixedOffset>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub is_invalid: bool,
}

impl From<Account> for AccountBody {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            name: a.name,
            account_number: a.account_number,
            status: a.status.as_str().to_string(),
            kind: a.kind.as_str().to_string(),
            industry: a.industry,
            company_size: a.company_size.map(|s| s.as_str().to_string()),
            annual_revenue: a.annual_revenue.map(|mut d| {
                d.rescale(2);
                d.to_string()
            }),
            website: a.website,
            description: a.description,
            billing_street: a.billing_street,
            billing_city: a.billing_city,
            billing_state: a.billing_state,
            billing_country: a.billing_country,
            billing_postal_code: a.billing_postal_code,
            shipping_street: a.shipping_street,
            shipping_city: a.shipping_city,
            shipping_state: a.shipping_state,
            shipping_country: a.shipping_country,
            shipping_postal_code: a.shipping_postal_code,
            owner_user: a.owner_user,
            created_at: a.created_at,
            updated_at: a.updated_at,
            created_by: a.created_by,
            updated_by: a.updated_by,
            is_invalid: a.is_invalid,
        }
    }
}

/// Page-number envelope for the list endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountList {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<AccountBody>,
}

/// List query string. Empty values are ignored.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// prospect | active | inactive | lost
    pub status: Option<String>,
    /// customer | partner | vendor
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// 1-10 | 11-50 | 51-200 | 200+
    pub company_size: Option<String>,
    pub owner_user: Option<String>,
    /// Case-insensitive match on name, industry and account number.
    pub search: Option<String>,
    /// Comma separated; `-` prefix for descending.
    pub ordering: Option<String>,
    /// 1-based, or `last`.
    pub page: Option<String>,
    /// Capped at 100.
    pub page_size: Option<String>,
}

fn present(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

fn choice<T: std::str::FromStr>(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    let raw = present(raw)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            errors.add(field, e.to_string());
            None
        }
    }
}

impl ListParams {
    /// Translate filters into a query; bad values come back as field errors.
    async fn to_query(&self, state: &ServerState) -> Result<AccountQuery, ApiError> {
        let mut errors = FieldErrors::new();
        let status = choice::<AccountStatus>(&mut errors, "status", self.status.as_deref());
        let kind = choice::<AccountType>(&mut errors, "type", self.kind.as_deref());
        let size = choice::<CompanySize>(&mut errors, "company_size", self.company_size.as_deref());

        let mut owner = None;
        if let Some(raw) = present(self.owner_user.as_deref()) {
            let known = match Uuid::parse_str(raw) {
                Ok(id) => state.auth.repository().find_by_id(id).await?.map(|u| u.id),
                Err(_) => None,
            };
            match known {
                Some(id) => owner = Some(id),
                None => errors.add("owner_user", UNKNOWN_OWNER),
            }
        }
        errors.into_result()?;

        let mut query = AccountQuery::new().filter_by_params(None, size, status, owner);
        if let Some(kind) = kind {
            query = query.kind(kind);
        }
        if let Some(terms) = present(self.search.as_deref()) {
            query = query.search(terms);
        }
        Ok(query)
    }
}

/// Relative link to `page`, keeping every other query parameter.
/// Page 1 drops the `page` parameter entirely.
pub fn page_link(uri: &Uri, page: u64) -> String {
    let kept: Vec<(String, String)> = url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
        .into_owned()
        .filter(|(k, _)| k != "page")
        .collect();
    let mut qs = url::form_urlencoded::Serializer::new(String::new());
    qs.extend_pairs(kept.iter());
    if page > 1 {
        qs.append_pair("page", &page.to_string());
    }
    let qs = qs.finish();
    if qs.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), qs)
    }
}

/// An empty body reads as `{}`.
fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    Ok(serde_json::from_slice(body)?)
}

/// Both permission gates plus lookup. Malformed ids are simply not found.
async fn load(state: &ServerState, requester: &Requester, action: Action, raw_id: &str) -> Result<Account, ApiError> {
    let user = requester.user();
    authorize(state.policy.as_ref(), user, action)?;
    let id = Uuid::parse_str(raw_id).map_err(|_| ServiceError::not_found())?;
    let account = state.accounts.get(id).await?;
    authorize_object(state.policy.as_ref(), user, action, &account)?;
    Ok(account)
}

#[utoipa::path(get, path = "/accounts/", tag = "accounts", params(ListParams),
    responses(
        (status = 200, description = "One page of accounts", body = AccountList),
        (status = 400, description = "Invalid filter value"),
        (status = 403, description = "Not authenticated"),
        (status = 404, description = "Invalid page"),
    ))]
pub async fn list(
    State(state): State<ServerState>,
    requester: Requester,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<ListParams>,
) -> Result<Json<AccountList>, ApiError> {
    authorize(state.policy.as_ref(), requester.user(), Action::List)?;
    let query = params.to_query(&state).await?;
    let ordering = AccountOrdering::parse(present(params.ordering.as_deref()));
    let pagination = Pagination::from_query(params.page.as_deref(), params.page_size.as_deref())
        .map_err(ServiceError::from)?;

    let page = state.accounts.list_filtered(&query, &ordering, pagination).await?;
    let next = page.has_next().then(|| page_link(&uri, page.page + 1));
    let previous = page.has_previous().then(|| page_link(&uri, page.page - 1));
    Ok(Json(AccountList {
        count: page.total,
        next,
        previous,
        results: page.items.into_iter().map(AccountBody::from).collect(),
    }))
}

#[utoipa::path(post, path = "/accounts/", tag = "accounts",
    request_body = crate::openapi::AccountWrite,
    responses(
        (status = 201, description = "Created", body = AccountBody),
        (status = 400, description = "Validation errors keyed by field"),
        (status = 403, description = "Not authenticated"),
        (status = 409, description = "owner_user or created_by supplied"),
    ))]
pub async fn create(
    State(state): State<ServerState>,
    requester: Requester,
    body: Bytes,
) -> Result<(StatusCode, Json<AccountBody>), ApiError> {
    authorize(state.policy.as_ref(), requester.user(), Action::Create)?;
    let actor = require_authenticated(requester.user())?.id;
    let body = parse_body(&body)?;
    let input = validate_create(state.accounts.repository(), &body).await?;
    let created = state.accounts.create(input, actor).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(get, path = "/accounts/{id}/", tag = "accounts",
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account", body = AccountBody),
        (status = 403, description = "Not authenticated"),
        (status = 404, description = "Not found"),
    ))]
pub async fn retrieve(
    State(state): State<ServerState>,
    requester: Requester,
    Path(id): Path<String>,
) -> Result<Json<AccountBody>, ApiError> {
    let account = load(&state, &requester, Action::Retrieve, &id).await?;
    Ok(Json(account.into()))
}

async fn apply_update(
    state: ServerState,
    requester: Requester,
    id: String,
    body: Bytes,
    partial: bool,
) -> Result<Json<AccountBody>, ApiError> {
    let action = if partial { Action::PartialUpdate } else { Action::Update };
    let account = load(&state, &requester, action, &id).await?;
    let actor = require_authenticated(requester.user())?.id;
    let body = parse_body(&body)?;
    let changes = validate_update(state.accounts.repository(), &body, &account, partial).await?;
    let saved = state.accounts.update(account, changes, actor).await?;
    Ok(Json(saved.into()))
}

#[utoipa::path(put, path = "/accounts/{id}/", tag = "accounts",
    params(("id" = Uuid, Path, description = "Account id")),
    request_body = crate::openapi::AccountWrite,
    responses(
        (status = 200, description = "Updated", body = AccountBody),
        (status = 400, description = "Validation errors keyed by field"),
        (status = 403, description = "Not staff"),
        (status = 404, description = "Not found"),
    ))]
pub async fn update(
    State(state): State<ServerState>,
    requester: Requester,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<AccountBody>, ApiError> {
    apply_update(state, requester, id, body, false).await
}

#[utoipa::path(patch, path = "/accounts/{id}/", tag = "accounts",
    params(("id" = Uuid, Path, description = "Account id")),
    request_body = crate::openapi::AccountWrite,
    responses(
        (status = 200, description = "Updated", body = AccountBody),
        (status = 400, description = "Validation errors keyed by field"),
        (status = 403, description = "Not staff"),
        (status = 404, description = "Not found"),
    ))]
pub async fn partial_update(
    State(state): State<ServerState>,
    requester: Requester,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<AccountBody>, ApiError> {
    apply_update(state, requester, id, body, true).await
}

#[utoipa::path(delete, path = "/accounts/{id}/", tag = "accounts",
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 204, description = "Marked invalid"),
        (status = 403, description = "Not staff"),
        (status = 404, description = "Not found"),
    ))]
pub async fn destroy(
    State(state): State<ServerState>,
    requester: Requester,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let account = load(&state, &requester, Action::Destroy, &id).await?;
    let actor = require_authenticated(requester.user())?.id;
    state.accounts.soft_delete(account, actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
