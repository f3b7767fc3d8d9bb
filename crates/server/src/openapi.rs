use utoipa::OpenApi;
use utoipa::ToSchema;

use crate::routes::accounts::{AccountBody, AccountList};
use crate::routes::auth::LoginOutput;
use crate::routes::me::MeBody;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct LoginRequest { pub username: String, pub password: String }

/// Writable account fields. All optional for PATCH; `name` required otherwise.
#[derive(ToSchema)]
pub struct AccountWrite {
    pub name: Option<String>,
    pub account_number: Option<String>,
    pub status: Option<String>,
    #[schema(rename = "type")]
    pub kind: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    /// Decimal number or string, must not be negative.
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
    pub is_invalid: Option<bool>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::me::me,
        crate::routes::accounts::list,
        crate::routes::accounts::create,
        crate::routes::accounts::retrieve,
        crate::routes::accounts::update,
        crate::routes::accounts::partial_update,
        crate::routes::accounts::destroy,
    ),
    components(
        schemas(
            HealthResponse,
            LoginRequest,
            LoginOutput,
            MeBody,
            AccountWrite,
            AccountBody,
            AccountList,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "accounts")
    )
)]
pub struct ApiDoc;
