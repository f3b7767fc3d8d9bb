//! Boundary validation for account payloads.
//!
//! Turns a raw JSON body into typed [`NewAccount`] / [`AccountChanges`]
//! values, collecting every problem as a per-field message instead of
//! stopping at the first one. Read-only keys (`updated_at`, `updated_by`)
//! and unknown keys are ignored.
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use url::Url;
use uuid::Uuid;

use models::account::{limits, AccountStatus, AccountType, CompanySize};

use super::domain::{Account, AccountChanges, AccountFields, AddressFields, NewAccount};
use super::repository::AccountRepository;
use crate::errors::{FieldErrors, ServiceError};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NULL: &str = "This field may not be null.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const NOT_A_NUMBER: &str = "A valid number is required.";
pub const NOT_A_BOOLEAN: &str = "Must be a valid boolean.";
pub const INVALID_URL: &str = "Enter a valid URL.";
pub const NEGATIVE_REVENUE: &str = "Annual revenue must be a positive number.";
pub const ACCOUNT_NUMBER_TAKEN: &str = "An account with this account number already exists.";

fn max_length(n: usize) -> String {
    format!("Ensure this field has no more than {n} characters.")
}

fn invalid_choice(raw: &str) -> String {
    format!("\"{raw}\" is not a valid choice.")
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Walks one payload object, recording per-field errors as it goes.
struct Reader<'a> {
    body: &'a Map<String, Value>,
    errors: FieldErrors,
}

impl<'a> Reader<'a> {
    fn new(body: &'a Value) -> Result<Self, ServiceError> {
        match body {
            Value::Object(body) => Ok(Self { body, errors: FieldErrors::new() }),
            other => Err(ServiceError::field(
                "non_field_errors",
                format!("Invalid data. Expected a dictionary, but got {}.", type_name(other)),
            )),
        }
    }

    fn raw(&self, field: &str) -> Option<&'a Value> {
        self.body.get(field)
    }

    /// Trimmed text; numbers are accepted and rendered as text.
    fn text(&mut self, field: &str, v: &Value) -> Option<String> {
        match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => {
                self.errors.add(field, NOT_A_STRING);
                None
            }
        }
    }

    fn required_string(&mut self, field: &str, max: usize, required: bool) -> Option<String> {
        let Some(v) = self.raw(field) else {
            if required {
                self.errors.add(field, REQUIRED);
            }
            return None;
        };
        if v.is_null() {
            self.errors.add(field, NULL);
            return None;
        }
        let s = self.text(field, v)?;
        if s.is_empty() {
            self.errors.add(field, BLANK);
            return None;
        }
        if s.chars().count() > max {
            self.errors.add(field, max_length(max));
            return None;
        }
        Some(s)
    }

    /// Blank strings are stored as NULL.
    fn optional_string(&mut self, field: &str, max: Option<usize>) -> Option<Option<String>> {
        let v = self.raw(field)?;
        if v.is_null() {
            return Some(None);
        }
        let s = self.text(field, v)?;
        if s.is_empty() {
            return Some(None);
        }
        if let Some(max) = max {
            if s.chars().count() > max {
                self.errors.add(field, max_length(max));
                return None;
            }
        }
        Some(Some(s))
    }

    fn choice<T: FromStr>(&mut self, field: &str) -> Option<Option<T>> {
        let v = self.raw(field)?;
        match v {
            Value::Null => Some(None),
            Value::String(s) if s.trim().is_empty() => Some(None),
            Value::String(s) => match s.parse::<T>() {
                Ok(c) => Some(Some(c)),
                Err(_) => {
                    self.errors.add(field, invalid_choice(s));
                    None
                }
            },
            other => {
                self.errors.add(field, invalid_choice(&other.to_string()));
                None
            }
        }
    }

    /// Choice on a non-nullable column: null and blank are errors, not defaults.
    fn required_choice<T: FromStr>(&mut self, field: &str) -> Option<T> {
        let v = self.raw(field)?;
        match v {
            Value::Null => {
                self.errors.add(field, NULL);
                None
            }
            Value::String(s) => match s.trim().parse::<T>() {
                Ok(c) => Some(c),
                Err(_) => {
                    self.errors.add(field, invalid_choice(s));
                    None
                }
            },
            other => {
                self.errors.add(field, invalid_choice(&other.to_string()));
                None
            }
        }
    }

    fn decimal(&mut self, field: &str, digits: u32, scale: u32) -> Option<Option<Decimal>> {
        let v = self.raw(field)?;
        let raw = match v {
            Value::Null => return Some(None),
            Value::String(s) if s.trim().is_empty() => return Some(None),
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => {
                self.errors.add(field, NOT_A_NUMBER);
                return None;
            }
        };
        // digit separators parse as Decimal but are not numbers on the wire
        if raw.contains('_') {
            self.errors.add(field, NOT_A_NUMBER);
            return None;
        }
        let Ok(value) = Decimal::from_str(&raw).or_else(|_| Decimal::from_scientific(&raw)) else {
            self.errors.add(field, NOT_A_NUMBER);
            return None;
        };
        let places = value.scale();
        let whole_digits = value.trunc().abs().to_string().trim_start_matches('0').len() as u32;
        if whole_digits + places > digits {
            self.errors.add(field, format!("Ensure that there are no more than {digits} digits in total."));
            return None;
        }
        if places > scale {
            self.errors.add(field, format!("Ensure that there are no more than {scale} decimal places."));
            return None;
        }
        if whole_digits > digits - scale {
            self.errors.add(
                field,
                format!("Ensure that there are no more than {} digits before the decimal point.", digits - scale),
            );
            return None;
        }
        Some(Some(value))
    }

    fn url(&mut self, field: &str, max: usize) -> Option<Option<String>> {
        let value = self.optional_string(field, Some(max))?;
        match value {
            Some(s) if !is_valid_url(&s) => {
                self.errors.add(field, INVALID_URL);
                None
            }
            other => Some(other),
        }
    }

    fn boolean(&mut self, field: &str) -> Option<bool> {
        let v = self.raw(field)?;
        let parsed = match v {
            Value::Null => {
                self.errors.add(field, NULL);
                return None;
            }
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => match s.trim() {
                "true" | "True" | "TRUE" | "t" | "T" | "yes" | "Yes" | "YES" | "y" | "Y" | "on" | "On" | "ON" | "1" => Some(true),
                "false" | "False" | "FALSE" | "f" | "F" | "no" | "No" | "NO" | "n" | "N" | "off" | "Off" | "OFF" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        };
        match parsed {
            Some(b) => Some(b),
            None => {
                self.errors.add(field, NOT_A_BOOLEAN);
                None
            }
        }
    }

    fn user_ref(&mut self, field: &str) -> Option<Option<Uuid>> {
        let v = self.raw(field)?;
        match v {
            Value::Null => Some(None),
            Value::String(s) => match Uuid::parse_str(s.trim()) {
                Ok(id) => Some(Some(id)),
                Err(_) => {
                    self.errors.add(field, format!("Invalid pk \"{s}\" - object does not exist."));
                    None
                }
            },
            other => {
                self.errors.add(
                    field,
                    format!("Incorrect type. Expected pk value, received {}.", type_name(other)),
                );
                None
            }
        }
    }

    fn address(&mut self, prefix: &str) -> AddressFields {
        AddressFields {
            street: self.optional_string(&format!("{prefix}_street"), Some(limits::STREET)),
            city: self.optional_string(&format!("{prefix}_city"), Some(limits::CITY)),
            state: self.optional_string(&format!("{prefix}_state"), Some(limits::STATE)),
            country: self.optional_string(&format!("{prefix}_country"), Some(limits::COUNTRY)),
            postal_code: self.optional_string(&format!("{prefix}_postal_code"), Some(limits::POSTAL_CODE)),
        }
    }

    /// Every writable account column. `name_required` is false for PATCH.
    fn fields(&mut self, name_required: bool) -> AccountFields {
        let annual_revenue = self.decimal("annual_revenue", limits::REVENUE_DIGITS, limits::REVENUE_SCALE);
        if let Some(Some(rev)) = annual_revenue {
            if rev < Decimal::ZERO {
                self.errors.add("annual_revenue", NEGATIVE_REVENUE);
            }
        }
        AccountFields {
            name: self.required_string("name", limits::NAME, name_required),
            account_number: self.optional_string("account_number", Some(limits::ACCOUNT_NUMBER)),
            status: self.required_choice::<AccountStatus>("status"),
            kind: self.required_choice::<AccountType>("type"),
            industry: self.optional_string("industry", Some(limits::INDUSTRY)),
            company_size: self.choice::<CompanySize>("company_size"),
            annual_revenue,
            website: self.url("website", limits::WEBSITE),
            description: self.optional_string("description", None),
            is_invalid: self.boolean("is_invalid"),
            billing: self.address("billing"),
            shipping: self.address("shipping"),
        }
    }

    fn finish<T>(self, value: T) -> Result<T, ServiceError> {
        self.errors.into_result().map(|_| value)
    }
}

/// Absolute http(s)/ftp(s) URL with a dotted host, `localhost` or an IP.
pub fn is_valid_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else { return false };
    if !matches!(url.scheme(), "http" | "https" | "ftp" | "ftps") {
        return false;
    }
    match url.host() {
        Some(url::Host::Domain(d)) => d == "localhost" || (d.contains('.') && !d.ends_with('.')),
        Some(_) => true,
        None => false,
    }
}

/// Parse a create payload without touching the store.
pub fn parse_create(body: &Value) -> Result<NewAccount, ServiceError> {
    let mut r = Reader::new(body)?;
    let fields = r.fields(true);
    let owner_user = r.user_ref("owner_user").flatten();
    r.finish(NewAccount { fields, owner_user, created_by: None })
}

/// Parse an update payload; `partial` is PATCH semantics.
pub fn parse_update(body: &Value, partial: bool) -> Result<AccountChanges, ServiceError> {
    let mut r = Reader::new(body)?;
    let fields = r.fields(!partial);
    // never applied on update, so only its presence matters
    let owner_user = r
        .raw("owner_user")
        .map(|v| v.as_str().and_then(|s| Uuid::parse_str(s.trim()).ok()));
    let id = r.raw("id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok());
    let created_at = r
        .raw("created_at")
        .and_then(Value::as_str)
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok());
    let created_by = r
        .raw("created_by")
        .map(|v| v.as_str().and_then(|s| Uuid::parse_str(s).ok()));
    r.finish(AccountChanges { id, created_at, created_by, owner_user, fields })
}

async fn check_account_number(
    repo: &dyn AccountRepository,
    fields: &AccountFields,
    exclude: Option<Uuid>,
) -> Result<(), ServiceError> {
    if let Some(number) = fields.requested_account_number() {
        if repo.account_number_taken(number, exclude).await? {
            return Err(ServiceError::field("account_number", ACCOUNT_NUMBER_TAKEN));
        }
    }
    Ok(())
}

/// Full create validation including the `account_number` uniqueness check.
pub async fn validate_create(repo: &dyn AccountRepository, body: &Value) -> Result<NewAccount, ServiceError> {
    let new = parse_create(body)?;
    check_account_number(repo, &new.fields, None).await?;
    Ok(new)
}

/// Full update validation; the uniqueness check skips `instance` itself.
pub async fn validate_update(
    repo: &dyn AccountRepository,
    body: &Value,
    instance: &Account,
    partial: bool,
) -> Result<AccountChanges, ServiceError> {
    let changes = parse_update(body, partial)?;
    check_account_number(repo, &changes.fields, Some(instance.id)).await?;
    Ok(changes)
}
