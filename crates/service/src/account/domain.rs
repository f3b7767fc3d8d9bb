use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use uuid::Uuid;

use models::account::{AccountStatus, AccountType, CompanySize, Model};

/// Persisted account record.
pub type Account = Model;

/// Caller-writable account fields.
///
/// Outer `None` leaves the stored value alone; for nullable columns the
/// inner `None` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountFields {
    pub name: Option<String>,
    pub account_number: Option<Option<String>>,
    pub status: Option<AccountStatus>,
    pub kind: Option<AccountType>,
    pub industry: Option<Option<String>>,
    pub company_size: Option<Option<CompanySize>>,
    pub annual_revenue: Option<Option<Decimal>>,
    pub website: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub is_invalid: Option<bool>,
    pub billing: AddressFields,
    pub shipping: AddressFields,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressFields {
    pub street: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub state: Option<Option<String>>,
    pub country: Option<Option<String>>,
    pub postal_code: Option<Option<String>>,
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

impl AccountFields {
    pub fn apply_to(self, m: &mut Account) {
        set(&mut m.name, self.name);
        set(&mut m.account_number, self.account_number);
        set(&mut m.status, self.status);
        set(&mut m.kind, self.kind);
        set(&mut m.industry, self.industry);
        set(&mut m.company_size, self.company_size);
        set(&mut m.annual_revenue, self.annual_revenue);
        set(&mut m.website, self.website);
        set(&mut m.description, self.description);
        set(&mut m.is_invalid, self.is_invalid);

        set(&mut m.billing_street, self.billing.street);
        set(&mut m.billing_city, self.billing.city);
        set(&mut m.billing_state, self.billing.state);
        set(&mut m.billing_country, self.billing.country);
        set(&mut m.billing_postal_code, self.billing.postal_code);

        set(&mut m.shipping_street, self.shipping.street);
        set(&mut m.shipping_city, self.shipping.city);
        set(&mut m.shipping_state, self.shipping.state);
        set(&mut m.shipping_country, self.shipping.country);
        set(&mut m.shipping_postal_code, self.shipping.postal_code);
    }

    /// Account number that would be stored after applying these fields.
    pub fn requested_account_number(&self) -> Option<&str> {
        self.account_number.as_ref().and_then(|n| n.as_deref())
    }
}

/// Input for [`AccountService::create`](super::service::AccountService::create).
///
/// `owner_user` and `created_by` are always taken from the acting user; a
/// payload carrying either one is refused.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAccount {
    pub fields: AccountFields,
    pub owner_user: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

/// Input for [`AccountService::update`](super::service::AccountService::update).
///
/// The immutable keys are carried so the service can drop them; they are
/// never applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountChanges {
    pub id: Option<Uuid>,
    pub created_at: Option<DateTime<FixedOffset>>,
    pub created_by: Option<Option<Uuid>>,
    pub owner_user: Option<Option<Uuid>>,
    pub fields: AccountFields,
}

impl From<AccountFields> for AccountChanges {
    fn from(fields: AccountFields) -> Self {
        Self { fields, ..Default::default() }
    }
}

impl From<AccountFields> for NewAccount {
    fn from(fields: AccountFields) -> Self {
        Self { fields, ..Default::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_only_touches_provided_fields() {
        let mut m = Account::new_blank("Acme", chrono::Utc::now().into());
        m.industry = Some("Tech".into());
        m.website = Some("https://acme.com".into());
        let fields = AccountFields {
            status: Some(AccountStatus::Active),
            website: Some(None),
            billing: AddressFields { city: Some(Some("Berlin".into())), ..Default::default() },
            ..Default::default()
        };
        fields.apply_to(&mut m);
        assert_eq!(m.name, "Acme");
        assert_eq!(m.status, AccountStatus::Active);
        assert_eq!(m.industry.as_deref(), Some("Tech"));
        assert!(m.website.is_none());
        assert_eq!(m.billing_city.as_deref(), Some("Berlin"));
        assert!(m.shipping_city.is_none());
    }

    #[test]
    fn requested_account_number_ignores_clears() {
        let mut f = AccountFields::default();
        assert_eq!(f.requested_account_number(), None);
        f.account_number = Some(None);
        assert_eq!(f.requested_account_number(), None);
        f.account_number = Some(Some("ACC-1".into()));
        assert_eq!(f.requested_account_number(), Some("ACC-1"));
    }
}
