//! `account` entity: a company or organization tracked by the CRM.
//!
//! Top-level customer object; contacts, deals and interactions hang off it.
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub account_number: Option<String>,
    pub status: AccountStatus,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub kind: AccountType,

    pub industry: Option<String>,
    pub company_size: Option<CompanySize>,
    #[sea_orm(column_type = "Decimal(Some((20, 2)))", nullable)]
    pub annual_revenue: Option<Decimal>,
    pub website: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub owner_user: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub is_invalid: bool,

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
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    OwnerUser,
    CreatedBy,
    UpdatedBy,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::OwnerUser => Entity::belongs_to(user::Entity)
                .from(Column::OwnerUser)
                .to(user::Column::Id)
                .into(),
            Relation::CreatedBy => Entity::belongs_to(user::Entity)
                .from(Column::CreatedBy)
                .to(user::Column::Id)
                .into(),
            Relation::UpdatedBy => Entity::belongs_to(user::Entity)
                .from(Column::UpdatedBy)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::OwnerUser.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Lifecycle stage of an account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    #[sea_orm(string_value = "prospect")]
    Prospect,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
    #[sea_orm(string_value = "lost")]
    Lost,
}

/// Relationship of the organization to us.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    #[sea_orm(string_value = "customer")]
    Customer,
    #[sea_orm(string_value = "partner")]
    Partner,
    #[sea_orm(string_value = "vendor")]
    Vendor,
}

/// Headcount bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum CompanySize {
    #[sea_orm(string_value = "1-10")]
    #[serde(rename = "1-10")]
    Size1To10,
    #[sea_orm(string_value = "11-50")]
    #[serde(rename = "11-50")]
    Size11To50,
    #[sea_orm(string_value = "51-200")]
    #[serde(rename = "51-200")]
    Size51To200,
    #[sea_orm(string_value = "200+")]
    #[serde(rename = "200+")]
    Size200Plus,
}

/// Raised when a string is not one of an enum's wire values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChoice(pub String);

impl fmt::Display for UnknownChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Select a valid choice. {} is not one of the available choices.", self.0)
    }
}

impl std::error::Error for UnknownChoice {}

macro_rules! wire_choices {
    ($ty:ty { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self { $(Self::$variant => $wire),+ }
            }
        }

        impl FromStr for $ty {
            type Err = UnknownChoice;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(UnknownChoice(other.to_string())),
                }
            }
        }
    };
}

wire_choices!(AccountStatus {
    Prospect => "prospect",
    Active => "active",
    Inactive => "inactive",
    Lost => "lost",
});

wire_choices!(AccountType {
    Customer => "customer",
    Partner => "partner",
    Vendor => "vendor",
});

wire_choices!(CompanySize {
    Size1To10 => "1-10",
    Size11To50 => "11-50",
    Size51To200 => "51-200",
    Size200Plus => "200+",
});

/// Column limits shared by the schema and boundary validation.
pub mod limits {
    pub const NAME: usize = 255;
    pub const ACCOUNT_NUMBER: usize = 50;
    pub const INDUSTRY: usize = 100;
    pub const WEBSITE: usize = 200;
    pub const STREET: usize = 255;
    pub const CITY: usize = 100;
    pub const STATE: usize = 100;
    pub const COUNTRY: usize = 100;
    pub const POSTAL_CODE: usize = 20;
    /// decimal(20, 2)
    pub const REVENUE_DIGITS: u32 = 20;
    pub const REVENUE_SCALE: u32 = 2;
}

impl Model {
    /// Blank record owned by nobody, with schema defaults; used by the
    /// service layer before applying caller fields.
    pub fn new_blank(name: impl Into<String>, now: DateTimeWithTimeZone) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            account_number: None,
            status: AccountStatus::default(),
            kind: AccountType::default(),
            industry: None,
            company_size: None,
            annual_revenue: None,
            website: None,
            description: None,
            owner_user: None,
            created_at: now,
            updated_at: now,
            created_by: None,
            updated_by: None,
            is_invalid: false,
            billing_street: None,
            billing_city: None,
            billing_state: None,
            billing_country: None,
            billing_postal_code: None,
            shipping_street: None,
            shipping_city: None,
            shipping_state: None,
            shipping_country: None,
            shipping_postal_code: None,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_user == Some(user_id)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_round_trip_through_wire_values() {
        assert_eq!("200+".parse::<CompanySize>().unwrap(), CompanySize::Size200Plus);
        assert_eq!(CompanySize::Size11To50.as_str(), "11-50");
        assert_eq!("lost".parse::<AccountStatus>().unwrap(), AccountStatus::Lost);
        assert_eq!(AccountType::Vendor.as_str(), "vendor");
    }

    #[test]
    fn unknown_choice_message_names_the_value() {
        let err = "closed".parse::<AccountStatus>().unwrap_err();
        assert!(err.to_string().contains("closed is not one of the available choices"));
    }

    #[test]
    fn blank_model_uses_schema_defaults() {
        let m = Model::new_blank("Acme", chrono::Utc::now().into());
        assert_eq!(m.status, AccountStatus::Prospect);
        assert_eq!(m.kind, AccountType::Customer);
        assert!(!m.is_invalid);
        assert!(m.owner_user.is_none());
        assert_eq!(m.to_string(), "Acme");
    }

    #[test]
    fn serde_uses_wire_names() {
        let mut m = Model::new_blank("Acme", chrono::Utc::now().into());
        m.company_size = Some(CompanySize::Size51To200);
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["type"], "customer");
        assert_eq!(v["status"], "prospect");
        assert_eq!(v["company_size"], "51-200");
    }
}
