//! Composable filters and orderings over the `account` table.
//!
//! An [`AccountQuery`] is a conjunction of [`AccountPredicate`]s. Every
//! predicate can be compiled to a SeaORM [`Condition`] for the database path
//! and evaluated against a loaded [`Model`] for the in-memory path, so both
//! stores agree on what a filter selects.
use std::cmp::Ordering;

use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{ColumnTrait, Condition, EntityTrait, Order, QueryFilter, QueryOrder, Select};
use uuid::Uuid;

use crate::account::{AccountStatus, AccountType, Column, CompanySize, Entity, Model};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountPredicate {
    Owner(Uuid),
    Industry(String),
    CompanySize(CompanySize),
    Status(AccountStatus),
    Kind(AccountType),
    Invalid(bool),
    /// Case-insensitive substring over name, industry and account number.
    Search(String),
}

impl AccountPredicate {
    pub fn matches(&self, m: &Model) -> bool {
        match self {
            Self::Owner(id) => m.owner_user == Some(*id),
            Self::Industry(industry) => m.industry.as_deref() == Some(industry.as_str()),
            Self::CompanySize(size) => m.company_size == Some(*size),
            Self::Status(status) => m.status == *status,
            Self::Kind(kind) => m.kind == *kind,
            Self::Invalid(flag) => m.is_invalid == *flag,
            Self::Search(term) => {
                let needle = term.to_lowercase();
                [Some(m.name.as_str()), m.industry.as_deref(), m.account_number.as_deref()]
                    .into_iter()
                    .flatten()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }

    pub fn condition(&self) -> Condition {
        let cond = Condition::all();
        match self {
            Self::Owner(id) => cond.add(Column::OwnerUser.eq(*id)),
            Self::Industry(industry) => cond.add(Column::Industry.eq(industry.clone())),
            Self::CompanySize(size) => cond.add(Column::CompanySize.eq(*size)),
            Self::Status(status) => cond.add(Column::Status.eq(*status)),
            Self::Kind(kind) => cond.add(Column::Kind.eq(*kind)),
            Self::Invalid(flag) => cond.add(Column::IsInvalid.eq(*flag)),
            Self::Search(term) => {
                let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
                let any = [Column::Name, Column::Industry, Column::AccountNumber]
                    .into_iter()
                    .fold(Condition::any(), |acc, col| {
                        acc.add(
                            Expr::expr(Func::lower(Expr::col(col)))
                                .like(LikeExpr::new(pattern.clone()).escape('\\')),
                        )
                    });
                cond.add(any)
            }
        }
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// AND of predicates. Order of composition never changes the result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountQuery {
    predicates: Vec<AccountPredicate>,
}

impl AccountQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: AccountPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Records not soft-deleted.
    pub fn active(self) -> Self {
        self.with(AccountPredicate::Invalid(false))
    }

    pub fn by_owner(self, user: Uuid) -> Self {
        self.with(AccountPredicate::Owner(user))
    }

    /// One equality filter per provided parameter; `None` is a no-op.
    pub fn filter_by_params(
        self,
        industry: Option<&str>,
        company_size: Option<CompanySize>,
        status: Option<AccountStatus>,
        owner: Option<Uuid>,
    ) -> Self {
        let mut q = self;
        if let Some(industry) = industry {
            q = q.with(AccountPredicate::Industry(industry.to_string()));
        }
        if let Some(size) = company_size {
            q = q.with(AccountPredicate::CompanySize(size));
        }
        if let Some(status) = status {
            q = q.with(AccountPredicate::Status(status));
        }
        if let Some(owner) = owner {
            q = q.by_owner(owner);
        }
        q
    }

    pub fn kind(self, kind: AccountType) -> Self {
        self.with(AccountPredicate::Kind(kind))
    }

    /// Every whitespace or comma separated term must hit at least one
    /// searchable field.
    pub fn search(self, terms: &str) -> Self {
        terms
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .fold(self, |q, t| q.with(AccountPredicate::Search(t.to_string())))
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, m: &Model) -> bool {
        self.predicates.iter().all(|p| p.matches(m))
    }

    pub fn condition(&self) -> Condition {
        self.predicates
            .iter()
            .fold(Condition::all(), |acc, p| acc.add(p.condition()))
    }

    pub fn apply(&self, select: Select<Entity>) -> Select<Entity> {
        if self.is_empty() {
            select
        } else {
            select.filter(self.condition())
        }
    }

    /// Shortcut for `Entity::find()` with this query applied.
    pub fn select(&self) -> Select<Entity> {
        self.apply(Entity::find())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderField {
    Name,
    CreatedAt,
    UpdatedAt,
    AnnualRevenue,
}

impl OrderField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(Self::Name),
            "created_at" => Some(Self::CreatedAt),
            "updated_at" => Some(Self::UpdatedAt),
            "annual_revenue" => Some(Self::AnnualRevenue),
            _ => None,
        }
    }

    fn column(self) -> Column {
        match self {
            Self::Name => Column::Name,
            Self::CreatedAt => Column::CreatedAt,
            Self::UpdatedAt => Column::UpdatedAt,
            Self::AnnualRevenue => Column::AnnualRevenue,
        }
    }

    fn compare(self, a: &Model, b: &Model) -> Ordering {
        match self {
            Self::Name => a.name.cmp(&b.name),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            Self::AnnualRevenue => nulls_last(a.annual_revenue, b.annual_revenue),
        }
    }
}

// NULL sorts after every value ascending, like Postgres.
fn nulls_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderTerm {
    pub field: OrderField,
    pub descending: bool,
}

/// Sort keys for account listings. Defaults to newest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountOrdering {
    terms: Vec<OrderTerm>,
}

impl Default for AccountOrdering {
    fn default() -> Self {
        Self { terms: vec![OrderTerm { field: OrderField::CreatedAt, descending: true }] }
    }
}

impl AccountOrdering {
    /// Parse `name,-created_at` style input. Unknown fields are dropped; if
    /// nothing usable remains the default ordering applies.
    pub fn parse(raw: Option<&str>) -> Self {
        let terms: Vec<OrderTerm> = raw
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter_map(|t| {
                let (descending, name) = match t.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, t),
                };
                OrderField::parse(name).map(|field| OrderTerm { field, descending })
            })
            .collect();
        if terms.is_empty() {
            Self::default()
        } else {
            Self { terms }
        }
    }

    pub fn terms(&self) -> &[OrderTerm] {
        &self.terms
    }

    pub fn apply(&self, select: Select<Entity>) -> Select<Entity> {
        let select = self.terms.iter().fold(select, |s, t| {
            s.order_by(t.field.column(), if t.descending { Order::Desc } else { Order::Asc })
        });
        // stable pages when sort keys tie
        select.order_by_asc(Column::Id)
    }

    pub fn compare(&self, a: &Model, b: &Model) -> Ordering {
        self.terms
            .iter()
            .map(|t| {
                let ord = t.field.compare(a, b);
                if t.descending { ord.reverse() } else { ord }
            })
            .find(|o| o.is_ne())
            .unwrap_or_else(|| a.id.cmp(&b.id))
    }

    pub fn sort(&self, rows: &mut [Model]) {
        rows.sort_by(|a, b| self.compare(a, b));
    }
}
