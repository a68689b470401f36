//! List queries: pagination, sorting and filters.

use crate::error::ValidationErrors;
use crate::types::{Batch, Labelled, PaymentStatus, Registration};
use crate::validation::{parse_count, parse_label};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Default page size.
pub const DEFAULT_LIMIT: u32 = 10;

/// Largest page size a caller may ask for.
pub const MAX_LIMIT: u32 = 100;

/// Raw list parameters as they arrive in a query string.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// 1-based page
    pub page: Option<String>,
    /// Page size
    pub limit: Option<String>,
    /// Sort field
    pub sort_by: Option<String>,
    /// `asc` or `desc`
    pub sort_order: Option<String>,
    /// Payment status filter
    pub payment_status: Option<String>,
    /// `true` / `false`
    pub verified: Option<String>,
    /// `verified` / `unverified`, alias of `verified`
    pub status: Option<String>,
    /// Cohort filter
    pub batch: Option<String>,
    /// Free-text search
    pub search: Option<String>,
}

/// Fields a list may be sorted by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortField {
    /// Creation time
    #[default]
    CreatedAt,
    /// Last update time
    UpdatedAt,
    /// Registrant name
    Name,
    /// Email
    Email,
    /// Cohort number
    Batch,
    /// Registration ID
    RegistrationId,
    /// Contribution amount
    ContributionAmount,
    /// Payment status
    PaymentStatus,
}

impl SortField {
    /// Every sortable field.
    pub const ALL: &'static [Self] = &[
        Self::CreatedAt,
        Self::UpdatedAt,
        Self::Name,
        Self::Email,
        Self::Batch,
        Self::RegistrationId,
        Self::ContributionAmount,
        Self::PaymentStatus,
    ];

    /// Query-string name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
            Self::Name => "name",
            Self::Email => "email",
            Self::Batch => "batch",
            Self::RegistrationId => "registrationId",
            Self::ContributionAmount => "contributionAmount",
            Self::PaymentStatus => "paymentStatus",
        }
    }

    /// Compare two records on this field alone.
    #[must_use]
    pub fn compare(self, a: &Registration, b: &Registration) -> Ordering {
        match self {
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            Self::Name => a.details.name.cmp(&b.details.name),
            Self::Email => a.details.email.cmp(&b.details.email),
            Self::Batch => a.details.batch.cmp(&b.details.batch),
            Self::RegistrationId => a.registration_id.cmp(&b.registration_id),
            Self::ContributionAmount => a.contribution_amount.cmp(&b.contribution_amount),
            Self::PaymentStatus => a.payment_status.as_str().cmp(b.payment_status.as_str()),
        }
    }
}

impl Labelled for SortField {
    fn all() -> Vec<Self> {
        Self::ALL.to_vec()
    }

    fn label(self) -> String {
        self.as_str().to_string()
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.as_str() == label)
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first
    Asc,
    /// Largest first
    #[default]
    Desc,
}

impl SortOrder {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Orient an ascending comparison.
    #[must_use]
    pub const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

impl Labelled for SortOrder {
    fn all() -> Vec<Self> {
        vec![Self::Asc, Self::Desc]
    }

    fn label(self) -> String {
        match self {
            Self::Asc => "asc".to_string(),
            Self::Desc => "desc".to_string(),
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Record filters; every set filter must match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Only this payment status
    pub payment_status: Option<PaymentStatus>,
    /// Only verified (`true`) or unverified (`false`) records
    pub verified: Option<bool>,
    /// Only this cohort
    pub batch: Option<Batch>,
    /// Lower-cased substring of name, email, mobile, batch or registration ID
    pub search: Option<String>,
}

impl ListFilter {
    /// Whether `record` passes every filter.
    #[must_use]
    pub fn matches(&self, record: &Registration) -> bool {
        if self.payment_status.is_some_and(|status| status != record.payment_status) {
            return false;
        }
        if self.verified.is_some_and(|verified| verified != record.verified) {
            return false;
        }
        if self.batch.is_some_and(|batch| batch != record.details.batch) {
            return false;
        }
        match &self.search {
            None => true,
            Some(term) => {
                let details = &record.details;
                details.name.to_lowercase().contains(term)
                    || details.email.to_lowercase().contains(term)
                    || details.mobile.contains(term.as_str())
                    || details.batch.to_string().to_lowercase().contains(term)
                    || record.registration_id.as_str().to_lowercase().contains(term)
            },
        }
    }
}

/// A validated list query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery {
    /// 1-based page
    pub page: u32,
    /// Page size, 1 to [`MAX_LIMIT`]
    pub limit: u32,
    /// Primary sort key; the record ID breaks ties
    pub sort_by: SortField,
    /// Sort direction, applied to both keys
    pub sort_order: SortOrder,
    /// Filters
    pub filter: ListFilter,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
            filter: ListFilter::default(),
        }
    }
}

impl ListQuery {
    /// Records to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    /// Full ordering of two records: sort field, then record ID.
    #[must_use]
    pub fn compare(&self, a: &Registration, b: &Registration) -> Ordering {
        self.sort_order
            .apply(self.sort_by.compare(a, b).then_with(|| a.id.cmp(&b.id)))
    }
}

impl ListParams {
    /// Validate into a [`ListQuery`].
    ///
    /// # Errors
    ///
    /// Returns every malformed parameter.
    pub fn parse(&self) -> Result<ListQuery, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut query = ListQuery::default();

        if let Some(raw) = present(self.page.as_deref()) {
            match raw.parse::<u32>() {
                Ok(page) if page >= 1 => query.page = page,
                _ => errors.push("page", "must be an integer of at least 1"),
            }
        }
        if let Some(raw) = present(self.limit.as_deref()) {
            match raw.parse::<u32>() {
                Ok(limit) if (1..=MAX_LIMIT).contains(&limit) => query.limit = limit,
                _ => errors.push("limit", format!("must be an integer between 1 and {MAX_LIMIT}")),
            }
        }
        if let Some(raw) = present(self.sort_by.as_deref()) {
            collect(&mut errors, parse_label("sortBy", raw), |field| query.sort_by = field);
        }
        if let Some(raw) = present(self.sort_order.as_deref()) {
            collect(&mut errors, parse_label("sortOrder", raw), |order| query.sort_order = order);
        }
        if let Some(raw) = present(self.payment_status.as_deref()) {
            collect(&mut errors, parse_label("paymentStatus", raw), |status| {
                query.filter.payment_status = Some(status);
            });
        }
        if let Some(raw) = present(self.verified.as_deref()) {
            match raw {
                "true" => query.filter.verified = Some(true),
                "false" => query.filter.verified = Some(false),
                _ => errors.push("verified", "must be true or false"),
            }
        } else if let Some(raw) = present(self.status.as_deref()) {
            match raw {
                "verified" => query.filter.verified = Some(true),
                "unverified" => query.filter.verified = Some(false),
                _ => errors.push("status", "must be one of: verified, unverified"),
            }
        }
        if let Some(raw) = present(self.batch.as_deref()) {
            collect(&mut errors, parse_label("batch", raw), |batch| query.filter.batch = Some(batch));
        }
        query.filter.search = present(self.search.as_deref()).map(str::to_lowercase);

        errors.into_result(query)
    }
}

/// Query parameters of the pricing quote endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct QuoteParams {
    /// Cohort label
    pub batch: Option<String>,
    /// Adults, registrant included (default 1)
    pub adults: Option<String>,
    /// Children (default 0)
    pub children: Option<String>,
    /// Infants (default 0)
    pub infants: Option<String>,
}

impl QuoteParams {
    /// Validate into a cohort and party.
    ///
    /// # Errors
    ///
    /// Returns every malformed parameter; `batch` is required.
    pub fn parse(&self) -> Result<(Batch, crate::types::Attendees), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut attendees = crate::types::Attendees { adults: 1, children: 0, infants: 0 };
        let mut batch = None;

        match present(self.batch.as_deref()) {
            Some(raw) => collect(&mut errors, parse_label::<Batch>("batch", raw), |b| batch = Some(b)),
            None => errors.push("batch", "is required"),
        }
        if let Some(raw) = present(self.adults.as_deref()) {
            collect(&mut errors, parse_count("adults", raw), |n| attendees.adults = n);
        }
        if let Some(raw) = present(self.children.as_deref()) {
            collect(&mut errors, parse_count("children", raw), |n| attendees.children = n);
        }
        if let Some(raw) = present(self.infants.as_deref()) {
            collect(&mut errors, parse_count("infants", raw), |n| attendees.infants = n);
        }

        match batch {
            Some(batch) if errors.is_empty() => Ok((batch, attendees)),
            _ => Err(errors),
        }
    }
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

fn collect<T>(errors: &mut ValidationErrors, parsed: Result<T, ValidationErrors>, apply: impl FnOnce(T)) {
    match parsed {
        Ok(value) => apply(value),
        Err(failures) => {
            for failure in failures.errors() {
                errors.push(failure.field.clone(), failure.message.clone());
            }
        },
    }
}

/// One page of results plus the total match count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    /// Records on this page
    pub items: Vec<T>,
    /// Records matching the filters across all pages
    pub total: u64,
}

/// Pagination metadata returned alongside a page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Current page
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Total matches
    pub total: u64,
    /// Number of pages
    pub pages: u64,
    /// A later page exists
    pub has_next: bool,
    /// An earlier page exists
    pub has_prev: bool,
}

impl PageInfo {
    /// Metadata for `page` of size `limit` over `total` matches.
    #[must_use]
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let pages = total.div_ceil(u64::from(limit.max(1)));
        Self {
            page,
            limit,
            total,
            pages,
            has_next: u64::from(page) < pages,
            has_prev: page > 1,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        let mut params = ListParams::default();
        for (key, value) in pairs {
            let value = Some((*value).to_string());
            match *key {
                "page" => params.page = value,
                "limit" => params.limit = value,
                "sortBy" => params.sort_by = value,
                "sortOrder" => params.sort_order = value,
                "paymentStatus" => params.payment_status = value,
                "verified" => params.verified = value,
                "status" => params.status = value,
                "batch" => params.batch = value,
                "search" => params.search = value,
                _ => unreachable!("unknown key {key}"),
            }
        }
        params
    }

    #[test]
    fn defaults() {
        let query = ListParams::default().parse().unwrap();
        assert_eq!(query, ListQuery::default());
        assert_eq!(query.sort_by, SortField::CreatedAt);
        assert_eq!(query.sort_order, SortOrder::Desc);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn parses_filters_and_sort() {
        let query = params(&[
            ("page", "3"),
            ("limit", "25"),
            ("sortBy", "contributionAmount"),
            ("sortOrder", "asc"),
            ("paymentStatus", "completed"),
            ("status", "unverified"),
            ("batch", "Batch 12"),
            ("search", "  ASHA "),
        ])
        .parse()
        .unwrap();

        assert_eq!(query.offset(), 50);
        assert_eq!(query.sort_by, SortField::ContributionAmount);
        assert_eq!(query.sort_order, SortOrder::Asc);
        assert_eq!(query.filter.payment_status, Some(PaymentStatus::Completed));
        assert_eq!(query.filter.verified, Some(false));
        assert_eq!(query.filter.batch, Batch::new(12));
        assert_eq!(query.filter.search.as_deref(), Some("asha"));
    }

    #[test]
    fn rejects_out_of_range() {
        let errors = params(&[("page", "0"), ("limit", "101"), ("sortBy", "mobile"), ("verified", "yes")])
            .parse()
            .unwrap_err();
        for field in ["page", "limit", "sortBy", "verified"] {
            assert!(errors.has_field(field), "{field}");
        }
    }

    #[test]
    fn page_info_edges() {
        let info = PageInfo::new(1, 10, 0);
        assert_eq!(info.pages, 0);
        assert!(!info.has_next);
        assert!(!info.has_prev);

        let info = PageInfo::new(2, 10, 25);
        assert_eq!(info.pages, 3);
        assert!(info.has_next);
        assert!(info.has_prev);

        assert!(!PageInfo::new(3, 10, 25).has_next);
    }

    #[test]
    fn quote_params_default_to_single_adult() {
        let params = QuoteParams { batch: Some("Batch 4".to_string()), ..QuoteParams::default() };
        let (batch, attendees) = params.parse().unwrap();
        assert_eq!(batch, Batch::new(4).unwrap());
        assert_eq!(attendees.adults, 1);

        assert!(QuoteParams::default().parse().unwrap_err().has_field("batch"));
    }
}
