//! SQL fragments for list queries.
//!
//! Column names and sort directions come from closed enums, never from
//! request text; every user-supplied value is bound.

use reunion_core::query::{ListFilter, ListQuery, SortField};
use sqlx::{Postgres, QueryBuilder};

/// Expressions backing a sort field, most significant first.
///
/// Registration IDs sort by length before text so `REG100000` follows
/// `REG99999`.
pub(crate) const fn sort_keys(field: SortField) -> &'static [&'static str] {
    match field {
        SortField::CreatedAt => &["created_at"],
        SortField::UpdatedAt => &["updated_at"],
        SortField::Name => &["name"],
        SortField::Email => &["email"],
        SortField::Batch => &["batch"],
        SortField::RegistrationId => &["LENGTH(registration_id)", "registration_id"],
        SortField::ContributionAmount => &["contribution_amount"],
        SortField::PaymentStatus => &["payment_status"],
    }
}

/// `%term%` with LIKE wildcards in `term` escaped.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Append ` WHERE ...` for `filter`.
pub(crate) fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ListFilter) {
    builder.push(" WHERE TRUE");
    if let Some(status) = filter.payment_status {
        builder.push(" AND payment_status = ").push_bind(status.as_str());
    }
    if let Some(verified) = filter.verified {
        builder.push(" AND verified = ").push_bind(verified);
    }
    if let Some(batch) = filter.batch {
        builder.push(" AND batch = ").push_bind(i16::from(batch.number()));
    }
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        builder
            .push(" AND (LOWER(name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(email) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR mobile LIKE ")
            .push_bind(pattern.clone())
            .push(" OR ('batch ' || batch::text) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(registration_id) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Append ordering and paging for `query`.
pub(crate) fn push_page(builder: &mut QueryBuilder<'_, Postgres>, query: &ListQuery) {
    let direction = query.sort_order.as_sql();
    builder.push(" ORDER BY ");
    for key in sort_keys(query.sort_by) {
        builder.push(key).push(" ").push(direction).push(", ");
    }
    builder
        .push("id ")
        .push(direction)
        .push(" LIMIT ")
        .push_bind(i64::from(query.limit))
        .push(" OFFSET ")
        .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));
}
