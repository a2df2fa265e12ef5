//! The paginated query service.

use anyhow::{Result, bail};
use futures::future::try_join;

use super::{Filter, OrderBy, Paginated, Row, SelectExpr, SelectQuery, TableRef};
use crate::store::Backend;

/// Fetch one page of `table` under `base_filters` ∧ `filters`, plus the
/// total matching count and whether the base scope holds any rows at all.
///
/// `base_filters` define the scope (e.g. "belongs to this dataset") and
/// are always applied. `filters` narrow the page and the count but are
/// excluded from the existence probe, so an empty result can be told
/// apart from an empty scope. `additional_columns` are computed into the
/// base relation, which is why `filters` and `order_by` may reference
/// their aliases. `base_table` may point the existence probe at a cheaper
/// table or view than the projected one.
///
/// The page query and the count/existence computation are independent
/// read-only queries and run concurrently.
pub async fn paginated_get(
    backend: &dyn Backend,
    table: &TableRef,
    page_number: u32,
    page_size: u32,
    base_filters: &[Filter],
    filters: &[Filter],
    order_by: OrderBy,
    additional_columns: Option<&[SelectExpr]>,
    base_table: Option<&TableRef>,
) -> Result<Paginated<Row>> {
    if page_size == 0 {
        bail!("page size must be positive");
    }

    let query = SelectQuery {
        table: table.clone(),
        additional_columns: additional_columns.unwrap_or_default().to_vec(),
        base_filters: base_filters.to_vec(),
        filters: filters.to_vec(),
        order_by: Some(order_by),
        limit: Some(page_size),
        offset: Some(u64::from(page_number) * u64::from(page_size)),
    };

    let page = backend.select(&query);
    let stats = async {
        let total_count = backend.count(&query).await?;
        // Invariant: any row counted above also matches the base filters,
        // so a nonempty total implies a nonempty base scope. The probe is
        // only needed when the total is zero.
        let any_in_scope = if total_count > 0 {
            true
        } else {
            let probe = base_table.unwrap_or(table);
            backend.exists(probe, base_filters).await?
        };
        Ok::<_, anyhow::Error>((total_count, any_in_scope))
    };

    let (items, (total_count, any_in_scope)) = try_join(page, stats).await?;

    Ok(Paginated {
        items,
        total_count,
        any_in_scope,
    })
}
