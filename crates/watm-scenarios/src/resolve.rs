use std::collections::BTreeSet;

use watm_core::{Filter, Filters, ScenarioTable, WatmResult};

/// Resolve parameter filters to the set of matching scenario ids.
///
/// **Semantics:**
/// - `Equals(v)` keeps scenarios whose parameter equals `v`.
/// - `AnyOf(S)` keeps scenarios whose parameter is in `S` (OR within a parameter).
/// - Constraints on different parameters are combined with AND.
/// - No filters means every scenario.
///
/// All filter keys are validated before any row is inspected, so an unknown
/// parameter fails without doing any work.
pub fn resolve_scenarios(table: &ScenarioTable, filters: &Filters) -> WatmResult<BTreeSet<String>> {
    let constraints = bind_filters(table, filters)?;
    Ok(table
        .iter()
        .filter(|(_, row)| {
            constraints
                .iter()
                .all(|(column, filter)| filter.matches(&row[*column]))
        })
        .map(|(id, _)| id.to_string())
        .collect())
}

/// Map each filter to its column index, failing on the first unknown name.
pub(crate) fn bind_filters<'f>(
    table: &ScenarioTable,
    filters: &'f Filters,
) -> WatmResult<Vec<(usize, &'f Filter)>> {
    filters
        .iter()
        .map(|(name, filter)| table.require_param(name).map(|column| (column, filter)))
        .collect()
}

/// True when every filter accepts more than one value.
///
/// Such selections are served from the all-scenarios default snapshot. A
/// singleton or empty `AnyOf` pins the parameter just like `Equals`.
pub fn is_unconstrained(filters: &Filters) -> bool {
    filters.values().all(Filter::is_multi_valued)
}
