//! Predicate pushdown and lookup-hint generation (spec §4.6). Grounded in
//! `original_source/tablestore/lookup.go`'s `keyExtractor`/`lookupTable`/
//! `GenerateLookupHint`/`GetSubsetTable`; the `FilterOp` set itself comes
//! straight from spec §4.6's predicate list rather than any planner
//! package -- SQL plan-node rewriting is out of scope per spec §1's
//! "external collaborator" framing.

use std::cmp::Ordering;

use crate::codec::keycode;
use crate::codec::value::Value;
use crate::error::CResult;

/// An atomic comparison predicate's operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
    True,
    False,
}

/// One argument to a predicate. `value` is materialized by the external
/// planner calling `TableRowFilter::evaluate` with the current outer row
/// before each inner scan (spec §4.6's correlated-subplan note); this core
/// has no expression evaluator of its own, so an argument with no
/// materialized value yet simply can't participate in hint generation or
/// post-filtering until `evaluate` runs.
#[derive(Clone, Debug, Default)]
pub struct FilterArg {
    pub value: Option<Value>,
}

impl FilterArg {
    pub fn literal(value: Value) -> Self {
        FilterArg { value: Some(value) }
    }

    pub fn get_value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

/// One atomic predicate on a single column.
#[derive(Clone, Debug)]
pub struct TableFilter {
    pub op: FilterOp,
    pub args: Vec<FilterArg>,
}

impl TableFilter {
    pub fn new(op: FilterOp, args: Vec<FilterArg>) -> Self {
        TableFilter { op, args }
    }
}

/// Per-column list of atomic predicates, indexed by column index.
#[derive(Clone, Debug, Default)]
pub struct TableRowFilter(pub Vec<Vec<TableFilter>>);

impl TableRowFilter {
    pub fn new(columns: usize) -> Self {
        TableRowFilter(vec![Vec::new(); columns])
    }

    pub fn push(&mut self, column: usize, filter: TableFilter) {
        if column >= self.0.len() {
            self.0.resize_with(column + 1, Vec::new);
        }
        self.0[column].push(filter);
    }

    /// The predicates registered against a single column, by index.
    pub fn column(&self, index: usize) -> &[TableFilter] {
        self.0.get(index).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// What `generate_lookup_hint` decided for the primary-key column.
pub enum LookupHint {
    /// `Eq`/`In` predicate at `predicate_index` yields the exact keys.
    KeyExtractor { predicate_index: usize },
    /// `Gt`/`Ge` seek bound (first-wins) plus every `Lt`/`Le` stop bound
    /// (all kept).
    RangeHint { seek: Option<(FilterOp, Value)>, until: Vec<(FilterOp, Value)> },
    /// No primary-key predicate is usable; re-entry into hint generation
    /// during execution is prevented by this sentinel.
    Unoptimized,
}

/// Picks the highest-priority usable predicate on the primary-key column:
/// `Eq`/`In` (first-wins) beats `Gt`/`Ge`+`Lt`/`Le` range bounds, which
/// beats giving up.
pub fn generate_lookup_hint(primary_key: usize, filter: &TableRowFilter) -> LookupHint {
    let predicates = filter.column(primary_key);

    for (i, p) in predicates.iter().enumerate() {
        if matches!(p.op, FilterOp::Eq | FilterOp::In) {
            return LookupHint::KeyExtractor { predicate_index: i };
        }
    }

    let mut seek = None;
    let mut until = Vec::new();
    for p in predicates {
        match p.op {
            FilterOp::Gt | FilterOp::Ge if seek.is_none() => {
                if let Some(value) = p.args.first().and_then(|a| a.value.clone()) {
                    seek = Some((p.op, value));
                }
            }
            FilterOp::Lt | FilterOp::Le => {
                if let Some(value) = p.args.first().and_then(|a| a.value.clone()) {
                    until.push((p.op, value));
                }
            }
            _ => {}
        }
    }

    if seek.is_some() || !until.is_empty() {
        LookupHint::RangeHint { seek, until }
    } else {
        LookupHint::Unoptimized
    }
}

/// Order-preserving comparison of two values via their primary-key
/// encoding (property 7), so predicate evaluation doesn't need a second,
/// independently-maintained ordering for every `Value` variant.
pub fn compare_values(a: &Value, b: &Value) -> CResult<Ordering> {
    Ok(keycode::encode_pk(a)?.cmp(&keycode::encode_pk(b)?))
}

/// Evaluates one predicate against a single cell value.
pub fn evaluate_predicate(cell: &Value, predicate: &TableFilter) -> CResult<bool> {
    Ok(match predicate.op {
        FilterOp::True => true,
        FilterOp::False => false,
        FilterOp::Eq => predicate.args.iter().any(|a| a.value.as_ref() == Some(cell)),
        FilterOp::Ne => predicate.args.iter().all(|a| a.value.as_ref() != Some(cell)),
        FilterOp::In => predicate.args.iter().any(|a| a.value.as_ref() == Some(cell)),
        FilterOp::NotIn => predicate.args.iter().all(|a| a.value.as_ref() != Some(cell)),
        FilterOp::Gt => match predicate.args.first().and_then(|a| a.value.as_ref()) {
            Some(bound) => compare_values(cell, bound)? == Ordering::Greater,
            None => true,
        },
        FilterOp::Ge => match predicate.args.first().and_then(|a| a.value.as_ref()) {
            Some(bound) => compare_values(cell, bound)? != Ordering::Less,
            None => true,
        },
        FilterOp::Lt => match predicate.args.first().and_then(|a| a.value.as_ref()) {
            Some(bound) => compare_values(cell, bound)? == Ordering::Less,
            None => true,
        },
        FilterOp::Le => match predicate.args.first().and_then(|a| a.value.as_ref()) {
            Some(bound) => compare_values(cell, bound)? != Ordering::Greater,
            None => true,
        },
    })
}

/// Re-evaluates every predicate in `filter` against `row`; a row fails the
/// post-filter if any column's predicate list rejects it.
pub fn post_filter_row(schema_len: usize, filter: &TableRowFilter, row: &[Value]) -> CResult<bool> {
    for col in 0..schema_len.min(filter.0.len()) {
        for predicate in filter.column(col) {
            if !evaluate_predicate(&row[col], predicate)? {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod test {
    use super::*;

    fn eq(value: Value) -> TableFilter {
        TableFilter::new(FilterOp::Eq, vec![FilterArg::literal(value)])
    }

    #[test]
    fn eq_wins_over_range_bounds() {
        let mut filter = TableRowFilter::new(1);
        filter.push(0, TableFilter::new(FilterOp::Gt, vec![FilterArg::literal(Value::Int32(1))]));
        filter.push(0, eq(Value::Int32(5)));
        match generate_lookup_hint(0, &filter) {
            LookupHint::KeyExtractor { predicate_index } => assert_eq!(predicate_index, 1),
            _ => panic!("expected KeyExtractor"),
        }
    }

    #[test]
    fn range_bounds_collected_when_no_eq_or_in() {
        let mut filter = TableRowFilter::new(1);
        filter.push(0, TableFilter::new(FilterOp::Ge, vec![FilterArg::literal(Value::Int32(1))]));
        filter.push(0, TableFilter::new(FilterOp::Lt, vec![FilterArg::literal(Value::Int32(10))]));
        match generate_lookup_hint(0, &filter) {
            LookupHint::RangeHint { seek, until } => {
                assert_eq!(seek, Some((FilterOp::Ge, Value::Int32(1))));
                assert_eq!(until, vec![(FilterOp::Lt, Value::Int32(10))]);
            }
            _ => panic!("expected RangeHint"),
        }
    }

    #[test]
    fn unoptimized_when_no_primary_key_predicate() {
        let filter = TableRowFilter::new(1);
        assert!(matches!(generate_lookup_hint(0, &filter), LookupHint::Unoptimized));
    }

    #[test]
    fn post_filter_rejects_non_matching_row() {
        let mut filter = TableRowFilter::new(2);
        filter.push(1, eq(Value::Text("B".into())));
        assert!(!post_filter_row(2, &filter, &[Value::Text("b".into()), Value::Text("A".into())]).unwrap());
        assert!(post_filter_row(2, &filter, &[Value::Text("b".into()), Value::Text("B".into())]).unwrap());
    }
}
