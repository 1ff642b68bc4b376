use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::firestore::api::DocumentSnapshot;
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::value::{FirestoreValue, ValueKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Clone, Debug)]
enum QueryStep {
    Limit {
        limit: u32,
        to_last: bool,
    },
    OrderBy {
        field: String,
        direction: Direction,
    },
    WhereEqualTo {
        field: String,
        value: FirestoreValue,
    },
    WhereNotEqualTo {
        field: String,
        value: FirestoreValue,
    },
    WhereArrayContains {
        field: String,
        values: Vec<FirestoreValue>,
    },
    WhereGreaterThan {
        field: String,
        value: FirestoreValue,
    },
    WhereGreaterThanOrEqualTo {
        field: String,
        value: FirestoreValue,
    },
    WhereLessThan {
        field: String,
        value: FirestoreValue,
    },
    WhereLessThanOrEqualTo {
        field: String,
        value: FirestoreValue,
    },
    WhereIn {
        field: String,
        values: Vec<FirestoreValue>,
    },
    WhereNotIn {
        field: String,
        values: Vec<FirestoreValue>,
    },
}

/// An accumulated sequence of filter/sort/limit clauses against a collection.
///
/// Clauses are validated as they are added, enforcing the same compound
/// restrictions real Firestore applies: one distinct field across all
/// range/not-equal/not-in clauses, at most one array-contains clause, at most
/// one disjunctive (in/not-in) clause, and no ordering by a field already
/// constrained by an `in` clause.
#[derive(Clone, Debug, Default)]
pub struct Query {
    steps: Vec<QueryStep>,
    compound_field: Option<String>,
    has_array_contains: bool,
    has_disjunctive: bool,
    in_fields: BTreeSet<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.steps.push(QueryStep::Limit {
            limit,
            to_last: false,
        });
        self
    }

    /// Keeps only the last `limit` results after ordering.
    pub fn limit_to_last(mut self, limit: u32) -> Self {
        self.steps.push(QueryStep::Limit {
            limit,
            to_last: true,
        });
        self
    }

    pub fn order_by(
        mut self,
        field: impl Into<String>,
        direction: Direction,
    ) -> FirestoreResult<Self> {
        let field = field.into();
        if self.in_fields.contains(&field) {
            return Err(invalid_argument(
                "Cannot order query by a field included in an in clause",
            ));
        }
        self.steps.push(QueryStep::OrderBy { field, direction });
        Ok(self)
    }

    pub fn where_equal_to(
        mut self,
        field: impl Into<String>,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Self> {
        self.steps.push(QueryStep::WhereEqualTo {
            field: field.into(),
            value: value.into(),
        });
        Ok(self)
    }

    pub fn where_not_equal_to(
        mut self,
        field: impl Into<String>,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Self> {
        let field = field.into();
        self.check_compound_field(&field)?;
        self.steps.push(QueryStep::WhereNotEqualTo {
            field,
            value: value.into(),
        });
        Ok(self)
    }

    pub fn where_array_contains(
        mut self,
        field: impl Into<String>,
        values: Vec<FirestoreValue>,
    ) -> FirestoreResult<Self> {
        if self.has_array_contains {
            return Err(invalid_argument(
                "Only one array contains clause is allowed per query",
            ));
        }
        self.has_array_contains = true;
        self.steps.push(QueryStep::WhereArrayContains {
            field: field.into(),
            values,
        });
        Ok(self)
    }

    pub fn where_greater_than(
        mut self,
        field: impl Into<String>,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Self> {
        let field = field.into();
        self.check_compound_field(&field)?;
        self.steps.push(QueryStep::WhereGreaterThan {
            field,
            value: value.into(),
        });
        Ok(self)
    }

    pub fn where_greater_than_or_equal_to(
        mut self,
        field: impl Into<String>,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Self> {
        let field = field.into();
        self.check_compound_field(&field)?;
        self.steps.push(QueryStep::WhereGreaterThanOrEqualTo {
            field,
            value: value.into(),
        });
        Ok(self)
    }

    pub fn where_less_than(
        mut self,
        field: impl Into<String>,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Self> {
        let field = field.into();
        self.check_compound_field(&field)?;
        self.steps.push(QueryStep::WhereLessThan {
            field,
            value: value.into(),
        });
        Ok(self)
    }

    pub fn where_less_than_or_equal_to(
        mut self,
        field: impl Into<String>,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Self> {
        let field = field.into();
        self.check_compound_field(&field)?;
        self.steps.push(QueryStep::WhereLessThanOrEqualTo {
            field,
            value: value.into(),
        });
        Ok(self)
    }

    pub fn where_in(
        mut self,
        field: impl Into<String>,
        values: Vec<FirestoreValue>,
    ) -> FirestoreResult<Self> {
        self.check_disjunctive()?;
        let field = field.into();
        self.in_fields.insert(field.clone());
        self.steps.push(QueryStep::WhereIn { field, values });
        Ok(self)
    }

    pub fn where_not_in(
        mut self,
        field: impl Into<String>,
        values: Vec<FirestoreValue>,
    ) -> FirestoreResult<Self> {
        self.check_disjunctive()?;
        let field = field.into();
        self.check_compound_field(&field)?;
        self.steps.push(QueryStep::WhereNotIn { field, values });
        Ok(self)
    }

    fn check_compound_field(&mut self, field: &str) -> FirestoreResult<()> {
        match &self.compound_field {
            Some(existing) if existing != field => Err(invalid_argument(
                "Range and not equals comparisons must all filter on the same field",
            )),
            _ => {
                self.compound_field = Some(field.to_string());
                Ok(())
            }
        }
    }

    fn check_disjunctive(&mut self) -> FirestoreResult<()> {
        if self.has_disjunctive {
            return Err(invalid_argument(
                "Only one in, not-in or array-contains-any clause is allowed per query",
            ));
        }
        self.has_disjunctive = true;
        Ok(())
    }

    /// Applies the accumulated clauses to a candidate document list.
    ///
    /// Runs the conventional filter, then sort, then limit pipeline: filters
    /// in declaration order, order-by clauses as one lexicographic sort, the
    /// last declared limit at the end.
    pub(crate) fn apply(&self, documents: Vec<DocumentSnapshot>) -> Vec<DocumentSnapshot> {
        let mut filtered: Vec<DocumentSnapshot> = documents
            .into_iter()
            .filter(|snapshot| self.matches(snapshot))
            .collect();

        let order_by: Vec<(&String, Direction)> = self
            .steps
            .iter()
            .filter_map(|step| match step {
                QueryStep::OrderBy { field, direction } => Some((field, *direction)),
                _ => None,
            })
            .collect();
        if !order_by.is_empty() {
            filtered.sort_by(|left, right| {
                for (field, direction) in &order_by {
                    let mut ordering = compare_values(
                        left.get(field).unwrap_or(&FirestoreValue::null()),
                        right.get(field).unwrap_or(&FirestoreValue::null()),
                    );
                    if *direction == Direction::Descending {
                        ordering = ordering.reverse();
                    }
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let limit = self.steps.iter().rev().find_map(|step| match step {
            QueryStep::Limit { limit, to_last } => Some((*limit as usize, *to_last)),
            _ => None,
        });
        if let Some((limit, to_last)) = limit {
            if filtered.len() > limit {
                if to_last {
                    filtered.drain(0..filtered.len() - limit);
                } else {
                    filtered.truncate(limit);
                }
            }
        }

        filtered
    }

    fn matches(&self, snapshot: &DocumentSnapshot) -> bool {
        self.steps.iter().all(|step| match step {
            QueryStep::Limit { .. } | QueryStep::OrderBy { .. } => true,
            QueryStep::WhereEqualTo { field, value } => snapshot.get(field) == Some(value),
            QueryStep::WhereNotEqualTo { field, value } => {
                matches!(snapshot.get(field), Some(stored) if stored != value)
            }
            QueryStep::WhereArrayContains { field, values } => match snapshot.get(field) {
                Some(stored) => match stored.kind() {
                    ValueKind::Array(elements) => {
                        values.iter().all(|needle| elements.contains(needle))
                    }
                    _ => false,
                },
                None => false,
            },
            QueryStep::WhereGreaterThan { field, value } => {
                range_matches(snapshot.get(field), value, Ordering::Greater, false)
            }
            QueryStep::WhereGreaterThanOrEqualTo { field, value } => {
                range_matches(snapshot.get(field), value, Ordering::Greater, true)
            }
            QueryStep::WhereLessThan { field, value } => {
                range_matches(snapshot.get(field), value, Ordering::Less, false)
            }
            QueryStep::WhereLessThanOrEqualTo { field, value } => {
                range_matches(snapshot.get(field), value, Ordering::Less, true)
            }
            QueryStep::WhereIn { field, values } => {
                matches!(snapshot.get(field), Some(stored) if values.contains(stored))
            }
            QueryStep::WhereNotIn { field, values } => {
                matches!(snapshot.get(field), Some(stored) if !values.contains(stored))
            }
        })
    }
}

fn range_matches(
    stored: Option<&FirestoreValue>,
    bound: &FirestoreValue,
    wanted: Ordering,
    or_equal: bool,
) -> bool {
    let Some(stored) = stored else {
        return false;
    };
    if !same_family(stored, bound) {
        return false;
    }
    let ordering = compare_values(stored, bound);
    ordering == wanted || (or_equal && ordering == Ordering::Equal)
}

/// Range comparisons only apply between values of the same type family;
/// integers and doubles share the numeric family.
fn same_family(left: &FirestoreValue, right: &FirestoreValue) -> bool {
    kind_rank(left.kind()) == kind_rank(right.kind())
}

fn kind_rank(kind: &ValueKind) -> u8 {
    match kind {
        ValueKind::Null => 0,
        ValueKind::Boolean(_) => 1,
        ValueKind::Integer(_) | ValueKind::Double(_) => 2,
        ValueKind::Timestamp(_) => 3,
        ValueKind::String(_) => 4,
        ValueKind::Blob(_) => 5,
        ValueKind::Array(_) => 6,
        ValueKind::Map(_) => 7,
        ValueKind::Sentinel(_) => 8,
    }
}

/// Total order over stored values: null < boolean < number < timestamp <
/// string < blob < array < map, with numeric kinds comparing across each
/// other.
pub(crate) fn compare_values(left: &FirestoreValue, right: &FirestoreValue) -> Ordering {
    let rank = kind_rank(left.kind()).cmp(&kind_rank(right.kind()));
    if rank != Ordering::Equal {
        return rank;
    }
    match (left.kind(), right.kind()) {
        (ValueKind::Null, ValueKind::Null) => Ordering::Equal,
        (ValueKind::Boolean(a), ValueKind::Boolean(b)) => a.cmp(b),
        (ValueKind::Integer(a), ValueKind::Integer(b)) => a.cmp(b),
        (ValueKind::Double(a), ValueKind::Double(b)) => a.total_cmp(b),
        (ValueKind::Integer(a), ValueKind::Double(b)) => (*a as f64).total_cmp(b),
        (ValueKind::Double(a), ValueKind::Integer(b)) => a.total_cmp(&(*b as f64)),
        (ValueKind::Timestamp(a), ValueKind::Timestamp(b)) => a.cmp(b),
        (ValueKind::String(a), ValueKind::String(b)) => a.cmp(b),
        (ValueKind::Blob(a), ValueKind::Blob(b)) => a.as_slice().cmp(b.as_slice()),
        (ValueKind::Array(a), ValueKind::Array(b)) => {
            for (l, r) in a.iter().zip(b.iter()) {
                let ordering = compare_values(l, r);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.len().cmp(&b.len())
        }
        (ValueKind::Map(a), ValueKind::Map(b)) => {
            for ((lk, lv), (rk, rv)) in a.iter().zip(b.iter()) {
                let key_ordering = lk.cmp(rk);
                if key_ordering != Ordering::Equal {
                    return key_ordering;
                }
                let value_ordering = compare_values(lv, rv);
                if value_ordering != Ordering::Equal {
                    return value_ordering;
                }
            }
            a.len().cmp(&b.len())
        }
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::value::DocumentData;

    fn snapshot_for(id: &str, population: i64) -> DocumentSnapshot {
        let mut fields = DocumentData::new();
        fields.insert(
            "population".to_string(),
            FirestoreValue::from_integer(population),
        );
        DocumentSnapshot::new(id, fields)
    }

    fn cities() -> Vec<DocumentSnapshot> {
        vec![
            snapshot_for("sf", 100),
            snapshot_for("nyc", 50),
            snapshot_for("la", 75),
        ]
    }

    #[test]
    fn applies_limit_and_ordering() {
        let query = Query::new()
            .order_by("population", Direction::Ascending)
            .unwrap()
            .limit(2);

        let result = query.apply(cities());
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id(), "nyc");
        assert_eq!(result[1].id(), "la");
    }

    #[test]
    fn limit_declared_before_order_still_sorts_first() {
        // Clauses are normalized into the filter -> sort -> limit pipeline
        // regardless of declaration order.
        let query = Query::new()
            .limit(2)
            .order_by("population", Direction::Descending)
            .unwrap();

        let result = query.apply(cities());
        assert_eq!(result[0].id(), "sf");
        assert_eq!(result[1].id(), "la");
    }

    #[test]
    fn limit_to_last_keeps_the_tail() {
        let query = Query::new()
            .order_by("population", Direction::Ascending)
            .unwrap()
            .limit_to_last(2);

        let result = query.apply(cities());
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id(), "la");
        assert_eq!(result[1].id(), "sf");
    }

    #[test]
    fn filters_by_equality_and_range() {
        let query = Query::new()
            .where_greater_than("population", 60_i64)
            .unwrap();
        let result = query.apply(cities());
        assert_eq!(result.len(), 2);

        let query = Query::new().where_equal_to("population", 50_i64).unwrap();
        let result = query.apply(cities());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id(), "nyc");
    }

    #[test]
    fn missing_field_satisfies_no_filter() {
        let mut fields = DocumentData::new();
        fields.insert("name".to_string(), FirestoreValue::from_string("x"));
        let docs = vec![DocumentSnapshot::new("bare", fields)];

        let query = Query::new()
            .where_not_equal_to("population", 1_i64)
            .unwrap();
        assert!(query.apply(docs.clone()).is_empty());

        let query = Query::new()
            .where_not_in("population", vec![FirestoreValue::from_integer(1)])
            .unwrap();
        assert!(query.apply(docs).is_empty());
    }

    #[test]
    fn rejects_second_inequality_field() {
        let err = Query::new()
            .where_greater_than("population", 10_i64)
            .unwrap()
            .where_less_than("area", 5_i64)
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }

    #[test]
    fn rejects_second_disjunctive_clause() {
        let err = Query::new()
            .where_in("state", vec![FirestoreValue::from_string("CA")])
            .unwrap()
            .where_not_in("state", vec![FirestoreValue::from_string("NY")])
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }

    #[test]
    fn rejects_second_array_contains() {
        let err = Query::new()
            .where_array_contains("tags", vec![FirestoreValue::from_string("a")])
            .unwrap()
            .where_array_contains("tags", vec![FirestoreValue::from_string("b")])
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }

    #[test]
    fn rejects_order_by_on_in_field() {
        let err = Query::new()
            .where_in("state", vec![FirestoreValue::from_string("CA")])
            .unwrap()
            .order_by("state", Direction::Ascending)
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore/invalid-argument");
    }

    #[test]
    fn array_contains_requires_every_element() {
        let mut fields = DocumentData::new();
        fields.insert(
            "tags".to_string(),
            FirestoreValue::from_array(vec![
                FirestoreValue::from_string("a"),
                FirestoreValue::from_string("b"),
            ]),
        );
        let docs = vec![DocumentSnapshot::new("tagged", fields)];

        let hit = Query::new()
            .where_array_contains(
                "tags",
                vec![
                    FirestoreValue::from_string("a"),
                    FirestoreValue::from_string("b"),
                ],
            )
            .unwrap();
        assert_eq!(hit.apply(docs.clone()).len(), 1);

        let miss = Query::new()
            .where_array_contains(
                "tags",
                vec![
                    FirestoreValue::from_string("a"),
                    FirestoreValue::from_string("c"),
                ],
            )
            .unwrap();
        assert!(miss.apply(docs).is_empty());
    }
}
