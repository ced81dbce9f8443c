use std::cmp::Ordering;
use crate::core::types::{DocId, Document, FieldValue};
use crate::query::ast::{MissingValue, SortKey, SortOrder, SCORE_FIELD};

/// What a sort key looks at for one hit
pub struct SortView<'a> {
    pub id: &'a DocId,
    pub score: f32,
    pub doc: &'a Document,
}

/// Sorts by the keys in priority order. An empty key list means descending
/// score; remaining ties fall back to descending score, then ascending id, so
/// the order is total and pages stay stable.
pub fn sort_by_keys<T, F>(items: &mut [T], keys: &[SortKey], view: F)
where
    F: Fn(&T) -> SortView<'_>,
{
    items.sort_by(|a, b| compare(&view(a), &view(b), keys));
}

pub fn compare(a: &SortView, b: &SortView, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ordering = compare_key(a, b, key);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    by_score(a, b).then_with(|| a.id.cmp(b.id))
}

fn by_score(a: &SortView, b: &SortView) -> Ordering {
    b.score.total_cmp(&a.score)
}

fn compare_key(a: &SortView, b: &SortView, key: &SortKey) -> Ordering {
    if key.field == SCORE_FIELD {
        let ascending = a.score.total_cmp(&b.score);
        return directed(ascending, key.order);
    }

    let left = sort_value(a.doc, key);
    let right = sort_value(b.doc, key);
    match (left, right) {
        (Some(x), Some(y)) => directed(compare_values(&x, &y), key.order),
        (None, None) => Ordering::Equal,
        // Missing placement ignores direction
        (None, Some(_)) => missing_first(key),
        (Some(_), None) => missing_first(key).reverse(),
    }
}

fn directed(ascending: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ascending,
        SortOrder::Desc => ascending.reverse(),
    }
}

fn missing_first(key: &SortKey) -> Ordering {
    match key.missing {
        MissingValue::First => Ordering::Less,
        _ => Ordering::Greater,
    }
}

/// Value a document sorts by: the smallest element ascending, the largest
/// descending, or the configured default when the field is absent
fn sort_value(doc: &Document, key: &SortKey) -> Option<FieldValue> {
    let scalars: Vec<&FieldValue> = doc
        .get_field(&key.field)
        .map(|value| value.scalars())
        .unwrap_or_default();

    let picked = match key.order {
        SortOrder::Asc => scalars.into_iter().min_by(|x, y| compare_values(x, y)),
        SortOrder::Desc => scalars.into_iter().max_by(|x, y| compare_values(x, y)),
    };

    match (picked, &key.missing) {
        (Some(value), _) => Some(value.clone()),
        (None, MissingValue::Value(default)) => Some(default.clone()),
        (None, _) => None,
    }
}

fn kind_rank(value: &FieldValue) -> u8 {
    match value {
        FieldValue::Number(_) => 0,
        FieldValue::Date(_) => 1,
        FieldValue::Boolean(_) => 2,
        FieldValue::Text(_) | FieldValue::Keyword(_) => 3,
        FieldValue::List(_) => 4,
    }
}

/// Total order over scalars; mismatched kinds order by kind
fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    a.compare(b)
        .unwrap_or_else(|| kind_rank(a).cmp(&kind_rank(b)))
}
