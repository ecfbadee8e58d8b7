//! Filter, paginate, and facet over a materialized dish list.
//!
//! All three operations are total: they never fail, for any list including
//! the empty one.

use std::collections::BTreeSet;

use campus_shared::{
    DEFAULT_PAGE, DEFAULT_PAGE_SIZE, Dish, DishPage, Facets, normalize_positive,
};

/// Keep the dishes that satisfy every supplied constraint, in input order.
///
/// - `tag` must equal `dish.tag` exactly.
/// - `canteen` must equal one element of `dish.canteen`.
/// - `search` must occur in `dish.name`, ignoring case.
///
/// `None` and empty strings impose no constraint.
pub fn filter(
    dishes: &[Dish],
    tag: Option<&str>,
    canteen: Option<&str>,
    search: Option<&str>,
) -> Vec<Dish> {
    let tag = tag.filter(|t| !t.is_empty());
    let canteen = canteen.filter(|c| !c.is_empty());
    let needle = search.filter(|s| !s.is_empty()).map(str::to_lowercase);

    dishes
        .iter()
        .filter(|dish| tag.is_none_or(|t| dish.tag == t))
        .filter(|dish| canteen.is_none_or(|c| dish.served_at(c)))
        .filter(|dish| {
            needle
                .as_deref()
                .is_none_or(|n| dish.name.to_lowercase().contains(n))
        })
        .cloned()
        .collect()
}

/// Slice one page out of `filtered`.
///
/// Non-positive or absent `page` / `page_size` fall back to 1 / 20. A page past
/// the end yields an empty `list`; `total` is always the full filtered length.
pub fn paginate(filtered: &[Dish], page: Option<i64>, page_size: Option<i64>) -> DishPage {
    let page = normalize_positive(page, DEFAULT_PAGE);
    let page_size = normalize_positive(page_size, DEFAULT_PAGE_SIZE);
    let total = filtered.len();

    let list = (page - 1)
        .checked_mul(page_size)
        .filter(|start| *start < total)
        .map(|start| {
            let end = start.saturating_add(page_size).min(total);
            filtered[start..end].to_vec()
        })
        .unwrap_or_default();

    DishPage {
        list,
        total,
        page,
        page_size,
    }
}

/// Distinct tags and canteens over the full, unfiltered dataset, sorted ascending.
///
/// Empty tags from malformed rows are left out; they are not a usable filter value.
pub fn facets(dishes: &[Dish]) -> Facets {
    let tags: BTreeSet<&str> = dishes
        .iter()
        .map(|d| d.tag.as_str())
        .filter(|t| !t.is_empty())
        .collect();
    let canteens: BTreeSet<&str> = dishes
        .iter()
        .flat_map(|d| d.canteen.iter().map(String::as_str))
        .collect();

    Facets {
        tags: tags.into_iter().map(String::from).collect(),
        canteens: canteens.into_iter().map(String::from).collect(),
    }
}
