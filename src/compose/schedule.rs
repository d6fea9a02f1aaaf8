//! Service start order
//!
//! Ordering uses a pairwise comparison: a service goes after any service it
//! links to directly. Only direct links are considered, so chains of links
//! and link cycles do not get a globally consistent order.

use super::service::Service;
use std::cmp::Ordering;

/// Compare two services by their direct links
pub fn dependency_cmp(a: &Service, b: &Service) -> Ordering {
    if a.links_to(&b.name) {
        Ordering::Greater
    } else if b.links_to(&a.name) {
        Ordering::Less
    } else {
        Ordering::Equal
    }
}

/// Order services so that direct link targets come first
///
/// This is a stable insertion sort driven by [`dependency_cmp`]. The
/// comparison is not a total order, which `slice::sort_by` requires, so the
/// sort is done by hand. Services with no link between them keep their
/// relative input order.
pub fn order_by_dependency<'a>(services: impl IntoIterator<Item = &'a Service>) -> Vec<&'a Service> {
    let mut ordered: Vec<&Service> = services.into_iter().collect();

    for i in 1..ordered.len() {
        let mut j = i;
        while j > 0 && dependency_cmp(ordered[j - 1], ordered[j]) == Ordering::Greater {
            ordered.swap(j - 1, j);
            j -= 1;
        }
    }

    ordered
}
