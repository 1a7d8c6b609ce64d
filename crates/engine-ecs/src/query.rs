//! System queries: finding the entities that own a component in every one
//! of several stores.
//!
//! Each [`crate::store::ComponentStore`] keeps its sequence sorted by owner
//! id, so the set intersection across N stores can be computed with a
//! multi-cursor merge instead of a hash join: advance every cursor to the
//! current maximum id seen, and whenever all cursors land on the same id,
//! that entity is a match. Runs in O(sum of store sizes) rather than
//! O(product), which matters once collectors start joining three or four
//! component types per frame.

use crate::entity::EntityId;

/// Returns, in ascending order, every id present in all of `id_lists`. Each
/// slice must already be sorted ascending (true of any `ComponentStore`'s
/// `owner_ids()`).
pub fn intersect_owner_ids(id_lists: &[&[EntityId]]) -> Vec<EntityId> {
    if id_lists.is_empty() || id_lists.iter().any(|l| l.is_empty()) {
        return Vec::new();
    }

    let mut cursors = vec![0usize; id_lists.len()];
    let mut result = Vec::new();

    loop {
        let mut max_id = None;
        for (list, &cursor) in id_lists.iter().zip(cursors.iter()) {
            if cursor >= list.len() {
                return result;
            }
            let id = list[cursor];
            max_id = Some(match max_id {
                None => id,
                Some(current) => current.max(id),
            });
        }
        let max_id = max_id.expect("checked non-empty above");

        let mut all_match = true;
        for (list, cursor) in id_lists.iter().zip(cursors.iter_mut()) {
            while *cursor < list.len() && list[*cursor] < max_id {
                *cursor += 1;
            }
            if *cursor >= list.len() {
                return result;
            }
            if list[*cursor] != max_id {
                all_match = false;
            }
        }

        if all_match {
            result.push(max_id);
            for cursor in cursors.iter_mut() {
                *cursor += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raws: &[u32]) -> Vec<EntityId> {
        raws.iter().map(|&r| EntityId::new(r)).collect()
    }

    #[test]
    fn intersects_two_sorted_lists() {
        let a = ids(&[1, 2, 3, 5, 8]);
        let b = ids(&[2, 3, 4, 8, 9]);
        assert_eq!(intersect_owner_ids(&[&a, &b]), ids(&[2, 3, 8]));
    }

    #[test]
    fn intersects_three_sorted_lists() {
        let a = ids(&[1, 2, 3, 4]);
        let b = ids(&[2, 3, 4, 5]);
        let c = ids(&[0, 2, 4, 6]);
        assert_eq!(intersect_owner_ids(&[&a, &b, &c]), ids(&[2, 4]));
    }

    #[test]
    fn empty_input_yields_empty_result() {
        let a: Vec<EntityId> = ids(&[1, 2]);
        let empty: Vec<EntityId> = Vec::new();
        assert_eq!(intersect_owner_ids(&[&a, &empty]), Vec::new());
        assert_eq!(intersect_owner_ids(&[]), Vec::new());
    }

    #[test]
    fn disjoint_lists_yield_empty_result() {
        let a = ids(&[1, 3, 5]);
        let b = ids(&[2, 4, 6]);
        assert_eq!(intersect_owner_ids(&[&a, &b]), Vec::new());
    }
}
