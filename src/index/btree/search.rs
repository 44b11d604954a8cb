//! Binary search over the sorted key list of a node.

/// Exact-match binary search. Returns the index of `key`, if present.
///
/// ```
/// use pagetree::index::btree::search_for_index;
///
/// assert_eq!(search_for_index(&5, &[1, 3, 5, 7, 9]), Some(2));
/// assert_eq!(search_for_index(&4, &[1, 3, 5, 7, 9]), None);
/// ```
pub fn search_for_index<T: Ord>(key: &T, sorted_keys: &[T]) -> Option<usize> {
    sorted_keys.binary_search(key).ok()
}

/// Index of the first key strictly greater than `key`.
///
/// This is the child to descend into from an internal node: a key equal to
/// a separator routes to the right of it. Returns `sorted_keys.len()` when
/// no key is larger.
pub fn find_first_larger_index<T: Ord>(key: &T, sorted_keys: &[T]) -> usize {
    sorted_keys.partition_point(|k| k <= key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Field;

    const KEYS: [i32; 5] = [1, 3, 5, 7, 9];

    #[test]
    fn test_search_for_index() {
        assert_eq!(search_for_index(&5, &KEYS), Some(2));
        assert_eq!(search_for_index(&1, &KEYS), Some(0));
        assert_eq!(search_for_index(&9, &KEYS), Some(4));
        assert_eq!(search_for_index(&0, &KEYS), None);
        assert_eq!(search_for_index(&6, &KEYS), None);
        assert_eq!(search_for_index(&1, &[] as &[i32]), None);
    }

    #[test]
    fn test_find_first_larger_index() {
        assert_eq!(find_first_larger_index(&4, &KEYS), 2);
        assert_eq!(find_first_larger_index(&10, &KEYS), 5);
        assert_eq!(find_first_larger_index(&0, &KEYS), 0);
        assert_eq!(find_first_larger_index(&0, &[] as &[i32]), 0);
    }

    #[test]
    fn test_equal_key_routes_right() {
        assert_eq!(find_first_larger_index(&5, &KEYS), 3);
        assert_eq!(find_first_larger_index(&9, &KEYS), 5);
    }

    #[test]
    fn test_string_fields() {
        let keys: Vec<Field> = ["apple", "kiwi", "pear"]
            .iter()
            .map(|s| Field::string(*s).unwrap())
            .collect();

        let kiwi = Field::string("kiwi").unwrap();
        let lime = Field::string("lime").unwrap();
        assert_eq!(search_for_index(&kiwi, &keys), Some(1));
        assert_eq!(find_first_larger_index(&lime, &keys), 2);
    }
}
