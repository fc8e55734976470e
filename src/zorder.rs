use std::cmp::Ordering;

/// Z-order utility components claim so they always sort last.
pub const TOPMOST: i32 = i32::MAX;

/// Ascending z-order. Equal keys compare equal; no secondary key.
pub fn compare(a: i32, b: i32) -> Ordering {
    a.cmp(&b)
}

/// Stable sort by z-order: items with equal z-order keep their relative order.
pub fn sort_by_zorder<T>(items: &mut [T], zorder: impl Fn(&T) -> i32) {
    items.sort_by(|a, b| compare(zorder(a), zorder(b)));
}

/// Position at which an item with `key` goes so that `items` stays sorted and
/// it lands after every existing item with the same key.
pub fn insertion_index<T>(items: &[T], key: i32, zorder: impl Fn(&T) -> i32) -> usize {
    items.partition_point(|item| compare(zorder(item), key) != Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_ascending() {
        let mut items = vec![5, -2, 9, 0, 3];
        sort_by_zorder(&mut items, |z| *z);
        assert_eq!(items, vec![-2, 0, 3, 5, 9]);
    }

    #[test]
    fn equal_keys_keep_insertion_order() {
        let mut items = vec![(1, 'a'), (0, 'b'), (1, 'c'), (0, 'd'), (1, 'e')];
        sort_by_zorder(&mut items, |(z, _)| *z);
        let order: String = items.iter().map(|(_, name)| *name).collect();
        assert_eq!(order, "bdace");
    }

    #[test]
    fn insertion_goes_after_equal_keys() {
        let items = vec![(0, 'a'), (1, 'b'), (1, 'c'), (TOPMOST, 't')];
        assert_eq!(insertion_index(&items, 1, |(z, _)| *z), 3);
        assert_eq!(insertion_index(&items, -5, |(z, _)| *z), 0);
        assert_eq!(insertion_index(&items, TOPMOST, |(z, _)| *z), 4);
    }
}
