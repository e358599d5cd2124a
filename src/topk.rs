//! Bounded top-k selection.
//!
//! A size-k min-heap whose root is the weakest entry kept so far; a new item
//! evicts the root only when it beats it.  Shared by degree centrality and the
//! posterior bound.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// The `k` items with the largest `key`, ordered by descending key.
/// Equal keys prefer the smaller item.
pub fn top_k_by_key<T, K, I, F>(items: I, k: usize, key: F) -> Vec<T>
where
    T: Ord + Copy,
    K: Ord + Copy,
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> K,
{
    if k == 0 {
        return Vec::new();
    }
    // Reverse((key, Reverse(item))): the heap root is the smallest key, and for
    // equal keys the largest item, i.e. the first entry to evict.
    let mut heap: BinaryHeap<Reverse<(K, Reverse<T>)>> = BinaryHeap::with_capacity(k + 1);
    for item in items {
        let entry = (key(&item), Reverse(item));
        if heap.len() < k {
            heap.push(Reverse(entry));
        } else if let Some(Reverse(weakest)) = heap.peek() {
            if entry > *weakest {
                heap.pop();
                heap.push(Reverse(entry));
            }
        }
    }

    let mut kept: Vec<(K, Reverse<T>)> = heap.into_iter().map(|Reverse(e)| e).collect();
    kept.sort_unstable_by(|a, b| b.cmp(a));
    kept.into_iter().map(|(_, Reverse(item))| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_largest_keys_in_order() {
        let scores = [(1u32, 4usize), (2, 9), (3, 1), (4, 7), (5, 9)];
        let top = top_k_by_key(scores.iter().map(|&(v, _)| v), 3, |v| scores[*v as usize - 1].1);
        assert_eq!(top, vec![2, 5, 4]);
    }

    #[test]
    fn ties_prefer_smaller_items() {
        let top = top_k_by_key([9u32, 3, 7, 1], 2, |_| 0u8);
        assert_eq!(top, vec![1, 3]);
    }

    #[test]
    fn short_inputs_and_zero_k() {
        assert_eq!(top_k_by_key([5u32, 2], 4, |v| *v), vec![5, 2]);
        assert!(top_k_by_key([5u32, 2], 0, |v| *v).is_empty());
        assert!(top_k_by_key(Vec::<u32>::new(), 3, |v| *v).is_empty());
    }
}
