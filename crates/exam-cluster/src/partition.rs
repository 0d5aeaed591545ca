/// Sizes of `workers` contiguous blocks covering `total` items.
///
/// Every block gets `total / workers` items and the first `total % workers`
/// blocks take one extra, so the sizes always add up to `total`.
pub fn block_sizes(total: usize, workers: usize) -> Vec<usize> {
    if workers == 0 {
        return Vec::new();
    }
    let base = total / workers;
    let remainder = total % workers;
    (0..workers)
        .map(|rank| if rank < remainder { base + 1 } else { base })
        .collect()
}

/// Splits `items` into `workers` contiguous blocks in their original order.
pub fn split_contiguous<T>(items: Vec<T>, workers: usize) -> Vec<Vec<T>> {
    let sizes = block_sizes(items.len(), workers);
    let mut items = items.into_iter();
    sizes
        .into_iter()
        .map(|size| items.by_ref().take(size).collect())
        .collect()
}

/// Inverse of [`split_contiguous`]: concatenates blocks in rank order.
pub fn concat_blocks<T>(blocks: Vec<Vec<T>>) -> Vec<T> {
    let total: usize = blocks.iter().map(Vec::len).sum();
    let mut merged = Vec::with_capacity(total);
    for block in blocks {
        merged.extend(block);
    }
    merged
}
