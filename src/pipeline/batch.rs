use super::ClassificationError;

/// Split `items` into consecutive batches of at most `batch_size`,
/// preserving order. The final batch may be smaller; an empty input yields
/// zero batches.
pub fn batches<T>(
    items: &[T],
    batch_size: usize,
) -> Result<std::slice::Chunks<'_, T>, ClassificationError> {
    if batch_size == 0 {
        return Err(ClassificationError::Configuration(
            "batch size must be at least 1".into(),
        ));
    }
    Ok(items.chunks(batch_size))
}

/// Number of batches a run of `item_count` items will produce.
pub fn batch_count(item_count: usize, batch_size: usize) -> usize {
    item_count.div_ceil(batch_size)
}
