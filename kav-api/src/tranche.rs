//! Splitting a sequence into tranches on separator items

/// Split `source` into tranches, starting a new tranche at every item that
/// matches `is_separator`. Separators are dropped.
///
/// Always yields at least one (possibly empty) tranche.
pub fn split_on<T, F>(source: impl IntoIterator<Item = T>, is_separator: F) -> Vec<Vec<T>>
where
    F: Fn(&T) -> bool,
{
    let mut tranches = vec![Vec::new()];
    for item in source {
        if is_separator(&item) {
            tranches.push(Vec::new());
            continue;
        }
        if let Some(current) = tranches.last_mut() {
            current.push(item);
        }
    }
    tranches
}
