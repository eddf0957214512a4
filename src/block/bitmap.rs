// One-block occupancy bitmaps. Bit i lives in byte i/8 at bit position i%8.

pub fn bit_get(bitmap: &[u8], index: usize) -> bool {
    bitmap[index / 8] & (1 << (index % 8)) != 0
}

pub fn bit_set(bitmap: &mut [u8], index: usize) {
    bitmap[index / 8] |= 1 << (index % 8);
}

pub fn bit_clear(bitmap: &mut [u8], index: usize) {
    bitmap[index / 8] &= !(1 << (index % 8));
}

/// First unset bit below `limit`, scanning from 0.
pub fn find_first_free(bitmap: &[u8], limit: usize) -> Option<usize> {
    (0..limit).find(|&i| !bit_get(bitmap, i))
}

/// The first `count` unset bits below `limit` in ascending order, or `None`
/// when fewer than `count` are free. Nothing is marked.
pub fn find_free(bitmap: &[u8], limit: usize, count: usize) -> Option<Vec<usize>> {
    let found: Vec<usize> = (0..limit)
        .filter(|&i| !bit_get(bitmap, i))
        .take(count)
        .collect();
    if found.len() == count {
        Some(found)
    } else {
        None
    }
}

pub fn count_free(bitmap: &[u8], limit: usize) -> usize {
    (0..limit).filter(|&i| !bit_get(bitmap, i)).count()
}
