//! Sliding-window selection over an episode's sampled frames.

/// Indices of the `strip_size` frames centred on `position`.
///
/// Offsets run from `-strip_size/2` to `+strip_size/2`. Indices outside
/// `[0, len)` are clamped, so boundary frames repeat at the episode edges.
pub fn window_indices(position: usize, len: usize, strip_size: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let half = (strip_size / 2) as isize;
    let last = (len - 1) as isize;
    (-half..=half)
        .map(|d| (position as isize + d).clamp(0, last) as usize)
        .collect()
}

/// 1-based position of the annotated (middle) frame in a strip.
pub fn middle_label(strip_size: usize) -> usize {
    strip_size / 2 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_interior() {
        assert_eq!(window_indices(2, 5, 3), vec![1, 2, 3]);
        assert_eq!(window_indices(2, 5, 5), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_window_clamps_edges() {
        assert_eq!(window_indices(0, 5, 3), vec![0, 0, 1]);
        assert_eq!(window_indices(4, 5, 3), vec![3, 4, 4]);
        assert_eq!(window_indices(0, 1, 5), vec![0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_window_single_frame_strip() {
        assert_eq!(window_indices(3, 5, 1), vec![3]);
    }

    #[test]
    fn test_window_empty_episode() {
        assert!(window_indices(0, 0, 3).is_empty());
    }

    #[test]
    fn test_middle_label() {
        assert_eq!(middle_label(1), 1);
        assert_eq!(middle_label(3), 2);
        assert_eq!(middle_label(5), 3);
    }
}
