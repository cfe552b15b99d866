use std::ops::Range;

/// Rows kept mounted around `focused`, shifted back near the end of the feed
/// so the window stays full.
pub fn mount_range(focused: usize, len: usize, window_size: usize) -> Range<usize> {
    if len == 0 || window_size == 0 {
        return 0..0;
    }

    let before = (window_size - 1) / 2;
    let start = focused.min(len - 1).saturating_sub(before);
    let end = start.saturating_add(window_size).min(len);
    end.saturating_sub(window_size)..end
}

/// Rows mounted before the user has scrolled at all.
pub fn initial_range(len: usize, initial_num_to_render: usize) -> Range<usize> {
    0..initial_num_to_render.min(len)
}
