/// Page-navigation state for the browse view: five numbered links, an
/// active highlight, and previous/next affordances. Pure math over
/// (current_page, num_pages), both 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNav {
    pub current_page: usize,
    pub num_pages: usize,
    pub has_previous_page: bool,
    pub has_next_page: bool,
    /// The five page numbers to render.
    pub page_numbers: [usize; 5],
    /// 1-based position of the highlighted link among the five.
    pub active_index: usize,
    /// Link i is rendered only when the query has at least i pages.
    pub show: [bool; 5],
}

impl PageNav {
    pub fn new(current_page: usize, num_pages: usize) -> Self {
        Self {
            current_page,
            num_pages,
            has_previous_page: current_page > 1,
            has_next_page: current_page < num_pages,
            page_numbers: page_numbers(current_page, num_pages),
            active_index: active_index(current_page, num_pages),
            show: std::array::from_fn(|i| num_pages >= i + 1),
        }
    }
}

/// Five-link window: the first five pages while the cursor is near the
/// start or everything fits, the last five near the end, otherwise a
/// window centered on the current page.
fn page_numbers(current_page: usize, num_pages: usize) -> [usize; 5] {
    if num_pages <= 5 || current_page <= 3 {
        [1, 2, 3, 4, 5]
    } else if current_page >= num_pages - 1 {
        [
            num_pages - 4,
            num_pages - 3,
            num_pages - 2,
            num_pages - 1,
            num_pages,
        ]
    } else {
        [
            current_page - 2,
            current_page - 1,
            current_page,
            current_page + 1,
            current_page + 2,
        ]
    }
}

fn active_index(current_page: usize, num_pages: usize) -> usize {
    if current_page == 1 {
        1
    } else if current_page == 2 {
        2
    } else if current_page == 3 {
        3
    } else if current_page + 1 == num_pages {
        4
    } else if current_page == 4 && current_page == num_pages {
        // Four pages total, cursor on the last: it sits at link 4.
        4
    } else if current_page == num_pages {
        5
    } else {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_page_of_ten() {
        let nav = PageNav::new(10, 10);
        assert!(!nav.has_next_page);
        assert!(nav.has_previous_page);
        assert_eq!(nav.page_numbers, [6, 7, 8, 9, 10]);
        assert_eq!(nav.active_index, 5);
    }

    #[test]
    fn first_page_has_no_previous() {
        let nav = PageNav::new(1, 10);
        assert!(!nav.has_previous_page);
        assert!(nav.has_next_page);
        assert_eq!(nav.page_numbers, [1, 2, 3, 4, 5]);
        assert_eq!(nav.active_index, 1);
    }

    #[test]
    fn middle_page_centers_the_window() {
        let nav = PageNav::new(6, 10);
        assert_eq!(nav.page_numbers, [4, 5, 6, 7, 8]);
        assert_eq!(nav.active_index, 3);
    }

    #[test]
    fn penultimate_page_uses_trailing_window() {
        let nav = PageNav::new(9, 10);
        assert_eq!(nav.page_numbers, [6, 7, 8, 9, 10]);
        assert_eq!(nav.active_index, 4);
    }

    #[test]
    fn short_result_sets_hide_spare_links() {
        let nav = PageNav::new(1, 3);
        assert_eq!(nav.page_numbers, [1, 2, 3, 4, 5]);
        assert_eq!(nav.show, [true, true, true, false, false]);
        assert!(nav.has_next_page);
    }

    #[test]
    fn four_of_four_highlights_link_four() {
        let nav = PageNav::new(4, 4);
        assert_eq!(nav.page_numbers, [1, 2, 3, 4, 5]);
        assert_eq!(nav.active_index, 4);
    }

    #[test]
    fn single_page_shows_only_itself() {
        let nav = PageNav::new(1, 1);
        assert!(!nav.has_next_page);
        assert!(!nav.has_previous_page);
        assert_eq!(nav.show, [true, false, false, false, false]);
    }
}
