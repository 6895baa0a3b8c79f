//! Client-side state of the sortable grades table: chamber tab, sort, and the
//! shorthand search box. The visible rows are recomputed from this state on
//! every draw.

use crate::query::{Shorthand, SortKey, SortState};
use crate::types::{Chamber, RaceGrade};

#[derive(Debug, Clone, PartialEq)]
pub struct GradesTableState {
    pub tab: Chamber,
    pub sort: SortState,
    pub search: String,
    pub search_open: bool,
}

impl Default for GradesTableState {
    fn default() -> Self {
        Self {
            tab: Chamber::Senate,
            sort: SortState::default(),
            search: String::new(),
            search_open: false,
        }
    }
}

impl GradesTableState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shorthand(&self) -> Shorthand {
        Shorthand::parse(&self.search)
    }

    /// The tab the search is currently showing; a chamber code in the search wins.
    pub fn active_chamber(&self) -> Chamber {
        self.shorthand().active_chamber(self.tab)
    }

    /// Filtered and sorted rows for display.
    pub fn visible<'a>(&self, races: &'a [RaceGrade]) -> Vec<&'a RaceGrade> {
        let mut rows = self.shorthand().to_query(self.tab).filter(races);
        self.sort.apply(&mut rows);
        rows
    }

    /// Switching tabs resets search and sort.
    pub fn switch_tab(&mut self, chamber: Chamber) {
        self.tab = chamber;
        self.search.clear();
        self.search_open = false;
        self.sort = SortState::default();
    }

    pub fn next_tab(&mut self) {
        let idx = Chamber::ALL.iter().position(|c| *c == self.tab).unwrap_or(0);
        self.switch_tab(Chamber::ALL[(idx + 1) % Chamber::ALL.len()]);
    }

    pub fn select_sort(&mut self, key: SortKey) {
        self.sort.select(key);
    }

    /// Arrow for the active sort column, `None` for the others.
    pub fn sort_indicator(&self, key: SortKey) -> Option<&'static str> {
        (self.sort.key == key).then(|| self.sort.dir.arrow())
    }

    pub fn open_search(&mut self) {
        self.search_open = true;
    }

    /// Ctrl+K: open the search box, or close it keeping its text.
    pub fn toggle_search(&mut self) {
        self.search_open = !self.search_open;
    }

    /// Escape: close the search box and clear its text.
    pub fn clear_search(&mut self) {
        self.search.clear();
        self.search_open = false;
    }

    pub fn push_search(&mut self, c: char) {
        self.search.push(c);
    }

    pub fn pop_search(&mut self) {
        self.search.pop();
    }
}
