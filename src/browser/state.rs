use std::sync::Arc;

use super::{
    FieldFilter, FilterState, PaginationPolicy, PaginationState, SortCommand, SortState, filter, parse_sort_command,
    resolve_column, sort_indices,
};
use crate::{
    errors::Result,
    model::{Column, Resource},
    utils::TagExpr,
};

/// Geometry of a rendered table, used to map terminal rows back to resources
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableLayout {
    /// First terminal row of the table (including its header)
    pub top: u16,
    /// Rows taken by the header
    pub header_rows: u16,
    /// Index of the first visible resource
    pub offset: usize,
    /// Total height of the table (including its header)
    pub height: u16,
}

impl TableLayout {
    /// Number of resource rows that fit on the table
    pub fn body_rows(&self) -> usize {
        self.height.saturating_sub(self.header_rows) as usize
    }
}

/// State of a single browsing surface.
///
/// Holds the accumulated resources in fetch order and derives the visible rows by running the filters and then the
/// sort. The cursor follows the selected resource across recomputations whenever it remains visible.
pub struct BrowserState {
    raw: Vec<Arc<Resource>>,
    columns: Vec<Column>,
    declared_fields: Option<Vec<String>>,
    filter: FilterState,
    sort: SortState,
    pagination: PaginationState,
    policy: PaginationPolicy,
    /// Indices into `raw` of the visible resources, in display order
    visible: Vec<usize>,
    cursor: usize,
    offset: usize,
    /// Identifier of the marked resource
    mark: Option<String>,
}

impl BrowserState {
    /// Builds an empty state for the given columns
    pub fn new(columns: Vec<Column>, declared_fields: Option<Vec<String>>, policy: PaginationPolicy) -> Self {
        Self {
            raw: Vec::new(),
            columns,
            declared_fields,
            filter: FilterState::default(),
            sort: SortState::default(),
            pagination: PaginationState::default(),
            policy,
            visible: Vec::new(),
            cursor: 0,
            offset: 0,
            mark: None,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn sort(&self) -> SortState {
        self.sort
    }

    pub fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    /// Total number of resources fetched so far
    pub fn total(&self) -> usize {
        self.raw.len()
    }

    /// Number of resources passing the filters
    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    /// Index of the cursor on the visible rows
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Index of the first visible row on the viewport
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Iterates over the visible resources, in display order
    pub fn visible(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.visible.iter().map(|&ix| &self.raw[ix])
    }

    /// Returns the visible resource at the given row
    pub fn resource_at(&self, row: usize) -> Option<&Arc<Resource>> {
        self.visible.get(row).map(|&ix| &self.raw[ix])
    }

    /// The resource under the cursor
    pub fn selected(&self) -> Option<&Arc<Resource>> {
        self.resource_at(self.cursor)
    }

    /// The marked resource, which is always visible
    pub fn marked(&self) -> Option<&Arc<Resource>> {
        let mark = self.mark.as_deref()?;
        self.visible().find(|r| r.id() == mark)
    }

    /// Replaces every resource with a fresh fetch, updating the pagination from its continuation token
    pub fn replace_all(&mut self, items: Vec<Resource>, next_token: Option<String>) {
        self.raw = items.into_iter().map(Arc::new).collect();
        self.pagination = PaginationState::from_token(next_token);
        self.recompute();
    }

    /// Appends a page of resources (never replacing the current ones) and re-applies filters and sort
    pub fn append_page(&mut self, items: Vec<Resource>, next_token: Option<String>) {
        self.raw.extend(items.into_iter().map(Arc::new));
        self.pagination.complete(next_token);
        self.recompute();
    }

    /// Records a failed page fetch, which stops pagination while keeping the current resources
    pub fn fail_page(&mut self) {
        self.pagination.fail();
    }

    /// Discards the page in flight, if any, so a later request isn't refused
    pub fn abort_page_load(&mut self) {
        self.pagination.abort();
    }

    /// Whether the cursor position should automatically trigger loading the next page
    pub fn wants_next_page(&self) -> bool {
        self.pagination
            .should_load(&self.policy, self.cursor, self.visible.len(), self.filter.has_text())
    }

    /// Starts loading the next page, returning the continuation token to request it with.
    ///
    /// Automatic requests honor the trigger conditions, while manual ones only require more pages and no page in
    /// flight.
    pub fn begin_next_page(&mut self, manual: bool) -> Option<Option<String>> {
        if !manual && !self.wants_next_page() {
            return None;
        }
        self.pagination.begin()
    }

    /// Re-applies the filters and the sort, keeping the cursor on the same resource when possible and clearing the
    /// mark if it's no longer visible
    pub fn recompute(&mut self) {
        let selected_id = self.selected().map(|r| r.id().to_owned());

        let mut visible = filter::apply(&self.raw, &self.filter, &self.columns, self.declared_fields.as_deref());
        if let Some(col) = self.sort.column.and_then(|c| self.columns.get(c)) {
            let values: Vec<String> = self.raw.iter().map(|r| col.value(r)).collect();
            sort_indices(&mut visible, &values, self.sort.ascending);
        }
        self.visible = visible;

        if let Some(mark) = &self.mark
            && !self.visible.iter().any(|&ix| self.raw[ix].id() == mark)
        {
            tracing::debug!("Clearing mark on {mark}, no longer visible");
            self.mark = None;
        }

        self.cursor = selected_id
            .and_then(|id| self.visible.iter().position(|&ix| self.raw[ix].id() == id))
            .unwrap_or(self.cursor)
            .min(self.visible.len().saturating_sub(1));
    }

    /// Sets the free-text filter
    pub fn set_text_filter(&mut self, text: impl Into<String>) {
        self.filter.text = text.into();
        self.recompute();
    }

    /// Sets or clears the tag filter
    pub fn set_tag_filter(&mut self, tag: Option<TagExpr>) {
        self.filter.tag = tag;
        self.recompute();
    }

    /// Sets or clears the field filter
    pub fn set_field_filter(&mut self, field: Option<FieldFilter>) {
        self.filter.field = field;
        self.recompute();
    }

    /// Sets the sort
    pub fn set_sort(&mut self, sort: SortState) {
        self.sort = sort;
        self.recompute();
    }

    /// Applies the arguments of a `:sort` command
    pub fn apply_sort_command(&mut self, args: &str) -> Result<()> {
        let sort = match parse_sort_command(args)? {
            SortCommand::Clear => SortState::default(),
            SortCommand::By { column, ascending } => SortState {
                column: Some(resolve_column(&self.columns, &column)?),
                ascending,
            },
        };
        self.set_sort(sort);
        Ok(())
    }

    /// Labels of the column headers, with the sort indicator
    pub fn header_labels(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .map(|(ix, c)| self.sort.header_label(ix, &c.name))
            .collect()
    }

    /// Marks the selected resource, or clears the mark if it's the selected one
    pub fn toggle_mark(&mut self) {
        let Some(id) = self.selected().map(|r| r.id().to_owned()) else {
            return;
        };
        if self.mark.as_deref() == Some(id.as_str()) {
            self.mark = None;
        } else {
            self.mark = Some(id);
        }
    }

    /// Whether the given resource is the marked one
    pub fn is_marked(&self, resource: &Resource) -> bool {
        self.mark.as_deref() == Some(resource.id())
    }

    pub fn move_up(&mut self, rows: usize) {
        self.cursor = self.cursor.saturating_sub(rows);
    }

    pub fn move_down(&mut self, rows: usize) {
        self.cursor = (self.cursor + rows).min(self.visible.len().saturating_sub(1));
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.visible.len().saturating_sub(1);
    }

    /// Moves the cursor to the given visible row, if it exists
    pub fn select_row(&mut self, row: usize) -> bool {
        if row < self.visible.len() {
            self.cursor = row;
            true
        } else {
            false
        }
    }

    /// Adjusts the scroll offset so the cursor fits on a viewport of `rows` rows, returning it
    pub fn scroll_to_cursor(&mut self, rows: usize) -> usize {
        if rows == 0 {
            return self.offset;
        }
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + rows {
            self.offset = self.cursor + 1 - rows;
        }
        self.offset = self.offset.min(self.visible.len().saturating_sub(1));
        self.offset
    }
}

/// Maps a terminal row into the index of the visible resource rendered there, if any
pub fn row_at(y: u16, layout: TableLayout, visible_len: usize) -> Option<usize> {
    let body_top = layout.top.saturating_add(layout.header_rows);
    if y < body_top || y >= layout.top.saturating_add(layout.height) {
        return None;
    }
    let row = layout.offset + (y - body_top) as usize;
    (row < visible_len).then_some(row)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::utils::Tags;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("NAME", 20, |r| r.name().to_owned()),
            Column::new("STATE", 10, |r| r.field_str("State")),
            Column::new("SIZE", 10, |r| r.field_str("Size")),
        ]
    }

    fn resource(id: &str, name: &str, state: &str, size: &str, env: Option<&str>) -> Resource {
        let mut res = Resource::new(id)
            .with_name(name)
            .with_raw(json!({ "State": state, "Size": size }));
        if let Some(env) = env {
            res = res.with_tags(Tags::from([(String::from("env"), env.to_owned())]));
        }
        res
    }

    fn fixture() -> Vec<Resource> {
        vec![
            resource("i-1", "web", "running", "900 MiB", Some("prod")),
            resource("i-2", "db", "stopped", "1.5 GiB", Some("dev")),
            resource("i-3", "batch", "running", "10 GB", None),
            resource("i-4", "cache", "running", "-", Some("prod")),
        ]
    }

    fn state() -> BrowserState {
        let mut state = BrowserState::new(columns(), None, PaginationPolicy::default());
        state.replace_all(fixture(), None);
        state
    }

    fn ids(state: &BrowserState) -> Vec<String> {
        state.visible().map(|r| r.id().to_owned()).collect()
    }

    #[test]
    fn test_unfiltered_keeps_fetch_order() {
        let state = state();
        assert_eq!(ids(&state), vec!["i-1", "i-2", "i-3", "i-4"]);
        assert_eq!(state.header_labels(), vec!["NAME", "STATE", "SIZE"]);
    }

    #[test]
    fn test_sort_and_clear() {
        let mut state = state();
        state.apply_sort_command("desc size").unwrap();
        // "-" isn't a number, so it sorts after every size
        assert_eq!(ids(&state), vec!["i-4", "i-3", "i-2", "i-1"]);
        assert_eq!(state.header_labels()[2], "SIZE ▼");
        state.apply_sort_command("si").unwrap();
        assert_eq!(ids(&state), vec!["i-1", "i-2", "i-3", "i-4"]);
        assert_eq!(state.header_labels()[2], "SIZE ▲");

        state.apply_sort_command("desc state").unwrap();
        // Stable: running resources keep their relative order
        assert_eq!(ids(&state), vec!["i-2", "i-1", "i-3", "i-4"]);
        assert_eq!(state.header_labels()[1], "STATE ▼");

        state.apply_sort_command("").unwrap();
        assert_eq!(ids(&state), vec!["i-1", "i-2", "i-3", "i-4"]);
        assert!(state.apply_sort_command("cpu").is_err());
    }

    #[test]
    fn test_cursor_follows_selection() {
        let mut state = state();
        state.move_down(2);
        assert_eq!(state.selected().map(|r| r.id()), Some("i-3"));
        state.set_sort(SortState {
            column: Some(0),
            ascending: true,
        });
        // batch, cache, db, web
        assert_eq!(state.cursor(), 0);
        assert_eq!(state.selected().map(|r| r.id()), Some("i-3"));
    }

    #[test]
    fn test_cursor_clamped_when_filtered() {
        let mut state = state();
        state.move_end();
        state.set_text_filter("web");
        assert_eq!(state.visible_len(), 1);
        assert_eq!(state.cursor(), 0);
        state.set_text_filter("nothing matches this");
        assert_eq!(state.selected().map(|r| r.id().to_owned()), None);
    }

    #[test]
    fn test_mark_cleared_when_filtered_out() {
        let mut state = state();
        state.move_down(1);
        state.toggle_mark();
        assert_eq!(state.marked().map(|r| r.id()), Some("i-2"));

        state.set_tag_filter(TagExpr::parse("env=prod"));
        assert!(state.marked().is_none());
        // The mark doesn't come back when the filter is cleared
        state.set_tag_filter(None);
        assert!(state.marked().is_none());
    }

    #[test]
    fn test_toggle_mark() {
        let mut state = state();
        state.toggle_mark();
        assert!(state.marked().is_some());
        state.toggle_mark();
        assert!(state.marked().is_none());
    }

    #[test]
    fn test_field_filter() {
        let mut state = state();
        state.set_field_filter(Some(FieldFilter::new("State", "running")));
        assert_eq!(ids(&state), vec!["i-1", "i-3", "i-4"]);
        state.set_field_filter(None);
        assert_eq!(state.visible_len(), 4);
    }

    #[test]
    fn test_pagination_appends() {
        let mut state = BrowserState::new(columns(), None, PaginationPolicy::default());
        state.replace_all(fixture(), Some(String::from("p2")));
        state.set_sort(SortState::by(0));
        assert!(state.wants_next_page());

        let token = state.begin_next_page(false);
        assert_eq!(token, Some(Some(String::from("p2"))));
        // Consecutive events while the page is in flight don't trigger again
        assert_eq!(state.begin_next_page(false), None);
        assert_eq!(state.begin_next_page(true), None);

        state.append_page(vec![resource("i-5", "api", "running", "1 GB", None)], None);
        assert_eq!(state.total(), 5);
        assert_eq!(ids(&state), vec!["i-5", "i-3", "i-4", "i-2", "i-1"]);
        assert!(!state.pagination().has_more);
    }

    #[test]
    fn test_manual_page_bypasses_text_suppression() {
        let mut state = BrowserState::new(columns(), None, PaginationPolicy::default());
        state.replace_all(fixture(), Some(String::from("p2")));
        state.set_text_filter("web");
        assert!(!state.wants_next_page());
        assert_eq!(state.begin_next_page(false), None);
        assert_eq!(state.begin_next_page(true), Some(Some(String::from("p2"))));
    }

    #[test]
    fn test_failed_page_keeps_resources() {
        let mut state = BrowserState::new(columns(), None, PaginationPolicy::default());
        state.replace_all(fixture(), Some(String::from("p2")));
        state.begin_next_page(true);
        state.fail_page();
        assert_eq!(state.total(), 4);
        assert!(!state.pagination().has_more);
        assert!(!state.pagination().is_loading_more);
    }

    #[test]
    fn test_scroll_to_cursor() {
        let mut state = state();
        state.move_end();
        assert_eq!(state.scroll_to_cursor(2), 2);
        state.move_home();
        assert_eq!(state.scroll_to_cursor(2), 0);
    }

    #[test]
    fn test_row_at() {
        let layout = TableLayout {
            top: 2,
            header_rows: 1,
            offset: 5,
            height: 10,
        };
        assert_eq!(row_at(2, layout, 20), None);
        assert_eq!(row_at(3, layout, 20), Some(5));
        assert_eq!(row_at(11, layout, 20), Some(13));
        assert_eq!(row_at(12, layout, 20), None);
        assert_eq!(row_at(4, layout, 6), None);
        assert_eq!(layout.body_rows(), 9);
    }
}
