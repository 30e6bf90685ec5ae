use ratatui::widgets::ListState;

use crate::lsof::PortRecord;

/// A list row carrying its record, with display strings derived once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortItem {
    record: PortRecord,
    title: String,
    description: String,
}

impl PortItem {
    pub fn new(record: PortRecord) -> Self {
        let title = format!("Port :{} ({})", record.port, record.pid);
        let description = format!("User: {}, Command: {}", record.user, record.command);
        Self {
            record,
            title,
            description,
        }
    }

    pub fn record(&self) -> &PortRecord {
        &self.record
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    fn matches(&self, filter: &str) -> bool {
        self.title.contains(filter) || self.description.contains(filter)
    }
}

/// Filterable, navigable list of port items.
///
/// The highlight clamps at both ends rather than wrapping. Filtering is a
/// case-sensitive substring match over title and description and never
/// touches the underlying items.
#[derive(Debug, Default)]
pub struct PortList {
    items: Vec<PortItem>,
    visible: Vec<usize>,
    filter: String,
    filtering: bool,
    state: ListState,
}

impl PortList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the working set, keeping the filter and the highlighted
    /// position when it is still in range.
    pub fn set_items(&mut self, records: Vec<PortRecord>) {
        self.items = records.into_iter().map(PortItem::new).collect();
        let previous = self.state.selected().unwrap_or(0);
        self.recompute_visible();
        if previous < self.visible.len() {
            self.state.select(Some(previous));
        } else {
            self.select_first();
        }
    }

    pub fn move_up(&mut self) {
        if let Some(index) = self.state.selected() {
            self.state.select(Some(index.saturating_sub(1)));
        }
    }

    pub fn move_down(&mut self) {
        if let Some(index) = self.state.selected() {
            let last = self.visible.len().saturating_sub(1);
            self.state.select(Some((index + 1).min(last)));
        }
    }

    pub fn select_first(&mut self) {
        self.state
            .select(if self.visible.is_empty() { None } else { Some(0) });
    }

    pub fn select_last(&mut self) {
        self.state.select(self.visible.len().checked_sub(1));
    }

    /// Highlights a visible row by position; out-of-range positions are ignored.
    pub fn select(&mut self, index: usize) {
        if index < self.visible.len() {
            self.state.select(Some(index));
        }
    }

    pub fn apply_filter(&mut self, text: &str) {
        self.filter = text.to_string();
        self.recompute_visible();
        self.select_first();
    }

    pub fn reset_filter(&mut self) {
        self.filtering = false;
        self.apply_filter("");
    }

    pub fn start_filtering(&mut self) {
        self.filtering = true;
    }

    pub fn stop_filtering(&mut self) {
        self.filtering = false;
    }

    pub fn push_filter_char(&mut self, ch: char) {
        let mut text = std::mem::take(&mut self.filter);
        text.push(ch);
        self.apply_filter(&text);
    }

    pub fn pop_filter_char(&mut self) {
        let mut text = std::mem::take(&mut self.filter);
        text.pop();
        self.apply_filter(&text);
    }

    pub fn is_filtering(&self) -> bool {
        self.filtering
    }

    pub fn filter_text(&self) -> &str {
        &self.filter
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.state.selected()
    }

    /// `None` only when no item passes the filter.
    pub fn selected_item(&self) -> Option<&PortItem> {
        let index = self.state.selected()?;
        self.visible.get(index).map(|&i| &self.items[i])
    }

    pub fn visible_items(&self) -> impl Iterator<Item = &PortItem> {
        self.visible.iter().map(|&i| &self.items[i])
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn total_len(&self) -> usize {
        self.items.len()
    }

    pub fn state_mut(&mut self) -> &mut ListState {
        &mut self.state
    }

    pub fn offset(&self) -> usize {
        self.state.offset()
    }

    fn recompute_visible(&mut self) {
        let filter = self.filter.as_str();
        self.visible = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| filter.is_empty() || item.matches(filter))
            .map(|(i, _)| i)
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(port: &str, pid: &str, command: &str) -> PortRecord {
        PortRecord {
            port: port.into(),
            pid: pid.into(),
            user: "alice".into(),
            command: command.into(),
        }
    }

    fn three() -> Vec<PortRecord> {
        vec![
            record("3000", "1", "node"),
            record("8080", "2", "nginx"),
            record("5000", "3", "python"),
        ]
    }

    fn commands(list: &PortList) -> Vec<String> {
        list.visible_items()
            .map(|item| item.record().command.clone())
            .collect()
    }

    #[test]
    fn item_display_strings() {
        let item = PortItem::new(record("8080", "1234", "node"));
        assert_eq!(item.title(), "Port :8080 (1234)");
        assert_eq!(item.description(), "User: alice, Command: node");
    }

    #[test]
    fn filter_restricts_and_clearing_restores() {
        let mut list = PortList::new();
        list.set_items(three());

        list.apply_filter("node");
        assert_eq!(commands(&list), vec!["node"]);
        assert_eq!(list.total_len(), 3);

        list.apply_filter("");
        assert_eq!(commands(&list), vec!["node", "nginx", "python"]);
    }

    #[test]
    fn filter_is_case_sensitive() {
        let mut list = PortList::new();
        list.set_items(three());
        list.apply_filter("NODE");
        assert_eq!(list.visible_len(), 0);
        assert!(list.selected_item().is_none());
    }

    #[test]
    fn filter_matches_title_fields() {
        let mut list = PortList::new();
        list.set_items(three());
        list.apply_filter(":8080");
        assert_eq!(commands(&list), vec!["nginx"]);
    }

    #[test]
    fn navigation_clamps_at_bounds() {
        let mut list = PortList::new();
        list.set_items(three());
        assert_eq!(list.selected_index(), Some(0));

        list.move_up();
        assert_eq!(list.selected_index(), Some(0));

        list.move_down();
        list.move_down();
        list.move_down();
        assert_eq!(list.selected_index(), Some(2));
        assert_eq!(list.selected_item().unwrap().record().command, "python");

        list.select_first();
        assert_eq!(list.selected_index(), Some(0));
        list.select_last();
        assert_eq!(list.selected_index(), Some(2));
    }

    #[test]
    fn set_items_keeps_filter_and_in_range_selection() {
        let mut list = PortList::new();
        list.set_items(three());
        list.move_down();

        list.set_items(three());
        assert_eq!(list.selected_index(), Some(1));

        list.apply_filter("n");
        list.set_items(three());
        assert_eq!(list.filter_text(), "n");
        assert_eq!(commands(&list), vec!["node", "nginx", "python"]);
    }

    #[test]
    fn set_items_resets_out_of_range_selection() {
        let mut list = PortList::new();
        list.set_items(three());
        list.select_last();

        list.set_items(vec![record("3000", "1", "node")]);
        assert_eq!(list.selected_index(), Some(0));

        list.set_items(Vec::new());
        assert_eq!(list.selected_index(), None);
        assert!(list.selected_item().is_none());
    }

    #[test]
    fn typed_filter_edits() {
        let mut list = PortList::new();
        list.set_items(three());
        list.start_filtering();
        for ch in "pyt".chars() {
            list.push_filter_char(ch);
        }
        assert!(list.is_filtering());
        assert_eq!(commands(&list), vec!["python"]);

        list.pop_filter_char();
        list.pop_filter_char();
        assert_eq!(list.filter_text(), "p");

        list.reset_filter();
        assert!(!list.is_filtering());
        assert_eq!(list.visible_len(), 3);
    }

    #[test]
    fn select_ignores_out_of_range() {
        let mut list = PortList::new();
        list.set_items(three());
        list.select(2);
        list.select(7);
        assert_eq!(list.selected_index(), Some(2));
    }
}
