//! View models for the users page and match results.
//!
//! Records are projected into two role-partitioned panels of rows. Rows and
//! match cards can be hidden by case-insensitive text filters; the page keeps
//! that visibility across tab switches.

use tracing::debug;

use crate::record::{Record, Role};

/// Name of the donor panel.
pub const DONORS_TAB: &str = "donors";

/// Name of the recipient panel.
pub const RECIPIENTS_TAB: &str = "recipients";

/// Default number of decimals in the location column.
pub const DEFAULT_COORDINATE_PRECISION: usize = 4;

/// Something a text filter can show or hide.
pub trait Filterable {
    /// Full visible text, cells concatenated without separators.
    fn text_content(&self) -> String;

    /// Show or hide the element.
    fn set_visible(&mut self, visible: bool);

    /// Whether the element is shown.
    fn is_visible(&self) -> bool;
}

/// Case-insensitive substring filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextFilter {
    query: String,
}

impl TextFilter {
    /// Create a filter; an empty query matches everything.
    #[must_use]
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_lowercase(),
        }
    }

    /// Whether `text` contains the query, ignoring case.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.query)
    }

    /// Show matching items and hide the rest. Returns how many are shown.
    pub fn apply<'a, T, I>(&self, items: I) -> usize
    where
        T: Filterable + 'a,
        I: IntoIterator<Item = &'a mut T>,
    {
        items.into_iter().fold(0, |shown, item| {
            let visible = self.matches(&item.text_content());
            item.set_visible(visible);
            shown + usize::from(visible)
        })
    }
}

/// One table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Id of the rendered record.
    pub record_id: i64,
    /// Position of the record in the list the page was built from.
    pub record_index: usize,
    /// Initial-letter avatar.
    pub avatar: String,
    /// Display name.
    pub name: String,
    /// Contact details.
    pub contact: String,
    /// Medicine name.
    pub medicine: String,
    /// Quantity, empty when zero.
    pub quantity: String,
    /// Expiry for donors, urgency for recipients.
    pub detail: String,
    /// Formatted coordinates, empty without a location.
    pub location: String,
    /// Status badge text.
    pub status: String,
    /// Whether the row is shown.
    pub visible: bool,
}

impl Row {
    /// Project the record at `index` into a row.
    #[must_use]
    pub fn from_record(index: usize, record: &Record, precision: usize) -> Self {
        Self {
            record_id: record.id,
            record_index: index,
            avatar: record.avatar(),
            name: record.name.clone(),
            contact: record.contact.clone(),
            medicine: record.medicine.clone(),
            quantity: if record.quantity == 0 {
                String::new()
            } else {
                record.quantity.to_string()
            },
            detail: record.role_detail(),
            location: record.location_label(precision),
            status: record.status.to_string(),
            visible: true,
        }
    }

    /// Cell texts in column order; the avatar and name share the first cell.
    #[must_use]
    pub fn cells(&self) -> [&str; 8] {
        [
            &self.avatar,
            &self.name,
            &self.contact,
            &self.medicine,
            &self.quantity,
            &self.detail,
            &self.location,
            &self.status,
        ]
    }

    /// CSS class for the status badge.
    #[must_use]
    pub fn status_class(&self) -> String {
        format!("status-{}", self.status.to_lowercase())
    }
}

impl Filterable for Row {
    fn text_content(&self) -> String {
        self.cells().concat()
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}

/// One tab panel holding the rows of a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    /// Tab name.
    pub name: &'static str,
    /// Button label.
    pub label: &'static str,
    /// Heading of the role-specific column.
    pub detail_heading: &'static str,
    /// Role whose records this panel lists.
    pub role: Role,
    /// Whether this tab is the active one.
    pub active: bool,
    /// Rows in record order.
    pub rows: Vec<Row>,
}

impl Panel {
    fn new(role: Role) -> Self {
        match role {
            Role::Donor => Self {
                name: DONORS_TAB,
                label: "Donors",
                detail_heading: "Expiry",
                role,
                active: false,
                rows: Vec::new(),
            },
            Role::Recipient => Self {
                name: RECIPIENTS_TAB,
                label: "Recipients",
                detail_heading: "Urgency",
                role,
                active: false,
                rows: Vec::new(),
            },
        }
    }

    /// Rows currently shown.
    pub fn visible_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|r| r.visible)
    }
}

/// The users page: a donor panel and a recipient panel behind tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsersPage {
    panels: Vec<Panel>,
    precision: usize,
}

impl UsersPage {
    /// Build the page with the donor tab active.
    #[must_use]
    pub fn new(records: &[Record], precision: usize) -> Self {
        let mut page = Self {
            panels: vec![Panel::new(Role::Donor), Panel::new(Role::Recipient)],
            precision,
        };
        page.activate(DONORS_TAB);
        page.refresh(records);
        page
    }

    /// Rebuild every panel's rows from `records`.
    ///
    /// Previous rows are dropped first, so repeated calls with the same
    /// records produce the same page. The active tab is kept.
    pub fn refresh(&mut self, records: &[Record]) {
        for panel in &mut self.panels {
            panel.rows.clear();
        }
        for (index, record) in records.iter().enumerate() {
            if let Some(panel) = self.panels.iter_mut().find(|p| p.role == record.role) {
                panel.rows.push(Row::from_record(index, record, self.precision));
            }
        }
        debug!(
            donors = self.panel(DONORS_TAB).map_or(0, |p| p.rows.len()),
            recipients = self.panel(RECIPIENTS_TAB).map_or(0, |p| p.rows.len()),
            "Rendered users page"
        );
    }

    /// All panels in tab order.
    #[must_use]
    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    /// Panel by tab name.
    #[must_use]
    pub fn panel(&self, name: &str) -> Option<&Panel> {
        self.panels.iter().find(|p| p.name == name)
    }

    /// The active panel.
    #[must_use]
    pub fn active_panel(&self) -> Option<&Panel> {
        self.panels.iter().find(|p| p.active)
    }

    /// Make `name` the only active tab. Unknown names change nothing.
    ///
    /// Returns whether the tab exists.
    pub fn activate(&mut self, name: &str) -> bool {
        if self.panel(name).is_none() {
            return false;
        }
        for panel in &mut self.panels {
            panel.active = panel.name == name;
        }
        true
    }

    /// User-list search: filters rows of the active panel only.
    ///
    /// Returns the number of rows shown in that panel.
    pub fn search_users(&mut self, query: &str) -> usize {
        let filter = TextFilter::new(query);
        self.panels
            .iter_mut()
            .find(|p| p.active)
            .map_or(0, |panel| filter.apply(&mut panel.rows))
    }

    /// Medicine search: filters rows of every panel.
    ///
    /// Returns the number of rows shown across the page.
    pub fn search_medicines(&mut self, query: &str) -> usize {
        let filter = TextFilter::new(query);
        filter.apply(self.panels.iter_mut().flat_map(|p| p.rows.iter_mut()))
    }
}

/// One match result card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCard {
    /// Card heading.
    pub title: String,
    /// Body lines.
    pub lines: Vec<String>,
    /// Whether the card is shown.
    pub visible: bool,
}

impl MatchCard {
    /// A visible card.
    #[must_use]
    pub fn new(title: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            title: title.into(),
            lines,
            visible: true,
        }
    }
}

impl Filterable for MatchCard {
    fn text_content(&self) -> String {
        let mut text = self.title.clone();
        for line in &self.lines {
            text.push_str(line);
        }
        text
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}

/// The match results list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchBoard {
    /// Cards in display order.
    pub cards: Vec<MatchCard>,
}

impl MatchBoard {
    /// A board over `cards`.
    #[must_use]
    pub fn new(cards: Vec<MatchCard>) -> Self {
        Self { cards }
    }

    /// Match search: filters every card. Returns how many are shown.
    pub fn search(&mut self, query: &str) -> usize {
        TextFilter::new(query).apply(&mut self.cards)
    }
}
