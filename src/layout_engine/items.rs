use tracing::warn;

/// One slot of the panel, selected by a single-character code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PanelItem {
    Taskbar,
    Clock,
    Spacer,
}

impl PanelItem {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'T' => Some(PanelItem::Taskbar),
            'C' => Some(PanelItem::Clock),
            'S' => Some(PanelItem::Spacer),
            _ => None,
        }
    }
}

/// Parses an item code string left to right. Unrecognized codes are logged
/// and skipped.
pub fn parse_panel_items(codes: &str) -> Vec<PanelItem> {
    let items: Vec<PanelItem> = codes
        .chars()
        .filter_map(|code| {
            let item = PanelItem::from_code(code);
            if item.is_none() {
                warn!(?code, "unrecognized panel item");
            }
            item
        })
        .collect();

    let spacers = items.iter().filter(|item| **item == PanelItem::Spacer).count();
    if spacers > 1 {
        warn!(spacers, "every spacer receives the full leftover width");
    }
    items
}

pub fn has_clock(items: &[PanelItem]) -> bool { items.contains(&PanelItem::Clock) }
