use std::borrow::Cow;

use slotmap::SecondaryMap;

use super::items::PanelItem;
use crate::model::{Registry, Widget, WidgetKind, WindowHandle, WindowKey};
use crate::ui::markup::display_text;
use crate::ui::text::TextMeasure;

/// Gap before, between and after taskbar buttons, and around label text.
pub const BUTTON_PADDING: i32 = 8;
pub const BUTTON_MAX_WIDTH: i32 = 200;

/// The text drawn on each window's button, resolved once per pass so that
/// measuring and painting agree and markup is parsed a single time.
pub struct ButtonLabels<'a> {
    labels: SecondaryMap<WindowKey, Cow<'a, str>>,
}

impl<'a> ButtonLabels<'a> {
    pub fn resolve<H: WindowHandle>(windows: &'a Registry<H>, markup: bool) -> Self {
        let labels = windows.iter().map(|(key, window)| (key, display_text(window.label(), markup))).collect();
        ButtonLabels { labels }
    }

    pub fn get(&self, window: WindowKey) -> &str { self.labels.get(window).map_or("?", |label| &**label) }
}

/// One layout pass over the item sequence. Everything here is in logical
/// pixels; scaling happens only when painting.
pub struct PanelLayout<'a, H: WindowHandle> {
    pub items: &'a [PanelItem],
    pub width: i32,
    pub windows: &'a Registry<H>,
    pub clock_label: &'a str,
    pub labels: ButtonLabels<'a>,
}

impl<'a, H: WindowHandle> PanelLayout<'a, H> {
    pub fn new(
        items: &'a [PanelItem],
        width: i32,
        windows: &'a Registry<H>,
        clock_label: &'a str,
        markup: bool,
    ) -> Self {
        let labels = ButtonLabels::resolve(windows, markup);
        PanelLayout { items, width, windows, clock_label, labels }
    }

    pub fn button_width(&self, text: &dyn TextMeasure, window: WindowKey) -> i32 {
        (text.measure(self.labels.get(window)).width + 2 * BUTTON_PADDING).min(BUTTON_MAX_WIDTH)
    }

    pub fn clock_width(&self, text: &dyn TextMeasure) -> i32 {
        text.measure(self.clock_label).width + 2 * BUTTON_PADDING
    }

    pub fn natural_width(&self, item: PanelItem, text: &dyn TextMeasure) -> i32 {
        match item {
            PanelItem::Taskbar => {
                if self.windows.is_empty() {
                    return 0;
                }
                self.windows
                    .iter()
                    .map(|(key, _)| self.button_width(text, key) + BUTTON_PADDING)
                    .sum::<i32>()
                    + BUTTON_PADDING
            }
            PanelItem::Clock => self.clock_width(text),
            PanelItem::Spacer => 0,
        }
    }

    /// Leftover width after every non-spacer item, never negative.
    pub fn spacer_width(&self, text: &dyn TextMeasure) -> i32 {
        let fixed: i32 = self
            .items
            .iter()
            .filter(|item| **item != PanelItem::Spacer)
            .map(|item| self.natural_width(*item, text))
            .sum();
        (self.width - fixed).max(0)
    }

    /// Positions every widget left to right.
    pub fn compute(&self, text: &dyn TextMeasure) -> Vec<Widget> {
        let spacer = self.spacer_width(text);
        let mut widgets = Vec::new();
        let mut x = 0;

        for item in self.items {
            match item {
                PanelItem::Taskbar => {
                    if self.windows.is_empty() {
                        continue;
                    }
                    x += BUTTON_PADDING;
                    for (key, _) in self.windows.iter() {
                        let width = self.button_width(text, key);
                        widgets.push(Widget {
                            x,
                            width,
                            kind: WidgetKind::TaskbarButton { window: key },
                        });
                        x += width + BUTTON_PADDING;
                    }
                }
                PanelItem::Clock => {
                    let width = self.clock_width(text);
                    widgets.push(Widget { x, width, kind: WidgetKind::Clock });
                    x += width;
                }
                PanelItem::Spacer => {
                    widgets.push(Widget { x, width: spacer, kind: WidgetKind::Spacer });
                    x += spacer;
                }
            }
        }
        widgets
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::items::parse_panel_items;
    use crate::testing::{FakeHandle, FixedWidthText, ReleaseLog};

    fn registry(titles: &[&str], log: &ReleaseLog) -> Registry<FakeHandle> {
        let mut registry = Registry::new();
        for (id, title) in titles.iter().enumerate() {
            let id = id as u32;
            registry.upsert_on_report(FakeHandle::new(id, log));
            registry.update_title(&id, title.to_string());
        }
        registry
    }

    fn layout<'a>(
        items: &'a [PanelItem],
        width: i32,
        windows: &'a Registry<FakeHandle>,
    ) -> PanelLayout<'a, FakeHandle> {
        PanelLayout::new(items, width, windows, "09:05", false)
    }

    #[test]
    fn taskbar_clock_and_spacer_fill_the_panel() {
        let log = ReleaseLog::default();
        let windows = registry(&["Editor"], &log);
        let items = parse_panel_items("TSC");
        let widgets = layout(&items, 800, &windows).compute(&FixedWidthText);

        let key = windows.key_of(&0).unwrap();
        assert_eq!(
            widgets,
            vec![
                Widget { x: 8, width: 58, kind: WidgetKind::TaskbarButton { window: key } },
                Widget { x: 74, width: 675, kind: WidgetKind::Spacer },
                Widget { x: 749, width: 51, kind: WidgetKind::Clock },
            ]
        );
        let clock = widgets[2];
        assert_eq!(clock.right(), 800);
        let text_right = clock.x + BUTTON_PADDING + FixedWidthText.measure("09:05").width;
        assert_eq!(text_right, 800 - BUTTON_PADDING);
    }

    #[test]
    fn natural_widths_match_laid_out_widgets() {
        let log = ReleaseLog::default();
        let windows = registry(&["a", "a much longer window title", "?"], &log);
        let items = parse_panel_items("TC");
        let layout = layout(&items, 1000, &windows);
        let widgets = layout.compute(&FixedWidthText);

        let buttons = &widgets[..3];
        let taskbar_extent = buttons[2].right() + BUTTON_PADDING;
        assert_eq!(taskbar_extent, layout.natural_width(PanelItem::Taskbar, &FixedWidthText));
        assert_eq!(widgets[3].width, layout.natural_width(PanelItem::Clock, &FixedWidthText));
        assert_eq!(widgets[3].x, taskbar_extent);
    }

    #[test]
    fn buttons_are_capped() {
        let log = ReleaseLog::default();
        let title = "x".repeat(100);
        let windows = registry(&[title.as_str()], &log);
        let items = parse_panel_items("T");
        let widgets = layout(&items, 800, &windows).compute(&FixedWidthText);
        assert_eq!(widgets[0].width, BUTTON_MAX_WIDTH);
    }

    #[test]
    fn empty_taskbar_takes_no_space() {
        let log = ReleaseLog::default();
        let windows = registry(&[], &log);
        let items = parse_panel_items("TSC");
        let layout = layout(&items, 300, &windows);
        assert_eq!(layout.natural_width(PanelItem::Taskbar, &FixedWidthText), 0);
        assert_eq!(
            layout.compute(&FixedWidthText),
            vec![
                Widget { x: 0, width: 249, kind: WidgetKind::Spacer },
                Widget { x: 249, width: 51, kind: WidgetKind::Clock },
            ]
        );
    }

    #[test]
    fn spacer_never_goes_negative() {
        let log = ReleaseLog::default();
        let windows = registry(&["Editor", "Terminal", "Browser"], &log);
        let items = parse_panel_items("TSC");
        let layout = layout(&items, 100, &windows);
        assert_eq!(layout.spacer_width(&FixedWidthText), 0);
    }

    #[test]
    fn each_spacer_gets_the_full_leftover() {
        let log = ReleaseLog::default();
        let windows = registry(&[], &log);
        let items = parse_panel_items("SCS");
        let widgets = layout(&items, 151, &windows).compute(&FixedWidthText);
        assert_eq!(widgets[0].width, 100);
        assert_eq!(widgets[2], Widget { x: 151, width: 100, kind: WidgetKind::Spacer });
    }

    #[test]
    fn repeated_passes_are_identical() {
        let log = ReleaseLog::default();
        let windows = registry(&["Editor", "Terminal"], &log);
        let items = parse_panel_items("TSC");
        let layout = layout(&items, 640, &windows);
        assert_eq!(layout.compute(&FixedWidthText), layout.compute(&FixedWidthText));
    }

    #[test]
    fn markup_labels_are_measured_without_tags() {
        let log = ReleaseLog::default();
        let windows = registry(&["<b>Edit</b>"], &log);
        let items = parse_panel_items("T");
        let layout = PanelLayout::new(&items, 800, &windows, "", true);
        assert_eq!(layout.compute(&FixedWidthText)[0].width, 4 * 7 + 2 * BUTTON_PADDING);
    }

    #[test_log::test]
    fn labels_resolve_once_with_fallbacks() {
        let log = ReleaseLog::default();
        let mut windows = registry(&["<b>Edit</b>", "a & b"], &log);
        windows.upsert_on_report(FakeHandle::new(7, &log));
        let keys: Vec<_> = windows.iter().map(|(key, _)| key).collect();

        let labels = ButtonLabels::resolve(&windows, true);
        assert_eq!(labels.get(keys[0]), "Edit");
        assert_eq!(labels.get(keys[1]), "a & b");
        assert_eq!(labels.get(keys[2]), "?");

        let plain = ButtonLabels::resolve(&windows, false);
        assert_eq!(plain.get(keys[0]), "<b>Edit</b>");

        // A malformed label is measured as the raw text it will be drawn as.
        let items = parse_panel_items("T");
        let layout = PanelLayout::new(&items, 800, &windows, "", true);
        assert_eq!(layout.compute(&FixedWidthText)[1].width, 5 * 7 + 2 * BUTTON_PADDING);
    }
}
