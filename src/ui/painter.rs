use super::canvas::Canvas;
use super::text::TextRenderer;
use crate::common::config::Colors;
use crate::layout_engine::{BUTTON_PADDING, ButtonLabels};
use crate::model::{Registry, Widget, WidgetKind, WindowHandle};

/// Vertical inset of taskbar buttons from the panel edges.
const BUTTON_INSET: i32 = 2;

/// Everything one frame draws, in logical pixels.
pub struct Scene<'a, H: WindowHandle> {
    pub widgets: &'a [Widget],
    pub windows: &'a Registry<H>,
    pub clock_label: &'a str,
    pub width: i32,
    pub height: i32,
    pub colors: &'a Colors,
    pub labels: &'a ButtonLabels<'a>,
}

impl<'a, H: WindowHandle> Scene<'a, H> {
    pub fn paint(&self, canvas: &mut Canvas<'_>, text: &dyn TextRenderer) {
        canvas.clear(self.colors.background);

        for widget in self.widgets {
            match widget.kind {
                WidgetKind::TaskbarButton { window: key } => {
                    let Some(window) = self.windows.get(key) else {
                        continue;
                    };
                    let fill = if window.active {
                        self.colors.button_active
                    } else {
                        self.colors.button_background
                    };
                    canvas.fill_rect(widget.x, BUTTON_INSET, widget.width, self.height - 2 * BUTTON_INSET, fill);
                    let label = self.labels.get(key);
                    self.draw_label(canvas, text, label, widget, widget.width - 2 * BUTTON_PADDING);
                }
                WidgetKind::Clock => {
                    self.draw_label(canvas, text, self.clock_label, widget, widget.width - BUTTON_PADDING);
                }
                WidgetKind::Spacer => {}
            }
        }

        canvas.fill_rect(0, self.height - 1, self.width, 1, self.colors.text);
    }

    /// Draws `label` inset by the padding from the widget's left edge,
    /// centred vertically and clipped to `clip_width`.
    fn draw_label(
        &self,
        canvas: &mut Canvas<'_>,
        text: &dyn TextRenderer,
        label: &str,
        widget: &Widget,
        clip_width: i32,
    ) {
        let x = widget.x + BUTTON_PADDING;
        let y = (self.height - text.measure(label).height) / 2;
        let clip = canvas.clip(x, 0, clip_width.max(0), self.height);
        text.draw(canvas, label, x, y, clip, self.colors.text);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::ToplevelState;
    use crate::testing::{FakeHandle, FixedWidthText, ReleaseLog};

    #[test]
    fn paints_background_buttons_and_separator() {
        let log = ReleaseLog::default();
        let mut windows = Registry::new();
        let editor = windows.upsert_on_report(FakeHandle::new(1, &log));
        let shell = windows.upsert_on_report(FakeHandle::new(2, &log));
        windows.update_active_state(&2, ToplevelState::ACTIVATED);

        let widgets = [
            Widget { x: 8, width: 20, kind: WidgetKind::TaskbarButton { window: editor } },
            Widget { x: 36, width: 20, kind: WidgetKind::TaskbarButton { window: shell } },
        ];
        let colors = Colors::default();
        let labels = ButtonLabels::resolve(&windows, false);
        let scene = Scene {
            widgets: &widgets,
            windows: &windows,
            clock_label: "",
            width: 64,
            height: 10,
            colors: &colors,
            labels: &labels,
        };

        let mut data = vec![0; 64 * 10 * 4];
        let mut canvas = Canvas::new(&mut data, 64, 10, 1).unwrap();
        scene.paint(&mut canvas, &FixedWidthText);

        assert_eq!(canvas.pixel(0, 0), colors.background.premultiplied());
        assert_eq!(canvas.pixel(10, 1), colors.background.premultiplied());
        assert_eq!(canvas.pixel(10, 2), colors.button_background.premultiplied());
        assert_eq!(canvas.pixel(40, 5), colors.button_active.premultiplied());
        assert_eq!(canvas.pixel(40, 8), colors.background.premultiplied());
        assert_eq!(canvas.pixel(30, 5), colors.background.premultiplied());
        assert_eq!(canvas.pixel(63, 9), colors.text.premultiplied());
    }

    #[test]
    fn scale_applies_to_the_whole_frame() {
        let windows: Registry<FakeHandle> = Registry::new();
        let colors = Colors::default();
        let labels = ButtonLabels::resolve(&windows, false);
        let scene = Scene {
            widgets: &[],
            windows: &windows,
            clock_label: "",
            width: 4,
            height: 4,
            colors: &colors,
            labels: &labels,
        };

        let mut data = vec![0; 8 * 8 * 4];
        let mut canvas = Canvas::new(&mut data, 8, 8, 2).unwrap();
        scene.paint(&mut canvas, &FixedWidthText);

        assert_eq!(canvas.pixel(7, 5), colors.background.premultiplied());
        assert_eq!(canvas.pixel(7, 6), colors.text.premultiplied());
        assert_eq!(canvas.pixel(0, 7), colors.text.premultiplied());
    }
}
