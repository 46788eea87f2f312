use tracing::trace;

use crate::common::collections::HashMap;
use crate::model::{Action, Widget};
use crate::sys::event::SeatId;

/// The action of the first widget whose `[x, x + width)` contains `x`.
pub fn dispatch_press(widgets: &[Widget], x: i32) -> Option<Action> {
    let widget = widgets.iter().find(|widget| widget.contains(x))?;
    trace!(?widget, x, "press hit widget");
    widget.action()
}

/// Last known surface-local pointer position per seat.
#[derive(Default)]
pub struct PointerTracker {
    positions: HashMap<SeatId, (f64, f64)>,
}

impl PointerTracker {
    pub fn update(&mut self, seat: SeatId, x: f64, y: f64) { self.positions.insert(seat, (x, y)); }

    pub fn remove(&mut self, seat: SeatId) { self.positions.remove(&seat); }

    /// Horizontal position in whole logical pixels.
    pub fn x(&self, seat: SeatId) -> Option<i32> {
        self.positions.get(&seat).map(|(x, _)| x.floor() as i32)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use slotmap::SlotMap;

    use super::*;
    use crate::model::{WidgetKind, WindowKey};

    fn widgets() -> (Vec<Widget>, WindowKey, WindowKey) {
        let mut keys: SlotMap<WindowKey, ()> = SlotMap::with_key();
        let (a, b) = (keys.insert(()), keys.insert(()));
        let widgets = vec![
            Widget { x: 8, width: 58, kind: WidgetKind::TaskbarButton { window: a } },
            Widget { x: 74, width: 40, kind: WidgetKind::TaskbarButton { window: b } },
            Widget { x: 122, width: 627, kind: WidgetKind::Spacer },
            Widget { x: 749, width: 51, kind: WidgetKind::Clock },
        ];
        (widgets, a, b)
    }

    #[test]
    fn press_activates_the_button_under_the_pointer() {
        let (widgets, a, b) = widgets();
        assert_eq!(dispatch_press(&widgets, 8), Some(Action::ActivateWindow(a)));
        assert_eq!(dispatch_press(&widgets, 65), Some(Action::ActivateWindow(a)));
        assert_eq!(dispatch_press(&widgets, 74), Some(Action::ActivateWindow(b)));
    }

    #[test]
    fn gaps_clock_and_spacer_do_nothing() {
        let (widgets, _, _) = widgets();
        for x in [0, 7, 66, 73, 114, 121, 500, 749, 799, 800, -1] {
            assert_eq!(dispatch_press(&widgets, x), None, "x = {x}");
        }
    }

    #[test]
    fn hit_testing_is_total_and_exclusive() {
        let (widgets, _, _) = widgets();
        for x in -10..810 {
            let hits = widgets.iter().filter(|w| w.contains(x)).count();
            assert!(hits <= 1, "x = {x} hit {hits} widgets");
            let expected = widgets.iter().find(|w| w.contains(x)).and_then(Widget::action);
            assert_eq!(dispatch_press(&widgets, x), expected);
        }
    }

    #[test]
    fn tracks_each_seat_separately() {
        let mut pointers = PointerTracker::default();
        pointers.update(SeatId(1), 10.7, 3.0);
        pointers.update(SeatId(2), 99.0, 3.0);
        assert_eq!(pointers.x(SeatId(1)), Some(10));
        pointers.remove(SeatId(2));
        assert_eq!(pointers.x(SeatId(2)), None);
    }
}
