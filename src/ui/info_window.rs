use crate::{
    core::handles::{InfoWindowHandle, MapHandle, MarkerHandle},
    traits::MapsLibrary,
};
use std::cell::RefCell;
use std::rc::Rc;

/// The single "currently open" info window of a facade.
///
/// Two states: no window open, or exactly one open. Opening a window closes
/// the current one first. Clones share the same slot, which is how click
/// listeners registered with the library reach it.
#[derive(Debug, Clone, Default)]
pub struct InfoWindowSlot {
    current: Rc<RefCell<Option<InfoWindowHandle>>>,
}

impl InfoWindowSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<InfoWindowHandle> {
        *self.current.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Closes the current window, if any, then opens `window` on `anchor`.
    pub fn open(
        &self,
        library: &dyn MapsLibrary,
        window: InfoWindowHandle,
        map: MapHandle,
        anchor: MarkerHandle,
    ) {
        // The borrow must be released before calling into the library:
        // closing may synchronously fire listeners that touch this slot.
        let previous = self.current.borrow_mut().take();
        if let Some(previous) = previous {
            log::debug!("closing {} before opening {}", previous, window);
            library.close_info_window(previous);
        }

        library.open_info_window(window, map, anchor);
        *self.current.borrow_mut() = Some(window);
    }

    /// Closes the current window programmatically
    pub fn close(&self, library: &dyn MapsLibrary) -> Option<InfoWindowHandle> {
        let previous = self.current.borrow_mut().take();
        if let Some(previous) = previous {
            library.close_info_window(previous);
        }
        previous
    }

    /// The user dismissed `window`; forget it if it is the current one
    pub fn closed_by_user(&self, window: InfoWindowHandle) {
        let mut current = self.current.borrow_mut();
        if *current == Some(window) {
            *current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::headless::{HeadlessLibrary, LibraryCall};

    #[test]
    fn test_open_preempts_current_window() {
        let library = HeadlessLibrary::new();
        let slot = InfoWindowSlot::new();
        let (a, b) = (InfoWindowHandle(1), InfoWindowHandle(2));
        let (map, marker) = (MapHandle(1), MarkerHandle(1));

        slot.open(&library, a, map, marker);
        slot.open(&library, b, map, marker);

        assert_eq!(slot.current(), Some(b));
        assert_eq!(
            library.calls(),
            vec![
                LibraryCall::OpenInfoWindow { window: a, anchor: marker },
                LibraryCall::CloseInfoWindow(a),
                LibraryCall::OpenInfoWindow { window: b, anchor: marker },
            ]
        );
    }

    #[test]
    fn test_user_close_only_clears_matching_window() {
        let library = HeadlessLibrary::new();
        let slot = InfoWindowSlot::new();
        slot.open(&library, InfoWindowHandle(2), MapHandle(1), MarkerHandle(1));

        slot.closed_by_user(InfoWindowHandle(1));
        assert_eq!(slot.current(), Some(InfoWindowHandle(2)));

        slot.closed_by_user(InfoWindowHandle(2));
        assert!(!slot.is_open());
    }

    #[test]
    fn test_close_without_window_is_noop() {
        let library = HeadlessLibrary::new();
        let slot = InfoWindowSlot::new();
        assert_eq!(slot.close(&library), None);
        assert!(library.calls().is_empty());
    }
}
