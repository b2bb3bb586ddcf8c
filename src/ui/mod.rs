pub mod info_window;

pub use info_window::InfoWindowSlot;
