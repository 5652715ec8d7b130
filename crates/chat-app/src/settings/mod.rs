pub mod state;
pub mod theme;

pub use state::ClientSettings;
pub use theme::ThemeMode;
