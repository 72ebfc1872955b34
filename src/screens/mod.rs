pub mod dashboard;
pub mod editor;

// Every panel is drawn by dashboard.rs; editor.rs holds the descriptor editor
// used on the Compose screen.

pub use dashboard::{Dashboard, RenderState};
pub use editor::TextEditor;
