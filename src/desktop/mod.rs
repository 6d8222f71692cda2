//! Desktop automation module
//!
//! Finds UI elements on the live screen by image similarity, waits for them
//! to appear or vanish, and drives mouse/keyboard input at their positions.
//!
//! ## Architecture
//!
//! - `DesktopManager` - High-level interface used by test scripts
//! - `Synchronizer` - Bounded polling (`wait`, `wait_vanish`, `exists`)
//! - `Capture` / `ScreenSource` - Screen grabs reconciled to logical size
//! - `InputController` / `InputBackend` - Mouse and keyboard synthesis
//!
//! ## Example
//!
//! ```rust,ignore
//! use tasker_vision::desktop::{DesktopManager, ModifierSet, ReservedKey, TypeAction};
//! use tasker_vision::EngineConfig;
//!
//! let mut manager = DesktopManager::new(EngineConfig::from_env()?)?;
//!
//! // Block until the toolbar shows up, then click it
//! manager.wait("home_button.png")?;
//! manager.click("home_button.png")?;
//!
//! // Type into the focused field
//! manager.type_action(&TypeAction::literal("hello"))?;
//! manager.type_action(&ReservedKey::Enter.into())?;
//! manager.type_action(&TypeAction::chord("t", ModifierSet::CTRL))?;
//!
//! manager.wait_vanish("loading_spinner.png")?;
//! ```

pub mod input;
pub mod keys;
pub mod manager;
pub mod platform;
pub mod screenshot;
pub mod sync;
pub mod types;

// Re-export main types
pub use input::{EnigoBackend, InputBackend, InputController, MouseButton};
pub use keys::{KeyCode, Modifier, ModifierSet, ReservedKey, TypeAction};
pub use manager::DesktopManager;
pub use platform::Platform;
pub use screenshot::{Capture, ScreenSource, XcapScreen};
pub use sync::Synchronizer;
pub use types::{MatchResult, Point, Region, RetryPolicy, ScreenBuffer, Size, TextToken};
