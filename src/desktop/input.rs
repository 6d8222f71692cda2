//! Cross-platform mouse and keyboard input using enigo

use enigo::{Axis, Button, Coordinate, Enigo, Keyboard, Mouse, Settings};
use std::thread;
use std::time::Duration;

use super::keys::{KeyCode, ReservedKey, TypeAction};
use super::platform::Platform;
use super::types::{Point, Size};
use crate::error::{Error, Result};

/// Pause between moving onto a target and pressing the button
const CLICK_DELAY: Duration = Duration::from_millis(50);
/// Pause around the final key of a chord
const CHORD_DELAY: Duration = Duration::from_millis(20);
/// Step length of an animated mouse move
const MOVE_STEP: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    fn to_enigo(self) -> Button {
        match self {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
            MouseButton::Middle => Button::Middle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Press,
    Release,
    /// Press and release as one primitive
    Click,
}

impl Direction {
    fn to_enigo(self) -> enigo::Direction {
        match self {
            Direction::Press => enigo::Direction::Press,
            Direction::Release => enigo::Direction::Release,
            Direction::Click => enigo::Direction::Click,
        }
    }
}

/// OS input primitives
pub trait InputBackend: Send {
    fn location(&self) -> anyhow::Result<Point>;

    fn move_mouse(&mut self, x: i32, y: i32) -> anyhow::Result<()>;

    fn button(&mut self, button: MouseButton, direction: Direction) -> anyhow::Result<()>;

    fn key(&mut self, key: KeyCode, direction: Direction) -> anyhow::Result<()>;

    fn text(&mut self, text: &str) -> anyhow::Result<()>;

    /// Positive scrolls up, negative scrolls down
    fn scroll(&mut self, amount: i32) -> anyhow::Result<()>;
}

pub struct EnigoBackend {
    enigo: Enigo,
}

impl EnigoBackend {
    pub fn new() -> anyhow::Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| anyhow::anyhow!("Failed to create input controller: {:?}", e))?;
        Ok(Self { enigo })
    }
}

impl InputBackend for EnigoBackend {
    fn location(&self) -> anyhow::Result<Point> {
        let (x, y) = self
            .enigo
            .location()
            .map_err(|e| anyhow::anyhow!("Failed to read mouse location: {:?}", e))?;
        Ok(Point::new(x, y))
    }

    fn move_mouse(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| anyhow::anyhow!("Failed to move mouse: {:?}", e))
    }

    fn button(&mut self, button: MouseButton, direction: Direction) -> anyhow::Result<()> {
        self.enigo
            .button(button.to_enigo(), direction.to_enigo())
            .map_err(|e| anyhow::anyhow!("Failed to use mouse button: {:?}", e))
    }

    fn key(&mut self, key: KeyCode, direction: Direction) -> anyhow::Result<()> {
        self.enigo
            .key(key.to_enigo(), direction.to_enigo())
            .map_err(|e| anyhow::anyhow!("Failed to use key: {:?}", e))
    }

    fn text(&mut self, text: &str) -> anyhow::Result<()> {
        self.enigo
            .text(text)
            .map_err(|e| anyhow::anyhow!("Failed to type text: {:?}", e))
    }

    fn scroll(&mut self, amount: i32) -> anyhow::Result<()> {
        // enigo counts positive as down
        self.enigo
            .scroll(-amount, Axis::Vertical)
            .map_err(|e| anyhow::anyhow!("Failed to scroll: {:?}", e))
    }
}

/// Mouse and keyboard synthesis on top of an [`InputBackend`]
pub struct InputController {
    backend: Box<dyn InputBackend>,
    platform: Platform,
    type_interval: Duration,
}

impl InputController {
    pub fn new(backend: Box<dyn InputBackend>, platform: Platform, type_interval: Duration) -> Self {
        Self {
            backend,
            platform,
            type_interval,
        }
    }

    // ============ Mouse Operations ============

    /// Move to absolute logical coordinates, animated over `duration`
    pub fn move_to(&mut self, x: i32, y: i32, duration: Duration) -> Result<()> {
        if duration.is_zero() {
            return self.backend.move_mouse(x, y).map_err(Error::Input);
        }

        let start = self.backend.location().map_err(Error::Input)?;
        let steps = (duration.as_millis() / MOVE_STEP.as_millis()).max(1) as u32;
        let pause = duration / steps;
        for step in 1..=steps {
            let t = f64::from(step) / f64::from(steps);
            let sx = start.x + (f64::from(x - start.x) * t).round() as i32;
            let sy = start.y + (f64::from(y - start.y) * t).round() as i32;
            self.backend.move_mouse(sx, sy).map_err(Error::Input)?;
            thread::sleep(pause);
        }
        Ok(())
    }

    pub fn click(&mut self, x: i32, y: i32, button: MouseButton) -> Result<()> {
        self.move_to(x, y, Duration::ZERO)?;
        thread::sleep(CLICK_DELAY);
        self.backend
            .button(button, Direction::Click)
            .map_err(Error::Input)
    }

    pub fn double_click(&mut self, x: i32, y: i32, button: MouseButton) -> Result<()> {
        self.click(x, y, button)?;
        thread::sleep(CLICK_DELAY);
        self.backend
            .button(button, Direction::Click)
            .map_err(Error::Input)
    }

    /// Click the center of an object of `size` whose top-left corner is `top_left`
    pub fn click_center(&mut self, top_left: Point, size: Size, button: MouseButton) -> Result<Point> {
        let target = size.center_from(top_left);
        self.click(target.x, target.y, button)?;
        Ok(target)
    }

    pub fn scroll(&mut self, amount: i32) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.backend.scroll(amount).map_err(Error::Input)
    }

    // ============ Keyboard Operations ============

    pub fn press_key(&mut self, key: KeyCode) -> Result<()> {
        self.backend.key(key, Direction::Press).map_err(Error::Input)
    }

    pub fn release_key(&mut self, key: KeyCode) -> Result<()> {
        self.backend.key(key, Direction::Release).map_err(Error::Input)
    }

    pub fn type_action(&mut self, action: &TypeAction) -> Result<()> {
        match action {
            TypeAction::ReservedKey(key) => self.type_reserved(*key),
            TypeAction::Literal(text) => self.type_literal(text),
            TypeAction::Chorded(text, modifiers) => {
                let names = modifiers.chord_names(self.platform)?;
                let modifier_keys = names
                    .iter()
                    .map(|name| KeyCode::parse(name))
                    .collect::<Result<Vec<_>>>()?;
                let key = KeyCode::parse(text)?;
                tracing::debug!("Chord {}+{}", names.join("+"), text);
                self.hotkey(&modifier_keys, key)
            }
        }
    }

    fn type_reserved(&mut self, key: ReservedKey) -> Result<()> {
        tracing::debug!("Reserved key: {}", key.name());
        // Some platforms drop a plain down/up Enter
        if key == ReservedKey::Enter {
            return self
                .backend
                .key(key.into(), Direction::Click)
                .map_err(Error::Input);
        }
        self.press_key(key.into())?;
        self.release_key(key.into())
    }

    fn type_literal(&mut self, text: &str) -> Result<()> {
        tracing::debug!("Text: {}", text);
        let mut buf = [0u8; 4];
        for c in text.chars() {
            self.backend
                .text(c.encode_utf8(&mut buf))
                .map_err(Error::Input)?;
            thread::sleep(self.type_interval);
        }
        Ok(())
    }

    /// Hold `modifiers` in order, press `key`, release in reverse order.
    ///
    /// Whatever was pressed gets released even when a later step fails; the
    /// first error is returned.
    fn hotkey(&mut self, modifiers: &[KeyCode], key: KeyCode) -> Result<()> {
        let mut held = Vec::with_capacity(modifiers.len());
        let mut outcome = Ok(());
        for modifier in modifiers {
            if let Err(e) = self.press_key(*modifier) {
                outcome = Err(e);
                break;
            }
            held.push(*modifier);
        }

        if outcome.is_ok() {
            thread::sleep(CHORD_DELAY);
            outcome = self.backend.key(key, Direction::Click).map_err(Error::Input);
            thread::sleep(CHORD_DELAY);
        }

        for modifier in held.iter().rev() {
            if let Err(e) = self.release_key(*modifier) {
                tracing::warn!("Failed to release {:?}: {}", modifier, e);
                if outcome.is_ok() {
                    outcome = Err(e);
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop::keys::ModifierSet;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Move(i32, i32),
        Button(MouseButton, Direction),
        Key(KeyCode, Direction),
        Text(String),
        Scroll(i32),
    }

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<Event>>>,
        fail_taps: bool,
    }

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl InputBackend for Recorder {
        fn location(&self) -> anyhow::Result<Point> {
            Ok(Point::new(0, 0))
        }

        fn move_mouse(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
            self.push(Event::Move(x, y));
            Ok(())
        }

        fn button(&mut self, button: MouseButton, direction: Direction) -> anyhow::Result<()> {
            self.push(Event::Button(button, direction));
            Ok(())
        }

        fn key(&mut self, key: KeyCode, direction: Direction) -> anyhow::Result<()> {
            if self.fail_taps && direction == Direction::Click {
                anyhow::bail!("key tap rejected");
            }
            self.push(Event::Key(key, direction));
            Ok(())
        }

        fn text(&mut self, text: &str) -> anyhow::Result<()> {
            self.push(Event::Text(text.to_string()));
            Ok(())
        }

        fn scroll(&mut self, amount: i32) -> anyhow::Result<()> {
            self.push(Event::Scroll(amount));
            Ok(())
        }
    }

    fn controller(platform: Platform) -> (InputController, Recorder) {
        let recorder = Recorder::default();
        let controller =
            InputController::new(Box::new(recorder.clone()), platform, Duration::ZERO);
        (controller, recorder)
    }

    #[test]
    fn test_click_center_of_needle() {
        let (mut input, rec) = controller(Platform::Linux);
        let target = input
            .click_center(Point::new(100, 40), Size::new(30, 11), MouseButton::Left)
            .unwrap();
        assert_eq!(target, Point::new(115, 45));
        assert_eq!(
            rec.events(),
            vec![
                Event::Move(115, 45),
                Event::Button(MouseButton::Left, Direction::Click)
            ]
        );
    }

    #[test]
    fn test_enter_uses_tap_primitive() {
        let (mut input, rec) = controller(Platform::Linux);
        input.type_action(&ReservedKey::Enter.into()).unwrap();
        assert_eq!(
            rec.events(),
            vec![Event::Key(ReservedKey::Enter.into(), Direction::Click)]
        );
    }

    #[test]
    fn test_other_reserved_keys_use_down_up() {
        let (mut input, rec) = controller(Platform::Linux);
        input.type_action(&ReservedKey::Tab.into()).unwrap();
        assert_eq!(
            rec.events(),
            vec![
                Event::Key(ReservedKey::Tab.into(), Direction::Press),
                Event::Key(ReservedKey::Tab.into(), Direction::Release),
            ]
        );
    }

    #[test]
    fn test_literal_is_typed_per_character() {
        let (mut input, rec) = controller(Platform::Linux);
        input.type_action(&TypeAction::literal("hé!")).unwrap();
        assert_eq!(
            rec.events(),
            vec![
                Event::Text("h".into()),
                Event::Text("é".into()),
                Event::Text("!".into())
            ]
        );
    }

    #[test]
    fn test_chord_holds_modifiers_in_order() {
        let (mut input, rec) = controller(Platform::MacOs);
        input
            .type_action(&TypeAction::chord("t", ModifierSet::SHIFT | ModifierSet::CMD))
            .unwrap();
        assert_eq!(
            rec.events(),
            vec![
                Event::Key(KeyCode::Shift, Direction::Press),
                Event::Key(KeyCode::Meta, Direction::Press),
                Event::Key(KeyCode::Char('t'), Direction::Click),
                Event::Key(KeyCode::Meta, Direction::Release),
                Event::Key(KeyCode::Shift, Direction::Release),
            ]
        );
    }

    #[test]
    fn test_unsupported_chord_sends_nothing() {
        let (mut input, rec) = controller(Platform::Windows);
        let set = ModifierSet::SHIFT | ModifierSet::CTRL | ModifierSet::ALT;
        let err = input.type_action(&TypeAction::chord("x", set)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedChord(_)));
        assert!(rec.events().is_empty());
    }

    #[test]
    fn test_failed_chord_key_still_releases_modifiers() {
        let recorder = Recorder {
            fail_taps: true,
            ..Recorder::default()
        };
        let mut input =
            InputController::new(Box::new(recorder.clone()), Platform::Linux, Duration::ZERO);

        let err = input
            .type_action(&TypeAction::chord("c", ModifierSet::SHIFT | ModifierSet::CTRL))
            .unwrap_err();
        assert!(matches!(err, Error::Input(_)));
        assert_eq!(
            recorder.events(),
            vec![
                Event::Key(KeyCode::Shift, Direction::Press),
                Event::Key(KeyCode::Control, Direction::Press),
                Event::Key(KeyCode::Control, Direction::Release),
                Event::Key(KeyCode::Shift, Direction::Release),
            ]
        );
    }

    #[test]
    fn test_animated_move_ends_on_target() {
        let (mut input, rec) = controller(Platform::Linux);
        input
            .move_to(50, -20, Duration::from_millis(40))
            .unwrap();
        let events = rec.events();
        assert_eq!(events.len(), 4);
        assert_eq!(events.last(), Some(&Event::Move(50, -20)));
    }

    #[test]
    fn test_scroll_zero_is_noop() {
        let (mut input, rec) = controller(Platform::Linux);
        input.scroll(0).unwrap();
        input.scroll(-3).unwrap();
        assert_eq!(rec.events(), vec![Event::Scroll(-3)]);
    }
}
