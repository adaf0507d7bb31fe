//! Client input management with sequencing and reset edge detection

use race_shared::{InputState, Sequence};

/// Manages held controls and turns them into sequenced network inputs
///
/// A sample is taken with [`InputManager::capture`] and only becomes part of
/// the stream once [`InputManager::commit`] is called after a successful
/// send, so a failed send reuses the same sequence number on the next try.
pub struct InputManager {
    next_sequence: Sequence,
    held: InputState,
    reset_pending: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            next_sequence: 0,
            held: InputState::default(),
            reset_pending: false,
        }
    }

    /// Replaces the held controls. `reset` is ignored here; use
    /// [`InputManager::request_reset`] so it is sent exactly once.
    pub fn hold(&mut self, input: InputState) {
        self.held = InputState {
            reset: false,
            ..input
        };
    }

    pub fn request_reset(&mut self) {
        self.reset_pending = true;
    }

    /// Returns the input to send this tick without advancing the sequence.
    pub fn capture(&self) -> (Sequence, InputState) {
        (
            self.next_sequence,
            InputState {
                reset: self.reset_pending,
                ..self.held
            },
        )
    }

    /// Marks the last captured input as sent.
    pub fn commit(&mut self) {
        self.next_sequence += 1;
        self.reset_pending = false;
    }

    pub fn next_sequence(&self) -> Sequence {
        self.next_sequence
    }

    pub fn held(&self) -> &InputState {
        &self.held
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_manager_creation() {
        let input_manager = InputManager::new();
        assert_eq!(input_manager.next_sequence(), 0);
        assert_eq!(*input_manager.held(), InputState::default());
    }

    #[test]
    fn test_sequence_advances_only_on_commit() {
        let mut input_manager = InputManager::new();

        let (first, _) = input_manager.capture();
        let (retry, _) = input_manager.capture();
        assert_eq!(first, retry);

        input_manager.commit();
        let (second, _) = input_manager.capture();
        assert_eq!(second, first + 1);
    }

    #[test]
    fn test_held_controls_are_captured() {
        let mut input_manager = InputManager::new();
        input_manager.hold(InputState {
            accelerate: true,
            left: true,
            ..Default::default()
        });

        let (_, input) = input_manager.capture();
        assert!(input.accelerate);
        assert!(input.left);
        assert!(!input.reset);
    }

    #[test]
    fn test_reset_is_sent_once() {
        let mut input_manager = InputManager::new();
        input_manager.hold(InputState {
            reset: true,
            ..Default::default()
        });
        assert!(!input_manager.capture().1.reset);

        input_manager.request_reset();
        assert!(input_manager.capture().1.reset);
        // A failed send keeps the reset for the retry.
        assert!(input_manager.capture().1.reset);

        input_manager.commit();
        assert!(!input_manager.capture().1.reset);
    }
}
