//! Status indicator contract

/// Single visual indicator (usually an LED)
///
/// Patterns are timed by the caller; implementations only switch the light.
pub trait StatusIndicator {
    /// Switch the indicator on or off
    fn set_lit(&mut self, lit: bool);
}
