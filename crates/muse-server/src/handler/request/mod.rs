//! Request bodies.

mod processing;

pub use processing::{AudioInput, ImageInput, TextInput};
