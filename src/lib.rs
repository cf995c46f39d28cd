//! Layout core of the wavy dynamic tiling compositor.
//!
//! The core owns the geometric arrangement of views across outputs and
//! workspaces: a binary tree of frames per workspace whose leaves host
//! views, five tiling policies that place views within a leaf, directional
//! focus and movement, a statusbar driver and the keybinding dispatcher.
//!
//! The compositor runtime, the embedded config scripting layer and pixel
//! rendering stay outside: they plug in through the traits in [`ports`],
//! and the host forwards its callbacks to the event methods of [`Core`].

pub mod bar;
mod border;
pub mod cli;
mod core;
pub mod input;
pub mod layout;
pub mod ports;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::core::Core;
