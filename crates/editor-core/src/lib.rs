mod autosave;
mod block;
mod editor;
mod markup;
mod pages;
mod selection;
mod slash;

pub use crate::autosave::*;
pub use crate::block::*;
pub use crate::editor::*;
pub use crate::markup::*;
pub use crate::pages::*;
pub use crate::selection::*;
pub use crate::slash::*;
