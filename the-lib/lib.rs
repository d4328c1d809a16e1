use smartstring::{LazyCompact, SmartString};

pub mod change;
pub mod compose;
pub mod conceal;
pub mod config;
pub mod document;
pub mod event;
pub mod history;
pub mod mode;
pub mod operation;
pub mod selection;
pub mod selectors;
pub mod text_view;

pub type Tendril = SmartString<LazyCompact>;
