//! ARC puzzle data: grids, task files, rendering and reply parsing

pub mod dataset;
pub mod grid;
pub mod parse;
pub mod render;

pub use dataset::{ArcTask, Dataset, DatasetError, Example};
pub use grid::{Grid, GridError, Transformation};
pub use parse::parse_grid_reply;
pub use render::{render_png, render_task, RenderError};
