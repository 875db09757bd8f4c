pub mod hit;
pub mod palette;
pub mod project;

pub use hit::{NodeGeometry, RenderLayout};
pub use palette::{Palette, assign_colors};
pub use project::{ProjectionConfig, RenderNode, RenderState, project, truncate};
