//! Shipped commands (tools).

mod circle;
mod edit;
mod line;
mod polyline;
mod transform;

use crate::registry::Registry;

pub use edit::unique_indices;

/// Register the shipped commands.
pub fn register_commands(registry: &mut Registry) {
    registry.register_command(line::descriptor());
    registry.register_command(polyline::descriptor());
    registry.register_command(circle::descriptor());
    registry.register_command(edit::move_descriptor());
    registry.register_command(edit::delete_descriptor());
    registry.register_command(edit::clone_descriptor());
    registry.register_command(transform::rotate_descriptor());
    registry.register_command(transform::mirror_descriptor());
    registry.register_command(transform::explode_descriptor());
    registry.register_command(transform::break_descriptor());
}
