//! Shipped content models.
//!
//! Each module registers one capability table. Types opt into exactly the
//! operations that make sense for them; the engine discovers the rest
//! through the registry, so plugin-contributed types slot in the same way.

pub mod arc;
pub mod block;
pub mod block_reference;
pub mod circle;
pub mod line;
pub mod polyline;

use crate::registry::Registry;

/// Register the shipped content models.
pub fn register_models(registry: &mut Registry) {
    registry.register_model(line::model());
    registry.register_model(polyline::model());
    registry.register_model(circle::model());
    registry.register_model(arc::model());
    registry.register_model(block::model());
    registry.register_model(block_reference::model());
}

/// A registry carrying the shipped content models.
pub fn standard_registry() -> Registry {
    let mut registry = Registry::new();
    register_models(&mut registry);
    registry
}
