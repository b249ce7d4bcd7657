//! Canvas view of a mesh topology: pan, zoom, hover highlight, click to
//! select and drag to reposition.

mod component;
mod render;
mod state;

pub use component::TopologyCanvas;
