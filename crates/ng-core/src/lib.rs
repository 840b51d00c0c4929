pub mod block;
pub mod config;
pub mod events;
pub mod graph;
pub mod id;
pub mod layout;
pub mod registry;
pub mod settings;
pub mod viewport;

pub use block::{BlockId, BlockLayer, Compatibility, Direction, PointId, ValueType};
pub use config::{CanvasConfig, DEFAULT_GRID_SIZE, GRID_SIZE_KEY};
pub use events::{Channel, Subscription};
pub use graph::{GraphModel, Link, Node, Port};
pub use id::{LinkId, NodeId};
pub use layout::{LayeredLayout, LayoutEngine, LayoutOptions, RankDir, distribute_graph};
pub use registry::{BlockDecl, BlockRegistry, Target};
pub use settings::{JsonFileSettings, MemorySettings, Settings, SettingsError};
pub use viewport::{DragZoom, DragZoomTuning, Viewport, grid_snap};

// Re-export geometry types so downstream crates speak the same units.
pub use kurbo::{Affine, Point, Rect, Size, Vec2};
