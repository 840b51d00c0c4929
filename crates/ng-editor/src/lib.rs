pub mod canvas;
pub mod connect;
pub mod events;
pub mod hit;
pub mod input;
pub mod selection;

pub use canvas::{Cursor, GraphCanvas, Surface};
pub use connect::{CandidateLink, ConnectError, ConnectionResolver, Resolution};
pub use events::CanvasEvents;
pub use hit::{HitTable, PortHit};
pub use input::{Buttons, InputEvent, ModifierState, Modifiers, PointerId};
pub use selection::{Selection, SelectionTarget};
