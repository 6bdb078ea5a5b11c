pub mod events;
pub mod server;

pub use events::{Event, EventBus, EventHandler, LoggingHandler};
pub use server::{create_router, AppState, Server};

pub type Result<T> = anyhow::Result<T>;
