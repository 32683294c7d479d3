mod dispatch;
mod health;

pub use dispatch::dispatch_handler;
pub use health::health_handler;
