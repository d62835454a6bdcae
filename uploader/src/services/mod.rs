//! Uploader service implementations

pub mod graph_client;
pub mod sheets_client;
pub mod thumbnail;
pub mod twilio_notifier;

#[cfg(test)]
pub mod tests;

pub use graph_client::*;
pub use sheets_client::*;
pub use thumbnail::*;
pub use twilio_notifier::*;
