pub mod api;
pub mod composer;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod history;
pub mod messages;
pub mod models;
pub mod render;
pub mod session;
pub mod transport;

pub use api::{ApiClient, Backend};
pub use controller::{mount, ChatContext, ChatHandle};
pub use conversation::{ConversationView, Phase, ViewSnapshot};
pub use error::{ApiError, TransportError};
pub use models::{Message, User};
pub use session::{AppSession, Route, SessionEvent};
pub use transport::{Connection, Connector, WsConnector};
