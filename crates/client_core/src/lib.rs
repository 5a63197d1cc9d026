//! Client-side lifecycle controller for the user and product collections.
//!
//! Front ends build a [`ResourceController`] from resolved [`ServiceEndpoints`],
//! bind to its snapshot subscription and forward user actions (edit draft,
//! submit, retry) to it.

pub mod config;
pub mod controller;
pub mod error;
pub mod lane;
pub mod store;
pub mod transport;

pub use config::{load_settings, Environment, PricePolicy, ServiceEndpoints, Settings};
pub use controller::ResourceController;
pub use error::{ConfigError, CreateError, FetchError, RequestError};
pub use lane::{LaneKind, LaneState, LaneStatus, Resource};
pub use shared::protocol::Created;
pub use store::{ControllerEvent, ControllerSnapshot, SuccessBanner};
