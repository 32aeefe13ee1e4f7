pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod signature;
pub mod stripe;

pub use coordinator::*;
pub use error::*;
pub use gateway::{GatewayError, PaymentGateway};
pub use handlers::*;
pub use models::*;
pub use repository::*;
pub use stripe::{StripeConfig, StripeGateway};
