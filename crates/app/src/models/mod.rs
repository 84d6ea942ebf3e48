//! Domain models stored by the app.

pub mod session;

pub use session::ShopSession;
