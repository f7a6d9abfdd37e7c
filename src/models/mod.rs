mod api_key;
mod company;
mod lead;
mod payment;
mod user;

pub use api_key::*;
pub use company::*;
pub use lead::*;
pub use payment::*;
pub use user::*;
