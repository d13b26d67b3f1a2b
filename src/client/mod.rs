pub mod http;
pub mod meater;

pub use http::{ClientError, PitmasterClient};
pub use meater::MeaterClient;
