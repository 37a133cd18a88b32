pub mod pipeline;
pub mod pool;
pub mod request;
pub mod response;
mod scheduler;
mod worker;

pub use pipeline::*;
pub use pool::*;
pub use request::*;
pub use response::*;
