pub mod artifact;
pub mod auth;
pub mod backend;
pub mod error;
pub mod labels;
pub mod normalize;
pub mod spec;
pub mod tensor;

pub use artifact::*;
pub use auth::*;
pub use backend::*;
pub use error::*;
pub use labels::*;
pub use normalize::*;
pub use spec::*;
pub use tensor::*;
