pub mod access;
pub mod claims;
pub mod codec;
pub mod errors;
pub mod service;
pub mod signed;

pub use access::AccessToken;
pub use claims::ClaimValue;
pub use claims::Claims;
pub use errors::AuthorizationError;
pub use errors::MalformedToken;
pub use errors::TokenError;
pub use service::TokenBuilder;
pub use service::TokenService;
pub use signed::Token;
