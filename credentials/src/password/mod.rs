pub mod envelope;
pub mod errors;
pub mod hasher;
pub mod policy;

pub use envelope::Envelope;
pub use envelope::HashFunction;
pub use errors::EnvelopeError;
pub use errors::PasswordError;
pub use errors::PolicyViolation;
pub use hasher::HasherOptions;
pub use hasher::PasswordHasher;
pub use policy::PasswordPolicy;
pub use policy::PolicyOptions;
