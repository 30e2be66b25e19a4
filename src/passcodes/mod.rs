pub mod generator;
#[cfg(test)]
pub mod memory;
pub mod repo;

pub use generator::{generate_passcode, PASSCODE_TTL_MINUTES};
pub use repo::{PasscodeStore, PgPasscodeStore};
