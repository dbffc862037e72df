mod lock;
mod options;
#[cfg(test)]
mod tests;

pub use lock::*;
pub use options::*;
