//! Driver configuration.

/// ECC driver configuration
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct Config {
    /// How many times `sign` and `generate_key_pair` may reject a random
    /// scalar and draw a new one before giving up with
    /// [`Error::RetryLimit`](crate::ecc::Error::RetryLimit). `None` retries
    /// until a usable scalar is found.
    pub retry_limit: Option<u32>,
}

impl Config {
    /// Caps the number of rejected random scalars per operation.
    pub fn retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = Some(retry_limit);
        self
    }

    /// Lets rejection sampling retry without bound.
    pub fn unbounded_retries(mut self) -> Self {
        self.retry_limit = None;
        self
    }
}
