//! Executor configuration (SPEC_FULL §B).
//!
//! Follows the teacher's `database/config.rs` builder-with-defaults style:
//! a plain `Default` impl for the common case, plus setters for overrides.

/// Tunables for the execution driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutorConfig {
    /// `size` used when a search request doesn't specify one (§6.2).
    pub default_size: usize,
    /// Upper bound on `size` a single request may request, to bound
    /// per-request memory. Requests above this are clamped, not rejected.
    pub max_size: usize,
    /// Page size used for two-phase auxiliary searches (§4.H: ">= 10000").
    pub page_size: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig { default_size: 10, max_size: 10_000, page_size: 10_000 }
    }
}

impl ExecutorConfig {
    /// Starts a builder seeded with defaults.
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder { inner: ExecutorConfig::default() }
    }
}

/// Builder for [`ExecutorConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutorConfigBuilder {
    inner: ExecutorConfig,
}

impl ExecutorConfigBuilder {
    /// Overrides `default_size`.
    pub fn default_size(mut self, value: usize) -> Self {
        self.inner.default_size = value;
        self
    }

    /// Overrides `max_size`.
    pub fn max_size(mut self, value: usize) -> Self {
        self.inner.max_size = value;
        self
    }

    /// Overrides `page_size`.
    pub fn page_size(mut self, value: usize) -> Self {
        self.inner.page_size = value;
        self
    }

    /// Finishes the builder.
    pub fn build(self) -> ExecutorConfig {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = ExecutorConfig::default();
        assert_eq!(cfg.default_size, 10);
        assert_eq!(cfg.page_size, 10_000);
    }

    #[test]
    fn builder_overrides_selected_fields() {
        let cfg = ExecutorConfig::builder().default_size(25).build();
        assert_eq!(cfg.default_size, 25);
        assert_eq!(cfg.max_size, ExecutorConfig::default().max_size);
    }
}
