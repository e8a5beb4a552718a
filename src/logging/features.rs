//! Feature-specific logging macros
//!
//! Each macro logs under a fixed target so output can be filtered per component.

/// Feature categories for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFeature {
    Builder,
    Loader,
    Projector,
    Processor,
    Store,
}

impl LogFeature {
    /// Get the target string for this feature
    pub fn target(&self) -> &'static str {
        match self {
            LogFeature::Builder => "order_vault::builder",
            LogFeature::Loader => "order_vault::loader",
            LogFeature::Projector => "order_vault::projector",
            LogFeature::Processor => "order_vault::processor",
            LogFeature::Store => "order_vault::store",
        }
    }
}

// Loader-specific logging macros
#[macro_export]
macro_rules! log_loader_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "order_vault::loader", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_loader_info {
    ($($arg:tt)*) => {
        log::info!(target: "order_vault::loader", $($arg)*)
    };
}

// Processor-specific logging macros
#[macro_export]
macro_rules! log_processor_info {
    ($($arg:tt)*) => {
        log::info!(target: "order_vault::processor", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_processor_warn {
    ($($arg:tt)*) => {
        log::warn!(target: "order_vault::processor", $($arg)*)
    };
}

#[macro_export]
macro_rules! log_processor_error {
    ($($arg:tt)*) => {
        log::error!(target: "order_vault::processor", $($arg)*)
    };
}

// Store-specific logging macros
#[macro_export]
macro_rules! log_store_debug {
    ($($arg:tt)*) => {
        log::debug!(target: "order_vault::store", $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::LogFeature;

    #[test]
    fn test_targets_are_crate_scoped() {
        for feature in [
            LogFeature::Builder,
            LogFeature::Loader,
            LogFeature::Projector,
            LogFeature::Processor,
            LogFeature::Store,
        ] {
            assert!(feature.target().starts_with("order_vault::"));
        }
    }
}
