//! Command-line command handlers for prayertimes.
//!
//! One-shot commands compute prayer times directly through a
//! [`CalculatorAdapter`] without starting the refresh coordinator.

pub mod help;
pub mod next;
pub mod show;

use anyhow::{Context, Result};

use crate::calc::{CalculatorAdapter, build_calculator};
use crate::config::{self, Configuration};

/// Load the configuration and build the calculator it selects.
pub(crate) fn load_calculation_context() -> Result<(Configuration, CalculatorAdapter)> {
    let config = config::load().context("Failed to load configuration")?;
    let calculator = build_calculator(&config)?;
    Ok((config, CalculatorAdapter::new(calculator)))
}
