//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod store;
pub mod tables;

use basket_core::BasketConfig;

/// Built-in configurations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Preset {
    /// Region per row, matched on an "area" header
    Default,
    /// The publisher's food-per-row layout with one column per area
    Pmbejd,
}

impl Preset {
    pub fn config(self) -> BasketConfig {
        match self {
            Preset::Default => BasketConfig::default(),
            Preset::Pmbejd => BasketConfig::pmbejd(),
        }
    }
}
