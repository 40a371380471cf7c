use std::path::PathBuf;

use typed_builder::TypedBuilder;

use crate::{
    builder::{AnyBuilder, Builder},
    config::{Pricing, SimulationConfig},
    error::BuildResult,
    history::History,
};

/// A full run: where the wall comes from, how it gets built, and how the
/// result is priced.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Simulation<B>
where
    B: Builder,
{
    #[builder(setter(into))]
    pub name: String,
    #[builder(setter(into))]
    pub input: PathBuf,
    pub builder: B,
    #[builder(default)]
    pub pricing: Pricing,
}

impl<B> Simulation<B>
where
    B: Builder,
{
    pub async fn run(&self) -> BuildResult<History> {
        tracing::info!("Building history for simulation: {} ...", self.name);
        let data = self.builder.read_data(&self.input)?;
        let log = self.builder.build(&data).await?;
        tracing::info!("Done running simulation: {}!", self.name);
        Ok(History::from_log(log, self.pricing))
    }
}

impl Simulation<AnyBuilder> {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            name: format!("{:?} build of {}", config.mode, config.input.display()),
            input: config.input.clone(),
            builder: AnyBuilder::from_config(config),
            pricing: config.pricing,
        }
    }
}

/// Validate `config` and run the builder it selects.
pub async fn simulate(config: &SimulationConfig) -> BuildResult<History> {
    config.validate()?;
    Simulation::from_config(config).run().await
}
