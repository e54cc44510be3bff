//! demo command - Run scenarios and print their transcripts

use anyhow::{Context as _, Result};
use tracing::debug;

use crate::cli::args::DemoArgs;
use crate::cli::Context;
use crate::demo::{self, DemoOptions, Scenario};
use crate::ui::output;

/// Run the requested scenario(s).
pub fn demo(ctx: &Context, args: &DemoArgs) -> Result<()> {
    let options = options(ctx, args);
    options.validate().context("Invalid demo options")?;
    debug!(?options, "running demo");

    let mut transcripts = Vec::new();
    for scenario in args.scenario.scenarios() {
        let transcript = demo::run(scenario, &options)
            .with_context(|| format!("Scenario '{scenario}' failed"))?;
        transcripts.push(transcript);
    }

    if args.json {
        match transcripts.as_slice() {
            [single] => output::json(single)?,
            all => output::json(&all)?,
        }
        return Ok(());
    }

    for (i, transcript) in transcripts.iter().enumerate() {
        if i > 0 {
            output::print("", ctx.verbosity);
        }
        output::print(transcript.to_string().trim_end(), ctx.verbosity);
        if let Some(ref verify) = transcript.verify {
            output::print(output::format_verify(verify), ctx.verbosity);
        }
    }
    Ok(())
}

/// List scenarios with a one-line summary each.
pub fn list(ctx: &Context) -> Result<()> {
    let width = Scenario::ALL
        .iter()
        .map(|s| s.name().len())
        .max()
        .unwrap_or(0);
    for scenario in Scenario::ALL {
        output::print(
            format!("{:width$}  {}", scenario.name(), scenario.summary()),
            ctx.verbosity,
        );
    }
    Ok(())
}

/// Flags win over configuration.
fn options(ctx: &Context, args: &DemoArgs) -> DemoOptions {
    let mut options = DemoOptions::from_config(&ctx.config);
    if let Some(n) = args.chain_length {
        options.chain_length = n;
    }
    if let Some(n) = args.iterations {
        options.iterations = n;
    }
    if let Some(n) = args.resource_size {
        options.resource_size = n;
    }
    if let Some(policy) = args.cycle_policy {
        options.graph.cycle_policy = policy.into();
    }
    options
}
