//! Business Functions
//!
//! The financial calculations this server exposes. Each one is a plain
//! function from a request contract to a response contract; [`register_all`]
//! declares them to the registry during startup.

pub mod finance;


use crate::error::UdfResult;
use crate::executor::registry::{RegistryBuilder, UdfMeta};
use crate::executor::types::ExecutionMode;

pub fn register_all(builder: &mut RegistryBuilder) -> UdfResult<()> {
    builder
        .register_with_meta(
            "npv",
            ExecutionMode::Sync,
            UdfMeta::described("Net present value of a series of cash flows")
                .with_tags(&["finance"])
                .with_version("1.0"),
            finance::npv,
        )?
        .register_with_meta(
            "duration",
            ExecutionMode::Sync,
            UdfMeta::described("Macaulay duration, in periods, of a series of cash flows")
                .with_tags(&["finance"])
                .with_version("1.0"),
            finance::duration,
        )?
        .register_with_meta(
            "scenario",
            ExecutionMode::Async,
            UdfMeta::described("Monte Carlo distribution of NPV under shocked cash flows")
                .with_tags(&["finance", "simulation"])
                .with_version("1.0"),
            finance::scenario,
        )?;

    Ok(())
}
