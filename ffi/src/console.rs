//! `console.*` routed to `tracing` events with target `script`.

use rquickjs::convert::Coerced;
use rquickjs::function::Rest;
use rquickjs::{Ctx, Function, Object};

#[derive(Debug, Clone, Copy)]
enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

pub fn install(ctx: &Ctx<'_>) -> rquickjs::Result<()> {
    let console = Object::new(ctx.clone())?;
    for (name, level) in [
        ("debug", Level::Debug),
        ("log", Level::Info),
        ("info", Level::Info),
        ("warn", Level::Warn),
        ("error", Level::Error),
    ] {
        console.set(
            name,
            Function::new(ctx.clone(), move |args: Rest<Coerced<String>>| {
                emit(level, &join(&args.0));
            })?,
        )?;
    }
    ctx.globals().set("console", console)
}

fn join(args: &[Coerced<String>]) -> String {
    args.iter()
        .map(|arg| arg.0.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn emit(level: Level, line: &str) {
    match level {
        Level::Debug => tracing::debug!(target: "script", "{line}"),
        Level::Info => tracing::info!(target: "script", "{line}"),
        Level::Warn => tracing::warn!(target: "script", "{line}"),
        Level::Error => tracing::error!(target: "script", "{line}"),
    }
}
