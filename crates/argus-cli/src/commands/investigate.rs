use argus_core::SignalSet;
use argus_engine::InvestigateOptions;
use argus_select::Selection;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::InvestigateArgs;
use crate::context::AppContext;
use crate::output::{output, output_report};

#[derive(Serialize)]
struct PlanResponse<'a> {
    signals: &'a SignalSet,
    selection: &'a Selection,
}

/// Handle `argus investigate`.
pub async fn handle(
    args: &InvestigateArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let subject = args.subject.to_subject();
    if subject.is_blank() {
        tracing::warn!("no subject fields given; nothing can be selected");
    }
    let options = InvestigateOptions {
        limit: args.limit,
        sources: args.sources.clone(),
    };
    let engine = ctx.engine()?;

    if args.dry_run {
        let plan = engine.plan(&subject, &options).await;
        return output(
            &PlanResponse {
                signals: &plan.signals,
                selection: &plan.selection,
            },
            flags.format,
        );
    }

    let report = engine.investigate(&subject, &options).await?;
    output_report(&report, flags.format)
}
