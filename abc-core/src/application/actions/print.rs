// abc-core/src/application/actions/print.rs

use crate::AbcError;
use crate::application::actions::StepContext;
use crate::domain::api::template::Print;

pub(crate) fn run(params: &Print, ctx: &mut StepContext<'_>) -> Result<(), AbcError> {
    let message = ctx
        .renderer
        .render(&params.message.value, &ctx.scope.flatten())?;
    writeln!(ctx.stdout, "{}", message)?;
    Ok(())
}
