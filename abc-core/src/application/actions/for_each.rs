// abc-core/src/application/actions/for_each.rs

use crate::AbcError;
use crate::application::actions::{StepContext, execute_steps};
use crate::domain::api::template::ForEach;

pub(crate) fn run(params: &ForEach, ctx: &mut StepContext<'_>) -> Result<(), AbcError> {
    let key = params.iterator.key.value.clone();

    let values: Vec<String> = if let Some(values) = &params.iterator.values {
        let vars = ctx.scope.flatten();
        values
            .iter()
            .map(|v| ctx.renderer.render(&v.value, &vars))
            .collect::<Result<_, _>>()?
    } else if let Some(expr) = &params.iterator.values_from {
        ctx.renderer.eval_list(&expr.value, &ctx.scope.flatten())?
    } else {
        // validate() guarantees one of the two is set
        return Err(AbcError::InternalError(
            "for_each iterator has neither values nor values_from".to_string(),
        ));
    };

    for value in values {
        ctx.scope.push_frame(key.clone(), value);
        let result = execute_steps(&params.steps, ctx);
        ctx.scope.pop_frame();
        result?;
    }
    Ok(())
}
