// abc-core/src/application/actions/string_replace.rs

use crate::AbcError;
use crate::application::actions::{StepContext, files_under};
use crate::domain::api::template::StringReplace;
use crate::infrastructure::fs as afs;

pub(crate) fn run(params: &StringReplace, ctx: &mut StepContext<'_>) -> Result<(), AbcError> {
    let vars = ctx.scope.flatten();

    // Both sides are template-expanded once, then applied literally to
    // every file in declaration order.
    let mut pairs = Vec::with_capacity(params.replacements.len());
    for r in &params.replacements {
        let to_replace = ctx.renderer.render(&r.to_replace.value, &vars)?;
        let with = ctx.renderer.render(&r.with.value, &vars)?;
        pairs.push((to_replace, with));
    }

    for raw in &params.paths {
        for file in files_under(ctx, raw)? {
            let mode = afs::file_mode(&file)?;
            let mut content = afs::read_to_string(&file)?;
            for (to_replace, with) in &pairs {
                content = content.replace(to_replace, with);
            }
            afs::write_file(&file, content.as_bytes(), mode)?;
        }
    }
    Ok(())
}
