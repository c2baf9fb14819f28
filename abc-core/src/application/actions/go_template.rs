// abc-core/src/application/actions/go_template.rs
//
// Treats each listed file's content as a template and expands it in
// place, preserving the file mode.

use crate::AbcError;
use crate::application::actions::{StepContext, files_under};
use crate::domain::api::template::GoTemplate;
use crate::infrastructure::fs as afs;

pub(crate) fn run(params: &GoTemplate, ctx: &mut StepContext<'_>) -> Result<(), AbcError> {
    let vars = ctx.scope.flatten();
    for raw in &params.paths {
        for file in files_under(ctx, raw)? {
            let mode = afs::file_mode(&file)?;
            let content = afs::read_to_string(&file)?;
            let rendered = ctx.renderer.render(&content, &vars)?;
            afs::write_file(&file, rendered.as_bytes(), mode)?;
        }
    }
    Ok(())
}
