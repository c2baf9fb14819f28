// abc-core/src/application/actions/append.rs

use crate::AbcError;
use crate::application::actions::StepContext;
use crate::domain::api::template::Append;
use crate::infrastructure::fs as afs;

pub(crate) fn run(params: &Append, ctx: &mut StepContext<'_>) -> Result<(), AbcError> {
    let with = ctx
        .renderer
        .render(&params.with.value, &ctx.scope.flatten())?;

    for raw in &params.paths {
        let rel = ctx.render_rel_path(raw)?;
        let abs = ctx.scratch_dir.join(&rel);

        let mode = if abs.exists() {
            afs::file_mode(&abs)?
        } else {
            None
        };
        let mut content = if abs.exists() {
            afs::read_to_string(&abs)?
        } else {
            String::new()
        };

        if !params.skip_ensure_newline && !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&with);
        afs::write_file(&abs, content.as_bytes(), mode)?;
    }
    Ok(())
}
