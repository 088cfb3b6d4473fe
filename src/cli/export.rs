use anyhow::{Context as _, Result};

use super::{Context, flag_value};
use crate::core::export::render_csv;
use crate::core::terminal::print_success;

pub async fn run_export(args: &[String]) -> Result<()> {
    let group = flag_value(args, 2, &["--group", "-g"]);
    let out = flag_value(args, 2, &["--out", "-o"]);

    let ctx = Context::open().await?;
    let rows = ctx
        .storage
        .list_members(group.as_deref().map(str::trim).filter(|g| !g.is_empty()))
        .await?;
    let csv = render_csv(&rows);

    match out {
        Some(path) => {
            std::fs::write(&path, csv).with_context(|| format!("cannot write {}", path))?;
            print_success(&format!("Exported {} row(s) to {}", rows.len(), path));
        }
        None => print!("{}", csv),
    }
    Ok(())
}
