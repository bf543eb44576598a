use anyhow::Context as _;

use crate::cli::DumpArgs;

pub async fn dump(args: DumpArgs) -> anyhow::Result<()> {
    let text = surge_report::dump(&args.report_server, args.timeout)
        .await
        .with_context(|| format!("dump from report server {}", args.report_server))?;
    println!("{text}");
    Ok(())
}
