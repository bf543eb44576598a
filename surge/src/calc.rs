use crate::cli::CalcArgs;

pub fn calc(args: CalcArgs) -> anyhow::Result<()> {
    let aggregator = surge_report::calc(&args.paths, args.group_minutes)?;
    match surge_report::render(&aggregator) {
        Some(text) => println!("\n{text}"),
        None => println!("No report result found."),
    }
    Ok(())
}
